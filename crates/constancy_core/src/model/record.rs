//! In-memory record instances.
//!
//! # Responsibility
//! - Hold one record's identity, lifecycle state and typed attribute values.
//! - Run the type's post-load callbacks and validation pipeline.
//!
//! # Invariants
//! - Every schema attribute has a value (`Null` until assigned or loaded).
//! - Assigned values are coerced through the attribute's `AttrType`.
//! - The original-attribute snapshot is private to this instance and only
//!   replaced by a load or a first successful insert.

use crate::constancy::capture::{capture_original_attributes, OriginalAttributes};
use crate::model::schema::{LoadCallback, RecordSchema};
use crate::model::value::{AttrValue, CoercionError};
use crate::validation::{Errors, ValidationContext};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use uuid::Uuid;

/// Stable record identity.
pub type RecordId = Uuid;

/// Lifecycle state of a record instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordState {
    /// Constructed in memory, never written to storage.
    New,
    /// Loaded from storage or successfully inserted.
    Persisted,
}

pub type RecordResult<T> = Result<T, RecordError>;

/// Attribute access and assignment errors.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordError {
    UnknownAttribute {
        record_type: String,
        attribute: String,
    },
    Coercion {
        attribute: String,
        source: CoercionError,
    },
}

impl Display for RecordError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownAttribute {
                record_type,
                attribute,
            } => write!(f, "{record_type} has no attribute `{attribute}`"),
            Self::Coercion { attribute, source } => {
                write!(f, "invalid value for `{attribute}`: {source}")
            }
        }
    }
}

impl Error for RecordError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::UnknownAttribute { .. } => None,
            Self::Coercion { source, .. } => Some(source),
        }
    }
}

/// One record of a [`RecordSchema`] type.
#[derive(Debug, Clone)]
pub struct Record {
    schema: Arc<RecordSchema>,
    id: RecordId,
    state: RecordState,
    values: BTreeMap<String, AttrValue>,
    original_attributes: Option<OriginalAttributes>,
    errors: Errors,
}

impl Record {
    /// Creates a new, never-persisted record with a generated id.
    pub fn new(schema: &Arc<RecordSchema>) -> Self {
        Self::with_id(schema, Uuid::new_v4())
    }

    /// Creates a new, never-persisted record with a caller-provided id.
    pub fn with_id(schema: &Arc<RecordSchema>, id: RecordId) -> Self {
        let values = schema
            .attributes()
            .iter()
            .map(|attribute| (attribute.name.clone(), AttrValue::Null))
            .collect();
        Self {
            schema: Arc::clone(schema),
            id,
            state: RecordState::New,
            values,
            original_attributes: None,
            errors: Errors::default(),
        }
    }

    /// Creates a new record and assigns `attributes` in order.
    ///
    /// # Errors
    /// Fails on the first unknown attribute or uncoercible value.
    pub fn with_attributes<I, K, V>(schema: &Arc<RecordSchema>, attributes: I) -> RecordResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<AttrValue>,
    {
        let mut record = Self::new(schema);
        for (name, value) in attributes {
            record.set(name.as_ref(), value)?;
        }
        Ok(record)
    }

    /// Builds a persisted record from stored values and runs the type's
    /// post-load callbacks in registration order.
    ///
    /// Stored values for attributes the schema no longer declares are
    /// ignored; declared attributes missing from storage load as `Null`.
    ///
    /// # Errors
    /// Returns [`RecordError::Coercion`] when a stored value does not fit the
    /// declared attribute type.
    pub fn from_storage<I>(schema: &Arc<RecordSchema>, id: RecordId, stored: I) -> RecordResult<Self>
    where
        I: IntoIterator<Item = (String, AttrValue)>,
    {
        let mut record = Self::with_id(schema, id);
        for (name, value) in stored {
            let Some(attribute) = schema.attribute(&name) else {
                continue;
            };
            let coerced = attribute
                .kind
                .coerce(value)
                .map_err(|source| RecordError::Coercion {
                    attribute: name.clone(),
                    source,
                })?;
            record.values.insert(name, coerced);
        }
        record.state = RecordState::Persisted;
        record.run_load_callbacks();
        Ok(record)
    }

    pub fn id(&self) -> RecordId {
        self.id
    }

    pub fn schema(&self) -> &Arc<RecordSchema> {
        &self.schema
    }

    pub fn record_type(&self) -> &str {
        self.schema.name()
    }

    pub fn state(&self) -> RecordState {
        self.state
    }

    pub fn is_new_record(&self) -> bool {
        self.state == RecordState::New
    }

    pub fn is_persisted(&self) -> bool {
        self.state == RecordState::Persisted
    }

    /// Current in-memory value of `name`, or `None` for undeclared attributes.
    pub fn get(&self, name: &str) -> Option<&AttrValue> {
        self.values.get(name)
    }

    /// Attribute values in schema declaration order.
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &AttrValue)> {
        self.schema.attributes().iter().filter_map(|attribute| {
            self.values
                .get(&attribute.name)
                .map(|value| (attribute.name.as_str(), value))
        })
    }

    /// Assigns `value` to `name` after coercing it to the declared type.
    ///
    /// # Errors
    /// Leaves the record unchanged and returns an error when `name` is not
    /// declared or `value` cannot be coerced.
    pub fn set(&mut self, name: &str, value: impl Into<AttrValue>) -> RecordResult<()> {
        let Some(attribute) = self.schema.attribute(name) else {
            return Err(RecordError::UnknownAttribute {
                record_type: self.schema.name().to_string(),
                attribute: name.to_string(),
            });
        };
        let coerced = attribute
            .kind
            .coerce(value.into())
            .map_err(|source| RecordError::Coercion {
                attribute: name.to_string(),
                source,
            })?;
        self.values.insert(name.to_string(), coerced);
        Ok(())
    }

    /// Snapshot taken at the most recent load, if any.
    pub fn original_attributes(&self) -> Option<&OriginalAttributes> {
        self.original_attributes.as_ref()
    }

    /// Errors from the most recent validation pass.
    pub fn errors(&self) -> &Errors {
        &self.errors
    }

    /// Context the next validation pass runs in.
    pub fn validation_context(&self) -> ValidationContext {
        match self.state {
            RecordState::New => ValidationContext::Create,
            RecordState::Persisted => ValidationContext::Update,
        }
    }

    /// Runs every applicable validator and replaces the error set.
    ///
    /// Returns `true` when no validator reported an error.
    pub fn validate(&mut self) -> bool {
        let schema = Arc::clone(&self.schema);
        let context = self.validation_context();
        let mut errors = Errors::default();
        for validator in schema.validators() {
            validator.run(self, context, &mut errors);
        }
        self.errors = errors;
        self.errors.is_empty()
    }

    pub fn is_valid(&mut self) -> bool {
        self.validate()
    }

    /// Marks a successful first insert. The written values are what a reload
    /// would observe, so they become the snapshot for types that keep one.
    pub(crate) fn finish_insert(&mut self) {
        self.state = RecordState::Persisted;
        if self.schema.captures_original_attributes() {
            capture_original_attributes(self);
        }
    }

    pub(crate) fn replace_original_attributes(&mut self, originals: OriginalAttributes) {
        self.original_attributes = Some(originals);
    }

    /// Replaces this instance's state with a freshly loaded copy of itself.
    pub(crate) fn reload_from(&mut self, fresh: Record) {
        *self = fresh;
    }

    fn run_load_callbacks(&mut self) {
        let schema = Arc::clone(&self.schema);
        for callback in schema.load_callbacks() {
            match callback {
                LoadCallback::Hook(hook) => hook(self),
                LoadCallback::OriginalAttributeCapture => capture_original_attributes(self),
            }
        }
    }
}
