//! Record type definitions.
//!
//! # Responsibility
//! - Describe one record type: attributes, post-load callbacks, validators.
//! - Freeze that description at build time and share it across instances.
//!
//! # Invariants
//! - A built `RecordSchema` is never mutated; instances hold it via `Arc`.
//! - Validators and application load hooks keep registration order.
//! - The original attribute capture, when present, is the last load callback.
//! - Every attribute named by a validator or constancy declaration exists.

use crate::model::record::Record;
use crate::model::value::AttrType;
use crate::validation::{EachValidator, ValidateOn, PRESENCE_MESSAGE};
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::sync::Arc;

/// User-supplied hook invoked after a record is populated from storage.
pub type AfterLoadHook = Arc<dyn Fn(&mut Record) + Send + Sync>;

/// One attribute definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeDef {
    pub name: String,
    pub kind: AttrType,
}

/// Entry in a record type's ordered post-load callback list.
#[derive(Clone)]
pub enum LoadCallback {
    /// Application hook registered through [`RecordSchemaBuilder::after_load`].
    Hook(AfterLoadHook),
    /// Snapshot of constant attribute values; see [`crate::constancy::capture`].
    OriginalAttributeCapture,
}

impl LoadCallback {
    pub fn is_original_attribute_capture(&self) -> bool {
        matches!(self, Self::OriginalAttributeCapture)
    }
}

impl Debug for LoadCallback {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Hook(_) => f.write_str("Hook(..)"),
            Self::OriginalAttributeCapture => f.write_str("OriginalAttributeCapture"),
        }
    }
}

pub type SchemaResult<T> = Result<T, SchemaError>;

/// Definition-time errors reported by [`RecordSchemaBuilder::build`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    EmptyTypeName,
    EmptyAttributeName,
    DuplicateAttribute(String),
    UnknownAttribute {
        validator: &'static str,
        attribute: String,
    },
    EmptyDeclaration(&'static str),
}

impl Display for SchemaError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyTypeName => write!(f, "record type name cannot be empty"),
            Self::EmptyAttributeName => write!(f, "attribute name cannot be empty"),
            Self::DuplicateAttribute(name) => write!(f, "attribute `{name}` is declared twice"),
            Self::UnknownAttribute {
                validator,
                attribute,
            } => write!(
                f,
                "{validator} validation references undeclared attribute `{attribute}`"
            ),
            Self::EmptyDeclaration(validator) => {
                write!(f, "{validator} validation needs at least one attribute")
            }
        }
    }
}

impl Error for SchemaError {}

/// Immutable definition of one record type.
#[derive(Debug)]
pub struct RecordSchema {
    name: String,
    attributes: Vec<AttributeDef>,
    load_callbacks: Vec<LoadCallback>,
    validators: Vec<EachValidator>,
    constant_attributes: Vec<String>,
}

impl RecordSchema {
    /// Starts a definition for a record type named `name`.
    pub fn builder(name: impl Into<String>) -> RecordSchemaBuilder {
        RecordSchemaBuilder {
            name: name.into(),
            attributes: Vec::new(),
            load_callbacks: Vec::new(),
            validators: Vec::new(),
            constant_attributes: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Attribute definitions in declaration order.
    pub fn attributes(&self) -> &[AttributeDef] {
        &self.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeDef> {
        self.attributes.iter().find(|attribute| attribute.name == name)
    }

    pub fn load_callbacks(&self) -> &[LoadCallback] {
        &self.load_callbacks
    }

    pub fn validators(&self) -> &[EachValidator] {
        &self.validators
    }

    /// Constant attribute set, ordered by first declaration, without duplicates.
    pub fn constant_attribute_names(&self) -> &[String] {
        &self.constant_attributes
    }

    /// Returns whether loads of this type snapshot constant attribute values.
    pub fn captures_original_attributes(&self) -> bool {
        self.load_callbacks
            .iter()
            .any(LoadCallback::is_original_attribute_capture)
    }
}

/// Collects a record type definition before it is frozen.
pub struct RecordSchemaBuilder {
    name: String,
    attributes: Vec<AttributeDef>,
    load_callbacks: Vec<LoadCallback>,
    validators: Vec<EachValidator>,
    constant_attributes: Vec<String>,
}

impl RecordSchemaBuilder {
    /// Declares one attribute. Order of calls is the attribute order.
    pub fn attribute(mut self, name: impl Into<String>, kind: AttrType) -> Self {
        self.attributes.push(AttributeDef {
            name: name.into(),
            kind,
        });
        self
    }

    /// Adds an application hook to the post-load callback list.
    ///
    /// Hooks run in registration order, always ahead of the original
    /// attribute capture, whether declared before or after constancy.
    pub fn after_load<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut Record) + Send + Sync + 'static,
    {
        let hook = LoadCallback::Hook(Arc::new(hook));
        match self
            .load_callbacks
            .iter()
            .position(LoadCallback::is_original_attribute_capture)
        {
            Some(capture) => self.load_callbacks.insert(capture, hook),
            None => self.load_callbacks.push(hook),
        }
        self
    }

    /// Registers a per-attribute validator.
    pub fn validates_each(mut self, validator: EachValidator) -> Self {
        self.validators.push(validator);
        self
    }

    /// Rejects `Null` and blank text on every save.
    pub fn validates_presence_of<I, S>(self, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let validator = EachValidator::new(attributes, |_, attribute, value, errors| {
            if value.is_blank() {
                errors.add(attribute, PRESENCE_MESSAGE);
            }
        })
        .kind("presence")
        .on(ValidateOn::Save);
        self.validates_each(validator)
    }

    /// Freezes the definition.
    ///
    /// # Errors
    /// Returns [`SchemaError`] for blank names, duplicate attributes, empty
    /// declarations, or validators naming undeclared attributes.
    pub fn build(self) -> SchemaResult<Arc<RecordSchema>> {
        if self.name.trim().is_empty() {
            return Err(SchemaError::EmptyTypeName);
        }

        for (index, attribute) in self.attributes.iter().enumerate() {
            if attribute.name.trim().is_empty() {
                return Err(SchemaError::EmptyAttributeName);
            }
            if self.attributes[..index]
                .iter()
                .any(|earlier| earlier.name == attribute.name)
            {
                return Err(SchemaError::DuplicateAttribute(attribute.name.clone()));
            }
        }

        for validator in &self.validators {
            if validator.attributes().is_empty() {
                return Err(SchemaError::EmptyDeclaration(validator.kind_name()));
            }
            for name in validator.attributes() {
                if !self.attributes.iter().any(|attribute| &attribute.name == name) {
                    return Err(SchemaError::UnknownAttribute {
                        validator: validator.kind_name(),
                        attribute: name.clone(),
                    });
                }
            }
        }

        Ok(Arc::new(RecordSchema {
            name: self.name,
            attributes: self.attributes,
            load_callbacks: self.load_callbacks,
            validators: self.validators,
            constant_attributes: self.constant_attributes,
        }))
    }

    pub(crate) fn load_callbacks_mut(&mut self) -> &mut Vec<LoadCallback> {
        &mut self.load_callbacks
    }

    pub(crate) fn declare_constant_attributes(&mut self, names: &[String]) {
        for name in names {
            if !self.constant_attributes.contains(name) {
                self.constant_attributes.push(name.clone());
            }
        }
    }
}
