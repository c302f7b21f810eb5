//! Per-attribute validators and their scoping.
//!
//! # Invariants
//! - Guards are evaluated once per record per pass, before any attribute.
//! - Attributes are visited in the order they were given.

use crate::model::record::Record;
use crate::model::value::AttrValue;
use crate::validation::errors::Errors;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

/// Per-record predicate deciding whether a validator applies.
pub type Guard = Arc<dyn Fn(&Record) -> bool + Send + Sync>;

/// Callback receiving the record, attribute name, current value and error sink.
pub type EachCallback = Arc<dyn Fn(&Record, &str, &AttrValue, &mut Errors) + Send + Sync>;

/// Which pass a record is going through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationContext {
    /// First save of a record that was never persisted.
    Create,
    /// Save of a record that already exists in storage.
    Update,
}

/// Validator scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidateOn {
    #[default]
    Save,
    Create,
    Update,
}

impl ValidateOn {
    pub fn applies_to(self, context: ValidationContext) -> bool {
        match self {
            Self::Save => true,
            Self::Create => context == ValidationContext::Create,
            Self::Update => context == ValidationContext::Update,
        }
    }
}

/// Runs one callback for each configured attribute.
#[derive(Clone)]
pub struct EachValidator {
    kind: &'static str,
    attributes: Vec<String>,
    on: ValidateOn,
    when: Option<Guard>,
    unless: Option<Guard>,
    callback: EachCallback,
}

impl EachValidator {
    pub fn new<I, S, F>(attributes: I, callback: F) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: Fn(&Record, &str, &AttrValue, &mut Errors) + Send + Sync + 'static,
    {
        Self {
            kind: "each",
            attributes: attributes.into_iter().map(Into::into).collect(),
            on: ValidateOn::Save,
            when: None,
            unless: None,
            callback: Arc::new(callback),
        }
    }

    /// Label used in definition-time diagnostics.
    pub fn kind(mut self, kind: &'static str) -> Self {
        self.kind = kind;
        self
    }

    pub fn on(mut self, on: ValidateOn) -> Self {
        self.on = on;
        self
    }

    /// Only validate records for which `guard` returns `true`.
    pub fn when<G>(mut self, guard: G) -> Self
    where
        G: Fn(&Record) -> bool + Send + Sync + 'static,
    {
        self.when = Some(Arc::new(guard));
        self
    }

    /// Skip records for which `guard` returns `true`.
    pub fn unless<G>(mut self, guard: G) -> Self
    where
        G: Fn(&Record) -> bool + Send + Sync + 'static,
    {
        self.unless = Some(Arc::new(guard));
        self
    }

    pub(crate) fn with_guards(mut self, when: Option<Guard>, unless: Option<Guard>) -> Self {
        self.when = when;
        self.unless = unless;
        self
    }

    pub fn kind_name(&self) -> &'static str {
        self.kind
    }

    pub fn attributes(&self) -> &[String] {
        &self.attributes
    }

    pub fn scope(&self) -> ValidateOn {
        self.on
    }

    /// Returns whether this validator runs for `record` in `context`.
    pub fn applies(&self, record: &Record, context: ValidationContext) -> bool {
        if !self.on.applies_to(context) {
            return false;
        }
        if let Some(guard) = &self.when {
            if !guard(record) {
                return false;
            }
        }
        if let Some(guard) = &self.unless {
            if guard(record) {
                return false;
            }
        }
        true
    }

    pub fn run(&self, record: &Record, context: ValidationContext, errors: &mut Errors) {
        if !self.applies(record, context) {
            return;
        }
        for attribute in &self.attributes {
            let Some(value) = record.get(attribute) else {
                continue;
            };
            (self.callback)(record, attribute.as_str(), value, errors);
        }
    }
}

impl Debug for EachValidator {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EachValidator")
            .field("kind", &self.kind)
            .field("attributes", &self.attributes)
            .field("on", &self.on)
            .field("when", &self.when.is_some())
            .field("unless", &self.unless.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::{ValidateOn, ValidationContext};

    #[test]
    fn scope_matches_context() {
        assert!(ValidateOn::Save.applies_to(ValidationContext::Create));
        assert!(ValidateOn::Save.applies_to(ValidationContext::Update));
        assert!(ValidateOn::Create.applies_to(ValidationContext::Create));
        assert!(!ValidateOn::Create.applies_to(ValidationContext::Update));
        assert!(!ValidateOn::Update.applies_to(ValidationContext::Create));
        assert!(ValidateOn::Update.applies_to(ValidationContext::Update));
    }
}
