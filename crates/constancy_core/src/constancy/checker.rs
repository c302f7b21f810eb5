//! Update-time comparison of constant attributes against their snapshot.

use crate::model::record::Record;
use crate::model::value::AttrValue;
use crate::validation::{EachValidator, Errors, Guard, ValidateOn};
use log::info;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

/// Message recorded when no custom message is configured.
pub const DEFAULT_CONSTANCY_MESSAGE: &str = "can't be changed";

/// One constancy declaration: attributes plus message and guards.
#[derive(Clone)]
pub struct ConstancyRule {
    attributes: Vec<String>,
    message: String,
    when: Option<Guard>,
    unless: Option<Guard>,
}

impl ConstancyRule {
    pub fn new<I, S>(attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            attributes: attributes.into_iter().map(Into::into).collect(),
            message: DEFAULT_CONSTANCY_MESSAGE.to_string(),
            when: None,
            unless: None,
        }
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Only check records for which `guard` returns `true`.
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

    pub fn attributes(&self) -> &[String] {
        &self.attributes
    }

    pub fn message_text(&self) -> &str {
        &self.message
    }

    /// Converts the declaration into an update-scoped validator.
    pub(crate) fn into_validator(self) -> EachValidator {
        let message = self.message;
        EachValidator::new(self.attributes, move |record, attribute, value, errors| {
            check_constancy(record, attribute, value, &message, errors);
        })
        .kind("constancy")
        .on(ValidateOn::Update)
        .with_guards(self.when, self.unless)
    }
}

impl Debug for ConstancyRule {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConstancyRule")
            .field("attributes", &self.attributes)
            .field("message", &self.message)
            .field("when", &self.when.is_some())
            .field("unless", &self.unless.is_some())
            .finish()
    }
}

/// Adds `message` for `attribute` when `value` differs from the snapshot.
///
/// Records without a snapshot are never persisted-and-loaded, so there is
/// nothing to compare and no error is added.
pub fn check_constancy(
    record: &Record,
    attribute: &str,
    value: &AttrValue,
    message: &str,
    errors: &mut Errors,
) {
    let Some(originals) = record.original_attributes() else {
        return;
    };
    let unchanged = match originals.get(attribute) {
        Some(original) => value == original,
        None => value.is_null(),
    };
    if unchanged {
        return;
    }

    info!(
        "event=constancy_violation module=constancy status=rejected record_type={} record_id={} attribute={}",
        record.record_type(),
        record.id(),
        attribute
    );
    errors.add(attribute, message);
}
