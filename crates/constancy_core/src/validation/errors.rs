//! Ordered validation error set.

use std::fmt::{Display, Formatter};

/// One `(attribute, message)` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub attribute: String,
    pub message: String,
}

impl FieldError {
    /// Renders `"<Humanized attribute> <message>"`.
    pub fn full_message(&self) -> String {
        format!("{} {}", humanize(&self.attribute), self.message)
    }
}

/// Errors accumulated by one validation pass, in the order they were added.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Errors {
    entries: Vec<FieldError>,
}

impl Errors {
    pub fn add(&mut self, attribute: impl Into<String>, message: impl Into<String>) {
        self.entries.push(FieldError {
            attribute: attribute.into(),
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.entries.iter()
    }

    /// Messages recorded for `attribute`, in order.
    pub fn on(&self, attribute: &str) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|entry| entry.attribute == attribute)
            .map(|entry| entry.message.as_str())
            .collect()
    }

    /// Human-readable messages in the order errors were added.
    pub fn full_messages(&self) -> Vec<String> {
        self.entries.iter().map(FieldError::full_message).collect()
    }
}

impl Display for Errors {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.full_messages().join("; "))
    }
}

/// `social_security_number` -> `Social security number`, `invoice_id` -> `Invoice`.
pub fn humanize(attribute: &str) -> String {
    let base = attribute.strip_suffix("_id").unwrap_or(attribute);
    let spaced = base.replace('_', " ");
    let trimmed = spaced.trim();
    let mut chars = trimmed.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
