//! Original attribute snapshot capture.
//!
//! # Responsibility
//! - Install one capture callback per record type that declares constancy.
//! - Copy constant attribute values into the record after each load.
//!
//! # Invariants
//! - Installation is idempotent per record type.
//! - Capture is the last load callback, so it sees the values every
//!   application hook leaves behind.
//! - Each capture replaces the previous snapshot; nothing else mutates it.

use crate::model::record::Record;
use crate::model::schema::{LoadCallback, RecordSchemaBuilder};
use crate::model::value::AttrValue;
use log::debug;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Constant attribute values observed right after a record was loaded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OriginalAttributes {
    values: BTreeMap<String, AttrValue>,
}

impl OriginalAttributes {
    pub fn get(&self, attribute: &str) -> Option<&AttrValue> {
        self.values.get(attribute)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttrValue)> {
        self.values.iter().map(|(name, value)| (name.as_str(), value))
    }
}

/// Appends the capture callback unless the type already has one.
///
/// Returns `true` when the callback was installed by this call.
pub(crate) fn install(builder: &mut RecordSchemaBuilder) -> bool {
    let callbacks = builder.load_callbacks_mut();
    if callbacks
        .iter()
        .any(LoadCallback::is_original_attribute_capture)
    {
        return false;
    }
    callbacks.push(LoadCallback::OriginalAttributeCapture);
    true
}

/// Stores the current value of every constant attribute on `record`.
pub(crate) fn capture_original_attributes(record: &mut Record) {
    let schema = Arc::clone(record.schema());
    let values: BTreeMap<String, AttrValue> = schema
        .constant_attribute_names()
        .iter()
        .map(|name| (name.clone(), record.get(name).cloned().unwrap_or_default()))
        .collect();

    debug!(
        "event=original_capture module=constancy status=ok record_type={} record_id={} attributes={}",
        schema.name(),
        record.id(),
        values.len()
    );
    record.replace_original_attributes(OriginalAttributes { values });
}
