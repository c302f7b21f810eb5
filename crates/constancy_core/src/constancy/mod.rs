//! Constancy validation: attributes that may not change once persisted.
//!
//! # Responsibility
//! - Provide the `validates_constancy_of` declaration on record types.
//! - Snapshot constant attribute values after each load (`capture`).
//! - Reject updates whose constant attributes differ from the snapshot
//!   (`checker`).
//!
//! # Invariants
//! - Types without a declaration get no capture callback.
//! - Repeated declarations each register an independent check; the capture
//!   callback is installed once.
//! - Checks run on update passes only and never for records without a
//!   snapshot.
//!
//! ```
//! use constancy_core::{AttrType, ConstancyRule, RecordSchema};
//!
//! let schema = RecordSchema::builder("Person")
//!     .attribute("name", AttrType::Text)
//!     .attribute("social_security_number", AttrType::Text)
//!     .validates_constancy_of(ConstancyRule::new(["social_security_number"]))
//!     .build()
//!     .unwrap();
//! assert_eq!(schema.constant_attribute_names(), ["social_security_number"]);
//! ```

pub mod capture;
pub mod checker;

pub use capture::OriginalAttributes;
pub use checker::{check_constancy, ConstancyRule, DEFAULT_CONSTANCY_MESSAGE};

use crate::model::schema::RecordSchemaBuilder;

impl RecordSchemaBuilder {
    /// Declares `rule`'s attributes constant after the first save.
    ///
    /// The check runs only when updating an already persisted record, and
    /// compares against the values captured when that record was loaded.
    pub fn validates_constancy_of(mut self, rule: ConstancyRule) -> Self {
        if !rule.attributes().is_empty() {
            self.declare_constant_attributes(rule.attributes());
            capture::install(&mut self);
        }
        self.validates_each(rule.into_validator())
    }
}
