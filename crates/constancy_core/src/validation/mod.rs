//! Record validation pipeline.
//!
//! # Responsibility
//! - Run a record type's validators for a create or update pass.
//! - Accumulate `(attribute, message)` errors instead of failing fast.
//!
//! # Invariants
//! - Each pass starts from an empty error set.
//! - Errors appear in validator registration order, then attribute order.
//! - Validators never abort a pass; callers decide whether to persist.

pub mod errors;
pub mod validator;

pub use errors::{humanize, Errors, FieldError};
pub use validator::{EachCallback, EachValidator, Guard, ValidateOn, ValidationContext};

use crate::model::record::RecordId;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Default message of `validates_presence_of`.
pub const PRESENCE_MESSAGE: &str = "can't be blank";

/// Write refused because the record failed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationFailure {
    pub record_type: String,
    pub record_id: RecordId,
    pub errors: Errors,
}

impl Display for ValidationFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} is invalid: {}",
            self.record_type, self.record_id, self.errors
        )
    }
}

impl Error for ValidationFailure {}
