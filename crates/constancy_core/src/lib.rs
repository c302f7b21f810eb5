//! Record store with constancy validation.
//!
//! Attributes declared with `validates_constancy_of` may not change once a
//! record has been persisted: their values are captured right after each
//! load and every update pass compares against that capture.

pub mod constancy;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod validation;

pub use constancy::{ConstancyRule, OriginalAttributes, DEFAULT_CONSTANCY_MESSAGE};
pub use logging::{default_log_level, init_logging, logging_status, LogConfig, LoggingError};
pub use model::record::{Record, RecordError, RecordId, RecordResult, RecordState};
pub use model::schema::{AttributeDef, LoadCallback, RecordSchema, RecordSchemaBuilder, SchemaError};
pub use model::value::{AttrType, AttrValue, CoercionError};
pub use repo::record_repo::{
    RecordListQuery, RecordRepository, RepoError, RepoResult, SqliteRecordRepository,
};
pub use service::record_service::RecordService;
pub use validation::{
    EachValidator, Errors, FieldError, ValidateOn, ValidationContext, ValidationFailure,
};
