//! Record repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide create/update/find/list/delete over the generic `records` table.
//! - Run the validation pipeline before every write.
//! - Treat every row read as a load event (post-load callbacks run).
//!
//! # Invariants
//! - Writes never happen while the record carries validation errors.
//! - Read paths reject undecodable rows instead of masking them.
//! - Rows are scoped by `record_type`; one schema never loads another's rows.

use crate::db::migrations::{current_version, latest_version};
use crate::db::DbError;
use crate::model::record::{Record, RecordError, RecordId};
use crate::model::schema::RecordSchema;
use crate::model::value::AttrValue;
use crate::validation::ValidationFailure;
use log::{debug, info};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use std::collections::{BTreeMap, BTreeSet};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use uuid::Uuid;

const RECORDS_TABLE: &str = "records";
const REQUIRED_COLUMNS: &[&str] = &["uuid", "record_type", "attributes", "created_at", "updated_at"];
const RECORD_SELECT_SQL: &str = "SELECT uuid, attributes FROM records";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for record persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    /// The record failed validation; nothing was written.
    Validation(ValidationFailure),
    Record(RecordError),
    Db(DbError),
    Encode(serde_json::Error),
    NotFound(RecordId),
    /// `create_record` on a record that is already persisted.
    AlreadyPersisted(RecordId),
    /// `update_record` on a record that was never inserted.
    NotPersisted(RecordId),
    InvalidData(String),
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Record(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::Encode(err) => write!(f, "failed to encode record attributes: {err}"),
            Self::NotFound(id) => write!(f, "record not found: {id}"),
            Self::AlreadyPersisted(id) => write!(f, "record already persisted: {id}"),
            Self::NotPersisted(id) => write!(f, "record not persisted yet: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted record data: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "connection schema version {actual_version} does not match expected {expected_version}; open it with open_db"
            ),
            Self::MissingRequiredTable(table) => write!(f, "missing required table `{table}`"),
            Self::MissingRequiredColumn { table, column } => {
                write!(f, "missing required column `{table}.{column}`")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Record(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::Encode(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationFailure> for RepoError {
    fn from(value: ValidationFailure) -> Self {
        Self::Validation(value)
    }
}

impl From<RecordError> for RepoError {
    fn from(value: RecordError) -> Self {
        Self::Record(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<serde_json::Error> for RepoError {
    fn from(value: serde_json::Error) -> Self {
        Self::Encode(value)
    }
}

/// Pagination for listing records of one type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordListQuery {
    pub limit: Option<u32>,
    pub offset: u32,
}

/// Repository interface for record persistence.
pub trait RecordRepository {
    /// Validates (create pass) and inserts a new record.
    fn create_record(&self, record: &mut Record) -> RepoResult<RecordId>;
    /// Validates (update pass) and writes a persisted record.
    fn update_record(&self, record: &mut Record) -> RepoResult<()>;
    /// Loads one record of `schema`'s type.
    fn find_record(&self, schema: &Arc<RecordSchema>, id: RecordId) -> RepoResult<Option<Record>>;
    /// Loads records of `schema`'s type ordered by `created_at ASC, uuid ASC`.
    fn list_records(
        &self,
        schema: &Arc<RecordSchema>,
        query: &RecordListQuery,
    ) -> RepoResult<Vec<Record>>;
    fn delete_record(&self, schema: &Arc<RecordSchema>, id: RecordId) -> RepoResult<()>;
}

/// SQLite-backed record repository.
pub struct SqliteRecordRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteRecordRepository<'conn> {
    /// Constructs a repository from a connection returned by `open_db*`.
    ///
    /// # Errors
    /// Rejects connections whose migrations were not applied or whose
    /// `records` table lacks required columns.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl RecordRepository for SqliteRecordRepository<'_> {
    fn create_record(&self, record: &mut Record) -> RepoResult<RecordId> {
        if record.is_persisted() {
            return Err(RepoError::AlreadyPersisted(record.id()));
        }
        ensure_valid(record)?;

        let attributes = encode_attributes(record)?;
        self.conn.execute(
            "INSERT INTO records (uuid, record_type, attributes) VALUES (?1, ?2, ?3);",
            params![record.id().to_string(), record.record_type(), attributes],
        )?;
        record.finish_insert();

        info!(
            "event=record_create module=repo status=ok record_type={} record_id={}",
            record.record_type(),
            record.id()
        );
        Ok(record.id())
    }

    fn update_record(&self, record: &mut Record) -> RepoResult<()> {
        if record.is_new_record() {
            return Err(RepoError::NotPersisted(record.id()));
        }
        ensure_valid(record)?;

        let attributes = encode_attributes(record)?;
        let changed = self.conn.execute(
            "UPDATE records
             SET
                attributes = ?1,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?2
               AND record_type = ?3;",
            params![attributes, record.id().to_string(), record.record_type()],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(record.id()));
        }

        info!(
            "event=record_update module=repo status=ok record_type={} record_id={}",
            record.record_type(),
            record.id()
        );
        Ok(())
    }

    fn find_record(&self, schema: &Arc<RecordSchema>, id: RecordId) -> RepoResult<Option<Record>> {
        let mut stmt = self.conn.prepare(&format!(
            "{RECORD_SELECT_SQL}
             WHERE uuid = ?1
               AND record_type = ?2;"
        ))?;

        let mut rows = stmt.query(params![id.to_string(), schema.name()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(load_record_row(schema, row)?));
        }

        Ok(None)
    }

    fn list_records(
        &self,
        schema: &Arc<RecordSchema>,
        query: &RecordListQuery,
    ) -> RepoResult<Vec<Record>> {
        let mut sql = format!("{RECORD_SELECT_SQL} WHERE record_type = ? ORDER BY created_at ASC, uuid ASC");
        let mut bind_values: Vec<Value> = vec![Value::Text(schema.name().to_string())];

        if let Some(limit) = query.limit {
            sql.push_str(" LIMIT ?");
            bind_values.push(Value::Integer(i64::from(limit)));
            if query.offset > 0 {
                sql.push_str(" OFFSET ?");
                bind_values.push(Value::Integer(i64::from(query.offset)));
            }
        } else if query.offset > 0 {
            sql.push_str(" LIMIT -1 OFFSET ?");
            bind_values.push(Value::Integer(i64::from(query.offset)));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut records = Vec::new();

        while let Some(row) = rows.next()? {
            records.push(load_record_row(schema, row)?);
        }

        Ok(records)
    }

    fn delete_record(&self, schema: &Arc<RecordSchema>, id: RecordId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM records WHERE uuid = ?1 AND record_type = ?2;",
            params![id.to_string(), schema.name()],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }

        Ok(())
    }
}

fn ensure_valid(record: &mut Record) -> RepoResult<()> {
    let context = record.validation_context();
    if record.validate() {
        return Ok(());
    }

    info!(
        "event=record_validate module=repo status=rejected record_type={} record_id={} context={:?} error_count={}",
        record.record_type(),
        record.id(),
        context,
        record.errors().len()
    );
    Err(RepoError::Validation(ValidationFailure {
        record_type: record.record_type().to_string(),
        record_id: record.id(),
        errors: record.errors().clone(),
    }))
}

fn encode_attributes(record: &Record) -> RepoResult<String> {
    let attributes: BTreeMap<&str, &AttrValue> = record.attributes().collect();
    Ok(serde_json::to_string(&attributes)?)
}

fn load_record_row(schema: &Arc<RecordSchema>, row: &Row<'_>) -> RepoResult<Record> {
    let uuid_text: String = row.get("uuid")?;
    let id = Uuid::parse_str(&uuid_text).map_err(|_| {
        RepoError::InvalidData(format!("invalid uuid value `{uuid_text}` in records.uuid"))
    })?;

    let attributes_text: String = row.get("attributes")?;
    let stored: BTreeMap<String, AttrValue> =
        serde_json::from_str(&attributes_text).map_err(|err| {
            RepoError::InvalidData(format!("invalid attributes for record {id}: {err}"))
        })?;

    let record = Record::from_storage(schema, id, stored)
        .map_err(|err| RepoError::InvalidData(format!("record {id}: {err}")))?;

    debug!(
        "event=record_load module=repo status=ok record_type={} record_id={}",
        schema.name(),
        id
    );
    Ok(record)
}

fn ensure_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version = current_version(conn)?;
    if actual_version > expected_version {
        return Err(RepoError::Db(DbError::UnsupportedSchemaVersion {
            db_version: actual_version,
            latest_supported: expected_version,
        }));
    }
    if actual_version < expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    let table_exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1);",
        [RECORDS_TABLE],
        |row| row.get(0),
    )?;
    if !table_exists {
        return Err(RepoError::MissingRequiredTable(RECORDS_TABLE));
    }

    let mut stmt = conn.prepare(&format!("PRAGMA table_info({RECORDS_TABLE});"))?;
    let columns = stmt
        .query_map([], |row| row.get::<_, String>("name"))?
        .collect::<Result<BTreeSet<_>, _>>()?;
    for column in REQUIRED_COLUMNS {
        if !columns.contains(*column) {
            return Err(RepoError::MissingRequiredColumn {
                table: RECORDS_TABLE,
                column: *column,
            });
        }
    }

    Ok(())
}
