//! Record use-case service.
//!
//! # Responsibility
//! - Provide save/reload entry points on top of repository CRUD.
//! - Stay storage-agnostic; all persistence goes through `RecordRepository`.
//!
//! # Invariants
//! - `save` picks create or update from the record's lifecycle state.
//! - `reload` replaces the whole instance, including its snapshot.

use crate::model::record::{Record, RecordId};
use crate::model::schema::RecordSchema;
use crate::repo::record_repo::{RecordListQuery, RecordRepository, RepoError, RepoResult};
use log::debug;
use std::sync::Arc;

/// Use-case service wrapper for record persistence.
pub struct RecordService<R: RecordRepository> {
    repo: R,
}

impl<R: RecordRepository> RecordService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Inserts a new record.
    pub fn create(&self, record: &mut Record) -> RepoResult<RecordId> {
        self.repo.create_record(record)
    }

    /// Writes changes of a persisted record.
    ///
    /// On validation failure the record keeps its rejected values and the
    /// error set, so callers can inspect or correct them.
    pub fn update(&self, record: &mut Record) -> RepoResult<()> {
        self.repo.update_record(record)
    }

    /// Creates new records and updates persisted ones.
    pub fn save(&self, record: &mut Record) -> RepoResult<RecordId> {
        if record.is_new_record() {
            return self.repo.create_record(record);
        }
        self.repo.update_record(record)?;
        Ok(record.id())
    }

    pub fn find(&self, schema: &Arc<RecordSchema>, id: RecordId) -> RepoResult<Option<Record>> {
        self.repo.find_record(schema, id)
    }

    pub fn list(
        &self,
        schema: &Arc<RecordSchema>,
        query: &RecordListQuery,
    ) -> RepoResult<Vec<Record>> {
        self.repo.list_records(schema, query)
    }

    /// Re-reads `record` from storage into the same instance.
    ///
    /// This is a load event: post-load callbacks run again and the original
    /// attribute snapshot is replaced. Unsaved changes are discarded.
    pub fn reload(&self, record: &mut Record) -> RepoResult<()> {
        if record.is_new_record() {
            return Err(RepoError::NotPersisted(record.id()));
        }
        let fresh = self
            .repo
            .find_record(record.schema(), record.id())?
            .ok_or(RepoError::NotFound(record.id()))?;
        debug!(
            "event=record_reload module=service status=ok record_type={} record_id={}",
            record.record_type(),
            record.id()
        );
        record.reload_from(fresh);
        Ok(())
    }

    pub fn delete(&self, schema: &Arc<RecordSchema>, id: RecordId) -> RepoResult<()> {
        self.repo.delete_record(schema, id)
    }
}
