//! Storage-driver seam: the calls the adapter issues against a collection handle,
//! and the bootstrap calls used to open handles.

pub mod mem;

use async_trait::async_trait;
use bson::Document;
use std::sync::Arc;

use crate::errors::DbError;
use crate::translate::NativeSort;
use crate::types::IndexOptions;

/// Skip/limit window for reads and counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadWindow {
    pub skip: Option<u64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateOptions {
    pub multi: bool,
}

/// Forward-only cursor. `Ok(None)` marks the end of results.
#[async_trait]
pub trait RecordCursor: Send {
    async fn next_record(&mut self) -> Result<Option<Document>, DbError>;
}

/// An open collection on the storage engine.
#[async_trait]
pub trait CollectionHandle: Send + Sync {
    async fn count(&self, filter: Document, window: ReadWindow) -> Result<u64, DbError>;

    async fn find(
        &self,
        filter: Document,
        sort: Option<NativeSort>,
        window: ReadWindow,
    ) -> Result<Box<dyn RecordCursor>, DbError>;

    /// Returns the stored record(s); drivers return exactly one for a single insert.
    async fn insert(&self, record: Document) -> Result<Vec<Document>, DbError>;

    async fn update(
        &self,
        filter: Document,
        delta: Document,
        opts: UpdateOptions,
    ) -> Result<u64, DbError>;

    async fn remove(&self, filter: Document) -> Result<u64, DbError>;

    async fn ensure_index(&self, field_path: &str, opts: IndexOptions) -> Result<(), DbError>;
}

/// A connected database.
#[async_trait]
pub trait Database: Send + Sync {
    async fn list_collection_names(&self) -> Result<Vec<String>, DbError>;

    async fn create_collection(&self, name: &str) -> Result<Arc<dyn CollectionHandle>, DbError>;

    async fn collection(&self, name: &str) -> Result<Arc<dyn CollectionHandle>, DbError>;

    async fn close(&self) -> Result<(), DbError>;
}

#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, database_url: &str) -> Result<Box<dyn Database>, DbError>;
}
