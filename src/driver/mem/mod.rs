//! Embedded in-memory storage engine that understands the native operator
//! syntax produced by the translators. Used as a reference backend and as a
//! test double for the adapter.

mod eval;
mod index;
mod update;

pub use index::IndexDescriptor;

use async_trait::async_trait;
use bson::oid::ObjectId;
use bson::{Document, doc};
use parking_lot::RwLock;
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use super::{CollectionHandle, Connector, Database, ReadWindow, RecordCursor, UpdateOptions};
use crate::errors::DbError;
use crate::translate::NativeSort;
use crate::types::IndexOptions;
use eval::{compare_docs, compile_filter, eval_filter};
use index::IndexSet;
use update::apply_update;

pub struct MemoryCollection {
    name: String,
    docs: RwLock<Vec<Document>>,
    indexes: RwLock<IndexSet>,
}

impl std::fmt::Debug for MemoryCollection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryCollection")
            .field("name", &self.name)
            .field("docs", &self.docs.read().len())
            .finish()
    }
}

impl MemoryCollection {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            docs: RwLock::new(Vec::new()),
            indexes: RwLock::new(IndexSet::default()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Copies the stored records in insertion order.
    pub fn snapshot(&self) -> Vec<Document> {
        self.docs.read().clone()
    }

    pub fn len(&self) -> usize {
        self.docs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.read().is_empty()
    }

    pub fn indexes(&self) -> Vec<IndexDescriptor> {
        self.indexes.read().descriptors()
    }

    fn matching(&self, filter: &Document) -> Result<Vec<Document>, DbError> {
        let compiled = compile_filter(filter)?;
        Ok(self.docs.read().iter().filter(|d| eval_filter(d, &compiled)).cloned().collect())
    }
}

fn window_bounds(window: ReadWindow) -> (usize, usize) {
    let skip = usize::try_from(window.skip.unwrap_or(0)).unwrap_or(usize::MAX);
    // A zero limit means "no limit"; a negative one is read as its magnitude.
    let limit = match window.limit {
        Some(l) if l != 0 => usize::try_from(l.unsigned_abs()).unwrap_or(usize::MAX),
        _ => usize::MAX,
    };
    (skip, limit)
}

#[async_trait]
impl CollectionHandle for MemoryCollection {
    async fn count(&self, filter: Document, window: ReadWindow) -> Result<u64, DbError> {
        let matched = self.matching(&filter)?.len();
        let (skip, limit) = window_bounds(window);
        let n = matched.saturating_sub(skip).min(limit);
        Ok(u64::try_from(n).unwrap_or(u64::MAX))
    }

    async fn find(
        &self,
        filter: Document,
        sort: Option<NativeSort>,
        window: ReadWindow,
    ) -> Result<Box<dyn RecordCursor>, DbError> {
        let mut docs = self.matching(&filter)?;
        if let Some(sort) = &sort {
            docs.sort_by(|a, b| compare_docs(a, b, sort.pairs()));
        }
        let (skip, limit) = window_bounds(window);
        let pending = docs.into_iter().skip(skip).take(limit).collect();
        Ok(Box::new(MemoryCursor { pending }))
    }

    async fn insert(&self, record: Document) -> Result<Vec<Document>, DbError> {
        let record = if record.contains_key("_id") {
            record
        } else {
            let mut with_id = doc! { "_id": ObjectId::new() };
            for (k, v) in record {
                with_id.insert(k, v);
            }
            with_id
        };
        let mut docs = self.docs.write();
        self.indexes.read().check_unique(&record, &docs, None)?;
        docs.push(record.clone());
        Ok(vec![record])
    }

    async fn update(
        &self,
        filter: Document,
        delta: Document,
        opts: UpdateOptions,
    ) -> Result<u64, DbError> {
        let compiled = compile_filter(&filter)?;
        let mut docs = self.docs.write();
        let indexes = self.indexes.read();
        let mut modified = 0u64;
        for i in 0..docs.len() {
            if !eval_filter(&docs[i], &compiled) {
                continue;
            }
            let mut next = docs[i].clone();
            if apply_update(&mut next, &delta)? {
                indexes.check_unique(&next, &docs, Some(i))?;
                docs[i] = next;
                modified += 1;
            }
            if !opts.multi {
                break;
            }
        }
        Ok(modified)
    }

    async fn remove(&self, filter: Document) -> Result<u64, DbError> {
        let compiled = compile_filter(&filter)?;
        let mut docs = self.docs.write();
        let before = docs.len();
        docs.retain(|d| !eval_filter(d, &compiled));
        Ok(u64::try_from(before - docs.len()).unwrap_or(u64::MAX))
    }

    async fn ensure_index(&self, field_path: &str, opts: IndexOptions) -> Result<(), DbError> {
        let docs = self.docs.read();
        let created = self.indexes.write().ensure(field_path, opts, &docs)?;
        if created {
            log::debug!("memory index created on {}.{}", self.name, field_path);
        }
        Ok(())
    }
}

pub struct MemoryCursor {
    pending: VecDeque<Document>,
}

#[async_trait]
impl RecordCursor for MemoryCursor {
    async fn next_record(&mut self) -> Result<Option<Document>, DbError> {
        Ok(self.pending.pop_front())
    }
}

/// Shared storage behind every connection opened by a [`MemoryConnector`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<BTreeMap<String, Arc<MemoryCollection>>>,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Returns the named collection, creating it when missing.
    pub fn create(&self, name: &str) -> Arc<MemoryCollection> {
        self.collections
            .write()
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(MemoryCollection::new(name)))
            .clone()
    }

    pub fn get(&self, name: &str) -> Option<Arc<MemoryCollection>> {
        self.collections.read().get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        self.collections.read().keys().cloned().collect()
    }
}

#[derive(Debug, Clone)]
pub struct MemoryConnector {
    store: Arc<MemoryStore>,
}

impl Default for MemoryConnector {
    fn default() -> Self {
        Self::new(MemoryStore::new())
    }
}

impl MemoryConnector {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> Arc<MemoryStore> {
        self.store.clone()
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn connect(&self, database_url: &str) -> Result<Box<dyn Database>, DbError> {
        log::info!("memory engine connected for {database_url}");
        Ok(Box::new(MemoryDatabase {
            store: self.store.clone(),
            closed: AtomicBool::new(false),
        }))
    }
}

#[derive(Debug)]
pub struct MemoryDatabase {
    store: Arc<MemoryStore>,
    closed: AtomicBool,
}

impl MemoryDatabase {
    fn ensure_open(&self) -> Result<(), DbError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(DbError::Driver("connection closed".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl Database for MemoryDatabase {
    async fn list_collection_names(&self) -> Result<Vec<String>, DbError> {
        self.ensure_open()?;
        Ok(self.store.names())
    }

    async fn create_collection(&self, name: &str) -> Result<Arc<dyn CollectionHandle>, DbError> {
        self.ensure_open()?;
        if self.store.get(name).is_some() {
            return Err(DbError::Driver(format!("collection already exists: {name}")));
        }
        Ok(self.store.create(name))
    }

    async fn collection(&self, name: &str) -> Result<Arc<dyn CollectionHandle>, DbError> {
        self.ensure_open()?;
        Ok(self.store.create(name))
    }

    async fn close(&self) -> Result<(), DbError> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}
