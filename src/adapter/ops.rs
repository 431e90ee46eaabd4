//! Operation façade: count, find, insert, update, remove and index against a
//! registered collection.
//!
//! Preconditions (unknown collection, malformed filter, sort or delta) fail the
//! call itself. Driver calls run on a spawned task and report through the
//! returned stream, where an error is the last item.

use std::future::Future;
use std::sync::Arc;

use bson::Document;
use tokio::runtime::Handle;
use tokio::sync::mpsc;

use super::MongoAdapter;
use crate::driver::{CollectionHandle, ReadWindow, UpdateOptions};
use crate::errors::DbError;
use crate::logger::OPS_TARGET;
use crate::stream::{InsertStream, ResultStream, STREAM_BUFFER, StreamSender};
use crate::translate::{translate_delta, translate_filter, translate_sort};
use crate::types::{Delta, IndexOptions, OpOptions, Query};

fn runtime() -> Result<Handle, DbError> {
    Handle::try_current()
        .map_err(|e| DbError::InvalidArgument(format!("no tokio runtime available: {e}")))
}

/// Query-level skip/limit first, then the call options.
fn read_window(opts: &OpOptions, query: &Query) -> ReadWindow {
    ReadWindow {
        skip: query.opts.offset.or(opts.offset),
        limit: query.opts.limit.or(opts.limit),
    }
}

/// Spawns a task that delivers a single value then closes the stream.
fn spawn_single<F>(rt: &Handle, op: &'static str, collection: String, fut: F) -> ResultStream<u64>
where
    F: Future<Output = Result<u64, DbError>> + Send + 'static,
{
    let (tx, stream) = ResultStream::channel(1);
    rt.spawn(async move {
        match fut.await {
            Ok(n) => {
                log::debug!(target: OPS_TARGET, "{op} {collection}: {n}");
                tx.push(n).await;
            }
            Err(e) => {
                log::warn!(target: OPS_TARGET, "{op} {collection} failed: {e}");
                tx.fail(e).await;
            }
        }
    });
    stream
}

impl MongoAdapter {
    fn handle(&self, collection: &str) -> Result<Arc<dyn CollectionHandle>, DbError> {
        self.collections.get(collection)
    }

    /// Counts matching records; the stream yields one value.
    ///
    /// # Errors
    /// Returns precondition failures synchronously.
    pub fn count(
        &self,
        collection: &str,
        opts: &OpOptions,
        query: &Query,
    ) -> Result<ResultStream<u64>, DbError> {
        let handle = self.handle(collection)?;
        let filter = translate_filter(&query.filter)?;
        let window = read_window(opts, query);
        let rt = runtime()?;
        log::debug!(target: OPS_TARGET, "count {collection} filter={filter} window={window:?}");
        Ok(spawn_single(&rt, "count", collection.to_string(), async move {
            handle.count(filter, window).await
        }))
    }

    /// Streams matching records in cursor order.
    ///
    /// The sort comes from the query, falling back to `opts.sort`.
    ///
    /// # Errors
    /// Returns precondition failures synchronously.
    pub fn find(
        &self,
        collection: &str,
        opts: &OpOptions,
        query: &Query,
    ) -> Result<ResultStream<Document>, DbError> {
        let handle = self.handle(collection)?;
        let filter = translate_filter(&query.filter)?;
        let sort = translate_sort(query.opts.sort.as_deref().or(opts.sort.as_deref()));
        let window = read_window(opts, query);
        let rt = runtime()?;
        log::debug!(
            target: OPS_TARGET,
            "find {collection} filter={filter} sort={sort:?} window={window:?}"
        );
        let (tx, stream) = ResultStream::channel(STREAM_BUFFER);
        let name = collection.to_string();
        rt.spawn(async move {
            let mut cursor = match handle.find(filter, sort, window).await {
                Ok(cursor) => cursor,
                Err(e) => {
                    log::warn!(target: OPS_TARGET, "find {name} failed: {e}");
                    tx.fail(e).await;
                    return;
                }
            };
            let mut emitted = 0u64;
            loop {
                match cursor.next_record().await {
                    Ok(Some(record)) => {
                        if !tx.push(record).await {
                            log::debug!(target: OPS_TARGET, "find {name}: reader dropped after {emitted}");
                            return;
                        }
                        emitted += 1;
                    }
                    Ok(None) => break,
                    Err(e) => {
                        log::warn!(target: OPS_TARGET, "find {name} cursor failed after {emitted}: {e}");
                        tx.fail(e).await;
                        return;
                    }
                }
            }
            log::debug!(target: OPS_TARGET, "find {name}: {emitted} record(s)");
        });
        Ok(stream)
    }

    /// Opens a duplex insert stream. Each written record is inserted on its
    /// own and the stored record is emitted in submission order. Writers are
    /// held back once the input and output buffers are full. A failed
    /// insert is emitted as the final item and aborts the stream; records
    /// queued behind it are dropped.
    ///
    /// # Errors
    /// Returns `NoSuchCollection` synchronously.
    pub fn insert(&self, collection: &str, _opts: &OpOptions) -> Result<InsertStream, DbError> {
        let handle = self.handle(collection)?;
        let rt = runtime()?;
        let (input, pending) = mpsc::channel::<Document>(STREAM_BUFFER);
        let (tx, output) = ResultStream::channel(STREAM_BUFFER);
        let name = collection.to_string();
        rt.spawn(insert_worker(handle, name, pending, tx));
        Ok(InsertStream::new(input, output))
    }

    /// Updates matching records; the stream yields the modified count.
    /// Every match is updated unless `opts.single` is set.
    ///
    /// # Errors
    /// Returns precondition failures synchronously.
    pub fn update(
        &self,
        collection: &str,
        opts: &OpOptions,
        query: &Query,
        delta: &Delta,
    ) -> Result<ResultStream<u64>, DbError> {
        let handle = self.handle(collection)?;
        let filter = translate_filter(&query.filter)?;
        let native = translate_delta(delta)?;
        let update_opts = UpdateOptions { multi: !opts.single };
        let rt = runtime()?;
        log::debug!(
            target: OPS_TARGET,
            "update {collection} filter={filter} delta={native} multi={}",
            update_opts.multi
        );
        Ok(spawn_single(&rt, "update", collection.to_string(), async move {
            handle.update(filter, native, update_opts).await
        }))
    }

    /// Removes matching records; the stream yields the removed count.
    ///
    /// # Errors
    /// Returns precondition failures synchronously.
    pub fn remove(
        &self,
        collection: &str,
        _opts: &OpOptions,
        query: &Query,
    ) -> Result<ResultStream<u64>, DbError> {
        let handle = self.handle(collection)?;
        let filter = translate_filter(&query.filter)?;
        let rt = runtime()?;
        log::debug!(target: OPS_TARGET, "remove {collection} filter={filter}");
        Ok(spawn_single(&rt, "remove", collection.to_string(), async move {
            handle.remove(filter).await
        }))
    }

    /// Ensures an index on `field_path`. The flags reach the driver unchanged.
    ///
    /// # Errors
    /// Returns `NoSuchCollection` or the driver's failure.
    pub async fn index(
        &self,
        collection: &str,
        opts: IndexOptions,
        field_path: &str,
    ) -> Result<(), DbError> {
        let handle = self.handle(collection)?;
        log::debug!(target: OPS_TARGET, "index {collection}.{field_path} opts={opts:?}");
        handle.ensure_index(field_path, opts).await.inspect_err(|e| {
            log::warn!(target: OPS_TARGET, "index {collection}.{field_path} failed: {e}");
        })
    }
}

async fn insert_worker(
    handle: Arc<dyn CollectionHandle>,
    name: String,
    mut pending: mpsc::Receiver<Document>,
    tx: StreamSender<Document>,
) {
    let mut inserted = 0u64;
    while let Some(record) = pending.recv().await {
        let stored = match handle.insert(record).await {
            Ok(docs) => docs.into_iter().next().ok_or_else(|| {
                DbError::Driver(format!("insert into {name} returned no record"))
            }),
            Err(e) => Err(e),
        };
        match stored {
            Ok(doc) => {
                if !tx.push(doc).await {
                    log::debug!(target: OPS_TARGET, "insert {name}: reader dropped after {inserted}");
                    return;
                }
                inserted += 1;
            }
            Err(e) => {
                log::warn!(target: OPS_TARGET, "insert {name} failed after {inserted}: {e}");
                tx.fail(e).await;
                return;
            }
        }
    }
    log::debug!(target: OPS_TARGET, "insert {name}: {inserted} record(s)");
}
