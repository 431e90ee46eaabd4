//! Uniform result streams returned by the operation façade.
//!
//! A producer task owns the sending half and delivers items in driver order.
//! An `Err` item is terminal: the producer stops and the stream reports
//! `None` afterwards.

use bson::Document;
use futures::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;

use crate::errors::DbError;

/// Buffer between a producer task and its reader.
pub const STREAM_BUFFER: usize = 64;

pub struct ResultStream<T> {
    rx: mpsc::Receiver<Result<T, DbError>>,
    done: bool,
}

impl<T> std::fmt::Debug for ResultStream<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultStream").field("done", &self.done).finish_non_exhaustive()
    }
}

/// Producer half of a [`ResultStream`].
pub(crate) struct StreamSender<T> {
    tx: mpsc::Sender<Result<T, DbError>>,
}

impl<T> StreamSender<T> {
    /// Delivers one item. Returns `false` once the reader has gone away.
    pub(crate) async fn push(&self, item: T) -> bool {
        self.tx.send(Ok(item)).await.is_ok()
    }

    /// Delivers the terminal error and closes the stream.
    pub(crate) async fn fail(self, err: DbError) {
        let _ = self.tx.send(Err(err)).await;
    }
}

impl<T> ResultStream<T> {
    pub(crate) fn channel(capacity: usize) -> (StreamSender<T>, Self) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (StreamSender { tx }, Self { rx, done: false })
    }

    /// Next item; `None` once the stream has closed or failed.
    pub async fn next(&mut self) -> Option<Result<T, DbError>> {
        if self.done {
            return None;
        }
        let item = self.rx.recv().await;
        self.observe(item)
    }

    /// Drains the stream, stopping at the first error.
    ///
    /// # Errors
    /// Returns the stream's terminal error, if any.
    pub async fn collect_all(mut self) -> Result<Vec<T>, DbError> {
        let mut out = Vec::new();
        while let Some(item) = self.next().await {
            out.push(item?);
        }
        Ok(out)
    }

    /// Reads a single-value stream (count, update, remove).
    ///
    /// # Errors
    /// Returns the stream's error, or `Driver` when it closed without a value.
    pub async fn single(mut self) -> Result<T, DbError> {
        match self.next().await {
            Some(item) => item,
            None => Err(DbError::Driver("stream closed without a result".into())),
        }
    }

    fn observe(&mut self, item: Option<Result<T, DbError>>) -> Option<Result<T, DbError>> {
        match item {
            Some(Ok(v)) => Some(Ok(v)),
            Some(Err(e)) => {
                self.done = true;
                self.rx.close();
                Some(Err(e))
            }
            None => {
                self.done = true;
                None
            }
        }
    }
}

impl<T> Stream for ResultStream<T> {
    type Item = Result<T, DbError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.done {
            return Poll::Ready(None);
        }
        match this.rx.poll_recv(cx) {
            Poll::Ready(item) => Poll::Ready(this.observe(item)),
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Duplex insert stream: records written to the input side are inserted one
/// at a time and the stored records come back on the output side, in
/// submission order.
///
/// Both sides are bounded. Once the reader stops draining the output,
/// `write` waits until there is room again.
pub struct InsertStream {
    input: Option<mpsc::Sender<Document>>,
    output: ResultStream<Document>,
}

impl std::fmt::Debug for InsertStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InsertStream")
            .field("ended", &self.input.is_none())
            .field("output", &self.output)
            .finish()
    }
}

impl InsertStream {
    pub(crate) fn new(input: mpsc::Sender<Document>, output: ResultStream<Document>) -> Self {
        Self { input: Some(input), output }
    }

    /// Queues a record for insertion, waiting while the input buffer is full.
    ///
    /// # Errors
    /// Returns `Driver` after `end()` or once an earlier insert has failed.
    pub async fn write(&self, record: Document) -> Result<(), DbError> {
        let input = self
            .input
            .as_ref()
            .ok_or_else(|| DbError::Driver("insert stream already ended".into()))?;
        input.send(record).await.map_err(|_| DbError::Driver("insert stream aborted".into()))
    }

    /// Closes the input side; the output closes after the queued inserts.
    pub fn end(&mut self) {
        self.input = None;
    }

    pub async fn next(&mut self) -> Option<Result<Document, DbError>> {
        self.output.next().await
    }

    /// Ends the input side and drains every inserted record.
    ///
    /// # Errors
    /// Returns the first insert failure.
    pub async fn collect_all(mut self) -> Result<Vec<Document>, DbError> {
        self.end();
        self.output.collect_all().await
    }
}

impl Stream for InsertStream {
    type Item = Result<Document, DbError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.get_mut().output).poll_next(cx)
    }
}
