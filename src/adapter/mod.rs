//! The adapter: connection lifecycle, the collection registry it owns, and
//! the operation façade (see `ops`).

mod conventions;
mod ops;

pub use conventions::OrmConventions;

use std::sync::Arc;

use crate::driver::{CollectionHandle, Connector, Database};
use crate::errors::DbError;
use crate::logger::AUDIT_TARGET;
use crate::registry::CollectionRegistry;
use crate::types::ModelRegistry;

const URL_SCHEMES: &[&str] = &["mongodb://", "mongodb+srv://"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterOptions {
    database_url: String,
}

impl AdapterOptions {
    /// # Errors
    /// Returns `InvalidArgument` when the URL is empty or not a MongoDB URL.
    pub fn new(database_url: impl Into<String>) -> Result<Self, DbError> {
        let database_url = database_url.into();
        if database_url.trim().is_empty() {
            return Err(DbError::InvalidArgument("database_url must not be empty".into()));
        }
        if !URL_SCHEMES.iter().any(|s| database_url.starts_with(s)) {
            return Err(DbError::InvalidArgument(format!(
                "database_url must start with one of {URL_SCHEMES:?}: {database_url}"
            )));
        }
        Ok(Self { database_url })
    }

    pub fn database_url(&self) -> &str {
        &self.database_url
    }
}

pub struct MongoAdapter {
    models: ModelRegistry,
    opts: AdapterOptions,
    conventions: OrmConventions,
    collections: CollectionRegistry,
    db: Option<Box<dyn Database>>,
}

impl std::fmt::Debug for MongoAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MongoAdapter")
            .field("opts", &self.opts)
            .field("models", &self.models.len())
            .field("collections", &self.collections)
            .field("connected", &self.db.is_some())
            .finish()
    }
}

/// Two-stage factory: options first, then the host ORM's model registry.
///
/// # Errors
/// Returns `InvalidArgument` when `database_url` is unusable.
pub fn adapter_factory(
    database_url: &str,
) -> Result<impl Fn(ModelRegistry) -> MongoAdapter, DbError> {
    let opts = AdapterOptions::new(database_url)?;
    Ok(move |models| MongoAdapter::new(models, opts.clone()))
}

impl MongoAdapter {
    pub fn new(models: ModelRegistry, opts: AdapterOptions) -> Self {
        Self {
            models,
            opts,
            conventions: OrmConventions::default(),
            collections: CollectionRegistry::new(),
            db: None,
        }
    }

    pub fn options(&self) -> &AdapterOptions {
        &self.opts
    }

    pub fn models(&self) -> &ModelRegistry {
        &self.models
    }

    pub fn conventions(&self) -> &OrmConventions {
        &self.conventions
    }

    pub fn collections(&self) -> &CollectionRegistry {
        &self.collections
    }

    pub fn is_connected(&self) -> bool {
        self.db.is_some()
    }

    /// Registers a handle directly, for hosts that open collections themselves.
    /// `close` drops these along with the bootstrapped handles.
    pub fn attach_collection(&mut self, name: impl Into<String>, handle: Arc<dyn CollectionHandle>) {
        self.collections.insert(name, handle);
    }

    /// Connects and opens one handle per registered model, creating the
    /// collections that do not exist yet. Handles are registered only once
    /// every model has been opened; the first failure aborts bootstrap, closes
    /// the connection and leaves the registry as it was.
    ///
    /// # Errors
    /// Returns the first connection or collection error.
    pub async fn connect(&mut self, connector: &dyn Connector) -> Result<(), DbError> {
        if self.db.is_some() {
            return Err(DbError::InvalidArgument("adapter is already connected".into()));
        }
        let db = connector.connect(self.opts.database_url()).await?;
        match self.open_collections(db.as_ref()).await {
            Ok(opened) => {
                for (name, handle) in opened {
                    self.collections.insert(name, handle);
                }
                log::info!(
                    target: AUDIT_TARGET,
                    "connected to {} with {} collection(s)",
                    self.opts.database_url(),
                    self.collections.len()
                );
                self.db = Some(db);
                Ok(())
            }
            Err(e) => {
                log::warn!(target: AUDIT_TARGET, "bootstrap failed: {e}");
                if let Err(close_err) = db.close().await {
                    log::warn!(target: AUDIT_TARGET, "close after failed bootstrap: {close_err}");
                }
                Err(e)
            }
        }
    }

    async fn open_collections(
        &self,
        db: &dyn Database,
    ) -> Result<Vec<(String, Arc<dyn CollectionHandle>)>, DbError> {
        let existing = db.list_collection_names().await?;
        let mut opened = Vec::with_capacity(self.models.len());
        for (model, def) in self.models.iter() {
            let name = &def.collection_name;
            let handle = if existing.contains(name) {
                db.collection(name).await?
            } else {
                log::info!(target: AUDIT_TARGET, "creating collection {name} for model {model}");
                db.create_collection(name).await?
            };
            opened.push((name.clone(), handle));
        }
        Ok(opened)
    }

    /// Clears the registry and closes the connection. A no-op when not connected.
    ///
    /// # Errors
    /// Returns the driver's close error.
    pub async fn close(&mut self) -> Result<(), DbError> {
        self.collections.clear();
        let Some(db) = self.db.take() else {
            return Ok(());
        };
        log::info!(target: AUDIT_TARGET, "closing {}", self.opts.database_url());
        db.close().await
    }
}
