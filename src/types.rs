use bson::{Bson, Document};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::errors::DbError;

pub type CollectionName = String;

/// A stored record. Top-level is always a BSON document.
pub type Record = Document;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Order {
    Asc,
    Desc,
}

impl Order {
    /// Native direction value: `1` ascending, `-1` descending.
    #[must_use]
    pub fn direction(self) -> i32 {
        match self {
            Self::Asc => 1,
            Self::Desc => -1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: String,
    pub order: Order,
}

impl SortSpec {
    pub fn asc(field: impl Into<String>) -> Self {
        Self { field: field.into(), order: Order::Asc }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self { field: field.into(), order: Order::Desc }
    }
}

/// Per-query options carried by the ORM query itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryOpts {
    pub offset: Option<u64>,
    pub limit: Option<i64>,
    pub sort: Option<Vec<SortSpec>>,
}

/// An ORM query: a dialect-neutral filter tree plus its options.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub filter: Document,
    #[serde(default)]
    pub opts: QueryOpts,
}

impl Query {
    pub fn new(filter: Document) -> Self {
        Self { filter, opts: QueryOpts::default() }
    }

    #[must_use]
    pub fn with_opts(mut self, opts: QueryOpts) -> Self {
        self.opts = opts;
        self
    }
}

/// Options passed to a façade call. Query-level offset/limit take precedence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OpOptions {
    pub offset: Option<u64>,
    pub limit: Option<i64>,
    /// Restrict an update to a single matched document.
    #[serde(default)]
    pub single: bool,
    pub sort: Option<Vec<SortSpec>>,
}

/// Index flags, forwarded to the driver verbatim.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexOptions {
    pub unique: Option<bool>,
    pub sparse: Option<bool>,
}

/// An ORM delta. Keys of `diff` are structural update operators.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Delta {
    pub diff: Document,
}

impl Delta {
    pub fn new(diff: Document) -> Self {
        Self { diff }
    }

    /// Builds a delta from a document of the form `{ diff: { ... } }`.
    ///
    /// # Errors
    /// Returns `InvalidDelta` when `diff` is missing or not a document.
    pub fn from_document(doc: &Document) -> Result<Self, DbError> {
        match doc.get("diff") {
            Some(Bson::Document(diff)) => Ok(Self { diff: diff.clone() }),
            Some(other) => Err(DbError::InvalidDelta(format!(
                "diff must be a document, got {:?}",
                other.element_type()
            ))),
            None => Err(DbError::InvalidDelta("missing diff".into())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDef {
    pub collection_name: CollectionName,
}

/// Models known to the host ORM, keyed by model name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelRegistry {
    models: BTreeMap<String, ModelDef>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>, collection: impl Into<String>) -> Self {
        self.register(model, collection);
        self
    }

    pub fn register(&mut self, model: impl Into<String>, collection: impl Into<String>) {
        self.models.insert(model.into(), ModelDef { collection_name: collection.into() });
    }

    pub fn get(&self, model: &str) -> Option<&ModelDef> {
        self.models.get(model)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ModelDef)> {
        self.models.iter()
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}
