use bson::{Bson, Document};
use serde::{Deserialize, Serialize};

use super::eval::{get_path, values_equal};
use crate::errors::DbError;
use crate::types::IndexOptions;

static MISSING_KEY: Bson = Bson::Null;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDescriptor {
    pub name: String,
    pub field: String,
    pub unique: bool,
    pub sparse: bool,
}

impl IndexDescriptor {
    fn new(field: &str, opts: IndexOptions) -> Self {
        Self {
            name: format!("{field}_1"),
            field: field.to_string(),
            unique: opts.unique.unwrap_or(false),
            sparse: opts.sparse.unwrap_or(false),
        }
    }

    /// Index key of a record, `None` when a sparse index skips it.
    fn key<'a>(&self, doc: &'a Document) -> Option<&'a Bson> {
        match get_path(doc, &self.field) {
            Some(v) => Some(v),
            None if self.sparse => None,
            None => Some(&MISSING_KEY),
        }
    }
}

#[derive(Debug)]
pub(crate) struct IndexSet {
    descriptors: Vec<IndexDescriptor>,
}

impl Default for IndexSet {
    fn default() -> Self {
        Self {
            descriptors: vec![IndexDescriptor {
                name: "_id_".into(),
                field: "_id".into(),
                unique: true,
                sparse: false,
            }],
        }
    }
}

impl IndexSet {
    pub(crate) fn descriptors(&self) -> Vec<IndexDescriptor> {
        self.descriptors.clone()
    }

    /// Registers an index. Re-declaring an identical index is a no-op.
    pub(crate) fn ensure(
        &mut self,
        field: &str,
        opts: IndexOptions,
        docs: &[Document],
    ) -> Result<bool, DbError> {
        if field.is_empty() {
            return Err(DbError::Driver("index field path must not be empty".into()));
        }
        let wanted = IndexDescriptor::new(field, opts);
        if let Some(existing) = self.descriptors.iter().find(|d| d.field == field) {
            if *existing == wanted || field == "_id" {
                return Ok(false);
            }
            return Err(DbError::Driver(format!(
                "index '{}' already exists with different options",
                existing.name
            )));
        }
        if wanted.unique {
            for (i, doc) in docs.iter().enumerate() {
                check_one(&wanted, doc, docs, Some(i))?;
            }
        }
        self.descriptors.push(wanted);
        Ok(true)
    }

    /// Checks `candidate` against every unique index. `skip` excludes the
    /// candidate's own slot when it is already stored.
    pub(crate) fn check_unique(
        &self,
        candidate: &Document,
        docs: &[Document],
        skip: Option<usize>,
    ) -> Result<(), DbError> {
        self.descriptors
            .iter()
            .filter(|d| d.unique)
            .try_for_each(|d| check_one(d, candidate, docs, skip))
    }
}

fn check_one(
    index: &IndexDescriptor,
    candidate: &Document,
    docs: &[Document],
    skip: Option<usize>,
) -> Result<(), DbError> {
    let Some(key) = index.key(candidate) else {
        return Ok(());
    };
    let clash = docs
        .iter()
        .enumerate()
        .filter(|(i, _)| Some(*i) != skip)
        .filter_map(|(_, other)| index.key(other))
        .any(|other_key| values_equal(other_key, key));
    if clash {
        return Err(DbError::DuplicateKey { index: index.name.clone(), key: key.to_string() });
    }
    Ok(())
}
