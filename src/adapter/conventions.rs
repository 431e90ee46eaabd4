use bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

const MODEL_NAME_PLACEHOLDER: &str = "{modelName}";

/// Naming conventions the adapter publishes to the host ORM.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrmConventions {
    pub id_key: String,
    pub plural_foreign_key: String,
    pub singular_foreign_key: String,
}

impl Default for OrmConventions {
    fn default() -> Self {
        Self {
            id_key: "_id".into(),
            plural_foreign_key: "_{modelName}Ids".into(),
            singular_foreign_key: "_{modelName}Id".into(),
        }
    }
}

impl OrmConventions {
    /// Foreign key field for a relation to `model`, e.g. `_userId` / `_userIds`.
    #[must_use]
    pub fn foreign_key(&self, model: &str, plural: bool) -> String {
        let template = if plural { &self.plural_foreign_key } else { &self.singular_foreign_key };
        template.replace(MODEL_NAME_PLACEHOLDER, &lower_first(model))
    }

    /// Fresh native identifier for a new record.
    #[must_use]
    pub fn new_object_id(&self) -> ObjectId {
        ObjectId::new()
    }
}

fn lower_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) => c.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}
