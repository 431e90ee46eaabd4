use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use bson::doc;
use merlin_mongo::driver::mem::{MemoryConnector, MemoryStore};
use merlin_mongo::driver::{CollectionHandle, Connector, Database};
use merlin_mongo::errors::DbError;
use merlin_mongo::types::{ModelRegistry, OpOptions, Query};
use merlin_mongo::{AdapterOptions, MongoAdapter, adapter_factory};

fn models() -> ModelRegistry {
    ModelRegistry::new().with_model("User", "users").with_model("Post", "posts")
}

fn options() -> AdapterOptions {
    AdapterOptions::new("mongodb://localhost:27017/merlin").unwrap()
}

#[test]
fn options_require_a_mongodb_url() {
    assert!(AdapterOptions::new("mongodb://db.example:27017/app").is_ok());
    assert!(AdapterOptions::new("mongodb+srv://cluster.example/app").is_ok());
    for bad in ["", "   ", "postgres://localhost/db", "localhost:27017"] {
        assert!(matches!(AdapterOptions::new(bad), Err(DbError::InvalidArgument(_))), "{bad}");
    }
}

#[test]
fn factory_binds_options_then_models() {
    assert!(adapter_factory("not a url").is_err());
    let make = adapter_factory("mongodb://localhost/app").unwrap();
    let a = make(models());
    let b = make(ModelRegistry::new());
    assert_eq!(a.options().database_url(), "mongodb://localhost/app");
    assert_eq!(a.models().len(), 2);
    assert!(b.models().is_empty());
    assert!(!a.is_connected());
}

#[test]
fn conventions_are_published() {
    let adapter = MongoAdapter::new(models(), options());
    let c = adapter.conventions();
    assert_eq!(c.id_key, "_id");
    assert_eq!(c.plural_foreign_key, "_{modelName}Ids");
    assert_eq!(c.singular_foreign_key, "_{modelName}Id");
    assert_eq!(c.foreign_key("User", false), "_userId");
    assert_eq!(c.foreign_key("BlogPost", true), "_blogPostIds");
    assert_ne!(c.new_object_id(), c.new_object_id());
}

#[tokio::test]
async fn connect_creates_missing_and_opens_existing_collections() {
    let store = MemoryStore::new();
    let existing = store.create("users");
    existing.insert(doc! { "name": "seed" }).await.unwrap();

    let mut adapter = MongoAdapter::new(models(), options());
    adapter.connect(&MemoryConnector::new(store.clone())).await.unwrap();
    assert!(adapter.is_connected());
    assert_eq!(adapter.collections().names(), vec!["posts", "users"]);
    assert_eq!(store.names(), vec!["posts", "users"]);

    // The existing collection was opened, not recreated.
    let n = adapter.count("users", &OpOptions::default(), &Query::default()).unwrap().single().await.unwrap();
    assert_eq!(n, 1);
    let n = adapter.count("posts", &OpOptions::default(), &Query::default()).unwrap().single().await.unwrap();
    assert_eq!(n, 0);
}

#[tokio::test]
async fn connect_with_no_models_succeeds() {
    let mut adapter = MongoAdapter::new(ModelRegistry::new(), options());
    adapter.connect(&MemoryConnector::default()).await.unwrap();
    assert!(adapter.is_connected());
    assert!(adapter.collections().is_empty());
}

#[tokio::test]
async fn connect_twice_is_rejected() {
    let connector = MemoryConnector::default();
    let mut adapter = MongoAdapter::new(models(), options());
    adapter.connect(&connector).await.unwrap();
    assert!(matches!(adapter.connect(&connector).await, Err(DbError::InvalidArgument(_))));
    assert!(adapter.is_connected());
}

#[tokio::test]
async fn close_clears_the_registry() {
    let mut adapter = MongoAdapter::new(models(), options());
    adapter.connect(&MemoryConnector::default()).await.unwrap();
    adapter.close().await.unwrap();
    assert!(!adapter.is_connected());
    assert!(adapter.collections().is_empty());
    assert!(matches!(
        adapter.find("users", &OpOptions::default(), &Query::default()),
        Err(DbError::NoSuchCollection(_))
    ));
    // Closing again, or before connecting, is a no-op.
    adapter.close().await.unwrap();
    MongoAdapter::new(models(), options()).close().await.unwrap();
}

struct BrokenDatabase {
    closed: Arc<AtomicBool>,
}

#[async_trait]
impl Database for BrokenDatabase {
    async fn list_collection_names(&self) -> Result<Vec<String>, DbError> {
        Ok(vec!["posts".into()])
    }

    async fn create_collection(&self, name: &str) -> Result<Arc<dyn CollectionHandle>, DbError> {
        Err(DbError::Driver(format!("cannot create {name}")))
    }

    async fn collection(&self, name: &str) -> Result<Arc<dyn CollectionHandle>, DbError> {
        Ok(MemoryStore::new().create(name))
    }

    async fn close(&self) -> Result<(), DbError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

struct BrokenConnector {
    closed: Arc<AtomicBool>,
    refuse: bool,
}

#[async_trait]
impl Connector for BrokenConnector {
    async fn connect(&self, database_url: &str) -> Result<Box<dyn Database>, DbError> {
        if self.refuse {
            return Err(DbError::Driver(format!("connection refused: {database_url}")));
        }
        Ok(Box::new(BrokenDatabase { closed: self.closed.clone() }))
    }
}

#[tokio::test]
async fn bootstrap_failure_leaves_adapter_disconnected() {
    let closed = Arc::new(AtomicBool::new(false));
    let connector = BrokenConnector { closed: closed.clone(), refuse: false };
    let mut adapter = MongoAdapter::new(models(), options());
    let err = adapter.connect(&connector).await.unwrap_err();
    assert!(matches!(err, DbError::Driver(msg) if msg.contains("users")));
    assert!(!adapter.is_connected());
    assert!(adapter.collections().is_empty());
    assert!(closed.load(Ordering::SeqCst));
}

#[tokio::test]
async fn connection_failure_is_returned() {
    let closed = Arc::new(AtomicBool::new(false));
    let connector = BrokenConnector { closed: closed.clone(), refuse: true };
    let mut adapter = MongoAdapter::new(models(), options());
    assert!(matches!(adapter.connect(&connector).await, Err(DbError::Driver(_))));
    assert!(!adapter.is_connected());
    assert!(!closed.load(Ordering::SeqCst));
}

#[tokio::test]
async fn failed_bootstrap_keeps_attached_handles() {
    let closed = Arc::new(AtomicBool::new(false));
    let connector = BrokenConnector { closed: closed.clone(), refuse: false };
    let mut adapter = MongoAdapter::new(models(), options());
    adapter.attach_collection("audit", MemoryStore::new().create("audit"));

    assert!(adapter.connect(&connector).await.is_err());
    assert_eq!(adapter.collections().names(), vec!["audit"]);
    assert!(closed.load(Ordering::SeqCst));

    adapter.connect(&MemoryConnector::default()).await.unwrap();
    assert_eq!(adapter.collections().names(), vec!["audit", "posts", "users"]);
}
