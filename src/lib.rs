pub mod adapter;
pub mod config;
pub mod driver;
pub mod errors;
pub mod info;
pub mod logger;
pub mod registry;
pub mod stream;
pub mod translate;
pub mod types;

pub use adapter::{AdapterOptions, MongoAdapter, OrmConventions, adapter_factory};
pub use config::{AdapterConfig, load_config};
pub use errors::DbError;
pub use registry::CollectionRegistry;
pub use stream::{InsertStream, ResultStream};
pub use translate::{
    NativeSort, parse_delta_json, parse_filter_json, parse_sort, parse_sort_json,
    translate_delta, translate_filter, translate_sort,
};
pub use types::{Delta, IndexOptions, ModelRegistry, OpOptions, Order, Query, QueryOpts, SortSpec};

/// Initializes logging from `log4rs.yaml` in the working directory.
///
/// Call once before the first adapter is connected.
pub fn init() -> Result<(), Box<dyn std::error::Error>> {
    logger::init()?;
    Ok(())
}
