pub mod app_config;
pub mod database;
pub mod redis_repo;
pub mod catalog_repo;
pub mod pool_repo;
pub mod fulfilment_repo;
pub mod memory;

pub use database::DbClient;
pub use redis_repo::RedisClient;
pub use catalog_repo::PostgresCatalogRepository;
pub use pool_repo::PostgresPoolRepository;
pub use fulfilment_repo::PostgresFulfilmentStore;
pub use memory::InMemoryStore;
