pub mod config;
pub mod datastore;
mod db;
pub mod migration;
pub mod store;

pub use config::{DatabaseConfig, KnowledgeConfig, PoolConfig};
pub use datastore::{default_sqlite_path, load_or_init_config, open_store};
pub use knowledge_core::*;
pub use store::KnowledgeStore;
