use std::path::{Path, PathBuf};

use knowledge_core::KnowledgeResult;

use crate::KnowledgeConfig;
use crate::KnowledgeStore;
use crate::config::DEFAULT_DB_NAME;

pub fn load_or_init_config(base: &Path) -> KnowledgeResult<KnowledgeConfig> {
    let default_sqlite = default_sqlite_path(base);
    KnowledgeConfig::load_or_init(base, &default_sqlite)
}

pub async fn open_store(base: &Path) -> KnowledgeResult<KnowledgeStore> {
    let config = load_or_init_config(base)?;
    KnowledgeStore::connect(&config, base).await
}

pub fn default_sqlite_path(base: &Path) -> PathBuf {
    base.join(DEFAULT_DB_NAME)
}
