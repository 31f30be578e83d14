use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use knowledge_core::{KnowledgeError, KnowledgeResult};

const DEFAULT_CONFIG_NAME: &str = "knowledge.json";
pub(crate) const DEFAULT_DB_NAME: &str = "knowledge.sqlite";

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum DatabaseConfig {
    Sqlite { path: Option<String> },
    Postgres { url: String },
    Mysql { url: String },
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PoolConfig {
    pub max_connections: Option<u32>,
    pub min_connections: Option<u32>,
    pub connect_timeout_ms: Option<u64>,
    pub acquire_timeout_ms: Option<u64>,
    pub idle_timeout_ms: Option<u64>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct KnowledgeConfig {
    pub database: DatabaseConfig,
    pub pool: Option<PoolConfig>,
}

impl KnowledgeConfig {
    pub fn default_sqlite(path: impl Into<String>) -> Self {
        Self {
            database: DatabaseConfig::Sqlite {
                path: Some(path.into()),
            },
            pool: None,
        }
    }

    /// Reads `knowledge.json` from `base_dir`, writing a sqlite default first if
    /// it does not exist yet.
    pub fn load_or_init(base_dir: &Path, default_sqlite_path: &Path) -> KnowledgeResult<Self> {
        fs::create_dir_all(base_dir)
            .map_err(|err| KnowledgeError::storage(format!("create config dir: {err}")))?;
        let config_path = base_dir.join(DEFAULT_CONFIG_NAME);
        if config_path.exists() {
            let raw = fs::read_to_string(&config_path)
                .map_err(|err| KnowledgeError::storage(format!("read config: {err}")))?;
            let config: KnowledgeConfig = serde_json::from_str(&raw)
                .map_err(|err| KnowledgeError::invalid(err.to_string()))?;
            return Ok(config);
        }
        let default = KnowledgeConfig::default_sqlite(default_sqlite_path.to_string_lossy());
        let payload = serde_json::to_string_pretty(&default)
            .map_err(|err| KnowledgeError::storage(format!("serialize config: {err}")))?;
        fs::write(&config_path, payload)
            .map_err(|err| KnowledgeError::storage(format!("write config: {err}")))?;
        Ok(default)
    }

    pub fn sqlite_path(&self, base_dir: &Path) -> KnowledgeResult<PathBuf> {
        match &self.database {
            DatabaseConfig::Sqlite { path } => {
                let file = Path::new(path.as_deref().unwrap_or(DEFAULT_DB_NAME));
                Ok(base_dir.join(file))
            }
            _ => Err(KnowledgeError::invalid("config is not sqlite backend")),
        }
    }

    pub fn backend_name(&self) -> &'static str {
        match self.database {
            DatabaseConfig::Sqlite { .. } => "sqlite",
            DatabaseConfig::Postgres { .. } => "postgres",
            DatabaseConfig::Mysql { .. } => "mysql",
        }
    }

    pub fn connection_url(&self) -> Option<&str> {
        match &self.database {
            DatabaseConfig::Sqlite { .. } => None,
            DatabaseConfig::Postgres { url } | DatabaseConfig::Mysql { url } => Some(url.as_str()),
        }
    }
}
