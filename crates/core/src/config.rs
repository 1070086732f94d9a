use crate::error::{UpkeepError, UpkeepResult};
use serde::Deserialize;

/// Root configuration. Loaded from environment variables with the prefix
/// `UPKEEP__`; `MONGODB_URI` and `DB_NAME` are honoured as fallbacks.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub store: StoreConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Mongo,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    #[serde(default)]
    pub mongodb_uri: Option<String>,
    /// Database name; the URI's default database when unset.
    #[serde(default)]
    pub database: Option<String>,
    #[serde(default = "default_clients_collection")]
    pub clients_collection: String,
    #[serde(default = "default_reports_collection")]
    pub reports_collection: String,
    #[serde(default = "default_logs_collection")]
    pub logs_collection: String,
}

fn default_clients_collection() -> String {
    "maintenance_controls".to_string()
}
fn default_reports_collection() -> String {
    "analytics_reports".to_string()
}
fn default_logs_collection() -> String {
    "automation_logs".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            mongodb_uri: None,
            database: None,
            clients_collection: default_clients_collection(),
            reports_collection: default_reports_collection(),
            logs_collection: default_logs_collection(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the environment.
    pub fn load() -> UpkeepResult<Self> {
        let builder = config::Config::builder().add_source(
            config::Environment::with_prefix("UPKEEP")
                .separator("__")
                .try_parsing(true),
        );

        let mut config: Self = builder
            .build()
            .and_then(|c| c.try_deserialize::<Self>())
            .map_err(|e| UpkeepError::Config(e.to_string()))?;

        config.apply_fallbacks(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Fill settings the prefixed sources left unset from the plain
    /// `MONGODB_URI` / `DB_NAME` variables. Prefixed values always win.
    pub fn apply_fallbacks(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if self.store.mongodb_uri.is_none() {
            self.store.mongodb_uri = lookup("MONGODB_URI");
        }
        if self.store.database.is_none() {
            self.store.database = lookup("DB_NAME");
        }
    }

    /// Reject configurations that cannot reach a store.
    pub fn validate(&self) -> UpkeepResult<()> {
        let uri_missing = self
            .store
            .mongodb_uri
            .as_deref()
            .map_or(true, |uri| uri.trim().is_empty());

        if self.store.backend == StoreBackend::Mongo && uri_missing {
            return Err(UpkeepError::Config(
                "MONGODB_URI environment variable not set".to_string(),
            ));
        }
        Ok(())
    }
}
