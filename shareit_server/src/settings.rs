use serde::Deserialize;

use crate::repository::PostgresShareItRepositoryConfig;

/// Server settings read from the environment:
/// `USE_IN_MEMORY_DB`, `DB_HOST`, `DB_USERNAME`, `DB_PASSWORD`, `PORT`
#[derive(Debug, Clone, Deserialize, Eq, PartialEq)]
pub struct AppSettings {
    pub use_in_memory_db: bool,
    pub db_host: String,
    pub db_username: String,
    pub db_password: String,
    pub port: u16,
}

impl AppSettings {
    pub fn from_env() -> Result<Self, config::ConfigError> {
        Self::from_source(config::Environment::default().try_parsing(true))
    }

    fn from_source<S>(source: S) -> Result<Self, config::ConfigError>
    where
        S: config::Source + Send + Sync + 'static,
    {
        config::Config::builder()
            .set_default("use_in_memory_db", false)?
            .set_default("db_host", "127.0.0.1")?
            .set_default("db_username", "postgres")?
            .set_default("db_password", "postgres")?
            .set_default("port", 8080)?
            .add_source(source)
            .build()?
            .try_deserialize()
    }

    pub fn postgres_config(&self) -> PostgresShareItRepositoryConfig {
        PostgresShareItRepositoryConfig {
            hostname: self.db_host.clone(),
            username: self.db_username.clone(),
            password: self.db_password.clone(),
        }
    }
}
