use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub dsn: String,
    /// Upper bound of pooled connections. In-memory SQLite is always pinned to one.
    pub max_connections: u32,
    /// How long to wait for a free connection before giving up
    #[serde(with = "humantime_serde")]
    pub acquire_timeout: Duration,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            dsn: String::from("sqlite://.data/datashare.db"),
            max_connections: 5,
            acquire_timeout: Duration::from_secs(30),
        }
    }
}

impl DatabaseConfig {
    /// Create an in-memory database configuration for tests and local runs
    pub fn in_memory() -> Self {
        Self {
            dsn: String::from("sqlite::memory:"),
            max_connections: 1,
            ..Self::default()
        }
    }

    pub fn is_in_memory(&self) -> bool {
        self.dsn.contains(":memory:")
    }
}

/// Capability switches consulted by the sharing service.
///
/// The service takes a snapshot of these at construction time; nothing reads
/// them from global state during an invocation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SharingConfig {
    /// Allow table shares whose catalog lives in a different account than the consumer
    pub cross_account_sharing: bool,
    /// Tear down access points and shared databases once nothing of that type is shared
    pub cleanup: bool,
}

impl Default for SharingConfig {
    fn default() -> Self {
        Self {
            cross_account_sharing: true,
            cleanup: true,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AwsConfig {
    /// Region used when an environment record carries none
    pub default_region: String,
}

impl Default for AwsConfig {
    fn default() -> Self {
        Self {
            default_region: String::from("eu-west-1"),
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Configuration {
    /// Database holding share objects, items and environment metadata
    pub database: DatabaseConfig,
    /// Sharing capabilities
    pub sharing: SharingConfig,
    /// Cloud defaults
    pub aws: AwsConfig,
}

impl Configuration {
    pub fn load() -> Result<Self, Box<figment::Error>> {
        Self::figment(Toml::file("datashare.toml"))
            .extract()
            .map_err(Box::new)
    }

    pub fn load_from_path(path: &Path) -> Result<Self, Box<figment::Error>> {
        Self::figment(Toml::file(path))
            .extract()
            .map_err(Box::new)
    }

    fn figment(file: figment::providers::Data<Toml>) -> Figment {
        Figment::from(Serialized::defaults(Configuration::default()))
            .merge(file)
            .merge(Env::prefixed("DATASHARE__").split("__"))
    }
}
