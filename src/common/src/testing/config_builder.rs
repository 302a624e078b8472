//! Test configuration builder for creating test setups quickly.

use crate::config::{Configuration, DatabaseConfig};

/// Builder for creating test configurations.
///
/// # Example
///
/// ```rust,ignore
/// use common::testing::TestConfigBuilder;
///
/// let config = TestConfigBuilder::new()
///     .in_memory()
///     .without_cleanup()
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct TestConfigBuilder {
    config: Configuration,
}

impl Default for TestConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Configuration::default(),
        }
    }

    /// Use a single-connection in-memory SQLite database.
    pub fn in_memory(mut self) -> Self {
        self.config.database = DatabaseConfig::in_memory();
        self
    }

    /// Use a file-backed SQLite database inside `dir` (typically a `TempDir`).
    pub fn with_database_dir(mut self, dir: &str) -> Self {
        self.config.database.dsn = format!("sqlite://{dir}/datashare.db");
        self
    }

    pub fn with_database_dsn(mut self, dsn: &str) -> Self {
        self.config.database.dsn = dsn.to_string();
        self
    }

    pub fn without_cross_account_sharing(mut self) -> Self {
        self.config.sharing.cross_account_sharing = false;
        self
    }

    pub fn without_cleanup(mut self) -> Self {
        self.config.sharing.cleanup = false;
        self
    }

    pub fn build(self) -> Configuration {
        self.config
    }
}
