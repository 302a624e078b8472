use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Common CLI arguments shared by the share worker commands
#[derive(Parser, Debug, Clone)]
pub struct CommonArgs {
    #[arg(long, global = true, help = "Configuration file path")]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(short, long, global = true, help = "Enable quiet mode (minimal output)")]
    pub quiet: bool,
}

/// Subcommands that only inspect configuration
#[derive(Subcommand, Debug, Clone)]
pub enum CommonCommands {
    /// Show current configuration and exit
    Config {
        #[arg(long, help = "Show configuration in JSON format")]
        json: bool,
    },
    /// Validate configuration and exit
    Validate,
    /// Show version information and exit
    Version,
}

/// Utility functions for CLI operations
pub mod utils {
    use super::*;
    use crate::config::Configuration;
    use anyhow::{Context, Result};
    use tracing_subscriber::EnvFilter;

    /// Log level selected by `-q` / `-v`
    pub fn log_level(args: &CommonArgs) -> &'static str {
        if args.quiet {
            "warn"
        } else if args.verbose {
            "debug"
        } else {
            "info"
        }
    }

    /// Initialize logging based on CLI arguments. `RUST_LOG` wins when set.
    pub fn init_logging(args: &CommonArgs) {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(log_level(args)));
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    /// Load configuration with optional override from CLI
    pub fn load_config(config_path: Option<&PathBuf>) -> Result<Configuration> {
        match config_path {
            Some(path) => {
                log::info!("Loading configuration from: {}", path.display());
                Configuration::load_from_path(path).context("Failed to load configuration")
            }
            None => Configuration::load().context("Failed to load configuration"),
        }
    }

    /// Display configuration in human-readable or JSON format
    pub fn display_config(config: &Configuration, json: bool) -> Result<()> {
        if json {
            let json = serde_json::to_string_pretty(config)
                .context("Failed to serialize configuration to JSON")?;
            println!("{json}");
        } else {
            println!("Datashare Configuration:");
            println!("========================");
            println!("Database DSN: {}", config.database.dsn);
            println!("Database max connections: {}", config.database.max_connections);
            println!(
                "Database acquire timeout: {:?}",
                config.database.acquire_timeout
            );
            println!(
                "Cross-account sharing: {}",
                enabled(config.sharing.cross_account_sharing)
            );
            println!("Cleanup: {}", enabled(config.sharing.cleanup));
            println!("Default region: {}", config.aws.default_region);
        }
        Ok(())
    }

    fn enabled(flag: bool) -> &'static str {
        if flag { "enabled" } else { "disabled" }
    }

    /// Validate configuration and report any issues
    pub fn validate_config(config: &Configuration) -> Result<()> {
        log::info!("Validating configuration...");

        if config.database.dsn.is_empty() {
            anyhow::bail!("Database DSN cannot be empty");
        }

        if !config.database.dsn.starts_with("sqlite:") {
            anyhow::bail!(
                "Unsupported database DSN '{}'. Supported: sqlite",
                config.database.dsn
            );
        }

        if config.database.max_connections == 0 {
            anyhow::bail!("Database max_connections must be at least 1");
        }

        if config.aws.default_region.is_empty() {
            anyhow::bail!("AWS default region cannot be empty");
        }

        log::info!("Configuration validation passed");
        Ok(())
    }

    /// Handle the configuration-only commands
    pub fn handle_common_command(command: &CommonCommands, config: &Configuration) -> Result<()> {
        match command {
            CommonCommands::Config { json } => display_config(config, *json),
            CommonCommands::Validate => validate_config(config),
            CommonCommands::Version => {
                println!("{}", version_info());
                Ok(())
            }
        }
    }

    /// Standard version information
    pub fn version_info() -> String {
        format!(
            "{} {} ({})",
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION"),
            env!("CARGO_PKG_RUST_VERSION")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Configuration;

    #[test]
    fn test_version_info() {
        let version = utils::version_info();
        assert!(version.contains(env!("CARGO_PKG_VERSION")));
    }

    #[test]
    fn test_log_level_flags() {
        let args = CommonArgs {
            config: None,
            verbose: true,
            quiet: false,
        };
        assert_eq!(utils::log_level(&args), "debug");

        let args = CommonArgs {
            quiet: true,
            ..args
        };
        assert_eq!(utils::log_level(&args), "warn");
    }

    #[test]
    fn test_validate_default_config() {
        utils::validate_config(&Configuration::default()).expect("defaults are valid");
    }

    #[test]
    fn test_validate_rejects_bad_database() {
        let mut config = Configuration::default();
        config.database.dsn = String::new();
        assert!(utils::validate_config(&config).is_err());

        let mut config = Configuration::default();
        config.database.dsn = "postgres://localhost/shares".to_string();
        assert!(utils::validate_config(&config).is_err());

        let mut config = Configuration::default();
        config.database.max_connections = 0;
        assert!(utils::validate_config(&config).is_err());
    }
}
