use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use common::Database;
use common::cli::{CommonArgs, CommonCommands, utils};
use sharing::{CloudClients, DataSharingService, DryRunCloud, ShareCapabilities};

#[derive(Parser)]
#[command(name = "datashare")]
#[command(about = "Share worker - approves and revokes dataset shares")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Grant every approved item of a share
    Approve { share_uri: String },
    /// Revoke every revoke-approved item of a share
    Revoke { share_uri: String },
    #[command(flatten)]
    Common(CommonCommands),
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    utils::init_logging(&cli.common);

    let config = utils::load_config(cli.common.config.as_ref())?;

    let (share_uri, approve) = match cli.command {
        Commands::Common(command) => {
            utils::handle_common_command(&command, &config)?;
            return Ok(ExitCode::SUCCESS);
        }
        Commands::Approve { share_uri } => (share_uri, true),
        Commands::Revoke { share_uri } => (share_uri, false),
    };
    utils::validate_config(&config)?;

    let database = Database::new(&config.database)
        .await
        .with_context(|| format!("Failed to open share database {}", config.database.dsn))?;
    let capabilities = ShareCapabilities::from(&config.sharing);

    // No account backend is wired in yet, so every cloud call is logged only
    log::info!(
        "Using dry-run cloud backend (default region {})",
        config.aws.default_region
    );
    let service = DataSharingService::new(
        database,
        CloudClients::from_single(Arc::new(DryRunCloud)),
        capabilities,
    );

    let succeeded = if approve {
        service
            .approve_share(&share_uri)
            .await
            .with_context(|| format!("Failed to approve share {share_uri}"))?
    } else {
        service
            .revoke_share(&share_uri)
            .await
            .with_context(|| format!("Failed to revoke share {share_uri}"))?
    };

    if succeeded {
        log::info!("Share processed successfully");
        Ok(ExitCode::SUCCESS)
    } else {
        log::warn!("Share processed with failed items");
        Ok(ExitCode::FAILURE)
    }
}
