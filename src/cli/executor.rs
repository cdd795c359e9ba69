//! Command executor for dispatching CLI commands

use super::handlers::ServeCommandHandler;
use super::parser::{Cli, Commands};
use crate::config::{Environment, Settings};

/// Run the command selected by `cli` with already merged `settings`.
pub async fn execute_command(
    cli: &Cli,
    settings: Settings,
    environment: Environment,
) -> anyhow::Result<()> {
    match cli.resolved_command() {
        Commands::Serve { dry_run, .. } => {
            ServeCommandHandler::new(settings, environment)
                .execute(dry_run)
                .await
        }
    }
}
