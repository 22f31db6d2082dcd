use clap::Subcommand;

use crate::cli::config::{load_session, save_session};
use crate::cli::utils::{output_data, output_success};
use crate::cli::OutputFormat;
use crate::client::FenceClient;

#[derive(Subcommand)]
pub enum ServerCommands {
    #[command(about = "Check server health via the /health endpoint")]
    Health,

    #[command(about = "Point fencectl at another server (clears the stored session)")]
    Use {
        #[arg(help = "Base URL, e.g. http://localhost:3000")]
        url: String,
    },

    #[command(about = "Show the configured server")]
    Current,
}

pub async fn handle(cmd: ServerCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let mut session = load_session()?;

    match cmd {
        ServerCommands::Health => {
            let health = session.client()?.health().await?;
            output_data(&output_format, &format!("{} is healthy", session.base_url), &health)
        }
        ServerCommands::Use { url } => {
            let client = FenceClient::new(&url)?;
            session.base_url = client.base_url().to_string();
            session.clear_credentials();
            save_session(&session)?;
            output_success(&output_format, &format!("Using server {}", session.base_url))
        }
        ServerCommands::Current => output_success(&output_format, &format!("Current server: {}", session.base_url)),
    }
}
