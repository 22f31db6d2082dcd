pub mod commands;
pub mod config;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

#[derive(Parser)]
#[command(name = "fencectl")]
#[command(about = "fencectl - command-line client for the fence estimator API")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in human-readable text format")]
    pub text: bool,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Server selection and health")]
    Server {
        #[command(subcommand)]
        cmd: commands::server::ServerCommands,
    },

    #[command(about = "Accounts and sessions")]
    Auth {
        #[command(subcommand)]
        cmd: commands::auth::AuthCommands,
    },

    #[command(about = "Organization membership and sample data")]
    Org {
        #[command(subcommand)]
        cmd: commands::org::OrgCommands,
    },

    #[command(about = "CRUD on any estimator resource")]
    Resource {
        #[command(subcommand)]
        cmd: commands::resource::ResourceCommands,
    },

    #[command(about = "Promo code checks")]
    Discount {
        #[command(subcommand)]
        cmd: commands::discount::DiscountCommands,
    },

    #[command(about = "Job pricing")]
    Job {
        #[command(subcommand)]
        cmd: commands::job::JobCommands,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);

    let result = match cli.command {
        Commands::Server { cmd } => commands::server::handle(cmd, output_format.clone()).await,
        Commands::Auth { cmd } => commands::auth::handle(cmd, output_format.clone()).await,
        Commands::Org { cmd } => commands::org::handle(cmd, output_format.clone()).await,
        Commands::Resource { cmd } => commands::resource::handle(cmd, output_format.clone()).await,
        Commands::Discount { cmd } => commands::discount::handle(cmd, output_format.clone()).await,
        Commands::Job { cmd } => commands::job::handle(cmd, output_format.clone()).await,
    };

    // JSON callers get the API error envelope on stdout instead of a bare message.
    if let (Err(e), OutputFormat::Json) = (&result, &output_format) {
        let code = e
            .downcast_ref::<crate::client::ClientError>()
            .and_then(|ce| match ce {
                crate::client::ClientError::Api { code, .. } => code.as_deref(),
                _ => None,
            });
        utils::output_error(&output_format, &e.to_string(), code)?;
    }
    result
}
