use clap::Subcommand;

use crate::cli::config::{load_session, save_session};
use crate::cli::utils::{output_data, output_success};
use crate::cli::OutputFormat;
use crate::services::{LoginRequest, RegisterRequest};

#[derive(Subcommand)]
pub enum AuthCommands {
    #[command(about = "Create an account, optionally with a new organization")]
    Register {
        #[arg(help = "Email address")]
        email: String,
        #[arg(long, help = "Password (falls back to FENCECTL_PASSWORD)")]
        password: Option<String>,
        #[arg(long, help = "Display name")]
        name: Option<String>,
        #[arg(long, help = "Create an organization owned by the new account")]
        organization: Option<String>,
    },

    #[command(about = "Log in and store the session token")]
    Login {
        #[arg(help = "Email address")]
        email: String,
        #[arg(long, help = "Password (falls back to FENCECTL_PASSWORD)")]
        password: Option<String>,
    },

    #[command(about = "Forget the stored session")]
    Logout,

    #[command(about = "Show the current user and organization")]
    Whoami,
}

fn password_or_env(password: Option<String>) -> anyhow::Result<String> {
    password
        .or_else(|| std::env::var("FENCECTL_PASSWORD").ok())
        .ok_or_else(|| anyhow::anyhow!("Password required: pass --password or set FENCECTL_PASSWORD"))
}

pub async fn handle(cmd: AuthCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let mut session = load_session()?;

    match cmd {
        AuthCommands::Register {
            email,
            password,
            name,
            organization,
        } => {
            let request = RegisterRequest {
                email,
                password: password_or_env(password)?,
                display_name: name,
                organization_name: organization,
            };
            let account = session.client()?.register(&request).await?;
            output_data(&output_format, &format!("Registered {}", account.user.email), &account)
        }
        AuthCommands::Login { email, password } => {
            let request = LoginRequest {
                email,
                password: password_or_env(password)?,
            };
            let (_, result) = session.client()?.login(&request).await?;

            session.token = Some(result.token.clone());
            session.email = Some(result.user.email.clone());
            session.organization_id = None;
            save_session(&session)?;

            output_success(&output_format, &format!("Logged in as {}", result.user.email))
        }
        AuthCommands::Logout => {
            session.clear_credentials();
            save_session(&session)?;
            output_success(&output_format, "Logged out")
        }
        AuthCommands::Whoami => {
            let me = session.authenticated_client()?.whoami().await?;
            output_data(&output_format, "Current session", &me)
        }
    }
}
