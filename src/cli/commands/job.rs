use clap::Subcommand;
use uuid::Uuid;

use crate::cli::config::load_session;
use crate::cli::utils::output_data;
use crate::cli::OutputFormat;
use crate::services::EstimateQuery;

#[derive(Subcommand)]
pub enum JobCommands {
    #[command(about = "Price a job's fence layout")]
    Estimate {
        #[arg(help = "Job id")]
        job_id: Uuid,
        #[arg(long, help = "Pricing configuration (defaults to the organization default)")]
        pricing_config: Option<Uuid>,
        #[arg(long, help = "Tax region (defaults to the organization default)")]
        tax_region: Option<Uuid>,
        #[arg(long, help = "Promo code to apply")]
        promo_code: Option<String>,
    },
}

pub async fn handle(cmd: JobCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let client = load_session()?.authenticated_client()?;

    match cmd {
        JobCommands::Estimate {
            job_id,
            pricing_config,
            tax_region,
            promo_code,
        } => {
            let query = EstimateQuery {
                pricing_config_id: pricing_config,
                tax_region_id: tax_region,
                promo_code,
            };
            let estimate = client.estimate(job_id, &query).await?;
            output_data(&output_format, &format!("Estimate total {}", estimate.total), &estimate)
        }
    }
}
