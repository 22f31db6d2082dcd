use clap::Subcommand;
use rust_decimal::Decimal;

use crate::cli::config::load_session;
use crate::cli::utils::output_data;
use crate::cli::OutputFormat;
use crate::services::ValidatePromoRequest;

#[derive(Subcommand)]
pub enum DiscountCommands {
    #[command(about = "Check a promo code against an order")]
    Validate {
        #[arg(help = "Promo code")]
        code: String,
        #[arg(long, default_value = "0", help = "Order value before discount")]
        order_value: Decimal,
        #[arg(long, default_value_t = 0.0, help = "Total linear feet")]
        linear_feet: f64,
    },
}

pub async fn handle(cmd: DiscountCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let client = load_session()?.authenticated_client()?;

    match cmd {
        DiscountCommands::Validate {
            code,
            order_value,
            linear_feet,
        } => {
            let request = ValidatePromoRequest {
                promo_code: code,
                order_value,
                linear_feet,
            };
            let applied = client.validate_promo(&request).await?;
            output_data(&output_format, &format!("{} takes {} off", applied.promo_code, applied.discount_amount), &applied)
        }
    }
}
