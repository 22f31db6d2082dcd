use clap::Subcommand;
use reqwest::Method;
use serde_json::Value;
use uuid::Uuid;

use crate::cli::config::load_session;
use crate::cli::utils::{output_data, read_body};
use crate::cli::OutputFormat;
use crate::database::models::{
    Component, DiscountRule, Drawing, FenceSegment, FenceType, GatePosition, GateType, Job, Parcel, PricingConfig,
    Resource, TaxRegion,
};

/// Resource names accepted on the command line, mapped to their API prefix.
const RESOURCES: &[(&str, &str)] = &[
    ("jobs", Job::PATH),
    ("parcels", Parcel::PATH),
    ("fence-types", FenceType::PATH),
    ("gate-types", GateType::PATH),
    ("components", Component::PATH),
    ("fence-segments", FenceSegment::PATH),
    ("gate-positions", GatePosition::PATH),
    ("drawings", Drawing::PATH),
    ("discounts", DiscountRule::PATH),
    ("pricing-configs", PricingConfig::PATH),
    ("tax-regions", TaxRegion::PATH),
];

fn resource_path(name: &str) -> anyhow::Result<&'static str> {
    RESOURCES
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, path)| *path)
        .ok_or_else(|| {
            let known: Vec<&str> = RESOURCES.iter().map(|(n, _)| *n).collect();
            anyhow::anyhow!("Unknown resource '{}'; expected one of: {}", name, known.join(", "))
        })
}

#[derive(Subcommand)]
pub enum ResourceCommands {
    #[command(about = "List records")]
    List {
        #[arg(help = "Resource name, e.g. jobs")]
        resource: String,
        #[arg(long, help = "Filter by parent, e.g. --by job=<id>")]
        by: Option<String>,
    },

    #[command(about = "Show one record")]
    Get { resource: String, id: Uuid },

    #[command(about = "Create a record from JSON (inline or @file)")]
    Create { resource: String, body: String },

    #[command(about = "Replace a record's fields from JSON (inline or @file)")]
    Update { resource: String, id: Uuid, body: String },

    #[command(about = "Delete a record")]
    Delete { resource: String, id: Uuid },
}

/// `job=<id>` becomes `/by-job/<id>`.
fn parent_filter(raw: &str) -> anyhow::Result<String> {
    let (parent, id) = raw
        .split_once('=')
        .ok_or_else(|| anyhow::anyhow!("--by expects <parent>=<id>"))?;
    let id = Uuid::parse_str(id.trim())?;
    Ok(format!("/by-{}/{}", parent.trim(), id))
}

pub async fn handle(cmd: ResourceCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let client = load_session()?.authenticated_client()?;

    match cmd {
        ResourceCommands::List { resource, by } => {
            let mut path = resource_path(&resource)?.to_string();
            if let Some(by) = by {
                path.push_str(&parent_filter(&by)?);
            }
            let records: Vec<Value> = client.send(Method::GET, &path, None).await?;
            output_data(&output_format, &format!("{} {}", records.len(), resource), &records)
        }
        ResourceCommands::Get { resource, id } => {
            let path = format!("{}/{}", resource_path(&resource)?, id);
            let record: Value = client.send(Method::GET, &path, None).await?;
            output_data(&output_format, &format!("{} {}", resource, id), &record)
        }
        ResourceCommands::Create { resource, body } => {
            let body = read_body(&body)?;
            let record: Value = client.send(Method::POST, resource_path(&resource)?, Some(&body)).await?;
            output_data(&output_format, &format!("Created {}", resource), &record)
        }
        ResourceCommands::Update { resource, id, body } => {
            let body = read_body(&body)?;
            let path = format!("{}/{}", resource_path(&resource)?, id);
            let record: Value = client.send(Method::PUT, &path, Some(&body)).await?;
            output_data(&output_format, &format!("Updated {} {}", resource, id), &record)
        }
        ResourceCommands::Delete { resource, id } => {
            let path = format!("{}/{}", resource_path(&resource)?, id);
            let deleted: Value = client.send(Method::DELETE, &path, None).await?;
            output_data(&output_format, &format!("Deleted {} {}", resource, id), &deleted)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_names_map_to_api_prefixes() {
        assert_eq!(resource_path("fence-types").unwrap(), "/api/fence-types");
        assert!(resource_path("invoices").is_err());
    }

    #[test]
    fn parent_filter_builds_by_route() {
        let id = Uuid::new_v4();
        assert_eq!(parent_filter(&format!("job={}", id)).unwrap(), format!("/by-job/{}", id));
        assert!(parent_filter("job").is_err());
    }
}
