use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

use crate::database::models::{
    Component, ComponentCategory, ComponentInput, DiscountRule, DiscountRuleInput, DiscountType, FenceSegment,
    FenceSegmentInput, FenceType, FenceTypeInput, GatePosition, GatePositionInput, GateType, GateTypeInput, GeoPoint,
    Job, JobInput, Parcel, ParcelInput, PricingConfig, PricingConfigInput, Resource, Stamp, TaxRegion, TaxRegionInput,
};
use crate::database::{DatabaseError, Repository, TenantScope, TenantStore};
use crate::error::ApiError;

/// Ids of what a seeding run created.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SampleDataSummary {
    pub job_id: Uuid,
    pub fence_types: usize,
    pub gate_types: usize,
    pub components: usize,
    pub fence_segments: usize,
    pub gate_positions: usize,
    pub pricing_config_id: Uuid,
    pub tax_region_id: Uuid,
    pub discount_rule_id: Uuid,
}

pub const SAMPLE_PROMO_CODE: &str = "SAMPLE10";

/// Collects rows for a single atomic batch insert.
struct Batch {
    organization_id: Uuid,
    rows: Vec<(&'static str, Value)>,
}

impl Batch {
    fn stamp(&self) -> Stamp {
        Stamp::new(self.organization_id)
    }

    fn push<R: Resource>(&mut self, record: R) -> Result<R, DatabaseError> {
        self.rows.push((R::TABLE, serde_json::to_value(&record)?));
        Ok(record)
    }

    fn add<R: Resource>(&mut self, input: R::Input) -> Result<R, DatabaseError> {
        let record = R::from_input(input, self.stamp());
        self.push(record)
    }
}

fn money(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}

fn point(latitude: f64, longitude: f64) -> GeoPoint {
    GeoPoint { latitude, longitude }
}

pub async fn seed_sample_data(store: Arc<dyn TenantStore>, scope: TenantScope) -> Result<SampleDataSummary, ApiError> {
    let jobs = Repository::<Job>::new(store.clone(), scope);
    if jobs.select_by("is_sample", true).await?.is_some() {
        return Err(ApiError::bad_request("Sample data already exists"));
    }

    let has_default_pricing = Repository::<PricingConfig>::new(store.clone(), scope).select_default().await?.is_some();
    let has_default_tax = Repository::<TaxRegion>::new(store.clone(), scope).select_default().await?.is_some();

    let mut batch = Batch {
        organization_id: scope.organization_id,
        rows: Vec::new(),
    };

    let wood = batch.add::<FenceType>(FenceTypeInput {
        name: "6' Cedar Privacy".to_string(),
        material: Some("wood".to_string()),
        style: Some("privacy".to_string()),
        height_feet: 6.0,
        price_per_linear_foot: money(3200),
        ..Default::default()
    })?;
    let vinyl = batch.add::<FenceType>(FenceTypeInput {
        name: "4' White Vinyl Picket".to_string(),
        material: Some("vinyl".to_string()),
        style: Some("picket".to_string()),
        color: Some("white".to_string()),
        height_feet: 4.0,
        price_per_linear_foot: money(2850),
        ..Default::default()
    })?;
    let chain_link = batch.add::<FenceType>(FenceTypeInput {
        name: "5' Galvanized Chain Link".to_string(),
        material: Some("chain_link".to_string()),
        height_feet: 5.0,
        price_per_linear_foot: money(1675),
        ..Default::default()
    })?;

    let walk_gate = batch.add::<GateType>(GateTypeInput {
        name: "Single Walk Gate".to_string(),
        width_feet: 4.0,
        height_feet: 6.0,
        price: money(35000),
        ..Default::default()
    })?;
    let drive_gate = batch.add::<GateType>(GateTypeInput {
        name: "Double Drive Gate".to_string(),
        width_feet: 12.0,
        height_feet: 6.0,
        price: money(95000),
        ..Default::default()
    })?;

    let components = [
        ("4x4 Cedar Post", "CED-POST-4X4", ComponentCategory::Post, "each", 1895, wood.id),
        ("2x4 Cedar Rail", "CED-RAIL-2X4", ComponentCategory::Rail, "each", 899, wood.id),
        ("1x6 Cedar Picket", "CED-PICKET-1X6", ComponentCategory::Picket, "each", 349, wood.id),
        ("Vinyl Picket Panel", "VIN-PANEL-4", ComponentCategory::Panel, "each", 8900, vinyl.id),
        ("Chain Link Fabric", "CL-FABRIC-5", ComponentCategory::Panel, "foot", 450, chain_link.id),
    ];
    for (name, sku, category, unit, cents, fence_type_id) in components {
        batch.add::<Component>(ComponentInput {
            name: name.to_string(),
            sku: Some(sku.to_string()),
            category,
            unit: Some(unit.to_string()),
            unit_cost: money(cents),
            fence_type_id: Some(fence_type_id),
        })?;
    }
    batch.add::<Component>(ComponentInput {
        name: "Concrete Mix 80lb".to_string(),
        sku: Some("CONC-80".to_string()),
        category: ComponentCategory::Concrete,
        unit: Some("bag".to_string()),
        unit_cost: money(695),
        fence_type_id: None,
    })?;

    let pricing = batch.add::<PricingConfig>(PricingConfigInput {
        name: "Standard Pricing".to_string(),
        labor_rate_per_foot: money(1250),
        markup_percentage: money(2000),
        minimum_job_price: money(150000),
        gate_installation_fee: money(15000),
        is_default: !has_default_pricing,
    })?;
    let tax = batch.add::<TaxRegion>(TaxRegionInput {
        name: "Local Sales Tax".to_string(),
        region_code: Some("LOCAL".to_string()),
        tax_rate: money(825),
        is_default: !has_default_tax,
    })?;
    // A kept sample promo from an earlier run is reused; the code is unique per organization.
    let discount_rule_id = match Repository::<DiscountRule>::new(store.clone(), scope)
        .select_by("promo_code", SAMPLE_PROMO_CODE)
        .await?
    {
        Some(existing) => existing.id,
        None => {
            batch
                .add::<DiscountRule>(DiscountRuleInput {
                    name: "Spring Sale".to_string(),
                    promo_code: SAMPLE_PROMO_CODE.to_string(),
                    discount_type: DiscountType::Percentage,
                    discount_value: money(1000),
                    minimum_order_value: Some(money(100000)),
                    maximum_discount_amount: Some(money(50000)),
                    ..Default::default()
                })?
                .id
        }
    };

    let mut job = Job::from_input(
        JobInput {
            name: "Sample: Backyard Privacy Fence".to_string(),
            customer_name: Some("Pat Sample".to_string()),
            customer_email: Some("pat.sample@example.com".to_string()),
            address: Some("123 Example Street".to_string()),
            notes: Some("Created as sample data".to_string()),
            ..Default::default()
        },
        batch.stamp(),
    );
    job.is_sample = true;
    let job = batch.push(job)?;

    let corners = [
        point(45.52310, -122.67650),
        point(45.52310, -122.67580),
        point(45.52260, -122.67580),
        point(45.52260, -122.67650),
    ];
    let parcel = batch.add::<Parcel>(ParcelInput {
        job_id: job.id,
        address: job.address.clone(),
        boundary: corners.to_vec(),
        ..Default::default()
    })?;

    let sides = [("Back", [corners[0], corners[1]]), ("East side", [corners[1], corners[2]]), ("West side", [corners[3], corners[0]])];
    let mut segments = Vec::with_capacity(sides.len());
    for (label, ends) in sides {
        segments.push(batch.add::<FenceSegment>(FenceSegmentInput {
            job_id: job.id,
            parcel_id: Some(parcel.id),
            fence_type_id: Some(wood.id),
            label: Some(label.to_string()),
            coordinates: ends.to_vec(),
            length_feet: None,
        })?);
    }

    let gates = [(walk_gate.id, &segments[1], 90.0), (drive_gate.id, &segments[2], 270.0)];
    let mut gate_count = 0;
    for (gate_type_id, segment, rotation_degrees) in gates {
        let at = segment.coordinates[0];
        batch.add::<GatePosition>(GatePositionInput {
            job_id: job.id,
            fence_segment_id: Some(segment.id),
            gate_type_id: Some(gate_type_id),
            latitude: at.latitude,
            longitude: at.longitude,
            rotation_degrees,
        })?;
        gate_count += 1;
    }

    let summary = SampleDataSummary {
        job_id: job.id,
        fence_types: 3,
        gate_types: 2,
        components: components.len() + 1,
        fence_segments: segments.len(),
        gate_positions: gate_count,
        pricing_config_id: pricing.id,
        tax_region_id: tax.id,
        discount_rule_id,
    };

    store.insert_batch(scope, batch.rows).await?;
    tracing::info!("Seeded sample data for organization {}", scope.organization_id);
    Ok(summary)
}
