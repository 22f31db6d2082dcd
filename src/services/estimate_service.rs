use chrono::Utc;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use super::discount_service::{apply_promo_code, AppliedDiscount};
use crate::database::models::{
    DiscountRule, FenceSegment, FenceType, GatePosition, GateType, Job, PricingConfig, Resource, TaxRegion,
};
use crate::database::{Repository, RowFilter, TenantScope, TenantStore};
use crate::error::ApiError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EstimateQuery {
    pub pricing_config_id: Option<Uuid>,
    pub tax_region_id: Option<Uuid>,
    pub promo_code: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineKind {
    Fence,
    Gate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EstimateLine {
    pub kind: LineKind,
    pub reference_id: Uuid,
    pub description: String,
    /// Linear feet for fences, 1 for gates.
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub amount: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobEstimate {
    pub job_id: Uuid,
    pub pricing_config_id: Uuid,
    pub tax_region_id: Option<Uuid>,
    pub lines: Vec<EstimateLine>,
    pub linear_feet: f64,
    pub subtotal: Decimal,
    pub markup: Decimal,
    pub minimum_adjustment: Decimal,
    pub total_before_discount: Decimal,
    pub discount: Option<AppliedDiscount>,
    pub discount_amount: Decimal,
    pub taxable_amount: Decimal,
    pub tax_rate: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
}

fn cents(value: Decimal) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    rounded
}

fn too_large() -> ApiError {
    ApiError::bad_request("Estimate amount is too large")
}

fn mul(a: Decimal, b: Decimal) -> Result<Decimal, ApiError> {
    a.checked_mul(b).ok_or_else(too_large)
}

fn add(a: Decimal, b: Decimal) -> Result<Decimal, ApiError> {
    a.checked_add(b).ok_or_else(too_large)
}

fn percent_of(amount: Decimal, percent: Decimal) -> Result<Decimal, ApiError> {
    mul(amount, percent)?.checked_div(Decimal::ONE_HUNDRED).ok_or_else(too_large)
}

/// Priced layout before any promo code or tax.
#[derive(Debug, Clone)]
pub struct LayoutPrice {
    pub lines: Vec<EstimateLine>,
    pub linear_feet: f64,
    pub subtotal: Decimal,
    pub markup: Decimal,
    pub minimum_adjustment: Decimal,
    pub total_before_discount: Decimal,
}

/// Price fence runs and gates under one pricing configuration.
///
/// Segments without a fence type are charged labor only; gates without a
/// gate type are charged the installation fee only. Amounts that do not fit a
/// `Decimal` are a 400, not a panic.
pub fn price_layout(
    pricing: &PricingConfig,
    segments: &[FenceSegment],
    gates: &[GatePosition],
    fence_types: &HashMap<Uuid, FenceType>,
    gate_types: &HashMap<Uuid, GateType>,
) -> Result<LayoutPrice, ApiError> {
    let mut lines = Vec::with_capacity(segments.len() + gates.len());
    let mut linear_feet = 0.0;

    for segment in segments {
        let fence = segment.fence_type_id.and_then(|id| fence_types.get(&id));
        let unit_price = add(fence.map_or(Decimal::ZERO, |f| f.price_per_linear_foot), pricing.labor_rate_per_foot)?;
        let quantity = Decimal::from_f64(segment.length_feet).unwrap_or(Decimal::ZERO).round_dp(2);
        linear_feet += segment.length_feet;
        lines.push(EstimateLine {
            kind: LineKind::Fence,
            reference_id: segment.id,
            description: segment
                .label
                .clone()
                .or_else(|| fence.map(|f| f.name.clone()))
                .unwrap_or_else(|| "Fence run".to_string()),
            quantity,
            unit_price,
            amount: cents(mul(quantity, unit_price)?),
        });
    }

    for gate in gates {
        let gate_type = gate.gate_type_id.and_then(|id| gate_types.get(&id));
        let unit_price = add(gate_type.map_or(Decimal::ZERO, |g| g.price), pricing.gate_installation_fee)?;
        lines.push(EstimateLine {
            kind: LineKind::Gate,
            reference_id: gate.id,
            description: gate_type.map_or_else(|| "Gate".to_string(), |g| g.name.clone()),
            quantity: Decimal::ONE,
            unit_price,
            amount: cents(unit_price),
        });
    }

    let subtotal = lines.iter().try_fold(Decimal::ZERO, |sum, line| add(sum, line.amount))?;
    let markup = cents(percent_of(subtotal, pricing.markup_percentage)?);
    let marked_up = add(subtotal, markup)?;
    let minimum_adjustment = if marked_up < pricing.minimum_job_price {
        pricing.minimum_job_price - marked_up
    } else {
        Decimal::ZERO
    };

    Ok(LayoutPrice {
        lines,
        linear_feet: (linear_feet * 100.0).round() / 100.0,
        subtotal,
        markup,
        minimum_adjustment,
        total_before_discount: add(marked_up, minimum_adjustment)?,
    })
}

/// Apply an already-validated discount and the tax rate (percent).
pub fn finish_estimate(
    job_id: Uuid,
    pricing_config_id: Uuid,
    tax_region_id: Option<Uuid>,
    layout: LayoutPrice,
    discount: Option<AppliedDiscount>,
    tax_rate: Decimal,
) -> Result<JobEstimate, ApiError> {
    let discount_amount = discount
        .as_ref()
        .map_or(Decimal::ZERO, |d| d.discount_amount.min(layout.total_before_discount));
    let taxable_amount = layout.total_before_discount - discount_amount;
    let tax = cents(percent_of(taxable_amount, tax_rate)?);
    let total = add(taxable_amount, tax)?;

    Ok(JobEstimate {
        job_id,
        pricing_config_id,
        tax_region_id,
        lines: layout.lines,
        linear_feet: layout.linear_feet,
        subtotal: layout.subtotal,
        markup: layout.markup,
        minimum_adjustment: layout.minimum_adjustment,
        total_before_discount: layout.total_before_discount,
        discount,
        discount_amount,
        taxable_amount,
        tax_rate,
        tax,
        total,
    })
}

/// Builds a priced estimate for one job of the caller's organization.
pub struct EstimateService {
    store: Arc<dyn TenantStore>,
    scope: TenantScope,
}

impl EstimateService {
    pub fn new(store: Arc<dyn TenantStore>, scope: TenantScope) -> Self {
        Self { store, scope }
    }

    fn repo<R: Resource>(&self) -> Repository<R> {
        Repository::new(self.store.clone(), self.scope)
    }

    pub async fn estimate(&self, job_id: Uuid, query: EstimateQuery) -> Result<JobEstimate, ApiError> {
        let job = self.repo::<Job>().select_404(job_id).await?;
        let pricing = self.pricing_config(query.pricing_config_id).await?;
        let tax_region = self.tax_region(query.tax_region_id).await?;

        let by_job = [RowFilter::eq("job_id", job.id.to_string())];
        let segments = self.repo::<FenceSegment>().select_any(&by_job).await?;
        let gates = self.repo::<GatePosition>().select_any(&by_job).await?;

        let fence_types: HashMap<Uuid, FenceType> = self
            .repo::<FenceType>()
            .select_any(&[])
            .await?
            .into_iter()
            .map(|f| (f.id, f))
            .collect();
        let gate_types: HashMap<Uuid, GateType> = self
            .repo::<GateType>()
            .select_any(&[])
            .await?
            .into_iter()
            .map(|g| (g.id, g))
            .collect();

        let layout = price_layout(&pricing, &segments, &gates, &fence_types, &gate_types)?;

        let discount = match query.promo_code.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
            Some(code) => Some(
                apply_promo_code(
                    &self.repo::<DiscountRule>(),
                    code,
                    layout.total_before_discount,
                    layout.linear_feet,
                    Utc::now(),
                )
                .await?,
            ),
            None => None,
        };

        finish_estimate(
            job.id,
            pricing.id,
            tax_region.as_ref().map(|t| t.id),
            layout,
            discount,
            tax_region.map_or(Decimal::ZERO, |t| t.tax_rate),
        )
    }

    async fn pricing_config(&self, id: Option<Uuid>) -> Result<PricingConfig, ApiError> {
        let repo = self.repo::<PricingConfig>();
        match id {
            Some(id) => repo
                .select_one(id)
                .await?
                .ok_or_else(|| ApiError::bad_request("Pricing configuration not found or access denied")),
            None => repo
                .select_default()
                .await?
                .ok_or_else(|| ApiError::bad_request("No pricing configuration available")),
        }
    }

    async fn tax_region(&self, id: Option<Uuid>) -> Result<Option<TaxRegion>, ApiError> {
        let repo = self.repo::<TaxRegion>();
        match id {
            Some(id) => repo
                .select_one(id)
                .await?
                .map(Some)
                .ok_or_else(|| ApiError::bad_request("Tax region not found or access denied")),
            None => Ok(repo.select_default().await?),
        }
    }
}
