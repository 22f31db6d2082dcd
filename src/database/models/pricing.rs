use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{require_money, require_percentage, require_text, trimmed, FieldErrors, Resource, Stamp};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingConfig {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    pub labor_rate_per_foot: Decimal,
    pub markup_percentage: Decimal,
    pub minimum_job_price: Decimal,
    pub gate_installation_fee: Decimal,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PricingConfigInput {
    pub name: String,
    pub labor_rate_per_foot: Decimal,
    pub markup_percentage: Decimal,
    pub minimum_job_price: Decimal,
    pub gate_installation_fee: Decimal,
    pub is_default: bool,
}

impl Resource for PricingConfig {
    const TABLE: &'static str = "pricing_configs";
    const LABEL: &'static str = "Pricing configuration";
    const PATH: &'static str = "/api/pricing-configs";
    const HAS_DEFAULT_FLAG: bool = true;

    type Input = PricingConfigInput;

    fn id(&self) -> Uuid {
        self.id
    }

    fn organization_id(&self) -> Uuid {
        self.organization_id
    }

    fn from_input(input: PricingConfigInput, stamp: Stamp) -> Self {
        let mut config = Self {
            id: stamp.id,
            organization_id: stamp.organization_id,
            name: String::new(),
            labor_rate_per_foot: Decimal::ZERO,
            markup_percentage: Decimal::ZERO,
            minimum_job_price: Decimal::ZERO,
            gate_installation_fee: Decimal::ZERO,
            is_default: false,
            created_at: stamp.now,
            updated_at: stamp.now,
        };
        config.apply_input(input, stamp.now);
        config
    }

    fn apply_input(&mut self, input: PricingConfigInput, now: DateTime<Utc>) {
        self.name = input.name.trim().to_string();
        self.labor_rate_per_foot = input.labor_rate_per_foot;
        self.markup_percentage = input.markup_percentage;
        self.minimum_job_price = input.minimum_job_price;
        self.gate_installation_fee = input.gate_installation_fee;
        self.is_default = input.is_default;
        self.updated_at = now;
    }

    fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        require_text(&mut errors, "name", &self.name);
        require_money(&mut errors, "labor_rate_per_foot", self.labor_rate_per_foot);
        require_percentage(&mut errors, "markup_percentage", self.markup_percentage);
        require_money(&mut errors, "minimum_job_price", self.minimum_job_price);
        require_money(&mut errors, "gate_installation_fee", self.gate_installation_fee);
        errors
    }

    fn is_default(&self) -> bool {
        self.is_default
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxRegion {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    pub region_code: Option<String>,
    /// Percent, e.g. `8.25`.
    pub tax_rate: Decimal,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TaxRegionInput {
    pub name: String,
    pub region_code: Option<String>,
    pub tax_rate: Decimal,
    pub is_default: bool,
}

impl Resource for TaxRegion {
    const TABLE: &'static str = "tax_regions";
    const LABEL: &'static str = "Tax region";
    const PATH: &'static str = "/api/tax-regions";
    const HAS_DEFAULT_FLAG: bool = true;

    type Input = TaxRegionInput;

    fn id(&self) -> Uuid {
        self.id
    }

    fn organization_id(&self) -> Uuid {
        self.organization_id
    }

    fn from_input(input: TaxRegionInput, stamp: Stamp) -> Self {
        let mut region = Self {
            id: stamp.id,
            organization_id: stamp.organization_id,
            name: String::new(),
            region_code: None,
            tax_rate: Decimal::ZERO,
            is_default: false,
            created_at: stamp.now,
            updated_at: stamp.now,
        };
        region.apply_input(input, stamp.now);
        region
    }

    fn apply_input(&mut self, input: TaxRegionInput, now: DateTime<Utc>) {
        self.name = input.name.trim().to_string();
        self.region_code = trimmed(input.region_code).map(|code| code.to_uppercase());
        self.tax_rate = input.tax_rate;
        self.is_default = input.is_default;
        self.updated_at = now;
    }

    fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        require_text(&mut errors, "name", &self.name);
        require_percentage(&mut errors, "tax_rate", self.tax_rate);
        errors
    }

    fn is_default(&self) -> bool {
        self.is_default
    }
}
