//! Persistent records.
//!
//! Tenant-scoped business entities implement [`Resource`], which is all the
//! generic repository and the CRUD handlers need to know about them: the
//! table they live in, how a client payload becomes a record, which fields a
//! client may change, and which other records they point at.

pub mod catalog;
pub mod discount;
pub mod job;
pub mod layout;
pub mod organization;
pub mod pricing;
pub mod user;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

pub use catalog::{Component, ComponentCategory, ComponentInput, FenceType, FenceTypeInput, GateType, GateTypeInput};
pub use discount::{DiscountRule, DiscountRuleInput, DiscountType};
pub use job::{Job, JobInput, JobStatus, Parcel, ParcelInput};
pub use layout::{Drawing, DrawingInput, FenceSegment, FenceSegmentInput, GatePosition, GatePositionInput};
pub use organization::{MemberRole, Organization, OrganizationMember};
pub use pricing::{PricingConfig, PricingConfigInput, TaxRegion, TaxRegionInput};
pub use user::User;

pub type FieldErrors = HashMap<String, String>;

/// Server-controlled values stamped onto a record at creation.
#[derive(Debug, Clone, Copy)]
pub struct Stamp {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub now: DateTime<Utc>,
}

impl Stamp {
    pub fn new(organization_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            organization_id,
            now: Utc::now(),
        }
    }
}

/// A pointer from one tenant record to another that must resolve inside the
/// same organization before a write is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reference {
    pub table: &'static str,
    pub label: &'static str,
    pub id: Uuid,
}

impl Reference {
    pub fn new(table: &'static str, label: &'static str, id: Uuid) -> Self {
        Self { table, label, id }
    }
}

/// Extra list route, e.g. `by-job/:job_id` filtering on `job_id`.
#[derive(Debug, Clone, Copy)]
pub struct ListFilter {
    pub route: &'static str,
    pub column: &'static str,
}

pub trait Resource: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const TABLE: &'static str;
    const LABEL: &'static str;
    const PATH: &'static str;
    const LIST_FILTERS: &'static [ListFilter] = &[];
    /// At most one row per organization may carry `is_default = true`.
    const HAS_DEFAULT_FLAG: bool = false;

    type Input: DeserializeOwned + Send + 'static;

    fn id(&self) -> Uuid;
    fn organization_id(&self) -> Uuid;

    fn from_input(input: Self::Input, stamp: Stamp) -> Self;

    /// Copy the client-mutable fields; never touches id, organization or creation time.
    fn apply_input(&mut self, input: Self::Input, now: DateTime<Utc>);

    fn validate(&self) -> FieldErrors {
        FieldErrors::new()
    }

    fn references(&self) -> Vec<Reference> {
        Vec::new()
    }

    fn is_default(&self) -> bool {
        false
    }

    /// Column and value that must be unique within the organization.
    fn unique_value(&self) -> Option<(&'static str, String)> {
        None
    }
}

/// Latitude/longitude pair as drawn on the map.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude) && (-180.0..=180.0).contains(&self.longitude)
    }
}

pub(crate) fn require_text(errors: &mut FieldErrors, field: &str, value: &str) {
    if value.trim().is_empty() {
        errors.insert(field.to_string(), "This field is required".to_string());
    }
}

/// Largest amount a `NUMERIC(12, 2)` money column holds.
pub fn max_money() -> Decimal {
    Decimal::new(999_999_999_999, 2)
}

/// Upper bound for any length, width or height in feet.
pub const MAX_FEET: f64 = 1_000_000.0;

pub(crate) fn require_money(errors: &mut FieldErrors, field: &str, value: Decimal) {
    if value.is_sign_negative() && !value.is_zero() {
        errors.insert(field.to_string(), "Must not be negative".to_string());
    } else if value > max_money() {
        errors.insert(field.to_string(), format!("Must not exceed {}", max_money()));
    }
}

pub(crate) fn require_feet(errors: &mut FieldErrors, field: &str, value: f64) {
    if !value.is_finite() || value < 0.0 {
        errors.insert(field.to_string(), "Must be a non-negative number".to_string());
    } else if value > MAX_FEET {
        errors.insert(field.to_string(), format!("Must not exceed {} feet", MAX_FEET));
    }
}

pub(crate) fn require_non_negative_f64(errors: &mut FieldErrors, field: &str, value: f64) {
    if !value.is_finite() || value < 0.0 {
        errors.insert(field.to_string(), "Must be a non-negative number".to_string());
    }
}

pub(crate) fn require_percentage(errors: &mut FieldErrors, field: &str, value: Decimal) {
    if value.is_sign_negative() || value > Decimal::ONE_HUNDRED {
        errors.insert(field.to_string(), "Must be between 0 and 100".to_string());
    }
}

pub(crate) fn trimmed(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
