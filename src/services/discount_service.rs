use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::database::models::{require_feet, require_money, DiscountRule, DiscountType, FieldErrors};
use crate::database::Repository;
use crate::error::ApiError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatePromoRequest {
    pub promo_code: String,
    #[serde(default)]
    pub order_value: Decimal,
    #[serde(default)]
    pub linear_feet: f64,
}

impl ValidatePromoRequest {
    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        require_money(&mut errors, "order_value", self.order_value);
        require_feet(&mut errors, "linear_feet", self.linear_feet);
        errors
    }
}

/// A promo code that passed every check, with the amount it takes off.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppliedDiscount {
    pub discount_rule_id: Uuid,
    pub name: String,
    pub promo_code: String,
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
    pub discount_amount: Decimal,
}

/// `POST /api/discounts/validate`: bounds-check the request, then evaluate the code.
pub async fn validate_promo(
    repo: &Repository<DiscountRule>,
    request: &ValidatePromoRequest,
    now: DateTime<Utc>,
) -> Result<AppliedDiscount, ApiError> {
    let errors = request.validate();
    if !errors.is_empty() {
        return Err(ApiError::validation_error("Invalid promo validation request", Some(errors)));
    }
    apply_promo_code(repo, &request.promo_code, request.order_value, request.linear_feet, now).await
}

/// Look up a code in the caller's organization and evaluate it for an order.
pub async fn apply_promo_code(
    repo: &Repository<DiscountRule>,
    promo_code: &str,
    order_value: Decimal,
    linear_feet: f64,
    now: DateTime<Utc>,
) -> Result<AppliedDiscount, ApiError> {
    let code = DiscountRule::normalize_code(promo_code);
    if code.is_empty() {
        return Err(ApiError::bad_request("Invalid promo code"));
    }

    let rule = repo
        .select_by("promo_code", code.as_str())
        .await?
        .ok_or_else(|| ApiError::bad_request("Invalid promo code"))?;

    let discount_amount = rule.evaluate(now, order_value, linear_feet).map_err(|rejection| {
        tracing::debug!("Promo code {} rejected: {}", rule.promo_code, rejection);
        ApiError::bad_request(rejection.to_string())
    })?;

    Ok(AppliedDiscount {
        discount_rule_id: rule.id,
        name: rule.name,
        promo_code: rule.promo_code,
        discount_type: rule.discount_type,
        discount_value: rule.discount_value,
        discount_amount,
    })
}
