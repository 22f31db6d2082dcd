use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{require_feet, require_money, require_percentage, require_text, FieldErrors, Resource, Stamp};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountType {
    #[default]
    Percentage,
    FixedAmount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscountRule {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    pub promo_code: String,
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
    pub minimum_order_value: Option<Decimal>,
    pub minimum_linear_feet: Option<f64>,
    pub maximum_discount_amount: Option<Decimal>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DiscountRuleInput {
    pub name: String,
    pub promo_code: String,
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
    pub minimum_order_value: Option<Decimal>,
    pub minimum_linear_feet: Option<f64>,
    pub maximum_discount_amount: Option<Decimal>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    pub is_active: bool,
}

impl Default for DiscountRuleInput {
    fn default() -> Self {
        Self {
            name: String::new(),
            promo_code: String::new(),
            discount_type: DiscountType::Percentage,
            discount_value: Decimal::ZERO,
            minimum_order_value: None,
            minimum_linear_feet: None,
            maximum_discount_amount: None,
            valid_from: None,
            valid_until: None,
            is_active: true,
        }
    }
}

/// Why a promo code cannot be applied; the display text is the client message.
#[derive(Debug, Clone, PartialEq)]
pub enum PromoRejection {
    Inactive,
    NotYetValid,
    Expired,
    BelowMinimumOrder(Decimal),
    BelowMinimumLinearFeet(f64),
    /// The order is too large to compute a discount for.
    OrderTooLarge,
}

impl std::fmt::Display for PromoRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PromoRejection::Inactive => write!(f, "Promo code is not active"),
            PromoRejection::NotYetValid => write!(f, "Promo code is not yet valid"),
            PromoRejection::Expired => write!(f, "Promo code has expired"),
            PromoRejection::BelowMinimumOrder(min) => write!(f, "Minimum order value of {} not met", min),
            PromoRejection::BelowMinimumLinearFeet(min) => write!(f, "Minimum of {} linear feet not met", min),
            PromoRejection::OrderTooLarge => write!(f, "Order value is too large"),
        }
    }
}

impl DiscountRule {
    pub fn normalize_code(code: &str) -> String {
        code.trim().to_uppercase()
    }

    /// Check eligibility in order (active, window, thresholds) and compute the
    /// discount for an order, rounded to cents and never above the order value.
    pub fn evaluate(&self, now: DateTime<Utc>, order_value: Decimal, linear_feet: f64) -> Result<Decimal, PromoRejection> {
        if !self.is_active {
            return Err(PromoRejection::Inactive);
        }
        if self.valid_from.is_some_and(|from| now < from) {
            return Err(PromoRejection::NotYetValid);
        }
        if self.valid_until.is_some_and(|until| now > until) {
            return Err(PromoRejection::Expired);
        }
        if let Some(min) = self.minimum_order_value {
            if order_value < min {
                return Err(PromoRejection::BelowMinimumOrder(min));
            }
        }
        if let Some(min) = self.minimum_linear_feet {
            if linear_feet < min {
                return Err(PromoRejection::BelowMinimumLinearFeet(min));
            }
        }

        let mut amount = match self.discount_type {
            DiscountType::Percentage => order_value
                .checked_mul(self.discount_value)
                .and_then(|v| v.checked_div(Decimal::ONE_HUNDRED))
                .ok_or(PromoRejection::OrderTooLarge)?,
            DiscountType::FixedAmount => self.discount_value,
        };
        if let Some(cap) = self.maximum_discount_amount {
            amount = amount.min(cap);
        }
        amount = amount.min(order_value).max(Decimal::ZERO);

        let mut amount = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        amount.rescale(2);
        Ok(amount)
    }
}

impl Resource for DiscountRule {
    const TABLE: &'static str = "discount_rules";
    const LABEL: &'static str = "Discount";
    const PATH: &'static str = "/api/discounts";

    type Input = DiscountRuleInput;

    fn id(&self) -> Uuid {
        self.id
    }

    fn organization_id(&self) -> Uuid {
        self.organization_id
    }

    fn from_input(input: DiscountRuleInput, stamp: Stamp) -> Self {
        let mut rule = Self {
            id: stamp.id,
            organization_id: stamp.organization_id,
            name: String::new(),
            promo_code: String::new(),
            discount_type: DiscountType::Percentage,
            discount_value: Decimal::ZERO,
            minimum_order_value: None,
            minimum_linear_feet: None,
            maximum_discount_amount: None,
            valid_from: None,
            valid_until: None,
            is_active: true,
            created_at: stamp.now,
            updated_at: stamp.now,
        };
        rule.apply_input(input, stamp.now);
        rule
    }

    fn apply_input(&mut self, input: DiscountRuleInput, now: DateTime<Utc>) {
        self.name = input.name.trim().to_string();
        self.promo_code = Self::normalize_code(&input.promo_code);
        self.discount_type = input.discount_type;
        self.discount_value = input.discount_value;
        self.minimum_order_value = input.minimum_order_value;
        self.minimum_linear_feet = input.minimum_linear_feet;
        self.maximum_discount_amount = input.maximum_discount_amount;
        self.valid_from = input.valid_from;
        self.valid_until = input.valid_until;
        self.is_active = input.is_active;
        self.updated_at = now;
    }

    fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        require_text(&mut errors, "name", &self.name);
        require_text(&mut errors, "promo_code", &self.promo_code);
        match self.discount_type {
            DiscountType::Percentage => require_percentage(&mut errors, "discount_value", self.discount_value),
            DiscountType::FixedAmount => require_money(&mut errors, "discount_value", self.discount_value),
        }
        if let Some(min) = self.minimum_order_value {
            require_money(&mut errors, "minimum_order_value", min);
        }
        if let Some(cap) = self.maximum_discount_amount {
            require_money(&mut errors, "maximum_discount_amount", cap);
        }
        if let Some(feet) = self.minimum_linear_feet {
            require_feet(&mut errors, "minimum_linear_feet", feet);
        }
        if let (Some(from), Some(until)) = (self.valid_from, self.valid_until) {
            if from > until {
                errors.insert("valid_until".to_string(), "Must not be before valid_from".to_string());
            }
        }
        errors
    }

    fn unique_value(&self) -> Option<(&'static str, String)> {
        Some(("promo_code", self.promo_code.clone()))
    }
}
