use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::validation::validate_rate_amount;

/// Whether an order may be settled in installments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentPolicy {
    FullOnly,
    AdvanceAllowed,
}

impl PaymentPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentPolicy::FullOnly => "full_only",
            PaymentPolicy::AdvanceAllowed => "advance_allowed",
        }
    }

    /// Whether an order may be marked as advance-paid under this policy
    pub fn allows_advance(&self) -> bool {
        matches!(self, PaymentPolicy::AdvanceAllowed)
    }
}

impl Default for PaymentPolicy {
    fn default() -> Self {
        PaymentPolicy::FullOnly
    }
}

impl std::fmt::Display for PaymentPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The shop's rate card. A single row exists once an administrator has configured it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct PriceTable {
    #[schema(value_type = String, example = "1.00")]
    pub price_per_mono_page: Decimal,
    #[schema(value_type = String, example = "5.00")]
    pub price_per_color_page: Decimal,
    #[schema(value_type = String, example = "20.00")]
    pub binding_cost: Decimal,
    pub payment_policy: PaymentPolicy,
    pub last_updated: DateTime<Utc>,
}

impl PriceTable {
    /// Rate card with the shop's historical default prices
    pub fn with_defaults() -> Self {
        Self {
            price_per_mono_page: Decimal::new(100, 2),
            price_per_color_page: Decimal::new(500, 2),
            binding_cost: Decimal::new(2000, 2),
            payment_policy: PaymentPolicy::FullOnly,
            last_updated: Utc::now(),
        }
    }
}

/// Request DTO for replacing the rate card (admin only)
///
/// Rates are stored as NUMERIC(7, 2).
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdatePriceTableRequest {
    #[validate(custom = "validate_rate_amount")]
    #[schema(value_type = String, example = "1.00")]
    pub price_per_mono_page: Decimal,
    #[validate(custom = "validate_rate_amount")]
    #[schema(value_type = String, example = "5.00")]
    pub price_per_color_page: Decimal,
    #[validate(custom = "validate_rate_amount")]
    #[schema(value_type = String, example = "20.00")]
    pub binding_cost: Decimal,
    #[serde(default)]
    pub payment_policy: PaymentPolicy,
}

/// Running totals accumulated by bulk approval
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct PrintStatistics {
    #[schema(value_type = String, example = "1520.00")]
    pub total_earnings: Decimal,
    pub total_pages_printed: i64,
    pub last_updated: DateTime<Utc>,
}

impl Default for PrintStatistics {
    fn default() -> Self {
        Self {
            total_earnings: Decimal::ZERO,
            total_pages_printed: 0,
            last_updated: Utc::now(),
        }
    }
}
