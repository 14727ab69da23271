use crate::error::{CheckoutError, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One ticket line in an initialization request. Deliberately has no price.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub event_id: String,
    pub tier_name: String,
    pub quantity: u32,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub city: String,
    pub state: String,
    pub country: String,
}

/// Body of `POST /orders/initialize`.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct OrderInitializationRequest {
    pub email: String,
    pub items: Vec<OrderItem>,
    pub customer: Customer,
}

impl OrderInitializationRequest {
    pub fn new(email: impl Into<String>, items: Vec<OrderItem>, customer: Customer) -> Self {
        Self {
            email: email.into(),
            items,
            customer,
        }
    }

    /// Local checks run before any network call. Whether the events and
    /// tiers exist is left to the backend.
    pub fn validate(&self) -> Result<()> {
        validate_email(&self.email)?;
        if self.items.is_empty() {
            return Err(CheckoutError::ValidationError(
                "Your cart is empty".to_string(),
            ));
        }
        if let Some(item) = self.items.iter().find(|i| i.quantity == 0) {
            return Err(CheckoutError::ValidationError(format!(
                "Quantity for {} must be at least 1",
                item.tier_name
            )));
        }
        Ok(())
    }
}

/// What the backend returns for a successful initialization.
///
/// `amount_minor_units` is the only amount that may be charged.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct OrderInitializationResult {
    pub reference: String,
    #[serde(rename = "amount_kobo")]
    pub amount_minor_units: u64,
}

impl OrderInitializationResult {
    pub fn amount_major_units(&self) -> Decimal {
        Decimal::from(self.amount_minor_units) / Decimal::ONE_HUNDRED
    }
}

/// Syntactic email check: one `@`, non-empty local part, a dotted domain,
/// no whitespace.
pub fn validate_email(email: &str) -> Result<()> {
    let invalid = || CheckoutError::ValidationError(format!("'{email}' is not a valid email address"));

    if email.chars().any(char::is_whitespace) {
        return Err(invalid());
    }
    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.contains('@') {
        return Err(invalid());
    }
    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 || labels.iter().any(|label| label.is_empty()) {
        return Err(invalid());
    }
    Ok(())
}
