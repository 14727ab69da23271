use crate::domain::order::OrderItem;
use crate::error::{CheckoutError, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;

/// A ticket line held in the shopping cart.
///
/// `price` is in minor currency units (kobo) and is only ever used for
/// display. The amount actually charged comes from the backend.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub event_id: String,
    pub tier_id: String,
    pub event_title: String,
    pub tier_name: String,
    pub price: u64,
    pub quantity: u32,
    pub max_quantity: u32,
    #[serde(default)]
    pub event_image: Option<String>,
}

impl CartItem {
    fn same_line(&self, other: &CartItem) -> bool {
        self.event_id == other.event_id && self.tier_id == other.tier_id
    }
}

#[derive(Debug, Default)]
struct CartState {
    items: Vec<CartItem>,
    cleared_for: Option<String>,
}

/// Explicit cart store shared between the checkout session and the
/// payment verifier.
///
/// `Clone` shares the same underlying state.
#[derive(Debug, Default, Clone)]
pub struct CartStore {
    state: Arc<RwLock<CartState>>,
}

impl CartStore {
    /// Creates an empty cart.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a cart pre-filled with `items`, validating each one.
    pub async fn with_items(items: Vec<CartItem>) -> Result<Self> {
        let cart = Self::new();
        for item in items {
            cart.add_item(item).await?;
        }
        Ok(cart)
    }

    /// Adds an item, merging with an existing line for the same event and
    /// tier. The merged quantity is capped at `max_quantity`.
    pub async fn add_item(&self, item: CartItem) -> Result<()> {
        if item.max_quantity == 0 {
            return Err(CheckoutError::ValidationError(format!(
                "{} - {} is not available",
                item.event_title, item.tier_name
            )));
        }
        if item.quantity == 0 {
            return Err(CheckoutError::ValidationError(
                "Quantity must be at least 1".to_string(),
            ));
        }

        let mut state = self.state.write().await;
        if let Some(existing) = state.items.iter_mut().find(|i| i.same_line(&item)) {
            existing.quantity = existing
                .quantity
                .saturating_add(item.quantity)
                .min(existing.max_quantity);
        } else {
            let mut item = item;
            item.quantity = item.quantity.min(item.max_quantity);
            state.items.push(item);
        }
        Ok(())
    }

    /// Sets the quantity of a line. Values outside `1..=max_quantity` are
    /// rejected and leave the cart untouched.
    pub async fn update_quantity(&self, event_id: &str, tier_id: &str, quantity: u32) -> Result<()> {
        let mut state = self.state.write().await;
        let item = state
            .items
            .iter_mut()
            .find(|i| i.event_id == event_id && i.tier_id == tier_id)
            .ok_or_else(|| CheckoutError::ValidationError("Item is not in the cart".to_string()))?;

        if quantity == 0 || quantity > item.max_quantity {
            return Err(CheckoutError::ValidationError(format!(
                "Quantity must be between 1 and {}",
                item.max_quantity
            )));
        }
        item.quantity = quantity;
        Ok(())
    }

    /// Removes a line. Returns whether anything was removed.
    pub async fn remove_item(&self, event_id: &str, tier_id: &str) -> bool {
        let mut state = self.state.write().await;
        let before = state.items.len();
        state
            .items
            .retain(|i| !(i.event_id == event_id && i.tier_id == tier_id));
        before != state.items.len()
    }

    /// Empties the cart, returning the number of lines removed.
    pub async fn clear(&self) -> usize {
        let mut state = self.state.write().await;
        let removed = state.items.len();
        state.items.clear();
        removed
    }

    /// Empties the cart on behalf of a paid order. A second call for the
    /// same reference is a no-op and returns `false`.
    pub async fn clear_for_reference(&self, reference: &str) -> bool {
        let mut state = self.state.write().await;
        if state.cleared_for.as_deref() == Some(reference) {
            return false;
        }
        state.items.clear();
        state.cleared_for = Some(reference.to_string());
        true
    }

    pub async fn items(&self) -> Vec<CartItem> {
        self.state.read().await.items.clone()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.read().await.items.is_empty()
    }

    /// Display subtotal in major currency units. Never sent anywhere.
    pub async fn subtotal(&self) -> Decimal {
        let state = self.state.read().await;
        let minor: u64 = state
            .items
            .iter()
            .map(|i| i.price.saturating_mul(u64::from(i.quantity)))
            .sum();
        Decimal::from(minor) / Decimal::ONE_HUNDRED
    }

    /// Price-free projection of the cart used to build an order request.
    pub async fn order_items(&self) -> Vec<OrderItem> {
        self.state
            .read()
            .await
            .items
            .iter()
            .map(|i| OrderItem {
                event_id: i.event_id.clone(),
                tier_name: i.tier_name.clone(),
                quantity: i.quantity,
            })
            .collect()
    }
}
