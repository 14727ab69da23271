use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Where a payment stands after (or while) polling the backend.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum PaymentVerificationState {
    Verifying,
    Success,
    Pending,
    PendingTimeout,
    Failed,
    NotFound,
    Error,
}

impl PaymentVerificationState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Verifying | Self::Pending)
    }

    /// `true` when we do not know whether money moved.
    pub fn is_ambiguous(&self) -> bool {
        matches!(self, Self::PendingTimeout | Self::Error)
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Verifying => "Verifying your payment...",
            Self::Success => "Payment confirmed. Your tickets are ready.",
            Self::Pending => "Your payment is still processing...",
            Self::PendingTimeout | Self::Error => {
                "Payment status unknown, check your ticket page shortly."
            }
            Self::Failed => "Your payment was declined.",
            Self::NotFound => "We could not find a payment with this reference.",
        }
    }
}

impl fmt::Display for PaymentVerificationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Verifying => "verifying",
            Self::Success => "success",
            Self::Pending => "pending",
            Self::PendingTimeout => "pending_timeout",
            Self::Failed => "failed",
            Self::NotFound => "not_found",
            Self::Error => "error",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct VerifiedItem {
    #[serde(default)]
    pub event_title: Option<String>,
    #[serde(default)]
    pub tier_name: Option<String>,
    #[serde(default)]
    pub quantity: Option<u32>,
}

/// The `data` block of a settled verification response.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct VerifiedPayment {
    pub reference: String,
    #[serde(default)]
    pub amount_paid: u64,
    #[serde(default)]
    pub items: Vec<VerifiedItem>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// One answer from the verification endpoint.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum VerificationResponse {
    Paid(VerifiedPayment),
    Pending,
    Failed(Option<String>),
    NotFound,
}

/// Configuration handed to the hosted payment widget.
///
/// `amount` and `reference` are copied from the server initialization
/// result, never from a cart total.
#[derive(Debug, Serialize, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct WidgetConfig {
    pub public_key: String,
    pub email: String,
    pub amount: u64,
    pub reference: String,
    pub currency: String,
    pub metadata: serde_json::Value,
}

impl WidgetConfig {
    pub fn from_initialization(
        init: &crate::domain::order::OrderInitializationResult,
        public_key: &str,
        email: &str,
        currency: &str,
        metadata: serde_json::Value,
    ) -> Self {
        Self {
            public_key: public_key.to_string(),
            email: email.to_string(),
            amount: init.amount_minor_units,
            reference: init.reference.clone(),
            currency: currency.to_string(),
            metadata,
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum WidgetOutcome {
    /// The widget reported a completed charge for this reference.
    Success { reference: String },
    /// The user closed the widget without paying.
    Closed,
}

/// Instruction to move the user to their tickets once the success screen
/// has had time to render.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Redirect {
    pub path: String,
    pub after: Duration,
}

impl Redirect {
    pub fn to_tickets(reference: &str, after: Duration) -> Self {
        Self {
            path: format!("/tickets/{reference}"),
            after,
        }
    }
}
