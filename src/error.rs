use std::fmt;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CheckoutError>;

/// Why the backend refused (or could not be asked) to start a payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitFailure {
    /// A requested tier no longer has enough tickets.
    OutOfStock(String),
    /// An item references an event or tier the backend does not know.
    InvalidItem(String),
    /// Any other explicit rejection from the backend.
    Rejected(String),
    /// The request never produced a usable answer (network, 5xx, bad body).
    Unavailable(String),
}

impl fmt::Display for InitFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfStock(msg) => write!(f, "out of stock: {msg}"),
            Self::InvalidItem(msg) => write!(f, "invalid item: {msg}"),
            Self::Rejected(msg) => write!(f, "rejected: {msg}"),
            Self::Unavailable(msg) => write!(f, "unavailable: {msg}"),
        }
    }
}

impl InitFailure {
    /// Classifies a backend rejection message.
    pub fn classify(message: &str) -> Self {
        let lower = message.to_lowercase();

        if lower.contains("out of stock")
            || lower.contains("sold out")
            || lower.contains("insufficient")
            || lower.contains("not enough")
            || lower.contains("available tickets")
        {
            return Self::OutOfStock(message.to_string());
        }

        if lower.contains("invalid event")
            || lower.contains("invalid tier")
            || lower.contains("event not found")
            || lower.contains("tier not found")
            || lower.contains("does not exist")
        {
            return Self::InvalidItem(message.to_string());
        }

        Self::Rejected(message.to_string())
    }
}

#[derive(Error, Debug)]
pub enum CheckoutError {
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Upload error: {0}")]
    UploadError(String),
    #[error("Domain error{}: {message}", status_suffix(.status))]
    DomainError {
        status: Option<u16>,
        message: String,
    },
    #[error("Rollback of {url} failed: {reason}")]
    RollbackError { url: String, reason: String },
    #[error("Payment initialization failed, {0}")]
    PaymentInitError(InitFailure),
    #[error("Superseded by a newer checkout attempt")]
    Superseded,
    #[error("Transport error: {0}")]
    TransportError(#[from] reqwest::Error),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
    #[error("Internal error: {0}")]
    InternalError(Box<dyn std::error::Error + Send + Sync>),
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|code| format!(" ({code})")).unwrap_or_default()
}

#[cfg(feature = "storage-rocksdb")]
impl From<rocksdb::Error> for CheckoutError {
    fn from(err: rocksdb::Error) -> Self {
        CheckoutError::InternalError(Box::new(err))
    }
}

impl CheckoutError {
    /// Rank used when several causes compete for the single message shown
    /// per attempt. Lower wins.
    pub fn priority(&self) -> u8 {
        match self {
            Self::ValidationError(_) => 0,
            Self::UploadError(_) => 1,
            Self::DomainError {
                status: Some(code), ..
            } if *code < 500 => 2,
            Self::DomainError { .. } => 3,
            Self::PaymentInitError(_) => 4,
            Self::RollbackError { .. } => 9,
            _ => 5,
        }
    }

    /// The one message an end user sees for this failure.
    pub fn user_message(&self) -> String {
        match self {
            Self::ValidationError(msg) => msg.clone(),
            Self::UploadError(_) => "Image upload failed. Please try again.".to_string(),
            Self::DomainError {
                status: Some(code),
                message,
            } if *code < 500 => message.clone(),
            Self::DomainError { .. } => {
                "We could not save your changes. Please try again.".to_string()
            }
            Self::PaymentInitError(InitFailure::OutOfStock(msg)) => format!(
                "Some tickets in your cart are no longer available: {msg}"
            ),
            Self::PaymentInitError(InitFailure::InvalidItem(msg)) => {
                format!("Your cart contains an event that can no longer be booked: {msg}")
            }
            Self::PaymentInitError(InitFailure::Rejected(msg)) => msg.clone(),
            Self::PaymentInitError(InitFailure::Unavailable(_)) => {
                "Could not start payment, try again.".to_string()
            }
            Self::Superseded => "A newer checkout attempt is in progress.".to_string(),
            _ => "Something went wrong. Please try again.".to_string(),
        }
    }

    /// Picks the highest-priority error out of several sub-step failures.
    pub fn most_specific(errors: impl IntoIterator<Item = CheckoutError>) -> Option<Self> {
        errors.into_iter().min_by_key(CheckoutError::priority)
    }
}
