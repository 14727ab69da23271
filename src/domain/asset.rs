use crate::error::{CheckoutError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use uuid::Uuid;

pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;
pub const DEFAULT_ALLOWED_TYPES: [&str; 4] = ["image/jpeg", "image/png", "image/webp", "image/gif"];

/// Which entity an image belongs to. Selects both the blob proxy route and
/// the backend resource.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Hash, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Vendor,
    Event,
    Feedback,
}

impl AssetKind {
    /// Blob proxy route, relative to the site root.
    pub fn endpoint(&self) -> &'static str {
        match self {
            Self::Vendor => "/api/vendor-image",
            Self::Event => "/api/event-image",
            Self::Feedback => "/api/feedback-image",
        }
    }

    /// Multipart field carrying the owning entity's id on upload.
    pub fn owner_field(&self) -> &'static str {
        match self {
            Self::Vendor => "vendorId",
            Self::Event => "eventId",
            Self::Feedback => "feedbackId",
        }
    }

    pub fn create_path(&self) -> &'static str {
        match self {
            Self::Vendor => "vendors/register",
            Self::Event => "events",
            Self::Feedback => "feedback",
        }
    }

    /// `None` when the backend has no update route for this kind.
    pub fn update_path(&self, id: &str) -> Option<String> {
        match self {
            Self::Vendor => Some(format!("vendors/{id}")),
            Self::Event => Some(format!("events/{id}")),
            Self::Feedback => None,
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Vendor => "vendor",
            Self::Event => "event",
            Self::Feedback => "feedback",
        })
    }
}

impl FromStr for AssetKind {
    type Err = CheckoutError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "vendor" => Ok(Self::Vendor),
            "event" => Ok(Self::Event),
            "feedback" => Ok(Self::Feedback),
            other => Err(CheckoutError::ValidationError(format!(
                "Unknown asset kind '{other}'"
            ))),
        }
    }
}

/// A binary the user picked for upload.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct AssetFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl AssetFile {
    pub fn new(file_name: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    /// Reads a file from disk, deriving its MIME type from the extension.
    /// Unknown extensions become `application/octet-stream` and are
    /// rejected later by [`UploadPolicy::validate`].
    pub async fn from_path(path: &Path) -> Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        let content_type = match path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .as_deref()
        {
            Some("jpg" | "jpeg") => "image/jpeg",
            Some("png") => "image/png",
            Some("webp") => "image/webp",
            Some("gif") => "image/gif",
            _ => "application/octet-stream",
        };
        Ok(Self::new(file_name, content_type, bytes))
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Size and type limits applied before an upload is attempted.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct UploadPolicy {
    pub max_bytes: usize,
    pub allowed_types: Vec<String>,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            allowed_types: DEFAULT_ALLOWED_TYPES.iter().map(|t| t.to_string()).collect(),
        }
    }
}

impl UploadPolicy {
    pub fn validate(&self, file: &AssetFile) -> Result<()> {
        if file.is_empty() {
            return Err(CheckoutError::ValidationError(format!(
                "{} is empty",
                file.file_name
            )));
        }
        if file.len() > self.max_bytes {
            return Err(CheckoutError::ValidationError(format!(
                "{} is too large ({} bytes, max {} bytes)",
                file.file_name,
                file.len(),
                self.max_bytes
            )));
        }
        if !self
            .allowed_types
            .iter()
            .any(|t| t.eq_ignore_ascii_case(&file.content_type))
        {
            return Err(CheckoutError::ValidationError(format!(
                "{} has unsupported type {}; allowed: {}",
                file.file_name,
                file.content_type,
                self.allowed_types.join(", ")
            )));
        }
        Ok(())
    }
}

/// Result of a successful upload. Unowned until the domain call succeeds.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct UploadedAsset {
    pub url: String,
    pub pathname: String,
    #[serde(default)]
    pub owner_id: Option<String>,
}

/// Durable note of an asset whose compensating delete failed.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct OrphanRecord {
    pub id: Uuid,
    pub url: String,
    pub pathname: String,
    pub endpoint: AssetKind,
    pub timestamp: DateTime<Utc>,
}

impl OrphanRecord {
    pub fn new(kind: AssetKind, url: impl Into<String>, pathname: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            url: url.into(),
            pathname: pathname.into(),
            endpoint: kind,
            timestamp: Utc::now(),
        }
    }
}
