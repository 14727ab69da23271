use crate::domain::asset::AssetKind;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// A domain payload that carries one image URL.
pub trait AssetPayload: Serialize + DeserializeOwned + Send + Sync {
    const KIND: AssetKind;

    fn asset_url(&self) -> Option<&str>;
    fn set_asset_url(&mut self, url: Option<String>);
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Default)]
pub struct VendorPayload {
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub location: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
}

impl AssetPayload for VendorPayload {
    const KIND: AssetKind = AssetKind::Vendor;

    fn asset_url(&self) -> Option<&str> {
        self.logo_url.as_deref()
    }

    fn set_asset_url(&mut self, url: Option<String>) {
        self.logo_url = url;
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct TicketTier {
    pub name: String,
    /// Minor currency units.
    pub price: u64,
    pub quantity: u32,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Default)]
pub struct EventPayload {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    pub location: String,
    pub start_date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(default)]
    pub tiers: Vec<TicketTier>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl AssetPayload for EventPayload {
    const KIND: AssetKind = AssetKind::Event;

    fn asset_url(&self) -> Option<&str> {
        self.image_url.as_deref()
    }

    fn set_asset_url(&mut self, url: Option<String>) {
        self.image_url = url;
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Default)]
pub struct FeedbackPayload {
    pub name: String,
    pub email: String,
    pub message: String,
    #[serde(default)]
    pub rating: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl AssetPayload for FeedbackPayload {
    const KIND: AssetKind = AssetKind::Feedback;

    fn asset_url(&self) -> Option<&str> {
        self.image_url.as_deref()
    }

    fn set_asset_url(&mut self, url: Option<String>) {
        self.image_url = url;
    }
}

/// Whatever the backend returned for a create or update.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct PersistedRecord {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub body: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vendor_logo_field() {
        let mut vendor = VendorPayload {
            name: "Suya Spot".to_string(),
            category: "food".to_string(),
            email: "hi@suya.ng".to_string(),
            ..Default::default()
        };
        assert!(serde_json::to_value(&vendor).unwrap().get("logo_url").is_none());

        vendor.set_asset_url(Some("https://blob/logo.png".to_string()));
        let json = serde_json::to_value(&vendor).unwrap();
        assert_eq!(json["logo_url"], "https://blob/logo.png");
        assert_eq!(vendor.asset_url(), Some("https://blob/logo.png"));
    }

    #[test]
    fn test_kinds() {
        assert_eq!(VendorPayload::KIND, AssetKind::Vendor);
        assert_eq!(EventPayload::KIND, AssetKind::Event);
        assert_eq!(FeedbackPayload::KIND, AssetKind::Feedback);
    }

    #[test]
    fn test_event_payload_from_json() {
        let json = r#"{"title":"Gala","location":"Lagos","start_date":"2026-12-01","tiers":[{"name":"VIP","price":5000000,"quantity":50}]}"#;
        let event: EventPayload = serde_json::from_str(json).unwrap();
        assert_eq!(event.tiers[0].price, 5_000_000);
        assert!(event.image_url.is_none());
    }
}
