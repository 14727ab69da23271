use super::{build_client, join, parse_base};
use crate::domain::asset::{AssetFile, AssetKind, UploadedAsset};
use crate::domain::ports::MediaStore;
use crate::error::{CheckoutError, Result};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, instrument};

#[derive(Debug, Deserialize)]
struct UploadResponse {
    url: String,
    #[serde(default, alias = "pathname")]
    filename: Option<String>,
}

/// Talks to the site's `/api/*-image` routes, which front blob storage.
#[derive(Clone)]
pub struct BlobProxyClient {
    client: reqwest::Client,
    site: Url,
}

impl BlobProxyClient {
    pub fn new(site_url: &str) -> Result<Self> {
        Ok(Self {
            client: build_client()?,
            site: parse_base(site_url)?,
        })
    }
}

#[async_trait]
impl MediaStore for BlobProxyClient {
    #[instrument(skip(self, file), fields(file = %file.file_name, bytes = file.len()))]
    async fn upload(
        &self,
        kind: AssetKind,
        file: &AssetFile,
        owner_id: Option<&str>,
    ) -> Result<UploadedAsset> {
        let part = Part::bytes(file.bytes.clone())
            .file_name(file.file_name.clone())
            .mime_str(&file.content_type)
            .map_err(|e| CheckoutError::UploadError(e.to_string()))?;
        let mut form = Form::new().part("file", part);
        if let Some(owner) = owner_id {
            form = form.text(kind.owner_field(), owner.to_string());
        }

        let response = self
            .client
            .post(join(&self.site, kind.endpoint())?)
            .multipart(form)
            .send()
            .await
            .map_err(|e| CheckoutError::UploadError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(CheckoutError::UploadError(format!(
                "{} returned {status} {detail}",
                kind.endpoint()
            )));
        }

        let body: UploadResponse = response
            .json()
            .await
            .map_err(|e| CheckoutError::UploadError(format!("unreadable upload response: {e}")))?;
        debug!(url = %body.url, "uploaded");

        Ok(UploadedAsset {
            pathname: body.filename.unwrap_or_else(|| file.file_name.clone()),
            url: body.url,
            owner_id: owner_id.map(str::to_string),
        })
    }

    #[instrument(skip(self))]
    async fn delete(&self, kind: AssetKind, url: &str) -> Result<()> {
        let response = self
            .client
            .delete(join(&self.site, kind.endpoint())?)
            .json(&json!({ "url": url }))
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => Ok(()),
            // Already gone.
            StatusCode::NOT_FOUND => Ok(()),
            status => Err(CheckoutError::UploadError(format!(
                "delete via {} returned {status}",
                kind.endpoint()
            ))),
        }
    }
}
