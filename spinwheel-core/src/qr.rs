//! QR collaborator client.
//!
//! Voucher creation optionally attaches a scannable image. The collaborator
//! contract is: encode the payload, upload the rendered image, return its
//! URL — and on any failure return a deterministic public render URL
//! instead of erroring. A voucher without a hosted image is still a valid,
//! redeemable voucher, so nothing on this path may fail creation.

use async_trait::async_trait;
use tracing::warn;

use crate::Error;

/// Public QR-rendering endpoint parameterized by the encoded payload, used
/// whenever the uploader is unavailable or misbehaves.
pub fn fallback_qr_url(text: &str) -> String {
    format!(
        "https://api.qrserver.com/v1/create-qr-code/?size=300x300&data={}",
        urlencoding::encode(text)
    )
}

#[async_trait]
pub trait QrImageService: Send + Sync {
    /// Encode `text` and return a URL for the rendered image. Never fails.
    async fn create_and_upload(&self, text: &str) -> String;
}

#[derive(Clone)]
pub struct HttpQrImageService {
    client: reqwest::Client,
    upload_url: Option<String>,
}

impl HttpQrImageService {
    /// `upload_url` is the image-hosting endpoint; with `None` every call
    /// resolves to the public fallback.
    pub fn new(upload_url: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            upload_url,
        }
    }

    async fn try_upload(&self, upload_url: &str, text: &str) -> Result<String, Error> {
        let response = self
            .client
            .post(upload_url)
            .json(&serde_json::json!({ "data": text, "size": "300x300" }))
            .send()
            .await?
            .error_for_status()?;

        let body: serde_json::Value = response.json().await?;
        body.get("url")
            .and_then(|u| u.as_str())
            .map(str::to_string)
            .ok_or_else(|| Error::Parse("uploader response missing url".to_string()))
    }
}

#[async_trait]
impl QrImageService for HttpQrImageService {
    async fn create_and_upload(&self, text: &str) -> String {
        if let Some(upload_url) = &self.upload_url {
            match self.try_upload(upload_url, text).await {
                Ok(url) => return url,
                Err(e) => {
                    warn!("QR upload failed, using fallback URL: {}", e);
                }
            }
        }
        fallback_qr_url(text)
    }
}
