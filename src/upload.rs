//! Media host upload client.
//!
//! Talks a Cloudinary-style signed upload protocol:
//! `POST {upload_url}/{cloud_name}/{resource_type}/upload` as a multipart
//! form, with a SHA-256 signature over the sorted non-file parameters. Two
//! entry points exist: data-URI uploads for generated images, and buffer
//! uploads for arbitrary media. Both trust the host's result object and
//! return its `secure_url` verbatim; there is no existence check, no dedup,
//! and no retry.

use reqwest::multipart::{Form, Part};
use reqwest::Client;
use sha2::{Digest, Sha256};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::config::MediaHostConfig;
use crate::error::Error;

/// Resource-type tag telling the media host how to store and transcode an
/// uploaded buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Image,
    Video,
    Raw,
}

impl ResourceKind {
    /// Path segment in the upload URL.
    pub fn resource_type(self) -> &'static str {
        match self {
            ResourceKind::Image => "image",
            ResourceKind::Video => "video",
            ResourceKind::Raw => "raw",
        }
    }

    /// Output format requested for buffer uploads.
    pub fn format(self) -> &'static str {
        match self {
            ResourceKind::Image => "png",
            ResourceKind::Video => "mp4",
            ResourceKind::Raw => "mp3",
        }
    }
}

/// Upload client configured once and shared across requests.
#[derive(Clone)]
pub struct MediaHost {
    client: Client,
    config: MediaHostConfig,
}

impl MediaHost {
    pub fn new(client: Client, config: MediaHostConfig) -> Self {
        Self { client, config }
    }

    /// Upload a base64 data URI as an image asset.
    ///
    /// The asset lands in the configured image folder under `public_id`,
    /// overwriting any existing asset with the same identifier. Returns the
    /// host's secure URL.
    pub async fn upload_data_uri(&self, data_uri: &str, public_id: &str) -> Result<String, Error> {
        let timestamp = unix_timestamp();
        let params = vec![
            ("folder".to_string(), self.config.image_folder.clone()),
            ("overwrite".to_string(), "true".to_string()),
            ("public_id".to_string(), public_id.to_string()),
            ("timestamp".to_string(), timestamp.to_string()),
        ];
        let signature = self.sign(&params)?;

        let form = params
            .into_iter()
            .fold(Form::new(), |form, (name, value)| form.text(name, value))
            .text("api_key", self.config.api_key.clone())
            .text("signature", signature)
            .text("file", data_uri.to_string());

        self.send(ResourceKind::Image, form).await
    }

    /// Upload a raw binary buffer tagged with a resource kind.
    ///
    /// The output format follows the kind (png/mp4/mp3) and the asset lands
    /// in the configured media folder. The host's error passes through
    /// unmodified on failure.
    pub async fn upload_buffer(
        &self,
        buffer: Vec<u8>,
        public_id: &str,
        kind: ResourceKind,
    ) -> Result<String, Error> {
        let timestamp = unix_timestamp();
        let params = vec![
            ("folder".to_string(), self.config.media_folder.clone()),
            ("format".to_string(), kind.format().to_string()),
            ("public_id".to_string(), public_id.to_string()),
            ("timestamp".to_string(), timestamp.to_string()),
        ];
        let signature = self.sign(&params)?;

        let file_part = Part::bytes(buffer).file_name(public_id.to_string());
        let form = params
            .into_iter()
            .fold(Form::new(), |form, (name, value)| form.text(name, value))
            .text("api_key", self.config.api_key.clone())
            .text("signature", signature)
            .part("file", file_part);

        self.send(kind, form).await
    }

    /// Sign the sorted parameter list with the configured secret.
    fn sign(&self, params: &[(String, String)]) -> Result<String, Error> {
        let secret = self
            .config
            .api_secret
            .as_ref()
            .ok_or_else(|| Error::Upload("media host API secret not configured".to_string()))?;
        Ok(sign_params(params, secret.expose_secret()))
    }

    /// POST the form and extract `secure_url` from the host's result object.
    async fn send(&self, kind: ResourceKind, form: Form) -> Result<String, Error> {
        let url = format!(
            "{}/{}/{}/upload",
            self.config.upload_url.trim_end_matches('/'),
            self.config.cloud_name,
            kind.resource_type()
        );

        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, url = %url, "Failed to reach media host");
                Error::Upload(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Media host rejected upload");
            return Err(Error::Upload(format!(
                "media host returned {}: {}",
                status, body
            )));
        }

        let result: serde_json::Value = response
            .json()
            .await
            .map_err(|e| Error::Upload(format!("invalid media host response: {}", e)))?;

        result
            .get("secure_url")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .ok_or_else(|| Error::Upload("media host response missing secure_url".to_string()))
    }
}

/// Compute the upload signature: hex(SHA-256(`k=v&k=v...` sorted by key, with
/// the secret appended)). `file`, `api_key`, and the resource type never
/// participate in signing.
fn sign_params(params: &[(String, String)], secret: &str) -> String {
    let mut sorted: Vec<&(String, String)> = params.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(&b.0));

    let joined = sorted
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha256::new();
    hasher.update(joined.as_bytes());
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}

fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
