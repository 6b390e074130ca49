//! Image-generation backend client.

use bytes::Bytes;
use reqwest::header;
use reqwest::Client;
use std::time::Duration;

use crate::config::ImageBackendConfig;
use crate::error::Error;

/// Client for a text-to-image backend that answers with raw PNG bytes.
#[derive(Clone)]
pub struct ImageBackend {
    client: Client,
    config: ImageBackendConfig,
}

impl ImageBackend {
    pub fn new(client: Client, config: ImageBackendConfig) -> Self {
        Self { client, config }
    }

    /// Generate an image for `prompt`, returning the raw response bytes.
    ///
    /// The request carries `Accept: image/png` and is bounded by the
    /// configured timeout (default 60s). Error bodies are opportunistically
    /// decoded to text for the `details` field.
    pub async fn generate(&self, prompt: &str) -> Result<Bytes, Error> {
        let mut request = self
            .client
            .post(&self.config.url)
            .header(header::ACCEPT, "image/png")
            .timeout(Duration::from_secs(self.config.timeout_secs))
            .json(&serde_json::json!({ "inputs": prompt }));

        if let Some(api_key) = &self.config.api_key {
            request = request.header(
                header::AUTHORIZATION,
                format!("Bearer {}", api_key.expose_secret()),
            );
        }

        let response = request.send().await.map_err(|e| {
            tracing::error!(error = %e, url = %self.config.url, "Failed to reach image backend");
            Error::Upstream {
                message: "Image generation failed".to_string(),
                details: e.to_string(),
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.bytes().await.unwrap_or_default();
            let details = decode_error_body(&body);
            tracing::error!(status = %status, details = %details, "Image backend returned error");
            return Err(Error::Upstream {
                message: "Image generation failed".to_string(),
                details,
            });
        }

        response.bytes().await.map_err(|e| Error::Upstream {
            message: "Image generation failed".to_string(),
            details: e.to_string(),
        })
    }
}

/// Decode an error body to text when it is valid UTF-8; binary garbage falls
/// back to a fixed marker.
fn decode_error_body(body: &[u8]) -> String {
    match std::str::from_utf8(body) {
        Ok(text) if !text.trim().is_empty() => text.to_string(),
        _ => "unknown binary error payload".to_string(),
    }
}
