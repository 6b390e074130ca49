//! HTTP request handlers.

use axum::{extract::State, response::IntoResponse, Json};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::Deserialize;
use uuid::Uuid;

use super::server::AppState;
use crate::error::Error;
use crate::script;

/// Request body shared by both prompt-driven endpoints.
#[derive(Debug, Deserialize)]
pub struct PromptRequest {
    #[serde(default)]
    pub prompt: Option<String>,
}

/// Reject missing, empty, or whitespace-only prompts.
fn require_prompt(request: &PromptRequest) -> Result<&str, Error> {
    match request.prompt.as_deref() {
        Some(prompt) if !prompt.trim().is_empty() => Ok(prompt),
        _ => Err(Error::Validation("Prompt is required".to_string())),
    }
}

/// Encode raw PNG bytes as a base64 data URI, the media host's preferred
/// upload payload for images.
fn to_png_data_uri(bytes: &[u8]) -> String {
    format!("data:image/png;base64,{}", BASE64.encode(bytes))
}

/// Handle POST /api/generate-image
///
/// prompt -> image backend (binary PNG) -> data URI -> media host upload ->
/// `{ "imageUrl": <secure url> }`.
pub async fn generate_image(
    State(state): State<AppState>,
    Json(request): Json<PromptRequest>,
) -> Result<Json<serde_json::Value>, Error> {
    let prompt = require_prompt(&request)?;

    tracing::info!(prompt_len = prompt.len(), "Received image generation request");

    let image_bytes = state.image.generate(prompt).await?;
    let data_uri = to_png_data_uri(&image_bytes);

    let public_id = format!("ai_image_{}", Uuid::new_v4());
    let image_url = state.media.upload_data_uri(&data_uri, &public_id).await?;

    tracing::info!(public_id = %public_id, "Image uploaded");

    Ok(Json(serde_json::json!({ "imageUrl": image_url })))
}

/// Handle POST /api/get-video-script
///
/// prompt -> shared chat session -> JSON parse + shape normalization ->
/// `{ "result": { "video_script": [...] } }`.
pub async fn get_video_script(
    State(state): State<AppState>,
    Json(request): Json<PromptRequest>,
) -> Result<Json<serde_json::Value>, Error> {
    let prompt = require_prompt(&request)?;

    tracing::info!(prompt_len = prompt.len(), "Received script generation request");

    // Hold the lock across the whole exchange so concurrent requests cannot
    // interleave turns in the shared conversation history.
    let text = {
        let mut session = state.chat.lock().await;
        session.send_message(prompt).await?
    };

    let (parsed, shape) = script::parse_script(&text)?;

    tracing::info!(
        shape = ?shape,
        scenes = parsed.video_script.len(),
        "Normalized video script"
    );

    Ok(Json(serde_json::json!({ "result": parsed })))
}

/// Handle GET /health
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "reelforge"
    }))
}
