//! Stateful chat-completion session against a Gemini-style API.
//!
//! The session keeps the full conversation history and replays it on every
//! `generateContent` call, so cross-request conversational memory is
//! intentional. One session is shared process-wide behind a mutex (see
//! `api::server::AppState`); callers hold the lock across the whole exchange
//! so concurrent requests serialize instead of interleaving history writes.

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::ChatBackendConfig;
use crate::error::Error;

/// One conversational turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    pub role: String,
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Part {
    pub text: String,
}

impl Content {
    fn user(text: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            parts: vec![Part { text: text.into() }],
        }
    }

    fn model(text: impl Into<String>) -> Self {
        Self {
            role: "model".to_string(),
            parts: vec![Part { text: text.into() }],
        }
    }
}

#[derive(Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(rename = "systemInstruction", skip_serializing_if = "Option::is_none")]
    system_instruction: Option<SystemInstruction>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct SystemInstruction {
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct GenerationConfig {
    #[serde(rename = "responseMimeType")]
    response_mime_type: &'static str,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate's parts, if any.
    fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        if content.parts.is_empty() {
            return None;
        }
        Some(
            content
                .parts
                .iter()
                .map(|p| p.text.as_str())
                .collect::<String>(),
        )
    }
}

/// A chat session with accumulated history.
pub struct ChatSession {
    client: Client,
    config: ChatBackendConfig,
    history: Vec<Content>,
}

impl ChatSession {
    pub fn new(client: Client, config: ChatBackendConfig) -> Self {
        Self {
            client,
            config,
            history: Vec::new(),
        }
    }

    /// Number of turns accumulated so far.
    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Send `prompt` as the next user turn and return the model's reply text.
    ///
    /// The user turn is committed to the history only together with the model
    /// turn, so a failed exchange leaves the history unchanged.
    pub async fn send_message(&mut self, prompt: &str) -> Result<String, Error> {
        let user_turn = Content::user(prompt);

        let mut contents = self.history.clone();
        contents.push(user_turn.clone());

        let body = GenerateContentRequest {
            contents,
            system_instruction: self.config.system_instruction.as_ref().map(|text| {
                SystemInstruction {
                    parts: vec![Part { text: text.clone() }],
                }
            }),
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
            },
        };

        let url = format!(
            "{}/models/{}:generateContent",
            self.config.url.trim_end_matches('/'),
            self.config.model
        );

        let mut request = self.client.post(&url).json(&body);
        if let Some(api_key) = &self.config.api_key {
            request = request.header("x-goog-api-key", api_key.expose_secret());
        }

        let response = request.send().await.map_err(|e| {
            tracing::error!(error = %e, model = %self.config.model, "Failed to reach chat backend");
            Error::Upstream {
                message: "Script generation failed".to_string(),
                details: e.to_string(),
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Chat backend returned error");
            return Err(Error::Upstream {
                message: "Script generation failed".to_string(),
                details: format!("chat backend returned {}: {}", status, body),
            });
        }

        let parsed: GenerateContentResponse =
            response.json().await.map_err(|e| Error::Upstream {
                message: "Script generation failed".to_string(),
                details: format!("invalid chat backend response: {}", e),
            })?;

        let text = parsed.text().ok_or_else(|| Error::Upstream {
            message: "Script generation failed".to_string(),
            details: "chat backend response had no candidates".to_string(),
        })?;

        self.history.push(user_turn);
        self.history.push(Content::model(text.clone()));

        Ok(text)
    }
}
