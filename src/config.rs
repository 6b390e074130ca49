//! Configuration parsing and validation for reelforge.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::path::Path;

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub image: ImageBackendConfig,
    pub chat: ChatBackendConfig,
    pub media: MediaHostConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Address to listen on (e.g., "127.0.0.1:8080")
    #[serde(default = "default_listen")]
    pub listen: String,
}

fn default_listen() -> String {
    "127.0.0.1:8080".to_string()
}

/// Secret wrapper that redacts in Debug/Display/Serialize and zeroizes on drop.
///
/// The inner `SecretString` ensures the value is:
/// - Zeroized in memory when dropped
/// - Never exposed via Debug or Display
/// - Only accessible via `.expose_secret()` (grep-auditable)
#[derive(Clone)]
pub struct ApiKey(SecretString);

impl ApiKey {
    /// Access the raw value. Every call site is auditable via `grep expose_secret`.
    pub fn expose_secret(&self) -> &str {
        self.0.expose_secret()
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl std::fmt::Display for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl Serialize for ApiKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str("[REDACTED]")
    }
}

impl<'de> serde::Deserialize<'de> for ApiKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(|s| ApiKey(SecretString::from(s)))
    }
}

impl From<String> for ApiKey {
    fn from(s: String) -> Self {
        ApiKey(SecretString::from(s))
    }
}

impl From<&str> for ApiKey {
    fn from(s: &str) -> Self {
        ApiKey(SecretString::from(s))
    }
}

/// How a secret was resolved.
#[derive(Debug, Clone, PartialEq)]
pub enum KeySource {
    /// Value was a literal string in config (no ${} references)
    Literal,
    /// Value contained ${VAR} references expanded from environment
    EnvExpanded,
    /// Value was auto-discovered from convention env var (holds var name)
    Convention(String),
    /// No value available
    None,
}

impl std::fmt::Display for KeySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeySource::Literal => write!(f, "config-literal"),
            KeySource::EnvExpanded => write!(f, "env-expanded"),
            KeySource::Convention(var) => write!(f, "convention ({})", var),
            KeySource::None => write!(f, "none"),
        }
    }
}

/// Image-generation backend configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ImageBackendConfig {
    /// Full model endpoint URL (the backend returns raw PNG bytes)
    pub url: String,
    /// Optional bearer token
    pub api_key: Option<ApiKey>,
    /// Per-request timeout in seconds
    #[serde(default = "default_image_timeout")]
    pub timeout_secs: u64,
}

fn default_image_timeout() -> u64 {
    60
}

/// Chat-completion backend configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatBackendConfig {
    /// API base URL (e.g., "https://generativelanguage.googleapis.com/v1beta")
    pub url: String,
    /// Optional API key
    pub api_key: Option<ApiKey>,
    /// Model identifier
    #[serde(default = "default_chat_model")]
    pub model: String,
    /// Optional system instruction seeding the shared session
    pub system_instruction: Option<String>,
}

fn default_chat_model() -> String {
    "gemini-2.0-flash".to_string()
}

/// Media host (upload CDN) configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MediaHostConfig {
    /// Account cloud name, becomes part of the upload URL path
    pub cloud_name: String,
    /// Public API key sent with each upload
    pub api_key: String,
    /// Signing secret
    pub api_secret: Option<ApiKey>,
    /// Upload API base URL
    #[serde(default = "default_upload_url")]
    pub upload_url: String,
    /// Folder for generated images uploaded as data URIs
    #[serde(default = "default_image_folder")]
    pub image_folder: String,
    /// Folder for buffer uploads (audio/video/images)
    #[serde(default = "default_media_folder")]
    pub media_folder: String,
}

fn default_upload_url() -> String {
    "https://api.cloudinary.com/v1_1".to_string()
}

fn default_image_folder() -> String {
    "ai_generated_images".to_string()
}

fn default_media_folder() -> String {
    "reelforge_media".to_string()
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io {
            path: path.as_ref().display().to_string(),
            source: e,
        })?;

        Self::parse_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse_str(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.image.url.is_empty() {
            return Err(ConfigError::Validation(
                "Image backend URL is empty".to_string(),
            ));
        }
        if self.chat.url.is_empty() {
            return Err(ConfigError::Validation(
                "Chat backend URL is empty".to_string(),
            ));
        }
        if self.media.cloud_name.is_empty() {
            return Err(ConfigError::Validation(
                "Media host cloud_name is empty".to_string(),
            ));
        }
        if self.media.api_key.is_empty() {
            return Err(ConfigError::Validation(
                "Media host api_key is empty".to_string(),
            ));
        }
        if self.image.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "Image backend timeout_secs must be positive".to_string(),
            ));
        }

        if self.image.api_key.is_none() {
            tracing::warn!("No image backend API key configured - requests may be rejected");
        }
        if self.media.api_secret.is_none() {
            tracing::warn!("No media host API secret configured - uploads will fail to sign");
        }

        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Configuration validation error: {0}")]
    Validation(String),

    #[error("Environment variable '{var}' not set for {slot}: {message}")]
    EnvVar {
        var: String,
        slot: String,
        message: String,
    },
}

/// Raw image backend config with the secret as plain `Option<String>`,
/// so it may contain `${VAR}` references not yet expanded.
#[derive(Deserialize)]
struct RawImageBackendConfig {
    url: String,
    api_key: Option<String>,
    #[serde(default = "default_image_timeout")]
    timeout_secs: u64,
}

#[derive(Deserialize)]
struct RawChatBackendConfig {
    url: String,
    api_key: Option<String>,
    #[serde(default = "default_chat_model")]
    model: String,
    system_instruction: Option<String>,
}

#[derive(Deserialize)]
struct RawMediaHostConfig {
    cloud_name: String,
    api_key: String,
    api_secret: Option<String>,
    #[serde(default = "default_upload_url")]
    upload_url: String,
    #[serde(default = "default_image_folder")]
    image_folder: String,
    #[serde(default = "default_media_folder")]
    media_folder: String,
}

/// Raw configuration deserialized directly from TOML.
/// Secret values may contain `${VAR}` references not yet expanded.
#[derive(Deserialize)]
pub struct RawConfig {
    server: ServerConfig,
    image: RawImageBackendConfig,
    chat: RawChatBackendConfig,
    media: RawMediaHostConfig,
}

/// Expand all `${VAR}` references in a string using a custom lookup function.
///
/// The closure-based design makes this testable without touching global env state.
/// Supports multiple `${VAR}` in one string (e.g., `${SCHEME}://${HOST}/v1`).
/// Fails on first missing variable, unclosed `${`, or empty variable name.
fn expand_env_vars_with<F>(input: &str, slot: &str, lookup: F) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if !input.contains("${") {
        return Ok(input.to_string());
    }

    let mut result = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        result.push_str(&rest[..start]);
        let after = &rest[start + 2..];

        let end = after.find('}').ok_or_else(|| ConfigError::EnvVar {
            var: "<unclosed>".to_string(),
            slot: slot.to_string(),
            message: format!("Unclosed '${{' in config value: {}", input),
        })?;

        let var_name = &after[..end];
        if var_name.is_empty() {
            return Err(ConfigError::EnvVar {
                var: "".to_string(),
                slot: slot.to_string(),
                message: "Empty variable name in '${}' reference".to_string(),
            });
        }

        let value = lookup(var_name).ok_or_else(|| ConfigError::EnvVar {
            var: var_name.to_string(),
            slot: slot.to_string(),
            message: format!(
                "Environment variable '{}' is not set (referenced in {})",
                var_name, slot
            ),
        })?;

        result.push_str(&value);
        rest = &after[end + 1..];
    }

    result.push_str(rest);
    Ok(result)
}

/// Expand all `${VAR}` references in a string using real environment variables.
fn expand_env_vars(input: &str, slot: &str) -> Result<String, ConfigError> {
    expand_env_vars_with(input, slot, |name| std::env::var(name).ok())
}

/// Convention env var names for the three secret slots.
///
/// - "image" -> "REELFORGE_IMAGE_API_KEY"
/// - "chat"  -> "REELFORGE_CHAT_API_KEY"
/// - "media" -> "REELFORGE_MEDIA_API_SECRET" (it is a signing secret, not a key)
pub fn convention_env_var_name(slot: &str) -> String {
    match slot {
        "media" => "REELFORGE_MEDIA_API_SECRET".to_string(),
        _ => format!("REELFORGE_{}_API_KEY", slot.to_uppercase()),
    }
}

/// Resolve a single secret slot's raw value into an `ApiKey` with its source.
///
/// - If the raw value contains `${VAR}`: expand from environment, source = `EnvExpanded`
/// - If the raw value is a literal string: wrap directly, source = `Literal`
/// - If absent: try convention lookup, source = `Convention(var_name)` or `None`
fn resolve_secret(
    raw: Option<String>,
    slot: &str,
) -> Result<(Option<ApiKey>, KeySource), ConfigError> {
    match raw {
        Some(ref value) if value.contains("${") => {
            let expanded = expand_env_vars(value, slot)?;
            Ok((Some(ApiKey::from(expanded)), KeySource::EnvExpanded))
        }
        Some(value) => Ok((Some(ApiKey::from(value)), KeySource::Literal)),
        None => {
            let var_name = convention_env_var_name(slot);
            match std::env::var(&var_name) {
                Ok(value) => Ok((Some(ApiKey::from(value)), KeySource::Convention(var_name))),
                Err(_) => Ok((None, KeySource::None)),
            }
        }
    }
}

impl Config {
    /// Convert raw (deserialized) config to final config with env var expansion.
    ///
    /// Secret slots resolved: `image` (bearer token), `chat` (API key),
    /// `media` (signing secret). Each slot reports its `KeySource`.
    pub fn from_raw(raw: RawConfig) -> Result<(Self, Vec<(String, KeySource)>), ConfigError> {
        let mut key_sources = Vec::with_capacity(3);

        let (image_key, source) = resolve_secret(raw.image.api_key, "image")?;
        key_sources.push(("image".to_string(), source));

        let (chat_key, source) = resolve_secret(raw.chat.api_key, "chat")?;
        key_sources.push(("chat".to_string(), source));

        let (media_secret, source) = resolve_secret(raw.media.api_secret, "media")?;
        key_sources.push(("media".to_string(), source));

        let config = Config {
            server: raw.server,
            image: ImageBackendConfig {
                url: raw.image.url,
                api_key: image_key,
                timeout_secs: raw.image.timeout_secs,
            },
            chat: ChatBackendConfig {
                url: raw.chat.url,
                api_key: chat_key,
                model: raw.chat.model,
                system_instruction: raw.chat.system_instruction,
            },
            media: MediaHostConfig {
                cloud_name: raw.media.cloud_name,
                api_key: raw.media.api_key,
                api_secret: media_secret,
                upload_url: raw.media.upload_url,
                image_folder: raw.media.image_folder,
                media_folder: raw.media.media_folder,
            },
        };

        Ok((config, key_sources))
    }

    /// Load configuration from a TOML file with environment variable expansion.
    ///
    /// This is the env-var-aware entry point. It:
    /// 1. Reads the file
    /// 2. Parses as `RawConfig` (secrets as plain strings)
    /// 3. Expands `${VAR}` references and applies convention lookup
    /// 4. Validates the resulting config
    ///
    /// Returns the config and per-slot key source information.
    pub fn from_file_with_env(
        path: impl AsRef<Path>,
    ) -> Result<(Self, Vec<(String, KeySource)>), ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io {
            path: path.as_ref().display().to_string(),
            source: e,
        })?;

        let raw: RawConfig = toml::from_str(&content).map_err(ConfigError::Parse)?;
        let (config, key_sources) = Self::from_raw(raw)?;
        config.validate()?;

        Ok((config, key_sources))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_toml() -> &'static str {
        r#"
            [server]
            listen = "127.0.0.1:9000"

            [image]
            url = "https://img.example.com/models/sdxl"
            api_key = "hf_secret_token"

            [chat]
            url = "https://chat.example.com/v1beta"
            api_key = "gm_secret_key"

            [media]
            cloud_name = "demo-cloud"
            api_key = "123456789"
            api_secret = "topsecret"
        "#
    }

    #[test]
    fn test_parse_minimal_config() {
        let config = Config::parse_str(minimal_toml()).unwrap();
        assert_eq!(config.server.listen, "127.0.0.1:9000");
        assert_eq!(config.image.timeout_secs, 60);
        assert_eq!(config.chat.model, "gemini-2.0-flash");
        assert_eq!(config.media.upload_url, "https://api.cloudinary.com/v1_1");
        assert_eq!(config.media.image_folder, "ai_generated_images");
        assert_eq!(config.media.media_folder, "reelforge_media");
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
            [server]
            listen = "0.0.0.0:8080"

            [image]
            url = "https://img.example.com/models/sdxl"
            api_key = "hf_token"
            timeout_secs = 30

            [chat]
            url = "https://chat.example.com/v1beta"
            api_key = "gm_key"
            model = "gemini-2.5-pro"
            system_instruction = "Reply with JSON only."

            [media]
            cloud_name = "demo-cloud"
            api_key = "123456789"
            api_secret = "topsecret"
            upload_url = "https://upload.example.com/v1_1"
            image_folder = "images"
            media_folder = "media"
        "#;

        let config = Config::parse_str(toml).unwrap();
        assert_eq!(config.image.timeout_secs, 30);
        assert_eq!(config.chat.model, "gemini-2.5-pro");
        assert_eq!(
            config.chat.system_instruction.as_deref(),
            Some("Reply with JSON only.")
        );
        assert_eq!(config.media.upload_url, "https://upload.example.com/v1_1");
        assert_eq!(config.media.image_folder, "images");
    }

    #[test]
    fn test_empty_image_url_rejected() {
        let toml = r#"
            [server]
            listen = "127.0.0.1:9000"

            [image]
            url = ""

            [chat]
            url = "https://chat.example.com/v1beta"

            [media]
            cloud_name = "demo-cloud"
            api_key = "123456789"
        "#;

        let err = Config::parse_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let toml = r#"
            [server]
            listen = "127.0.0.1:9000"

            [image]
            url = "https://img.example.com/models/sdxl"
            timeout_secs = 0

            [chat]
            url = "https://chat.example.com/v1beta"

            [media]
            cloud_name = "demo-cloud"
            api_key = "123456789"
        "#;

        let err = Config::parse_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_api_key_debug_redaction() {
        let key = ApiKey::from("super-secret-token");
        let debug_output = format!("{:?}", key);
        assert_eq!(debug_output, "[REDACTED]");
        assert!(!debug_output.contains("super-secret"));
    }

    #[test]
    fn test_api_key_display_redaction() {
        let key = ApiKey::from("super-secret-token");
        let display_output = format!("{}", key);
        assert_eq!(display_output, "[REDACTED]");
    }

    #[test]
    fn test_api_key_serialize_redaction() {
        let key = ApiKey::from("real-secret-value");
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, "\"[REDACTED]\"");
        assert!(!json.contains("real-secret"));
    }

    #[test]
    fn test_api_key_expose_secret() {
        let key = ApiKey::from("the-actual-value");
        assert_eq!(key.expose_secret(), "the-actual-value");
    }

    #[test]
    fn test_config_debug_redaction() {
        let config = Config::parse_str(minimal_toml()).unwrap();
        let debug = format!("{:?}", config);
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("hf_secret_token"));
        assert!(!debug.contains("gm_secret_key"));
        assert!(!debug.contains("topsecret"));
    }

    #[test]
    fn test_expand_env_vars_single() {
        let result = expand_env_vars_with("${TOKEN}", "image", |name| match name {
            "TOKEN" => Some("resolved".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(result, "resolved");
    }

    #[test]
    fn test_expand_env_vars_embedded() {
        let result = expand_env_vars_with("Bearer ${TOKEN}!", "image", |name| match name {
            "TOKEN" => Some("abc".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(result, "Bearer abc!");
    }

    #[test]
    fn test_expand_env_vars_multiple() {
        let result = expand_env_vars_with("${A}:${B}", "chat", |name| match name {
            "A" => Some("key".to_string()),
            "B" => Some("id".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(result, "key:id");
    }

    #[test]
    fn test_expand_env_vars_missing() {
        let err = expand_env_vars_with("${MISSING}", "media", |_| None).unwrap_err();
        match err {
            ConfigError::EnvVar { var, slot, .. } => {
                assert_eq!(var, "MISSING");
                assert_eq!(slot, "media");
            }
            other => panic!("expected EnvVar error, got {:?}", other),
        }
    }

    #[test]
    fn test_expand_env_vars_unclosed() {
        let err = expand_env_vars_with("${OOPS", "image", |_| Some("x".to_string())).unwrap_err();
        assert!(matches!(err, ConfigError::EnvVar { .. }));
    }

    #[test]
    fn test_expand_env_vars_empty_name() {
        let err = expand_env_vars_with("${}", "image", |_| Some("x".to_string())).unwrap_err();
        assert!(matches!(err, ConfigError::EnvVar { .. }));
    }

    #[test]
    fn test_expand_env_vars_no_references() {
        let result = expand_env_vars_with("plain-value", "image", |_| None).unwrap();
        assert_eq!(result, "plain-value");
    }

    #[test]
    fn test_convention_env_var_names() {
        assert_eq!(convention_env_var_name("image"), "REELFORGE_IMAGE_API_KEY");
        assert_eq!(convention_env_var_name("chat"), "REELFORGE_CHAT_API_KEY");
        assert_eq!(
            convention_env_var_name("media"),
            "REELFORGE_MEDIA_API_SECRET"
        );
    }
}
