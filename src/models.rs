//! Data models and structures
//!
//! Defines the input modes, the problem payload handed to the solving service,
//! and runtime configuration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Which input producer currently supplies the problem.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputMode {
    #[default]
    Text,
    Image,
    Draw,
}

impl InputMode {
    pub const ALL: [InputMode; 3] = [InputMode::Text, InputMode::Image, InputMode::Draw];

    /// Tab label shown in the mode selector.
    pub fn label(self) -> &'static str {
        match self {
            InputMode::Text => "Text",
            InputMode::Image => "Image",
            InputMode::Draw => "Draw",
        }
    }
}

impl fmt::Display for InputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for InputMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(InputMode::Text),
            "image" => Ok(InputMode::Image),
            "draw" => Ok(InputMode::Draw),
            other => Err(format!(
                "Unknown mode '{}'. Expected one of: text, image, draw",
                other
            )),
        }
    }
}

/// Base64-encoded image plus its MIME type, as sent inline to the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageData {
    pub mime_type: String,
    pub base64: String,
}

impl ImageData {
    pub fn from_bytes(mime_type: &str, bytes: &[u8]) -> Self {
        use base64::Engine as _;
        Self {
            mime_type: mime_type.to_string(),
            base64: base64::engine::general_purpose::STANDARD.encode(bytes),
        }
    }
}

/// Everything sent to the solving service for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProblemPayload {
    pub text: String,
    pub image: Option<ImageData>,
}

// Configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub model: String,
    pub request_timeout: Option<Duration>,
}

impl Config {
    pub fn from_env() -> crate::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup. `from_env` is the
    /// production caller; tests pass a closure over a fixed map.
    pub fn from_lookup<F>(lookup: F) -> crate::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_key = non_empty("GEMINI_API_KEY")
            .or_else(|| non_empty("API_KEY"))
            .ok_or_else(|| {
                crate::Error::Config("GEMINI_API_KEY environment variable not set".to_string())
            })?;

        let model = non_empty("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let request_timeout = match non_empty("GEMINI_TIMEOUT_SECS") {
            Some(raw) => {
                let secs: u64 = raw.trim().parse().map_err(|_| {
                    crate::Error::Config(format!(
                        "GEMINI_TIMEOUT_SECS must be a whole number of seconds, got '{}'",
                        raw
                    ))
                })?;
                Some(Duration::from_secs(secs))
            }
            None => None,
        };

        Ok(Self {
            api_key,
            model,
            request_timeout,
        })
    }
}
