use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Result, WayfareError};

/// Top-level configuration for the Wayfare application.
///
/// Loaded from `~/.wayfare/config.toml` by default. Each section covers
/// one subsystem; every field has a default so a missing or partial file
/// still produces a runnable configuration. API credentials are NOT part
/// of this file — see [`Credentials`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WayfareConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub maps: MapsConfig,
    #[serde(default)]
    pub chat: ChatConfig,
}

impl WayfareConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: WayfareConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if
    /// the file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| WayfareError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Language-model completion settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Base URL of the chat-completions provider.
    pub base_url: String,
    /// Model identifier sent with every completion request.
    pub model: String,
    /// Completion token budget per request.
    pub max_tokens: u32,
    /// Sampling temperature. Zero keeps stage output deterministic.
    pub temperature: f32,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".to_string(),
            model: "gpt-4o-mini".to_string(),
            max_tokens: 512,
            temperature: 0.0,
            timeout_secs: 30,
        }
    }
}

/// Mapping provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MapsConfig {
    /// Base URL of the geocoding/places/directions provider.
    pub base_url: String,
    /// Search radius in meters for nearby-place disambiguation.
    pub nearby_radius_m: u32,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for MapsConfig {
    fn default() -> Self {
        Self {
            base_url: "https://maps.googleapis.com".to_string(),
            nearby_radius_m: 1500,
            timeout_secs: 10,
        }
    }
}

/// Conversation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Upper bound on stored exchanges; oldest are evicted first.
    pub max_history_turns: usize,
    /// Number of recent exchanges interpolated into the composer prompt.
    pub context_turns: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            max_history_turns: 50,
            context_turns: 5,
        }
    }
}

/// API credentials, read once at startup from the environment.
///
/// Both keys are required; the process refuses to start without them.
#[derive(Debug, Clone)]
pub struct Credentials {
    /// Key for the geocoding/places/directions provider (`MAPS_API_KEY`).
    pub maps_api_key: String,
    /// Key for the chat-completions provider (`LLM_API_KEY`).
    pub llm_api_key: String,
}

impl Credentials {
    /// Read both credentials from the environment.
    ///
    /// Returns a [`WayfareError::MissingCredential`] naming every absent
    /// variable so the operator can fix them in one pass.
    pub fn from_env() -> Result<Self> {
        let mut missing = Vec::new();

        let maps_api_key = match std::env::var("MAPS_API_KEY") {
            Ok(v) if !v.trim().is_empty() => v,
            _ => {
                missing.push("MAPS_API_KEY");
                String::new()
            }
        };
        let llm_api_key = match std::env::var("LLM_API_KEY") {
            Ok(v) if !v.trim().is_empty() => v,
            _ => {
                missing.push("LLM_API_KEY");
                String::new()
            }
        };

        if !missing.is_empty() {
            return Err(WayfareError::MissingCredential(missing.join(", ")));
        }

        Ok(Self {
            maps_api_key,
            llm_api_key,
        })
    }
}
