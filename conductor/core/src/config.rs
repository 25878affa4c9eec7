//! TOML Configuration File Support
//!
//! Centralized configuration loading, with an optional TOML file at
//! `~/.config/cecy/config.toml`.
//!
//! # Configuration Priority
//!
//! Configuration values are loaded with the following priority (highest first):
//! 1. CLI arguments (via [`ConfigOverrides`])
//! 2. Environment variables
//! 3. TOML configuration file
//! 4. Default values
//!
//! # Example Configuration
//!
//! ```toml
//! [api]
//! chat_url = "https://cecyapi-2h4u.onrender.com"
//! transcribe_url = "https://82407.pythonanywhere.com"
//! timeout_secs = 60
//! token_file = "/home/me/.config/cecy/token.json"
//!
//! [chat]
//! mode = "avatar"
//! sound = true
//! reveal_ms = 3000
//! typing_policy = "ignore"
//!
//! [speech]
//! ms_per_char = 60
//!
//! [history]
//! dir = "/home/me/.local/share/cecy/history"
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::auth::TokenProvider;
use crate::avatar::UserTypingPolicy;
use crate::backend::{ApiConfig, DEFAULT_CHAT_API_URL, DEFAULT_TIMEOUT, DEFAULT_TRANSCRIBE_API_URL};
use crate::conductor::ConductorConfig;
use crate::messages::ChatMode;
use crate::session::{DEFAULT_GREETING, FALLBACK_REPLY};
use crate::animation::DEFAULT_REVEAL_DURATION;
use crate::speech::DEFAULT_MS_PER_CHAR;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file at {path}: {source}")]
    ReadError {
        /// The path that was attempted
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse TOML config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

// =============================================================================
// Configuration Source Tracking
// =============================================================================

/// Tracks where the configuration came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Value from command-line argument
    Cli,
    /// Value from environment variable
    Env,
    /// Value from TOML configuration file
    File,
    /// Default value
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cli => write!(f, "CLI"),
            Self::Env => write!(f, "environment"),
            Self::File => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

// =============================================================================
// TOML Configuration Structures
// =============================================================================

/// API section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiToml {
    /// Chat service base URL
    pub chat_url: Option<String>,
    /// Transcription service base URL
    pub transcribe_url: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: Option<u64>,
    /// Where the sign-in token is stored
    pub token_file: Option<PathBuf>,
}

/// Chat section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatToml {
    /// `chat` or `avatar`
    pub mode: Option<String>,
    /// Whether replies are read aloud
    pub sound: Option<bool>,
    /// Total reveal duration in milliseconds
    pub reveal_ms: Option<u64>,
    /// `ignore` or `hold_waiting`
    pub typing_policy: Option<UserTypingPolicy>,
    /// Whether to greet on mount
    pub greeting: Option<bool>,
    /// Apology shown when the service fails
    pub fallback_reply: Option<String>,
}

/// Speech section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechToml {
    /// Simulated speaking rate
    pub ms_per_char: Option<u64>,
}

/// History section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryToml {
    /// Directory for JSON chat records; unset disables the mirror
    pub dir: Option<PathBuf>,
}

/// Root of the TOML configuration file
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CecyToml {
    /// `[api]`
    pub api: ApiToml,
    /// `[chat]`
    pub chat: ChatToml,
    /// `[speech]`
    pub speech: SpeechToml,
    /// `[history]`
    pub history: HistoryToml,
}

// =============================================================================
// Resolved Configuration
// =============================================================================

/// Fully resolved configuration
#[derive(Clone, Debug)]
pub struct CecyConfig {
    /// Chat service base URL
    pub chat_api_url: String,
    /// Transcription service base URL
    pub transcribe_api_url: String,
    /// Request timeout
    pub request_timeout: Duration,
    /// Token file (None = default location)
    pub token_file: Option<PathBuf>,
    /// Initial presentation mode
    pub mode: ChatMode,
    /// Initial sound setting
    pub sound_enabled: bool,
    /// Total reveal duration
    pub reveal_duration: Duration,
    /// Effect of typing on the avatar mood
    pub typing_policy: UserTypingPolicy,
    /// Greet on mount
    pub greeting: bool,
    /// Apology shown when the service fails
    pub fallback_reply: String,
    /// Simulated speaking rate
    pub speech_ms_per_char: u64,
    /// History directory (None = no mirror)
    pub history_dir: Option<PathBuf>,
    /// File the configuration was read from
    pub config_file_path: Option<PathBuf>,
    source: ConfigSource,
}

impl Default for CecyConfig {
    fn default() -> Self {
        Self {
            chat_api_url: DEFAULT_CHAT_API_URL.to_string(),
            transcribe_api_url: DEFAULT_TRANSCRIBE_API_URL.to_string(),
            request_timeout: DEFAULT_TIMEOUT,
            token_file: None,
            mode: ChatMode::default(),
            sound_enabled: true,
            reveal_duration: DEFAULT_REVEAL_DURATION,
            typing_policy: UserTypingPolicy::default(),
            greeting: true,
            fallback_reply: FALLBACK_REPLY.to_string(),
            speech_ms_per_char: DEFAULT_MS_PER_CHAR,
            history_dir: None,
            config_file_path: None,
            source: ConfigSource::Default,
        }
    }
}

impl CecyConfig {
    /// Get the primary source of this configuration
    #[must_use]
    pub fn source(&self) -> ConfigSource {
        self.source
    }

    /// Conductor settings
    #[must_use]
    pub fn conductor_config(&self) -> ConductorConfig {
        ConductorConfig {
            mode: self.mode,
            sound_enabled: self.sound_enabled,
            reveal_duration: self.reveal_duration,
            greeting: self.greeting.then(|| DEFAULT_GREETING.to_string()),
            fallback_reply: self.fallback_reply.clone(),
            typing_policy: self.typing_policy,
        }
    }

    /// API client settings
    #[must_use]
    pub fn api_config(&self, token_provider: Arc<dyn TokenProvider>) -> ApiConfig {
        ApiConfig {
            chat_base_url: self.chat_api_url.clone(),
            transcribe_base_url: self.transcribe_api_url.clone(),
            timeout: self.request_timeout,
            token_provider,
        }
    }
}

// =============================================================================
// Configuration Loading
// =============================================================================

/// `<config dir>/cecy/config.toml`
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("cecy").join("config.toml"))
}

/// Load configuration from all sources with proper priority
///
/// # Errors
///
/// Returns an error if the config file exists but cannot be parsed.
/// A missing config file is not an error (defaults are used).
pub fn load_config() -> Result<CecyConfig, ConfigError> {
    load_config_from_path(default_config_path())
}

/// Load configuration from a specific path, then the process environment
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed, or if
/// it holds an invalid value.
pub fn load_config_from_path(path: Option<PathBuf>) -> Result<CecyConfig, ConfigError> {
    load_config_with_env(path, |key| std::env::var(key).ok())
}

/// Load configuration reading environment variables through `env`
///
/// # Errors
///
/// See [`load_config_from_path`].
pub fn load_config_with_env(
    path: Option<PathBuf>,
    env: impl Fn(&str) -> Option<String>,
) -> Result<CecyConfig, ConfigError> {
    let mut config = CecyConfig::default();

    if let Some(ref config_path) = path {
        if config_path.exists() {
            let toml_content =
                std::fs::read_to_string(config_path).map_err(|e| ConfigError::ReadError {
                    path: config_path.clone(),
                    source: e,
                })?;

            let toml_config: CecyToml = toml::from_str(&toml_content)?;
            apply_toml_config(&mut config, &toml_config)?;
            config.config_file_path = Some(config_path.clone());
            config.source = ConfigSource::File;

            tracing::info!(
                path = %config_path.display(),
                "Loaded configuration from file"
            );
        } else {
            tracing::debug!(
                path = %config_path.display(),
                "Config file not found, using defaults"
            );
        }
    }

    apply_env_config(&mut config, env);

    Ok(config)
}

/// Apply TOML configuration values to the config struct
fn apply_toml_config(config: &mut CecyConfig, toml: &CecyToml) -> Result<(), ConfigError> {
    if let Some(ref url) = toml.api.chat_url {
        config.chat_api_url.clone_from(url);
    }
    if let Some(ref url) = toml.api.transcribe_url {
        config.transcribe_api_url.clone_from(url);
    }
    if let Some(secs) = toml.api.timeout_secs {
        config.request_timeout = Duration::from_secs(secs);
    }
    if toml.api.token_file.is_some() {
        config.token_file.clone_from(&toml.api.token_file);
    }

    if let Some(ref mode) = toml.chat.mode {
        config.mode = mode.parse().map_err(ConfigError::ValidationError)?;
    }
    if let Some(sound) = toml.chat.sound {
        config.sound_enabled = sound;
    }
    if let Some(ms) = toml.chat.reveal_ms {
        config.reveal_duration = Duration::from_millis(ms);
    }
    if let Some(policy) = toml.chat.typing_policy {
        config.typing_policy = policy;
    }
    if let Some(greeting) = toml.chat.greeting {
        config.greeting = greeting;
    }
    if let Some(ref reply) = toml.chat.fallback_reply {
        if reply.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "chat.fallback_reply must not be empty".to_string(),
            ));
        }
        config.fallback_reply.clone_from(reply);
    }

    if let Some(rate) = toml.speech.ms_per_char {
        config.speech_ms_per_char = rate;
    }

    if toml.history.dir.is_some() {
        config.history_dir.clone_from(&toml.history.dir);
    }

    Ok(())
}

fn parse_flag(value: &str) -> bool {
    value != "0" && value.to_lowercase() != "false" && value.to_lowercase() != "off"
}

/// Apply environment variable overrides to the config
fn apply_env_config(config: &mut CecyConfig, env: impl Fn(&str) -> Option<String>) {
    if let Some(url) = env("CECY_CHAT_API_URL") {
        config.chat_api_url = url;
        config.source = ConfigSource::Env;
    }
    if let Some(url) = env("CECY_TRANSCRIBE_API_URL") {
        config.transcribe_api_url = url;
        config.source = ConfigSource::Env;
    }
    if let Some(mode) = env("CECY_MODE") {
        match mode.parse() {
            Ok(mode) => {
                config.mode = mode;
                config.source = ConfigSource::Env;
            }
            Err(e) => tracing::warn!(error = %e, "Ignoring CECY_MODE"),
        }
    }
    if let Some(sound) = env("CECY_SOUND") {
        config.sound_enabled = parse_flag(&sound);
        config.source = ConfigSource::Env;
    }
    if let Some(reveal) = env("CECY_REVEAL_MS") {
        if let Ok(ms) = reveal.parse::<u64>() {
            config.reveal_duration = Duration::from_millis(ms);
            config.source = ConfigSource::Env;
        }
    }
    if let Some(dir) = env("CECY_HISTORY_DIR") {
        config.history_dir = Some(PathBuf::from(dir));
        config.source = ConfigSource::Env;
    }
    if let Some(file) = env("CECY_TOKEN_FILE") {
        config.token_file = Some(PathBuf::from(file));
        config.source = ConfigSource::Env;
    }
}

// =============================================================================
// CLI Override Support
// =============================================================================

/// Command-line overrides, applied after [`load_config`]
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    /// Chat service base URL
    pub chat_api_url: Option<String>,
    /// Transcription service base URL
    pub transcribe_api_url: Option<String>,
    /// Presentation mode
    pub mode: Option<ChatMode>,
    /// Start muted
    pub mute: bool,
    /// Reveal duration in milliseconds
    pub reveal_ms: Option<u64>,
    /// History directory
    pub history_dir: Option<PathBuf>,
}

impl ConfigOverrides {
    /// Apply the overrides that were given
    pub fn apply(&self, config: &mut CecyConfig) {
        let mut touched = false;
        if let Some(ref url) = self.chat_api_url {
            config.chat_api_url.clone_from(url);
            touched = true;
        }
        if let Some(ref url) = self.transcribe_api_url {
            config.transcribe_api_url.clone_from(url);
            touched = true;
        }
        if let Some(mode) = self.mode {
            config.mode = mode;
            touched = true;
        }
        if self.mute {
            config.sound_enabled = false;
            touched = true;
        }
        if let Some(ms) = self.reveal_ms {
            config.reveal_duration = Duration::from_millis(ms);
            touched = true;
        }
        if self.history_dir.is_some() {
            config.history_dir.clone_from(&self.history_dir);
            touched = true;
        }
        if touched {
            config.source = ConfigSource::Cli;
        }
    }
}
