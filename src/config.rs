use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use crate::platform::SIGN_IN_REQUEST_CODE;
use crate::request::SignInConfiguration;

// ---------------------------------------------------------------------------
// Environment override tracking
// ---------------------------------------------------------------------------

/// Tracks which configuration settings are overridden by environment variables.
#[derive(Debug, Clone, Default)]
pub struct EnvOverrides {
    overrides: HashMap<String, String>,
}

impl EnvOverrides {
    /// Check whether a setting key (e.g. "bridge.host_id") is overridden by an env var.
    pub fn is_overridden(&self, key: &str) -> bool {
        self.overrides.contains_key(key)
    }

    /// Get the env var name that overrides the given setting key.
    pub fn env_var_for(&self, key: &str) -> Option<&str> {
        self.overrides.get(key).map(String::as_str)
    }

    pub fn all(&self) -> &HashMap<String, String> {
        &self.overrides
    }

    fn record(&mut self, key: &str, env_var: &str) {
        self.overrides.insert(key.to_string(), env_var.to_string());
    }
}

// ---------------------------------------------------------------------------
// Main configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub bridge: BridgeConfig,
    /// Default request configuration used by the demo host.
    #[serde(default)]
    pub sign_in: SignInConfiguration,
    /// Env var overrides are not serialized to TOML.
    #[serde(skip)]
    pub env_overrides: EnvOverrides,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
    /// Start with debug logging enabled for the bridge.
    #[serde(default)]
    pub debug: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
            debug: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BridgeConfig {
    /// Request code the sign-in UI is launched with.
    #[serde(default = "default_ui_request_code")]
    pub ui_request_code: i32,
    /// How long the demo host waits for a result before giving up.
    #[serde(default = "default_wait_timeout_secs")]
    pub wait_timeout_secs: u64,
    /// Identity of the host the demo attaches as.
    #[serde(default = "default_host_id")]
    pub host_id: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            ui_request_code: default_ui_request_code(),
            wait_timeout_secs: default_wait_timeout_secs(),
            host_id: default_host_id(),
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions
// ---------------------------------------------------------------------------

fn default_log_level() -> String {
    "info".to_string()
}
const fn default_ui_request_code() -> i32 {
    SIGN_IN_REQUEST_CODE
}
const fn default_wait_timeout_secs() -> u64 {
    60
}
fn default_host_id() -> String {
    "main".to_string()
}

// ---------------------------------------------------------------------------
// Config loading and env overrides
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a TOML file, then apply environment variable
    /// overrides. Any setting prefixed with `SIGNIN_` takes precedence over
    /// the file value and is tracked in `env_overrides`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = toml::from_str(&content)?;
            config
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path.display());
            Self::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Save the current (file-level) configuration to a TOML file.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| anyhow::anyhow!("Failed to serialize config: {e}"))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn wait_timeout(&self) -> Duration {
        Duration::from_secs(self.bridge.wait_timeout_secs)
    }

    /// Apply environment variable overrides to the configuration.
    fn apply_env_overrides(&mut self) {
        let mut ov = EnvOverrides::default();

        // -- Helpers (macros for concise per-field overrides) --

        macro_rules! env_str {
            ($key:expr, $env:expr, $field:expr) => {
                if let Ok(val) = std::env::var($env) {
                    $field = val;
                    ov.record($key, $env);
                }
            };
        }
        macro_rules! env_bool {
            ($key:expr, $env:expr, $field:expr) => {
                if let Ok(val) = std::env::var($env) {
                    $field = matches!(val.to_lowercase().as_str(), "1" | "true" | "yes" | "on");
                    ov.record($key, $env);
                }
            };
        }
        macro_rules! env_parse {
            ($key:expr, $env:expr, $field:expr) => {
                if let Ok(val) = std::env::var($env) {
                    if let Ok(parsed) = val.parse() {
                        $field = parsed;
                        ov.record($key, $env);
                    }
                }
            };
        }
        macro_rules! env_opt_str {
            ($key:expr, $env:expr, $field:expr) => {
                if let Ok(val) = std::env::var($env) {
                    $field = if val.is_empty() { None } else { Some(val) };
                    ov.record($key, $env);
                }
            };
        }

        // -- Logging --
        env_str!("logging.level", "SIGNIN_LOG_LEVEL", self.logging.level);
        env_bool!("logging.json", "SIGNIN_LOG_JSON", self.logging.json);
        env_bool!("logging.debug", "SIGNIN_DEBUG", self.logging.debug);

        // -- Bridge --
        env_parse!("bridge.ui_request_code", "SIGNIN_UI_REQUEST_CODE", self.bridge.ui_request_code);
        env_parse!("bridge.wait_timeout_secs", "SIGNIN_WAIT_TIMEOUT_SECS", self.bridge.wait_timeout_secs);
        env_str!("bridge.host_id", "SIGNIN_HOST_ID", self.bridge.host_id);

        // -- Sign-in defaults --
        env_bool!("sign_in.use_games_config", "SIGNIN_USE_GAMES_CONFIG", self.sign_in.use_games_config);
        env_str!("sign_in.web_client_id", "SIGNIN_WEB_CLIENT_ID", self.sign_in.web_client_id);
        env_bool!("sign_in.request_auth_code", "SIGNIN_REQUEST_AUTH_CODE", self.sign_in.request_auth_code);
        env_bool!("sign_in.force_refresh_token", "SIGNIN_FORCE_REFRESH_TOKEN", self.sign_in.force_refresh_token);
        env_bool!("sign_in.request_email", "SIGNIN_REQUEST_EMAIL", self.sign_in.request_email);
        env_bool!("sign_in.request_id_token", "SIGNIN_REQUEST_ID_TOKEN", self.sign_in.request_id_token);
        env_bool!("sign_in.hide_ui_popups", "SIGNIN_HIDE_UI_POPUPS", self.sign_in.hide_ui_popups);
        env_opt_str!("sign_in.account_name", "SIGNIN_ACCOUNT_NAME", self.sign_in.account_name);
        if let Ok(val) = std::env::var("SIGNIN_ADDITIONAL_SCOPES") {
            self.sign_in.additional_scopes = val
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
            ov.record("sign_in.additional_scopes", "SIGNIN_ADDITIONAL_SCOPES");
        }

        self.env_overrides = ov;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
