//! acp-config
#![deny(unsafe_code)]
#![warn(missing_docs)]
//!
//! Typed application settings for the action control plane, loaded from
//! `ACP_`-prefixed environment variables with an optional TOML overlay file.
//! Mirrors the load/merge/validate shape the rest of this workspace's
//! crates use for their own settings, generalised from a single
//! `AppSettings` struct rather than per-backend configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Errors raised while loading or validating [`AppSettings`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The requested overlay file does not exist or could not be read.
    #[error("config file not found: {path}")]
    FileNotFound {
        /// Path that was requested.
        path: String,
    },

    /// The overlay file could not be parsed as valid TOML.
    #[error("failed to parse config: {reason}")]
    ParseError {
        /// Human-readable parse error detail.
        reason: String,
    },

    /// Semantic validation failed (one or more problems).
    #[error("config validation failed: {reasons:?}")]
    ValidationError {
        /// Individual validation failure messages.
        reasons: Vec<String>,
    },
}

/// Advisory-level issues that do not prevent operation but deserve attention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigWarning {
    /// Neither `store_url` nor an in-memory demo mode was configured.
    NoDurableStore,
    /// `provider_api_key` is unset; the worker will be unable to execute
    /// anything against the real provider.
    MissingProviderApiKey,
    /// A quiet-hours bound was set without its counterpart.
    IncompleteQuietHours {
        /// Which bound is present (`"start"` or `"end"`).
        present: &'static str,
    },
}

impl std::fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigWarning::NoDurableStore => {
                write!(f, "no store_url configured; outbox state will not survive a restart")
            }
            ConfigWarning::MissingProviderApiKey => {
                write!(f, "provider_api_key is not set; worker dispatch will fail")
            }
            ConfigWarning::IncompleteQuietHours { present } => {
                write!(f, "quiet_hours_{present}_hour set without its counterpart; guardrail will allow with a configuration message")
            }
        }
    }
}

/// Top-level runtime configuration for the action control plane.
///
/// Recognised environment variables (all prefixed `ACP_`, upper-snake-case
/// of the field name — e.g. `ACP_TRUST_THRESHOLD`): see each field's doc
/// comment. An optional TOML overlay file, loaded first, is then
/// overridden field-by-field by any matching environment variable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppSettings {
    /// Tenant this process acts on behalf of.
    pub tenant_id: String,
    /// Default LLM model identifier for the agent's system prompt.
    pub default_model: String,

    /// Quiet-hours window start (0..23), inclusive.
    pub quiet_hours_start_hour: Option<u32>,
    /// Quiet-hours window end (0..23), exclusive.
    pub quiet_hours_end_hour: Option<u32>,
    /// Minimum `trust.score` (0..1) required to allow an action.
    pub trust_threshold: f64,
    /// Whether the scope-validation guardrail is enforced.
    pub enforce_scope_validation: bool,
    /// Whether the evidence-requirement guardrail is enforced.
    pub require_evidence: bool,

    /// API key for the remote tool-execution provider.
    pub provider_api_key: Option<String>,
    /// OAuth client id for the provider, if applicable.
    pub provider_client_id: Option<String>,
    /// OAuth client secret for the provider, if applicable.
    pub provider_client_secret: Option<String>,

    /// Durable-store connection URL (e.g. a Postgres DSN). `None` selects
    /// the in-memory store implementations, appropriate for tests/demos.
    pub store_url: Option<String>,
    /// Service-role key for the durable store, if it requires one.
    pub store_service_key: Option<String>,
    /// Schema name the durable store's tables live under.
    pub store_schema: String,

    /// How often the worker polls the outbox when it finds nothing due.
    pub outbox_poll_interval_seconds: u64,
    /// Max records claimed per worker poll.
    pub outbox_batch_size: usize,
    /// Max attempts (including the first) before a record moves to the DLQ.
    pub outbox_max_attempts: u32,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            tenant_id: "demo-tenant".to_string(),
            default_model: "gemini-2.5-flash".to_string(),
            quiet_hours_start_hour: None,
            quiet_hours_end_hour: None,
            trust_threshold: 0.8,
            enforce_scope_validation: true,
            require_evidence: true,
            provider_api_key: None,
            provider_client_id: None,
            provider_client_secret: None,
            store_url: None,
            store_service_key: None,
            store_schema: "public".to_string(),
            outbox_poll_interval_seconds: 5,
            outbox_batch_size: 25,
            outbox_max_attempts: 3,
        }
    }
}

impl AppSettings {
    /// `true` when a durable store connection is configured.
    pub fn has_durable_store(&self) -> bool {
        self.store_url.as_deref().is_some_and(|s| !s.trim().is_empty())
    }

    /// Semantic validation beyond what types alone express: thresholds in
    /// range, positive batch sizes, at least one retry attempt.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut reasons = Vec::new();

        if !(0.0..=1.0).contains(&self.trust_threshold) {
            reasons.push(format!(
                "trust_threshold must be within [0, 1], got {}",
                self.trust_threshold
            ));
        }
        if let Some(h) = self.quiet_hours_start_hour {
            if h > 23 {
                reasons.push(format!("quiet_hours_start_hour must be 0..23, got {h}"));
            }
        }
        if let Some(h) = self.quiet_hours_end_hour {
            if h > 23 {
                reasons.push(format!("quiet_hours_end_hour must be 0..23, got {h}"));
            }
        }
        if self.outbox_batch_size == 0 {
            reasons.push("outbox_batch_size must be at least 1".to_string());
        }
        if self.outbox_max_attempts == 0 {
            reasons.push("outbox_max_attempts must be at least 1".to_string());
        }
        if self.tenant_id.trim().is_empty() {
            reasons.push("tenant_id must not be blank".to_string());
        }

        if reasons.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::ValidationError { reasons })
        }
    }

    /// Advisory warnings that don't block startup but are worth surfacing.
    pub fn warnings(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();
        if !self.has_durable_store() {
            warnings.push(ConfigWarning::NoDurableStore);
        }
        if self.provider_api_key.is_none() {
            warnings.push(ConfigWarning::MissingProviderApiKey);
        }
        match (self.quiet_hours_start_hour, self.quiet_hours_end_hour) {
            (Some(_), None) => warnings.push(ConfigWarning::IncompleteQuietHours { present: "start" }),
            (None, Some(_)) => warnings.push(ConfigWarning::IncompleteQuietHours { present: "end" }),
            _ => {}
        }
        warnings
    }
}

/// Loads settings from an optional TOML overlay file, then applies
/// `ACP_`-prefixed environment variable overrides, then validates.
pub fn load_settings(overlay_path: Option<&Path>) -> Result<AppSettings, ConfigError> {
    let mut settings = match overlay_path {
        Some(path) => {
            let content = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
                path: path.display().to_string(),
            })?;
            parse_toml(&content)?
        }
        None => AppSettings::default(),
    };
    apply_env_overrides(&mut settings);
    settings.validate()?;
    Ok(settings)
}

/// Parses a TOML string into [`AppSettings`].
pub fn parse_toml(content: &str) -> Result<AppSettings, ConfigError> {
    toml::from_str(content).map_err(|e| ConfigError::ParseError {
        reason: e.to_string(),
    })
}

/// Applies `ACP_*` environment variable overrides in place.
///
/// Recognised variables: `ACP_TENANT_ID`, `ACP_DEFAULT_MODEL`,
/// `ACP_QUIET_HOURS_START_HOUR`, `ACP_QUIET_HOURS_END_HOUR`,
/// `ACP_TRUST_THRESHOLD`, `ACP_ENFORCE_SCOPE_VALIDATION`,
/// `ACP_REQUIRE_EVIDENCE`, `ACP_PROVIDER_API_KEY`,
/// `ACP_PROVIDER_CLIENT_ID`, `ACP_PROVIDER_CLIENT_SECRET`,
/// `ACP_STORE_URL`, `ACP_STORE_SERVICE_KEY`, `ACP_STORE_SCHEMA`,
/// `ACP_OUTBOX_POLL_INTERVAL_SECONDS`, `ACP_OUTBOX_BATCH_SIZE`,
/// `ACP_OUTBOX_MAX_ATTEMPTS`.
pub fn apply_env_overrides(settings: &mut AppSettings) {
    if let Ok(v) = std::env::var("ACP_TENANT_ID") {
        settings.tenant_id = v;
    }
    if let Ok(v) = std::env::var("ACP_DEFAULT_MODEL") {
        settings.default_model = v;
    }
    if let Some(v) = parsed_env("ACP_QUIET_HOURS_START_HOUR") {
        settings.quiet_hours_start_hour = Some(v);
    }
    if let Some(v) = parsed_env("ACP_QUIET_HOURS_END_HOUR") {
        settings.quiet_hours_end_hour = Some(v);
    }
    if let Some(v) = parsed_env("ACP_TRUST_THRESHOLD") {
        settings.trust_threshold = v;
    }
    if let Some(v) = parsed_env("ACP_ENFORCE_SCOPE_VALIDATION") {
        settings.enforce_scope_validation = v;
    }
    if let Some(v) = parsed_env("ACP_REQUIRE_EVIDENCE") {
        settings.require_evidence = v;
    }
    if let Ok(v) = std::env::var("ACP_PROVIDER_API_KEY") {
        settings.provider_api_key = Some(v);
    }
    if let Ok(v) = std::env::var("ACP_PROVIDER_CLIENT_ID") {
        settings.provider_client_id = Some(v);
    }
    if let Ok(v) = std::env::var("ACP_PROVIDER_CLIENT_SECRET") {
        settings.provider_client_secret = Some(v);
    }
    if let Ok(v) = std::env::var("ACP_STORE_URL") {
        settings.store_url = Some(v);
    }
    if let Ok(v) = std::env::var("ACP_STORE_SERVICE_KEY") {
        settings.store_service_key = Some(v);
    }
    if let Ok(v) = std::env::var("ACP_STORE_SCHEMA") {
        settings.store_schema = v;
    }
    if let Some(v) = parsed_env("ACP_OUTBOX_POLL_INTERVAL_SECONDS") {
        settings.outbox_poll_interval_seconds = v;
    }
    if let Some(v) = parsed_env("ACP_OUTBOX_BATCH_SIZE") {
        settings.outbox_batch_size = v;
    }
    if let Some(v) = parsed_env("ACP_OUTBOX_MAX_ATTEMPTS") {
        settings.outbox_max_attempts = v;
    }
}

fn parsed_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_settings_pass_validation() {
        assert!(AppSettings::default().validate().is_ok());
    }

    #[test]
    fn out_of_range_trust_threshold_fails_validation() {
        let settings = AppSettings {
            trust_threshold: 1.5,
            ..AppSettings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn zero_batch_size_fails_validation() {
        let settings = AppSettings {
            outbox_batch_size: 0,
            ..AppSettings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn missing_durable_store_is_a_warning_not_an_error() {
        let settings = AppSettings::default();
        assert!(settings.validate().is_ok());
        assert!(settings.warnings().contains(&ConfigWarning::NoDurableStore));
    }

    #[test]
    fn lopsided_quiet_hours_warns() {
        let settings = AppSettings {
            quiet_hours_start_hour: Some(22),
            ..AppSettings::default()
        };
        assert!(settings
            .warnings()
            .contains(&ConfigWarning::IncompleteQuietHours { present: "start" }));
    }

    #[test]
    fn parse_toml_overlay_overrides_defaults() {
        let toml_src = r#"
            tenant_id = "acme"
            trust_threshold = 0.5
        "#;
        let settings = parse_toml(toml_src).unwrap();
        assert_eq!(settings.tenant_id, "acme");
        assert_eq!(settings.trust_threshold, 0.5);
    }

    #[test]
    fn load_settings_reads_overlay_file_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"tenant_id = "from-file""#).unwrap();
        let settings = load_settings(Some(file.path())).unwrap();
        assert_eq!(settings.tenant_id, "from-file");
    }

    #[test]
    fn missing_overlay_file_errors() {
        let result = load_settings(Some(Path::new("/nonexistent/path.toml")));
        assert!(matches!(result, Err(ConfigError::FileNotFound { .. })));
    }
}
