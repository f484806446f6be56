//! Configuration for the gate

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Main gate configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateConfig {
    /// Base URL of the CLA API, used to build sign links
    #[serde(default = "default_sign_url_base")]
    pub sign_url_base: String,

    /// Base URL of the hosting platform, used to parse group approval URLs
    #[serde(default = "default_hosting_base_url")]
    pub hosting_base_url: String,

    /// Deadline for one webhook delivery, in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    #[serde(default)]
    pub webhook: WebhookConfig,

    #[serde(default)]
    pub correlation: CorrelationConfig,

    #[serde(default)]
    pub status: StatusConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            sign_url_base: default_sign_url_base(),
            hosting_base_url: default_hosting_base_url(),
            request_timeout_secs: default_request_timeout(),
            webhook: WebhookConfig::default(),
            correlation: CorrelationConfig::default(),
            status: StatusConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Webhook verification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    /// Reject deliveries whose secret token does not match the organization's
    #[serde(default = "default_true")]
    pub enforce_secret: bool,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            enforce_secret: true,
        }
    }
}

/// Active merge-request correlation records
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrelationConfig {
    /// Days until a record expires
    #[serde(default = "default_ttl_days")]
    pub ttl_days: i64,

    /// Email value the platform sends when the real address is hidden
    #[serde(default = "default_redaction_placeholder")]
    pub redaction_placeholder: String,
}

impl Default for CorrelationConfig {
    fn default() -> Self {
        Self {
            ttl_days: default_ttl_days(),
            redaction_placeholder: default_redaction_placeholder(),
        }
    }
}

/// Commit status wording
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusConfig {
    #[serde(default = "default_context_name")]
    pub context_name: String,

    #[serde(default = "default_missing_message")]
    pub missing_message: String,

    #[serde(default = "default_passed_message")]
    pub passed_message: String,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            context_name: default_context_name(),
            missing_message: default_missing_message(),
            passed_message: default_passed_message(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level or filter directive
    #[serde(default = "default_log_level")]
    pub level: String,

    /// JSON format
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// Default value helpers
fn default_true() -> bool {
    true
}

fn default_sign_url_base() -> String {
    "https://api.easycla.lfx.linuxfoundation.org".to_string()
}

fn default_hosting_base_url() -> String {
    "https://gitlab.com/".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_ttl_days() -> i64 {
    7
}

fn default_redaction_placeholder() -> String {
    "[REDACTED]".to_string()
}

fn default_context_name() -> String {
    "EasyCLA".to_string()
}

fn default_missing_message() -> String {
    "Missing CLA Authorization".to_string()
}

fn default_passed_message() -> String {
    "EasyCLA check passed. You are authorized to contribute.".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl GateConfig {
    /// Load configuration: defaults, then an optional file, then
    /// `CLA_GATE_*` environment variables (`__` separates nested keys).
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        builder = builder.add_source(config::Config::try_from(&GateConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("CLA_GATE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = GateConfig::default();
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert!(config.webhook.enforce_secret);
        assert_eq!(config.correlation.ttl_days, 7);
        assert_eq!(config.correlation.redaction_placeholder, "[REDACTED]");
        assert_eq!(config.status.missing_message, "Missing CLA Authorization");
    }

    #[test]
    fn test_load_merges_file_over_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gate.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "sign_url_base = \"https://cla.example.org\"\n\n[webhook]\nenforce_secret = false\n\n[correlation]\nttl_days = 3"
        )
        .unwrap();

        let config = GateConfig::load(path.to_str()).unwrap();
        assert_eq!(config.sign_url_base, "https://cla.example.org");
        assert!(!config.webhook.enforce_secret);
        assert_eq!(config.correlation.ttl_days, 3);
        assert_eq!(config.status.context_name, "EasyCLA");
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = GateConfig::load(Some("/nonexistent/cla-gate")).unwrap();
        assert_eq!(config.hosting_base_url, "https://gitlab.com/");
    }
}
