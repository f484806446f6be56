//! GitLab adapter configuration

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// GitLab application and API settings
#[derive(Clone, Serialize, Deserialize)]
pub struct GitLabConfig {
    /// Instance root, e.g. `https://gitlab.com`
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// OAuth application ID
    #[serde(default)]
    pub client_id: String,

    /// OAuth application secret
    #[serde(default)]
    pub client_secret: String,

    /// Redirect URI registered with the OAuth application
    #[serde(default)]
    pub redirect_uri: String,

    /// Timeout for a single HTTP request, in seconds
    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,

    /// Items requested per page on paginated endpoints
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

impl Default for GitLabConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            client_id: String::new(),
            client_secret: String::new(),
            redirect_uri: String::new(),
            http_timeout_secs: default_http_timeout(),
            page_size: default_page_size(),
        }
    }
}

impl fmt::Debug for GitLabConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GitLabConfig")
            .field("base_url", &self.base_url)
            .field("client_id", &truncated(&self.client_id))
            .field("redirect_uri", &self.redirect_uri)
            .field("http_timeout_secs", &self.http_timeout_secs)
            .field("page_size", &self.page_size)
            .finish_non_exhaustive()
    }
}

fn default_base_url() -> String {
    "https://gitlab.com".to_string()
}

fn default_http_timeout() -> u64 {
    30
}

fn default_page_size() -> u32 {
    100
}

impl GitLabConfig {
    /// Load configuration: defaults, then an optional file, then
    /// `CLA_GITLAB_*` environment variables.
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        builder = builder.add_source(config::Config::try_from(&GitLabConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("CLA_GITLAB")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// Instance root without a trailing slash.
    pub fn instance_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}

/// First and last four characters only, for log fields.
pub fn truncated(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= 8 {
        return "****".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}
