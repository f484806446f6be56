use std::sync::Arc;

use async_trait::async_trait;
use cla_gate::{HostingClient, HostingPlatform, PlatformError, PlatformResult};
use cla_gate_types::{OAuthToken, Organization};
use serde::Serialize;
use tracing::{debug, warn};

use crate::client::GitLabClient;
use crate::config::{truncated, GitLabConfig};
use crate::http::Transport;

#[derive(Serialize)]
struct RefreshRequest<'a> {
    client_id: &'a str,
    client_secret: &'a str,
    refresh_token: &'a str,
    grant_type: &'static str,
    redirect_uri: &'a str,
}

/// GitLab implementation of [`HostingPlatform`].
///
/// One instance per deployment; the underlying HTTP connection pool is
/// shared by every client it hands out.
pub struct GitLabPlatform {
    config: GitLabConfig,
    transport: Transport,
}

impl GitLabPlatform {
    pub fn new(config: GitLabConfig) -> PlatformResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.http_timeout())
            .build()
            .map_err(|e| PlatformError::Configuration(e.to_string()))?;
        let transport = Transport::new(client, config.instance_url(), config.page_size);

        debug!(
            base_url = transport.instance_url(),
            client_id = %truncated(&config.client_id),
            "GitLab platform configured"
        );
        Ok(Self { config, transport })
    }
}

#[async_trait]
impl HostingPlatform for GitLabPlatform {
    async fn refresh_credential(&self, organization: &Organization) -> PlatformResult<OAuthToken> {
        if self.config.client_id.len() <= 4 || self.config.client_secret.len() <= 4 {
            return Err(PlatformError::Configuration(
                "GitLab application client ID or secret is empty or malformed".into(),
            ));
        }
        if organization.auth.refresh_token.is_empty() {
            return Err(PlatformError::Configuration(format!(
                "organization {} has no refresh token",
                organization.organization_id
            )));
        }

        debug!(
            organization_id = %organization.organization_id,
            client_id = %truncated(&self.config.client_id),
            "refreshing GitLab OAuth token"
        );
        let request = RefreshRequest {
            client_id: &self.config.client_id,
            client_secret: &self.config.client_secret,
            refresh_token: &organization.auth.refresh_token,
            grant_type: "refresh_token",
            redirect_uri: &self.config.redirect_uri,
        };

        self.transport
            .post_form("/oauth/token", &request)
            .await
            .inspect_err(|e| {
                warn!(
                    organization_id = %organization.organization_id,
                    error = %e,
                    "GitLab token refresh failed"
                )
            })
    }

    fn new_client(&self, token: &OAuthToken) -> PlatformResult<Arc<dyn HostingClient>> {
        if token.access_token.is_empty() {
            return Err(PlatformError::Configuration("empty access token".into()));
        }
        let client: Arc<dyn HostingClient> = Arc::new(GitLabClient::new(
            self.transport.clone(),
            token.access_token.clone(),
        ));
        Ok(client)
    }
}
