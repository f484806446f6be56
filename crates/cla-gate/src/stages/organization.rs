use std::sync::Arc;

use cla_gate_types::Organization;
use subtle::ConstantTimeEq;
use tracing::{debug, warn};

use crate::context::RequestContext;
use crate::error::GateError;
use crate::traits::{ClaRecords, HostingClient, HostingPlatform};

/// Maps a project path to the onboarded organization and authenticates
/// against the hosting platform on its behalf.
pub struct OrganizationResolver {
    records: Arc<dyn ClaRecords>,
    platform: Arc<dyn HostingPlatform>,
    enforce_secret: bool,
}

impl OrganizationResolver {
    pub fn new(
        records: Arc<dyn ClaRecords>,
        platform: Arc<dyn HostingPlatform>,
        enforce_secret: bool,
    ) -> Self {
        Self {
            records,
            platform,
            enforce_secret,
        }
    }

    /// Resolve by the first path segment, falling back to the namespace.
    pub async fn resolve(
        &self,
        ctx: &RequestContext,
        repository_path: &str,
        namespace: &str,
    ) -> Result<Organization, GateError> {
        let candidate = repository_path.split('/').next().unwrap_or_default();

        for path in [candidate, namespace] {
            if path.is_empty() {
                continue;
            }
            debug!(path, "looking up organization by full path");
            match ctx
                .within(
                    "organization lookup",
                    self.records.organization_by_full_path(path),
                )
                .await?
            {
                Ok(Some(organization)) => {
                    debug!(
                        organization_id = %organization.organization_id,
                        path,
                        "organization resolved"
                    );
                    return Ok(organization);
                }
                Ok(None) => debug!(path, "no organization for path"),
                Err(e) => warn!(path, error = %e, "organization lookup failed"),
            }
        }

        Err(GateError::OrganizationNotFound {
            path: repository_path.to_string(),
            namespace: namespace.to_string(),
        })
    }

    /// Resolve by internal organization ID (re-check path).
    pub async fn resolve_by_id(
        &self,
        ctx: &RequestContext,
        organization_id: &str,
    ) -> Result<Organization, GateError> {
        match ctx
            .within(
                "organization lookup",
                self.records.organization_by_id(organization_id),
            )
            .await?
        {
            Ok(Some(organization)) => Ok(organization),
            Ok(None) => Err(GateError::UnknownOrganization {
                organization_id: organization_id.to_string(),
            }),
            Err(e) => {
                warn!(organization_id, error = %e, "organization lookup failed");
                Err(GateError::UnknownOrganization {
                    organization_id: organization_id.to_string(),
                })
            }
        }
    }

    /// Check the delivered webhook secret against the organization's.
    pub fn verify_secret(
        &self,
        organization: &Organization,
        secret_token: Option<&str>,
    ) -> Result<(), GateError> {
        if !self.enforce_secret {
            return Ok(());
        }

        let matches = match (organization.webhook_secret.as_deref(), secret_token) {
            (Some(expected), Some(given)) if !expected.is_empty() => {
                bool::from(expected.as_bytes().ct_eq(given.as_bytes()))
            }
            _ => false,
        };

        if matches {
            Ok(())
        } else {
            warn!(
                organization_id = %organization.organization_id,
                "webhook secret token rejected"
            );
            Err(GateError::SecretTokenMismatch {
                organization_id: organization.organization_id.clone(),
            })
        }
    }

    /// Refresh the organization's credential and build a client from it.
    pub async fn authenticate(
        &self,
        ctx: &RequestContext,
        organization: &Organization,
    ) -> Result<Arc<dyn HostingClient>, GateError> {
        debug!(
            organization_id = %organization.organization_id,
            "refreshing organization credential"
        );
        let token = ctx
            .within(
                "credential refresh",
                self.platform.refresh_credential(organization),
            )
            .await?
            .map_err(|source| GateError::CredentialRefreshFailed {
                organization_id: organization.organization_id.clone(),
                source,
            })?;
        debug!(
            organization_id = %organization.organization_id,
            expires_at = ?token.expires_at(),
            "organization credential refreshed"
        );

        self.platform
            .new_client(&token)
            .map_err(|source| GateError::ClientInitFailed {
                organization_id: organization.organization_id.clone(),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::{sample_organization, InMemoryRecords, MockHostingPlatform};
    use std::time::Duration;

    fn ctx() -> RequestContext {
        RequestContext::new(Duration::from_secs(5))
    }

    async fn resolver(enforce_secret: bool) -> (OrganizationResolver, Arc<MockHostingPlatform>) {
        let records = Arc::new(InMemoryRecords::new());
        records.add_organization(sample_organization("org-1", "acme")).await;
        let platform = Arc::new(MockHostingPlatform::new());
        (
            OrganizationResolver::new(records, platform.clone(), enforce_secret),
            platform,
        )
    }

    #[tokio::test]
    async fn resolves_by_first_path_segment() {
        let (resolver, _) = resolver(true).await;
        let org = resolver.resolve(&ctx(), "acme/widgets", "Acme").await.unwrap();
        assert_eq!(org.organization_id, "org-1");
    }

    #[tokio::test]
    async fn falls_back_to_namespace() {
        let (resolver, _) = resolver(true).await;
        let org = resolver
            .resolve(&ctx(), "renamed/widgets", "acme")
            .await
            .unwrap();
        assert_eq!(org.organization_id, "org-1");
    }

    #[tokio::test]
    async fn unknown_path_and_namespace_is_fatal() {
        let (resolver, _) = resolver(true).await;
        let err = resolver
            .resolve(&ctx(), "other/widgets", "other")
            .await
            .unwrap_err();
        assert!(matches!(err, GateError::OrganizationNotFound { .. }));
    }

    #[tokio::test]
    async fn secret_must_match_when_enforced() {
        let (resolver, _) = resolver(true).await;
        let org = sample_organization("org-1", "acme");
        assert!(resolver.verify_secret(&org, Some("acme-secret")).is_ok());
        assert!(matches!(
            resolver.verify_secret(&org, Some("wrong")),
            Err(GateError::SecretTokenMismatch { .. })
        ));
        assert!(resolver.verify_secret(&org, None).is_err());

        let mut without_secret = org.clone();
        without_secret.webhook_secret = None;
        assert!(resolver.verify_secret(&without_secret, Some("anything")).is_err());
    }

    #[tokio::test]
    async fn secret_is_ignored_when_not_enforced() {
        let (resolver, _) = resolver(false).await;
        let org = sample_organization("org-1", "acme");
        assert!(resolver.verify_secret(&org, Some("wrong")).is_ok());
    }

    #[tokio::test]
    async fn refresh_failure_is_fatal() {
        let (resolver, platform) = resolver(true).await;
        platform.fail_refresh(true);
        let org = sample_organization("org-1", "acme");
        let err = resolver.authenticate(&ctx(), &org).await.err().unwrap();
        assert!(matches!(err, GateError::CredentialRefreshFailed { .. }));
    }

    #[tokio::test]
    async fn client_init_failure_is_fatal() {
        let (resolver, platform) = resolver(true).await;
        platform.fail_client_init(true);
        let org = sample_organization("org-1", "acme");
        let err = resolver.authenticate(&ctx(), &org).await.err().unwrap();
        assert!(matches!(err, GateError::ClientInitFailed { .. }));
    }
}
