use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// OAuth credential for a hosting-platform group.
///
/// Stored opaquely on the organization record and exchanged for a fresh one
/// before every gate run. `Debug` never prints token material.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthToken {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub created_at: Option<i64>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

impl OAuthToken {
    /// Expiry instant, when the platform reported one.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        let created = DateTime::<Utc>::from_timestamp(self.created_at?, 0)?;
        Some(created + chrono::Duration::seconds(self.expires_in?))
    }
}

impl fmt::Debug for OAuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthToken")
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}

/// A hosting-platform group onboarded to the CLA service.
///
/// Owned by the onboarding subsystem; the gate reads it and triggers
/// credential refresh only.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    pub organization_id: String,
    pub organization_name: String,
    /// Numeric group ID on the hosting platform
    pub external_group_id: i64,
    pub full_path: String,
    pub url: String,
    pub auth: OAuthToken,
    pub project_sfid: String,
    /// Shared secret the platform sends with each webhook delivery
    #[serde(default)]
    pub webhook_secret: Option<String>,
}

impl fmt::Debug for Organization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Organization")
            .field("organization_id", &self.organization_id)
            .field("organization_name", &self.organization_name)
            .field("external_group_id", &self.external_group_id)
            .field("full_path", &self.full_path)
            .field("url", &self.url)
            .field("project_sfid", &self.project_sfid)
            .finish_non_exhaustive()
    }
}

/// Internal record of a repository (hosting-platform project) under CLA.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    pub repository_id: String,
    pub repository_external_id: i64,
    /// Full path with namespace, e.g. `acme/widgets`
    pub repository_name: String,
}

/// CLA group bound to a project scope.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaGroup {
    pub cla_group_id: String,
    pub project_sfid: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_output_hides_token_material() {
        let token = OAuthToken {
            access_token: "secret-access".into(),
            refresh_token: "secret-refresh".into(),
            token_type: "Bearer".into(),
            expires_in: Some(7200),
            created_at: Some(1_700_000_000),
        };
        let printed = format!("{:?}", token);
        assert!(!printed.contains("secret-access"));
        assert!(!printed.contains("secret-refresh"));
    }

    #[test]
    fn expires_at_needs_both_fields() {
        let mut token = OAuthToken {
            access_token: "a".into(),
            refresh_token: "r".into(),
            token_type: "Bearer".into(),
            expires_in: Some(60),
            created_at: Some(1_700_000_000),
        };
        assert_eq!(token.expires_at().unwrap().timestamp(), 1_700_000_060);

        token.created_at = None;
        assert!(token.expires_at().is_none());
    }
}
