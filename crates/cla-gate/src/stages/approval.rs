use std::collections::HashMap;
use std::sync::Arc;

use cla_gate_types::{CorporateSignature, InternalUser, Participant};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::context::RequestContext;
use crate::error::GateError;
use crate::traits::{ClaRecords, HostingPlatform};

/// Which approval list admitted a participant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ApprovalRule {
    Email,
    Domain,
    Username,
    Group,
}

/// A compiled domain approval entry.
///
/// - `*.example.com` and `.example.com` admit subdomains of `example.com` only
/// - `*example.com` admits any domain ending in `example.com`
/// - `example.com` admits exactly `@example.com`
#[derive(Clone, Debug)]
pub struct DomainPattern {
    source: String,
    regex: Regex,
}

impl DomainPattern {
    pub fn parse(pattern: &str) -> Result<Self, regex::Error> {
        let pattern = pattern.trim();
        let rewritten = if let Some(rest) = pattern.strip_prefix("*.") {
            format!(r"[^@]*\.{}", regex::escape(rest))
        } else if let Some(rest) = pattern.strip_prefix('*') {
            format!("[^@]*{}", regex::escape(rest))
        } else if let Some(rest) = pattern.strip_prefix('.') {
            format!(r"[^@]*\.{}", regex::escape(rest))
        } else {
            regex::escape(pattern)
        };

        Ok(Self {
            source: pattern.to_string(),
            regex: Regex::new(&format!("^.*@{}$", rewritten))?,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn matches(&self, email: &str) -> bool {
        self.regex.is_match(email)
    }
}

/// A group approval entry split into its parts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GroupReference {
    pub name: String,
    /// Canonical `<base>groups/<name>` form used for organization lookup
    pub canonical_url: String,
}

struct CachedPatterns {
    sources: Vec<String>,
    compiled: Arc<Vec<DomainPattern>>,
}

/// Decides whether a participant is pre-authorized under a corporate
/// agreement.
///
/// Rules are tried in strict priority order: exact email, domain, exact
/// username, group membership. The first match wins.
pub struct ApprovalMatcher {
    records: Arc<dyn ClaRecords>,
    platform: Arc<dyn HostingPlatform>,
    group_url: Regex,
    group_base: String,
    domain_cache: RwLock<HashMap<String, CachedPatterns>>,
}

impl ApprovalMatcher {
    pub fn new(
        records: Arc<dyn ClaRecords>,
        platform: Arc<dyn HostingPlatform>,
        hosting_base_url: &str,
    ) -> Result<Self, regex::Error> {
        let group_base = if hosting_base_url.ends_with('/') {
            hosting_base_url.to_string()
        } else {
            format!("{}/", hosting_base_url)
        };
        let group_url = Regex::new(&format!(
            r"^(?P<base>{})(?P<group>groups/)?(?P<name>[\w.\-]+)",
            regex::escape(&group_base)
        ))?;

        Ok(Self {
            records,
            platform,
            group_url,
            group_base,
            domain_cache: RwLock::new(HashMap::new()),
        })
    }

    /// Whether any rule admits the participant.
    pub async fn is_approved(
        &self,
        ctx: &RequestContext,
        signature: &CorporateSignature,
        user: &InternalUser,
        participant: &Participant,
    ) -> Result<bool, GateError> {
        Ok(self
            .matching_rule(ctx, signature, user, participant)
            .await?
            .is_some())
    }

    /// The first rule that admits the participant, if any.
    ///
    /// Only a deadline expiry is returned as an error; lookup failures while
    /// checking groups count as "not approved".
    pub async fn matching_rule(
        &self,
        ctx: &RequestContext,
        signature: &CorporateSignature,
        user: &InternalUser,
        participant: &Participant,
    ) -> Result<Option<ApprovalRule>, GateError> {
        let emails = user.all_emails();

        if emails
            .iter()
            .any(|email| signature.email_approval_list.iter().any(|a| a == email))
        {
            debug!(user_id = %user.user_id, signature_id = %signature.signature_id, "email approval list match");
            return Ok(Some(ApprovalRule::Email));
        }

        if !emails.is_empty() && !signature.domain_approval_list.is_empty() {
            let patterns = self.domain_patterns(signature).await;
            if let Some(pattern) = patterns
                .iter()
                .find(|p| emails.iter().any(|email| p.matches(email)))
            {
                debug!(user_id = %user.user_id, pattern = pattern.source(), "domain approval list match");
                return Ok(Some(ApprovalRule::Domain));
            }
        }

        let Some(username) = participant.username() else {
            debug!(user_id = %user.user_id, "participant has no username, skipping username and group rules");
            return Ok(None);
        };

        if signature
            .username_approval_list
            .iter()
            .any(|approved| approved == username)
        {
            debug!(username, "username approval list match");
            return Ok(Some(ApprovalRule::Username));
        }

        for entry in &signature.group_approval_list {
            match self.is_group_member(ctx, username, entry).await {
                Ok(true) => {
                    debug!(username, group = %entry, "group approval list match");
                    return Ok(Some(ApprovalRule::Group));
                }
                Ok(false) => {}
                Err(GroupCheckError::Deadline(e)) => return Err(e),
                Err(GroupCheckError::Lookup(reason)) => {
                    warn!(username, group = %entry, reason = %reason, "group approval check failed");
                    break;
                }
            }
        }

        debug!(user_id = %user.user_id, signature_id = %signature.signature_id, "no approval list admits user");
        Ok(None)
    }

    /// Split a group approval URL, inserting `groups/` when missing.
    pub fn parse_group_url(&self, url: &str) -> Option<GroupReference> {
        let captures = self.group_url.captures(url.trim())?;
        let name = captures.name("name")?.as_str().to_string();
        Some(GroupReference {
            canonical_url: format!("{}groups/{}", self.group_base, name),
            name,
        })
    }

    async fn is_group_member(
        &self,
        ctx: &RequestContext,
        username: &str,
        entry: &str,
    ) -> Result<bool, GroupCheckError> {
        let Some(group) = self.parse_group_url(entry) else {
            debug!(entry, "group approval entry does not name a group");
            return Ok(false);
        };

        let organization = match ctx
            .within(
                "group organization lookup",
                self.records.organization_by_url(&group.canonical_url),
            )
            .await?
        {
            Ok(Some(organization)) => organization,
            Ok(None) => return Ok(false),
            Err(e) => {
                debug!(url = %group.canonical_url, error = %e, "group organization lookup failed");
                return Ok(false);
            }
        };

        let token = ctx
            .within(
                "group credential refresh",
                self.platform.refresh_credential(&organization),
            )
            .await?
            .map_err(|e| GroupCheckError::Lookup(e.to_string()))?;
        let client = self
            .platform
            .new_client(&token)
            .map_err(|e| GroupCheckError::Lookup(e.to_string()))?;
        let members = ctx
            .within(
                "group members",
                client.list_group_members(organization.external_group_id),
            )
            .await?
            .map_err(|e| GroupCheckError::Lookup(e.to_string()))?;

        Ok(members.iter().any(|m| m.username == username))
    }

    async fn domain_patterns(&self, signature: &CorporateSignature) -> Arc<Vec<DomainPattern>> {
        {
            let cache = self.domain_cache.read().await;
            if let Some(cached) = cache.get(&signature.signature_id) {
                if cached.sources == signature.domain_approval_list {
                    return cached.compiled.clone();
                }
            }
        }

        let compiled: Vec<DomainPattern> = signature
            .domain_approval_list
            .iter()
            .filter_map(|pattern| match DomainPattern::parse(pattern) {
                Ok(p) => Some(p),
                Err(e) => {
                    warn!(pattern = %pattern, error = %e, "skipping invalid domain pattern");
                    None
                }
            })
            .collect();
        let compiled = Arc::new(compiled);

        self.domain_cache.write().await.insert(
            signature.signature_id.clone(),
            CachedPatterns {
                sources: signature.domain_approval_list.clone(),
                compiled: compiled.clone(),
            },
        );
        compiled
    }
}

enum GroupCheckError {
    Deadline(GateError),
    Lookup(String),
}

impl From<GateError> for GroupCheckError {
    fn from(e: GateError) -> Self {
        GroupCheckError::Deadline(e)
    }
}
