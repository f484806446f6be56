//! Collaborator seams of the gate.
//!
//! Persistence, the hosting platform and the correlation store live outside
//! this crate; the pipeline only sees these traits.

use std::sync::Arc;

use async_trait::async_trait;
use cla_gate_types::{
    ApprovalCriteria, ClaGroup, CommitRef, CommitStatus, Company, CorporateSignature,
    EmployeeSignature, GroupMember, IndividualSignature, InternalUser, MergeRequestInfo,
    OAuthToken, Organization, Participant, Repository,
};

use crate::error::{PlatformError, RecordError, StoreError};

/// Result type for record lookups
pub type RecordResult<T> = Result<T, RecordError>;

/// Result type for hosting-platform calls
pub type PlatformResult<T> = Result<T, PlatformError>;

/// Hosting-platform entry point: credential refresh and client construction.
///
/// Injected at construction time and scoped to one deployment configuration.
#[async_trait]
pub trait HostingPlatform: Send + Sync {
    /// Exchange the organization's stored credential for a fresh one.
    async fn refresh_credential(&self, organization: &Organization) -> PlatformResult<OAuthToken>;

    /// Build an API client authenticated with `token`.
    fn new_client(&self, token: &OAuthToken) -> PlatformResult<Arc<dyn HostingClient>>;
}

/// Authenticated hosting-platform API client.
#[async_trait]
pub trait HostingClient: Send + Sync {
    async fn get_latest_commit(&self, project_id: i64, merge_request_id: u64) -> PlatformResult<CommitRef>;

    async fn get_merge_request(
        &self,
        project_id: i64,
        merge_request_id: u64,
    ) -> PlatformResult<MergeRequestInfo>;

    async fn get_participants(
        &self,
        project_id: i64,
        merge_request_id: u64,
    ) -> PlatformResult<Vec<Participant>>;

    async fn set_commit_status(
        &self,
        project_id: i64,
        sha: &str,
        status: &CommitStatus,
    ) -> PlatformResult<()>;

    async fn post_comment(&self, project_id: i64, merge_request_id: u64, body: &str) -> PlatformResult<()>;

    async fn list_group_members(&self, group_id: i64) -> PlatformResult<Vec<GroupMember>>;
}

/// Combined record access used by the gate
pub trait ClaRecords:
    OrganizationRecords
    + RepositoryRecords
    + ClaGroupRecords
    + UserRecords
    + SignatureRecords
    + CompanyRecords
    + Send
    + Sync
{
}

impl<T> ClaRecords for T where
    T: OrganizationRecords
        + RepositoryRecords
        + ClaGroupRecords
        + UserRecords
        + SignatureRecords
        + CompanyRecords
        + Send
        + Sync
{
}

#[async_trait]
pub trait OrganizationRecords: Send + Sync {
    async fn organization_by_full_path(&self, full_path: &str) -> RecordResult<Option<Organization>>;

    async fn organization_by_url(&self, url: &str) -> RecordResult<Option<Organization>>;

    async fn organization_by_id(&self, organization_id: &str) -> RecordResult<Option<Organization>>;
}

#[async_trait]
pub trait RepositoryRecords: Send + Sync {
    /// Look up a repository by its full path with namespace
    async fn repository_by_path(&self, path: &str) -> RecordResult<Option<Repository>>;
}

#[async_trait]
pub trait ClaGroupRecords: Send + Sync {
    async fn cla_group_for_project(&self, project_sfid: &str) -> RecordResult<Option<ClaGroup>>;
}

#[async_trait]
pub trait UserRecords: Send + Sync {
    async fn user_by_external_id(&self, external_id: i64) -> RecordResult<Option<InternalUser>>;

    async fn user_by_username(&self, username: &str) -> RecordResult<Option<InternalUser>>;

    /// Email lookups can be ambiguous and may return several users
    async fn users_by_email(&self, email: &str) -> RecordResult<Vec<InternalUser>>;
}

#[async_trait]
pub trait SignatureRecords: Send + Sync {
    /// Approved and signed ICLA for the pair, if any
    async fn individual_signature(
        &self,
        cla_group_id: &str,
        user_id: &str,
    ) -> RecordResult<Option<IndividualSignature>>;

    /// Approved and signed CCLA for the pair, if any
    async fn corporate_signature(
        &self,
        cla_group_id: &str,
        company_id: &str,
    ) -> RecordResult<Option<CorporateSignature>>;

    async fn employee_signatures(
        &self,
        company_id: &str,
        cla_group_id: &str,
        criteria: &ApprovalCriteria,
    ) -> RecordResult<Vec<EmployeeSignature>>;
}

#[async_trait]
pub trait CompanyRecords: Send + Sync {
    async fn company(&self, company_id: &str) -> RecordResult<Option<Company>>;
}

/// Key/value store for short-lived correlation records.
#[async_trait]
pub trait CorrelationStore: Send + Sync {
    /// Store `value` under `key` until the absolute epoch second `expiry_epoch`.
    async fn put(&self, key: &str, expiry_epoch: i64, value: &str) -> Result<(), StoreError>;
}
