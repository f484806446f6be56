//! In-memory collaborators for tests and local runs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use cla_gate_types::{
    ApprovalCriteria, ClaGroup, CommitRef, CommitStatus, Company, CorporateSignature,
    EmployeeSignature, GroupMember, IndividualSignature, InternalUser, MergeRequestInfo,
    OAuthToken, Organization, Participant, Repository,
};
use tokio::sync::{Mutex, RwLock};

use crate::error::{PlatformError, RecordError, StoreError};
use crate::traits::{
    ClaGroupRecords, CompanyRecords, CorrelationStore, HostingClient, HostingPlatform,
    OrganizationRecords, PlatformResult, RecordResult, RepositoryRecords, SignatureRecords,
    UserRecords,
};

/// Organization fixture whose webhook secret is `<full_path>-secret` and
/// whose project scope is `sfid-<full_path>`.
pub fn sample_organization(organization_id: &str, full_path: &str) -> Organization {
    Organization {
        organization_id: organization_id.to_string(),
        organization_name: full_path.to_string(),
        external_group_id: 100,
        full_path: full_path.to_string(),
        url: format!("https://gitlab.com/groups/{}", full_path),
        auth: OAuthToken {
            access_token: format!("{}-access", full_path),
            refresh_token: format!("{}-refresh", full_path),
            token_type: "Bearer".to_string(),
            expires_in: Some(7200),
            created_at: Some(1_700_000_000),
        },
        project_sfid: format!("sfid-{}", full_path),
        webhook_secret: Some(format!("{}-secret", full_path)),
    }
}

/// Participant fixture.
pub fn participant(external_id: i64, username: &str, email: Option<&str>) -> Participant {
    Participant {
        external_id,
        username: username.to_string(),
        email: email.map(String::from),
    }
}

/// In-memory implementation of every record trait.
pub struct InMemoryRecords {
    organizations: Arc<RwLock<Vec<Organization>>>,
    repositories: Arc<RwLock<HashMap<String, Repository>>>,
    cla_groups: Arc<RwLock<HashMap<String, ClaGroup>>>,
    users_by_external_id: Arc<RwLock<HashMap<i64, InternalUser>>>,
    users_by_username: Arc<RwLock<HashMap<String, InternalUser>>>,
    users_by_email: Arc<RwLock<HashMap<String, Vec<InternalUser>>>>,
    individual_signatures: Arc<RwLock<Vec<IndividualSignature>>>,
    corporate_signatures: Arc<RwLock<Vec<CorporateSignature>>>,
    employee_signatures: Arc<RwLock<Vec<EmployeeSignature>>>,
    companies: Arc<RwLock<HashMap<String, Company>>>,
    fail_external_id_lookups: AtomicBool,
    fail_individual_signature_lookups: AtomicBool,
}

impl Default for InMemoryRecords {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryRecords {
    pub fn new() -> Self {
        Self {
            organizations: Arc::new(RwLock::new(Vec::new())),
            repositories: Arc::new(RwLock::new(HashMap::new())),
            cla_groups: Arc::new(RwLock::new(HashMap::new())),
            users_by_external_id: Arc::new(RwLock::new(HashMap::new())),
            users_by_username: Arc::new(RwLock::new(HashMap::new())),
            users_by_email: Arc::new(RwLock::new(HashMap::new())),
            individual_signatures: Arc::new(RwLock::new(Vec::new())),
            corporate_signatures: Arc::new(RwLock::new(Vec::new())),
            employee_signatures: Arc::new(RwLock::new(Vec::new())),
            companies: Arc::new(RwLock::new(HashMap::new())),
            fail_external_id_lookups: AtomicBool::new(false),
            fail_individual_signature_lookups: AtomicBool::new(false),
        }
    }

    pub async fn add_organization(&self, organization: Organization) {
        self.organizations.write().await.push(organization);
    }

    pub async fn add_repository(&self, repository: Repository) {
        self.repositories
            .write()
            .await
            .insert(repository.repository_name.clone(), repository);
    }

    pub async fn add_cla_group(&self, cla_group_id: &str, project_sfid: &str) {
        self.cla_groups.write().await.insert(
            project_sfid.to_string(),
            ClaGroup {
                cla_group_id: cla_group_id.to_string(),
                project_sfid: project_sfid.to_string(),
            },
        );
    }

    /// Register a user under its hosting-platform user ID.
    pub async fn add_user(&self, external_id: i64, user: InternalUser) {
        self.users_by_external_id
            .write()
            .await
            .insert(external_id, user);
    }

    pub async fn add_user_by_username(&self, username: &str, user: InternalUser) {
        self.users_by_username
            .write()
            .await
            .insert(username.to_string(), user);
    }

    /// Several users may share one email.
    pub async fn add_user_by_email(&self, email: &str, user: InternalUser) {
        self.users_by_email
            .write()
            .await
            .entry(email.to_string())
            .or_default()
            .push(user);
    }

    pub async fn add_individual_signature(&self, signature: IndividualSignature) {
        self.individual_signatures.write().await.push(signature);
    }

    pub async fn add_corporate_signature(&self, signature: CorporateSignature) {
        self.corporate_signatures.write().await.push(signature);
    }

    pub async fn add_employee_signature(&self, signature: EmployeeSignature) {
        self.employee_signatures.write().await.push(signature);
    }

    pub async fn add_company(&self, company: Company) {
        self.companies
            .write()
            .await
            .insert(company.company_id.clone(), company);
    }

    /// Make lookups by external ID fail with `RecordError::Unavailable`.
    pub fn fail_user_lookups_by_external_id(&self, fail: bool) {
        self.fail_external_id_lookups.store(fail, Ordering::SeqCst);
    }

    /// Make ICLA lookups fail with `RecordError::Unavailable`.
    pub fn fail_individual_signature_lookups(&self, fail: bool) {
        self.fail_individual_signature_lookups
            .store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl OrganizationRecords for InMemoryRecords {
    async fn organization_by_full_path(&self, full_path: &str) -> RecordResult<Option<Organization>> {
        let organizations = self.organizations.read().await;
        Ok(organizations.iter().find(|o| o.full_path == full_path).cloned())
    }

    async fn organization_by_url(&self, url: &str) -> RecordResult<Option<Organization>> {
        let organizations = self.organizations.read().await;
        Ok(organizations.iter().find(|o| o.url == url).cloned())
    }

    async fn organization_by_id(&self, organization_id: &str) -> RecordResult<Option<Organization>> {
        let organizations = self.organizations.read().await;
        Ok(organizations
            .iter()
            .find(|o| o.organization_id == organization_id)
            .cloned())
    }
}

#[async_trait]
impl RepositoryRecords for InMemoryRecords {
    async fn repository_by_path(&self, path: &str) -> RecordResult<Option<Repository>> {
        Ok(self.repositories.read().await.get(path).cloned())
    }
}

#[async_trait]
impl ClaGroupRecords for InMemoryRecords {
    async fn cla_group_for_project(&self, project_sfid: &str) -> RecordResult<Option<ClaGroup>> {
        Ok(self.cla_groups.read().await.get(project_sfid).cloned())
    }
}

#[async_trait]
impl UserRecords for InMemoryRecords {
    async fn user_by_external_id(&self, external_id: i64) -> RecordResult<Option<InternalUser>> {
        if self.fail_external_id_lookups.load(Ordering::SeqCst) {
            return Err(RecordError::Unavailable("user index offline".into()));
        }
        Ok(self.users_by_external_id.read().await.get(&external_id).cloned())
    }

    async fn user_by_username(&self, username: &str) -> RecordResult<Option<InternalUser>> {
        Ok(self.users_by_username.read().await.get(username).cloned())
    }

    async fn users_by_email(&self, email: &str) -> RecordResult<Vec<InternalUser>> {
        Ok(self
            .users_by_email
            .read()
            .await
            .get(email)
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl SignatureRecords for InMemoryRecords {
    async fn individual_signature(
        &self,
        cla_group_id: &str,
        user_id: &str,
    ) -> RecordResult<Option<IndividualSignature>> {
        if self.fail_individual_signature_lookups.load(Ordering::SeqCst) {
            return Err(RecordError::Unavailable("signature index offline".into()));
        }
        let signatures = self.individual_signatures.read().await;
        Ok(signatures
            .iter()
            .find(|s| s.cla_group_id == cla_group_id && s.user_id == user_id)
            .cloned())
    }

    async fn corporate_signature(
        &self,
        cla_group_id: &str,
        company_id: &str,
    ) -> RecordResult<Option<CorporateSignature>> {
        let signatures = self.corporate_signatures.read().await;
        Ok(signatures
            .iter()
            .find(|s| s.cla_group_id == cla_group_id && s.company_id == company_id)
            .cloned())
    }

    async fn employee_signatures(
        &self,
        company_id: &str,
        cla_group_id: &str,
        criteria: &ApprovalCriteria,
    ) -> RecordResult<Vec<EmployeeSignature>> {
        let signatures = self.employee_signatures.read().await;
        Ok(signatures
            .iter()
            .filter(|s| s.company_id == company_id && s.cla_group_id == cla_group_id)
            .filter(|s| criteria.matches(s))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl CompanyRecords for InMemoryRecords {
    async fn company(&self, company_id: &str) -> RecordResult<Option<Company>> {
        Ok(self.companies.read().await.get(company_id).cloned())
    }
}

/// Hosting platform handing out one shared [`MockHostingClient`].
pub struct MockHostingPlatform {
    client: Arc<MockHostingClient>,
    fail_refresh: AtomicBool,
    fail_client_init: AtomicBool,
    refreshes: AtomicUsize,
    refresh_delay: Mutex<Option<Duration>>,
}

impl Default for MockHostingPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl MockHostingPlatform {
    pub fn new() -> Self {
        Self {
            client: Arc::new(MockHostingClient::new()),
            fail_refresh: AtomicBool::new(false),
            fail_client_init: AtomicBool::new(false),
            refreshes: AtomicUsize::new(0),
            refresh_delay: Mutex::new(None),
        }
    }

    /// The client every `new_client` call returns.
    pub fn client(&self) -> Arc<MockHostingClient> {
        self.client.clone()
    }

    pub fn fail_refresh(&self, fail: bool) {
        self.fail_refresh.store(fail, Ordering::SeqCst);
    }

    pub fn fail_client_init(&self, fail: bool) {
        self.fail_client_init.store(fail, Ordering::SeqCst);
    }

    /// Make every refresh take `delay` before answering.
    pub async fn delay_refresh(&self, delay: Duration) {
        *self.refresh_delay.lock().await = Some(delay);
    }

    /// Number of credential refreshes attempted so far.
    pub fn refresh_count(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HostingPlatform for MockHostingPlatform {
    async fn refresh_credential(&self, organization: &Organization) -> PlatformResult<OAuthToken> {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        let delay = *self.refresh_delay.lock().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_refresh.load(Ordering::SeqCst) {
            return Err(PlatformError::Status {
                status: 401,
                body: "invalid_grant".into(),
            });
        }

        let mut token = organization.auth.clone();
        token.access_token = format!("{}-refreshed", token.access_token);
        Ok(token)
    }

    fn new_client(&self, _token: &OAuthToken) -> PlatformResult<Arc<dyn HostingClient>> {
        if self.fail_client_init.load(Ordering::SeqCst) {
            return Err(PlatformError::Configuration("no base URL".into()));
        }
        let client: Arc<dyn HostingClient> = self.client.clone();
        Ok(client)
    }
}

/// Hosting client that serves configured data and records what it is sent.
pub struct MockHostingClient {
    latest_commit: RwLock<String>,
    participants: RwLock<Vec<Participant>>,
    group_members: RwLock<HashMap<i64, Vec<GroupMember>>>,
    statuses: Mutex<Vec<(String, CommitStatus)>>,
    comments: Mutex<Vec<(u64, String)>>,
    fail_merge_request: AtomicBool,
    fail_participants: AtomicBool,
    fail_status: AtomicBool,
    fail_comment: AtomicBool,
}

impl Default for MockHostingClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MockHostingClient {
    pub fn new() -> Self {
        Self {
            latest_commit: RwLock::new("0123456789abcdef0123456789abcdef01234567".to_string()),
            participants: RwLock::new(Vec::new()),
            group_members: RwLock::new(HashMap::new()),
            statuses: Mutex::new(Vec::new()),
            comments: Mutex::new(Vec::new()),
            fail_merge_request: AtomicBool::new(false),
            fail_participants: AtomicBool::new(false),
            fail_status: AtomicBool::new(false),
            fail_comment: AtomicBool::new(false),
        }
    }

    pub async fn set_latest_commit(&self, sha: &str) {
        *self.latest_commit.write().await = sha.to_string();
    }

    pub async fn set_participants(&self, participants: Vec<Participant>) {
        *self.participants.write().await = participants;
    }

    pub async fn set_group_members(&self, group_id: i64, members: Vec<GroupMember>) {
        self.group_members.write().await.insert(group_id, members);
    }

    pub fn fail_merge_request(&self, fail: bool) {
        self.fail_merge_request.store(fail, Ordering::SeqCst);
    }

    pub fn fail_participants(&self, fail: bool) {
        self.fail_participants.store(fail, Ordering::SeqCst);
    }

    pub fn fail_status(&self, fail: bool) {
        self.fail_status.store(fail, Ordering::SeqCst);
    }

    pub fn fail_comment(&self, fail: bool) {
        self.fail_comment.store(fail, Ordering::SeqCst);
    }

    /// Commit statuses posted so far, as `(sha, status)`.
    pub async fn statuses(&self) -> Vec<(String, CommitStatus)> {
        self.statuses.lock().await.clone()
    }

    /// Comments posted so far, as `(merge_request_id, body)`.
    pub async fn comments(&self) -> Vec<(u64, String)> {
        self.comments.lock().await.clone()
    }
}

fn not_found() -> PlatformError {
    PlatformError::Status {
        status: 404,
        body: "404 Not found".into(),
    }
}

#[async_trait]
impl HostingClient for MockHostingClient {
    async fn get_latest_commit(&self, _project_id: i64, _merge_request_id: u64) -> PlatformResult<CommitRef> {
        Ok(CommitRef {
            id: self.latest_commit.read().await.clone(),
        })
    }

    async fn get_merge_request(
        &self,
        project_id: i64,
        merge_request_id: u64,
    ) -> PlatformResult<MergeRequestInfo> {
        if self.fail_merge_request.load(Ordering::SeqCst) {
            return Err(not_found());
        }
        Ok(MergeRequestInfo {
            iid: merge_request_id,
            project_id,
            sha: Some(self.latest_commit.read().await.clone()),
            state: "opened".into(),
            web_url: format!(
                "https://gitlab.com/projects/{}/merge_requests/{}",
                project_id, merge_request_id
            ),
        })
    }

    async fn get_participants(
        &self,
        _project_id: i64,
        _merge_request_id: u64,
    ) -> PlatformResult<Vec<Participant>> {
        if self.fail_participants.load(Ordering::SeqCst) {
            return Err(PlatformError::Transport("connection reset".into()));
        }
        Ok(self.participants.read().await.clone())
    }

    async fn set_commit_status(
        &self,
        _project_id: i64,
        sha: &str,
        status: &CommitStatus,
    ) -> PlatformResult<()> {
        if self.fail_status.load(Ordering::SeqCst) {
            return Err(PlatformError::Status {
                status: 403,
                body: "403 Forbidden".into(),
            });
        }
        self.statuses
            .lock()
            .await
            .push((sha.to_string(), status.clone()));
        Ok(())
    }

    async fn post_comment(&self, _project_id: i64, merge_request_id: u64, body: &str) -> PlatformResult<()> {
        if self.fail_comment.load(Ordering::SeqCst) {
            return Err(PlatformError::Transport("connection reset".into()));
        }
        self.comments
            .lock()
            .await
            .push((merge_request_id, body.to_string()));
        Ok(())
    }

    async fn list_group_members(&self, group_id: i64) -> PlatformResult<Vec<GroupMember>> {
        self.group_members
            .read()
            .await
            .get(&group_id)
            .cloned()
            .ok_or_else(not_found)
    }
}

/// Correlation store backed by a map of `key -> (expiry, value)`.
pub struct InMemoryCorrelationStore {
    entries: RwLock<HashMap<String, (i64, String)>>,
    failing_prefixes: RwLock<Vec<String>>,
}

impl Default for InMemoryCorrelationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryCorrelationStore {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            failing_prefixes: RwLock::new(Vec::new()),
        }
    }

    /// Reject writes to keys starting with `prefix`.
    pub async fn fail_keys_with_prefix(&self, prefix: &str) {
        self.failing_prefixes.write().await.push(prefix.to_string());
    }

    pub async fn get(&self, key: &str) -> Option<(i64, String)> {
        self.entries.read().await.get(key).cloned()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl CorrelationStore for InMemoryCorrelationStore {
    async fn put(&self, key: &str, expiry_epoch: i64, value: &str) -> Result<(), StoreError> {
        if self
            .failing_prefixes
            .read()
            .await
            .iter()
            .any(|p| key.starts_with(p.as_str()))
        {
            return Err(StoreError::Rejected(key.to_string()));
        }
        self.entries
            .write()
            .await
            .insert(key.to_string(), (expiry_epoch, value.to_string()));
        Ok(())
    }
}
