use thiserror::Error;

/// Fatal errors from the gate pipeline.
///
/// Any of these aborts the current webhook delivery. The caller answers the
/// webhook with an error so the hosting platform redelivers it later.
#[derive(Error, Debug)]
pub enum GateError {
    #[error("comment URL carries no merge request ID: {url}")]
    MalformedCommentUrl { url: String },

    #[error("no organization found for path {path} or namespace {namespace}")]
    OrganizationNotFound { path: String, namespace: String },

    #[error("organization {organization_id} not found")]
    UnknownOrganization { organization_id: String },

    #[error("webhook secret token mismatch for organization {organization_id}")]
    SecretTokenMismatch { organization_id: String },

    #[error("refreshing credential for organization {organization_id} failed: {source}")]
    CredentialRefreshFailed {
        organization_id: String,
        #[source]
        source: PlatformError,
    },

    #[error("initializing hosting client for organization {organization_id} failed: {source}")]
    ClientInitFailed {
        organization_id: String,
        #[source]
        source: PlatformError,
    },

    #[error("loading merge request {merge_request_id} of project {project_id} failed: {source}")]
    MergeRequestLookupFailed {
        project_id: i64,
        merge_request_id: u64,
        #[source]
        source: PlatformError,
    },

    #[error("loading participants of merge request {merge_request_id} in project {project_id} failed: {source}")]
    ParticipantsFetchFailed {
        project_id: i64,
        merge_request_id: u64,
        #[source]
        source: PlatformError,
    },

    #[error("no participants found in merge request {merge_request_id} of project {project_id}")]
    NoParticipants { project_id: i64, merge_request_id: u64 },

    #[error("no repository record for {path}")]
    RepositoryNotFound { path: String },

    #[error("no CLA group bound to project {project_sfid}")]
    ClaGroupNotFound { project_sfid: String },

    #[error("writing correlation record under {key} failed: {source}")]
    CorrelationWriteFailed {
        key: String,
        #[source]
        source: StoreError,
    },

    #[error("setting commit status on {sha} for merge request {merge_request_id} failed: {source}")]
    StatusUpdateFailed {
        merge_request_id: u64,
        sha: String,
        #[source]
        source: PlatformError,
    },

    #[error("posting comment on merge request {merge_request_id} failed: {source}")]
    CommentFailed {
        merge_request_id: u64,
        #[source]
        source: PlatformError,
    },

    #[error("correlation record field {field} is not a valid ID: {value}")]
    InvalidCorrelationRecord { field: &'static str, value: String },

    #[error("invalid gate configuration: {0}")]
    Configuration(String),

    #[error("deadline exceeded during {operation}")]
    DeadlineExceeded { operation: &'static str },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors from the hosting-platform collaborator.
#[derive(Error, Debug)]
pub enum PlatformError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("platform returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unable to decode platform response: {0}")]
    Decode(String),

    #[error("platform client misconfigured: {0}")]
    Configuration(String),
}

/// Errors from the internal record repositories.
#[derive(Error, Debug)]
pub enum RecordError {
    #[error("record backend unavailable: {0}")]
    Unavailable(String),

    #[error("malformed record {kind} {id}: {reason}")]
    Malformed {
        kind: &'static str,
        id: String,
        reason: String,
    },
}

/// Errors from the correlation store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("correlation store unavailable: {0}")]
    Unavailable(String),

    #[error("correlation store rejected key {0}")]
    Rejected(String),
}
