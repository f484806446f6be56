//! CLA Gate: merge-request compliance pipeline.
//!
//! A webhook delivery for a merge request runs through these stages:
//!
//! 1. **Normalize**: opened and comment events become one [`MergeActivityInput`]
//! 2. **Resolve organization**: project path (or namespace) to an onboarded
//!    organization, webhook secret check, OAuth refresh
//! 3. **Collect**: latest commit, participants, repository record, CLA group
//! 4. **Evaluate**: per participant, ICLA or CCLA coverage through the
//!    approval lists (email, domain, username, group)
//! 5. **Correlate**: active merge request record for the signing flow
//! 6. **Report**: commit status and comment on the merge request
//!
//! Every outbound call is bounded by the [`RequestContext`] deadline. Any
//! failure outside the per-participant evaluation aborts the delivery; the
//! platform's redelivery is the retry mechanism.
//!
//! [`MergeActivityInput`]: cla_gate_types::MergeActivityInput

pub mod config;
pub mod context;
pub mod error;
pub mod gate;
pub mod mocks;
pub mod stages;
pub mod telemetry;
pub mod traits;

pub use config::{
    CorrelationConfig, GateConfig, LoggingConfig, StatusConfig, WebhookConfig,
};
pub use context::RequestContext;
pub use error::{GateError, PlatformError, RecordError, StoreError};
pub use gate::{GateVerdict, MergeRequestGate};
pub use mocks::{InMemoryCorrelationStore, InMemoryRecords, MockHostingClient, MockHostingPlatform};
pub use stages::{
    ApprovalMatcher, ApprovalRule, CorrelationRecorder, DomainPattern, GateReport,
    GateReporter, OrganizationResolver, ParticipantCollector, SignatureEvaluator,
};
pub use traits::{
    ClaGroupRecords, ClaRecords, CompanyRecords, CorrelationStore, HostingClient,
    HostingPlatform, OrganizationRecords, PlatformResult, RecordResult, RepositoryRecords,
    SignatureRecords, UserRecords,
};
