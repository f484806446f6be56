pub mod normalizer;
pub mod organization;
pub mod participants;
pub mod approval;
pub mod signature;
pub mod correlation;
pub mod reporter;

pub use approval::{ApprovalMatcher, ApprovalRule, DomainPattern, GroupReference};
pub use correlation::CorrelationRecorder;
pub use normalizer::{merge_request_id_from_url, normalize_merge_comment, normalize_merge_opened};
pub use organization::OrganizationResolver;
pub use participants::{GateBinding, MergeRequestSnapshot, ParticipantCollector};
pub use reporter::{GateReport, GateReporter};
pub use signature::SignatureEvaluator;
