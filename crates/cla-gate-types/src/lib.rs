//! Core type definitions for the CLA merge-request gate.
//!
//! This crate holds the shared data model only. No business logic, no I/O.
//! The engine (`cla-gate`) and the hosting-platform adapters depend on it.

pub mod correlation;
pub mod event;
pub mod hosting;
pub mod identity;
pub mod organization;
pub mod outcome;
pub mod signature;

// Re-export primary types at crate root for ergonomic use.
pub use correlation::ActiveMergeRequestRecord;
pub use event::{
    EventCommit, EventObjectAttributes, EventProject, EventUser, MergeActivityInput,
    MergeRequestEvent,
};
pub use hosting::{CommitRef, CommitState, CommitStatus, GroupMember, MergeRequestInfo};
pub use identity::{Company, InternalUser, Participant};
pub use organization::{ClaGroup, OAuthToken, Organization, Repository};
pub use outcome::{Classification, GateState, ParticipantOutcome, SignatureStatus};
pub use signature::{ApprovalCriteria, CorporateSignature, EmployeeSignature, IndividualSignature};
