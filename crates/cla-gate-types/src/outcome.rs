use serde::{Deserialize, Serialize};

use crate::identity::Participant;

/// Why a participant is not covered by an agreement.
///
/// Variants are ordered by how far evaluation progressed before it stopped,
/// so `max()` over several candidates picks the most specific reason.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    /// No internal user record matches the participant at all
    MissingId,
    /// User exists but has no company affiliation
    MissingCompanyAffiliation,
    /// Affiliated company record could not be loaded
    CompanyLookupFailed,
    /// Company has no approved and signed corporate agreement
    MissingCcla,
    /// Participant is on none of the company's approval lists
    MissingApproval,
    /// Approved, but no employee acknowledgment on file
    MissingAcknowledgment,
}

impl Classification {
    pub fn code(&self) -> &'static str {
        match self {
            Classification::MissingId => "MISSING_ID",
            Classification::MissingCompanyAffiliation => "MISSING_COMPANY_AFFILIATION",
            Classification::CompanyLookupFailed => "COMPANY_LOOKUP_FAILED",
            Classification::MissingCcla => "MISSING_CCLA",
            Classification::MissingApproval => "MISSING_APPROVAL",
            Classification::MissingAcknowledgment => "MISSING_ACKNOWLEDGMENT",
        }
    }

    /// Human-readable reason used in merge-request comments.
    pub fn describe(&self) -> &'static str {
        match self {
            Classification::MissingId => "is not registered with the CLA service",
            Classification::MissingCompanyAffiliation => {
                "must confirm their affiliation with their company"
            }
            Classification::CompanyLookupFailed => "has a company affiliation that could not be verified",
            Classification::MissingCcla => "is affiliated with a company that has not signed a corporate CLA",
            Classification::MissingApproval => "is missing from the company approval lists",
            Classification::MissingAcknowledgment => {
                "is approved but has not acknowledged the corporate CLA"
            }
        }
    }
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Result of checking one participant.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignatureStatus {
    Signed { user_id: String },
    Missing(Classification),
}

impl SignatureStatus {
    pub fn is_signed(&self) -> bool {
        matches!(self, SignatureStatus::Signed { .. })
    }

    pub fn classification(&self) -> Option<Classification> {
        match self {
            SignatureStatus::Signed { .. } => None,
            SignatureStatus::Missing(c) => Some(*c),
        }
    }
}

/// A participant together with its evaluation result.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantOutcome {
    pub participant: Participant,
    pub status: SignatureStatus,
}

/// Gate lifecycle for one webhook delivery.
///
/// `Pending -> Evaluating -> {Pass, Fail}`. Nothing is carried over between
/// deliveries; the platform's commit status is the only visible state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GateState {
    Pending,
    Evaluating,
    Pass,
    Fail,
}

impl GateState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, GateState::Pass | GateState::Fail)
    }

    /// Whether `next` is a legal successor of `self`.
    pub fn can_transition_to(&self, next: GateState) -> bool {
        matches!(
            (self, next),
            (GateState::Pending, GateState::Evaluating)
                | (GateState::Evaluating, GateState::Pass)
                | (GateState::Evaluating, GateState::Fail)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_order_follows_evaluation_chain() {
        let reasons = [
            Classification::MissingApproval,
            Classification::MissingId,
            Classification::MissingCcla,
        ];
        assert_eq!(reasons.iter().max(), Some(&Classification::MissingApproval));
        assert!(Classification::MissingAcknowledgment > Classification::MissingApproval);
    }

    #[test]
    fn gate_state_transitions() {
        assert!(GateState::Pending.can_transition_to(GateState::Evaluating));
        assert!(GateState::Evaluating.can_transition_to(GateState::Fail));
        assert!(!GateState::Pending.can_transition_to(GateState::Pass));
        assert!(!GateState::Pass.can_transition_to(GateState::Fail));
        assert!(GateState::Fail.is_terminal());
    }
}
