use serde::{Deserialize, Serialize};

/// Individual contributor agreement (ICLA) for one user under one CLA group.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndividualSignature {
    pub signature_id: String,
    pub cla_group_id: String,
    pub user_id: String,
    pub approved: bool,
    pub signed: bool,
}

impl IndividualSignature {
    /// Counts for coverage only when approved and signed.
    pub fn is_effective(&self) -> bool {
        self.approved && self.signed
    }
}

/// Corporate agreement (CCLA) and its approval lists.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorporateSignature {
    pub signature_id: String,
    pub company_id: String,
    pub cla_group_id: String,
    pub approved: bool,
    pub signed: bool,
    #[serde(default)]
    pub email_approval_list: Vec<String>,
    #[serde(default)]
    pub domain_approval_list: Vec<String>,
    #[serde(default)]
    pub username_approval_list: Vec<String>,
    /// Group URLs on the hosting platform
    #[serde(default)]
    pub group_approval_list: Vec<String>,
}

impl CorporateSignature {
    pub fn is_effective(&self) -> bool {
        self.approved && self.signed
    }
}

/// Employee acknowledgment signed under a company's CCLA.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeSignature {
    pub signature_id: String,
    pub company_id: String,
    pub cla_group_id: String,
    pub user_id: String,
    #[serde(default)]
    pub user_email: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

/// Search criteria for employee acknowledgments.
///
/// Exactly one of the two fields is set: email when the participant has one,
/// username otherwise.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalCriteria {
    pub email: Option<String>,
    pub username: Option<String>,
}

impl ApprovalCriteria {
    /// Email preferred, else username. `None` when neither is available.
    pub fn for_identity(email: Option<&str>, username: Option<&str>) -> Option<Self> {
        match (email, username) {
            (Some(email), _) => Some(Self {
                email: Some(email.to_string()),
                username: None,
            }),
            (None, Some(username)) => Some(Self {
                email: None,
                username: Some(username.to_string()),
            }),
            (None, None) => None,
        }
    }

    /// Whether an acknowledgment record satisfies these criteria.
    pub fn matches(&self, signature: &EmployeeSignature) -> bool {
        match (&self.email, &self.username) {
            (Some(email), _) => signature.user_email.as_deref() == Some(email.as_str()),
            (None, Some(username)) => signature.username.as_deref() == Some(username.as_str()),
            (None, None) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn criteria_prefers_email() {
        let criteria = ApprovalCriteria::for_identity(Some("a@example.com"), Some("alice")).unwrap();
        assert_eq!(criteria.email.as_deref(), Some("a@example.com"));
        assert!(criteria.username.is_none());

        let criteria = ApprovalCriteria::for_identity(None, Some("alice")).unwrap();
        assert_eq!(criteria.username.as_deref(), Some("alice"));

        assert!(ApprovalCriteria::for_identity(None, None).is_none());
    }

    #[test]
    fn criteria_matches_by_selected_field_only() {
        let ack = EmployeeSignature {
            signature_id: "s-1".into(),
            company_id: "c-1".into(),
            cla_group_id: "g-1".into(),
            user_id: "u-1".into(),
            user_email: Some("a@example.com".into()),
            username: Some("alice".into()),
        };

        assert!(ApprovalCriteria::for_identity(Some("a@example.com"), None)
            .unwrap()
            .matches(&ack));
        assert!(!ApprovalCriteria::for_identity(Some("b@example.com"), Some("alice"))
            .unwrap()
            .matches(&ack));
        assert!(ApprovalCriteria::for_identity(None, Some("alice"))
            .unwrap()
            .matches(&ack));
    }
}
