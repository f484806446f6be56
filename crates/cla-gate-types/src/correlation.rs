use serde::{Deserialize, Serialize};

/// Metadata linking a pending signature back to the merge request that
/// triggered it.
///
/// Written on every gate run and read back by the signing-completion flow.
/// The serialized key names are shared with that flow and must not change.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveMergeRequestRecord {
    #[serde(rename = "gitlab_author_username")]
    pub author_username: String,
    #[serde(rename = "gitlab_author_email")]
    pub author_email: String,
    pub cla_group_id: String,
    pub repository_id: String,
    pub merge_request_id: String,
    pub project_id: String,
}

impl ActiveMergeRequestRecord {
    /// Store key for the author's username.
    pub fn username_key(username: &str) -> String {
        format!("active_mr:u:{}", username)
    }

    /// Store key for the author's email.
    pub fn email_key(email: &str) -> String {
        format!("active_mr:e:{}", email)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_shared_key_names() {
        let record = ActiveMergeRequestRecord {
            author_username: "alice".into(),
            author_email: "alice@example.com".into(),
            cla_group_id: "g-1".into(),
            repository_id: "77".into(),
            merge_request_id: "3".into(),
            project_id: "17".into(),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["gitlab_author_username"], "alice");
        assert_eq!(json["gitlab_author_email"], "alice@example.com");
        assert_eq!(json["merge_request_id"], "3");
    }

    #[test]
    fn keys_are_prefixed_by_kind() {
        assert_eq!(ActiveMergeRequestRecord::username_key("bob"), "active_mr:u:bob");
        assert_eq!(
            ActiveMergeRequestRecord::email_key("bob@example.com"),
            "active_mr:e:bob@example.com"
        );
    }
}
