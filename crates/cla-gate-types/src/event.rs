use serde::{Deserialize, Serialize};

/// Inbound merge-request webhook payload.
///
/// Only the fields the gate consumes are modelled; everything else in the
/// hosting platform's payload is ignored on deserialization. The same shape
/// carries both "merge opened" and "merge comment" deliveries.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MergeRequestEvent {
    pub project: EventProject,
    pub object_attributes: EventObjectAttributes,
    /// Present on comment deliveries only
    #[serde(default)]
    pub user: Option<EventUser>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EventProject {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub path_with_namespace: String,
    #[serde(default)]
    pub namespace: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EventObjectAttributes {
    /// Merge-request IID. Absent (zero) on comment deliveries.
    #[serde(default)]
    pub iid: u64,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub last_commit: Option<EventCommit>,
}

impl EventObjectAttributes {
    /// SHA of the last commit, or an empty string when the payload has none.
    pub fn last_commit_sha(&self) -> &str {
        self.last_commit
            .as_ref()
            .map(|c| c.id.as_str())
            .unwrap_or_default()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EventCommit {
    #[serde(default)]
    pub id: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EventUser {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// Canonical input to the gate pipeline.
///
/// Built once by the webhook normalizer and never mutated afterwards.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeActivityInput {
    pub project_name: String,
    pub project_path: String,
    pub project_namespace: String,
    pub project_external_id: i64,
    pub merge_request_id: u64,
    pub repository_path: String,
    /// May be empty; the collector then fetches it from the platform
    pub last_commit_sha: String,
    pub author_username: Option<String>,
    pub author_email: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_comment_payload_without_iid() {
        let raw = r#"{
            "object_kind": "note",
            "user": {"username": "alice", "email": "alice@example.com", "name": "Alice"},
            "project": {
                "id": 17,
                "name": "widgets",
                "path_with_namespace": "acme/widgets",
                "namespace": "acme"
            },
            "object_attributes": {
                "url": "https://gitlab.com/acme/widgets/-/merge_requests/3#note_99",
                "noteable_type": "MergeRequest"
            }
        }"#;

        let event: MergeRequestEvent = serde_json::from_str(raw).unwrap();
        assert_eq!(event.project.id, 17);
        assert_eq!(event.object_attributes.iid, 0);
        assert_eq!(event.object_attributes.last_commit_sha(), "");
        assert_eq!(event.user.unwrap().username, "alice");
    }

    #[test]
    fn last_commit_sha_reads_nested_commit() {
        let attrs = EventObjectAttributes {
            iid: 5,
            url: String::new(),
            last_commit: Some(EventCommit { id: "abc123".into() }),
        };
        assert_eq!(attrs.last_commit_sha(), "abc123");
    }
}
