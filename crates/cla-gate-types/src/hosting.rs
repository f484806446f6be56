use serde::{Deserialize, Serialize};

/// Commit reference returned by the hosting platform.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRef {
    pub id: String,
}

/// Merge-request detail, reduced to what the gate inspects.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeRequestInfo {
    pub iid: u64,
    pub project_id: i64,
    #[serde(default)]
    pub sha: Option<String>,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub web_url: String,
}

/// A member of a hosting-platform group.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMember {
    pub id: i64,
    pub username: String,
}

/// Commit status state as understood by the hosting platform.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommitState {
    Pending,
    Running,
    Success,
    Failed,
}

impl CommitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommitState::Pending => "pending",
            CommitState::Running => "running",
            CommitState::Success => "success",
            CommitState::Failed => "failed",
        }
    }
}

impl std::fmt::Display for CommitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Commit status posted back to the platform.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitStatus {
    pub state: CommitState,
    /// Status context name shown next to the pipeline
    pub name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commit_state_uses_platform_spelling() {
        assert_eq!(serde_json::to_string(&CommitState::Failed).unwrap(), "\"failed\"");
        assert_eq!(CommitState::Success.to_string(), "success");
    }

    #[test]
    fn status_omits_missing_target_url() {
        let status = CommitStatus {
            state: CommitState::Success,
            name: "EasyCLA".into(),
            description: "ok".into(),
            target_url: None,
        };
        let json = serde_json::to_value(&status).unwrap();
        assert!(json.get("target_url").is_none());
    }
}
