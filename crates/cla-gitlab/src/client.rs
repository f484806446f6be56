use async_trait::async_trait;
use cla_gate::{HostingClient, PlatformError, PlatformResult};
use cla_gate_types::{CommitRef, CommitStatus, GroupMember, MergeRequestInfo, Participant};
use serde::Serialize;
use tracing::debug;

use crate::http::Transport;

#[derive(Serialize)]
struct NoteRequest<'a> {
    body: &'a str,
}

/// GitLab v4 REST client authenticated with one organization's token.
pub struct GitLabClient {
    transport: Transport,
    access_token: String,
}

impl GitLabClient {
    pub(crate) fn new(transport: Transport, access_token: String) -> Self {
        Self {
            transport,
            access_token,
        }
    }

    fn merge_request_path(project_id: i64, merge_request_id: u64) -> String {
        format!("/projects/{}/merge_requests/{}", project_id, merge_request_id)
    }
}

#[async_trait]
impl HostingClient for GitLabClient {
    async fn get_latest_commit(&self, project_id: i64, merge_request_id: u64) -> PlatformResult<CommitRef> {
        let path = format!("{}/commits", Self::merge_request_path(project_id, merge_request_id));
        let commits: Vec<CommitRef> = self.transport.get(&self.access_token, &path).await?;
        commits.into_iter().next().ok_or_else(|| {
            PlatformError::Decode(format!(
                "merge request {} of project {} has no commits",
                merge_request_id, project_id
            ))
        })
    }

    async fn get_merge_request(
        &self,
        project_id: i64,
        merge_request_id: u64,
    ) -> PlatformResult<MergeRequestInfo> {
        self.transport
            .get(
                &self.access_token,
                &Self::merge_request_path(project_id, merge_request_id),
            )
            .await
    }

    async fn get_participants(
        &self,
        project_id: i64,
        merge_request_id: u64,
    ) -> PlatformResult<Vec<Participant>> {
        let path = format!(
            "{}/participants",
            Self::merge_request_path(project_id, merge_request_id)
        );
        self.transport.get_all(&self.access_token, &path).await
    }

    async fn set_commit_status(
        &self,
        project_id: i64,
        sha: &str,
        status: &CommitStatus,
    ) -> PlatformResult<()> {
        debug!(project_id, sha, state = %status.state, "posting commit status");
        let path = format!("/projects/{}/statuses/{}", project_id, sha);
        self.transport
            .post_json(&self.access_token, &path, status)
            .await
    }

    async fn post_comment(&self, project_id: i64, merge_request_id: u64, body: &str) -> PlatformResult<()> {
        let path = format!("{}/notes", Self::merge_request_path(project_id, merge_request_id));
        self.transport
            .post_json(&self.access_token, &path, &NoteRequest { body })
            .await
    }

    async fn list_group_members(&self, group_id: i64) -> PlatformResult<Vec<GroupMember>> {
        let path = format!("/groups/{}/members/all", group_id);
        self.transport.get_all(&self.access_token, &path).await
    }
}
