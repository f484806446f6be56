use std::sync::Arc;

use cla_gate_types::{ClaGroup, MergeRequestInfo, Organization, Participant, Repository};
use tracing::{debug, warn};

use crate::context::RequestContext;
use crate::error::GateError;
use crate::traits::{ClaRecords, HostingClient};

/// Merge request state fetched from the hosting platform.
#[derive(Clone, Debug)]
pub struct MergeRequestSnapshot {
    pub project_id: i64,
    pub merge_request_id: u64,
    pub last_commit_sha: String,
    pub merge_request: MergeRequestInfo,
    /// In platform order; outcomes and comments keep this order
    pub participants: Vec<Participant>,
}

/// Internal records the merge request is gated against.
#[derive(Clone, Debug)]
pub struct GateBinding {
    pub repository: Repository,
    pub cla_group: ClaGroup,
}

/// Gathers everything the evaluation needs about one merge request.
pub struct ParticipantCollector {
    records: Arc<dyn ClaRecords>,
}

impl ParticipantCollector {
    pub fn new(records: Arc<dyn ClaRecords>) -> Self {
        Self { records }
    }

    /// Latest commit, existence check and participant list.
    ///
    /// `known_sha` is used as-is when non-empty.
    pub async fn snapshot(
        &self,
        ctx: &RequestContext,
        client: &dyn HostingClient,
        project_id: i64,
        merge_request_id: u64,
        known_sha: &str,
    ) -> Result<MergeRequestSnapshot, GateError> {
        let lookup_failed = |source| GateError::MergeRequestLookupFailed {
            project_id,
            merge_request_id,
            source,
        };

        let last_commit_sha = if known_sha.is_empty() {
            debug!(project_id, merge_request_id, "loading latest commit");
            ctx.within(
                "latest commit",
                client.get_latest_commit(project_id, merge_request_id),
            )
            .await?
            .map_err(lookup_failed)?
            .id
        } else {
            known_sha.to_string()
        };
        debug!(merge_request_id, sha = %last_commit_sha, "last commit resolved");

        let merge_request = ctx
            .within(
                "merge request",
                client.get_merge_request(project_id, merge_request_id),
            )
            .await?
            .map_err(lookup_failed)?;

        let participants = ctx
            .within(
                "participants",
                client.get_participants(project_id, merge_request_id),
            )
            .await?
            .map_err(|source| {
                warn!(project_id, merge_request_id, error = %source, "problem loading participants");
                GateError::ParticipantsFetchFailed {
                    project_id,
                    merge_request_id,
                    source,
                }
            })?;

        if participants.is_empty() {
            return Err(GateError::NoParticipants {
                project_id,
                merge_request_id,
            });
        }
        debug!(count = participants.len(), "participants loaded");

        Ok(MergeRequestSnapshot {
            project_id,
            merge_request_id,
            last_commit_sha,
            merge_request,
            participants,
        })
    }

    /// Repository record and CLA group for the merge request.
    pub async fn bind(
        &self,
        ctx: &RequestContext,
        organization: &Organization,
        repository_path: &str,
    ) -> Result<GateBinding, GateError> {
        let repository = match ctx
            .within(
                "repository lookup",
                self.records.repository_by_path(repository_path),
            )
            .await?
        {
            Ok(Some(repository)) => repository,
            Ok(None) => {
                return Err(GateError::RepositoryNotFound {
                    path: repository_path.to_string(),
                })
            }
            Err(e) => {
                warn!(repository_path, error = %e, "repository lookup failed");
                return Err(GateError::RepositoryNotFound {
                    path: repository_path.to_string(),
                });
            }
        };

        let cla_group = self.cla_group(ctx, organization).await?;
        Ok(GateBinding {
            repository,
            cla_group,
        })
    }

    /// CLA group currently assigned to the organization's project.
    pub async fn cla_group(
        &self,
        ctx: &RequestContext,
        organization: &Organization,
    ) -> Result<ClaGroup, GateError> {
        let project_sfid = organization.project_sfid.as_str();
        let not_found = || GateError::ClaGroupNotFound {
            project_sfid: project_sfid.to_string(),
        };
        match ctx
            .within(
                "CLA group lookup",
                self.records.cla_group_for_project(project_sfid),
            )
            .await?
        {
            Ok(Some(group)) => {
                debug!(
                    organization_id = %organization.organization_id,
                    cla_group_id = %group.cla_group_id,
                    "organization bound to CLA group"
                );
                Ok(group)
            }
            Ok(None) => Err(not_found()),
            Err(e) => {
                warn!(project_sfid, error = %e, "CLA group lookup failed");
                Err(not_found())
            }
        }
    }
}
