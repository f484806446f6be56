use std::fmt::Write as _;

use cla_gate_types::{
    Classification, CommitState, CommitStatus, GateState, Participant, ParticipantOutcome,
};
use tracing::{debug, info};

use crate::config::StatusConfig;
use crate::context::RequestContext;
use crate::error::GateError;
use crate::traits::HostingClient;

const SIGNED_MARK: &str = ":white_check_mark:";
const MISSING_MARK: &str = ":x:";

/// Status and comment to publish for one evaluation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GateReport {
    pub state: GateState,
    pub sign_url: String,
    pub status: CommitStatus,
    pub comment: String,
    pub signed: usize,
    pub missing: usize,
}

/// Turns participant outcomes into a commit status and a comment.
pub struct GateReporter {
    sign_url_base: String,
    status: StatusConfig,
}

impl GateReporter {
    pub fn new(sign_url_base: impl Into<String>, status: StatusConfig) -> Self {
        Self {
            sign_url_base: sign_url_base.into(),
            status,
        }
    }

    /// Link that starts the signing flow for this merge request.
    pub fn sign_url(
        &self,
        organization_id: &str,
        repository_external_id: i64,
        merge_request_id: u64,
    ) -> String {
        format!(
            "{}/v2/repository-provider/gitlab/sign/{}/{}/{}",
            self.sign_url_base.trim_end_matches('/'),
            organization_id,
            repository_external_id,
            merge_request_id
        )
    }

    pub fn build_report(&self, sign_url: &str, outcomes: &[ParticipantOutcome]) -> GateReport {
        let mut signed: Vec<&Participant> = Vec::new();
        let mut missing: Vec<(&Participant, Classification)> = Vec::new();
        for outcome in outcomes {
            match outcome.status.classification() {
                None => signed.push(&outcome.participant),
                Some(classification) => missing.push((&outcome.participant, classification)),
            }
        }

        let (state, status) = if missing.is_empty() {
            (
                GateState::Pass,
                CommitStatus {
                    state: CommitState::Success,
                    name: self.status.context_name.clone(),
                    description: self.status.passed_message.clone(),
                    target_url: None,
                },
            )
        } else {
            (
                GateState::Fail,
                CommitStatus {
                    state: CommitState::Failed,
                    name: self.status.context_name.clone(),
                    description: self.status.missing_message.clone(),
                    target_url: Some(sign_url.to_string()),
                },
            )
        };

        GateReport {
            state,
            sign_url: sign_url.to_string(),
            comment: self.comment_body(sign_url, &signed, &missing),
            status,
            signed: signed.len(),
            missing: missing.len(),
        }
    }

    fn comment_body(
        &self,
        sign_url: &str,
        signed: &[&Participant],
        missing: &[(&Participant, Classification)],
    ) -> String {
        let mut body = String::new();
        if missing.is_empty() {
            let _ = writeln!(body, "{} **{}**: {}", SIGNED_MARK, self.status.context_name, self.status.passed_message);
        } else {
            let _ = writeln!(
                body,
                "{} **{}**: {}",
                MISSING_MARK, self.status.context_name, self.status.missing_message
            );
        }
        body.push('\n');

        if !signed.is_empty() {
            body.push_str("<ul>");
            for participant in signed {
                let _ = write!(body, "<li>{}  {}</li>", SIGNED_MARK, display_name(participant));
            }
            body.push_str("</ul>\n");
        }

        if !missing.is_empty() {
            let _ = writeln!(
                body,
                "Please sign the [Contributor License Agreement]({}) before this contribution can be accepted:",
                sign_url
            );
            body.push_str("<ul>");
            for (participant, classification) in missing {
                let _ = write!(
                    body,
                    "<li>{}  {} {}. [Sign the CLA]({})</li>",
                    MISSING_MARK,
                    display_name(participant),
                    classification.describe(),
                    sign_url
                );
            }
            body.push_str("</ul>\n");
        }

        body
    }

    /// Post the commit status, then the comment.
    pub async fn publish(
        &self,
        ctx: &RequestContext,
        client: &dyn HostingClient,
        project_id: i64,
        merge_request_id: u64,
        sha: &str,
        report: &GateReport,
    ) -> Result<(), GateError> {
        debug!(
            merge_request_id,
            sha,
            state = %report.status.state,
            "setting commit status"
        );
        ctx.within(
            "commit status",
            client.set_commit_status(project_id, sha, &report.status),
        )
        .await?
        .map_err(|source| GateError::StatusUpdateFailed {
            merge_request_id,
            sha: sha.to_string(),
            source,
        })?;

        ctx.within(
            "merge request comment",
            client.post_comment(project_id, merge_request_id, &report.comment),
        )
        .await?
        .map_err(|source| GateError::CommentFailed {
            merge_request_id,
            source,
        })?;

        info!(
            merge_request_id,
            signed = report.signed,
            missing = report.missing,
            "merge request status published"
        );
        Ok(())
    }
}

fn display_name(participant: &Participant) -> &str {
    participant
        .username()
        .or_else(|| participant.email())
        .unwrap_or("Unknown")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::{participant, MockHostingClient};
    use cla_gate_types::SignatureStatus;
    use std::time::Duration;

    fn reporter() -> GateReporter {
        GateReporter::new("https://cla.example.org/", StatusConfig::default())
    }

    fn outcomes() -> Vec<ParticipantOutcome> {
        vec![
            ParticipantOutcome {
                participant: participant(1, "alice", None),
                status: SignatureStatus::Signed {
                    user_id: "u-1".into(),
                },
            },
            ParticipantOutcome {
                participant: participant(2, "bob", None),
                status: SignatureStatus::Missing(Classification::MissingCcla),
            },
        ]
    }

    #[test]
    fn sign_url_layout() {
        assert_eq!(
            reporter().sign_url("org-1", 77, 3),
            "https://cla.example.org/v2/repository-provider/gitlab/sign/org-1/77/3"
        );
    }

    #[test]
    fn missing_participant_fails_with_target_url() {
        let reporter = reporter();
        let url = reporter.sign_url("org-1", 77, 3);
        let report = reporter.build_report(&url, &outcomes());

        assert_eq!(report.state, GateState::Fail);
        assert_eq!(report.status.state, CommitState::Failed);
        assert_eq!(report.status.description, "Missing CLA Authorization");
        assert_eq!(report.status.target_url.as_deref(), Some(url.as_str()));
        assert_eq!((report.signed, report.missing), (1, 1));
        assert!(report.comment.contains(":white_check_mark:  alice"));
        assert!(report.comment.contains(":x:  bob"));
        assert!(report.comment.contains(Classification::MissingCcla.describe()));
    }

    #[test]
    fn all_signed_passes_without_target_url() {
        let reporter = reporter();
        let url = reporter.sign_url("org-1", 77, 3);
        let report = reporter.build_report(&url, &outcomes()[..1]);

        assert_eq!(report.state, GateState::Pass);
        assert_eq!(report.status.state, CommitState::Success);
        assert_eq!(
            report.status.description,
            "EasyCLA check passed. You are authorized to contribute."
        );
        assert!(report.status.target_url.is_none());
        assert!(!report.comment.contains(":x:"));
    }

    #[test]
    fn report_is_deterministic() {
        let reporter = reporter();
        let url = reporter.sign_url("org-1", 77, 3);
        assert_eq!(
            reporter.build_report(&url, &outcomes()),
            reporter.build_report(&url, &outcomes())
        );
    }

    #[tokio::test]
    async fn publish_sets_status_then_comments() {
        let reporter = reporter();
        let url = reporter.sign_url("org-1", 77, 3);
        let report = reporter.build_report(&url, &outcomes());
        let client = MockHostingClient::new();
        let ctx = RequestContext::new(Duration::from_secs(5));

        reporter
            .publish(&ctx, &client, 17, 3, "abc", &report)
            .await
            .unwrap();

        let statuses = client.statuses().await;
        assert_eq!(statuses.len(), 1);
        assert_eq!(statuses[0].0, "abc");
        assert_eq!(statuses[0].1, report.status);
        assert_eq!(client.comments().await, vec![(3, report.comment.clone())]);
    }

    #[tokio::test]
    async fn failed_status_skips_comment() {
        let reporter = reporter();
        let report = reporter.build_report("u", &outcomes());
        let client = MockHostingClient::new();
        client.fail_status(true);
        let ctx = RequestContext::new(Duration::from_secs(5));

        let err = reporter
            .publish(&ctx, &client, 17, 3, "abc", &report)
            .await
            .unwrap_err();
        assert!(matches!(err, GateError::StatusUpdateFailed { .. }));
        assert!(client.comments().await.is_empty());
    }

    #[tokio::test]
    async fn failed_comment_is_fatal_after_status() {
        let reporter = reporter();
        let report = reporter.build_report("u", &outcomes());
        let client = MockHostingClient::new();
        client.fail_comment(true);
        let ctx = RequestContext::new(Duration::from_secs(5));

        let err = reporter
            .publish(&ctx, &client, 17, 3, "abc", &report)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            GateError::CommentFailed {
                merge_request_id: 3,
                ..
            }
        ));
        assert_eq!(client.statuses().await.len(), 1);
        assert!(client.comments().await.is_empty());
    }
}
