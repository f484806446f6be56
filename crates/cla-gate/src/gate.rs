use std::sync::Arc;

use cla_gate_types::{
    ActiveMergeRequestRecord, GateState, MergeActivityInput, MergeRequestEvent, Participant,
    ParticipantOutcome, SignatureStatus,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, info_span, warn, Instrument};

use crate::config::GateConfig;
use crate::context::RequestContext;
use crate::error::GateError;
use crate::stages::{
    normalize_merge_comment, normalize_merge_opened, ApprovalMatcher, CorrelationRecorder,
    GateReport, GateReporter, MergeRequestSnapshot, OrganizationResolver, ParticipantCollector,
    SignatureEvaluator,
};
use crate::traits::{ClaRecords, CorrelationStore, HostingClient, HostingPlatform};

/// Result of one gate run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateVerdict {
    pub state: GateState,
    pub commit_sha: String,
    pub sign_url: String,
    /// One entry per participant, in platform order
    pub outcomes: Vec<ParticipantOutcome>,
    pub comment: String,
    /// Correlation keys written during this run
    #[serde(default)]
    pub correlation_keys: Vec<String>,
}

impl GateVerdict {
    pub fn passed(&self) -> bool {
        self.state == GateState::Pass
    }

    pub fn missing(&self) -> impl Iterator<Item = &ParticipantOutcome> {
        self.outcomes.iter().filter(|o| !o.status.is_signed())
    }
}

/// The merge-request gate.
///
/// Runs resolution, collection, per-participant evaluation and reporting for
/// one webhook delivery. Holds no state between deliveries apart from the
/// compiled domain pattern cache.
pub struct MergeRequestGate {
    config: GateConfig,
    resolver: OrganizationResolver,
    collector: ParticipantCollector,
    evaluator: SignatureEvaluator,
    recorder: CorrelationRecorder,
    reporter: GateReporter,
}

impl MergeRequestGate {
    pub fn new(
        config: GateConfig,
        records: Arc<dyn ClaRecords>,
        platform: Arc<dyn HostingPlatform>,
        store: Arc<dyn CorrelationStore>,
    ) -> Result<Self, GateError> {
        let matcher = ApprovalMatcher::new(
            records.clone(),
            platform.clone(),
            &config.hosting_base_url,
        )
        .map_err(|e| GateError::Configuration(format!("hosting_base_url: {}", e)))?;

        Ok(Self {
            resolver: OrganizationResolver::new(
                records.clone(),
                platform,
                config.webhook.enforce_secret,
            ),
            collector: ParticipantCollector::new(records.clone()),
            evaluator: SignatureEvaluator::new(records, Arc::new(matcher)),
            recorder: CorrelationRecorder::new(store, config.correlation.clone()),
            reporter: GateReporter::new(config.sign_url_base.clone(), config.status.clone()),
            config,
        })
    }

    /// Fresh context bounded by the configured request timeout.
    pub fn new_context(&self) -> RequestContext {
        RequestContext::new(self.config.request_timeout())
    }

    /// Handle a "merge request opened" delivery.
    pub async fn process_merge_opened(
        &self,
        ctx: &RequestContext,
        secret_token: Option<&str>,
        event: &MergeRequestEvent,
    ) -> Result<GateVerdict, GateError> {
        let input = normalize_merge_opened(event);
        self.process_merge_activity(ctx, secret_token, &input).await
    }

    /// Handle a "merge request comment" delivery.
    pub async fn process_merge_comment(
        &self,
        ctx: &RequestContext,
        secret_token: Option<&str>,
        event: &MergeRequestEvent,
    ) -> Result<GateVerdict, GateError> {
        let input = normalize_merge_comment(event)?;
        self.process_merge_activity(ctx, secret_token, &input).await
    }

    /// Evaluate a merge request and publish the verdict.
    pub async fn process_merge_activity(
        &self,
        ctx: &RequestContext,
        secret_token: Option<&str>,
        input: &MergeActivityInput,
    ) -> Result<GateVerdict, GateError> {
        let span = info_span!(
            "merge_activity",
            request_id = %ctx.request_id(),
            project_id = input.project_external_id,
            merge_request_id = input.merge_request_id,
        );

        async {
            info!(
                repository_path = %input.repository_path,
                has_author = input.author_username.is_some(),
                budget_ms = ctx.remaining().as_millis() as u64,
                "processing merge activity"
            );

            let organization = self
                .resolver
                .resolve(ctx, &input.repository_path, &input.project_namespace)
                .await?;
            self.resolver.verify_secret(&organization, secret_token)?;
            let client = self.resolver.authenticate(ctx, &organization).await?;

            let snapshot = self
                .collector
                .snapshot(
                    ctx,
                    client.as_ref(),
                    input.project_external_id,
                    input.merge_request_id,
                    &input.last_commit_sha,
                )
                .await?;
            let binding = self
                .collector
                .bind(ctx, &organization, &input.repository_path)
                .await?;

            let mut state = GateState::Pending;
            advance(&mut state, GateState::Evaluating);
            let outcomes = self
                .evaluate_all(ctx, &binding.cla_group.cla_group_id, &snapshot.participants)
                .await?;

            let record = ActiveMergeRequestRecord {
                author_username: input.author_username.clone().unwrap_or_default(),
                author_email: input.author_email.clone().unwrap_or_default(),
                cla_group_id: binding.cla_group.cla_group_id.clone(),
                repository_id: binding.repository.repository_external_id.to_string(),
                merge_request_id: input.merge_request_id.to_string(),
                project_id: input.project_external_id.to_string(),
            };
            let correlation_keys = self.recorder.set_active_mr_metadata(ctx, &record).await?;

            let sign_url = self.reporter.sign_url(
                &organization.organization_id,
                binding.repository.repository_external_id,
                input.merge_request_id,
            );
            self.finish(ctx, client.as_ref(), &snapshot, state, sign_url, outcomes, correlation_keys)
                .await
        }
        .instrument(span)
        .await
    }

    /// Re-evaluate a merge request from a stored correlation record.
    ///
    /// Used once a contributor finishes signing. No secret check is made and
    /// no correlation record is written.
    pub async fn recheck_merge_request(
        &self,
        ctx: &RequestContext,
        organization_id: &str,
        record: &ActiveMergeRequestRecord,
    ) -> Result<GateVerdict, GateError> {
        let project_id: i64 = parse_id("project_id", &record.project_id)?;
        let merge_request_id: u64 = parse_id("merge_request_id", &record.merge_request_id)?;
        let repository_external_id: i64 = parse_id("repository_id", &record.repository_id)?;

        let span = info_span!(
            "merge_recheck",
            request_id = %ctx.request_id(),
            project_id,
            merge_request_id,
        );

        async {
            info!(organization_id, cla_group_id = %record.cla_group_id, "re-checking merge request");

            let organization = self.resolver.resolve_by_id(ctx, organization_id).await?;
            let client = self.resolver.authenticate(ctx, &organization).await?;
            let snapshot = self
                .collector
                .snapshot(ctx, client.as_ref(), project_id, merge_request_id, "")
                .await?;
            let cla_group = self.collector.cla_group(ctx, &organization).await?;
            if cla_group.cla_group_id != record.cla_group_id {
                warn!(
                    stored = %record.cla_group_id,
                    current = %cla_group.cla_group_id,
                    "CLA group changed since the record was stored"
                );
            }

            let mut state = GateState::Pending;
            advance(&mut state, GateState::Evaluating);
            let outcomes = self
                .evaluate_all(ctx, &cla_group.cla_group_id, &snapshot.participants)
                .await?;

            let sign_url = self.reporter.sign_url(
                &organization.organization_id,
                repository_external_id,
                merge_request_id,
            );
            self.finish(ctx, client.as_ref(), &snapshot, state, sign_url, outcomes, Vec::new())
                .await
        }
        .instrument(span)
        .await
    }

    /// Signature status of one participant under a CLA group.
    pub async fn has_user_signed(
        &self,
        ctx: &RequestContext,
        cla_group_id: &str,
        participant: &Participant,
    ) -> Result<SignatureStatus, GateError> {
        self.evaluator
            .has_user_signed(ctx, cla_group_id, participant)
            .await
    }

    async fn evaluate_all(
        &self,
        ctx: &RequestContext,
        cla_group_id: &str,
        participants: &[Participant],
    ) -> Result<Vec<ParticipantOutcome>, GateError> {
        let mut outcomes = Vec::with_capacity(participants.len());
        for participant in participants {
            let status = self
                .evaluator
                .has_user_signed(ctx, cla_group_id, participant)
                .await?;
            match &status {
                SignatureStatus::Signed { user_id } => debug!(
                    username = %participant.username,
                    user_id = %user_id,
                    "participant signed"
                ),
                SignatureStatus::Missing(classification) => warn!(
                    username = %participant.username,
                    reason = %classification,
                    "participant not covered"
                ),
            }
            outcomes.push(ParticipantOutcome {
                participant: participant.clone(),
                status,
            });
        }
        Ok(outcomes)
    }

    #[allow(clippy::too_many_arguments)]
    async fn finish(
        &self,
        ctx: &RequestContext,
        client: &dyn HostingClient,
        snapshot: &MergeRequestSnapshot,
        mut state: GateState,
        sign_url: String,
        outcomes: Vec<ParticipantOutcome>,
        correlation_keys: Vec<String>,
    ) -> Result<GateVerdict, GateError> {
        let report: GateReport = self.reporter.build_report(&sign_url, &outcomes);
        self.reporter
            .publish(
                ctx,
                client,
                snapshot.project_id,
                snapshot.merge_request_id,
                &snapshot.last_commit_sha,
                &report,
            )
            .await?;
        advance(&mut state, report.state);

        Ok(GateVerdict {
            state,
            commit_sha: snapshot.last_commit_sha.clone(),
            sign_url,
            outcomes,
            comment: report.comment,
            correlation_keys,
        })
    }
}

fn advance(state: &mut GateState, next: GateState) {
    debug_assert!(state.can_transition_to(next));
    if next.is_terminal() {
        info!(verdict = ?next, "gate verdict reached");
    } else {
        debug!(from = ?state, to = ?next, "gate state transition");
    }
    *state = next;
}

fn parse_id<T: std::str::FromStr>(field: &'static str, value: &str) -> Result<T, GateError> {
    value
        .parse()
        .map_err(|_| GateError::InvalidCorrelationRecord {
            field,
            value: value.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::{InMemoryCorrelationStore, InMemoryRecords, MockHostingPlatform};

    #[test]
    fn invalid_record_ids_are_rejected() {
        let err = parse_id::<i64>("project_id", "seventeen").unwrap_err();
        assert!(matches!(
            err,
            GateError::InvalidCorrelationRecord {
                field: "project_id",
                ..
            }
        ));
        assert_eq!(parse_id::<u64>("merge_request_id", "3").unwrap(), 3);
    }

    #[tokio::test]
    async fn recheck_of_unknown_organization_fails() {
        let gate = MergeRequestGate::new(
            GateConfig::default(),
            Arc::new(InMemoryRecords::new()),
            Arc::new(MockHostingPlatform::new()),
            Arc::new(InMemoryCorrelationStore::new()),
        )
        .unwrap();
        let record = ActiveMergeRequestRecord {
            author_username: "alice".into(),
            author_email: String::new(),
            cla_group_id: "cla-1".into(),
            repository_id: "77".into(),
            merge_request_id: "3".into(),
            project_id: "17".into(),
        };

        let err = gate
            .recheck_merge_request(&gate.new_context(), "org-x", &record)
            .await
            .unwrap_err();
        assert!(matches!(err, GateError::UnknownOrganization { .. }));
    }
}
