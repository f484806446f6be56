use std::sync::Arc;

use cla_gate_types::{
    ApprovalCriteria, Classification, InternalUser, Participant, SignatureStatus,
};
use tracing::{debug, warn};

use crate::context::RequestContext;
use crate::error::GateError;
use crate::stages::approval::ApprovalMatcher;
use crate::traits::ClaRecords;

/// Decides whether a single participant is covered by an agreement.
pub struct SignatureEvaluator {
    records: Arc<dyn ClaRecords>,
    matcher: Arc<ApprovalMatcher>,
}

impl SignatureEvaluator {
    pub fn new(records: Arc<dyn ClaRecords>, matcher: Arc<ApprovalMatcher>) -> Self {
        Self { records, matcher }
    }

    /// Signature status of `participant` under `cla_group_id`.
    ///
    /// Every candidate internal user is tried in turn. When none of them is
    /// covered, the classification of the candidate that got furthest is
    /// reported.
    pub async fn has_user_signed(
        &self,
        ctx: &RequestContext,
        cla_group_id: &str,
        participant: &Participant,
    ) -> Result<SignatureStatus, GateError> {
        let candidates = self.resolve_users(ctx, participant).await?;
        if candidates.is_empty() {
            debug!(
                external_id = participant.external_id,
                username = %participant.username,
                "no internal user for participant"
            );
            return Ok(SignatureStatus::Missing(Classification::MissingId));
        }

        let mut furthest: Option<Classification> = None;
        for user in &candidates {
            match self.evaluate_user(ctx, cla_group_id, user, participant).await? {
                SignatureStatus::Signed { user_id } => {
                    debug!(user_id = %user_id, cla_group_id, "participant covered");
                    return Ok(SignatureStatus::Signed { user_id });
                }
                SignatureStatus::Missing(classification) => {
                    debug!(
                        user_id = %user.user_id,
                        classification = %classification,
                        "candidate user not covered"
                    );
                    furthest = furthest.max(Some(classification));
                }
            }
        }

        Ok(SignatureStatus::Missing(
            furthest.unwrap_or(Classification::MissingId),
        ))
    }

    /// Candidate users by external ID, then username, then email.
    async fn resolve_users(
        &self,
        ctx: &RequestContext,
        participant: &Participant,
    ) -> Result<Vec<InternalUser>, GateError> {
        if participant.external_id > 0 {
            match ctx
                .within(
                    "user lookup by external ID",
                    self.records.user_by_external_id(participant.external_id),
                )
                .await?
            {
                Ok(Some(user)) => return Ok(vec![user]),
                Ok(None) => {}
                Err(e) => warn!(external_id = participant.external_id, error = %e, "user lookup by external ID failed"),
            }
        }

        if let Some(username) = participant.username() {
            match ctx
                .within(
                    "user lookup by username",
                    self.records.user_by_username(username),
                )
                .await?
            {
                Ok(Some(user)) => return Ok(vec![user]),
                Ok(None) => {}
                Err(e) => warn!(username, error = %e, "user lookup by username failed"),
            }
        }

        if let Some(email) = participant.email() {
            match ctx
                .within("user lookup by email", self.records.users_by_email(email))
                .await?
            {
                Ok(users) => return Ok(users),
                Err(e) => warn!(error = %e, "user lookup by email failed"),
            }
        }

        Ok(Vec::new())
    }

    async fn evaluate_user(
        &self,
        ctx: &RequestContext,
        cla_group_id: &str,
        user: &InternalUser,
        participant: &Participant,
    ) -> Result<SignatureStatus, GateError> {
        let user_id = user.user_id.as_str();

        match ctx
            .within(
                "individual signature lookup",
                self.records.individual_signature(cla_group_id, user_id),
            )
            .await?
        {
            Ok(Some(icla)) if icla.is_effective() => {
                debug!(user_id, signature_id = %icla.signature_id, "ICLA on file");
                return Ok(SignatureStatus::Signed {
                    user_id: user_id.to_string(),
                });
            }
            Ok(_) => debug!(user_id, "no ICLA on file"),
            Err(e) => {
                warn!(user_id, error = %e, "ICLA lookup failed");
                return Ok(SignatureStatus::Missing(Classification::MissingId));
            }
        }

        let Some(company_id) = user.company_id() else {
            return Ok(SignatureStatus::Missing(
                Classification::MissingCompanyAffiliation,
            ));
        };

        match ctx
            .within("company lookup", self.records.company(company_id))
            .await?
        {
            Ok(Some(company)) => debug!(company_id, company_name = %company.company_name, "company loaded"),
            Ok(None) => {
                warn!(user_id, company_id, "affiliated company does not exist");
                return Ok(SignatureStatus::Missing(Classification::CompanyLookupFailed));
            }
            Err(e) => {
                warn!(user_id, company_id, error = %e, "company lookup failed");
                return Ok(SignatureStatus::Missing(Classification::CompanyLookupFailed));
            }
        }

        let ccla = match ctx
            .within(
                "corporate signature lookup",
                self.records.corporate_signature(cla_group_id, company_id),
            )
            .await?
        {
            Ok(Some(ccla)) if ccla.is_effective() => ccla,
            Ok(_) => return Ok(SignatureStatus::Missing(Classification::MissingCcla)),
            Err(e) => {
                warn!(company_id, cla_group_id, error = %e, "CCLA lookup failed");
                return Ok(SignatureStatus::Missing(Classification::MissingCcla));
            }
        };

        if !self
            .matcher
            .is_approved(ctx, &ccla, user, participant)
            .await?
        {
            return Ok(SignatureStatus::Missing(Classification::MissingApproval));
        }

        let Some(criteria) = ApprovalCriteria::for_identity(participant.email(), participant.username())
        else {
            return Ok(SignatureStatus::Missing(
                Classification::MissingAcknowledgment,
            ));
        };

        match ctx
            .within(
                "employee signature lookup",
                self.records
                    .employee_signatures(company_id, cla_group_id, &criteria),
            )
            .await?
        {
            Ok(acknowledgments) if !acknowledgments.is_empty() => {
                debug!(user_id, company_id, "employee acknowledgment on file");
                Ok(SignatureStatus::Signed {
                    user_id: user_id.to_string(),
                })
            }
            Ok(_) => Ok(SignatureStatus::Missing(
                Classification::MissingAcknowledgment,
            )),
            Err(e) => {
                warn!(user_id, company_id, error = %e, "employee acknowledgment lookup failed");
                Ok(SignatureStatus::Missing(
                    Classification::MissingAcknowledgment,
                ))
            }
        }
    }
}
