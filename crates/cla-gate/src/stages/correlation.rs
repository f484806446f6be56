use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use cla_gate_types::ActiveMergeRequestRecord;
use tracing::debug;

use crate::config::CorrelationConfig;
use crate::context::RequestContext;
use crate::error::GateError;
use crate::traits::CorrelationStore;

/// Writes the active merge request record the signing flow reads back.
pub struct CorrelationRecorder {
    store: Arc<dyn CorrelationStore>,
    config: CorrelationConfig,
}

impl CorrelationRecorder {
    pub fn new(store: Arc<dyn CorrelationStore>, config: CorrelationConfig) -> Self {
        Self { store, config }
    }

    /// Store `record` under the author's username key, and under the email
    /// key when a real email is known.
    ///
    /// Returns the keys written, username key first. A failed write aborts
    /// without undoing earlier ones.
    pub async fn set_active_mr_metadata(
        &self,
        ctx: &RequestContext,
        record: &ActiveMergeRequestRecord,
    ) -> Result<Vec<String>, GateError> {
        let mut keys = vec![ActiveMergeRequestRecord::username_key(&record.author_username)];
        if !record.author_email.is_empty()
            && record.author_email != self.config.redaction_placeholder
        {
            keys.push(ActiveMergeRequestRecord::email_key(&record.author_email));
        }

        let value = serde_json::to_string(record)?;
        let expiry = (Utc::now() + ChronoDuration::days(self.config.ttl_days)).timestamp();

        for key in &keys {
            ctx.within("correlation write", self.store.put(key, expiry, &value))
                .await?
                .map_err(|source| GateError::CorrelationWriteFailed {
                    key: key.clone(),
                    source,
                })?;
            debug!(key = %key, expiry, "correlation record stored");
        }

        Ok(keys)
    }
}
