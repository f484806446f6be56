use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

use crate::error::GateError;

/// Per-delivery request context.
///
/// Carries the correlation ID used in log fields and the deadline every
/// outbound call is bounded by. Created by the webhook handler from the
/// inbound request and threaded through the whole pipeline.
#[derive(Clone, Debug)]
pub struct RequestContext {
    request_id: String,
    deadline: Instant,
}

impl RequestContext {
    /// New context with a generated request ID.
    pub fn new(timeout: Duration) -> Self {
        Self::with_request_id(uuid::Uuid::new_v4().to_string(), timeout)
    }

    /// New context reusing the inbound request's ID.
    pub fn with_request_id(request_id: impl Into<String>, timeout: Duration) -> Self {
        Self {
            request_id: request_id.into(),
            deadline: Instant::now() + timeout,
        }
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Time left before the deadline (zero once passed).
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    /// Run an outbound call bounded by the deadline.
    ///
    /// The future is dropped, and with it the in-flight call, when the
    /// deadline passes first.
    pub async fn within<F>(&self, operation: &'static str, fut: F) -> Result<F::Output, GateError>
    where
        F: Future,
    {
        tokio::time::timeout_at(self.deadline, fut)
            .await
            .map_err(|_| GateError::DeadlineExceeded { operation })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn within_returns_output_before_deadline() {
        let ctx = RequestContext::with_request_id("req-1", Duration::from_secs(5));
        let value = ctx.within("fast", async { 7 }).await.unwrap();
        assert_eq!(value, 7);
        assert_eq!(ctx.request_id(), "req-1");
    }

    #[tokio::test(start_paused = true)]
    async fn within_fails_after_deadline() {
        let ctx = RequestContext::new(Duration::from_millis(10));
        let err = ctx
            .within("slow", tokio::time::sleep(Duration::from_secs(1)))
            .await
            .unwrap_err();
        assert!(matches!(err, GateError::DeadlineExceeded { operation: "slow" }));
    }

    #[tokio::test(start_paused = true)]
    async fn remaining_saturates_at_zero() {
        let ctx = RequestContext::new(Duration::from_millis(5));
        tokio::time::advance(Duration::from_millis(50)).await;
        assert_eq!(ctx.remaining(), Duration::ZERO);
    }
}
