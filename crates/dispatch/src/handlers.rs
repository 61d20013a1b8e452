//! Built-in handlers.

use async_trait::async_trait;

use crate::{Handler, Next, RequestContext, WorkerResponse};

/// Acknowledges the delivery without running the rest of the chain, so the
/// daemon deletes the message. Map a message to it to drop it.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentFailing;

impl SilentFailing {
    pub const NAME: &'static str = "silent-failing";
}

#[async_trait]
impl Handler for SilentFailing {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn process(&self, ctx: &RequestContext, _next: Next<'_>) -> anyhow::Result<WorkerResponse> {
        tracing::debug!(message = %ctx.message_name, "dropping delivery");
        Ok(WorkerResponse::ok())
    }
}
