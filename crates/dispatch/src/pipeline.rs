//! Sequential handler execution with explicit continuation.

use std::sync::Arc;

use async_trait::async_trait;

use crate::{RequestContext, WorkerResponse};

/// One step of a handler chain.
///
/// A handler either produces a response itself, which ends the chain, or
/// calls `next.run(ctx)` to continue with the remaining handlers and may then
/// adjust the response it gets back.
#[async_trait]
pub trait Handler: Send + Sync {
    /// Name the handler is registered and referenced under.
    fn name(&self) -> &str;

    async fn process(&self, ctx: &RequestContext, next: Next<'_>) -> anyhow::Result<WorkerResponse>;
}

/// The remainder of a handler chain.
#[derive(Clone, Copy)]
pub struct Next<'a> {
    remaining: &'a [Arc<dyn Handler>],
}

impl<'a> Next<'a> {
    pub fn new(chain: &'a [Arc<dyn Handler>]) -> Self {
        Self { remaining: chain }
    }

    /// Handlers that would still run.
    pub fn remaining(&self) -> usize {
        self.remaining.len()
    }

    /// Run the rest of the chain. Past the last handler this yields an empty
    /// 200.
    pub async fn run(self, ctx: &RequestContext) -> anyhow::Result<WorkerResponse> {
        match self.remaining.split_first() {
            Some((handler, rest)) => handler.process(ctx, Next::new(rest)).await,
            None => Ok(WorkerResponse::ok()),
        }
    }
}

/// Run `chain` for `ctx`.
pub async fn execute(
    chain: &[Arc<dyn Handler>],
    ctx: &RequestContext,
) -> anyhow::Result<WorkerResponse> {
    Next::new(chain).run(ctx).await
}
