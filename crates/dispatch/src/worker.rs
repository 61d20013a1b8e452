//! The inbound pipeline: validate, extract, route, execute, normalize.

use std::time::Instant;

use {
    ebworker_config::EbWorkerConfig,
    tracing::{debug, info, warn},
};

#[cfg(feature = "metrics")]
use ebworker_metrics::{counter, histogram, labels, worker as worker_metrics};

use crate::{
    Error, HandlerRegistry, InboundRequest, OriginPolicy, Result, RouterTable, WorkerResponse,
    extract::extract, normalize::normalize, pipeline::execute,
};

/// Default route the daemon posts to.
pub const DEFAULT_PATH: &str = "/internal/worker";

/// Stateless across requests; share it as `Arc<Worker>`.
pub struct Worker {
    policy: OriginPolicy,
    router: RouterTable,
    path: String,
}

impl Worker {
    pub fn new(policy: OriginPolicy, router: RouterTable) -> Self {
        Self {
            policy,
            router,
            path: DEFAULT_PATH.to_string(),
        }
    }

    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Build from config, resolving every message route against `handlers`.
    pub fn from_config(config: &EbWorkerConfig, handlers: &HandlerRegistry) -> Result<Self> {
        let router = RouterTable::build(&config.messages, handlers)?;
        Ok(Self::new(OriginPolicy::from_config(&config.worker), router)
            .with_path(config.worker.path.clone()))
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn router(&self) -> &RouterTable {
        &self.router
    }

    /// Process one delivery.
    ///
    /// Rejected, unroutable and failed deliveries come back as errors; see
    /// [`Error::kind`] for how they map to responses.
    pub async fn handle(&self, request: InboundRequest) -> Result<WorkerResponse> {
        if let Err(e) = self.policy.check(request.remote_addr, request.user_agent()) {
            warn!(remote = %request.remote_addr, error = %e, "rejected delivery");
            #[cfg(feature = "metrics")]
            counter!(worker_metrics::REJECTED_TOTAL, labels::REASON => reject_reason(&e)).increment(1);
            return Err(e);
        }

        let ctx = extract(&request)?;
        #[cfg(feature = "metrics")]
        counter!(
            worker_metrics::DELIVERIES_TOTAL,
            labels::KIND => ctx.kind.as_str(),
            labels::MESSAGE => ctx.message_name.clone()
        )
        .increment(1);

        let chain = match self.router.resolve(&ctx.message_name) {
            Ok(chain) => chain,
            Err(e) => {
                warn!(message = %ctx.message_name, "no handlers mapped");
                #[cfg(feature = "metrics")]
                counter!(worker_metrics::UNMAPPED_TOTAL, labels::MESSAGE => ctx.message_name.clone())
                    .increment(1);
                return Err(e);
            },
        };
        debug!(message = %ctx.message_name, handlers = chain.len(), "dispatching");

        let started = Instant::now();
        let result = execute(chain, &ctx).await;
        let elapsed = started.elapsed();

        #[cfg(feature = "metrics")]
        histogram!(worker_metrics::DISPATCH_DURATION_SECONDS, labels::MESSAGE => ctx.message_name.clone())
            .record(elapsed.as_secs_f64());

        match result {
            Ok(response) => {
                let response = normalize(response);
                info!(
                    message = %ctx.message_name,
                    kind = %ctx.kind,
                    status = response.status.as_u16(),
                    elapsed_ms = elapsed.as_millis(),
                    "handled delivery"
                );
                Ok(response)
            },
            Err(source) => {
                warn!(message = %ctx.message_name, error = %source, "handler chain failed");
                #[cfg(feature = "metrics")]
                counter!(worker_metrics::HANDLER_ERRORS_TOTAL, labels::MESSAGE => ctx.message_name.clone())
                    .increment(1);
                Err(Error::Handler {
                    message: ctx.message_name,
                    source,
                })
            },
        }
    }
}

#[cfg(feature = "metrics")]
fn reject_reason(error: &Error) -> &'static str {
    match error {
        Error::UntrustedOrigin { .. } => "origin",
        _ => "agent",
    }
}
