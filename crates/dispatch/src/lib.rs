//! Inbound side of ebworker.
//!
//! A delivery from the queue daemon passes through origin validation,
//! attribute extraction, routing by message name, the mapped handler chain
//! and status normalization:
//!
//! ```rust,ignore
//! let mut handlers = HandlerRegistry::with_builtins();
//! handlers.register(Arc::new(SendWelcomeEmail::new(mailer)));
//! let worker = Arc::new(Worker::from_config(&config, &handlers)?);
//!
//! let app = worker_router(worker);
//! axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;
//! ```

pub mod context;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod normalize;
pub mod origin;
pub mod pipeline;
pub mod request;
pub mod router;
pub mod server;
pub mod worker;

pub use {
    context::{DeliveryKind, RequestContext},
    error::{Error, ErrorKind, Result},
    handlers::SilentFailing,
    origin::OriginPolicy,
    pipeline::{Handler, Next},
    request::{InboundRequest, WorkerResponse},
    router::{HandlerRegistry, RouterTable},
    server::worker_router,
    worker::Worker,
};
