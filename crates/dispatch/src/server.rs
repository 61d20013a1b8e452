//! axum adapter for [`Worker`].

use std::{net::SocketAddr, sync::Arc};

use {
    axum::{
        Router,
        extract::{ConnectInfo, State},
        response::{IntoResponse, Response},
        routing::post,
    },
    bytes::Bytes,
    http::HeaderMap,
    tower_http::trace::TraceLayer,
    tracing::{error, warn},
};

use crate::{
    Error, ErrorKind, InboundRequest, Worker, WorkerResponse,
    normalize::tag,
};

/// Router serving `POST {worker.path()}`.
///
/// Serve it with `into_make_service_with_connect_info::<SocketAddr>()`; the
/// peer address is needed for origin checks.
pub fn worker_router(worker: Arc<Worker>) -> Router {
    let path = worker.path().to_string();
    Router::new()
        .route(&path, post(handle_delivery))
        .layer(TraceLayer::new_for_http())
        .with_state(worker)
}

async fn handle_delivery(
    State(worker): State<Arc<Worker>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request = InboundRequest {
        remote_addr: addr.ip(),
        headers,
        body,
    };
    match worker.handle(request).await {
        Ok(response) => response.into_response(),
        Err(e) => e.into_response(),
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let kind = self.kind();
        match kind {
            ErrorKind::Handler | ErrorKind::Configuration => {
                error!(error = %self, "delivery failed");
            },
            ErrorKind::Validation | ErrorKind::BadRequest => {
                warn!(error = %self, "delivery refused");
            },
        }
        tag(WorkerResponse::text(kind.status(), self.to_string())).into_response()
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, http::StatusCode};

    #[test]
    fn errors_render_tagged_with_kind_status() {
        let response = Error::unmapped("order.paid").into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.headers()["x-handled-by"], "ebworker");

        let response = Error::MissingMessageName.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = Error::UnexpectedAgent {
            agent: "curl".into(),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}
