use {
    ebworker_common::{HANDLED_BY_HEADER, HANDLED_BY_VALUE},
    http::{HeaderName, HeaderValue, StatusCode},
};

use crate::WorkerResponse;

/// Collapse any 2xx to 200 and tag the response.
///
/// The daemon deletes a message only on exactly 200.
#[must_use]
pub fn normalize(mut response: WorkerResponse) -> WorkerResponse {
    if response.status.is_success() {
        response.status = StatusCode::OK;
    }
    tag(response)
}

/// Add the `x-handled-by` header.
#[must_use]
pub fn tag(mut response: WorkerResponse) -> WorkerResponse {
    response.headers.insert(
        HeaderName::from_static(HANDLED_BY_HEADER),
        HeaderValue::from_static(HANDLED_BY_VALUE),
    );
    response
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    #[rstest]
    #[case(200, 200)]
    #[case(201, 200)]
    #[case(202, 200)]
    #[case(204, 200)]
    #[case(299, 200)]
    #[case(302, 302)]
    #[case(404, 404)]
    #[case(500, 500)]
    fn status_mapping(#[case] status: u16, #[case] expected: u16) {
        let response = WorkerResponse::with_status(StatusCode::from_u16(status).unwrap());
        assert_eq!(normalize(response).status.as_u16(), expected);
    }

    #[test]
    fn tags_response() {
        let response = normalize(WorkerResponse::with_status(StatusCode::NOT_FOUND));
        assert_eq!(response.header("x-handled-by"), Some("ebworker"));
    }

    #[test]
    fn keeps_body_and_headers() {
        let response = normalize(WorkerResponse::text(StatusCode::CREATED, "done"));
        assert_eq!(&response.body[..], b"done");
        assert_eq!(response.header("content-type"), Some("text/plain; charset=utf-8"));
    }
}
