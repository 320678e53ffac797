//! Axum middleware feeding the recorder from every inbound request.
//!
//! ```ignore
//! let app = Router::new()
//!     .route("/api/order", post(place_order))
//!     .layer(axum::middleware::from_fn_with_state(recorder, track_requests));
//! ```

use std::sync::Arc;

use axum::{
    body::{Body, HttpBody},
    extract::{Request, State},
    http::{header, HeaderValue},
    middleware::Next,
    response::Response,
};
use futures_util::StreamExt;

use crate::recorder::EventRecorder;

/// Count the request by method on entry; record its latency once the
/// response body has been fully sent.
///
/// The latency guard rides inside the response body, so it fires when the
/// last chunk is written, and also when the handler errors or the client
/// disconnects and the body is dropped.
pub async fn track_requests(
    State(recorder): State<Arc<EventRecorder>>,
    req: Request,
    next: Next,
) -> Response {
    let timer = recorder.begin_request(req.method().as_str());
    let (mut parts, body) = next.run(req).await.into_parts();

    let exact = body.size_hint().exact();
    if exact == Some(0) {
        drop(timer);
        return Response::from_parts(parts, body);
    }
    // The wrapped stream has no exact size; keep the length framing.
    if let Some(len) = exact {
        parts
            .headers
            .entry(header::CONTENT_LENGTH)
            .or_insert_with(|| HeaderValue::from(len));
    }

    let stream = body.into_data_stream().map(move |chunk| {
        let _held = &timer;
        chunk
    });
    Response::from_parts(parts, Body::from_stream(stream))
}
