use crate::error::{Error, Result};
use bytes::Bytes;
use chrono::Timelike;
use common::data::ErrorEnvelope;
use common::error::StreamAborted;
use faststr::FastStr;
use futures_util::{Stream, StreamExt};
use http::{StatusCode, header};
use http_body::Frame;
use reqwest::Client as ReqwestClient;
use serde::Serialize;
use std::time::Duration;
use tracing::error;
use volo_http::{
    body::Body,
    response::Response,
    server::IntoResponse,
};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub const TEXT_PLAIN_UTF8: &str = "text/plain; charset=utf-8";

pub const UPSTREAM_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Longest silence tolerated between upstream reads, headers included.
pub const UPSTREAM_READ_TIMEOUT: Duration = Duration::from_secs(60);

#[inline]
pub fn build_http_client() -> Result<ReqwestClient> {
    build_http_client_with(UPSTREAM_READ_TIMEOUT)
}

pub fn build_http_client_with(read_timeout: Duration) -> Result<ReqwestClient> {
    ReqwestClient::builder()
        .connect_timeout(UPSTREAM_CONNECT_TIMEOUT)
        .read_timeout(read_timeout)
        .build()
        .map_err(|_| Error::FailedToBuildClient)
}

#[inline]
pub fn generate_request_id() -> FastStr {
    let now = chrono::Utc::now();
    format!("relay-{}-{}", now.timestamp(), now.nanosecond()).into()
}

pub fn json_response<T: Serialize>(status: StatusCode, value: &T) -> Response {
    let body = match serde_json::to_string(value) {
        Ok(body) => body,
        Err(e) => {
            error!("failed to serialize response body: {e}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };
    http::Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body))
        .unwrap_or_else(|e| {
            error!("failed to build json response: {e}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        })
}

/// Writes an already-encoded JSON body without touching its bytes.
pub fn raw_json_response(status: StatusCode, body: Bytes) -> Response {
    http::Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body))
        .unwrap_or_else(|e| {
            error!("failed to build json response: {e}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        })
}

pub fn error_response(err: &Error) -> Response {
    envelope_response(err.status(), &err.envelope())
}

pub fn envelope_response(status: StatusCode, envelope: &ErrorEnvelope) -> Response {
    json_response(status, envelope)
}

/// A `text/plain` body that writes each delta as its own frame. An `Err`
/// item aborts the body mid-flight.
pub fn text_stream_response<S>(deltas: S) -> Response
where
    S: Stream<Item = std::result::Result<Bytes, StreamAborted>> + Send + Sync + 'static,
{
    let frames = deltas.map(into_frame as fn(_) -> _);
    http::Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, TEXT_PLAIN_UTF8)
        .header(header::CACHE_CONTROL, "no-cache")
        .body(Body::from_stream(frames))
        .unwrap_or_else(|e| {
            error!("failed to build stream response: {e}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        })
}

fn into_frame(item: std::result::Result<Bytes, StreamAborted>) -> std::result::Result<Frame<Bytes>, BoxError> {
    item.map(Frame::data).map_err(BoxError::from)
}

/// Length-only view of a secret for diagnostics.
pub fn describe_secret(secret: Option<&str>) -> (bool, usize) {
    match secret {
        Some(s) if !s.is_empty() => (true, s.len()),
        _ => (false, 0),
    }
}
