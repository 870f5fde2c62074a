use crate::relay::{Relay, RelayOutput};
use crate::tools::{error_response, raw_json_response, text_stream_response};
use bytes::Bytes;
use common::proxy::Upstream;
use http::StatusCode;
use volo_http::{
    response::Response,
    server::route::{Router, post},
    utils::Extension,
};

async fn chat_handler(Extension(relay): Extension<Relay<Upstream>>, body: Bytes) -> Response {
    match relay.handle(&body).await {
        Ok(RelayOutput::Stream(deltas)) => text_stream_response(deltas),
        Ok(RelayOutput::Document(doc)) => raw_json_response(StatusCode::OK, doc),
        Err(err) => error_response(&err),
    }
}

pub fn chat_router() -> Router {
    Router::new().route("/api/chat", post(chat_handler))
}
