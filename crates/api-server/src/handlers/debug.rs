//! Operator diagnostics: a one-shot gateway probe and an environment report.
//! Neither response ever contains the credential itself.

use crate::tools::{describe_secret, envelope_response, json_response};
use bytes::Bytes;
use chrono::{SecondsFormat, Utc};
use common::config::{RelayConfig, RelayMode};
use common::data::ErrorEnvelope;
use common::error::Error as UpstreamError;
use common::proxy::GatewayAdapter;
use faststr::FastStr;
use http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};
use volo_http::{
    response::Response,
    server::route::{Router, get, post},
    utils::Extension,
};

#[derive(Debug, Clone)]
pub struct Diagnostics {
    gateway:  Arc<GatewayAdapter>,
    mode:     RelayMode,
    rag_base: FastStr,
}

impl Diagnostics {
    pub fn new(config: &RelayConfig, client: reqwest::Client) -> Self {
        Self {
            gateway:  Arc::new(GatewayAdapter::new(client, config.gateway.clone())),
            mode:     config.mode,
            rag_base: config.rag.api_base.clone(),
        }
    }

    fn key_status(&self) -> KeyStatus {
        let (exists, length) = describe_secret(self.gateway.config().api_key.as_deref());
        KeyStatus { exists, length }
    }
}

#[derive(Debug, Deserialize)]
struct ProbeRequest {
    message: FastStr,
}

#[derive(Debug, Serialize)]
struct KeyStatus {
    exists: bool,
    length: usize,
}

#[derive(Debug, Serialize)]
struct DebugInfo {
    timestamp: String,
    step:      &'static str,
    api_key:   KeyStatus,
}

#[derive(Debug, Serialize)]
struct ProbeReport {
    success:    bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message:    Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error:      Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    upstream:   Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    details:    Option<FastStr>,
    debug_info: DebugInfo,
}

impl ProbeReport {
    fn failed(error: String, details: Option<FastStr>, debug_info: DebugInfo) -> Self {
        Self {
            success: false,
            message: None,
            error: Some(error),
            upstream: None,
            details,
            debug_info,
        }
    }
}

async fn gateway_probe_handler(
    Extension(diagnostics): Extension<Diagnostics>,
    body: Bytes,
) -> Response {
    let req: ProbeRequest = match serde_json::from_slice(&body) {
        Ok(req) => req,
        Err(e) => {
            return envelope_response(
                StatusCode::BAD_REQUEST,
                &ErrorEnvelope::with_details("Malformed request body", e.to_string()),
            );
        }
    };
    let debug_info = |step: &'static str| DebugInfo {
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        step,
        api_key: diagnostics.key_status(),
    };

    info!(message_len = req.message.len(), "gateway probe started");
    let (status, report) = match diagnostics.gateway.probe(&req.message).await {
        Ok(upstream) => (
            StatusCode::OK,
            ProbeReport {
                success: true,
                message: Some("Gateway test successful"),
                error: None,
                upstream: Some(upstream),
                details: None,
                debug_info: debug_info("success"),
            },
        ),
        Err(e @ UpstreamError::Configuration(_)) => (
            StatusCode::BAD_REQUEST,
            ProbeReport::failed(e.to_string(), None, debug_info("start")),
        ),
        Err(UpstreamError::Upstream { status, body }) => (
            StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY),
            ProbeReport::failed(
                format!("Upstream API error: {status}"),
                Some(body),
                debug_info("error"),
            ),
        ),
        Err(e) => {
            warn!("gateway probe failed: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                ProbeReport::failed(
                    "Test failed".to_owned(),
                    Some(e.to_string().into()),
                    debug_info("making_request"),
                ),
            )
        }
    };
    json_response(status, &report)
}

#[derive(Debug, Serialize)]
struct EnvReport {
    mode:          &'static str,
    api_key:       KeyStatus,
    gateway_base:  FastStr,
    gateway_model: FastStr,
    rag_base:      FastStr,
}

async fn env_handler(Extension(diagnostics): Extension<Diagnostics>) -> Response {
    let config = diagnostics.gateway.config();
    let report = EnvReport {
        mode:          diagnostics.mode.as_str(),
        api_key:       diagnostics.key_status(),
        gateway_base:  config.api_base.clone(),
        gateway_model: config.model.clone(),
        rag_base:      diagnostics.rag_base.clone(),
    };
    json_response(StatusCode::OK, &report)
}

pub fn debug_router() -> Router {
    Router::new()
        .route("/api/debug/gateway", post(gateway_probe_handler))
        .route("/api/debug/env", get(env_handler))
}
