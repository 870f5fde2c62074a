use super::{UpstreamAdapter, UpstreamReply};
use crate::data::{ChatCompletionsData, LegalChatRequest, RequestData};
use crate::error::{Error, Result};
use crate::text::preview;
use faststr::FastStr;
use futures_util::StreamExt;
use serde_json::Value;
use tracing::{info, warn};

pub const LEGAL_SYSTEM_PROMPT: &str = "あなたは法務AI アシスタントです。日本の法律に関する質問に正確で分かりやすく回答してください。以下の点に注意してください：

1. 正確な法的情報を提供する
2. 複雑な内容も分かりやすく説明する
3. 必要に応じて具体例を示す
4. 不明確な場合は専門家への相談を推奨する
5. 常に丁寧で親しみやすい口調で回答する

回答は日本語で行ってください。";

const PROBE_SYSTEM_PROMPT: &str = "あなたは法務AIアシスタントです。日本語で回答してください。";

pub const DEFAULT_GATEWAY_BASE: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_GATEWAY_MODEL: &str = "anthropic/claude-3.5-sonnet";
const APP_TITLE: &str = "Legal AI Chat";

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub api_base:     FastStr,
    pub api_key:      Option<FastStr>,
    pub model:        FastStr,
    /// Sent as `HTTP-Referer` so the gateway can attribute traffic.
    pub site_url:     FastStr,
    pub temperature:  f64,
    pub max_tokens:   u32,
    pub probe_tokens: u32,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            api_base:     DEFAULT_GATEWAY_BASE.into(),
            api_key:      None,
            model:        DEFAULT_GATEWAY_MODEL.into(),
            site_url:     "http://localhost:3000".into(),
            temperature:  0.3,
            max_tokens:   2000,
            probe_tokens: 100,
        }
    }
}

/// Streaming chat completions against an OpenAI-compatible gateway.
#[derive(Debug, Clone)]
pub struct GatewayAdapter {
    client: reqwest::Client,
    config: GatewayConfig,
}

impl GatewayAdapter {
    pub fn new(client: reqwest::Client, config: GatewayConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// One non-streaming completion for a single user message, returning the
    /// gateway's JSON as-is.
    pub async fn probe(&self, message: &str) -> Result<Value> {
        let mut data = ChatCompletionsData::with_system_prompt(
            self.config.model.clone(),
            PROBE_SYSTEM_PROMPT,
            &[crate::messages::ChatMessage::user(message.to_owned())],
        );
        data.temperature = Some(self.config.temperature);
        data.max_tokens = Some(self.config.probe_tokens);
        data.stream = false;

        let res = self.prepare(data)?.into_builder(&self.client).send().await?;
        let res = check_status(res).await?;
        Ok(res.json().await?)
    }

    fn prepare(&self, data: ChatCompletionsData) -> Result<RequestData> {
        let key = self
            .config
            .api_key
            .as_ref()
            .filter(|k| !k.is_empty())
            .ok_or(Error::Configuration("API key"))?;
        let url = format!("{}/chat/completions", self.config.api_base.trim_end_matches('/'));
        Ok(RequestData::new(url, serde_json::to_value(data)?)
            .with_bearer(key)
            .with_header("HTTP-Referer", self.config.site_url.clone())
            .with_header("X-Title", APP_TITLE))
    }
}

impl UpstreamAdapter for GatewayAdapter {
    fn name(&self) -> &'static str {
        "gateway"
    }

    async fn dispatch(&self, request: &LegalChatRequest) -> Result<UpstreamReply> {
        let mut data = ChatCompletionsData::with_system_prompt(
            self.config.model.clone(),
            LEGAL_SYSTEM_PROMPT,
            &request.messages,
        );
        data.temperature = Some(self.config.temperature);
        data.max_tokens = Some(self.config.max_tokens);
        data.stream = true;

        let request_data = self.prepare(data)?;
        info!(url = %request_data.url, model = %self.config.model, "calling gateway");
        let res = request_data.into_builder(&self.client).send().await?;
        let res = check_status(res).await?;
        Ok(UpstreamReply::Stream(Box::pin(
            res.bytes_stream().map(|chunk| chunk.map_err(Error::from)),
        )))
    }
}

/// Turns a non-2xx response into `Error::Upstream` carrying the raw body.
pub(crate) async fn check_status(res: reqwest::Response) -> Result<reqwest::Response> {
    let status = res.status();
    info!(status = status.as_u16(), "upstream responded");
    if status.is_success() {
        return Ok(res);
    }
    let body = res.text().await.unwrap_or_default();
    warn!(status = status.as_u16(), body = preview(&body, 200), "upstream rejected request");
    Err(Error::Upstream {
        status: status.as_u16(),
        body:   body.into(),
    })
}
