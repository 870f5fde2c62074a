use faststr::FastStr;
use serde_json::Value;

/// One outbound JSON POST, assembled before any I/O so adapters can fail
/// early without touching the network.
#[derive(Debug)]
pub struct RequestData {
    pub url:     FastStr,
    pub headers: Vec<(&'static str, FastStr)>,
    pub body:    Value,
}

impl RequestData {
    pub fn new(url: impl Into<FastStr>, body: Value) -> Self {
        Self {
            url: url.into(),
            headers: Vec::new(),
            body,
        }
    }

    pub fn with_header(mut self, name: &'static str, value: impl Into<FastStr>) -> Self {
        self.headers.push((name, value.into()));
        self
    }

    pub fn with_bearer(self, token: &str) -> Self {
        self.with_header("authorization", format!("Bearer {token}"))
    }

    pub fn into_builder(self, client: &reqwest::Client) -> reqwest::RequestBuilder {
        self.headers
            .iter()
            .fold(client.post(self.url.as_str()), |builder, (name, value)| {
                builder.header(*name, value.as_str())
            })
            .json(&self.body)
    }
}
