use crate::error::{Error, Result};
use crate::proxy::{GatewayConfig, RagConfig};
use faststr::FastStr;
use std::fmt::Display;
use std::net::SocketAddr;
use std::str::FromStr;

pub const DEFAULT_RELAY_ADDR: &str = "0.0.0.0:3000";

/// Which upstream this relay process forwards to. One per deployment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RelayMode {
    #[default]
    Stream,
    Rag,
}

impl RelayMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelayMode::Stream => "stream",
            RelayMode::Rag => "rag",
        }
    }
}

impl Display for RelayMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RelayMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stream" | "gateway" => Ok(RelayMode::Stream),
            "rag" => Ok(RelayMode::Rag),
            other => Err(Error::InvalidConfig("RELAY_MODE", other.to_owned().into())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub addr:    SocketAddr,
    pub mode:    RelayMode,
    pub gateway: GatewayConfig,
    pub rag:     RagConfig,
}

impl RelayConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let addr = var("RELAY_ADDR").unwrap_or_else(|| DEFAULT_RELAY_ADDR.to_owned());
        let addr: SocketAddr = addr
            .parse()
            .map_err(|_| Error::InvalidConfig("RELAY_ADDR", addr.into()))?;
        let mode = match var("RELAY_MODE") {
            Some(mode) => mode.parse()?,
            None => RelayMode::default(),
        };

        let mut gateway = GatewayConfig {
            api_key: var("OPENROUTER_API_KEY").map(FastStr::from),
            ..Default::default()
        };
        if let Some(base) = var("GATEWAY_API_BASE") {
            gateway.api_base = base.into();
        }
        if let Some(model) = var("GATEWAY_MODEL") {
            gateway.model = model.into();
        }
        if let Some(site) = var("SITE_URL") {
            gateway.site_url = site.into();
        }

        let mut rag = RagConfig::default();
        if let Some(base) = var("RAG_API_BASE") {
            rag.api_base = base.into();
        }
        if let Some(docs) = var("RAG_MAX_CONTEXT_DOCS") {
            rag.max_context_docs = docs
                .parse::<u32>()
                .map_err(|_| Error::InvalidConfig("RAG_MAX_CONTEXT_DOCS", docs.into()))?;
        }

        Ok(Self {
            addr,
            mode,
            gateway,
            rag,
        })
    }
}
