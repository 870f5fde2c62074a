use anyhow::Result;
use api_server::relay::Relay;
use api_server::{Upstream, handlers::Diagnostics, tools::build_http_client};
use common::config::{RelayConfig, RelayMode};
use common::proxy::{GatewayAdapter, RagAdapter};
use dotenvy::dotenv;
use tracing::info;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenv().ok();
    let _guard = api_server::logging_stdout();

    let config = RelayConfig::from_env()?;
    let client = build_http_client()?;

    let upstream = match config.mode {
        RelayMode::Stream => {
            Upstream::Gateway(GatewayAdapter::new(client.clone(), config.gateway.clone()))
        }
        RelayMode::Rag => Upstream::Rag(RagAdapter::new(client.clone(), config.rag.clone())),
    };
    info!(mode = %config.mode, "relay configured");

    let diagnostics = Diagnostics::new(&config, client);
    api_server::run_api_server(config.addr, Relay::new(upstream), diagnostics).await;

    Ok(())
}
