pub use common::logging_stdout;
use handlers::Diagnostics;
use relay::Relay;
use std::net::SocketAddr;
use tracing::{error, info};
use volo_http::Address;
use volo_http::server::{Router, Server};
use volo_http::utils::Extension;

pub mod error;
pub mod handlers;
pub mod relay;
pub mod requests;
pub mod tools;

pub use common::proxy::Upstream;

pub async fn run_api_server(addr: SocketAddr, relay: Relay<Upstream>, diagnostics: Diagnostics) {
    info!(%addr, upstream = relay.upstream_name(), "relay listening");
    let app = Router::new()
        .merge(handlers::chat_router())
        .merge(handlers::debug_router())
        .layer(Extension(relay))
        .layer(Extension(diagnostics));
    let addr = Address::from(addr);
    if let Err(e) = Server::new(app).run(addr).await {
        error!("relay server stopped: {e}");
    }
}
