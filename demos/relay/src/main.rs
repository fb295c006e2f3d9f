//! FERRY Relay Demo
//!
//! Three roles, one binary:
//!
//! - `ferry-relay upstream`: framed sink that acknowledges DATA frames
//! - `ferry-relay proxy`: accepts a client session and relays it upstream
//! - `ferry-relay client`: performs the handshake and sends a few frames
//!
//! Environment variables:
//! - `FERRY_LISTEN_ADDR`: proxy listen address (default 127.0.0.1:9000)
//! - `FERRY_UPSTREAM_ADDR`: upstream address (default 127.0.0.1:9001)
//! - `RUST_LOG`: log filter (default `info`)

mod client;
mod proxy;
mod upstream;

use std::net::SocketAddr;

fn env_addr(key: &str, default: &str) -> SocketAddr {
    std::env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .unwrap_or_else(|e| panic!("invalid {key}: {e}"))
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let role = std::env::args().nth(1).unwrap_or_default();
    let proxy_addr = env_addr("FERRY_LISTEN_ADDR", "127.0.0.1:9000");
    let upstream_addr = env_addr("FERRY_UPSTREAM_ADDR", "127.0.0.1:9001");

    let result = match role.as_str() {
        "upstream" => upstream::run(upstream_addr).await,
        "proxy" => proxy::run(proxy_addr, upstream_addr).await,
        "client" => client::run(proxy_addr).await,
        _ => {
            eprintln!("usage: ferry-relay <upstream|proxy|client>");
            std::process::exit(2);
        }
    };

    if let Err(e) = result {
        tracing::error!(error = %e, "{role} failed");
        std::process::exit(1);
    }
}
