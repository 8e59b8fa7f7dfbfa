//! lifeboat binary: operator CLI and the HTTP serving mode
//!
//! Log output goes through tracing; `RUST_LOG` overrides the default
//! `info` filter.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();

    if let Err(e) = lifeboat::cli::run().await {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
