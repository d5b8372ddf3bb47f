//! Export proxy server.
//!
//! ```sh
//! export SALESFORCE_USERNAME=user@example.com
//! export SALESFORCE_PASSWORD=secret
//! export SALESFORCE_USER_TOKEN=token   # optional
//! cargo run --bin sf-export-proxy
//! ```
//!
//! `RUST_LOG` overrides the log filter; `DEBUG` raises the default to `debug`.

use std::process::ExitCode;

use busbar_sf_proxy::{serve, ProxyConfig};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let config = match ProxyConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!();
            eprintln!("  Set SALESFORCE_USERNAME and SALESFORCE_PASSWORD (and SALESFORCE_USER_TOKEN");
            eprintln!("  if the org requires one), then start the proxy again.");
            return ExitCode::FAILURE;
        }
    };

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.default_log_filter())),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = serve(config).await {
        tracing::error!(error = %e, "Proxy stopped with an error");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
