//! # Threadloom
//!
//! ## Usage
//!
//! ```bash
//! # Load a dataset and checkpoint the registry
//! threadloom load --dataset data/ --snapshot snap/
//!
//! # Inspect the snapshot
//! threadloom status --snapshot snap/
//! threadloom lookup --snapshot snap/ --id 1243174595542294528
//!
//! # Serve it
//! threadloom serve --snapshot snap/ --port 8080
//! ```

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    // THREADLOOM_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("THREADLOOM_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "threadloom=info,threadloom_core=info,tower_http=debug".into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    let cli = threadloom::cli::Cli::parse();

    if !cli.quiet && !cli.json_mode {
        print_banner();
    }

    if let Err(e) = threadloom::cli::execute(cli).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

fn print_banner() {
    println!(
        r#"
  threadloom v{}

  reply, quote and retweet threads from collected posts
"#,
        env!("CARGO_PKG_VERSION")
    );
}
