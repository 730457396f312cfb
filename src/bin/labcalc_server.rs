//! labcalc API server binary
//!
//! Stateless HTTP front end to the recalculation engine.

use clap::Parser;
use labcalc::api::{run_api_server, server::ApiConfig};

#[derive(Parser, Debug)]
#[command(name = "labcalc-server")]
#[command(version)]
#[command(about = "labcalc API server - HTTP recalculation of lab test parameters")]
#[command(long_about = r#"
labcalc API server

Endpoints:
  - POST /api/v1/recalculate - Recalculate values and indicators
  - POST /api/v1/evaluate    - Evaluate one expression
  - GET  /health             - Health check
  - GET  /version            - Server version info
  - GET  /                   - API documentation

The server keeps no state between requests. Each request carries the
full snapshot of tests and gets back the recalculated copy plus
diagnostics.

Example usage:
  labcalc-server                           # Start on localhost:8080
  labcalc-server --host 0.0.0.0 --port 3000

  curl -X POST http://localhost:8080/api/v1/evaluate \
    -H "Content-Type: application/json" \
    -d '{"expression": "[TC] - [HDL]", "context": {"TC": 200, "HDL": 50}}'
"#)]
struct Args {
    /// Host address to bind to (use 0.0.0.0 for all interfaces)
    #[arg(short = 'H', long, default_value = "127.0.0.1", env = "LABCALC_HOST")]
    host: String,

    /// Port to listen on
    #[arg(short, long, default_value = "8080", env = "LABCALC_PORT")]
    port: u16,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "labcalc_server=info,labcalc=info,tower_http=info".into()),
        )
        .init();

    let args = Args::parse();

    let config = ApiConfig {
        host: args.host,
        port: args.port,
    };

    run_api_server(config).await
}
