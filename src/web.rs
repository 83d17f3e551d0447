#![cfg(not(tarpaulin_include))]

use clap::Parser;
use workorder_report::app;
use workorder_report::config::Config;

/// Main entry point for the work order report web application
///
/// Reads the configuration from flags and `REPORT_*` environment variables,
/// sets up logging (`RUST_LOG`, `info` by default) and serves the dashboard
/// until the process is stopped.
///
/// # Returns
/// * `Result<(), Box<dyn std::error::Error>>` - Success or error object
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::parse();
    app::run(config).await
}
