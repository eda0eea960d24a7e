#![cfg(not(tarpaulin_include))]

use sheetviz::app;
use sheetviz::config::AppConfig;

/// Main entry point for the dashboard server
///
/// # Arguments
/// * `[bind_addr] [data_dir]` - Optional positional overrides of the environment
///
/// # Returns
/// * `Result<(), Box<dyn std::error::Error>>` - Success or error object
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = AppConfig::load();
    println!(
        "Starting dashboard on {} (data in {}, static files from {})",
        config.bind_addr,
        config.data_dir.display(),
        config.static_dir.display()
    );
    app::run(config).await
}
