use einvoice::{app, config::Config, logging};

/// Main entry point for the web application
///
/// Reads configuration from the environment (see `config`) and serves the
/// invoice and market reports until interrupted.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init();

    let config = Config::load()?;
    log::info!(
        "Starting web server on {} against {}",
        config.bind_addr,
        config.api_base_url
    );
    app::run(config).await
}
