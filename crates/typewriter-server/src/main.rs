use anyhow::Context;
use clap::Parser;

use typewriter_server::logging::init_logging;
use typewriter_server::{run_server, AppConfig, ServerArgs};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let args = ServerArgs::parse();

    init_logging(args.debug, args.log_level.as_deref());

    let config = AppConfig::load(&args).context("Failed to load configuration")?;

    if args.debug {
        log::debug!("Debug mode enabled");
        log::debug!("Server configuration:");
        log::debug!("  Bind: {}", config.bind_address());
        log::debug!("  Cadence: {:?}", config.cadence);
        log::debug!("  Stream timeout: {:?}", config.stream_timeout);
        log::debug!("  Static dir: {:?}", config.static_dir);
    }

    run_server(config)
        .await
        .context("HTTP server exited with error")?;

    Ok(())
}
