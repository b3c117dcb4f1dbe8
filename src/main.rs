use anyhow::Result;
use clap::Parser;
use tabshelf::cli::{self, Cli};
use tabshelf::debug;
use tokio::runtime::Runtime;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match cli::load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("tabshelf: error: {e:#}");
            std::process::exit(2);
        }
    };

    // CLI --log-level flag takes highest precedence, then RUST_LOG, then config.
    let rust_log = std::env::var("RUST_LOG").ok();
    let level = debug::resolve_level(cli.log_level, rust_log.as_deref(), config.log_level);
    debug::init_log_bridge(level);

    log::info!("Starting tabshelf {}", tabshelf::VERSION);

    let runtime = Runtime::new()?;
    let result = runtime.block_on(cli::run(cli, config));
    runtime.shutdown_timeout(std::time::Duration::from_secs(2));

    if let Err(e) = result {
        log::error!("Command failed: {e:#}");
        eprintln!("tabshelf: error: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
