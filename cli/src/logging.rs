use tracing::Level;
use tracing_subscriber::filter::EnvFilter;

/// Initialize logging, writing to ELITE_MONITOR_LOG_PATH if set, otherwise stderr.
/// `RUST_LOG` overrides the default level.
pub fn init_logging(debug: bool) {
    let level = if debug { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    if let Ok(path) = std::env::var("ELITE_MONITOR_LOG_PATH") {
        if let Ok(file) = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
        {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(true)
                .with_ansi(false)
                .with_writer(file)
                .init();
            return;
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}
