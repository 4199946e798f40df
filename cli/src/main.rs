mod commands;
mod config;
mod logging;
mod monitor;
mod pushover;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "em", version, about = "Elite Dangerous journal monitor")]
struct Cli {
    /// Config file (defaults to <config_dir>/elite-monitor/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Follow the newest journal in the directory
    MonitorLatest,
    /// Follow each configured commander's newest journal
    Monitor,
    /// Decode every journal once and print event totals
    ParseAll,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init_logging(cli.debug);

    let result = match config::load(cli.config.as_deref()) {
        Ok(config) => match cli.command {
            Commands::MonitorLatest => commands::monitor_latest(config).await,
            Commands::Monitor => commands::monitor_commanders(config).await,
            Commands::ParseAll => commands::parse_all(config).await,
        },
        Err(e) => Err(e.into()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "em failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_command_line() {
        let cli = Cli::try_parse_from(["em", "--config", "/tmp/em.toml", "--debug", "monitor"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/em.toml")));
        assert!(cli.debug);
        assert!(matches!(cli.command, Commands::Monitor));

        let cli = Cli::try_parse_from(["em", "parse-all"]).unwrap();
        assert_eq!(cli.config, None);
        assert!(matches!(cli.command, Commands::ParseAll));

        assert!(Cli::try_parse_from(["em", "monitor-latest"]).is_ok());
        assert!(Cli::try_parse_from(["em"]).is_err());
    }
}
