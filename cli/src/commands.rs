use std::time::{Duration, Instant};

use elite_core::journal::{
    CommanderRegistry, CommanderSubscription, ContainerWatcher, JournalWatcher, OfflineSummary,
    WatchUpdate, replay_directory,
};
use elite_core::WatchError;
use elite_types::MonitorConfig;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{error, info};

use crate::config::{self, ConfigError};
use crate::monitor::CarrierMonitor;

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Watch(#[from] WatchError),

    #[error("background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

fn poll_interval(config: &MonitorConfig) -> Duration {
    Duration::from_millis(config.poll_interval_ms)
}

/// Follow the newest journal in the directory until interrupted.
pub async fn monitor_latest(config: MonitorConfig) -> Result<(), CommandError> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let _watcher =
        JournalWatcher::spawn_latest(&config.journal_directory, poll_interval(&config), tx)?;
    let mut monitor = CarrierMonitor::new("latest", &config);
    info!(directory = %config.journal_directory.display(), "Monitoring latest journal");

    loop {
        let update = tokio::select! {
            _ = tokio::signal::ctrl_c() => return Ok(()),
            update = rx.recv() => update,
        };
        match update {
            Some(WatchUpdate::Batch(batch)) => monitor.on_batch(batch),
            Some(WatchUpdate::Error(e)) => return Err(e.into()),
            None => return Ok(()),
        }
    }
}

/// One monitor per configured commander, each bound to that commander's
/// newest journal.
pub async fn monitor_commanders(config: MonitorConfig) -> Result<(), CommandError> {
    let commanders = config::commanders(&config)?.to_vec();
    let registry = CommanderRegistry::new(poll_interval(&config));

    let mut tasks = JoinSet::new();
    for commander in &commanders {
        let subscription = registry.subscribe(commander);
        let monitor = CarrierMonitor::new(commander.as_str(), &config);
        tasks.spawn(follow_commander(subscription, monitor));
    }

    let _container = ContainerWatcher::spawn(
        &config.journal_directory,
        commanders,
        poll_interval(&config),
        registry,
    )?;
    info!(directory = %config.journal_directory.display(), "Monitoring commander journals");

    loop {
        let joined = tokio::select! {
            _ = tokio::signal::ctrl_c() => return Ok(()),
            joined = tasks.join_next() => joined,
        };
        match joined {
            Some(result) => result??,
            None => return Ok(()),
        }
    }
}

async fn follow_commander(
    mut subscription: CommanderSubscription,
    mut monitor: CarrierMonitor,
) -> Result<(), WatchError> {
    while let Some(update) = subscription.recv().await {
        match update {
            WatchUpdate::Batch(batch) => monitor.on_batch(batch),
            WatchUpdate::Error(e) => {
                error!(commander = subscription.commander(), error = %e, "Commander watch ended");
                return Err(e);
            }
        }
    }
    Ok(())
}

/// Decode every journal once and print per-event totals.
pub async fn parse_all(config: MonitorConfig) -> Result<(), CommandError> {
    let start = Instant::now();
    let directory = config.journal_directory.clone();
    let summary = tokio::task::spawn_blocking(move || replay_directory(&directory)).await??;
    print_summary(&summary, start.elapsed());
    Ok(())
}

fn print_summary(summary: &OfflineSummary, elapsed: Duration) {
    println!("Parsed: {} files in {:.2?}", summary.files, elapsed);
    println!(
        "Events: {}, decode errors: {}",
        summary.events, summary.decode_errors
    );
    for (name, count) in summary.ranked() {
        println!("{count:>10}  {name}");
    }
}
