//! PtSol Automation Keeper
//!
//! Off-chain service that plays the scheduler: it holds task registrations,
//! re-invokes the engine with `Resume` when they fall due, and reports stuck
//! tasks and vault divergence.

mod config;
mod driver;
mod priority_queue;
mod snapshot;
mod tx_builder;

use anyhow::{Context, Result};
use config::{Config, DEFAULT_CONFIG_PATH};
use driver::{wall_clock, Driver};
use priority_queue::TaskQueue;
use ptsol_pool::{MemoryStore, PoolEngine};
use snapshot::Snapshot;
use solana_program::clock::Clock;
use std::path::Path;
use std::time::Duration;
use tokio::time;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Some(path) = init_config_target(std::env::args().skip(1)) {
        return Config::write_default(&path);
    }

    log::info!("Starting PtSol Automation Keeper");

    let config = Config::load().unwrap_or_else(|e| {
        log::warn!("Failed to load config ({:#}), using default localnet config", e);
        Config::default_localnet()
    });

    let snapshot_path = config.snapshot_path();
    let (mut driver, mut slot) = open_driver(&config, &snapshot_path)?;
    log::info!("Program: {}", driver.engine().config().program_id);
    log::info!("Keeper identity: {}", driver.keeper());
    log::info!("Snapshot: {}", snapshot_path.display());

    let mut interval = time::interval(Duration::from_secs(config.poll_interval_secs));

    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = tokio::signal::ctrl_c() => {
                log::info!("Shutting down");
                break;
            }
        }

        slot += 1;
        let clock = wall_clock(slot);
        let report = driver.tick(&clock);

        if report.changed_state() {
            if let Err(e) = save(&driver, &snapshot_path, &clock) {
                log::error!("Error saving snapshot: {:#}", e);
            }
        }

        if let Err(e) = report.escalate() {
            log::error!("ALERT: halting keeper: {}", e);
            return Err(e).context("Fatal engine error");
        }

        if let Some(next) = driver.engine().scheduler().peek() {
            log::debug!("Queue size: {}, next trigger: {:?}", driver.engine().scheduler().len(), next.trigger);
        }
    }

    save(&driver, &snapshot_path, &wall_clock(slot))
}

/// `--init-config [path]`: write the default config instead of running
fn init_config_target(mut args: impl Iterator<Item = String>) -> Option<String> {
    args.find(|arg| arg == "--init-config")?;
    Some(args.next().unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string()))
}

/// Restore ledger, registrations and the slot counter from the snapshot, or
/// start empty
fn open_driver(config: &Config, snapshot_path: &Path) -> Result<(Driver, u64)> {
    let (store, queue, slot) = match Snapshot::load(snapshot_path)? {
        Some(snapshot) => {
            log::info!(
                "Restored {} records and {} tasks (saved at {}, slot {})",
                snapshot.records.len(),
                snapshot.tasks.len(),
                snapshot.saved_at,
                snapshot.slot
            );
            let slot = snapshot.slot;
            let (store, queue) = snapshot.restore()?;
            (store, queue, slot)
        }
        None => {
            log::info!("No snapshot found, starting with an empty ledger");
            (MemoryStore::new(), TaskQueue::new(), 0)
        }
    };

    let engine = PoolEngine::new(config.engine.clone(), store, queue).context("Invalid engine configuration")?;
    Ok((Driver::new(engine, config.max_tasks_per_tick), slot))
}

fn save(driver: &Driver, path: &Path, clock: &Clock) -> Result<()> {
    let engine = driver.engine();
    Snapshot::capture(engine.store(), engine.scheduler(), clock.unix_timestamp, clock.slot).save(path)
}
