//! JSON snapshot of the ledger and the live registrations
//!
//! The keeper is the only writer while it runs; the snapshot is rewritten
//! through a temporary file and renamed into place.

use crate::priority_queue::TaskQueue;
use anyhow::{Context, Result};
use ptsol_common::pubkey_str;
use ptsol_pool::{MemoryStore, Record, ScheduledTask};
use serde::{Deserialize, Serialize};
use solana_program::pubkey::Pubkey;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord {
    #[serde(with = "pubkey_str")]
    pub address: Pubkey,
    pub record: Record,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Unix time of the tick that produced it
    pub saved_at: i64,
    /// Last keeper tick; the slot counter resumes from here
    #[serde(default)]
    pub slot: u64,
    pub records: Vec<StoredRecord>,
    pub tasks: Vec<ScheduledTask>,
}

impl Snapshot {
    pub fn capture(store: &MemoryStore, queue: &TaskQueue, saved_at: i64, slot: u64) -> Self {
        Self {
            saved_at,
            slot,
            records: store
                .snapshot()
                .into_iter()
                .map(|(address, record)| StoredRecord { address, record })
                .collect(),
            tasks: queue.tasks(),
        }
    }

    pub fn restore(self) -> Result<(MemoryStore, TaskQueue)> {
        let store = MemoryStore::from_records(self.records.into_iter().map(|r| (r.address, r.record)));
        let queue = TaskQueue::from_tasks(self.tasks).context("Snapshot holds a duplicate task registration")?;
        Ok((store, queue))
    }

    /// `Ok(None)` when no snapshot has been written yet
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let bytes = std::fs::read(path)
            .context(format!("Failed to read snapshot {}", path.display()))?;
        let snapshot = serde_json::from_slice(&bytes)
            .context(format!("Failed to parse snapshot {}", path.display()))?;
        Ok(Some(snapshot))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)
                .context(format!("Failed to create {}", dir.display()))?;
        }

        let json = serde_json::to_vec_pretty(self).context("Failed to serialize snapshot")?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json)
            .context(format!("Failed to write {}", tmp.display()))?;
        std::fs::rename(&tmp, path)
            .context(format!("Failed to move snapshot into {}", path.display()))?;

        log::debug!(
            "Saved snapshot: {} records, {} tasks -> {}",
            self.records.len(),
            self.tasks.len(),
            path.display()
        );
        Ok(())
    }
}
