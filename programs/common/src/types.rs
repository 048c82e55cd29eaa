//! Value types shared between the engine, the instruction codec and the keeper

use crate::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};
use solana_program::clock::Clock;

/// Maximum length of a caller-chosen task identifier (one PDA seed)
pub const MAX_TASK_ID_LEN: usize = 32;

/// Caller-chosen name of a deferred task, e.g. `staking_thread_1700000000`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Vec<u8>", into = "Vec<u8>")]
pub struct TaskId(Vec<u8>);

impl TaskId {
    pub fn new(bytes: impl Into<Vec<u8>>) -> EngineResult<Self> {
        let bytes = bytes.into();
        if bytes.is_empty() || bytes.len() > MAX_TASK_ID_LEN {
            return Err(EngineError::ConfigurationError(format!(
                "task identifier must be 1..={} bytes, got {}",
                MAX_TASK_ID_LEN,
                bytes.len()
            )));
        }
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl TryFrom<Vec<u8>> for TaskId {
    type Error = EngineError;

    fn try_from(bytes: Vec<u8>) -> EngineResult<Self> {
        Self::new(bytes)
    }
}

impl From<TaskId> for Vec<u8> {
    fn from(id: TaskId) -> Self {
        id.0
    }
}

impl AsRef<[u8]> for TaskId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl core::fmt::Display for TaskId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.0))
    }
}

/// When a deferred task becomes eligible for re-invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Trigger {
    /// Eligible as soon as the scheduler picks it up
    Immediate,
    /// Eligible once the cluster unix timestamp reaches this value
    Timestamp(i64),
    /// Eligible once the cluster slot reaches this value
    Slot(u64),
}

impl Trigger {
    pub fn is_due(&self, clock: &Clock) -> bool {
        match *self {
            Trigger::Immediate => true,
            Trigger::Timestamp(ts) => clock.unix_timestamp >= ts,
            Trigger::Slot(slot) => clock.slot >= slot,
        }
    }

    /// Ordering key for time-ordered queues. Slot triggers order after all
    /// timestamps, since the two clocks are not comparable.
    pub fn sort_key(&self) -> (u8, i64) {
        match *self {
            Trigger::Immediate => (0, i64::MIN),
            Trigger::Timestamp(ts) => (1, ts),
            Trigger::Slot(slot) => (2, i64::try_from(slot).unwrap_or(i64::MAX)),
        }
    }
}

/// Serialize pubkeys as base58 strings in human-edited config files
pub mod pubkey_str {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};
    use solana_program::pubkey::Pubkey;
    use std::str::FromStr;

    pub fn serialize<S: Serializer>(key: &Pubkey, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&key.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Pubkey, D::Error> {
        let s = String::deserialize(deserializer)?;
        Pubkey::from_str(&s).map_err(D::Error::custom)
    }
}
