//! Chained log entries and sealed chain exports.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    chain::{ChainId, Digest, EntryId},
    error::{BitacoraError, BitacoraResult},
    payload::Payload,
};

/// A single entry in a bitácora hash chain.
///
/// `hash` commits to `id`, `sequence_number`, `previous_hash`, and every
/// payload field. Changing any of them after the entry is chained breaks
/// `hash`, and removing or reordering entries breaks the next entry's
/// `previous_hash`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: EntryId,

    /// Position in the chain, starting at 0.
    pub sequence_number: u64,

    pub payload: Payload,

    /// `hash` of the previous entry, or `Digest::GENESIS` for entry 0.
    pub previous_hash: Digest,

    pub hash: Digest,
}

/// A sealed export of one chain.
///
/// Built from a single read of the store, so it is a consistent snapshot
/// even while the chain keeps growing. `terminal_hash` is a compact
/// commitment to the whole chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainSnapshot {
    pub chain_id: ChainId,

    /// All entries in chain order (sequence 0 first).
    pub entries: Vec<LogEntry>,

    pub exported_at: DateTime<Utc>,

    /// `hash` of the last entry. `None` for an empty chain.
    pub terminal_hash: Option<Digest>,
}

impl ChainSnapshot {
    pub fn new(chain_id: ChainId, entries: Vec<LogEntry>) -> Self {
        let terminal_hash = entries.last().map(|e| e.hash);
        Self {
            chain_id,
            entries,
            exported_at: Utc::now(),
            terminal_hash,
        }
    }

    pub fn to_json_pretty(&self) -> BitacoraResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| BitacoraError::Serialization {
            reason: format!("failed to serialize snapshot of '{}': {e}", self.chain_id),
        })
    }

    pub fn from_json(s: &str) -> BitacoraResult<Self> {
        serde_json::from_str(s).map_err(|e| BitacoraError::Serialization {
            reason: format!("failed to parse chain snapshot: {e}"),
        })
    }
}
