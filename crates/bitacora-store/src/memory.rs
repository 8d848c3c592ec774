//! In-memory implementation of `ChainStore`.
//!
//! `InMemoryChainStore` keeps every chain in a `Vec` inside a `RwLock`ed map.
//! Loads take the read lock and clone, so a verifier always works on a
//! snapshot; persists take the write lock and are atomic by construction.

use std::collections::HashMap;
use std::sync::RwLock;

use tracing::debug;

use bitacora_contracts::{
    chain::{ChainId, EntryId},
    entry::LogEntry,
    error::{BitacoraError, BitacoraResult},
};
use bitacora_core::traits::ChainStore;

use crate::tail::ensure_extends_tail;

/// A process-local chain store.
#[derive(Debug, Default)]
pub struct InMemoryChainStore {
    pub(crate) chains: RwLock<HashMap<ChainId, Vec<LogEntry>>>,
}

impl InMemoryChainStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries in `chain_id`.
    pub fn len(&self, chain_id: &ChainId) -> BitacoraResult<usize> {
        let chains = self.chains.read().map_err(|_| Self::poisoned(chain_id))?;
        Ok(chains.get(chain_id).map_or(0, Vec::len))
    }

    fn poisoned(chain_id: &ChainId) -> BitacoraError {
        BitacoraError::StorageRead {
            chain_id: chain_id.to_string(),
            reason: "in-memory store lock poisoned".to_string(),
        }
    }
}

impl ChainStore for InMemoryChainStore {
    fn load_chain(&self, chain_id: &ChainId) -> BitacoraResult<Vec<LogEntry>> {
        let chains = self.chains.read().map_err(|_| Self::poisoned(chain_id))?;
        Ok(chains.get(chain_id).cloned().unwrap_or_default())
    }

    /// Append `entry` after checking that it extends the current tail.
    ///
    /// Returns `Persistence` when the entry's sequence number or previous
    /// hash does not match the tail, or when the lock is poisoned.
    fn persist_entry(&self, chain_id: &ChainId, entry: &LogEntry) -> BitacoraResult<()> {
        let mut chains = self
            .chains
            .write()
            .map_err(|_| BitacoraError::Persistence {
                chain_id: chain_id.to_string(),
                reason: "in-memory store lock poisoned".to_string(),
            })?;

        let entries = chains.entry(chain_id.clone()).or_default();
        ensure_extends_tail(chain_id, entries.last(), entry)?;
        entries.push(entry.clone());

        debug!(
            chain_id = %chain_id,
            sequence = entry.sequence_number,
            "entry stored in memory"
        );
        Ok(())
    }

    fn chain_ids(&self) -> BitacoraResult<Vec<ChainId>> {
        let chains = self.chains.read().map_err(|_| BitacoraError::StorageRead {
            chain_id: "*".to_string(),
            reason: "in-memory store lock poisoned".to_string(),
        })?;
        let mut ids: Vec<ChainId> = chains
            .iter()
            .filter(|(_, entries)| !entries.is_empty())
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        Ok(ids)
    }

    fn tail(&self, chain_id: &ChainId) -> BitacoraResult<Option<LogEntry>> {
        let chains = self.chains.read().map_err(|_| Self::poisoned(chain_id))?;
        Ok(chains.get(chain_id).and_then(|e| e.last().cloned()))
    }

    fn contains_entry(&self, chain_id: &ChainId, entry_id: &EntryId) -> BitacoraResult<bool> {
        let chains = self.chains.read().map_err(|_| Self::poisoned(chain_id))?;
        Ok(chains
            .get(chain_id)
            .is_some_and(|entries| entries.iter().any(|e| e.id == *entry_id)))
    }
}
