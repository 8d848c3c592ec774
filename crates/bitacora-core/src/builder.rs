//! The chain builder: the write path of the bitácora.
//!
//!   Payload → Validate → [lock tail] → Read tail → Canonicalize → Digest → Persist → [unlock]
//!
//! Appends to one chain are serialized by a per-chain mutex held from the
//! moment the tail is read until the new entry is persisted. Two appends to
//! the same chain can therefore never read the same tail, claim the same
//! sequence number, or link to the same previous hash. Appends to different
//! chains do not contend.
//!
//! The builder never retries. A failed append leaves the chain exactly as it
//! was; a caller that wants to retry calls `append` again, which re-reads the
//! tail from scratch.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::{debug, info, warn};

use bitacora_contracts::{
    chain::{ChainId, Digest, EntryId},
    entry::LogEntry,
    error::{BitacoraError, BitacoraResult},
    payload::{BitacoraRecord, Payload},
};

use crate::{
    canonical::canonicalize,
    digest::Sha256Digest,
    traits::{ChainStore, DigestFunction, PayloadValidator},
};

/// Appends entries to chains held in a `ChainStore`.
///
/// One builder should own all writes to a store. Share it behind an `Arc`
/// across threads; `append` takes `&self`.
pub struct ChainBuilder {
    store: Arc<dyn ChainStore>,
    digest: Arc<dyn DigestFunction>,
    validator: Option<Box<dyn PayloadValidator>>,
    /// One tail lock per chain, created on first use.
    tails: Mutex<HashMap<ChainId, Arc<Mutex<()>>>>,
}

impl ChainBuilder {
    /// Create a builder over `store` using SHA-256 and no payload validator.
    pub fn new(store: Arc<dyn ChainStore>) -> Self {
        Self::with_digest(store, Arc::new(Sha256Digest))
    }

    /// Create a builder with an explicit digest function.
    pub fn with_digest(store: Arc<dyn ChainStore>, digest: Arc<dyn DigestFunction>) -> Self {
        Self {
            store,
            digest,
            validator: None,
            tails: Mutex::new(HashMap::new()),
        }
    }

    /// Attach a validator that every payload must pass before it is chained.
    pub fn with_validator(mut self, validator: Box<dyn PayloadValidator>) -> Self {
        self.validator = Some(validator);
        self
    }

    pub fn store(&self) -> &Arc<dyn ChainStore> {
        &self.store
    }

    pub fn digest_function(&self) -> &Arc<dyn DigestFunction> {
        &self.digest
    }

    /// Append `payload` to `chain_id` and return the chained entry.
    ///
    /// # Steps
    ///
    /// 1. Run the validator, if any. Rejection → `InvalidPayload`; the tail
    ///    lock is never taken.
    /// 2. Take the chain's tail lock.
    /// 3. Read the tail. An empty chain yields sequence 0 and
    ///    `Digest::GENESIS`; otherwise `tail.sequence_number + 1` and
    ///    `tail.hash`. A tail at `u64::MAX` is a `Persistence` error.
    /// 4. If the payload corrects an earlier entry, that entry must exist in
    ///    this chain, else `UnknownCorrectionTarget`. A `corrects` value that
    ///    is not an entry id is `InvalidPayload`.
    /// 5. Assign a fresh `EntryId`, canonicalize, digest.
    /// 6. Persist. A store failure surfaces as `Persistence` and the entry is
    ///    discarded.
    ///
    /// # Errors
    ///
    /// `InvalidPayload`, `UnknownCorrectionTarget`, `StorageRead`,
    /// `HashComputation`, and `Persistence`. A broken existing chain is not
    /// detected here; that is what `ChainVerifier` is for.
    pub fn append(&self, chain_id: &ChainId, payload: Payload) -> BitacoraResult<LogEntry> {
        // ── Step 1: Validate outside the critical section ────────────────────
        if let Some(validator) = &self.validator {
            let report = validator.validate(&payload)?;
            if !report.passed {
                warn!(
                    chain_id = %chain_id,
                    failures = report.failures.len(),
                    "payload rejected by validator"
                );
                return Err(BitacoraError::InvalidPayload {
                    reason: report.summary(),
                });
            }
        }

        // ── Step 2: Serialize with every other append to this chain ──────────
        let tail_lock = self.tail_lock(chain_id)?;
        let _guard = tail_lock.lock().map_err(|e| BitacoraError::Persistence {
            chain_id: chain_id.to_string(),
            reason: format!("chain tail lock poisoned: {e}"),
        })?;

        // ── Step 3: Read the tail ────────────────────────────────────────────
        let (sequence_number, previous_hash) = match self.store.tail(chain_id)? {
            Some(tail) => {
                let next = tail.sequence_number.checked_add(1).ok_or_else(|| {
                    BitacoraError::Persistence {
                        chain_id: chain_id.to_string(),
                        reason: format!(
                            "tail sequence {} leaves no room for another entry",
                            tail.sequence_number
                        ),
                    }
                })?;
                (next, tail.hash)
            }
            None => (0, Digest::GENESIS),
        };

        // ── Step 4: Corrections must point at an existing entry ──────────────
        if let Some(target) = payload.corrects()? {
            if !self.store.contains_entry(chain_id, &target)? {
                return Err(BitacoraError::UnknownCorrectionTarget {
                    chain_id: chain_id.to_string(),
                    entry_id: target.to_string(),
                });
            }
        }

        // ── Step 5: Link ─────────────────────────────────────────────────────
        let id = EntryId::new();
        let bytes = canonicalize(&id, sequence_number, &payload, &previous_hash)?;
        let hash = self.digest.digest(&bytes);

        let entry = LogEntry {
            id,
            sequence_number,
            payload,
            previous_hash,
            hash,
        };

        debug!(
            chain_id = %chain_id,
            sequence = sequence_number,
            previous_hash = %previous_hash,
            hash = %hash,
            "entry linked"
        );

        // ── Step 6: Persist, still holding the tail lock ─────────────────────
        self.store
            .persist_entry(chain_id, &entry)
            .map_err(|e| match e {
                BitacoraError::Persistence { .. } => e,
                other => BitacoraError::Persistence {
                    chain_id: chain_id.to_string(),
                    reason: other.to_string(),
                },
            })?;

        info!(
            chain_id = %chain_id,
            entry_id = %entry.id,
            sequence = entry.sequence_number,
            hash = %entry.hash,
            "entry appended"
        );

        Ok(entry)
    }

    /// Append a typed site log record.
    pub fn append_record(
        &self,
        chain_id: &ChainId,
        record: BitacoraRecord,
    ) -> BitacoraResult<LogEntry> {
        self.append(chain_id, record.into_payload()?)
    }

    /// Fetch or create the tail lock for `chain_id`.
    ///
    /// The registry mutex is held only long enough to clone the `Arc`.
    fn tail_lock(&self, chain_id: &ChainId) -> BitacoraResult<Arc<Mutex<()>>> {
        let mut tails = self.tails.lock().map_err(|e| BitacoraError::Persistence {
            chain_id: chain_id.to_string(),
            reason: format!("tail lock registry poisoned: {e}"),
        })?;
        Ok(Arc::clone(
            tails
                .entry(chain_id.clone())
                .or_insert_with(|| Arc::new(Mutex::new(()))),
        ))
    }
}
