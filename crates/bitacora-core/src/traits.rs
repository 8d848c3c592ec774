//! Collaborator interfaces of the chain core.
//!
//! - `DigestFunction`: the cryptographic hash primitive
//! - `ChainStore`: ordered, atomic entry storage
//! - `PayloadValidator`: optional gate run before a payload is chained
//!
//! The builder and verifier only ever talk to these traits; concrete stores
//! and validators live in their own crates.

use bitacora_contracts::{
    chain::{ChainId, Digest, EntryId},
    entry::LogEntry,
    error::BitacoraResult,
    payload::Payload,
    validation::ValidationReport,
};

/// A fixed-length, deterministic, collision-resistant digest.
///
/// Implementations must be pure: the same bytes always give the same digest.
pub trait DigestFunction: Send + Sync {
    /// Short algorithm name for logs and exports (e.g. "sha256").
    fn algorithm(&self) -> &'static str;

    fn digest(&self, bytes: &[u8]) -> Digest;
}

/// Storage for chains.
///
/// Stores must keep entries in append order and make `persist_entry` atomic:
/// either the entry is fully stored or nothing changes. Implementations
/// should also refuse an entry that does not extend their current tail, so
/// a writer that bypasses the builder lock still cannot fork a chain.
pub trait ChainStore: Send + Sync {
    /// Load every entry of `chain_id` in chain order. An unknown chain is
    /// empty, not an error.
    fn load_chain(&self, chain_id: &ChainId) -> BitacoraResult<Vec<LogEntry>>;

    /// Append `entry` to `chain_id`.
    fn persist_entry(&self, chain_id: &ChainId, entry: &LogEntry) -> BitacoraResult<()>;

    /// Identifiers of every chain with at least one entry, sorted.
    fn chain_ids(&self) -> BitacoraResult<Vec<ChainId>>;

    /// The last entry of `chain_id`, if any.
    ///
    /// The default loads the whole chain; stores with cheaper tail access
    /// should override it.
    fn tail(&self, chain_id: &ChainId) -> BitacoraResult<Option<LogEntry>> {
        Ok(self.load_chain(chain_id)?.pop())
    }

    /// True if an entry with `entry_id` exists in `chain_id`.
    fn contains_entry(&self, chain_id: &ChainId, entry_id: &EntryId) -> BitacoraResult<bool> {
        Ok(self
            .load_chain(chain_id)?
            .iter()
            .any(|e| e.id == *entry_id))
    }
}

/// A gate that inspects payloads before they are chained.
///
/// Returns a report rather than an error for rejected payloads; `Err` is
/// reserved for validators that could not run at all.
pub trait PayloadValidator: Send + Sync {
    fn validate(&self, payload: &Payload) -> BitacoraResult<ValidationReport>;
}
