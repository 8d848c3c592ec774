//! The chain verifier: the audit path of the bitácora.
//!
//! Verification replays a chain in the order given, recomputing each hash
//! and checking each link. It stops at the first break and never tries to
//! skip or heal a broken link.
//!
//! Checks per position `i`, in this order:
//!
//! 1. **Link**: `previous_hash` equals the hash recomputed for position
//!    `i - 1` (or `Digest::GENESIS` at position 0).
//! 2. **Sequence**: `sequence_number == i`.
//! 3. **Hash**: `hash` equals the digest of the entry's canonical bytes.
//!
//! A missing or reordered entry therefore shows up as `LinkMismatch`, an
//! edited field as `HashMismatch`, and a consistently forged numbering as
//! `SequenceGap`.

use std::sync::Arc;

use tracing::{debug, info, warn};

use bitacora_contracts::{
    chain::{ChainId, Digest},
    entry::LogEntry,
    error::BitacoraResult,
    report::{BreakReason, IntegrityReport},
};

use crate::{
    canonical::canonicalize_entry,
    digest::Sha256Digest,
    traits::{ChainStore, DigestFunction},
};

/// Read-only verifier for chains.
///
/// Holds no chain state; any number of verifications may run concurrently.
#[derive(Clone)]
pub struct ChainVerifier {
    digest: Arc<dyn DigestFunction>,
}

impl ChainVerifier {
    /// A verifier using SHA-256.
    pub fn new() -> Self {
        Self::with_digest(Arc::new(Sha256Digest))
    }

    pub fn with_digest(digest: Arc<dyn DigestFunction>) -> Self {
        Self { digest }
    }

    /// Verify `entries` as one chain.
    ///
    /// Never fails: a broken chain is reported, not raised. An entry whose
    /// canonical form cannot be produced at all is reported as
    /// `HashMismatch`, since its stored hash cannot have come from it. An
    /// empty chain is intact.
    pub fn verify(&self, entries: &[LogEntry]) -> IntegrityReport {
        let mut expected_previous = Digest::GENESIS;

        for (position, entry) in (0u64..).zip(entries) {
            // Check 1: the link to the previous entry.
            if entry.previous_hash != expected_previous {
                return Self::broken(position, entry, BreakReason::LinkMismatch);
            }

            // Check 2: the entry sits where its sequence number says.
            if entry.sequence_number != position {
                return Self::broken(position, entry, BreakReason::SequenceGap);
            }

            // Check 3: the stored hash matches the content.
            let recomputed = match canonicalize_entry(entry) {
                Ok(bytes) => self.digest.digest(&bytes),
                Err(e) => {
                    warn!(position, error = %e, "entry cannot be canonicalized");
                    return Self::broken(position, entry, BreakReason::HashMismatch);
                }
            };
            if entry.hash != recomputed {
                return Self::broken(position, entry, BreakReason::HashMismatch);
            }

            expected_previous = recomputed;
        }

        let report = IntegrityReport::intact(
            entries.len() as u64,
            entries.last().map(|_| expected_previous),
        );
        debug!(entries = report.entries_checked, "chain verified");
        report
    }

    /// Load one snapshot of `chain_id` from `store` and verify it.
    ///
    /// The entries are fetched once, so appends that land during the run
    /// are simply not part of it.
    ///
    /// # Errors
    ///
    /// Only when the store cannot be read. Tampering is in the report.
    pub fn verify_chain(
        &self,
        store: &dyn ChainStore,
        chain_id: &ChainId,
    ) -> BitacoraResult<IntegrityReport> {
        let snapshot = store.load_chain(chain_id)?;
        let report = self.verify(&snapshot);

        if report.verified {
            info!(
                chain_id = %chain_id,
                entries = report.entries_checked,
                "chain integrity verified"
            );
        } else {
            warn!(
                chain_id = %chain_id,
                broken_at = ?report.broken_at_sequence,
                reason = ?report.reason,
                "chain integrity compromised"
            );
        }

        Ok(report)
    }

    fn broken(position: u64, entry: &LogEntry, reason: BreakReason) -> IntegrityReport {
        debug!(position, entry_id = %entry.id, %reason, "chain break detected");
        IntegrityReport::broken(position, entry.id, reason)
    }
}

impl Default for ChainVerifier {
    fn default() -> Self {
        Self::new()
    }
}

/// Verify `entries` with SHA-256.
pub fn verify_chain(entries: &[LogEntry]) -> IntegrityReport {
    ChainVerifier::new().verify(entries)
}
