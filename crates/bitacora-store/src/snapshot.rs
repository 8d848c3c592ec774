//! Sealed chain exports.

use std::path::Path;

use tracing::{info, warn};

use bitacora_contracts::{
    chain::ChainId,
    entry::ChainSnapshot,
    error::{BitacoraError, BitacoraResult},
    report::IntegrityReport,
};
use bitacora_core::{traits::ChainStore, verifier::ChainVerifier};

/// Read `chain_id` once from `store` and seal it into a `ChainSnapshot`.
pub fn export_snapshot(store: &dyn ChainStore, chain_id: &ChainId) -> BitacoraResult<ChainSnapshot> {
    let entries = store.load_chain(chain_id)?;
    let snapshot = ChainSnapshot::new(chain_id.clone(), entries);

    info!(
        chain_id = %chain_id,
        entries = snapshot.entries.len(),
        terminal_hash = ?snapshot.terminal_hash.map(|h| h.to_hex()),
        "chain snapshot exported"
    );
    Ok(snapshot)
}

/// Write `snapshot` to `path` as pretty JSON.
pub fn write_snapshot(snapshot: &ChainSnapshot, path: &Path) -> BitacoraResult<()> {
    let json = snapshot.to_json_pretty()?;
    std::fs::write(path, json).map_err(|e| BitacoraError::Persistence {
        chain_id: snapshot.chain_id.to_string(),
        reason: format!("cannot write snapshot '{}': {e}", path.display()),
    })
}

/// Read a snapshot previously written by `write_snapshot`.
pub fn read_snapshot(path: &Path) -> BitacoraResult<ChainSnapshot> {
    let contents = std::fs::read_to_string(path).map_err(|e| BitacoraError::StorageRead {
        chain_id: "*".to_string(),
        reason: format!("cannot read snapshot '{}': {e}", path.display()),
    })?;
    ChainSnapshot::from_json(&contents)
}

/// Verify the entries of `snapshot` and check them against its declared
/// `terminal_hash`.
///
/// Entries that chain correctly but end somewhere other than the declared
/// terminal hash are reported as broken, never raised as an error:
/// - the declared hash belongs to entry `k` before the last: broken at
///   `k + 1`, the first entry past the sealed end;
/// - otherwise the sealed tail is missing: broken at `entries.len()`.
pub fn verify_snapshot(verifier: &ChainVerifier, snapshot: &ChainSnapshot) -> IntegrityReport {
    let report = verifier.verify(&snapshot.entries);
    if !report.verified || report.terminal_hash == snapshot.terminal_hash {
        return report;
    }

    let sealed_end = snapshot
        .terminal_hash
        .and_then(|declared| snapshot.entries.iter().position(|e| e.hash == declared));
    let position = sealed_end.map_or(snapshot.entries.len(), |k| k + 1);

    warn!(
        chain_id = %snapshot.chain_id,
        entries = snapshot.entries.len(),
        position,
        "snapshot terminal hash does not match its entries"
    );
    IntegrityReport::terminal_mismatch(
        position as u64,
        snapshot.entries.get(position).map(|e| e.id),
    )
}
