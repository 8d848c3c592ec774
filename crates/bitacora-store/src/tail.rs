//! The compare-and-append check shared by every store.

use bitacora_contracts::{
    chain::{ChainId, Digest},
    entry::LogEntry,
    error::{BitacoraError, BitacoraResult},
};

/// Refuse `entry` unless it extends `tail`: next sequence number, linked to
/// the tail's hash (or genesis on an empty chain).
pub(crate) fn ensure_extends_tail(
    chain_id: &ChainId,
    tail: Option<&LogEntry>,
    entry: &LogEntry,
) -> BitacoraResult<()> {
    let (expected_sequence, expected_previous) = match tail {
        Some(t) => {
            let next = t.sequence_number.checked_add(1).ok_or_else(|| BitacoraError::Persistence {
                chain_id: chain_id.to_string(),
                reason: format!("tail sequence {} leaves no room for another entry", t.sequence_number),
            })?;
            (next, t.hash)
        }
        None => (0, Digest::GENESIS),
    };

    if entry.sequence_number != expected_sequence {
        return Err(BitacoraError::Persistence {
            chain_id: chain_id.to_string(),
            reason: format!(
                "entry claims sequence {} but the chain expects {}",
                entry.sequence_number, expected_sequence
            ),
        });
    }
    if entry.previous_hash != expected_previous {
        return Err(BitacoraError::Persistence {
            chain_id: chain_id.to_string(),
            reason: format!(
                "entry links to {} but the chain tail is {}",
                entry.previous_hash, expected_previous
            ),
        });
    }
    Ok(())
}
