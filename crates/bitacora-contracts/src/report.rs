//! The result of verifying a chain.
//!
//! `IntegrityReport` is a plain value. A broken chain is an expected,
//! reportable outcome and is never raised as an error.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::chain::{Digest, EntryId};

/// Why verification stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BreakReason {
    /// The stored `hash` does not match the hash recomputed from the entry.
    HashMismatch,
    /// The stored `previous_hash` does not match the preceding entry's hash
    /// (or the genesis sentinel at position 0).
    LinkMismatch,
    /// The stored `sequence_number` is not the entry's position in the chain.
    SequenceGap,
}

impl fmt::Display for BreakReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BreakReason::HashMismatch => "HASH_MISMATCH",
            BreakReason::LinkMismatch => "LINK_MISMATCH",
            BreakReason::SequenceGap => "SEQUENCE_GAP",
        };
        f.write_str(s)
    }
}

/// Outcome of a verification run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrityReport {
    /// True only if every entry passed.
    pub verified: bool,

    /// Entries that passed before the run stopped. Equals the chain length
    /// when `verified` is true.
    pub entries_checked: u64,

    /// Chain position (the expected sequence number) of the first break.
    pub broken_at_sequence: Option<u64>,

    /// Id of the entry found at the broken position.
    pub broken_entry_id: Option<EntryId>,

    pub reason: Option<BreakReason>,

    /// Hash of the last entry of a verified, non-empty chain.
    pub terminal_hash: Option<Digest>,
}

impl IntegrityReport {
    pub const LABEL_INTACT: &'static str = "Cadena Íntegra";
    pub const LABEL_COMPROMISED: &'static str = "Cadena Comprometida";

    /// Report for a chain whose every entry checked out.
    pub fn intact(entries_checked: u64, terminal_hash: Option<Digest>) -> Self {
        Self {
            verified: true,
            entries_checked,
            broken_at_sequence: None,
            broken_entry_id: None,
            reason: None,
            terminal_hash,
        }
    }

    /// Report for a chain that broke at `position`.
    pub fn broken(position: u64, entry_id: EntryId, reason: BreakReason) -> Self {
        Self {
            verified: false,
            entries_checked: position,
            broken_at_sequence: Some(position),
            broken_entry_id: Some(entry_id),
            reason: Some(reason),
            terminal_hash: None,
        }
    }

    /// Report for a snapshot whose entries chain correctly but whose declared
    /// `terminal_hash` disagrees with them, so entries were cut from or added
    /// to its end.
    ///
    /// `position` is the first position past the declared end, and
    /// `entry_id` the entry found there, if any.
    pub fn terminal_mismatch(position: u64, entry_id: Option<EntryId>) -> Self {
        Self {
            verified: false,
            entries_checked: position,
            broken_at_sequence: Some(position),
            broken_entry_id: entry_id,
            reason: Some(BreakReason::LinkMismatch),
            terminal_hash: None,
        }
    }

    /// Badge text shown by the dashboard.
    pub fn status_label(&self) -> &'static str {
        if self.verified {
            Self::LABEL_INTACT
        } else {
            Self::LABEL_COMPROMISED
        }
    }
}

impl fmt::Display for IntegrityReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.broken_at_sequence, self.reason) {
            (Some(seq), Some(reason)) => write!(
                f,
                "{}: {} at sequence {} after {} valid entries",
                self.status_label(),
                reason,
                seq,
                self.entries_checked
            ),
            _ => write!(
                f,
                "{}: {} entries verified",
                self.status_label(),
                self.entries_checked
            ),
        }
    }
}
