//! Canonical byte form of a log entry.
//!
//! Every field that contributes to an entry's hash is written explicitly, in
//! a fixed order, with fixed-width big-endian integers. This layout is frozen:
//! changing it invalidates every historical hash, so any future change must
//! bump `CANONICAL_VERSION` and keep the old encoder for old chains.
//!
//! Layout (bytes, in order):
//!   1. domain tag `b"BITACORA"` (8 bytes)
//!   2. `CANONICAL_VERSION` (1 byte)
//!   3. entry id, raw UUID (16 bytes)
//!   4. sequence number, u64
//!   5. previous hash (32 bytes)
//!   6. payload, encoded as a map value
//!
//! Value encoding, one tag byte then the body:
//!
//! | tag    | value     | body                                            |
//! |--------|-----------|-------------------------------------------------|
//! | `0x00` | Absent    | none                                            |
//! | `0x01` | Text      | u32 byte length, UTF-8 bytes                    |
//! | `0x02` | Integer   | i64                                             |
//! | `0x03` | Bool      | 1 byte, 0 or 1                                  |
//! | `0x04` | Timestamp | i64 seconds since epoch, u32 nanoseconds        |
//! | `0x05` | List      | u32 count, values                               |
//! | `0x06` | Map       | u32 count, then per key in order: u32 key length, UTF-8 key, value |

use bitacora_contracts::{
    chain::{Digest, EntryId},
    entry::LogEntry,
    error::{BitacoraError, BitacoraResult},
    payload::{FieldValue, Payload},
};

/// Domain separation tag prefixed to every canonical entry.
pub const DOMAIN_TAG: &[u8; 8] = b"BITACORA";

/// Version of the layout documented above.
pub const CANONICAL_VERSION: u8 = 1;

const TAG_ABSENT: u8 = 0x00;
const TAG_TEXT: u8 = 0x01;
const TAG_INTEGER: u8 = 0x02;
const TAG_BOOL: u8 = 0x03;
const TAG_TIMESTAMP: u8 = 0x04;
const TAG_LIST: u8 = 0x05;
const TAG_MAP: u8 = 0x06;

/// Produce the canonical bytes for the hashable fields of an entry.
///
/// Pure: identical inputs always give identical bytes, whatever order the
/// payload fields were inserted in.
///
/// # Errors
///
/// `HashComputation` if a string or collection is longer than `u32::MAX`
/// and therefore has no canonical length prefix.
pub fn canonicalize(
    entry_id: &EntryId,
    sequence_number: u64,
    payload: &Payload,
    previous_hash: &Digest,
) -> BitacoraResult<Vec<u8>> {
    let mut out = Vec::with_capacity(128);
    out.extend_from_slice(DOMAIN_TAG);
    out.push(CANONICAL_VERSION);
    out.extend_from_slice(entry_id.as_bytes());
    out.extend_from_slice(&sequence_number.to_be_bytes());
    out.extend_from_slice(previous_hash.as_bytes());
    encode_map(&mut out, payload.iter())?;
    Ok(out)
}

/// Canonical bytes of a stored entry; `entry.hash` is not part of them.
pub fn canonicalize_entry(entry: &LogEntry) -> BitacoraResult<Vec<u8>> {
    canonicalize(
        &entry.id,
        entry.sequence_number,
        &entry.payload,
        &entry.previous_hash,
    )
}

fn encode_value(out: &mut Vec<u8>, value: &FieldValue) -> BitacoraResult<()> {
    match value {
        FieldValue::Absent => out.push(TAG_ABSENT),
        FieldValue::Text(s) => {
            out.push(TAG_TEXT);
            encode_str(out, s)?;
        }
        FieldValue::Integer(n) => {
            out.push(TAG_INTEGER);
            out.extend_from_slice(&n.to_be_bytes());
        }
        FieldValue::Bool(b) => {
            out.push(TAG_BOOL);
            out.push(u8::from(*b));
        }
        FieldValue::Timestamp(t) => {
            out.push(TAG_TIMESTAMP);
            out.extend_from_slice(&t.timestamp().to_be_bytes());
            out.extend_from_slice(&t.timestamp_subsec_nanos().to_be_bytes());
        }
        FieldValue::List(items) => {
            out.push(TAG_LIST);
            encode_len(out, items.len(), "list")?;
            for item in items {
                encode_value(out, item)?;
            }
        }
        FieldValue::Map(map) => encode_map(out, map.iter())?,
    }
    Ok(())
}

/// Maps are always walked in key order; both callers pass `BTreeMap`
/// iterators.
fn encode_map<'a, I>(out: &mut Vec<u8>, entries: I) -> BitacoraResult<()>
where
    I: ExactSizeIterator<Item = (&'a String, &'a FieldValue)>,
{
    out.push(TAG_MAP);
    encode_len(out, entries.len(), "map")?;
    for (key, value) in entries {
        encode_str(out, key)?;
        encode_value(out, value)?;
    }
    Ok(())
}

fn encode_str(out: &mut Vec<u8>, s: &str) -> BitacoraResult<()> {
    encode_len(out, s.len(), "string")?;
    out.extend_from_slice(s.as_bytes());
    Ok(())
}

fn encode_len(out: &mut Vec<u8>, len: usize, what: &str) -> BitacoraResult<()> {
    let len = u32::try_from(len).map_err(|_| BitacoraError::HashComputation {
        reason: format!("{what} of length {len} exceeds the canonical u32 length prefix"),
    })?;
    out.extend_from_slice(&len.to_be_bytes());
    Ok(())
}
