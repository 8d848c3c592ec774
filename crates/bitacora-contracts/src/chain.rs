//! Identifiers and the fixed-size digest type.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{BitacoraError, BitacoraResult};

/// Explicit identifier of one chain.
///
/// Every builder, verifier, and store operation is addressed by a `ChainId`;
/// there is no implicit default chain. The value doubles as a file name in
/// file-backed stores, hence the restricted alphabet.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ChainId(String);

impl ChainId {
    /// Longest accepted identifier, in bytes.
    pub const MAX_LEN: usize = 128;

    /// Validate and wrap a chain identifier.
    ///
    /// Accepts 1..=128 characters from `[A-Za-z0-9_-]`.
    pub fn new(value: impl Into<String>) -> BitacoraResult<Self> {
        let value = value.into();
        if value.is_empty() {
            return Err(BitacoraError::InvalidChainId {
                value,
                reason: "must not be empty".to_string(),
            });
        }
        if value.len() > Self::MAX_LEN {
            return Err(BitacoraError::InvalidChainId {
                value,
                reason: format!("longer than {} bytes", Self::MAX_LEN),
            });
        }
        if let Some(bad) = value
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
        {
            return Err(BitacoraError::InvalidChainId {
                reason: format!("character '{bad}' is not allowed"),
                value,
            });
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ChainId {
    type Error = BitacoraError;

    fn try_from(value: String) -> BitacoraResult<Self> {
        Self::new(value)
    }
}

impl From<ChainId> for String {
    fn from(id: ChainId) -> Self {
        id.0
    }
}

impl FromStr for ChainId {
    type Err = BitacoraError;

    fn from_str(s: &str) -> BitacoraResult<Self> {
        Self::new(s)
    }
}

/// Unique identifier of a single log entry, assigned at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntryId(pub uuid::Uuid);

impl EntryId {
    /// Create a new, random entry ID.
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// The 16 raw bytes of the UUID, as committed to by the entry hash.
    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }
}

impl Default for EntryId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for EntryId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        uuid::Uuid::parse_str(s).map(Self)
    }
}

/// A 32-byte SHA-256 digest.
///
/// Serialized as 64 lowercase hex characters.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Digest(pub [u8; 32]);

impl Digest {
    /// Length of a digest in bytes.
    pub const LEN: usize = 32;

    /// The `previous_hash` of the first entry of every chain.
    ///
    /// All zeros. Not the SHA-256 of any known input, so a genesis link is
    /// unambiguous.
    pub const GENESIS: Digest = Digest([0u8; 32]);

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse 64 hex characters (either case) into a digest.
    pub fn from_hex(s: &str) -> BitacoraResult<Self> {
        let bytes = hex::decode(s).map_err(|e| BitacoraError::Serialization {
            reason: format!("digest is not valid hex: {e}"),
        })?;
        let array: [u8; 32] = bytes.try_into().map_err(|v: Vec<u8>| {
            BitacoraError::Serialization {
                reason: format!("digest must be {} bytes, got {}", Self::LEN, v.len()),
            }
        })?;
        Ok(Self(array))
    }

    pub fn is_genesis(&self) -> bool {
        *self == Self::GENESIS
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", self.to_hex())
    }
}

impl FromStr for Digest {
    type Err = BitacoraError;

    fn from_str(s: &str) -> BitacoraResult<Self> {
        Self::from_hex(s)
    }
}

impl Serialize for Digest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Digest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Digest::from_hex(&s).map_err(serde::de::Error::custom)
    }
}
