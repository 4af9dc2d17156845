use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Multicodec code for the identity "hash" (digest is the data itself).
pub const IDENTITY: u64 = 0x00;
/// Multicodec code for SHA2-256.
pub const SHA2_256: u64 = 0x12;
/// Multicodec code for BLAKE3 with a 32-byte digest.
pub const BLAKE3_256: u64 = 0x1e;

/// Longest unsigned varint the multiformats spec allows (63 bits of payload).
const MAX_VARINT_LEN: usize = 9;

/// Self-describing content identifier: `varint(code) || varint(len) || digest`.
///
/// A `Multihash` can be built from arbitrary bytes without validation so that
/// identifiers coming from callers or from disk can be carried around as-is;
/// [`Multihash::validate`] is the check consumers run before using one as a
/// lookup key. The empty multihash is the null identifier ("no key").
///
/// Serialized as a lowercase hex string of the full multihash bytes.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Multihash(Vec<u8>);

impl Multihash {
    /// Hash `data` with BLAKE3-256 and wrap the digest.
    pub fn digest(data: &[u8]) -> Self {
        Self::wrap(BLAKE3_256, blake3::hash(data).as_bytes())
    }

    /// Wrap a pre-computed digest produced by the hash function `code`.
    pub fn wrap(code: u64, digest: &[u8]) -> Self {
        let mut bytes = Vec::with_capacity(digest.len() + 4);
        encode_varint(code, &mut bytes);
        encode_varint(digest.len() as u64, &mut bytes);
        bytes.extend_from_slice(digest);
        Self(bytes)
    }

    /// Take raw multihash bytes without checking them.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// The null multihash (no bytes). Represents "no identifier".
    pub const fn null() -> Self {
        Self(Vec::new())
    }

    /// Returns `true` if this is the null multihash.
    pub fn is_null(&self) -> bool {
        self.0.is_empty()
    }

    /// The raw multihash bytes, header included.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Check that the header parses and the declared digest length matches.
    pub fn validate(&self) -> Result<(), TypeError> {
        self.split().map(|_| ())
    }

    /// The hash function code from the header.
    pub fn code(&self) -> Result<u64, TypeError> {
        self.split().map(|(code, _)| code)
    }

    /// The digest that follows the header.
    pub fn digest_bytes(&self) -> Result<&[u8], TypeError> {
        self.split().map(|(_, digest)| digest)
    }

    fn split(&self) -> Result<(u64, &[u8]), TypeError> {
        if self.0.is_empty() {
            return Err(TypeError::EmptyMultihash);
        }
        let (code, code_len) = decode_varint(&self.0)
            .ok_or_else(|| TypeError::MalformedMultihash("bad hash function code".into()))?;
        let rest = &self.0[code_len..];
        let (len, len_len) = decode_varint(rest)
            .ok_or_else(|| TypeError::MalformedMultihash("bad digest length".into()))?;
        let digest = &rest[len_len..];
        if digest.len() as u64 != len {
            return Err(TypeError::MalformedMultihash(format!(
                "declared digest length {len}, found {}",
                digest.len()
            )));
        }
        Ok((code, digest))
    }

    /// Hex-encoded string of the full multihash.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    /// Short hex form for logs: the last 4 bytes, which sit in the digest
    /// rather than in the (shared) header.
    pub fn short_hex(&self) -> String {
        hex::encode(&self.0[self.0.len().saturating_sub(4)..])
    }

    /// Parse a hex string and validate the result.
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        let bytes = hex::decode(s).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        let mh = Self(bytes);
        mh.validate()?;
        Ok(mh)
    }
}

impl fmt::Debug for Multihash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            write!(f, "Multihash(null)")
        } else {
            write!(f, "Multihash({})", self.short_hex())
        }
    }
}

impl fmt::Display for Multihash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl FromStr for Multihash {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

// Serde goes through plain hex so that whatever was written is read back
// byte for byte, valid or not.
impl TryFrom<String> for Multihash {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        hex::decode(&s)
            .map(Self)
            .map_err(|e| TypeError::InvalidHex(e.to_string()))
    }
}

impl From<Multihash> for String {
    fn from(mh: Multihash) -> Self {
        mh.to_hex()
    }
}

fn encode_varint(mut value: u64, out: &mut Vec<u8>) {
    while value >= 0x80 {
        out.push((value as u8 & 0x7f) | 0x80);
        value >>= 7;
    }
    out.push(value as u8);
}

/// Decode an unsigned LEB128 varint. Returns the value and bytes consumed.
fn decode_varint(bytes: &[u8]) -> Option<(u64, usize)> {
    let mut value = 0u64;
    for (i, byte) in bytes.iter().take(MAX_VARINT_LEN).enumerate() {
        value |= u64::from(byte & 0x7f) << (7 * i);
        if byte & 0x80 == 0 {
            return Some((value, i + 1));
        }
    }
    None
}
