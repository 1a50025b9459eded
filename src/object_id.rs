use crate::hex::{Hex, InvalidHex};
use blake3::{Hash, Hasher};
use serde::{Deserialize, Serialize};

use std::{fmt::Display, str::FromStr};

/// Number of leading hex characters that make up an abbreviated [`ObjectId`].
pub const SHORT_ID_LEN: usize = 8;

/// An identifier for a particular stored object.
/// Under the hood, this is a [`blake3`] hash.
///
/// It is displayed, serialized and parsed in hexadecimal format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectId(Hash);

impl ObjectId {
    /// Hashes the concatenation of `parts`, in order.
    pub fn from_parts<'a, I>(parts: I) -> Self
    where
        I: IntoIterator<Item = &'a [u8]>,
    {
        let mut hasher = Hasher::new();
        for part in parts {
            hasher.update(part);
        }
        ObjectId(hasher.finalize())
    }

    /// Identity of a file's content under a given name: `H(filename ‖ content)`.
    pub fn for_blob(filename: &str, content: &[u8]) -> Self {
        Self::from_parts([filename.as_bytes(), content])
    }

    pub fn hex(&self) -> Hex {
        Hex::from(&self.0.as_bytes()[..])
    }

    /// The abbreviated form accepted wherever a commit id is expected.
    pub fn short(&self) -> String {
        let mut s = self.to_string();
        s.truncate(SHORT_ID_LEN);
        s
    }
}

impl Ord for ObjectId {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.as_bytes().cmp(other.0.as_bytes())
    }
}

impl PartialOrd for ObjectId {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.hex())
    }
}

impl From<&[u8]> for ObjectId {
    fn from(bytes: &[u8]) -> Self {
        ObjectId(blake3::hash(bytes))
    }
}

/// Why a string could not be read back as an [`ObjectId`].
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum InvalidObjectId {
    #[display(fmt = "object id must be 64 hex characters, got {}", _0)]
    Length(usize),
    #[display(fmt = "{}", _0)]
    Hex(InvalidHex),
}

impl FromStr for ObjectId {
    type Err = InvalidObjectId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != blake3::OUT_LEN * 2 {
            return Err(InvalidObjectId::Length(s.len()));
        }
        let bytes: Vec<u8> = Hex::try_from(s).map_err(InvalidObjectId::Hex)?.into();
        let mut out = [0u8; blake3::OUT_LEN];
        out.copy_from_slice(&bytes);
        Ok(ObjectId(Hash::from_bytes(out)))
    }
}

impl Serialize for ObjectId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.hex().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ObjectId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s: String = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[test]
fn test_blob_id_is_stable() {
    let a = ObjectId::for_blob("f", b"x");
    let b = ObjectId::for_blob("f", b"x");
    assert_eq!(a, b);
    assert_eq!(a, ObjectId::from(&b"fx"[..]));
    assert_ne!(a, ObjectId::for_blob("g", b"x"));
    assert_ne!(a, ObjectId::for_blob("f", b"y"));
}

#[test]
fn test_parse_display() {
    let id = ObjectId::for_blob("hello.txt", b"hello, world");
    let s = id.to_string();
    assert_eq!(s.len(), 64);
    assert_eq!(s.parse::<ObjectId>(), Ok(id));
    assert_eq!(id.short(), s[..SHORT_ID_LEN]);
    assert_eq!("abc".parse::<ObjectId>(), Err(InvalidObjectId::Length(3)));
}

#[test]
fn test_serde() {
    let id = ObjectId::for_blob("a", b"b");
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, format!("\"{}\"", id));
    let id_: ObjectId = serde_json::from_str(&json).unwrap();
    assert_eq!(id, id_);
}
