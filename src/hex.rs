use std::fmt::{Display, Write};

use serde::{Deserialize, Serialize};

/// A valid hexadecimal encoding of binary data.
///
/// The inner bytes are always lowercase ASCII hex digits, two per encoded byte.
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct Hex(Vec<u8>);

impl Hex {
    pub fn as_str(&self) -> &str {
        // Only ever constructed from hex digits.
        std::str::from_utf8(&self.0).unwrap_or_default()
    }
}

impl Serialize for Hex {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.as_str().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Hex {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s: String = String::deserialize(deserializer)?;
        Hex::try_from(s.as_str()).map_err(serde::de::Error::custom)
    }
}

impl Display for Hex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for &b in &self.0 {
            f.write_char(b as char)?;
        }
        Ok(())
    }
}

impl<'a> From<&'a [u8]> for Hex {
    fn from(bytes: &[u8]) -> Self {
        fn hex_digit(b: u8) -> u8 {
            if b <= 9 {
                b + b'0'
            } else {
                b + b'a' - 10
            }
        }

        let mut out = vec![0u8; bytes.len() * 2];
        let mut i = 0;
        for &b in bytes {
            out[i] = hex_digit((b & 0b11110000) >> 4);
            out[i + 1] = hex_digit(b & 0b00001111);
            i += 2;
        }
        Hex(out)
    }
}

/// Reasons a string is not accepted as [`Hex`].
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum InvalidHex {
    #[display(fmt = "hex length {} is not even", _0)]
    OddLength(usize),
    #[display(fmt = "bad hex digit: {:?}", _0)]
    BadDigit(char),
}

impl<'a> TryFrom<&'a str> for Hex {
    type Error = InvalidHex;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        if s.len() % 2 != 0 {
            return Err(InvalidHex::OddLength(s.len()));
        }
        if let Some(c) = s.chars().find(|c| !matches!(c, '0'..='9' | 'a'..='f')) {
            return Err(InvalidHex::BadDigit(c));
        }
        Ok(Hex(s.as_bytes().to_vec()))
    }
}

impl From<Hex> for Vec<u8> {
    fn from(value: Hex) -> Self {
        fn unhex_digit(h: u8) -> u8 {
            if h.is_ascii_digit() {
                h - b'0'
            } else {
                h - b'a' + 10
            }
        }

        value
            .0
            .chunks_exact(2)
            .map(|pair| (unhex_digit(pair[0]) << 4) | unhex_digit(pair[1]))
            .collect()
    }
}

/// Serde adapter storing raw bytes as a hex string, for use with
/// `#[serde(with = "crate::hex::bytes")]`.
pub mod bytes {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use super::Hex;

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        Hex::from(bytes).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        Ok(Hex::deserialize(deserializer)?.into())
    }
}

#[test]
fn test_hex_round_trip() {
    let example: &[u8] = b"hello, world";
    let hex: Hex = Hex::from(example);
    assert_eq!(hex.as_str(), "68656c6c6f2c20776f726c64");
    let bytes: Vec<u8> = hex.into();
    let bytes_ref: &[u8] = &bytes;
    assert_eq!(example, bytes_ref);
}

#[test]
fn test_hex_deserialize() {
    let example: &[u8] = b"hello, world";
    let hex: Hex = Hex::from(example);
    let json = serde_json::to_vec(&hex).unwrap();
    let hex_: Hex = serde_json::from_slice(&json).unwrap();
    assert_eq!(hex, hex_);
}

#[test]
fn test_hex_rejects_garbage() {
    assert_eq!(Hex::try_from("abc"), Err(InvalidHex::OddLength(3)));
    assert_eq!(Hex::try_from("zz"), Err(InvalidHex::BadDigit('z')));
    assert!(serde_json::from_str::<Hex>("\"ABCD\"").is_err());
}
