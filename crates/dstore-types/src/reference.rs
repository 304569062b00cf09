use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Size of a [`Ref`] digest in bytes.
pub const REF_LEN: usize = 32;

/// Content address of a chunk.
///
/// A `Ref` is the BLAKE3 digest of a chunk's canonical encoding, so two
/// chunks with identical content always share a `Ref`. The all-zero `Ref` is
/// reserved as the null reference ("no chunk"); a store root that has never
/// been set reads back as null.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Ref([u8; REF_LEN]);

impl Ref {
    /// Digest arbitrary bytes without domain separation.
    ///
    /// Chunk addresses are computed by the chunk layer with a domain tag;
    /// this is a convenience for tests and ad-hoc keys.
    pub fn of_bytes(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }

    /// Wrap a pre-computed digest.
    pub const fn from_hash(hash: [u8; REF_LEN]) -> Self {
        Self(hash)
    }

    /// The null reference (all zeros).
    pub const fn null() -> Self {
        Self([0u8; REF_LEN])
    }

    /// Returns `true` for the null reference.
    pub fn is_null(&self) -> bool {
        self.0 == [0u8; REF_LEN]
    }

    /// The raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; REF_LEN] {
        &self.0
    }

    /// Full lowercase hex encoding (64 characters).
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// First 8 hex characters, for logs.
    pub fn short_hex(&self) -> String {
        hex::encode(&self.0[..4])
    }

    /// Parse a full hex digest.
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        let bytes = hex::decode(s).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        if bytes.len() != REF_LEN {
            return Err(TypeError::InvalidLength {
                expected: REF_LEN,
                actual: bytes.len(),
            });
        }
        let mut arr = [0u8; REF_LEN];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl Default for Ref {
    fn default() -> Self {
        Self::null()
    }
}

impl fmt::Debug for Ref {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ref({})", self.short_hex())
    }
}

impl fmt::Display for Ref {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl FromStr for Ref {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl From<[u8; REF_LEN]> for Ref {
    fn from(bytes: [u8; REF_LEN]) -> Self {
        Self(bytes)
    }
}

impl From<Ref> for [u8; REF_LEN] {
    fn from(r: Ref) -> Self {
        r.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn of_bytes_is_deterministic() {
        assert_eq!(Ref::of_bytes(b"hello world"), Ref::of_bytes(b"hello world"));
    }

    #[test]
    fn different_data_produces_different_refs() {
        assert_ne!(Ref::of_bytes(b"hello"), Ref::of_bytes(b"world"));
    }

    #[test]
    fn null_is_all_zeros_and_default() {
        let null = Ref::null();
        assert!(null.is_null());
        assert_eq!(null.as_bytes(), &[0u8; 32]);
        assert_eq!(Ref::default(), null);
        assert!(!Ref::of_bytes(b"x").is_null());
    }

    #[test]
    fn short_hex_is_8_chars() {
        assert_eq!(Ref::of_bytes(b"test").short_hex().len(), 8);
    }

    #[test]
    fn display_is_full_hex() {
        let r = Ref::of_bytes(b"test");
        let display = format!("{r}");
        assert_eq!(display.len(), 64);
        assert_eq!(display, r.to_hex());
    }

    #[test]
    fn debug_uses_short_hex() {
        let r = Ref::of_bytes(b"test");
        assert_eq!(format!("{r:?}"), format!("Ref({})", r.short_hex()));
    }

    #[test]
    fn from_hex_rejects_wrong_length() {
        let err = Ref::from_hex("abcd").unwrap_err();
        assert_eq!(
            err,
            TypeError::InvalidLength {
                expected: 32,
                actual: 2
            }
        );
    }

    #[test]
    fn from_hex_rejects_garbage() {
        assert!(matches!(
            Ref::from_hex("zz"),
            Err(TypeError::InvalidHex(_))
        ));
    }

    #[test]
    fn parse_via_from_str() {
        let r = Ref::of_bytes(b"parse me");
        let parsed: Ref = r.to_hex().parse().unwrap();
        assert_eq!(parsed, r);
    }

    #[test]
    fn serde_json_encoding_is_stable() {
        let r = Ref::of_bytes(b"serde test");
        let json = serde_json::to_string(&r).unwrap();
        let parsed: Ref = serde_json::from_str(&json).unwrap();
        assert_eq!(r, parsed);
    }

    #[test]
    fn ordering_follows_bytes() {
        assert!(Ref::from_hash([0; 32]) < Ref::from_hash([1; 32]));
    }

    proptest! {
        #[test]
        fn hex_parse_accepts_every_digest(bytes in proptest::array::uniform32(any::<u8>())) {
            let r = Ref::from_hash(bytes);
            prop_assert_eq!(Ref::from_hex(&r.to_hex()).unwrap(), r);
        }
    }
}
