//! Public key resolution
//!
//! Turns a participant's key input into the 33-byte compressed public key
//! that goes into the multisig script.
//!
//! # Accepted inputs
//!
//! - `xpub...` / `tpub...`: Base58Check extended public key. The version
//!   bytes must match the requested network. The child at `0/0` is used.
//! - 66 hex characters starting with `02` or `03`: a compressed public key.
//!
//! Uncompressed (65-byte) keys are rejected on every path.

use bitcoin::bip32::{ChildNumber, Xpub};
use bitcoin::secp256k1::{self, Secp256k1};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::network::Network;

/// Length of a compressed secp256k1 public key
pub const COMPRESSED_KEY_LEN: usize = 33;

/// Non-hardened child path derived from extended keys: `0/0`
const CHILD_PATH: [ChildNumber; 2] = [
    ChildNumber::Normal { index: 0 },
    ChildNumber::Normal { index: 0 },
];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyFormatError {
    #[error("Invalid key format: expected 33-byte hex key (66 characters), got {0} characters")]
    InvalidLength(usize),

    #[error("Invalid key format: not valid hex ({0})")]
    InvalidHex(String),

    #[error("Invalid key format: compressed key must start with 0x02 or 0x03, got 0x{0:02x}")]
    InvalidPrefix(u8),

    #[error("Invalid key format: bad extended public key ({0})")]
    InvalidXpub(String),

    #[error("Invalid key format: extended key is for {found} but {expected} was requested")]
    NetworkMismatch { expected: Network, found: Network },

    #[error("Child key derivation failed: {0}")]
    Derivation(String),
}

/// A 33-byte compressed public key (`0x02`/`0x03` prefix + x-coordinate).
///
/// Ordering is lexicographic over the raw bytes, which is the canonical key
/// order used when assembling multisig scripts.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CompressedPublicKey([u8; COMPRESSED_KEY_LEN]);

impl CompressedPublicKey {
    /// Parse from raw bytes. Only the length and prefix byte are checked.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, KeyFormatError> {
        if bytes.len() != COMPRESSED_KEY_LEN {
            return Err(KeyFormatError::InvalidLength(bytes.len() * 2));
        }
        if bytes[0] != 0x02 && bytes[0] != 0x03 {
            return Err(KeyFormatError::InvalidPrefix(bytes[0]));
        }
        let mut key = [0u8; COMPRESSED_KEY_LEN];
        key.copy_from_slice(bytes);
        Ok(Self(key))
    }

    /// Parse from a 66-character hex string.
    pub fn from_hex(s: &str) -> Result<Self, KeyFormatError> {
        if s.len() != COMPRESSED_KEY_LEN * 2 {
            return Err(KeyFormatError::InvalidLength(s.len()));
        }
        let bytes = hex::decode(s).map_err(|e| KeyFormatError::InvalidHex(e.to_string()))?;
        Self::from_slice(&bytes)
    }

    pub fn as_bytes(&self) -> &[u8; COMPRESSED_KEY_LEN] {
        &self.0
    }

    pub fn to_bytes(self) -> [u8; COMPRESSED_KEY_LEN] {
        self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Whether the bytes encode a point on secp256k1.
    ///
    /// Resolution does not require this; it is reported so front ends can
    /// warn about keys that could never produce a signature.
    pub fn is_valid_point(&self) -> bool {
        secp256k1::PublicKey::from_slice(&self.0).is_ok()
    }

    /// Convert to a `bitcoin::PublicKey`, failing if the point is invalid.
    pub fn to_public_key(&self) -> Result<bitcoin::PublicKey, secp256k1::Error> {
        secp256k1::PublicKey::from_slice(&self.0).map(bitcoin::PublicKey::new)
    }
}

impl From<secp256k1::PublicKey> for CompressedPublicKey {
    fn from(pk: secp256k1::PublicKey) -> Self {
        Self(pk.serialize())
    }
}

impl FromStr for CompressedPublicKey {
    type Err = KeyFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl fmt::Display for CompressedPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for CompressedPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CompressedPublicKey({})", self.to_hex())
    }
}

impl Serialize for CompressedPublicKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for CompressedPublicKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// A key input whose variant has been determined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyInput {
    /// Extended public key; the `0/0` child is used
    Extended(Xpub),
    /// Compressed public key used directly
    Raw(CompressedPublicKey),
}

impl KeyInput {
    /// Classify and decode a key string for `network`.
    ///
    /// Extended keys are recognized by the extended-key prefix of any
    /// network and must then match `network`. Anything else must be a
    /// 66-character hex compressed key.
    pub fn parse(input: &str, network: Network) -> Result<Self, KeyFormatError> {
        let extended = Network::ALL
            .iter()
            .any(|n| input.starts_with(n.xpub_prefix()));
        if extended {
            let xpub =
                Xpub::from_str(input).map_err(|e| KeyFormatError::InvalidXpub(e.to_string()))?;
            if xpub.network != network.key_kind() {
                return Err(KeyFormatError::NetworkMismatch {
                    expected: network,
                    found: Network::from_key_kind(xpub.network),
                });
            }
            return Ok(KeyInput::Extended(xpub));
        }

        CompressedPublicKey::from_hex(input).map(KeyInput::Raw)
    }

    /// Produce the compressed public key for this input.
    pub fn resolve(&self) -> Result<CompressedPublicKey, KeyFormatError> {
        match self {
            KeyInput::Raw(key) => Ok(*key),
            KeyInput::Extended(xpub) => {
                let secp = Secp256k1::verification_only();
                let child = xpub
                    .derive_pub(&secp, &CHILD_PATH)
                    .map_err(|e| KeyFormatError::Derivation(e.to_string()))?;
                Ok(CompressedPublicKey::from(child.public_key))
            }
        }
    }
}

/// Resolve a key string to a compressed public key for `network`.
pub fn resolve(input: &str, network: Network) -> Result<CompressedPublicKey, KeyFormatError> {
    KeyInput::parse(input, network)?.resolve()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// BIP-32 test vector 1 master xpub
    const TV1_XPUB: &str = "xpub661MyMwAqRbcFtXgS5sYJABqqG9YLmC4Q1Rdap9gSE8NqtwybGhePY2gZ29ESFjqJoCu1Rupje8YtGqsefD265TMg7usUDFdp6W1EGMcet8";

    /// Same key material as TV1_XPUB with testnet version bytes
    const TV1_TPUB: &str = "tpubD6NzVbkrYhZ4XgiXtGrdW5XDAPFCL9h7we1vwNCpn8tGbBcgfVYjXyhWo4E1xkh56hjod1RhGjxbaTLV3X4FyWuejifB9jusQ46QzG87VKp";

    /// Child 0/0 of TV1_XPUB
    const TV1_CHILD_0_0: &str =
        "02756de182c5dd4b717ea87e693006da62dbb3cddaa4a5cad2ed1f5bbab755f0f5";

    const GENERATOR: &str = "0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798";

    #[test]
    fn test_raw_key_roundtrip() {
        let key = resolve(GENERATOR, Network::Testnet).unwrap();
        assert_eq!(key.to_hex(), GENERATOR);
        assert_eq!(key.as_bytes().len(), COMPRESSED_KEY_LEN);

        // Network does not matter for raw keys
        assert_eq!(resolve(GENERATOR, Network::Mainnet).unwrap(), key);
    }

    #[test]
    fn test_raw_key_prefix_03() {
        let hex_key = format!("03{}", "11".repeat(32));
        let key = resolve(&hex_key, Network::Mainnet).unwrap();
        assert_eq!(key.as_bytes()[0], 0x03);
    }

    #[test]
    fn test_xpub_derives_child_0_0() {
        let key = resolve(TV1_XPUB, Network::Mainnet).unwrap();
        assert_eq!(key.to_hex(), TV1_CHILD_0_0);
        assert!(key.is_valid_point());
    }

    #[test]
    fn test_tpub_derives_same_child() {
        let key = resolve(TV1_TPUB, Network::Testnet).unwrap();
        assert_eq!(key.to_hex(), TV1_CHILD_0_0);
    }

    #[test]
    fn test_xpub_on_testnet_rejected() {
        let err = resolve(TV1_XPUB, Network::Testnet).unwrap_err();
        assert_eq!(
            err,
            KeyFormatError::NetworkMismatch {
                expected: Network::Testnet,
                found: Network::Mainnet,
            }
        );
    }

    #[test]
    fn test_tpub_on_mainnet_rejected() {
        let err = resolve(TV1_TPUB, Network::Mainnet).unwrap_err();
        assert!(matches!(err, KeyFormatError::NetworkMismatch { .. }));
    }

    #[test]
    fn test_bad_checksum_rejected() {
        let mut corrupted = TV1_TPUB.to_string();
        corrupted.pop();
        corrupted.push('q');
        let err = resolve(&corrupted, Network::Testnet).unwrap_err();
        assert!(matches!(err, KeyFormatError::InvalidXpub(_)));
    }

    #[test]
    fn test_invalid_key_rejected() {
        let err = resolve("invalid-key", Network::Testnet).unwrap_err();
        assert_eq!(err, KeyFormatError::InvalidLength(11));
    }

    #[test]
    fn test_32_byte_hex_rejected() {
        let err = resolve(&"ab".repeat(32), Network::Testnet).unwrap_err();
        assert_eq!(err, KeyFormatError::InvalidLength(64));
    }

    #[test]
    fn test_uncompressed_key_rejected() {
        let uncompressed = format!("04{}", "ab".repeat(64));
        let err = resolve(&uncompressed, Network::Testnet).unwrap_err();
        assert_eq!(err, KeyFormatError::InvalidLength(130));
    }

    #[test]
    fn test_bad_prefix_rejected() {
        let err = resolve(&format!("04{}", "ab".repeat(32)), Network::Testnet).unwrap_err();
        assert_eq!(err, KeyFormatError::InvalidPrefix(0x04));
    }

    #[test]
    fn test_non_hex_rejected() {
        let err = resolve(&format!("02{}", "zz".repeat(32)), Network::Testnet).unwrap_err();
        assert!(matches!(err, KeyFormatError::InvalidHex(_)));
    }

    #[test]
    fn test_key_input_parse_variants() {
        assert!(matches!(
            KeyInput::parse(TV1_XPUB, Network::Mainnet).unwrap(),
            KeyInput::Extended(_)
        ));
        assert!(matches!(
            KeyInput::parse(GENERATOR, Network::Mainnet).unwrap(),
            KeyInput::Raw(_)
        ));
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let a = resolve(TV1_XPUB, Network::Mainnet).unwrap();
        let b = resolve(TV1_XPUB, Network::Mainnet).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_ordering_is_bytewise() {
        let low = CompressedPublicKey::from_hex(&format!("02{}", "ff".repeat(32))).unwrap();
        let high = CompressedPublicKey::from_hex(&format!("03{}", "00".repeat(32))).unwrap();
        assert!(low < high);
    }

    #[test]
    fn test_is_valid_point() {
        let on_curve = CompressedPublicKey::from_hex(GENERATOR).unwrap();
        assert!(on_curve.is_valid_point());
        assert!(on_curve.to_public_key().is_ok());

        // x = 0xbb..bb has no matching y on secp256k1
        let off_curve = CompressedPublicKey::from_hex(&format!("02{}", "bb".repeat(32))).unwrap();
        assert!(!off_curve.is_valid_point());
        assert!(off_curve.to_public_key().is_err());
    }

    #[test]
    fn test_serde_as_hex_string() {
        let key = CompressedPublicKey::from_hex(GENERATOR).unwrap();
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, format!("\"{}\"", GENERATOR));
        let restored: CompressedPublicKey = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, key);

        assert!(serde_json::from_str::<CompressedPublicKey>("\"02abcd\"").is_err());
    }
}
