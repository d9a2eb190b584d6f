//! Signer3 Core
//!
//! Shared types and public key resolution for Signer3.
//!
//! # Key Inputs
//!
//! A participant key is supplied either as:
//! - an extended public key (`xpub` on mainnet, `tpub` on testnet), from
//!   which the child at `0/0` is derived, or
//! - a 66-character hex compressed public key, used as-is.
//!
//! Either way the result is a 33-byte [`CompressedPublicKey`].

pub mod keys;
pub mod network;

pub use keys::{resolve, CompressedPublicKey, KeyFormatError, KeyInput, COMPRESSED_KEY_LEN};
pub use network::{Network, NetworkError};
