//! Signer3 Multisig
//!
//! Deterministic 2-of-3 P2WSH wallets for a borrower, a lender and the
//! Signer3 co-signer, with an optional relative-timelock recovery branch.
//!
//! # Pipeline
//!
//! 1. Resolve the borrower and lender key inputs (`signer3_core::resolve`)
//! 2. Sort the three keys and assemble the witness script ([`policy`])
//! 3. Hash the script into a P2WSH bech32 address ([`address`])
//!
//! # Example
//!
//! ```text
//! let config = WalletConfig::with_default_signer3(Network::Testnet)?;
//! let wallet = build_multisig_wallet(borrower, lender, Some(144), &config)?;
//! println!("{}", wallet.address());
//! ```

pub mod address;
pub mod descriptor;
pub mod export;
pub mod policy;
pub mod wallet;

#[cfg(test)]
pub(crate) mod test_utils;

pub use address::{derive_address, witness_program, AddressEncodingError};
pub use descriptor::{output_descriptor, DescriptorError};
pub use export::{ExportError, WalletExport, DEFAULT_DESCRIPTION, EXPORT_VERSION};
pub use policy::{build_script, MultisigPolicy, PolicyError, Timelock};
pub use wallet::{
    build_multisig_wallet, KeyRole, WalletConfig, WalletDescriptor, WalletError,
    DEFAULT_SIGNER3_PUBKEY,
};
