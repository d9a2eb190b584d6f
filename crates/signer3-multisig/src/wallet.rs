//! Wallet assembly
//!
//! Resolves the borrower and lender keys, combines them with the Signer3
//! co-signer key from [`WalletConfig`], and produces an immutable
//! [`WalletDescriptor`].

use bitcoin::{Address, Script, ScriptBuf};
use serde::{Deserialize, Serialize};
use signer3_core::{resolve, CompressedPublicKey, KeyFormatError, Network};
use std::fmt;
use thiserror::Error;

use crate::address::{derive_address, AddressEncodingError};
use crate::policy::{MultisigPolicy, PolicyError, Timelock, KEY_COUNT};

/// Signer3 co-signer key used when no other key is configured
pub const DEFAULT_SIGNER3_PUBKEY: &str =
    "02e79c4eb45764bd015542f81cc475653a72b0f131243a3e4f68fdb8dde3a4574f";

/// Which participant a key belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyRole {
    Borrower,
    Lender,
    Signer3,
}

impl fmt::Display for KeyRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyRole::Borrower => write!(f, "borrower"),
            KeyRole::Lender => write!(f, "lender"),
            KeyRole::Signer3 => write!(f, "signer3"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WalletError {
    #[error("Invalid {role} key: {source}")]
    Key {
        role: KeyRole,
        #[source]
        source: KeyFormatError,
    },

    #[error(transparent)]
    Policy(#[from] PolicyError),

    #[error(transparent)]
    Address(#[from] AddressEncodingError),
}

impl WalletError {
    /// The participant whose key was rejected, if this is a key error
    pub fn role(&self) -> Option<KeyRole> {
        match self {
            WalletError::Key { role, .. } => Some(*role),
            _ => None,
        }
    }

    fn key(role: KeyRole) -> impl FnOnce(KeyFormatError) -> Self {
        move |source| WalletError::Key { role, source }
    }
}

/// Build-time settings supplied by the embedding application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletConfig {
    /// Network the address is encoded for and extended keys must belong to
    pub network: Network,
    /// Co-signer key that completes the 2-of-3 set
    pub signer3: CompressedPublicKey,
}

impl WalletConfig {
    pub fn new(network: Network, signer3: CompressedPublicKey) -> Self {
        Self { network, signer3 }
    }

    /// Use [`DEFAULT_SIGNER3_PUBKEY`] as the co-signer.
    pub fn with_default_signer3(network: Network) -> Result<Self, WalletError> {
        let signer3 = CompressedPublicKey::from_hex(DEFAULT_SIGNER3_PUBKEY)
            .map_err(WalletError::key(KeyRole::Signer3))?;
        Ok(Self::new(network, signer3))
    }
}

/// A generated 2-of-3 P2WSH wallet.
///
/// The redeem script and witness script are the same bytes: the output is
/// native segwit with no P2SH wrapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletDescriptor {
    address: Address,
    policy: MultisigPolicy,
    script: ScriptBuf,
    borrower: CompressedPublicKey,
    lender: CompressedPublicKey,
    signer3: CompressedPublicKey,
    network: Network,
}

impl WalletDescriptor {
    /// Build a wallet from already-resolved keys.
    pub fn from_keys(
        borrower: CompressedPublicKey,
        lender: CompressedPublicKey,
        signer3: CompressedPublicKey,
        timelock: Option<Timelock>,
        network: Network,
    ) -> Result<Self, WalletError> {
        let policy = MultisigPolicy::new([borrower, lender, signer3], timelock);
        let script = policy.to_script();
        let address = derive_address(&script, network)?;

        Ok(Self {
            address,
            policy,
            script,
            borrower,
            lender,
            signer3,
            network,
        })
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn redeem_script(&self) -> &Script {
        &self.script
    }

    pub fn witness_script(&self) -> &Script {
        &self.script
    }

    pub fn redeem_script_hex(&self) -> String {
        hex::encode(self.script.as_bytes())
    }

    pub fn witness_script_hex(&self) -> String {
        hex::encode(self.script.as_bytes())
    }

    /// Output script to pay into this wallet
    pub fn script_pubkey(&self) -> ScriptBuf {
        self.address.script_pubkey()
    }

    pub fn borrower(&self) -> CompressedPublicKey {
        self.borrower
    }

    pub fn lender(&self) -> CompressedPublicKey {
        self.lender
    }

    pub fn signer3(&self) -> CompressedPublicKey {
        self.signer3
    }

    /// Keys in the order they appear in the script
    pub fn sorted_keys(&self) -> &[CompressedPublicKey; KEY_COUNT] {
        self.policy.keys()
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn timelock(&self) -> Option<Timelock> {
        self.policy.timelock()
    }

    pub fn includes_timelock(&self) -> bool {
        self.policy.is_timelocked()
    }

    pub fn policy(&self) -> &MultisigPolicy {
        &self.policy
    }
}

/// Build a 2-of-3 wallet from the borrower's and lender's key inputs.
///
/// Each key input is an `xpub`/`tpub` (child `0/0` is used) or a 66-character
/// hex compressed public key. `timelock_blocks` adds the delayed recovery
/// branch when present.
pub fn build_multisig_wallet(
    borrower_key: &str,
    lender_key: &str,
    timelock_blocks: Option<u32>,
    config: &WalletConfig,
) -> Result<WalletDescriptor, WalletError> {
    let borrower =
        resolve(borrower_key, config.network).map_err(WalletError::key(KeyRole::Borrower))?;
    let lender = resolve(lender_key, config.network).map_err(WalletError::key(KeyRole::Lender))?;
    let timelock = timelock_blocks.map(Timelock::from_blocks).transpose()?;

    WalletDescriptor::from_keys(borrower, lender, config.signer3, timelock, config.network)
}
