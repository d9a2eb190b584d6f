//! Target network for generated wallets

use bitcoin::address::KnownHrp;
use bitcoin::NetworkKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NetworkError {
    #[error("Unknown network: {0} (expected mainnet or testnet)")]
    Unknown(String),
}

/// Bitcoin network a wallet is built for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    #[default]
    Testnet,
}

impl Network {
    /// Every supported network
    pub const ALL: [Network; 2] = [Network::Mainnet, Network::Testnet];

    /// Canonical lowercase name, as used in exports and config files
    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Mainnet => "mainnet",
            Network::Testnet => "testnet",
        }
    }

    /// Bech32 human-readable part for segwit addresses (`bc` / `tb`)
    pub fn hrp(self) -> KnownHrp {
        match self {
            Network::Mainnet => KnownHrp::Mainnet,
            Network::Testnet => KnownHrp::Testnets,
        }
    }

    /// Extended key version kind expected for this network
    pub fn key_kind(self) -> NetworkKind {
        match self {
            Network::Mainnet => NetworkKind::Main,
            Network::Testnet => NetworkKind::Test,
        }
    }

    /// Base58 prefix of extended public keys on this network
    pub fn xpub_prefix(self) -> &'static str {
        match self {
            Network::Mainnet => "xpub",
            Network::Testnet => "tpub",
        }
    }

    pub(crate) fn from_key_kind(kind: NetworkKind) -> Self {
        match kind {
            NetworkKind::Main => Network::Mainnet,
            NetworkKind::Test => Network::Testnet,
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Network {
    type Err = NetworkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mainnet" | "bitcoin" => Ok(Network::Mainnet),
            "testnet" | "testnet3" => Ok(Network::Testnet),
            other => Err(NetworkError::Unknown(other.to_string())),
        }
    }
}
