//! CLI configuration: parsed from a TOML file plus environment variable overrides.
//!
//! Priority: command-line flags > environment variables > config file > defaults.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use signer3_core::{CompressedPublicKey, Network};
use signer3_multisig::{Timelock, WalletConfig, DEFAULT_DESCRIPTION, DEFAULT_SIGNER3_PUBKEY};
use std::path::{Path, PathBuf};

/// Default config file, looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "signer3.toml";

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Signer3Config {
    /// General settings
    #[serde(default)]
    pub general: GeneralSection,

    /// Bitcoin network selection
    #[serde(default)]
    pub bitcoin: BitcoinSection,

    /// Co-signer key
    #[serde(default)]
    pub signer: SignerSection,

    /// Timelock defaults for `create`
    #[serde(default)]
    pub policy: PolicySection,

    /// Where and how exports are written
    #[serde(default)]
    pub output: OutputSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralSection {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GeneralSection {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BitcoinSection {
    /// "mainnet" or "testnet"
    #[serde(default = "default_network")]
    pub network: String,
}

impl Default for BitcoinSection {
    fn default() -> Self {
        Self {
            network: default_network(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignerSection {
    /// Signer3 compressed public key (66 hex chars)
    #[serde(default = "default_signer3_pubkey")]
    pub signer3_pubkey: String,
}

impl Default for SignerSection {
    fn default() -> Self {
        Self {
            signer3_pubkey: default_signer3_pubkey(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicySection {
    /// Add the CSV recovery branch by default
    #[serde(default)]
    pub include_timelock: bool,

    /// Relative timelock in blocks (default: 144, about one day)
    #[serde(default = "default_timelock_blocks")]
    pub timelock_blocks: u32,
}

impl Default for PolicySection {
    fn default() -> Self {
        Self {
            include_timelock: false,
            timelock_blocks: default_timelock_blocks(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputSection {
    /// Directory used by `create --save`
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,

    /// Description embedded in exports
    #[serde(default = "default_description")]
    pub description: String,
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            description: default_description(),
        }
    }
}

/// Settings given as `signer3 create` flags
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateOverrides {
    pub network: Option<Network>,
    pub signer3: Option<String>,
    /// `--timelock`
    pub timelock: bool,
    /// `--timelock-blocks`
    pub timelock_blocks: Option<u32>,
}

// ============================================================================
// Default value functions
// ============================================================================

fn default_log_level() -> String {
    "info".to_string()
}

fn default_network() -> String {
    Network::default().to_string()
}

fn default_signer3_pubkey() -> String {
    DEFAULT_SIGNER3_PUBKEY.to_string()
}

fn default_timelock_blocks() -> u32 {
    144
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_description() -> String {
    DEFAULT_DESCRIPTION.to_string()
}

// ============================================================================
// Loading & environment override
// ============================================================================

impl Signer3Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Signer3Config =
            toml::from_str(&contents).with_context(|| "Failed to parse TOML config")?;
        Ok(config)
    }

    /// Load from an explicit path, or from [`DEFAULT_CONFIG_FILE`] if present.
    ///
    /// A missing default file yields the built-in defaults; a missing
    /// explicit file is an error.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => {
                let path = Path::new(DEFAULT_CONFIG_FILE);
                if path.exists() {
                    Self::from_file(path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Apply environment variable overrides.
    ///
    /// Supported env vars:
    /// - `SIGNER3_LOG_LEVEL`
    /// - `SIGNER3_NETWORK`
    /// - `SIGNER3_PUBKEY`
    /// - `SIGNER3_INCLUDE_TIMELOCK`
    /// - `SIGNER3_TIMELOCK_BLOCKS`
    /// - `SIGNER3_OUTPUT_DIR`
    pub fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("SIGNER3_LOG_LEVEL") {
            self.general.log_level = v;
        }
        if let Ok(v) = std::env::var("SIGNER3_NETWORK") {
            self.bitcoin.network = v;
        }
        if let Ok(v) = std::env::var("SIGNER3_PUBKEY") {
            self.signer.signer3_pubkey = v;
        }
        if let Ok(v) = std::env::var("SIGNER3_INCLUDE_TIMELOCK") {
            if let Ok(flag) = v.parse::<bool>() {
                self.policy.include_timelock = flag;
            }
        }
        if let Ok(v) = std::env::var("SIGNER3_TIMELOCK_BLOCKS") {
            if let Ok(blocks) = v.parse::<u32>() {
                self.policy.timelock_blocks = blocks;
            }
        }
        if let Ok(v) = std::env::var("SIGNER3_OUTPUT_DIR") {
            self.output.dir = PathBuf::from(v);
        }
    }

    /// Apply `create` flags on top of file and environment settings.
    ///
    /// `--timelock-blocks` implies `--timelock`; `--timelock` alone keeps the
    /// configured block count.
    pub fn apply_create_overrides(&mut self, overrides: &CreateOverrides) {
        if let Some(network) = overrides.network {
            self.bitcoin.network = network.to_string();
        }
        if let Some(ref signer3) = overrides.signer3 {
            self.signer.signer3_pubkey = signer3.clone();
        }
        if overrides.timelock || overrides.timelock_blocks.is_some() {
            self.policy.include_timelock = true;
        }
        if let Some(blocks) = overrides.timelock_blocks {
            self.policy.timelock_blocks = blocks;
        }
    }

    /// Parse the configured network name.
    pub fn network(&self) -> Result<Network> {
        self.bitcoin
            .network
            .parse()
            .with_context(|| "bitcoin.network is invalid")
    }

    /// Parse the configured Signer3 key.
    pub fn signer3_key(&self) -> Result<CompressedPublicKey> {
        CompressedPublicKey::from_hex(self.signer.signer3_pubkey.trim())
            .with_context(|| "signer.signer3_pubkey is invalid")
    }

    /// Configured timelock, if the recovery branch is enabled.
    pub fn timelock_blocks(&self) -> Option<u32> {
        self.policy
            .include_timelock
            .then_some(self.policy.timelock_blocks)
    }

    /// Wallet construction settings derived from this config.
    pub fn wallet_config(&self) -> Result<WalletConfig> {
        Ok(WalletConfig::new(self.network()?, self.signer3_key()?))
    }

    /// Validate that the configuration is usable.
    pub fn validate(&self) -> Result<()> {
        self.network()?;
        self.signer3_key()?;

        // Checked even when the branch is disabled
        Timelock::from_blocks(self.policy.timelock_blocks)
            .with_context(|| "policy.timelock_blocks is out of range")?;

        anyhow::ensure!(
            !self.general.log_level.is_empty(),
            "general.log_level must not be empty"
        );

        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
