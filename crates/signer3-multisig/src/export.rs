//! WalletExport: the persisted JSON form of a generated wallet.
//!
//! Holds everything needed to fund the wallet and later build spends from
//! it. Re-importing rebuilds the script from the recorded keys and refuses
//! the file if the recorded address or scripts disagree.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use signer3_core::{CompressedPublicKey, KeyFormatError, Network};
use thiserror::Error;

use crate::descriptor::{output_descriptor, DescriptorError};
use crate::policy::{PolicyError, Timelock};
use crate::wallet::{KeyRole, WalletDescriptor, WalletError};

/// Current export format version
pub const EXPORT_VERSION: u32 = 1;

/// Description written when the caller does not supply one
pub const DEFAULT_DESCRIPTION: &str = "2-of-3 Multisig Wallet created with Signer3";

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Unsupported export version {0}")]
    UnsupportedVersion(u32),

    #[error("Invalid {role} key in export: {source}")]
    Key {
        role: KeyRole,
        #[source]
        source: KeyFormatError,
    },

    #[error("Invalid timelock in export: {0}")]
    Timelock(#[from] PolicyError),

    #[error("includeTimelock is {include} but timelockBlocks is {blocks:?}")]
    InconsistentTimelock { include: bool, blocks: Option<u32> },

    #[error("Wallet rebuild failed: {0}")]
    Wallet(#[from] WalletError),

    #[error("{field} mismatch: computed {computed} but export says {recorded}. Export may be corrupt or tampered.")]
    Mismatch {
        field: &'static str,
        computed: String,
        recorded: String,
    },

    #[error("outputDescriptor recorded for a wallet with no descriptor form: {0}")]
    UnexpectedDescriptor(DescriptorError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Flat, serializable record of a generated wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletExport {
    /// Format version
    #[serde(default = "default_version")]
    pub version: u32,
    /// P2WSH address
    pub wallet_address: String,
    /// Redeem script (hex)
    pub redeem_script: String,
    /// Witness script (hex), identical to the redeem script
    pub witness_script: String,
    /// Borrower's resolved compressed public key (hex)
    pub borrower_pubkey: String,
    /// Lender's resolved compressed public key (hex)
    pub lender_pubkey: String,
    /// Signer3 co-signer compressed public key (hex)
    pub signer3_pubkey: String,
    pub network: Network,
    pub include_timelock: bool,
    /// CSV delay of the recovery branch; `null` for standard wallets
    #[serde(default)]
    pub timelock_blocks: Option<u32>,
    /// `wsh(sortedmulti(...))` descriptor for standard wallets with valid keys
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_descriptor: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default = "default_description")]
    pub description: String,
}

fn default_version() -> u32 {
    EXPORT_VERSION
}

fn default_description() -> String {
    DEFAULT_DESCRIPTION.to_string()
}

impl WalletDescriptor {
    /// Snapshot this wallet into its persisted form.
    pub fn export(&self, created_at: DateTime<Utc>, description: impl Into<String>) -> WalletExport {
        WalletExport {
            version: EXPORT_VERSION,
            wallet_address: self.address().to_string(),
            redeem_script: self.redeem_script_hex(),
            witness_script: self.witness_script_hex(),
            borrower_pubkey: self.borrower().to_hex(),
            lender_pubkey: self.lender().to_hex(),
            signer3_pubkey: self.signer3().to_hex(),
            network: self.network(),
            include_timelock: self.includes_timelock(),
            timelock_blocks: self.timelock().map(u32::from),
            output_descriptor: output_descriptor(self.policy())
                .ok()
                .map(|d| d.to_string()),
            created_at,
            description: description.into(),
        }
    }
}

impl WalletExport {
    pub fn to_json_pretty(&self) -> Result<String, ExportError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, ExportError> {
        Ok(serde_json::from_str(json)?)
    }

    /// File name used when saving: `signer3-multisig-<unix millis>.json`
    pub fn default_file_name(&self) -> String {
        format!("signer3-multisig-{}.json", self.created_at.timestamp_millis())
    }

    /// Rebuild the wallet from the recorded keys and verify it matches.
    ///
    /// The recorded address, redeem script, witness script and (if present)
    /// output descriptor must all equal what the keys, network and timelock
    /// produce.
    pub fn reconstruct(&self) -> Result<WalletDescriptor, ExportError> {
        if self.version > EXPORT_VERSION {
            return Err(ExportError::UnsupportedVersion(self.version));
        }

        let borrower = parse_key(&self.borrower_pubkey, KeyRole::Borrower)?;
        let lender = parse_key(&self.lender_pubkey, KeyRole::Lender)?;
        let signer3 = parse_key(&self.signer3_pubkey, KeyRole::Signer3)?;

        let timelock = match (self.include_timelock, self.timelock_blocks) {
            (true, Some(blocks)) => Some(Timelock::from_blocks(blocks)?),
            (false, None) => None,
            (include, blocks) => {
                return Err(ExportError::InconsistentTimelock { include, blocks });
            }
        };

        let wallet = WalletDescriptor::from_keys(borrower, lender, signer3, timelock, self.network)?;

        check_field("address", wallet.address().to_string(), &self.wallet_address)?;
        check_field("redeemScript", wallet.redeem_script_hex(), &self.redeem_script)?;
        check_field("witnessScript", wallet.witness_script_hex(), &self.witness_script)?;

        if let Some(recorded) = &self.output_descriptor {
            let computed = output_descriptor(wallet.policy())
                .map_err(ExportError::UnexpectedDescriptor)?
                .to_string();
            // Checksum is case-sensitive, so compare exactly
            if computed != *recorded {
                return Err(ExportError::Mismatch {
                    field: "outputDescriptor",
                    computed,
                    recorded: recorded.clone(),
                });
            }
        }

        Ok(wallet)
    }
}

fn parse_key(hex_key: &str, role: KeyRole) -> Result<CompressedPublicKey, ExportError> {
    CompressedPublicKey::from_hex(hex_key).map_err(|source| ExportError::Key { role, source })
}

fn check_field(field: &'static str, computed: String, recorded: &str) -> Result<(), ExportError> {
    if computed.eq_ignore_ascii_case(recorded) {
        return Ok(());
    }
    Err(ExportError::Mismatch {
        field,
        computed,
        recorded: recorded.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::MultisigPolicy;
    use crate::test_utils::{key_a, key_b, key_c, test_keypair};
    use crate::wallet::{build_multisig_wallet, WalletConfig};
    use chrono::TimeZone;

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap()
    }

    fn sample_wallet(timelock: Option<u32>) -> WalletDescriptor {
        let config = WalletConfig::new(Network::Testnet, key_c());
        build_multisig_wallet(&key_a().to_hex(), &key_b().to_hex(), timelock, &config).unwrap()
    }

    #[test]
    fn test_export_fields() {
        let wallet = sample_wallet(Some(144));
        let export = wallet.export(fixed_time(), DEFAULT_DESCRIPTION);

        assert_eq!(export.version, EXPORT_VERSION);
        assert_eq!(export.wallet_address, wallet.address().to_string());
        assert_eq!(export.redeem_script, export.witness_script);
        assert_eq!(export.borrower_pubkey, key_a().to_hex());
        assert_eq!(export.lender_pubkey, key_b().to_hex());
        assert_eq!(export.signer3_pubkey, key_c().to_hex());
        assert!(export.include_timelock);
        assert_eq!(export.timelock_blocks, Some(144));
        assert!(export.output_descriptor.is_none());
    }

    #[test]
    fn test_standard_export_has_descriptor() {
        let export = sample_wallet(None).export(fixed_time(), "loan #1");
        let desc = export.output_descriptor.as_deref().unwrap();
        assert!(desc.starts_with("wsh(sortedmulti(2,"));
        assert_eq!(export.description, "loan #1");
    }

    #[test]
    fn test_json_uses_camel_case() {
        let export = sample_wallet(Some(144)).export(fixed_time(), DEFAULT_DESCRIPTION);
        let value: serde_json::Value =
            serde_json::from_str(&export.to_json_pretty().unwrap()).unwrap();

        for field in [
            "walletAddress",
            "redeemScript",
            "witnessScript",
            "borrowerPubkey",
            "lenderPubkey",
            "signer3Pubkey",
            "includeTimelock",
            "timelockBlocks",
            "createdAt",
            "description",
        ] {
            assert!(value.get(field).is_some(), "missing field {}", field);
        }
        assert_eq!(value["network"], "testnet");
        assert_eq!(value["timelockBlocks"], 144);
    }

    #[test]
    fn test_json_roundtrip_and_reconstruct() {
        let wallet = sample_wallet(Some(1008));
        let json = wallet
            .export(fixed_time(), DEFAULT_DESCRIPTION)
            .to_json_pretty()
            .unwrap();

        let restored = WalletExport::from_json(&json).unwrap();
        assert_eq!(restored.created_at, fixed_time());

        let rebuilt = restored.reconstruct().unwrap();
        assert_eq!(rebuilt, wallet);
    }

    #[test]
    fn test_minimal_json_still_parses() {
        let wallet = sample_wallet(None);
        let json = serde_json::json!({
            "walletAddress": wallet.address().to_string(),
            "redeemScript": wallet.redeem_script_hex(),
            "witnessScript": wallet.witness_script_hex(),
            "borrowerPubkey": key_a().to_hex(),
            "lenderPubkey": key_b().to_hex(),
            "signer3Pubkey": key_c().to_hex(),
            "network": "testnet",
            "includeTimelock": false,
            "createdAt": "2025-01-15T12:00:00Z"
        });
        let export: WalletExport = serde_json::from_value(json).unwrap();
        assert_eq!(export.version, EXPORT_VERSION);
        assert_eq!(export.description, DEFAULT_DESCRIPTION);
        assert!(export.reconstruct().is_ok());
    }

    #[test]
    fn test_reconstruct_detects_address_tampering() {
        let mut export = sample_wallet(None).export(fixed_time(), DEFAULT_DESCRIPTION);
        export.wallet_address = sample_wallet(Some(144)).address().to_string();

        let err = export.reconstruct().unwrap_err();
        assert!(matches!(err, ExportError::Mismatch { field: "address", .. }));
        assert!(err.to_string().contains("tampered"));
    }

    #[test]
    fn test_reconstruct_detects_script_tampering() {
        let mut export = sample_wallet(Some(144)).export(fixed_time(), DEFAULT_DESCRIPTION);
        export.witness_script = sample_wallet(None).witness_script_hex();

        let err = export.reconstruct().unwrap_err();
        assert!(matches!(
            err,
            ExportError::Mismatch {
                field: "witnessScript",
                ..
            }
        ));
    }

    #[test]
    fn test_reconstruct_detects_descriptor_tampering() {
        let mut export = sample_wallet(None).export(fixed_time(), DEFAULT_DESCRIPTION);
        // Same shape, but the lender key swapped for 4·G
        let foreign = MultisigPolicy::standard([key_a(), test_keypair(4).1, key_c()]);
        export.output_descriptor = Some(output_descriptor(&foreign).unwrap().to_string());

        let err = export.reconstruct().unwrap_err();
        assert!(matches!(
            err,
            ExportError::Mismatch {
                field: "outputDescriptor",
                ..
            }
        ));
    }

    #[test]
    fn test_reconstruct_rejects_descriptor_case_change() {
        let mut export = sample_wallet(None).export(fixed_time(), DEFAULT_DESCRIPTION);
        let desc = export.output_descriptor.take().unwrap();
        export.output_descriptor = Some(desc.to_uppercase());

        assert!(matches!(
            export.reconstruct(),
            Err(ExportError::Mismatch {
                field: "outputDescriptor",
                ..
            })
        ));
    }

    #[test]
    fn test_reconstruct_rejects_descriptor_on_timelocked_wallet() {
        let mut export = sample_wallet(Some(144)).export(fixed_time(), DEFAULT_DESCRIPTION);
        export.output_descriptor = sample_wallet(None)
            .export(fixed_time(), DEFAULT_DESCRIPTION)
            .output_descriptor;
        assert!(export.output_descriptor.is_some());

        assert!(matches!(
            export.reconstruct(),
            Err(ExportError::UnexpectedDescriptor(DescriptorError::Timelocked))
        ));
    }

    #[test]
    fn test_reconstruct_rejects_descriptor_with_off_curve_key() {
        let off_curve = CompressedPublicKey::from_hex(&format!("02{}", "bb".repeat(32))).unwrap();
        let config = WalletConfig::new(Network::Testnet, off_curve);
        let wallet =
            build_multisig_wallet(&key_a().to_hex(), &key_b().to_hex(), None, &config).unwrap();
        let mut export = wallet.export(fixed_time(), DEFAULT_DESCRIPTION);
        assert!(export.output_descriptor.is_none());

        export.output_descriptor = sample_wallet(None)
            .export(fixed_time(), DEFAULT_DESCRIPTION)
            .output_descriptor;
        assert!(matches!(
            export.reconstruct(),
            Err(ExportError::UnexpectedDescriptor(
                DescriptorError::InvalidPoint(k)
            )) if k == off_curve
        ));
    }

    #[test]
    fn test_standard_export_writes_null_timelock() {
        let export = sample_wallet(None).export(fixed_time(), DEFAULT_DESCRIPTION);
        let value: serde_json::Value =
            serde_json::from_str(&export.to_json_pretty().unwrap()).unwrap();

        assert_eq!(value["includeTimelock"], false);
        assert!(value.get("timelockBlocks").unwrap().is_null());
        assert_eq!(WalletExport::from_json(&export.to_json_pretty().unwrap()).unwrap(), export);
    }

    #[test]
    fn test_reconstruct_detects_timelock_change() {
        let mut export = sample_wallet(Some(144)).export(fixed_time(), DEFAULT_DESCRIPTION);
        export.timelock_blocks = Some(145);
        assert!(matches!(
            export.reconstruct(),
            Err(ExportError::Mismatch { .. })
        ));
    }

    #[test]
    fn test_reconstruct_inconsistent_timelock_flags() {
        let mut export = sample_wallet(None).export(fixed_time(), DEFAULT_DESCRIPTION);
        export.include_timelock = true;
        assert!(matches!(
            export.reconstruct(),
            Err(ExportError::InconsistentTimelock {
                include: true,
                blocks: None
            })
        ));
    }

    #[test]
    fn test_reconstruct_invalid_key() {
        let mut export = sample_wallet(None).export(fixed_time(), DEFAULT_DESCRIPTION);
        export.lender_pubkey = "deadbeef".into();
        assert!(matches!(
            export.reconstruct(),
            Err(ExportError::Key {
                role: KeyRole::Lender,
                ..
            })
        ));
    }

    #[test]
    fn test_reconstruct_rejects_future_version() {
        let mut export = sample_wallet(None).export(fixed_time(), DEFAULT_DESCRIPTION);
        export.version = EXPORT_VERSION + 1;
        assert!(matches!(
            export.reconstruct(),
            Err(ExportError::UnsupportedVersion(2))
        ));
    }

    #[test]
    fn test_default_file_name() {
        let export = sample_wallet(None).export(fixed_time(), DEFAULT_DESCRIPTION);
        assert_eq!(
            export.default_file_name(),
            format!("signer3-multisig-{}.json", fixed_time().timestamp_millis())
        );
    }
}
