//! Signer3 CLI: build and verify 2-of-3 borrower/lender/Signer3 wallets.
//!
//! # Usage
//!
//! ```bash
//! signer3 create --borrower <xpub|hex> --lender <xpub|hex> --timelock
//! signer3 create --borrower ... --lender ... --network mainnet --save
//! signer3 verify signer3-multisig-1736942400000.json
//! signer3 resolve-key tpubD6Nz...
//! signer3 --config /etc/signer3.toml config --validate
//! ```

mod config;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use signer3_core::{CompressedPublicKey, Network};
use signer3_multisig::{build_multisig_wallet, KeyRole, WalletDescriptor, WalletExport};
use std::path::{Path, PathBuf};

use crate::config::{CreateOverrides, Signer3Config};

#[derive(Parser, Debug)]
#[command(name = "signer3", version, about = "Deterministic 2-of-3 P2WSH multisig builder")]
struct Cli {
    /// Config file (default: ./signer3.toml if present)
    #[arg(short, long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build a wallet and print or save its JSON export
    Create(CreateArgs),

    /// Check that an export file matches its recorded keys
    Verify {
        /// Export file to check
        file: PathBuf,
    },

    /// Resolve an xpub/tpub or hex key to its compressed public key
    ResolveKey {
        /// Extended public key or 66-char hex key
        key: String,

        #[arg(long)]
        network: Option<Network>,
    },

    /// Print the effective configuration
    Config {
        /// Only validate, exit non-zero on error
        #[arg(long)]
        validate: bool,
    },
}

#[derive(Args, Debug)]
struct CreateArgs {
    /// Borrower key: xpub/tpub or 66-char compressed hex
    #[arg(long)]
    borrower: String,

    /// Lender key: xpub/tpub or 66-char compressed hex
    #[arg(long)]
    lender: String,

    #[arg(long)]
    network: Option<Network>,

    /// Add the CSV-delayed spending branch
    #[arg(long)]
    timelock: bool,

    /// Relative delay in blocks (implies --timelock)
    #[arg(long, value_name = "N")]
    timelock_blocks: Option<u32>,

    /// Override the Signer3 co-signer key
    #[arg(long, value_name = "HEX")]
    signer3: Option<String>,

    /// Description stored in the export
    #[arg(long)]
    description: Option<String>,

    /// Write the export to this file
    #[arg(short, long, value_name = "PATH", conflicts_with = "save")]
    output: Option<PathBuf>,

    /// Write the export into the configured output directory
    #[arg(long)]
    save: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Signer3Config::load(cli.config.as_deref()).with_context(|| {
        format!(
            "Failed to load config from {}",
            cli.config
                .as_deref()
                .unwrap_or(Path::new(config::DEFAULT_CONFIG_FILE))
                .display()
        )
    })?;
    config.apply_env_overrides();

    // RUST_LOG, if set, takes precedence over the configured level
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.general.log_level.as_str()),
    )
    .init();

    match cli.command {
        Command::Create(args) => create(config, args),
        Command::Verify { file } => verify(&file),
        Command::ResolveKey { key, network } => {
            let network = match network {
                Some(n) => n,
                None => config.network()?,
            };
            resolve_key(&key, network)
        }
        Command::Config { validate } => show_config(&config, validate),
    }
}

fn create(mut config: Signer3Config, args: CreateArgs) -> Result<()> {
    config.apply_create_overrides(&CreateOverrides {
        network: args.network,
        signer3: args.signer3,
        timelock: args.timelock,
        timelock_blocks: args.timelock_blocks,
    });
    config
        .validate()
        .context("Configuration validation failed")?;

    let wallet_config = config.wallet_config()?;
    let wallet = build_multisig_wallet(
        args.borrower.trim(),
        args.lender.trim(),
        config.timelock_blocks(),
        &wallet_config,
    )?;
    warn_off_curve(&wallet);

    log::info!(
        "Built {} wallet {} (timelock: {})",
        wallet.network(),
        wallet.address(),
        wallet
            .timelock()
            .map_or_else(|| "none".to_string(), |t| t.to_string())
    );

    let description = args.description.unwrap_or(config.output.description);
    let export = wallet.export(Utc::now(), description);
    let json = export.to_json_pretty()?;

    let path = match (args.output, args.save) {
        (Some(path), _) => Some(path),
        (None, true) => {
            std::fs::create_dir_all(&config.output.dir).with_context(|| {
                format!(
                    "Failed to create output directory: {}",
                    config.output.dir.display()
                )
            })?;
            Some(config.output.dir.join(export.default_file_name()))
        }
        (None, false) => None,
    };

    match path {
        Some(path) => {
            std::fs::write(&path, json)
                .with_context(|| format!("Failed to write export: {}", path.display()))?;
            log::info!("Wrote {}", path.display());
            println!("{}", wallet.address());
        }
        None => println!("{}", json),
    }

    Ok(())
}

/// Read an export file and rebuild its wallet, failing on any mismatch.
fn load_verified(file: &Path) -> Result<(WalletExport, WalletDescriptor)> {
    let contents = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read export: {}", file.display()))?;
    let export = WalletExport::from_json(&contents)
        .with_context(|| format!("Failed to parse export: {}", file.display()))?;
    let wallet = export
        .reconstruct()
        .with_context(|| format!("Export failed verification: {}", file.display()))?;
    Ok((export, wallet))
}

fn verify(file: &Path) -> Result<()> {
    let (export, wallet) = load_verified(file)?;
    warn_off_curve(&wallet);

    println!("✅ Export is consistent.");
    println!("  Address:   {}", wallet.address());
    println!("  Network:   {}", wallet.network());
    println!(
        "  Timelock:  {}",
        wallet
            .timelock()
            .map_or_else(|| "none".to_string(), |t| t.to_string())
    );
    println!("  Created:   {}", export.created_at.to_rfc3339());
    Ok(())
}

fn resolve_key(input: &str, network: Network) -> Result<()> {
    let key = signer3_core::resolve(input.trim(), network)?;
    if !key.is_valid_point() {
        log::warn!("{} is not a point on secp256k1 and cannot sign", key);
    }
    println!("{}", key);
    Ok(())
}

fn show_config(config: &Signer3Config, validate_only: bool) -> Result<()> {
    config
        .validate()
        .context("Configuration validation failed")?;

    if validate_only {
        println!("✅ Configuration is valid.");
        println!("  Network:   {}", config.network()?);
        println!("  Signer3:   {}", config.signer3_key()?);
        println!(
            "  Timelock:  {}",
            config
                .timelock_blocks()
                .map_or_else(|| "disabled".to_string(), |b| format!("{} blocks", b))
        );
        println!("  Output:    {}", config.output.dir.display());
        return Ok(());
    }

    print!(
        "{}",
        toml::to_string_pretty(config).context("Failed to render config")?
    );
    Ok(())
}

/// Keys are only shape-checked; flag ones that can never produce a signature.
fn warn_off_curve(wallet: &WalletDescriptor) {
    let keys: [(KeyRole, CompressedPublicKey); 3] = [
        (KeyRole::Borrower, wallet.borrower()),
        (KeyRole::Lender, wallet.lender()),
        (KeyRole::Signer3, wallet.signer3()),
    ];
    for (role, key) in keys {
        if !key.is_valid_point() {
            log::warn!(
                "{} key {} is not a point on secp256k1; spends need the other two keys",
                role,
                key
            );
        }
    }
}
