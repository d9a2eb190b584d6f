//! P2WSH address derivation
//!
//! The witness program is the SHA-256 of the witness script, tagged as
//! segwit version 0, and bech32-encoded with the network's HRP.

use bitcoin::{Address, Script, WitnessProgram, WitnessVersion};
use signer3_core::Network;
use thiserror::Error;

/// Witness program length for version-0 script hashes
pub const P2WSH_PROGRAM_LEN: usize = 32;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressEncodingError {
    #[error("P2WSH witness program must be 32 bytes, got {0}")]
    InvalidProgramLength(usize),

    #[error("P2WSH witness program must be version 0, got {0}")]
    InvalidVersion(u8),
}

/// Compute the version-0 witness program committing to `script`.
pub fn witness_program(script: &Script) -> Result<WitnessProgram, AddressEncodingError> {
    let program = WitnessProgram::p2wsh(script);
    if program.version() != WitnessVersion::V0 {
        return Err(AddressEncodingError::InvalidVersion(
            program.version().to_num(),
        ));
    }
    if program.program().len() != P2WSH_PROGRAM_LEN {
        return Err(AddressEncodingError::InvalidProgramLength(
            program.program().len(),
        ));
    }
    Ok(program)
}

/// Derive the bech32 P2WSH address for `script` on `network`.
pub fn derive_address(script: &Script, network: Network) -> Result<Address, AddressEncodingError> {
    let program = witness_program(script)?;
    Ok(Address::from_witness_program(program, network.hrp()))
}
