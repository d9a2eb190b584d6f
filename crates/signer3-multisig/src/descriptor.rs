//! Output descriptors for standard policies
//!
//! A standard policy is exactly `wsh(sortedmulti(2,K1,K2,K3))`, so it can be
//! imported into any descriptor wallet. The timelocked IF/ELSE shape has no
//! miniscript equivalent and is only available as a raw witness script.

use miniscript::Descriptor;
use signer3_core::CompressedPublicKey;
use std::str::FromStr;
use thiserror::Error;

use crate::policy::{MultisigPolicy, THRESHOLD};

#[derive(Error, Debug)]
pub enum DescriptorError {
    #[error("Timelocked policies have no output descriptor form")]
    Timelocked,

    #[error("Key {0} is not a valid secp256k1 point")]
    InvalidPoint(CompressedPublicKey),

    #[error("Miniscript error: {0}")]
    Miniscript(#[from] miniscript::Error),
}

/// Render a standard policy as a checksummed `wsh(sortedmulti(...))` descriptor.
pub fn output_descriptor(
    policy: &MultisigPolicy,
) -> Result<Descriptor<bitcoin::PublicKey>, DescriptorError> {
    if policy.is_timelocked() {
        return Err(DescriptorError::Timelocked);
    }

    let keys = policy
        .keys()
        .iter()
        .map(|key| {
            key.to_public_key()
                .map(|pk| pk.to_string())
                .map_err(|_| DescriptorError::InvalidPoint(*key))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let desc = format!("wsh(sortedmulti({},{}))", THRESHOLD, keys.join(","));
    Ok(Descriptor::from_str(&desc)?)
}
