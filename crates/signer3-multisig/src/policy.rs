//! Multisig policy construction
//!
//! # Script Structure
//!
//! Standard:
//!
//! ```text
//! OP_2 <K1> <K2> <K3> OP_3 OP_CHECKMULTISIG
//! ```
//!
//! With a recovery timelock:
//!
//! ```text
//! OP_IF
//!   <blocks:2 bytes LE> OP_CHECKSEQUENCEVERIFY OP_DROP
//!   OP_2 <K1> <K2> <K3> OP_3 OP_CHECKMULTISIG
//! OP_ELSE
//!   OP_2 <K1> <K2> <K3> OP_3 OP_CHECKMULTISIG
//! OP_ENDIF
//! ```
//!
//! Keys are always in ascending byte order, so the same three keys give the
//! same script no matter how they were supplied. The spender picks the branch
//! by pushing true (delayed path) or false (immediate path) in the witness.

use bitcoin::opcodes::all::{
    OP_CHECKMULTISIG, OP_CSV, OP_DROP, OP_ELSE, OP_ENDIF, OP_IF, OP_PUSHNUM_2, OP_PUSHNUM_3,
};
use bitcoin::script::Builder;
use bitcoin::{ScriptBuf, Sequence};
use serde::{Deserialize, Serialize};
use signer3_core::CompressedPublicKey;
use std::fmt;
use thiserror::Error;

/// Signatures required to spend
pub const THRESHOLD: usize = 2;

/// Keys participating in the policy
pub const KEY_COUNT: usize = 3;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PolicyError {
    #[error("Timelock must be between 1 and 65535 blocks, got {0}")]
    InvalidTimelock(u32),
}

/// Relative timelock in blocks (~10 min each)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Timelock(u16);

impl Timelock {
    /// Create a timelock from a number of blocks (1..=65535)
    ///
    /// The value is pushed as two little-endian bytes. From 32768 blocks up
    /// the top bit is set and script reads the push as negative, so
    /// `OP_CHECKSEQUENCEVERIFY` always fails and the delayed branch can never
    /// be spent. Use at most 32767 blocks for a usable delayed branch.
    pub fn from_blocks(blocks: u32) -> Result<Self, PolicyError> {
        if blocks == 0 || blocks > u16::MAX as u32 {
            return Err(PolicyError::InvalidTimelock(blocks));
        }
        Ok(Self(blocks as u16))
    }

    /// One day (~144 blocks)
    pub fn one_day() -> Self {
        Self(144)
    }

    /// One week (~1,008 blocks)
    pub fn one_week() -> Self {
        Self(1_008)
    }

    /// Custom duration in days
    pub fn days(days: u16) -> Result<Self, PolicyError> {
        Self::from_blocks(days as u32 * 144)
    }

    /// Get the block count
    pub fn blocks(&self) -> u16 {
        self.0
    }

    /// Script encoding: the block count as two little-endian bytes
    pub fn to_le_bytes(&self) -> [u8; 2] {
        self.0.to_le_bytes()
    }

    /// `nSequence` a spender must set to use the delayed branch
    pub fn to_sequence(&self) -> Sequence {
        Sequence::from_height(self.0)
    }
}

impl TryFrom<u32> for Timelock {
    type Error = PolicyError;

    fn try_from(blocks: u32) -> Result<Self, Self::Error> {
        Self::from_blocks(blocks)
    }
}

impl From<Timelock> for u32 {
    fn from(timelock: Timelock) -> Self {
        timelock.0 as u32
    }
}

impl fmt::Display for Timelock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let days = self.0 / 144;
        if days >= 365 {
            write!(f, "~{:.1} years ({} blocks)", days as f32 / 365.0, self.0)
        } else if days >= 30 {
            write!(f, "~{:.1} months ({} blocks)", days as f32 / 30.0, self.0)
        } else {
            write!(f, "~{} days ({} blocks)", days, self.0)
        }
    }
}

/// Sort keys into canonical (ascending byte) order.
pub fn sort_keys(mut keys: [CompressedPublicKey; KEY_COUNT]) -> [CompressedPublicKey; KEY_COUNT] {
    keys.sort_unstable();
    keys
}

/// A 2-of-3 multisig policy, optionally with a CSV-delayed branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultisigPolicy {
    keys: [CompressedPublicKey; KEY_COUNT],
    timelock: Option<Timelock>,
}

impl MultisigPolicy {
    /// Create a policy; keys may be given in any order.
    pub fn new(keys: [CompressedPublicKey; KEY_COUNT], timelock: Option<Timelock>) -> Self {
        Self {
            keys: sort_keys(keys),
            timelock,
        }
    }

    /// Plain 2-of-3 with no delayed branch
    pub fn standard(keys: [CompressedPublicKey; KEY_COUNT]) -> Self {
        Self::new(keys, None)
    }

    /// 2-of-3 with an additional CSV-delayed 2-of-3 branch
    pub fn timelocked(keys: [CompressedPublicKey; KEY_COUNT], timelock: Timelock) -> Self {
        Self::new(keys, Some(timelock))
    }

    /// Keys in canonical order
    pub fn keys(&self) -> &[CompressedPublicKey; KEY_COUNT] {
        &self.keys
    }

    pub fn timelock(&self) -> Option<Timelock> {
        self.timelock
    }

    pub fn is_timelocked(&self) -> bool {
        self.timelock.is_some()
    }

    /// Compile to the witness script.
    pub fn to_script(&self) -> ScriptBuf {
        match self.timelock {
            None => push_multisig(Builder::new(), &self.keys).into_script(),
            Some(timelock) => {
                let builder = Builder::new()
                    .push_opcode(OP_IF)
                    .push_slice(timelock.to_le_bytes())
                    .push_opcode(OP_CSV)
                    .push_opcode(OP_DROP);
                let builder = push_multisig(builder, &self.keys).push_opcode(OP_ELSE);
                push_multisig(builder, &self.keys)
                    .push_opcode(OP_ENDIF)
                    .into_script()
            }
        }
    }
}

/// Append `OP_2 <K1> <K2> <K3> OP_3 OP_CHECKMULTISIG`.
fn push_multisig(builder: Builder, keys: &[CompressedPublicKey; KEY_COUNT]) -> Builder {
    let builder = keys
        .iter()
        .fold(builder.push_opcode(OP_PUSHNUM_2), |b, key| {
            b.push_slice(key.to_bytes())
        });
    builder
        .push_opcode(OP_PUSHNUM_3)
        .push_opcode(OP_CHECKMULTISIG)
}

/// Build the policy script for three keys (any order) and an optional timelock.
pub fn build_script(
    keys: [CompressedPublicKey; KEY_COUNT],
    timelock: Option<Timelock>,
) -> ScriptBuf {
    MultisigPolicy::new(keys, timelock).to_script()
}
