#![no_main]

use libfuzzer_sys::fuzz_target;
use signer3_core::{CompressedPublicKey, Network};
use signer3_multisig::{build_script, derive_address, Timelock};

fuzz_target!(|data: &[u8]| {
    // 3 x 33-byte keys followed by a 2-byte timelock
    if data.len() < 101 {
        return;
    }
    let key = |i: usize| CompressedPublicKey::from_slice(&data[i * 33..(i + 1) * 33]);
    let (Ok(a), Ok(b), Ok(c)) = (key(0), key(1), key(2)) else {
        return;
    };
    let timelock = Timelock::from_blocks(u32::from(u16::from_le_bytes([data[99], data[100]]))).ok();

    // Key order must not matter
    let script = build_script([a, b, c], timelock);
    assert_eq!(script, build_script([c, a, b], timelock));
    assert!(derive_address(&script, Network::Mainnet).is_ok());
});
