#![no_main]

use libfuzzer_sys::fuzz_target;
use signer3_core::{resolve, Network};

fuzz_target!(|data: &[u8]| {
    // Any UTF-8 input either resolves to a 33-byte key or returns an error.
    if let Ok(s) = std::str::from_utf8(data) {
        for network in [Network::Mainnet, Network::Testnet] {
            if let Ok(key) = resolve(s, network) {
                assert!(matches!(key.as_bytes()[0], 0x02 | 0x03));
            }
        }
    }
});
