#![no_main]

use libfuzzer_sys::fuzz_target;
use signer3_multisig::WalletExport;

fuzz_target!(|data: &[u8]| {
    // Parsing and verifying an untrusted export must never panic.
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(export) = WalletExport::from_json(s) {
            let _ = export.reconstruct();
        }
    }
});
