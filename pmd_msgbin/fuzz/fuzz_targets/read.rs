#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let _ = pmd_msgbin::MessageBin::from_bytes(data.to_vec());
});
