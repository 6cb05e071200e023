#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: Vec<u64>| {
    let mut file = Vec::new();
    let _ = pmd_msgbin::sir0::write_sir0_footer(&mut file, &data);
});
