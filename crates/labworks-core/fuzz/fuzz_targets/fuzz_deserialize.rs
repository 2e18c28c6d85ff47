#![no_main]
use labworks_core::manager::LabManager;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Arbitrary bytes must produce Err, never a panic.
    let _ = LabManager::deserialize(data);
});
