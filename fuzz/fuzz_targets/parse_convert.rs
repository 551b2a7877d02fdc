#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        // Parse, preprocess and map; errors must surface as values, never
        // as panics. The simulator is exercised separately.
        let _ = rdlt_soundness::build_net(s, true);
        let _ = rdlt_soundness::build_net(s, false);
    }
});
