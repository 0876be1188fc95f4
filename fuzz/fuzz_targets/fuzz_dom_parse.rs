#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        // Must not panic — errors are fine, panics are bugs.
        if let Ok(element) = trzba::soap::dom::parse(s) {
            // Canonicalization of anything that parsed must not panic
            // either, and must be a fixed point.
            let once = element.canonicalize();
            if let Ok(text) = std::str::from_utf8(&once) {
                if let Ok(reparsed) = trzba::soap::dom::parse(text) {
                    assert_eq!(once, reparsed.canonicalize());
                }
            }
        }
    }
});
