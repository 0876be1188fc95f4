#![no_main]

use libfuzzer_sys::fuzz_target;
use trzba::soap::ParseOptions;

fuzz_target!(|data: &[u8]| {
    // Must not panic — errors are fine, panics are bugs.
    let _ = trzba::soap::parse_envelope(data, &ParseOptions::default());
});
