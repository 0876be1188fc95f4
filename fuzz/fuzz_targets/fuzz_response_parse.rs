#![no_main]

use libfuzzer_sys::fuzz_target;
use trzba::soap::ParseOptions;

fuzz_target!(|data: &[u8]| {
    let options = ParseOptions {
        ignore_invalid_cert: true,
        now: None,
    };
    // Must not panic — errors are fine, panics are bugs.
    let _ = trzba::soap::parse_response(data, &options);
});
