#![no_main]

use libfuzzer_sys::fuzz_target;
use sii_chile::core::rut;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        // Arbitrary text must yield a structured result, never a panic.
        let check = rut::validate(s);
        if check.valid {
            let parsed: Result<sii_chile::core::Rut, _> = s.parse();
            assert!(parsed.is_ok(), "validated RUT failed to parse: {s:?}");
        }
        let _ = rut::format(s);
        let _ = rut::strip(s);
    }
});
