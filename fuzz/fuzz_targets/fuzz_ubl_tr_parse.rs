#![no_main]

use efatura::ubl::InvoiceParser;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Errors are expected, panics are bugs.
    let _ = InvoiceParser::new().parse_bytes(data);
});
