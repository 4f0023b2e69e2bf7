#![no_main]

use efatura::ubl::InvoiceParser;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(dir) = tempfile::tempdir() else {
        return;
    };
    let path = dir.path().join("wrapped.zip");
    if std::fs::write(&path, data).is_ok() {
        let _ = InvoiceParser::new().parse_path(&path);
    }
});
