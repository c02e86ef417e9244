#![no_main]

use libfuzzer_sys::fuzz_target;
use litekv_backup::BackupName;

fuzz_target!(|data: &[u8]| {
    let Ok(name) = std::str::from_utf8(data) else {
        return;
    };

    if let Some(parsed) = BackupName::parse(name) {
        // Listing and rotation act on the formatted name, so it must be the
        // exact file that was parsed
        assert_eq!(parsed.file_name(), name);
        let reparsed = BackupName::parse(&parsed.file_name()).expect("formatted name parses");
        assert_eq!(reparsed, parsed);
    }
});
