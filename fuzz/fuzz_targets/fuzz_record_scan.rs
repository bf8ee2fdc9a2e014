#![no_main]

use libfuzzer_sys::fuzz_target;
use std::io::Cursor;
use wicket_core::store::scan_for_user;
use wicket_core::{BLOCK_LEN, HASH_LEN};

fuzz_target!(|data: &[u8]| {
    // Scanning arbitrary bytes must never panic; it either finds a
    // record, reports not-found, or reports corruption.
    let _ = scan_for_user(&mut Cursor::new(data), b"alice");

    // Prepending a well-formed record must make the scan find it,
    // whatever garbage follows.
    let mut file = b"alice\n".to_vec();
    file.extend_from_slice(&[0x5a; BLOCK_LEN]);
    file.push(b'\n');
    file.extend_from_slice(data);

    match scan_for_user(&mut Cursor::new(&file), b"alice") {
        Ok(Some(found)) => {
            assert_eq!(found.block_offset, 6);
            assert_eq!(found.hash, [0x5a; HASH_LEN]);
        }
        other => panic!("well-formed leading record not found: {other:?}"),
    }
});
