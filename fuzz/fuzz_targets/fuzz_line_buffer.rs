#![no_main]

use libfuzzer_sys::fuzz_target;
use wicket_core::LineBuffer;

fuzz_target!(|data: &[u8]| {
    let mut buf = LineBuffer::new();

    // Feed in two arbitrary chunks; splitting must not change behavior.
    let split = data.len() / 2;
    buf.push_bytes(&data[..split]);
    buf.push_bytes(&data[split..]);

    let mut yielded = 0usize;
    while let Some(line) = buf.next_line() {
        // Lines never contain the terminator or a trailing CR
        assert!(!line.contains(&b'\n'));
        assert!(line.last() != Some(&b'\r'));
        yielded += line.len() + 1;
    }

    // Every yielded line consumed at least its length plus one input
    // byte, so the totals never exceed what was fed in.
    assert!(yielded + buf.pending() <= data.len());
});
