#![no_main]

use libfuzzer_sys::fuzz_target;
use wholefile::{LineSplitter, split_lines};

fuzz_target!(|text: &str| {
    let lines = split_lines(text);

    // No line contains a terminator
    for line in &lines {
        assert!(!line.contains('\n') && !line.contains('\r'));
    }

    // Feeding one char at a time yields the same lines
    let mut splitter = LineSplitter::new();
    let mut incremental = Vec::new();
    for ch in text.chars() {
        let mut tmp = [0u8; 4];
        splitter.push_str(ch.encode_utf8(&mut tmp));
        while let Some(line) = splitter.next_line(false) {
            incremental.push(line);
        }
    }
    while let Some(line) = splitter.next_line(true) {
        incremental.push(line);
    }
    assert_eq!(incremental, lines);
});
