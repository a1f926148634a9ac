//! Whole-file reading example.
//!
//! Run with:
//!     cargo run --example sync_file -- /path/to/file

use std::env;

use wholefile::{FileTransfer, TextCodec, TransferConfig};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = env::args()
        .nth(1)
        .unwrap_or_else(|| "Cargo.toml".to_string());

    println!("Reading file: {}\n", path);

    // Refuse anything over 64 MiB
    let config = TransferConfig::new(4 * 1024, 64 * 1024 * 1024)?;
    let transfer = FileTransfer::new().with_config(config)?;

    let bytes = transfer.read_all_bytes(&path)?;
    println!("Read {} bytes", bytes.len());

    // Lenient decoding so binary files still print something
    let codec = TextCodec::utf8().strict(false);
    let mut longest = 0;
    let mut count = 0;
    for line in transfer.read_lines(&path, &codec)? {
        let line = line?;
        count += 1;
        longest = longest.max(line.chars().count());
    }
    println!("{} lines, longest {} chars", count, longest);

    Ok(())
}
