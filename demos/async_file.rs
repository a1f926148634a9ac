//! Cancellable async copy example.
//!
//! Copies a file, then streams its lines until a deadline cancels the read.
//!
//! Run with:
//!     cargo run --example async_file -- /path/to/file

use std::env;
use std::time::Duration;

use futures_util::StreamExt;
use wholefile::{CancellationToken, FileTransfer, TextCodec};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = env::args()
        .nth(1)
        .unwrap_or_else(|| "Cargo.toml".to_string());

    let token = CancellationToken::new();
    let deadline = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(2)).await;
        deadline.cancel();
    });

    let transfer = FileTransfer::new();
    let bytes = transfer.read_all_bytes_async(&path, &token).await?;

    let copy = env::temp_dir().join("wholefile-async-copy");
    transfer.write_all_bytes_async(&copy, &bytes, &token).await?;
    println!("Copied {} bytes to {}\n", bytes.len(), copy.display());

    let mut lines = transfer
        .read_lines_async(&copy, &TextCodec::utf8().strict(false), &token)
        .await?;
    let mut count = 0;
    while let Some(line) = lines.next().await {
        match line {
            Ok(_) => count += 1,
            Err(e) if e.is_cancelled() => {
                println!("Cancelled after {} lines", count);
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        }
    }
    println!("{} lines", count);

    Ok(())
}
