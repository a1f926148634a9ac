// Integration tests for whole-file transfers over stub and real file systems
// Tests cover: growth loop sizing, length edge cases, line endings, cancellation

use std::io::{self, Read, Write};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use wholefile::{
    FileHandle, FileSystem, FileTransfer, LineEnding, OpenMode, OpenOptions, TextCodec,
    TrackingPool, TransferConfig, TransferError,
};

// ============================================================================
// Stub File System
// ============================================================================

/// Serves fixed content with a chosen advertised length and read sizes.
#[derive(Clone)]
struct StubFs {
    content: Vec<u8>,
    advertised: Option<u64>,
    max_read: usize,
    seed: u64,
    written: Arc<Mutex<Vec<u8>>>,
    opened: Arc<AtomicUsize>,
}

impl StubFs {
    fn new(content: Vec<u8>, advertised: Option<u64>) -> Self {
        Self {
            content,
            advertised,
            max_read: usize::MAX,
            seed: 7,
            written: Arc::new(Mutex::new(Vec::new())),
            opened: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn short_reads(mut self, max_read: usize, seed: u64) -> Self {
        self.max_read = max_read;
        self.seed = seed;
        self
    }

    fn written(&self) -> Vec<u8> {
        self.written.lock().unwrap().clone()
    }
}

struct StubHandle {
    content: Vec<u8>,
    pos: usize,
    advertised: Option<u64>,
    max_read: usize,
    rng: fastrand::Rng,
    written: Arc<Mutex<Vec<u8>>>,
}

impl Read for StubHandle {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let limit = if self.max_read == usize::MAX {
            buf.len()
        } else {
            self.rng.usize(1..=self.max_read).min(buf.len())
        };
        let n = limit.min(self.content.len() - self.pos);
        buf[..n].copy_from_slice(&self.content[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

impl Write for StubHandle {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.written.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl FileHandle for StubHandle {
    fn length(&mut self) -> io::Result<Option<u64>> {
        Ok(self.advertised)
    }
}

impl FileSystem for StubFs {
    type Handle = StubHandle;

    fn open(&self, _path: &Path, options: &OpenOptions) -> io::Result<StubHandle> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        if options.mode() == OpenMode::Create {
            self.written.lock().unwrap().clear();
        }
        Ok(StubHandle {
            content: self.content.clone(),
            pos: 0,
            advertised: self.advertised,
            max_read: self.max_read,
            rng: fastrand::Rng::with_seed(self.seed),
            written: Arc::clone(&self.written),
        })
    }
}

fn tracked(fs: &StubFs, config: TransferConfig) -> (FileTransfer<&StubFs>, Arc<TrackingPool>) {
    let pool = Arc::new(TrackingPool::new());
    let transfer = FileTransfer::with_file_system(fs)
        .with_config(config)
        .unwrap()
        .with_pool(pool.clone());
    (transfer, pool)
}

// ============================================================================
// Growth Loop
// ============================================================================

#[test]
fn test_unknown_length_short_reads() {
    let content: Vec<u8> = (0..10_000).map(|i| (i * 31 % 251) as u8).collect();

    for seed in 0..8 {
        let fs = StubFs::new(content.clone(), None).short_reads(333, seed);
        let (transfer, pool) = tracked(&fs, TransferConfig::default());

        let data = transfer.read_all_bytes("stub").unwrap();
        assert_eq!(data, content, "seed {seed} must read identical bytes");
        assert_eq!(pool.outstanding(), 0, "every rented buffer must be returned");
        assert!(pool.largest_request() <= 16 * 1024);
    }
}

#[test]
fn test_one_byte_past_initial_doubles_once() {
    let fs = StubFs::new(vec![1u8; 513], None);
    let (transfer, pool) = tracked(&fs, TransferConfig::default());

    let data = transfer.read_all_bytes("stub").unwrap();
    assert_eq!(data.len(), 513);
    assert_eq!(pool.rented(), 2, "512 then 1024");
    assert_eq!(pool.largest_request(), 1024);
    assert_eq!(pool.outstanding(), 0);
}

#[test]
fn test_exactly_at_ceiling_reads() {
    let fs = StubFs::new(vec![9u8; 4096], None).short_reads(700, 3);
    let config = TransferConfig::new(512, 4096).unwrap();
    let (transfer, pool) = tracked(&fs, config);

    assert_eq!(transfer.read_all_bytes("stub").unwrap().len(), 4096);
    assert_eq!(pool.outstanding(), 0);
}

#[test]
fn test_one_past_ceiling_fails() {
    let fs = StubFs::new(vec![9u8; 4097], None);
    let config = TransferConfig::new(512, 4096).unwrap();
    let (transfer, pool) = tracked(&fs, config);

    let err = transfer.read_all_bytes("stub").unwrap_err();
    assert!(matches!(err, TransferError::FileTooLarge { max: 4096, .. }));
    assert_eq!(pool.outstanding(), 0);
}

// ============================================================================
// Advertised Length Edge Cases
// ============================================================================

#[test]
fn test_known_length_short_file() {
    let fs = StubFs::new(vec![0u8; 60], Some(100));
    let (transfer, _) = tracked(&fs, TransferConfig::default());

    let err = transfer.read_all_bytes("stub").unwrap_err();
    assert!(matches!(
        err,
        TransferError::UnexpectedEndOfFile {
            expected: 100,
            actual: 60
        }
    ));
}

#[test]
fn test_reported_zero_length_still_reads() {
    let fs = StubFs::new(b"hello".to_vec(), Some(0));
    let (transfer, _) = tracked(&fs, TransferConfig::default());

    assert_eq!(transfer.read_all_bytes("stub").unwrap(), b"hello");
}

#[test]
fn test_advertised_over_ceiling_allocates_nothing() {
    let fs = StubFs::new(Vec::new(), Some(4097));
    let config = TransferConfig::new(512, 4096).unwrap();
    let (transfer, pool) = tracked(&fs, config);

    let err = transfer.read_all_bytes("stub").unwrap_err();
    assert!(matches!(
        err,
        TransferError::FileTooLarge {
            length: 4097,
            max: 4096
        }
    ));
    assert_eq!(pool.rented(), 0);
}

#[test]
fn test_known_length_exact_allocation() {
    let content = vec![5u8; 3000];
    let fs = StubFs::new(content.clone(), Some(3000)).short_reads(100, 11);
    let (transfer, pool) = tracked(&fs, TransferConfig::default());

    let data = transfer.read_all_bytes("stub").unwrap();
    assert_eq!(data, content);
    assert_eq!(pool.rented(), 0, "known lengths bypass the pool");
}

// ============================================================================
// Argument Validation
// ============================================================================

#[test]
fn test_invalid_path_never_opens() {
    let fs = StubFs::new(Vec::new(), None);
    let (transfer, _) = tracked(&fs, TransferConfig::default());

    assert!(matches!(
        transfer.read_all_bytes("").unwrap_err(),
        TransferError::InvalidArgument { .. }
    ));
    assert!(matches!(
        transfer.write_all_text("bad\0name", "x", &TextCodec::utf8()).unwrap_err(),
        TransferError::InvalidArgument { .. }
    ));
    assert_eq!(fs.opened.load(Ordering::SeqCst), 0);
}

// ============================================================================
// Lines and Text
// ============================================================================

#[test]
fn test_lines_every_terminator() {
    for ending in [LineEnding::Lf, LineEnding::CrLf, LineEnding::Cr] {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lines.txt");
        let transfer = FileTransfer::new()
            .with_config(TransferConfig::default().with_line_ending(ending))
            .unwrap();

        transfer
            .write_all_lines(&path, ["a", "b", "c"], &TextCodec::utf8())
            .unwrap();
        let expected = format!("a{0}b{0}c{0}", ending.as_str());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), expected);

        let eager = transfer.read_all_lines(&path, &TextCodec::utf8()).unwrap();
        assert_eq!(eager, ["a", "b", "c"], "{ending:?}");

        let lazy: Vec<String> = transfer
            .read_lines(&path, &TextCodec::utf8())
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(lazy, eager);
    }
}

#[test]
fn test_lines_from_stub_short_reads() {
    let text = "first\r\nsecond\rthird\n\nfifth";
    let fs = StubFs::new(text.as_bytes().to_vec(), None).short_reads(3, 5);
    let config = TransferConfig::default().with_chunk_size(4);
    let (transfer, pool) = tracked(&fs, config);

    let lines: Vec<String> = transfer
        .read_lines("stub", &TextCodec::utf8())
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(lines, ["first", "second", "third", "", "fifth"]);
    assert_eq!(pool.outstanding(), 0);
}

#[test]
fn test_text_round_trip_with_bom() {
    let fs = StubFs::new(Vec::new(), Some(0));
    let (transfer, _) = tracked(&fs, TransferConfig::default());

    transfer
        .write_all_text("stub", "héllo", &TextCodec::utf8_with_bom())
        .unwrap();
    let written = fs.written();
    assert_eq!(&written[..3], b"\xEF\xBB\xBF");

    let reader = StubFs::new(written, None);
    let (transfer, _) = tracked(&reader, TransferConfig::default());
    assert_eq!(
        transfer.read_all_text("stub", &TextCodec::utf8()).unwrap(),
        "héllo"
    );
}

#[test]
fn test_strict_encode_rejects_unmappable() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("latin.txt");
    let codec = TextCodec::for_label("windows-1252").unwrap();

    let err = wholefile::FileTransfer::new()
        .write_all_text(&path, "snow ☃", &codec)
        .unwrap_err();
    assert!(matches!(err, TransferError::Encode { character: '☃', .. }));
    assert!(!path.exists(), "encoding fails before the file is created");
}

#[test]
fn test_free_functions_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("free.txt");

    wholefile::write_all_bytes(&path, b"ab").unwrap();
    wholefile::append_all_bytes(&path, b"c").unwrap();
    assert_eq!(wholefile::read_all_bytes(&path).unwrap(), b"abc");

    wholefile::write_all_text(&path, "x\n").unwrap();
    wholefile::append_all_text(&path, "y\n").unwrap();
    wholefile::append_all_lines(&path, ["z"]).unwrap();
    assert_eq!(wholefile::read_all_lines(&path).unwrap(), ["x", "y", "z"]);

    let lines: Vec<String> = wholefile::read_lines(&path)
        .unwrap()
        .map(Result::unwrap)
        .collect();
    assert_eq!(lines, ["x", "y", "z"]);
}

// ============================================================================
// Cancellation (feature = "async-io")
// ============================================================================

#[cfg(feature = "async-io")]
mod cancellation {
    use super::*;
    use std::future::{Future, Ready, ready};

    use wholefile::{AsyncFileSystem, CancellationToken};

    #[derive(Default)]
    struct CountingFs {
        opened: AtomicUsize,
    }

    impl AsyncFileSystem for CountingFs {
        type Handle = async_fs::File;

        fn open(
            &self,
            _path: &Path,
            _options: &OpenOptions,
        ) -> impl Future<Output = io::Result<async_fs::File>> + Send {
            self.opened.fetch_add(1, Ordering::SeqCst);
            let refused: Ready<io::Result<async_fs::File>> =
                ready(Err(io::Error::other("stub file system")));
            refused
        }
    }

    #[tokio::test]
    async fn test_cancelled_token_never_opens() {
        let transfer = FileTransfer::with_file_system(CountingFs::default());
        let token = CancellationToken::new();
        token.cancel();

        let codec = TextCodec::utf8();
        assert!(transfer.read_all_bytes_async("f", &token).await.unwrap_err().is_cancelled());
        assert!(transfer.write_all_bytes_async("f", b"x", &token).await.unwrap_err().is_cancelled());
        assert!(transfer.append_all_text_async("f", "x", &codec, &token).await.unwrap_err().is_cancelled());
        assert!(transfer.read_all_lines_async("f", &codec, &token).await.unwrap_err().is_cancelled());
        assert!(transfer.read_lines_async("f", &codec, &token).await.unwrap_err().is_cancelled());
        assert!(transfer.write_all_lines_async("f", ["x"], &codec, &token).await.unwrap_err().is_cancelled());
        assert_eq!(transfer.file_system().opened.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_open_errors_propagate() {
        let transfer = FileTransfer::with_file_system(CountingFs::default());
        let token = CancellationToken::new();

        let err = transfer.read_all_bytes_async("f", &token).await.unwrap_err();
        assert!(matches!(err, TransferError::Io(_)));
        assert_eq!(transfer.file_system().opened.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_free_functions_async() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("async.txt");
        let token = CancellationToken::new();

        tokio_test::block_on(async {
            wholefile::write_all_text_async(&path, "one\ntwo\n", &token)
                .await
                .unwrap();
            assert_eq!(
                wholefile::read_all_text_async(&path, &token).await.unwrap(),
                "one\ntwo\n"
            );
            assert_eq!(
                wholefile::read_all_lines_async(&path, &token).await.unwrap(),
                ["one", "two"]
            );

            wholefile::write_all_lines_async(&path, ["a"], &token)
                .await
                .unwrap();
            wholefile::append_all_lines_async(&path, ["b"], &token)
                .await
                .unwrap();
            wholefile::append_all_text_async(&path, "c\n", &token)
                .await
                .unwrap();
            wholefile::append_all_bytes_async(&path, b"d", &token)
                .await
                .unwrap();
            assert_eq!(
                wholefile::read_all_lines_async(&path, &token).await.unwrap(),
                ["a", "b", "c", "d"]
            );
        });
    }
}
