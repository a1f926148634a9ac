//! Benchmarks for wholefile.
//!
//! Run with:
//!     cargo bench

use std::io::Cursor;
use std::sync::Arc;

use criterion::{Criterion, Throughput, black_box, criterion_group, criterion_main};

use wholefile::{
    FileTransfer, GrowableReader, SharedPool, TextCodec, TransferConfig, split_lines,
};

fn bench_read_to_end(c: &mut Criterion) {
    let mut group = c.benchmark_group("read_to_end");
    let reader =
        GrowableReader::new(TransferConfig::default(), Arc::new(SharedPool::new())).unwrap();

    for size in [64 * 1024, 1024 * 1024, 10 * 1024 * 1024] {
        // Deterministic pseudo-random data
        let data: Vec<u8> = (0..size).map(|i| (i * 7 + 13) as u8).collect();
        group.throughput(Throughput::Bytes(size as u64));

        // Advertised length: one exact allocation
        group.bench_with_input(format!("known_{}kb", size / 1024), &data, |b, data| {
            b.iter(|| {
                let mut cursor = Cursor::new(black_box(data.as_slice()));
                let out = reader.read_to_end(&mut cursor, Some(data.len() as u64)).unwrap();
                black_box(out.len())
            });
        });

        // No length: pooled doubling
        group.bench_with_input(format!("unknown_{}kb", size / 1024), &data, |b, data| {
            b.iter(|| {
                let mut cursor = Cursor::new(black_box(data.as_slice()));
                let out = reader.read_to_end(&mut cursor, None).unwrap();
                black_box(out.len())
            });
        });
    }

    group.finish();
}

fn bench_lines(c: &mut Criterion) {
    let mut group = c.benchmark_group("lines");
    let text: String = (0..20_000).map(|i| format!("line number {i}\r\n")).collect();
    group.throughput(Throughput::Bytes(text.len() as u64));

    group.bench_function("split_lines", |b| {
        b.iter(|| black_box(split_lines(black_box(&text)).len()));
    });

    group.bench_function("decode_utf8", |b| {
        let codec = TextCodec::utf8();
        b.iter(|| black_box(codec.decode(black_box(text.as_bytes())).unwrap().len()));
    });

    group.finish();
}

fn bench_file_round_trip(c: &mut Criterion) {
    let mut group = c.benchmark_group("file");
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bench.bin");
    let data = vec![0xA5u8; 1024 * 1024];
    let transfer = FileTransfer::new();

    group.throughput(Throughput::Bytes(data.len() as u64));
    group.bench_function("write_read_1mb", |b| {
        b.iter(|| {
            transfer.write_all_bytes(&path, black_box(&data)).unwrap();
            black_box(transfer.read_all_bytes(&path).unwrap().len())
        });
    });

    group.finish();
}

criterion_group!(benches, bench_read_to_end, bench_lines, bench_file_round_trip);
criterion_main!(benches);
