use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use stagehand::backend::{MemoryObjectClient, ObjectStoreBackend};
use stagehand::cache::hash::hash_file;
use stagehand::{AccessOptions, CopyOptions, Store};
use std::io::{Read, Write};
use std::sync::Arc;
use tempfile::NamedTempFile;
use tokio::runtime::Runtime;

fn create_test_file(size_kb: usize) -> NamedTempFile {
    let mut temp_file = NamedTempFile::new().expect("Failed to create temp file");
    let target_size = size_kb * 1024;
    let mut current_size = 0;
    let mut record = 0;

    while current_size < target_size {
        let line = format!("record {record} payload {}\n", record % 997);
        temp_file.write_all(line.as_bytes()).unwrap();
        current_size += line.len();
        record += 1;
    }

    temp_file.flush().unwrap();
    temp_file
}

fn size_label(size_kb: usize) -> String {
    if size_kb < 1024 {
        format!("{}KB", size_kb)
    } else {
        format!("{}MB", size_kb / 1024)
    }
}

fn bench_hashing(c: &mut Criterion) {
    let mut group = c.benchmark_group("content_hash");
    group.sample_size(10);

    for &size_kb in &[64, 1024, 16384] {
        let temp_file = create_test_file(size_kb);
        group.bench_with_input(
            BenchmarkId::new("sha256", size_label(size_kb)),
            &temp_file.path(),
            |b, path| b.iter(|| black_box(hash_file(path).unwrap())),
        );
    }

    group.finish();
}

fn bench_staging(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("staging");
    group.sample_size(10);
    group.measurement_time(std::time::Duration::from_secs(5));

    let client = Arc::new(MemoryObjectClient::new());
    let store = Store::builder()
        .backend(
            "mem",
            Arc::new(ObjectStoreBackend::with_client(client.clone(), 4)),
        )
        .build()
        .unwrap();

    for &size_kb in &[64, 4096] {
        let temp_file = create_test_file(size_kb);
        let remote = format!("mem://bench/{size_kb}.log");
        rt.block_on(store.copy(
            &temp_file.path().to_string_lossy(),
            &remote,
            &CopyOptions::new(),
        ))
        .unwrap();

        group.bench_with_input(
            BenchmarkId::new("read_uncached", size_label(size_kb)),
            &remote,
            |b, remote| {
                b.iter(|| {
                    let read = rt.block_on(store.access(
                        remote,
                        "rb",
                        &AccessOptions::new(),
                        |handle| {
                            let mut sink = Vec::new();
                            Ok(handle.read_to_end(&mut sink)?)
                        },
                    ));
                    black_box(read.unwrap());
                });
            },
        );

        let cached = AccessOptions::new().cached(true);
        group.bench_with_input(
            BenchmarkId::new("read_cached", size_label(size_kb)),
            &remote,
            |b, remote| {
                b.iter(|| {
                    let read = rt.block_on(store.access(remote, "rb", &cached, |handle| {
                        let mut sink = Vec::new();
                        Ok(handle.read_to_end(&mut sink)?)
                    }));
                    black_box(read.unwrap());
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_hashing, bench_staging);
criterion_main!(benches);
