//! Throughput benchmarks for the weir adaptors.

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;
use std::thread;
use weir::channel::BoundedChannel;
use weir::source::SourceAdaptor;

/// Handle over leaked bytes; release is a no-op for benchmarking.
struct BenchHandle(&'static [u8]);

impl weir::chunk::ExternalHandle for BenchHandle {
    fn as_bytes(&self) -> &[u8] {
        self.0
    }

    fn release(self) -> weir::Result<()> {
        Ok(())
    }
}

fn bench_channel_handoff(c: &mut Criterion) {
    let mut group = c.benchmark_group("channel_handoff");

    for capacity in [1usize, 16, 256] {
        group.bench_with_input(
            BenchmarkId::from_parameter(capacity),
            &capacity,
            |b, &capacity| {
                b.iter(|| {
                    let ch = std::sync::Arc::new(BoundedChannel::new(capacity));
                    let count = 1000u32;

                    let producer = {
                        let ch = std::sync::Arc::clone(&ch);
                        thread::spawn(move || {
                            for i in 0..count {
                                ch.enqueue(i).unwrap();
                            }
                            ch.deactivate();
                        })
                    };

                    let mut sum = 0u64;
                    while let Some(v) = ch.dequeue() {
                        sum += u64::from(v);
                    }
                    producer.join().unwrap();
                    black_box(sum)
                });
            },
        );
    }
    group.finish();
}

fn bench_read_reassembly(c: &mut Criterion) {
    let mut group = c.benchmark_group("read_reassembly");

    let total_bytes = 1 << 20;
    for chunk_size in [512usize, 4096, 65536] {
        group.throughput(Throughput::Bytes(total_bytes as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(chunk_size),
            &chunk_size,
            |b, &chunk_size| {
                b.iter(|| {
                    let mut source: SourceAdaptor<BenchHandle> = SourceAdaptor::with_capacity(32);
                    let handle = source.handle();

                    let producer = thread::spawn(move || {
                        let chunk = vec![0x5Au8; chunk_size];
                        let mut sent = 0;
                        while sent < total_bytes {
                            assert!(handle.push_owned(chunk.clone()));
                            sent += chunk_size;
                        }
                        handle.finish();
                    });

                    let mut buf = vec![0u8; 8192];
                    let mut received = 0usize;
                    loop {
                        let n = source.read(&mut buf);
                        if n == 0 {
                            break;
                        }
                        received += n;
                    }
                    producer.join().unwrap();
                    black_box(received)
                });
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_channel_handoff, bench_read_reassembly);
criterion_main!(benches);
