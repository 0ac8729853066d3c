//! Hot-path benchmarks: push, select/erase cycles, and expiry sweeps.

use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput};
use neritic_core::prelude::*;
use std::hint::black_box;
use std::time::{Duration, Instant};

const ENTRIES: u64 = 1024;

fn channel_cfg(max_queue: usize) -> BufferConfig {
    BufferConfig {
        max_queue,
        ttl: Duration::from_secs(1800),
        value_base: 10.0,
        ..BufferConfig::default()
    }
}

fn buffer_with_channels(channels: usize, max_queue: usize) -> (DynamicBuffer<u64>, Vec<String>) {
    let mut buffer = DynamicBuffer::new();
    let names: Vec<String> = (0..channels).map(|i| format!("ch{i:02}")).collect();
    for name in &names {
        buffer.create(name.clone(), channel_cfg(max_queue)).unwrap();
    }
    (buffer, names)
}

fn bench_push(c: &mut Criterion) {
    let mut group = c.benchmark_group("push");
    for &channels in &[1usize, 4, 16] {
        group.throughput(Throughput::Elements(ENTRIES));
        group.bench_with_input(BenchmarkId::from_parameter(channels), &channels, |b, &channels| {
            b.iter_batched(
                || buffer_with_channels(channels, ENTRIES as usize),
                |(mut buffer, names)| {
                    for i in 0..ENTRIES {
                        let name = &names[(i as usize) % names.len()];
                        buffer.push(name, i).unwrap();
                    }
                    black_box(buffer)
                },
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

fn bench_select_and_erase(c: &mut Criterion) {
    let mut group = c.benchmark_group("select_erase");
    for &channels in &[1usize, 4, 16] {
        group.throughput(Throughput::Elements(ENTRIES));
        group.bench_with_input(BenchmarkId::from_parameter(channels), &channels, |b, &channels| {
            b.iter_batched(
                || {
                    let (mut buffer, names) = buffer_with_channels(channels, ENTRIES as usize);
                    for i in 0..ENTRIES {
                        let name = &names[(i as usize) % names.len()];
                        buffer.push(name, i).unwrap();
                    }
                    buffer
                },
                |mut buffer| {
                    loop {
                        let selected = match buffer.top() {
                            Ok(top) => (top.channel.to_string(), top.pushed_at, *top.data),
                            Err(_) => break,
                        };
                        buffer.erase(&selected.0, selected.1, &selected.2).unwrap();
                    }
                    black_box(buffer)
                },
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

fn bench_expire(c: &mut Criterion) {
    let mut group = c.benchmark_group("expire");
    group.throughput(Throughput::Elements(ENTRIES));
    group.bench_function("full_sweep", |b| {
        b.iter_batched(
            || {
                let (mut buffer, names) = buffer_with_channels(8, ENTRIES as usize);
                let aged = Instant::now()
                    .checked_sub(Duration::from_secs(3600))
                    .unwrap_or_else(Instant::now);
                for i in 0..ENTRIES {
                    let name = &names[(i as usize) % names.len()];
                    buffer.push_at(name, aged, i).unwrap();
                }
                buffer
            },
            |mut buffer| black_box(buffer.expire()),
            BatchSize::SmallInput,
        );
    });
    group.finish();
}

criterion_group!(benches, bench_push, bench_select_and_erase, bench_expire);
criterion_main!(benches);
