use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ring_pipeline::RingBuffer;

fn benchmark_push_when_full(c: &mut Criterion) {
    let mut group = c.benchmark_group("push_when_full");
    for capacity in [8usize, 20, 256] {
        let buffer = RingBuffer::new(capacity).expect("Build failed");
        for v in 0..capacity as i64 {
            buffer.push(v);
        }
        group.bench_with_input(BenchmarkId::from_parameter(capacity), &buffer, |b, buffer| {
            b.iter(|| buffer.push(black_box(7)));
        });
    }
    group.finish();
}

fn benchmark_push_then_drain(c: &mut Criterion) {
    let buffer = RingBuffer::new(20).expect("Build failed");
    c.bench_function("push_20_then_drain", |b| {
        b.iter(|| {
            for v in 0..20 {
                buffer.push(black_box(v));
            }
            black_box(buffer.drain_and_reset())
        });
    });
}

criterion_group!(benches, benchmark_push_when_full, benchmark_push_then_drain);
criterion_main!(benches);
