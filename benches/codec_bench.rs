use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;
use treeclimb::tree::{self, canonicalize, decode, decode_newick, encode, equivalents};

fn criterion_benchmark(c: &mut Criterion) {
    let mut rng = fastrand::Rng::with_seed(7);
    let v = tree::sample(49, &mut rng);
    let notation = decode_newick(&v, true).expect("sampled vector decodes");
    let small = tree::sample(11, &mut rng);

    c.bench_function("decode (50 taxa)", |b| b.iter(|| decode(black_box(&v))));

    c.bench_function("decode_newick unrooted (50 taxa)", |b| {
        b.iter(|| decode_newick(black_box(&v), false))
    });

    c.bench_function("encode (50 taxa)", |b| {
        b.iter(|| encode(black_box(&notation)))
    });

    c.bench_function("canonicalize (50 taxa)", |b| {
        b.iter(|| canonicalize(black_box(&v)))
    });

    c.bench_function("equivalents unrooted (12 taxa)", |b| {
        b.iter(|| equivalents(black_box(&small), false))
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
