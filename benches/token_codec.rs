use authtoken::token::{codec, entropy};
use chrono::Utc;
use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;

fn bench_encode(c: &mut Criterion) {
    let mut rng = entropy::from_seed(1);
    let now = Utc::now();
    c.bench_function("encode", |b| {
        b.iter(|| codec::encode(black_box(now), &mut rng).unwrap())
    });
}

fn bench_decode_time(c: &mut Criterion) {
    let payload = codec::encode(Utc::now(), &mut entropy::from_seed(1)).unwrap();
    c.bench_function("decode_time", |b| {
        b.iter(|| codec::decode_time(black_box(&payload)).unwrap())
    });
}

criterion_group!(benches, bench_encode, bench_decode_time);
criterion_main!(benches);
