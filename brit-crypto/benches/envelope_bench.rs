//! Criterion benchmarks for BRIT crypto: keygen, encapsulate, envelope seal/open.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use brit_crypto::{decrypt, encapsulate, encrypt, generate_keypair};

fn bench_keygen(c: &mut Criterion) {
    let mut g = c.benchmark_group("keygen");
    g.throughput(Throughput::Elements(1));
    g.bench_function("generate_keypair", |b| {
        b.iter(|| black_box(generate_keypair()));
    });
    g.finish();
}

fn bench_encapsulate(c: &mut Criterion) {
    let keypair = generate_keypair();
    let mut g = c.benchmark_group("encapsulate");
    g.throughput(Throughput::Elements(1));
    g.bench_function("encapsulate", |b| {
        b.iter(|| black_box(encapsulate(&keypair.public)).unwrap());
    });
    g.finish();
}

/// Address lists of 1, 100 and 10k entries (~35 bytes per address).
fn bench_envelope(c: &mut Criterion) {
    let keypair = generate_keypair();
    let mut g = c.benchmark_group("envelope");

    for addresses in [1usize, 100, 10_000] {
        let plaintext = vec![b'1'; addresses * 35];
        g.throughput(Throughput::Bytes(plaintext.len() as u64));

        g.bench_with_input(BenchmarkId::new("encrypt", addresses), &plaintext, |b, p| {
            b.iter(|| black_box(encrypt(p, &keypair.public)).unwrap());
        });

        let blob = encrypt(&plaintext, &keypair.public).unwrap();
        g.bench_with_input(BenchmarkId::new("decrypt", addresses), &blob, |b, blob| {
            b.iter(|| black_box(decrypt(blob, &keypair.secret)).unwrap());
        });
    }
    g.finish();
}

criterion_group!(benches, bench_keygen, bench_encapsulate, bench_envelope);
criterion_main!(benches);
