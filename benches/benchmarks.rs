#[macro_use]
extern crate criterion;

use criterion::Criterion;
use dnabc::barcode::{BarcodeAssigner, BarcodeIndex};
use dnabc::read_pair_iter::{IndexReadPairIter, PairedReadSource};
use dnabc::Sample;

const BARCODE_LEN: usize = 8;
const NUM_SAMPLES: usize = 96;
const NUM_READS: usize = 2000;

// the base-4 digits of `i`, distinct for every i < 4^8
fn barcode(i: usize) -> String {
    (0..BARCODE_LEN)
        .map(|pos| b"ACGT"[(i >> (2 * pos)) & 3] as char)
        .collect()
}

fn samples() -> Vec<Sample> {
    (0..NUM_SAMPLES)
        .map(|i| Sample::new(format!("Sample{}", i), barcode(i * 677 + 1)))
        .collect()
}

fn fastq(n: usize, seq: impl Fn(usize) -> String) -> String {
    let mut s = String::new();
    for i in 0..n {
        let seq = seq(i);
        s.push_str(&format!("@read{}\n{}\n+\n{}\n", i, seq, "I".repeat(seq.len())));
    }
    s
}

fn run_index_benchmark(c: &mut Criterion) {
    let samples = samples();
    c.bench_function("bench-build-exact-index", |b| {
        b.iter(|| BarcodeIndex::new(samples.clone(), 0, true).unwrap().len())
    });
    c.bench_function("bench-error-barcodes-k2", |b| {
        b.iter(|| dnabc::barcode::error_barcodes(b"ACGTACGT", 2).unwrap().len())
    });
}

fn run_assign_benchmark(c: &mut Criterion) {
    let queries: Vec<Vec<u8>> = (0..NUM_READS).map(|i| barcode(i).into_bytes()).collect();
    c.bench_function("bench-assign", |b| {
        b.iter(|| {
            let mut assigner = BarcodeAssigner::new(samples(), 0, false).unwrap();
            for q in &queries {
                assigner.assign(q);
            }
            assert_eq!(assigner.read_counts().total(), NUM_READS as u64);
        })
    });
}

fn run_source_benchmark(c: &mut Criterion) {
    let fwd = fastq(NUM_READS, |_| "ACGTTGCAACGTTGCAACGTTGCAACGTTGCA".to_string());
    let rev = fastq(NUM_READS, |_| "TGCAACGTTGCAACGTTGCAACGTTGCAACGT".to_string());
    let idx = fastq(NUM_READS, barcode);
    c.bench_function("bench-index-read-pair-iter-count", |b| {
        b.iter(|| {
            let mut source = IndexReadPairIter::new(fwd.as_bytes(), rev.as_bytes(), idx.as_bytes());
            let mut n = 0;
            while let Some(_) = source.next_pair().unwrap() {
                n += 1;
            }
            assert_eq!(n, NUM_READS);
        })
    });
}

criterion_group!(
    benches,
    run_index_benchmark,
    run_assign_benchmark,
    run_source_benchmark
);

criterion_main!(benches);
