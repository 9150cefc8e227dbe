//! Benchmarks for the chunked feature extraction pass.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ndarray::Array2;

use feature_engine::{
    compute_features_from_peaks, FeatureKind, FeatureRequest, InMemoryRecording, JobConfig, Peak,
};

const NUM_CHANNELS: usize = 32;
const NUM_SAMPLES: usize = 300_000;

fn create_recording() -> InMemoryRecording {
    let traces = Array2::from_shape_fn((NUM_SAMPLES, NUM_CHANNELS), |(t, c)| {
        ((t as f32 * 0.013) + c as f32).sin() * 20.0 + ((t * 31 + c * 7) % 17) as f32
    });
    // Two columns of 16 contacts, 20 um pitch
    let locations = Array2::from_shape_fn((NUM_CHANNELS, 2), |(c, d)| {
        if d == 0 {
            (c % 2) as f64 * 16.0
        } else {
            (c / 2) as f64 * 20.0
        }
    });
    InMemoryRecording::single_segment(traces, locations, 30_000.0).unwrap()
}

fn create_peaks(count: usize) -> Vec<Peak> {
    let step = NUM_SAMPLES / count;
    (0..count)
        .map(|i| Peak::new(0, i * step + step / 2, (i * 5) % NUM_CHANNELS, -50.0))
        .collect()
}

fn benchmark_default_features(c: &mut Criterion) {
    let recording = create_recording();
    let peaks = create_peaks(5_000);
    let request = FeatureRequest::default();

    c.bench_function("amplitude_ptp_5000_peaks", |b| {
        b.iter(|| {
            compute_features_from_peaks(
                &recording,
                black_box(&peaks),
                &request,
                JobConfig::default(),
            )
            .unwrap()
        })
    });
}

fn benchmark_all_features(c: &mut Criterion) {
    let recording = create_recording();
    let peaks = create_peaks(5_000);
    let request = FeatureRequest::new(FeatureKind::ALL);

    c.bench_function("all_features_5000_peaks", |b| {
        b.iter(|| {
            compute_features_from_peaks(
                &recording,
                black_box(&peaks),
                &request,
                JobConfig::default(),
            )
            .unwrap()
        })
    });

    c.bench_function("all_features_5000_peaks_single_thread", |b| {
        b.iter(|| {
            compute_features_from_peaks(
                &recording,
                black_box(&peaks),
                &request,
                JobConfig::sequential(10_000),
            )
            .unwrap()
        })
    });
}

criterion_group!(benches, benchmark_default_features, benchmark_all_features);
criterion_main!(benches);
