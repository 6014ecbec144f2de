use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;
use ultraface::{decode, generate_priors, suppress, FaceDetector, InputSize, NmsMode};

/// Mostly background scores with a few clusters of confident anchors.
fn make_outputs(num_anchors: usize) -> (Vec<f32>, Vec<f32>) {
    let scores = (0..num_anchors)
        .map(|i| if i % 97 < 3 { 0.92 } else { 0.05 })
        .collect();
    let boxes = (0..num_anchors * 4)
        .map(|i| ((i * 31) % 200) as f32 / 100.0 - 1.0)
        .collect();
    (scores, boxes)
}

fn bench_priors(c: &mut Criterion) {
    c.bench_function("generate_priors_320x240", |b| {
        b.iter(|| black_box(generate_priors(320, 240).unwrap()));
    });
}

fn bench_decode(c: &mut Criterion) {
    for &(w, h) in &[(320usize, 240usize), (640, 480)] {
        let priors = generate_priors(w, h).unwrap();
        let (scores, boxes) = make_outputs(priors.len());
        c.bench_function(&format!("decode_{w}x{h}"), |b| {
            b.iter(|| black_box(decode(&scores, &boxes, &priors, w, h, 0.7).unwrap()));
        });
    }
}

fn bench_suppress(c: &mut Criterion) {
    let priors = generate_priors(320, 240).unwrap();
    let (scores, boxes) = make_outputs(priors.len());
    let candidates = decode(&scores, &boxes, &priors, 320, 240, 0.7).unwrap();

    for mode in [NmsMode::Hard, NmsMode::Blending] {
        c.bench_function(&format!("suppress_{mode}_320x240"), |b| {
            b.iter(|| black_box(suppress(candidates.clone(), 0.35, mode).unwrap()));
        });
    }
}

fn bench_detect(c: &mut Criterion) {
    let detector = FaceDetector::new(InputSize::new(640, 480, 3)).unwrap();
    let (scores, boxes) = make_outputs(detector.num_anchors());
    c.bench_function("detect_640x480", |b| {
        b.iter(|| black_box(detector.detect_flat(&scores, &boxes).unwrap()));
    });
}

criterion_group!(
    benches,
    bench_priors,
    bench_decode,
    bench_suppress,
    bench_detect
);
criterion_main!(benches);
