// benches/bench_duration_calculator.rs
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use signal_preempt::flow_analyzer::{DurationCalculator, LaneCounts};

fn bench_green_time(c: &mut Criterion) {
    let calculator = DurationCalculator::default();
    let frames: Vec<LaneCounts> = (0..150).map(|i| LaneCounts::new(i % 12, i % 3)).collect();

    let mut group = c.benchmark_group("duration_calculator");
    group.bench_function("green_time", |b| {
        b.iter(|| calculator.green_time(black_box(14), black_box(3)));
    });
    // Averaging a 5 s window of 30 fps detections, then converting.
    group.bench_function("average_then_green_time", |b| {
        b.iter(|| {
            let counts = LaneCounts::average(black_box(&frames));
            calculator.green_time(counts.cars, counts.trucks)
        });
    });
    group.finish();
}

criterion_group!(benches, bench_green_time);
criterion_main!(benches);
