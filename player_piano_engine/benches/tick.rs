// Tick throughput per style, with and without weather.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use player_piano_engine::{Engine, EngineConfig, ManualClock, Style};
use player_piano_protocol::WeatherReading;
use rand::SeedableRng;
use rand::rngs::StdRng;

fn bench_styles(c: &mut Criterion) {
    let mut group = c.benchmark_group("tick");
    for style in Style::ALL {
        group.bench_with_input(BenchmarkId::from_parameter(style), &style, |b, &style| {
            let clock = ManualClock::new(0);
            let mut engine = Engine::with_parts(
                EngineConfig::default(),
                clock.clone(),
                StdRng::seed_from_u64(42),
            )
            .with_style(style);
            b.iter(|| {
                clock.advance(120);
                black_box(engine.generate_event(None))
            });
        });
    }
    group.finish();
}

fn bench_weather(c: &mut Criterion) {
    let clock = ManualClock::new(0);
    let mut engine = Engine::with_parts(
        EngineConfig::default(),
        clock.clone(),
        StdRng::seed_from_u64(7),
    );
    let reading = WeatherReading::new(-5.0, 71, "Slight snow fall");
    c.bench_function("tick_with_weather", |b| {
        b.iter(|| {
            clock.advance(120);
            black_box(engine.generate_event(Some(black_box(&reading))))
        });
    });
}

criterion_group!(benches, bench_styles, bench_weather);
criterion_main!(benches);
