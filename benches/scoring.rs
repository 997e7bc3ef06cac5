//! Classification throughput benchmark.
//!
//! Every throw in every round funnels through `score_from_board_xy`, so a
//! regression here shows up as frame hitches on release.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use bullseye::game::board::BoardConfig;
use bullseye::game::scoring::score_from_board_xy;

fn bench_classification(c: &mut Criterion) {
    let config = BoardConfig::default();

    // Deterministic spread of hits over (and past) the whole board
    let hits: Vec<(f32, f32)> = (0..512)
        .map(|i| {
            let theta = i as f32 * 0.7;
            let r = (i % 64) as f32 / 64.0 * 1.2;
            (r * theta.cos(), r * theta.sin())
        })
        .collect();

    c.bench_function("classify_512_hits", |b| {
        b.iter(|| {
            for &(x, y) in &hits {
                black_box(score_from_board_xy(black_box(x), black_box(y), &config));
            }
        })
    });
}

criterion_group!(benches, bench_classification);
criterion_main!(benches);
