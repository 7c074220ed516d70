use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use parlay_terminal::analysis_fetch::{interpret_response, parse_analysis_json};
use parlay_terminal::distribution::{CurveMemo, Viewport, render_distribution};
use parlay_terminal::state::{AppState, Delta, apply_delta};

fn bench_render_distribution(c: &mut Criterion) {
    c.bench_function("render_distribution", |b| {
        b.iter(|| {
            let curve = render_distribution(
                black_box(25.0),
                black_box(5.0),
                black_box(27.5),
                None,
            )
            .unwrap();
            black_box(curve.line_marker_x);
        })
    });
}

fn bench_path_descriptor(c: &mut Criterion) {
    let curve = render_distribution(25.0, 5.0, 27.5, None).unwrap();
    c.bench_function("path_descriptor", |b| {
        b.iter(|| {
            let desc = black_box(&curve).path_descriptor();
            black_box(desc.len());
        })
    });
}

fn bench_curve_memo_hit(c: &mut Criterion) {
    let mut memo = CurveMemo::new();
    let vp = Viewport::default();
    c.bench_function("curve_memo_hit", |b| {
        b.iter(|| {
            let curve = memo.get(black_box(25.0), 5.0, 27.5, vp);
            black_box(curve.is_some());
        })
    });
}

fn bench_parse_analysis(c: &mut Criterion) {
    c.bench_function("parse_analysis_json", |b| {
        b.iter(|| {
            let result = parse_analysis_json(black_box(ANALYSIS_JSON)).unwrap();
            black_box(result.probability);
        })
    });
    c.bench_function("interpret_rate_limit", |b| {
        b.iter(|| {
            let err = interpret_response(429, black_box(RATE_LIMIT_JSON)).unwrap_err();
            black_box(err.to_string().len());
        })
    });
}

fn bench_apply_result(c: &mut Criterion) {
    let result = parse_analysis_json(ANALYSIS_JSON).unwrap();
    let request = parlay_terminal::analysis_fetch::validate_form(
        "LeBron James",
        "25.5",
        parlay_terminal::analysis_fetch::StatType::Points,
        parlay_terminal::analysis_fetch::BetType::Over,
    )
    .unwrap();
    c.bench_function("apply_analysis_finished", |b| {
        b.iter(|| {
            let mut state = AppState::new();
            apply_delta(&mut state, Delta::AnalysisStarted(request.clone()));
            apply_delta(
                &mut state,
                Delta::AnalysisFinished {
                    request: request.clone(),
                    result: result.clone(),
                    cached: false,
                },
            );
            black_box(state.curve.is_some());
        })
    });
}

criterion_group!(
    benches,
    bench_render_distribution,
    bench_path_descriptor,
    bench_curve_memo_hit,
    bench_parse_analysis,
    bench_apply_result
);
criterion_main!(benches);

const ANALYSIS_JSON: &str = r#"{
  "player": "LeBron James",
  "stat_type": "points",
  "line": 25.5,
  "bet_type": "over",
  "season_avg": 27.1,
  "season_std": 6.4,
  "recent_avg": 28.3,
  "probability": 0.598,
  "edge": 0.074,
  "recommendation": "HIT",
  "confidence_80": [18.9, 35.3],
  "usage": { "remaining": 7, "total_limit": 10 }
}"#;

const RATE_LIMIT_JSON: &str =
    r#"{"detail":{"message":"Daily limit of 10 analyses reached. Resets at midnight UTC."}}"#;
