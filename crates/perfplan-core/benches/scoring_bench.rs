//! # Scoring Benchmarks
//!
//! Performance benchmarks for plan validation, scoring and reporting.
//!
//! Run with: `cargo bench -p perfplan-core`

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use perfplan_core::{
    PerformanceReview, PeriodSummary, Points, ReviewItem, ReviewStatus, UserId, compute_total,
    normalize_plan, validate_for_submission,
};
use std::hint::black_box;

/// A plan of `n` work items sharing 80 points, scored.
fn scored_plan(n: usize) -> Vec<ReviewItem> {
    let share = 8000 / n as i64;
    let mut items: Vec<ReviewItem> = (0..n)
        .map(|i| {
            let weight = if i == 0 {
                8000 - share * (n as i64 - 1)
            } else {
                share
            };
            ReviewItem::work("Goal", "Deliver", "On time", Points::from_hundredths(weight))
        })
        .collect();
    items = normalize_plan(items);
    for (i, item) in items.iter_mut().enumerate() {
        item.score = Some(Points::whole(80 + (i as i64 % 40)));
    }
    items
}

// =============================================================================
// BENCHMARKS
// =============================================================================

fn bench_validation(c: &mut Criterion) {
    let mut group = c.benchmark_group("validate_for_submission");
    for size in [1usize, 5, 10] {
        let items = scored_plan(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &items, |b, items| {
            b.iter(|| black_box(validate_for_submission(black_box(items))));
        });
    }
    group.finish();
}

fn bench_total(c: &mut Criterion) {
    let mut group = c.benchmark_group("compute_total");
    for size in [1usize, 5, 10] {
        let items = scored_plan(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &items, |b, items| {
            b.iter(|| black_box(compute_total(black_box(items))));
        });
    }
    group.finish();
}

fn bench_summary(c: &mut Criterion) {
    let mut group = c.benchmark_group("period_summary");
    let period = "2025-07".parse().expect("period");
    for count in [100u64, 1000, 10000] {
        let reviews: Vec<PerformanceReview> = (0..count)
            .map(|i| {
                let items = scored_plan(4);
                let mut review = PerformanceReview::draft(UserId(i), period, items, 0);
                review.status = ReviewStatus::Completed;
                review.total_score = Some(compute_total(&review.items));
                review
            })
            .collect();
        group.bench_with_input(BenchmarkId::from_parameter(count), &reviews, |b, reviews| {
            b.iter(|| black_box(PeriodSummary::build(period, black_box(reviews))));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_validation, bench_total, bench_summary);
criterion_main!(benches);
