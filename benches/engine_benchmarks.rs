use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use olympiad_core::bracket::{ParticipantId, pair_round, round_name};
use olympiad_core::points::allocate;
use olympiad_core::ranking::{StudentAnswer, compute_bands};
use uuid::Uuid;

/// Helper to create a score-descending cohort of N records
fn setup_cohort(n: usize) -> Vec<StudentAnswer> {
    let class_type_id = Uuid::new_v4();
    (0..n)
        .map(|i| StudentAnswer {
            id: Uuid::new_v4(),
            class_type_id,
            student_id: Uuid::new_v4(),
            total_score: 1000.0 - i as f64,
        })
        .collect()
}

fn setup_participants(n: usize) -> Vec<ParticipantId> {
    (0..n).map(|_| Uuid::new_v4()).collect()
}

/// Benchmark band slicing across cohort sizes
fn bench_compute_bands(c: &mut Criterion) {
    let mut group = c.benchmark_group("compute_bands");
    for size in [10, 100, 1000, 10000] {
        let ranked = setup_cohort(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &ranked, |b, ranked| {
            b.iter(|| compute_bands(ranked, 3));
        });
    }
    group.finish();
}

/// Benchmark first-round pairing across bracket sizes
fn bench_pair_round(c: &mut Criterion) {
    let mut group = c.benchmark_group("pair_round");
    for size in [8, 64, 512] {
        let participants = setup_participants(size);
        let tournament_id = Uuid::new_v4();
        let label = round_name(size);
        group.bench_with_input(
            BenchmarkId::from_parameter(size),
            &participants,
            |b, participants| {
                b.iter(|| pair_round(tournament_id, &label, participants));
            },
        );
    }
    group.finish();
}

/// Benchmark PiPoints allocation for a large placement list
fn bench_allocate(c: &mut Criterion) {
    let participants = setup_participants(64);

    c.bench_function("allocate_64_places", |b| {
        b.iter(|| allocate(&participants, 1_000_000));
    });
}

/// Benchmark playing a full 64-player bracket in memory
fn bench_full_bracket(c: &mut Criterion) {
    c.bench_function("simulate_bracket_64", |b| {
        let participants = setup_participants(64);
        b.iter(|| {
            let tournament_id = Uuid::new_v4();
            let mut alive = participants.clone();
            while alive.len() > 1 {
                let matches = pair_round(tournament_id, &round_name(alive.len()), &alive);
                alive = matches
                    .iter()
                    .map(|m| m.winner.unwrap_or(m.slot_a))
                    .collect();
            }
            alive
        });
    });
}

criterion_group!(
    benches,
    bench_compute_bands,
    bench_pair_round,
    bench_allocate,
    bench_full_bracket
);
criterion_main!(benches);
