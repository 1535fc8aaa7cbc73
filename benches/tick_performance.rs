//! Performance benchmarks for team formation and the tick loop

use chrono::{Duration, Utc};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use match_foundry::config::EngineConfig;
use match_foundry::matchmaking::{MatchmakingEngine, TeamBuilder};
use match_foundry::types::QueueEntry;

fn entry(party_id: &str, mmr: i32, party_size: usize, age_secs: i64) -> QueueEntry {
    QueueEntry {
        party_id: party_id.to_string(),
        region: "us-west".to_string(),
        mode: "ranked".to_string(),
        team_size: 5,
        party_size,
        avg_mmr: mmr,
        player_ids: (0..party_size)
            .map(|i| format!("{}_p{}", party_id, i))
            .collect(),
        enqueued_at: Utc::now() - Duration::seconds(age_secs),
    }
}

fn benchmark_team_formation(c: &mut Criterion) {
    let shallow: Vec<QueueEntry> = (0..10)
        .map(|i| entry(&format!("party{}", i), 1500 + (i % 7) * 10, 1, 60 - i as i64))
        .collect();

    c.bench_function("try_form_match_10_solos", |b| {
        b.iter(|| TeamBuilder::try_form_match(black_box(&shallow), 5, 2, 200, 0.6))
    });

    // A deep bucket where the early prefixes fail the tolerance gate
    let deep: Vec<QueueEntry> = (0..64)
        .map(|i| entry(&format!("party{}", i), 1200 + i * 25, 1, 120 - i as i64))
        .collect();

    c.bench_function("try_form_match_deep_bucket", |b| {
        b.iter(|| TeamBuilder::try_form_match(black_box(&deep), 5, 2, 300, 0.6))
    });
}

fn benchmark_engine_tick(c: &mut Criterion) {
    c.bench_function("tick_200_parties_4_buckets", |b| {
        b.iter_with_setup(
            || {
                let mut engine = MatchmakingEngine::new(EngineConfig::default()).unwrap();
                for i in 0..200 {
                    let mut e = entry(&format!("party{}", i), 1450 + (i % 20) * 10, 1, 30);
                    e.region = if i % 2 == 0 { "us-west" } else { "eu-west" }.to_string();
                    e.mode = if i % 4 < 2 { "ranked" } else { "casual" }.to_string();
                    engine.enqueue(e).unwrap();
                }
                engine
            },
            |mut engine| {
                black_box(engine.tick());
            },
        )
    });
}

criterion_group!(benches, benchmark_team_formation, benchmark_engine_tick);
criterion_main!(benches);
