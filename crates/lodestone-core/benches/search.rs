//! Benchmarks for brute-force similarity ranking and query embedding.
//!
//! Run with: `cargo bench -p lodestone-core --bench search`
//!
//! These benchmarks measure:
//! - Ranking precomputed vectors at various corpus sizes
//! - Refitting the query vectorizer over a corpus (the per-query cost of the
//!   default `refit` query space)

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use lodestone_core::config::{RetrievalConfig, DEFAULT_MAX_FEATURES, DEFAULT_SEARCH_LIMIT};
use lodestone_core::embedding::EmbeddingGenerator;
use lodestone_core::search::{ChunkRecord, SimilarityIndex};
use lodestone_core::storage::InMemoryChunkStore;

// =============================================================================
// Test Data Generation
// =============================================================================

/// Deterministic L2-normalized vector for `seed`.
fn seeded_embedding(seed: u64, dimension: usize) -> Vec<f32> {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let raw: Vec<f32> = (0..dimension)
        .map(|i| {
            let mut hasher = DefaultHasher::new();
            seed.hash(&mut hasher);
            i.hash(&mut hasher);
            let h = hasher.finish();
            ((h as f32 / u64::MAX as f32) * 2.0) - 1.0
        })
        .collect();

    let norm: f32 = raw.iter().map(|x| x * x).sum::<f32>().sqrt();
    raw.into_iter().map(|x| x / norm).collect()
}

fn sample_text(id: u64) -> String {
    let topics = [
        "refund policies and receipt requirements for returned goods",
        "international shipping times and customs declarations",
        "warranty coverage for electronics and small appliances",
        "loyalty programs and store credit balances",
        "order tracking numbers and dispatch notifications",
        "payment methods including cards and bank transfers",
    ];
    let topic = topics[(id as usize) % topics.len()];
    format!(
        "Section {} covers {}. Customers asked about {} in ticket {}.",
        id,
        topic,
        topic,
        id * 7
    )
}

fn records(count: u64, dimension: usize) -> Vec<ChunkRecord> {
    (0..count)
        .map(|id| ChunkRecord {
            chunk_id: format!("chunk-{}", id),
            document_id: format!("doc-{}", id / 50),
            chunk_index: (id % 50) as usize,
            page_number: 1,
            content: sample_text(id),
            embedding: seeded_embedding(id, dimension),
        })
        .collect()
}

// =============================================================================
// Benchmarks
// =============================================================================

fn bench_rank(c: &mut Criterion) {
    let mut group = c.benchmark_group("rank");
    let index = SimilarityIndex::new(InMemoryChunkStore::new());
    let query = seeded_embedding(1_000_000, DEFAULT_MAX_FEATURES);

    for size in [100u64, 1_000, 10_000] {
        let corpus = records(size, DEFAULT_MAX_FEATURES);
        group.throughput(Throughput::Elements(size));
        group.bench_with_input(BenchmarkId::from_parameter(size), &corpus, |b, corpus| {
            b.iter(|| {
                index.rank(
                    black_box(corpus),
                    black_box(&query),
                    DEFAULT_SEARCH_LIMIT,
                    0.0,
                )
            })
        });
    }
    group.finish();
}

fn bench_query_refit(c: &mut Criterion) {
    let mut group = c.benchmark_group("query_refit");
    let generator = EmbeddingGenerator::from_config(&RetrievalConfig::default(), None);

    for size in [100u64, 1_000] {
        let corpus: Vec<String> = (0..size).map(sample_text).collect();
        group.throughput(Throughput::Elements(size));
        group.bench_with_input(BenchmarkId::from_parameter(size), &corpus, |b, corpus| {
            b.iter(|| generator.embed_query(black_box("How long does shipping take?"), corpus))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_rank, bench_query_refit);
criterion_main!(benches);
