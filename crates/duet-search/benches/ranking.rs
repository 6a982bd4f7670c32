use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use duet_core::db::DocumentStore;
use duet_core::model::NewDocument;
use duet_search::semantic::vector_candidates;
use duet_search::{BulkLoader, Embedder, HashEmbedder, hybrid_search};

const DIMENSION: usize = 64;
const TIERS: [usize; 3] = [100, 1_000, 5_000];
const TOPICS: [&str; 6] = ["storage", "network", "parser", "codec", "scheduler", "cache"];

fn generate_store(embedder: &HashEmbedder, size: usize) -> DocumentStore {
    let mut store = DocumentStore::open_in_memory(DIMENSION).expect("store");
    let docs: Vec<NewDocument> = (0..size)
        .map(|i| {
            let topic = TOPICS[i % TOPICS.len()];
            NewDocument::new(
                topic,
                format!("{topic} note {i}"),
                format!("how the {topic} layer handles request {i} under load"),
            )
        })
        .collect();
    BulkLoader::new(embedder, &mut store)
        .load(&docs)
        .expect("load corpus");
    store
}

fn bench_hybrid_search(c: &mut Criterion) {
    let embedder = HashEmbedder::new("bench", DIMENSION).expect("embedder");
    let query_text = "scheduler request under load";
    let query = embedder.embed(query_text).expect("embed query");
    let mut group = c.benchmark_group("search.hybrid");

    for size in TIERS {
        let store = generate_store(&embedder, size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("all", size), &store, |b, store| {
            b.iter(|| {
                let results = hybrid_search(store, &query, query_text, None, 10).expect("search");
                black_box(results.len())
            });
        });
        group.bench_with_input(BenchmarkId::new("category", size), &store, |b, store| {
            b.iter(|| {
                let results = hybrid_search(store, &query, query_text, Some("scheduler"), 10)
                    .expect("search");
                black_box(results.len())
            });
        });
    }

    group.finish();
}

fn bench_vector_candidates(c: &mut Criterion) {
    let embedder = HashEmbedder::new("bench", DIMENSION).expect("embedder");
    let query = embedder.embed("parser").expect("embed query");
    let mut group = c.benchmark_group("search.vector");

    for size in TIERS {
        let store = generate_store(&embedder, size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &store, |b, store| {
            b.iter(|| black_box(vector_candidates(store, &query, None).expect("vector").len()));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_hybrid_search, bench_vector_candidates);
criterion_main!(benches);
