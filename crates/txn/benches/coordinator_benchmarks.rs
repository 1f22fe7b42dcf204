use criterion::{Criterion, black_box, criterion_group, criterion_main};

use serde_json::json;
use txngate_storage::InMemoryEngine;
use txngate_txn::{Coordinator, CoordinatorConfig};

fn bench_commit_path(c: &mut Criterion) {
    let engine = InMemoryEngine::new();
    let coord = Coordinator::new(engine, CoordinatorConfig::default());

    let mut i = 0u64;
    c.bench_function("run_in_transaction/commit", |b| {
        b.iter(|| {
            i += 1;
            let key = format!("bench/{i}");
            let out = coord
                .run_in_transaction(|ctx| {
                    ctx.handle().put(key.as_str(), json!({ "n": i }))?;
                    Ok(i)
                })
                .unwrap();
            black_box(out);
        })
    });
}

fn bench_read_path(c: &mut Criterion) {
    let engine = InMemoryEngine::new();
    engine.seed("bench/doc", json!({ "n": 1 }));
    let coord = Coordinator::new(engine, CoordinatorConfig::default());

    c.bench_function("run_without_transaction/read", |b| {
        b.iter(|| {
            let free = coord
                .run_without_transaction(|| Ok::<_, ()>(coord.semaphore().available_permits()))
                .unwrap();
            black_box(free);
        })
    });
}

criterion_group!(benches, bench_commit_path, bench_read_path);
criterion_main!(benches);
