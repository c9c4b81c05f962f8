//! Criterion benchmarks for the go/done barrier and full frame ticks.

use std::sync::Arc;
use std::thread;

use criterion::{criterion_group, criterion_main, Criterion};
use weft_bench::{reference_profile, scanline_factory, stress_profile};
use weft_core::{EngineConfig, WorkerIdx};
use weft_engine::{Engine, NullSink};
use weft_memory::{compute, SharedBlock};
use weft_sync::{Signal, SyncArray};

/// Benchmark: one empty go/done round trip with 4 parked workers.
fn bench_barrier_round_trip(c: &mut Criterion) {
    let config = EngineConfig {
        num_workers: 5,
        ..EngineConfig::default()
    };
    let layout = Arc::new(compute(&config.layout_config()).unwrap());
    let block = Arc::new(SharedBlock::new(&layout));

    let handles: Vec<_> = WorkerIdx::aux(config.num_workers)
        .map(|worker| {
            let layout = Arc::clone(&layout);
            let block = Arc::clone(&block);
            thread::spawn(move || {
                let sync = SyncArray::new(block.view(&layout).sync_cells());
                while sync.wait_go(worker) == Signal::Go {
                    sync.signal_done(worker);
                }
            })
        })
        .collect();

    let sync = SyncArray::new(block.view(&layout).sync_cells());
    c.bench_function("barrier_round_trip_4", |b| {
        b.iter(|| {
            sync.go_all();
            sync.wait_all_done(None).unwrap();
        });
    });

    sync.release_all();
    for handle in handles {
        handle.join().unwrap();
    }
}

fn bench_tick(c: &mut Criterion, name: &str, config: EngineConfig) {
    let mut engine = Engine::build(config, scanline_factory()).unwrap();
    engine.run().unwrap();
    let mut now = 0.0;
    c.bench_function(name, |b| {
        b.iter(|| {
            now += 16.0;
            engine.tick(now, &mut NullSink).unwrap();
        });
    });
    engine.shutdown();
}

/// Benchmark: full tick (clock, barrier, compose) at the reference profile.
fn bench_tick_reference(c: &mut Criterion) {
    bench_tick(c, "tick_reference_320x200", reference_profile());
}

/// Benchmark: full tick at the stress profile.
fn bench_tick_stress(c: &mut Criterion) {
    bench_tick(c, "tick_stress_1280x720", stress_profile());
}

criterion_group!(benches, bench_barrier_round_trip, bench_tick_reference, bench_tick_stress);
criterion_main!(benches);
