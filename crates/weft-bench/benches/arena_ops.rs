//! Criterion micro-benchmarks for arena allocation and free-list reuse.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use weft_arena::{Arena, ArenaHandle};
use weft_memory::{MemoryRegion, RegionHeap, RegionId};

#[derive(Clone, Copy)]
struct Particle {
    pos: [f32; 2],
    vel: [f32; 2],
    life: u32,
}

const PARTICLE: Particle = Particle {
    pos: [0.0; 2],
    vel: [1.0, -1.0],
    life: 60,
};

fn heap(size: usize) -> RegionHeap {
    RegionHeap::new(MemoryRegion {
        id: RegionId::SharedHeap,
        offset: 0,
        size,
    })
}

/// Benchmark: 10K allocations into a fresh arena, growing block by block.
fn bench_alloc_10k(c: &mut Criterion) {
    c.bench_function("arena_alloc_10k", |b| {
        b.iter(|| {
            let mut heap = heap(1 << 20);
            let mut arena = Arena::<Particle>::for_type(256).unwrap();
            for _ in 0..10_000 {
                black_box(arena.alloc(&mut heap, PARTICLE).unwrap());
            }
            black_box(arena.block_count());
        });
    });
}

/// Benchmark: free and reallocate 1K objects through the free list.
fn bench_free_list_churn(c: &mut Criterion) {
    let mut heap = heap(1 << 20);
    let mut arena = Arena::<Particle>::for_type(1024).unwrap();
    let mut live: Vec<ArenaHandle<Particle>> = (0..1024)
        .map(|_| arena.alloc(&mut heap, PARTICLE).unwrap())
        .collect();
    c.bench_function("arena_free_list_churn_1k", |b| {
        b.iter(|| {
            for handle in live.drain(..) {
                black_box(arena.free(handle));
            }
            for _ in 0..1024 {
                live.push(arena.alloc(&mut heap, PARTICLE).unwrap());
            }
        });
    });
}

/// Benchmark: mutate every live object through its handle.
fn bench_get_mut_1k(c: &mut Criterion) {
    let mut heap = heap(1 << 20);
    let mut arena = Arena::<Particle>::for_type(1024).unwrap();
    let live: Vec<_> = (0..1024)
        .map(|_| arena.alloc(&mut heap, PARTICLE).unwrap())
        .collect();
    c.bench_function("arena_get_mut_1k", |b| {
        b.iter(|| {
            for handle in &live {
                if let Some(p) = arena.get_mut(handle) {
                    p.pos[0] += p.vel[0];
                    p.pos[1] += p.vel[1];
                    p.life = p.life.wrapping_sub(1);
                }
            }
        });
    });
}

criterion_group!(benches, bench_alloc_10k, bench_free_list_churn, bench_get_mut_1k);
criterion_main!(benches);
