//! Frame tasks that keep arena-allocated state in their worker heap.

use std::sync::Arc;

use weft_arena::{Arena, ArenaHandle};
use weft_core::{AllocError, WorkerIdx};
use weft_engine::{Engine, FrameContext, FrameTask, InitContext, TaskFactory};
use weft_test_utils::{test_config, ManualClock, RecordingSink};

const PARTICLES: usize = 64;

#[derive(Clone, Copy)]
struct Particle {
    x: u32,
    y: u32,
}

struct Particles {
    arena: Arena<Particle>,
    live: Vec<ArenaHandle<Particle>>,
}

impl Particles {
    fn new() -> Self {
        Self {
            arena: Arena::for_type(PARTICLES).unwrap(),
            live: Vec::new(),
        }
    }
}

impl FrameTask for Particles {
    fn init(&mut self, ctx: &mut InitContext<'_>) -> Result<(), AllocError> {
        for i in 0..PARTICLES as u32 {
            let handle = self.arena.alloc(ctx.heap(), Particle { x: i, y: 0 })?;
            self.live.push(handle);
        }
        Ok(())
    }

    fn render(&mut self, frame: &mut FrameContext<'_>) {
        // Recycle half the particles every frame through the free list.
        let recycled: Vec<_> = self.live.drain(..PARTICLES / 2).collect();
        for handle in recycled {
            let old = self.arena.free(handle);
            let moved = Particle { x: old.x, y: old.y + 1 };
            match self.arena.alloc(frame.heap(), moved) {
                Ok(handle) => self.live.push(handle),
                Err(e) => panic!("recycled slot unavailable: {e}"),
            }
        }

        let fb = frame.frame_buffer();
        let rows = frame.rows();
        fb.fill_rows(rows.clone(), 0);
        for p in self.arena.iter() {
            let y = rows.start + p.y % rows.len().max(1) as u32;
            if rows.contains(&y) {
                fb.set_pixel(p.x % fb.width(), y, 1);
            }
        }
    }
}

#[test]
fn arena_state_survives_frames_without_heap_growth() {
    let tasks: Arc<dyn TaskFactory> = Arc::new(|_: WorkerIdx| Box::new(Particles::new()) as Box<dyn FrameTask>);
    let clock = ManualClock::new(0.0);
    let mut engine = Engine::build_with_clock(test_config(2, 64, 8), tasks, Box::new(clock.clone())).unwrap();
    engine.run().unwrap();

    let after_init = engine.view().mem_counters().total();
    assert!(after_init > 0);

    let mut sink = RecordingSink::new();
    for _ in 0..10 {
        clock.advance(16.0);
        assert!(engine.tick_now(&mut sink).unwrap().presented);
    }

    assert_eq!(engine.view().mem_counters().total(), after_init);
    let lit = sink.last().unwrap().pixels().iter().filter(|&&p| p == 1).count();
    assert!(lit > 0);
}
