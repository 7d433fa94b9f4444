use std::{sync::Arc, thread::JoinHandle};

use dashmap::DashSet;
use flume::{Receiver, Sender};
use log::{debug, trace};

use super::{gen::WorldGenerator, ChunkPos, World};

/// Feeds generated chunks to the world from a pool of worker threads.
pub struct GenerationScheduler {
    world: Arc<World>,
    generator: Arc<WorldGenerator>,
    pending: Arc<DashSet<ChunkPos>>,
    request_tx: Sender<ChunkPos>,
    request_rx: Receiver<ChunkPos>,
}

impl GenerationScheduler {
    pub fn new(world: Arc<World>, generator: Arc<WorldGenerator>) -> GenerationScheduler {
        let (tx, rx) = flume::unbounded();
        GenerationScheduler {
            world,
            generator,
            pending: Arc::new(DashSet::new()),
            request_tx: tx,
            request_rx: rx,
        }
    }

    /// Spawns the workers. They exit once the scheduler is dropped and the
    /// queue has drained.
    pub fn start(&self, num_threads: u32) -> Vec<JoinHandle<()>> {
        debug!("Starting {} generation workers", num_threads);
        (0..num_threads)
            .map(|_| {
                let world = self.world.clone();
                let generator = self.generator.clone();
                let pending = self.pending.clone();
                let rx = self.request_rx.clone();

                std::thread::spawn(move || {
                    while let Ok(pos) = rx.recv() {
                        let prototype = generator.generate(pos);
                        world.receive_chunk(pos, prototype);
                        pending.remove(&pos);
                        trace!("Generated chunk {:?}", pos);
                    }
                })
            })
            .collect()
    }

    pub fn request_region(&self, center_x: i32, center_z: i32, r: i32) {
        for x in -r..=r {
            for z in -r..=r {
                self.request_chunk(center_x + x, center_z + z);
            }
        }
    }

    /// Queues one chunk unless it is loaded or already queued.
    pub fn request_chunk(&self, x: i32, z: i32) -> bool {
        let pos = ChunkPos::new(x, z);
        if self.world.has_chunk(x, z) || !self.pending.insert(pos) {
            return false;
        }
        self.request_tx
            .send(pos)
            .expect("failed to send to chunk queue");
        true
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}
