use std::collections::HashMap;

use flume::{Receiver, Sender};
use log::trace;
use parking_lot::Mutex;

use super::{block::BlockState, ChunkPos, InChunkPos};

#[derive(Debug, Clone, PartialEq)]
pub enum WorldEvent {
    /// Positions of one chunk whose stored state actually changed.
    BlocksUpdate {
        chunk: ChunkPos,
        updates: HashMap<InChunkPos, Option<BlockState>>,
    },
    ChunkLoaded(ChunkPos),
    ChunkUnloaded(ChunkPos),
}

/// Fans world events out to every live subscriber.
#[derive(Default)]
pub struct EventBus {
    subscribers: Mutex<Vec<Sender<WorldEvent>>>,
}

impl EventBus {
    pub fn subscribe(&self) -> Receiver<WorldEvent> {
        let (tx, rx) = flume::unbounded();
        self.subscribers.lock().push(tx);
        rx
    }

    pub fn dispatch(&self, event: WorldEvent) {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
        trace!("Dispatched {:?} to {} subscribers", event, subscribers.len());
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}
