use std::ops::{Deref, DerefMut};

use parking_lot::{const_mutex, Mutex};

use super::tracer::TraceScratch;

const MAX_POOLED: usize = 8;

static POOL: Mutex<Vec<Box<TraceScratch>>> = const_mutex(Vec::new());

/// A scratch buffer borrowed from the pool; goes back on drop.
pub struct PooledScratch(Option<Box<TraceScratch>>);

pub fn checkout() -> PooledScratch {
    let scratch = POOL.lock().pop();
    let mut scratch = scratch.unwrap_or_default();
    scratch.reset();
    PooledScratch(Some(scratch))
}

impl Deref for PooledScratch {
    type Target = TraceScratch;

    fn deref(&self) -> &TraceScratch {
        self.0.as_deref().expect("scratch already returned")
    }
}

impl DerefMut for PooledScratch {
    fn deref_mut(&mut self) -> &mut TraceScratch {
        self.0.as_deref_mut().expect("scratch already returned")
    }
}

impl Drop for PooledScratch {
    fn drop(&mut self) {
        if let Some(scratch) = self.0.take() {
            let mut pool = POOL.lock();
            if pool.len() < MAX_POOLED {
                pool.push(scratch);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffers_are_reset_on_checkout() {
        {
            let mut scratch = checkout();
            scratch.regions.set_blocked(0);
        }
        let scratch = checkout();
        assert!(scratch.is_clean());
    }
}
