//! Frame-scoped resource pools
//!
//! A grow-only arena with a per-frame cursor. `reset` rewinds the cursor at
//! the start of a frame; `acquire` hands back the entry at the cursor,
//! constructing a new one only when the cursor passes the end. Once the peak
//! per-frame usage has been reached the pool stops allocating entirely.
//!
//! Both the uniform-set pool and the dynamic-model pool are instances of
//! this; entries are reused in index order, so an entry handed out this
//! frame is not touched again until the same flight slot comes around and
//! the fence wait has proven the GPU is done reading it.

/// Soft cap above which a pool logs a one-time warning.
///
/// Growth past this point is legal but almost certainly indicates a caller
/// requesting an unbounded number of distinct resources per frame.
const POOL_SOFT_CAP: usize = 1024;

/// Grow-only pool with a per-frame cursor
pub struct FramePool<T> {
    items: Vec<T>,
    cursor: usize,
    warned: bool,
}

impl<T> FramePool<T> {
    /// Create an empty pool
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            cursor: 0,
            warned: false,
        }
    }

    /// Rewind the cursor; entries stay allocated for reuse
    pub fn reset(&mut self) {
        self.cursor = 0;
    }

    /// Take the next entry, constructing one if the pool is exhausted
    ///
    /// Entries are returned in index order within a frame; the pool never
    /// shrinks across the process lifetime.
    pub fn acquire<E>(&mut self, factory: impl FnOnce() -> Result<T, E>) -> Result<&mut T, E> {
        if self.cursor >= self.items.len() {
            self.items.push(factory()?);
            if self.items.len() > POOL_SOFT_CAP && !self.warned {
                log::warn!(
                    "frame pool grew past {} entries; per-frame resource usage may be unbounded",
                    POOL_SOFT_CAP
                );
                self.warned = true;
            }
        }

        let item = &mut self.items[self.cursor];
        self.cursor += 1;
        Ok(item)
    }

    /// Number of entries ever allocated
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the pool has never allocated
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Entries handed out since the last reset
    pub fn in_use(&self) -> usize {
        self.cursor
    }

    /// Iterate over all allocated entries
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }
}

impl<T> Default for FramePool<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;

    fn counting_factory(counter: &mut u32) -> impl FnOnce() -> Result<u32, Infallible> + '_ {
        move || {
            *counter += 1;
            Ok(*counter)
        }
    }

    #[test]
    fn first_acquire_after_reset_returns_slot_zero() {
        let mut pool: FramePool<u32> = FramePool::new();
        let mut made = 0;

        for _ in 0..4 {
            pool.acquire(counting_factory(&mut made)).unwrap();
        }
        assert_eq!(pool.len(), 4);

        pool.reset();
        let first = *pool.acquire(counting_factory(&mut made)).unwrap();
        // Slot 0 was built first, so its value identifies it.
        assert_eq!(first, 1);
        assert_eq!(made, 4);
    }

    #[test]
    fn nth_acquire_returns_slot_n_minus_one() {
        let mut pool: FramePool<u32> = FramePool::new();
        let mut made = 0;

        pool.acquire(counting_factory(&mut made)).unwrap();
        pool.acquire(counting_factory(&mut made)).unwrap();
        pool.reset();

        let _ = pool.acquire(counting_factory(&mut made)).unwrap();
        let second = *pool.acquire(counting_factory(&mut made)).unwrap();
        assert_eq!(second, 2);
        assert_eq!(pool.in_use(), 2);
    }

    #[test]
    fn pool_stabilizes_at_peak_usage() {
        // Three entries in one frame, one in the next: no new allocations
        // after the first frame.
        let mut pool: FramePool<u32> = FramePool::new();
        let mut made = 0;

        for _ in 0..3 {
            pool.acquire(counting_factory(&mut made)).unwrap();
        }
        assert_eq!(pool.len(), 3);

        pool.reset();
        pool.acquire(counting_factory(&mut made)).unwrap();
        assert_eq!(pool.len(), 3);
        assert_eq!(made, 3);
    }

    #[test]
    fn single_entry_reused_across_frames() {
        // One draw per frame for five frames: the pool never grows past one.
        let mut pool: FramePool<u32> = FramePool::new();
        let mut made = 0;

        for _ in 0..5 {
            pool.reset();
            pool.acquire(counting_factory(&mut made)).unwrap();
            assert_eq!(pool.len(), 1);
        }
        assert_eq!(made, 1);
    }

    #[test]
    fn factory_error_propagates_without_growth() {
        let mut pool: FramePool<u32> = FramePool::new();
        let result: Result<&mut u32, &str> = pool.acquire(|| Err("nope"));
        assert!(result.is_err());
        assert_eq!(pool.len(), 0);
    }
}
