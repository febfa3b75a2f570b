//! Capacity-bounded keyed object pool.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use thiserror::Error;
use tracing::trace;

use super::janitor::{Janitor, Sweep};
use crate::config::TranscodeConfig;

/// Errors from [`RasterPool::take`].
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum PoolError {
    /// The caller's source was cancelled while waiting for capacity.
    #[error("Cancelled while waiting for a pooled raster")]
    Cancelled,
}

struct PoolState<K, V> {
    free: HashMap<K, Vec<V>>,
    free_total: usize,
    outstanding: usize,
}

struct PoolInner<K, V> {
    state: Mutex<PoolState<K, V>>,
    available: Condvar,
    capacity: usize,
    wait_tick: Duration,
    janitor: Option<Janitor>,
}

impl<K, V> Sweep for PoolInner<K, V>
where
    K: Eq + Hash + Send + 'static,
    V: Send + 'static,
{
    fn sweep(&self) -> usize {
        let mut state = self.state.lock();
        let evicted = state.free_total;
        state.free.clear();
        state.free_total = 0;
        evicted
    }
}

/// A bounded map from key to a free list of reusable instances.
///
/// At most `capacity` instances exist at once, counting both lent-out and
/// free ones. When the pool is full and the requested key has no free
/// instance, a free instance of another key is dropped to make room; only
/// when nothing is free does `take` block.
///
/// Cloning is cheap and yields a handle to the same pool.
pub struct RasterPool<K, V> {
    inner: Arc<PoolInner<K, V>>,
}

impl<K, V> Clone for RasterPool<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, V> fmt::Debug for RasterPool<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("RasterPool")
            .field("capacity", &self.inner.capacity)
            .field("outstanding", &state.outstanding)
            .field("free", &state.free_total)
            .finish()
    }
}

impl<K, V> RasterPool<K, V>
where
    K: Eq + Hash + Clone + Send + 'static,
    V: Send + 'static,
{
    /// Create a pool with the given capacity and cleanup timings.
    pub fn new(
        capacity: usize,
        wait_tick: Duration,
        quiet_period: Duration,
        hard_cap: Duration,
    ) -> Self {
        let capacity = capacity.max(1);
        let inner = Arc::new_cyclic(|weak| PoolInner {
            state: Mutex::new(PoolState {
                free: HashMap::new(),
                free_total: 0,
                outstanding: 0,
            }),
            available: Condvar::new(),
            capacity,
            wait_tick,
            janitor: Some(Janitor::start(weak.clone(), quiet_period, hard_cap)),
        });
        Self { inner }
    }

    /// Create a pool from the `[pool]` settings of a config.
    pub fn from_config(config: &TranscodeConfig) -> Self {
        Self::new(
            config.pool_capacity,
            config.pool_wait_tick,
            config.pool_quiet_period,
            config.pool_hard_cap,
        )
    }

    /// Take a free instance for `key`, or allocate one with `alloc`.
    ///
    /// Blocks while the pool is at capacity with nothing free. Every
    /// `wait_tick` the wait is interrupted and `is_cancelled` consulted; the
    /// wait resumes unless it returns `true`.
    pub fn take<A, C>(&self, key: &K, alloc: A, is_cancelled: C) -> Result<V, PoolError>
    where
        A: FnOnce() -> V,
        C: Fn() -> bool,
    {
        let mut state = self.inner.state.lock();
        loop {
            if let Some(value) = Self::pop_free(&mut state, key) {
                state.outstanding += 1;
                drop(state);
                self.touch();
                return Ok(value);
            }

            if state.outstanding + state.free_total < self.inner.capacity {
                state.outstanding += 1;
                break;
            }

            if state.free_total > 0 {
                Self::evict_one(&mut state);
                state.outstanding += 1;
                break;
            }

            let timed_out = self
                .inner
                .available
                .wait_for(&mut state, self.inner.wait_tick)
                .timed_out();
            if timed_out && is_cancelled() {
                return Err(PoolError::Cancelled);
            }
        }
        drop(state);

        // Capacity is reserved; allocate without holding the lock.
        self.touch();
        Ok(alloc())
    }

    /// Take without blocking; `None` when the pool is exhausted.
    pub fn try_take<A>(&self, key: &K, alloc: A) -> Option<V>
    where
        A: FnOnce() -> V,
    {
        let mut state = self.inner.state.lock();
        if let Some(value) = Self::pop_free(&mut state, key) {
            state.outstanding += 1;
            drop(state);
            self.touch();
            return Some(value);
        }
        if state.outstanding + state.free_total >= self.inner.capacity {
            if state.free_total == 0 {
                return None;
            }
            Self::evict_one(&mut state);
        }
        state.outstanding += 1;
        drop(state);
        self.touch();
        Some(alloc())
    }

    /// Return an instance to the free list for `key`.
    pub fn surrender(&self, key: K, value: V) {
        let mut state = self.inner.state.lock();
        state.outstanding = state.outstanding.saturating_sub(1);
        state.free.entry(key).or_default().push(value);
        state.free_total += 1;
        drop(state);
        self.inner.available.notify_one();
        self.touch();
    }

    /// Release the capacity held by an instance that will not come back.
    pub fn forfeit(&self) {
        let mut state = self.inner.state.lock();
        state.outstanding = state.outstanding.saturating_sub(1);
        drop(state);
        self.inner.available.notify_one();
    }

    /// Drop every free instance now, returning how many were evicted.
    pub fn evict_free(&self) -> usize {
        let evicted = self.inner.sweep();
        if evicted > 0 {
            self.inner.available.notify_all();
        }
        evicted
    }

    /// Number of free instances for `key`.
    pub fn free_count(&self, key: &K) -> usize {
        self.inner
            .state
            .lock()
            .free
            .get(key)
            .map_or(0, |list| list.len())
    }

    /// Total free instances across keys.
    pub fn free_total(&self) -> usize {
        self.inner.state.lock().free_total
    }

    /// Instances currently lent out.
    pub fn outstanding(&self) -> usize {
        self.inner.state.lock().outstanding
    }

    /// Maximum number of live instances.
    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    fn pop_free(state: &mut PoolState<K, V>, key: &K) -> Option<V> {
        let value = state.free.get_mut(key)?.pop()?;
        state.free_total -= 1;
        Some(value)
    }

    fn evict_one(state: &mut PoolState<K, V>) {
        let victim = state
            .free
            .iter()
            .find(|(_, list)| !list.is_empty())
            .map(|(k, _)| k.clone());
        if let Some(victim) = victim {
            if let Some(list) = state.free.get_mut(&victim) {
                list.pop();
                state.free_total -= 1;
                trace!("Evicted free pooled instance to make room");
            }
        }
    }

    fn touch(&self) {
        if let Some(janitor) = &self.inner.janitor {
            janitor.touch();
        }
    }
}
