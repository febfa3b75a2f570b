//! Debounced background eviction of idle pooled instances.
//!
//! Every pool activity pushes the eviction deadline out by the quiet period,
//! but never past `hard_cap` after the first activity since the last sweep:
//!
//! ```text
//! activity ─┬───┬──┬────────────────────┐
//!           │   │  │                    │ quiet period elapsed
//!           ▼   ▼  ▼                    ▼
//!  first ───●───────────────── sweep ───●   (or first + hard cap, if sooner)
//! ```

use std::sync::{Arc, Weak};
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tracing::{debug, warn};

/// Something the janitor can sweep.
pub(crate) trait Sweep: Send + Sync + 'static {
    /// Drop idle instances, returning how many were evicted.
    fn sweep(&self) -> usize;
}

#[derive(Debug, Default)]
struct JanitorState {
    first_activity: Option<Instant>,
    last_activity: Option<Instant>,
    shutdown: bool,
}

struct Shared {
    state: Mutex<JanitorState>,
    wake: Condvar,
    quiet_period: Duration,
    hard_cap: Duration,
}

/// Handle owned by the pool; stops the background thread on drop.
pub(crate) struct Janitor {
    shared: Arc<Shared>,
}

impl Janitor {
    /// Start a janitor sweeping `target` once activity settles.
    pub(crate) fn start<S: Sweep>(target: Weak<S>, quiet_period: Duration, hard_cap: Duration) -> Self {
        let shared = Arc::new(Shared {
            state: Mutex::new(JanitorState::default()),
            wake: Condvar::new(),
            quiet_period,
            hard_cap: hard_cap.max(quiet_period),
        });

        let thread_shared = Arc::clone(&shared);
        let spawned = thread::Builder::new()
            .name("imagelayer-pool-janitor".to_string())
            .spawn(move || run(thread_shared, target));
        if let Err(e) = spawned {
            warn!(error = %e, "Failed to start pool janitor, idle rasters will not be evicted");
        }

        Self { shared }
    }

    /// Record pool activity, postponing the next sweep.
    pub(crate) fn touch(&self) {
        let now = Instant::now();
        let mut state = self.shared.state.lock();
        state.first_activity.get_or_insert(now);
        state.last_activity = Some(now);
        drop(state);
        self.shared.wake.notify_one();
    }
}

impl Drop for Janitor {
    fn drop(&mut self) {
        self.shared.state.lock().shutdown = true;
        self.shared.wake.notify_one();
    }
}

fn run<S: Sweep>(shared: Arc<Shared>, target: Weak<S>) {
    let mut state = shared.state.lock();
    loop {
        if state.shutdown {
            return;
        }

        let (first, last) = match (state.first_activity, state.last_activity) {
            (Some(first), Some(last)) => (first, last),
            _ => {
                shared.wake.wait(&mut state);
                continue;
            }
        };

        let deadline = (last + shared.quiet_period).min(first + shared.hard_cap);
        if Instant::now() < deadline {
            shared.wake.wait_until(&mut state, deadline);
            continue;
        }

        state.first_activity = None;
        state.last_activity = None;

        // Never hold the janitor lock while taking the pool lock.
        drop(state);
        match target.upgrade() {
            Some(pool) => {
                let evicted = pool.sweep();
                if evicted > 0 {
                    debug!(evicted, "Evicted idle pooled rasters");
                }
            }
            None => return,
        }
        state = shared.state.lock();
    }
}
