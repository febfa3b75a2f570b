//! Executors for asynchronous (streaming) DDS encoding.
//!
//! Decode and encode run on the calling thread unless a caller hands an
//! [`Executor`] to a streaming encode. The static stream API falls back to
//! [`shared()`], a lazily built process-wide rayon pool.

use std::sync::{Arc, OnceLock};

use tracing::warn;

/// A unit of work handed to an executor.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Something that can run a job, now or later, on some thread.
pub trait Executor: Send + Sync {
    /// Schedule `job`. Implementations must eventually run it exactly once.
    fn execute(&self, job: Job);
}

impl Executor for rayon::ThreadPool {
    fn execute(&self, job: Job) {
        self.spawn(job);
    }
}

impl Executor for tokio::runtime::Handle {
    fn execute(&self, job: Job) {
        // Detached: completion is observed through the encoded stream.
        drop(self.spawn_blocking(job));
    }
}

impl<E: Executor + ?Sized> Executor for Arc<E> {
    fn execute(&self, job: Job) {
        (**self).execute(job)
    }
}

impl<E: Executor + ?Sized> Executor for &E {
    fn execute(&self, job: Job) {
        (**self).execute(job)
    }
}

/// Runs every job immediately on the calling thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineExecutor;

impl Executor for InlineExecutor {
    fn execute(&self, job: Job) {
        job();
    }
}

enum SharedExecutor {
    Pool(rayon::ThreadPool),
    Inline(InlineExecutor),
}

impl Executor for SharedExecutor {
    fn execute(&self, job: Job) {
        match self {
            SharedExecutor::Pool(pool) => pool.execute(job),
            SharedExecutor::Inline(inline) => inline.execute(job),
        }
    }
}

static SHARED: OnceLock<SharedExecutor> = OnceLock::new();

/// The shared transcoding pool used when callers supply no executor.
pub fn shared() -> &'static dyn Executor {
    SHARED.get_or_init(|| {
        match rayon::ThreadPoolBuilder::new()
            .thread_name(|i| format!("imagelayer-transcode-{}", i))
            .build()
        {
            Ok(pool) => SharedExecutor::Pool(pool),
            Err(e) => {
                warn!(error = %e, "Failed to build shared transcode pool, encoding inline");
                SharedExecutor::Inline(InlineExecutor)
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::Duration;

    #[test]
    fn test_inline_runs_immediately() {
        let (tx, rx) = mpsc::channel();
        InlineExecutor.execute(Box::new(move || tx.send(7).unwrap()));
        assert_eq!(rx.try_recv().unwrap(), 7);
    }

    #[test]
    fn test_shared_pool_runs_job() {
        let (tx, rx) = mpsc::channel();
        shared().execute(Box::new(move || tx.send("done").unwrap()));
        assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), "done");
    }

    #[test]
    fn test_tokio_handle_runs_job() {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .build()
            .unwrap();
        let (tx, rx) = mpsc::channel();
        runtime
            .handle()
            .execute(Box::new(move || tx.send(42).unwrap()));
        assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), 42);
    }
}
