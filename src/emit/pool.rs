//! Executor reuse with an idle timeout.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tracing::debug;

use super::executor::CommandExecutor;

/// Default idle time after which the executor is recreated.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(5 * 60);

type Factory = Box<dyn Fn() -> Arc<dyn CommandExecutor> + Send + Sync>;

struct Pooled {
    executor: Arc<dyn CommandExecutor>,
    last_used: Instant,
}

/// Hands out one shared executor.
///
/// The executor is reused while it has been idle for less than the idle
/// timeout, and replaced by a fresh one from the factory otherwise.
///
/// ```ignore
/// let pool = ExecutorPool::new(|| Arc::new(ProcessExecutor::new("dab")), DEFAULT_IDLE_TIMEOUT);
/// let executor = pool.acquire().await;
/// executor.run(&args).await?;
/// ```
pub struct ExecutorPool {
    factory: Factory,
    idle_timeout: Duration,
    current: Mutex<Option<Pooled>>,
}

impl ExecutorPool {
    pub fn new<F>(factory: F, idle_timeout: Duration) -> Self
    where
        F: Fn() -> Arc<dyn CommandExecutor> + Send + Sync + 'static,
    {
        Self {
            factory: Box::new(factory),
            idle_timeout,
            current: Mutex::new(None),
        }
    }

    /// A pool that always hands out `executor`.
    pub fn fixed(executor: Arc<dyn CommandExecutor>) -> Self {
        Self::new(move || executor.clone(), Duration::MAX)
    }

    /// The current executor, or a new one if it sat idle too long.
    pub async fn acquire(&self) -> Arc<dyn CommandExecutor> {
        let mut current = self.current.lock().await;
        let now = Instant::now();

        let executor = match current.take() {
            Some(pooled) if now.duration_since(pooled.last_used) < self.idle_timeout => {
                pooled.executor
            }
            Some(_) => {
                debug!(idle_timeout = ?self.idle_timeout, "executor idle too long; recreating");
                (self.factory)()
            }
            None => (self.factory)(),
        };

        *current = Some(Pooled {
            executor: executor.clone(),
            last_used: now,
        });
        executor
    }

    pub fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }
}

impl fmt::Debug for ExecutorPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutorPool")
            .field("idle_timeout", &self.idle_timeout)
            .finish_non_exhaustive()
    }
}
