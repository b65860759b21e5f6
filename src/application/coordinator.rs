//! Bounded, staggered execution of independent fetches.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Runs tasks with at most `max_concurrent` in flight, waiting
/// `inter_task_delay` between successive dispatches.
///
/// Each task's outcome is reported separately, in input order; one failure
/// never cancels its siblings.
#[derive(Debug, Clone)]
pub struct ConcurrencyCoordinator {
    max_concurrent: usize,
    inter_task_delay: Duration,
}

impl ConcurrencyCoordinator {
    #[must_use]
    pub fn new(max_concurrent: usize, inter_task_delay: Duration) -> Self {
        Self {
            max_concurrent: max_concurrent.max(1),
            inter_task_delay,
        }
    }

    #[must_use]
    pub const fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Run every task and collect per-task results.
    pub async fn run_bounded<T, Fut>(&self, tasks: Vec<Fut>) -> Vec<Result<T>>
    where
        T: Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let total = tasks.len();
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let mut set = JoinSet::new();

        for (index, task) in tasks.into_iter().enumerate() {
            if index > 0 && !self.inter_task_delay.is_zero() {
                tokio::time::sleep(self.inter_task_delay).await;
            }
            let permit = match Arc::clone(&semaphore).acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => break,
            };
            debug!(task = index, total, "Dispatching task");
            set.spawn(async move {
                let result = task.await;
                drop(permit);
                (index, result)
            });
        }

        let mut results: Vec<Option<Result<T>>> = (0..total).map(|_| None).collect();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((index, result)) => results[index] = Some(result),
                Err(err) => warn!(error = %err, "Coordinated task did not complete"),
            }
        }

        results
            .into_iter()
            .map(|slot| {
                slot.unwrap_or_else(|| Err(Error::Task("task panicked or was cancelled".into())))
            })
            .collect()
    }
}
