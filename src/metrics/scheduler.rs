//! Periodic flush scheduling.
//!
//! One scheduler is shared by every histogram of a collector. Tasks are keyed
//! by histogram identity so that restarting a histogram replaces its task and
//! stopping it cancels exactly that task.

use crate::metrics::histogram::Histogram;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Weak;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// Registry of periodic flush tasks
#[derive(Debug)]
pub struct FlushScheduler {
    tasks: Mutex<HashMap<String, JoinHandle<()>>>,
    runtime: Option<Handle>,
}

impl Default for FlushScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl FlushScheduler {
    /// Create a scheduler bound to the runtime of the calling context, if any
    pub fn new() -> Self {
        Self::with_runtime(Handle::try_current().ok())
    }

    /// Create a scheduler that spawns its tasks on `runtime`
    pub fn with_runtime(runtime: Option<Handle>) -> Self {
        Self {
            tasks: Mutex::new(HashMap::new()),
            runtime,
        }
    }

    /// Runtime the flush tasks are spawned on
    pub fn runtime(&self) -> Option<&Handle> {
        self.runtime.as_ref()
    }

    /// Flush `target` every `period`, replacing any task registered under `key`.
    ///
    /// Tasks run on the runtime captured at construction, so histograms created
    /// from plain threads still get a timer. The task only holds a weak
    /// reference and exits once the histogram is gone. Returns false when no
    /// runtime is available at all.
    pub fn schedule(&self, key: &str, target: Weak<Histogram>, period: Duration) -> bool {
        let Some(runtime) = self.runtime.clone().or_else(|| Handle::try_current().ok()) else {
            tracing::warn!(key, "No async runtime available, periodic flush disabled");
            return false;
        };

        let task = runtime.spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                match target.upgrade() {
                    Some(histogram) => {
                        histogram.flush();
                    },
                    None => break,
                }
            }
        });

        if let Some(previous) = self.tasks.lock().insert(key.to_string(), task) {
            previous.abort();
        }

        true
    }

    /// Cancel the task registered under `key`, if any
    pub fn cancel(&self, key: &str) {
        if let Some(task) = self.tasks.lock().remove(key) {
            task.abort();
        }
    }

    /// Cancel every registered task
    pub fn cancel_all(&self) {
        for (_, task) in self.tasks.lock().drain() {
            task.abort();
        }
    }

    pub fn is_scheduled(&self, key: &str) -> bool {
        self.tasks
            .lock()
            .get(key)
            .is_some_and(|task| !task.is_finished())
    }

    /// Number of registered tasks
    pub fn len(&self) -> usize {
        self.tasks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.lock().is_empty()
    }
}

impl Drop for FlushScheduler {
    fn drop(&mut self) {
        for (_, task) in self.tasks.get_mut().drain() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::MetricConfig;
    use crate::metrics::histogram::FlushHandler;
    use crate::metrics::types::Datapoint;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn histogram(
        name: &str,
        scheduler: &Arc<FlushScheduler>,
        flushes: &Arc<AtomicUsize>,
    ) -> Arc<Histogram> {
        let counter = flushes.clone();
        let handler: Arc<dyn FlushHandler> = Arc::new(move |_: Datapoint| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let config = MetricConfig::default().resolution(1).auto_start(false);
        Histogram::new(name, config, handler, scheduler.clone())
    }

    #[tokio::test(start_paused = true)]
    async fn test_schedule_flushes_periodically() {
        let scheduler = Arc::new(FlushScheduler::new());
        let flushes = Arc::new(AtomicUsize::new(0));
        let target = histogram("ticks", &scheduler, &flushes);

        assert!(scheduler.schedule(target.key(), Arc::downgrade(&target), Duration::from_secs(1)));
        assert!(scheduler.is_scheduled(target.key()));

        target.record(1.0);
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(flushes.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(flushes.load(Ordering::SeqCst), 1);

        target.record(2.0);
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(flushes.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_reschedule_replaces_task() {
        let scheduler = Arc::new(FlushScheduler::new());
        let flushes = Arc::new(AtomicUsize::new(0));
        let target = histogram("ticks", &scheduler, &flushes);

        target.start();
        target.start();
        assert_eq!(scheduler.len(), 1);
    }

    #[tokio::test]
    async fn test_cancel_and_cancel_all() {
        let scheduler = Arc::new(FlushScheduler::new());
        let flushes = Arc::new(AtomicUsize::new(0));
        let first = histogram("first", &scheduler, &flushes);
        let second = histogram("second", &scheduler, &flushes);

        first.start();
        second.start();
        assert_eq!(scheduler.len(), 2);

        scheduler.cancel(first.key());
        scheduler.cancel("missing");
        assert!(!scheduler.is_scheduled(first.key()));
        assert!(scheduler.is_scheduled(second.key()));

        scheduler.cancel_all();
        assert!(scheduler.is_empty());
    }

    #[tokio::test]
    async fn test_dropping_histogram_cancels_task() {
        let scheduler = Arc::new(FlushScheduler::new());
        let flushes = Arc::new(AtomicUsize::new(0));
        let target = histogram("dropped", &scheduler, &flushes);

        target.start();
        assert_eq!(scheduler.len(), 1);

        drop(target);
        assert!(scheduler.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_schedule_from_plain_thread() {
        let scheduler = Arc::new(FlushScheduler::new());
        assert!(scheduler.runtime().is_some());

        let flushes = Arc::new(AtomicUsize::new(0));
        let target = histogram("threaded", &scheduler, &flushes);

        let worker = {
            let target = target.clone();
            std::thread::spawn(move || target.start())
        };
        assert!(worker.join().unwrap());
        assert!(scheduler.is_scheduled(target.key()));
    }

    #[test]
    fn test_schedule_outside_runtime() {
        let scheduler = Arc::new(FlushScheduler::new());
        let flushes = Arc::new(AtomicUsize::new(0));
        let target = histogram("idle", &scheduler, &flushes);

        assert!(scheduler.runtime().is_none());
        assert!(!scheduler.schedule(target.key(), Arc::downgrade(&target), Duration::from_secs(1)));
        assert_eq!(scheduler.len(), 0);
    }
}
