//! Periodic health-check scheduler: a tokio interval loop per data source,
//! each with its own `AtomicBool` shutdown flag, held in a map keyed by
//! data source name.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::runtime::Runtime;
use tokio::task::JoinHandle;

use crate::config::DataSourceConfig;
use crate::logging::Logger;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    Up,
    Down,
    Degraded,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HealthCheckResult {
    pub status: HealthStatus,
    pub response_time_ms: u64,
    pub timestamp: DateTime<Utc>,
    pub detail: Option<String>,
}

/// Runs one health probe against a data source. Implemented by adapters
/// (typically by calling `Adapter::test_connection` and timing it).
#[async_trait]
pub trait HealthChecker: Send + Sync {
    async fn check(&self, config: &DataSourceConfig) -> HealthCheckResult;
}

type Listener = Arc<dyn Fn(&str, &HealthCheckResult) + Send + Sync>;

struct ScheduledTask {
    shutdown: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

/// Owns a two-worker tokio runtime on
/// which every scheduled task and every listener invocation runs.
pub struct HealthScheduler {
    runtime: Runtime,
    tasks: Mutex<HashMap<String, ScheduledTask>>,
    results: Arc<Mutex<HashMap<String, HealthCheckResult>>>,
    listener: Mutex<Option<Listener>>,
    logger: Arc<dyn Logger>,
}

impl HealthScheduler {
    pub fn new(logger: Arc<dyn Logger>) -> std::io::Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("fedsql-health")
            .enable_time()
            .build()?;
        Ok(Self {
            runtime,
            tasks: Mutex::new(HashMap::new()),
            results: Arc::new(Mutex::new(HashMap::new())),
            listener: Mutex::new(None),
            logger,
        })
    }

    /// Listeners receive every result synchronously on the scheduler's
    /// worker.
    pub fn set_listener<F>(&self, listener: F)
    where
        F: Fn(&str, &HealthCheckResult) + Send + Sync + 'static,
    {
        *self.listener.lock().unwrap() = Some(Arc::new(listener));
    }

    /// Schedules a periodic check for `name`. Idempotent: a second call
    /// with a name already scheduled is a no-op, logged as a warning.
    pub fn schedule(
        &self,
        name: impl Into<String>,
        config: DataSourceConfig,
        checker: Arc<dyn HealthChecker>,
        initial_delay: Duration,
        interval: Duration,
    ) {
        let name = name.into();
        let mut tasks = self.tasks.lock().unwrap();
        if tasks.contains_key(&name) {
            self.logger.warn(
                "health_scheduler",
                &format!("schedule('{name}') called while already scheduled; ignoring"),
            );
            return;
        }

        let shutdown = Arc::new(AtomicBool::new(false));
        let task_shutdown = shutdown.clone();
        let results = self.results.clone();
        let listener = self.listener_snapshot();
        let logger = self.logger.clone();
        let task_name = name.clone();

        let handle = self.runtime.spawn(async move {
            tokio::time::sleep(initial_delay).await;
            loop {
                if task_shutdown.load(Ordering::Relaxed) {
                    break;
                }
                let started = std::time::Instant::now();
                let result = checker.check(&config).await;
                logger.debug(
                    "health_scheduler",
                    &format!("'{task_name}' check completed in {:?}: {:?}", started.elapsed(), result.status),
                );
                results.lock().unwrap().insert(task_name.clone(), result.clone());
                if let Some(listener) = &listener {
                    listener(&task_name, &result);
                }
                if task_shutdown.load(Ordering::Relaxed) {
                    break;
                }
                tokio::time::sleep(interval).await;
            }
        });

        tasks.insert(name, ScheduledTask { shutdown, handle });
    }

    fn listener_snapshot(&self) -> Option<Listener> {
        self.listener.lock().unwrap().clone()
    }

    /// Signals the named task to stop. Safe to call on an already
    /// cancelled or never-scheduled task.
    pub fn cancel(&self, name: &str) {
        if let Some(task) = self.tasks.lock().unwrap().get(name) {
            task.shutdown.store(true, Ordering::Relaxed);
        }
    }

    pub fn last_result(&self, name: &str) -> Option<HealthCheckResult> {
        self.results.lock().unwrap().get(name).cloned()
    }

    /// Signals every task to stop, waits up to 10 seconds for graceful
    /// termination, then force-aborts anything still running.
    pub fn shutdown(&self) {
        let tasks: Vec<(String, Arc<AtomicBool>, JoinHandle<()>)> = {
            let mut guard = self.tasks.lock().unwrap();
            guard.drain().map(|(name, t)| (name, t.shutdown, t.handle)).collect()
        };
        for (_, shutdown, _) in &tasks {
            shutdown.store(true, Ordering::Relaxed);
        }
        let logger = self.logger.clone();
        self.runtime.block_on(async move {
            let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
            for (name, _, mut handle) in tasks {
                let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
                tokio::select! {
                    res = &mut handle => { let _ = res; }
                    _ = tokio::time::sleep(remaining) => {
                        handle.abort();
                        logger.warn("health_scheduler", &format!("task '{name}' did not stop gracefully within 10s; aborted"));
                    }
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::CapturingLogger;
    use std::sync::atomic::AtomicU32;

    struct AlwaysUp;

    #[async_trait]
    impl HealthChecker for AlwaysUp {
        async fn check(&self, _config: &DataSourceConfig) -> HealthCheckResult {
            HealthCheckResult {
                status: HealthStatus::Up,
                response_time_ms: 1,
                timestamp: Utc::now(),
                detail: None,
            }
        }
    }

    fn sample_config() -> DataSourceConfig {
        DataSourceConfig::new("db1", "postgresql", "postgres://localhost/db1")
    }

    #[test]
    fn schedule_is_idempotent_and_warns_on_second_call() {
        let logger = Arc::new(CapturingLogger::new());
        let scheduler = HealthScheduler::new(logger.clone()).unwrap();
        scheduler.schedule(
            "db1",
            sample_config(),
            Arc::new(AlwaysUp),
            Duration::from_millis(10),
            Duration::from_secs(60),
        );
        scheduler.schedule(
            "db1",
            sample_config(),
            Arc::new(AlwaysUp),
            Duration::from_millis(10),
            Duration::from_secs(60),
        );
        assert!(logger.contains("already scheduled"));
        scheduler.cancel("db1");
    }

    #[test]
    fn shutdown_stops_all_tasks_gracefully() {
        let logger = Arc::new(CapturingLogger::new());
        let scheduler = HealthScheduler::new(logger).unwrap();
        scheduler.schedule(
            "db1",
            sample_config(),
            Arc::new(AlwaysUp),
            Duration::from_millis(1),
            Duration::from_millis(10),
        );
        scheduler.shutdown();
        assert!(scheduler.tasks.lock().unwrap().is_empty());
    }

    #[test]
    fn cancel_on_unknown_task_does_not_panic() {
        let logger = Arc::new(CapturingLogger::new());
        let scheduler = HealthScheduler::new(logger).unwrap();
        scheduler.cancel("does-not-exist");
    }

    #[test]
    fn listener_receives_results_synchronously() {
        let logger = Arc::new(CapturingLogger::new());
        let scheduler = HealthScheduler::new(logger).unwrap();
        let seen = Arc::new(AtomicU32::new(0));
        let seen_clone = seen.clone();
        scheduler.set_listener(move |_name, result| {
            if result.status == HealthStatus::Up {
                seen_clone.fetch_add(1, Ordering::Relaxed);
            }
        });
        scheduler.schedule(
            "db1",
            sample_config(),
            Arc::new(AlwaysUp),
            Duration::from_millis(1),
            Duration::from_millis(20),
        );
        std::thread::sleep(Duration::from_millis(100));
        scheduler.cancel("db1");
        assert!(seen.load(Ordering::Relaxed) >= 1);
    }
}
