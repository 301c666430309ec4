//! Exponential backoff around source calls:
//! retries a transient `FedError::Source` up to `RetryPolicy::max_retries`
//! times, sleeping `delay_for_attempt` between attempts, and leaves any
//! non-transient error (or the final exhausted attempt) to propagate as-is.

use std::sync::Arc;

use crate::config::RetryPolicy;
use crate::error::FedError;
use crate::exec::cancellation::Cancellation;
use crate::logging::Logger;

/// Calls `f` up to `policy.max_retries + 1` times, retrying only when the
/// error is transient (`FedError::is_transient`). A cancellation signalled
/// while sleeping between attempts surfaces as `FedError::RetryInterrupted`
/// rather than the attempt's own error.
pub fn with_retry<T>(
    policy: &RetryPolicy,
    cancellation: &Cancellation,
    logger: &Arc<dyn Logger>,
    mut f: impl FnMut() -> Result<T, FedError>,
) -> Result<T, FedError> {
    let mut attempt = 0;
    loop {
        match f() {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transient() && attempt < policy.max_retries => {
                let delay = policy.delay_for_attempt(attempt);
                logger.warn(
                    "retry",
                    &format!("attempt {} failed transiently, retrying in {delay:?}: {err}", attempt + 1),
                );
                if let Err(interrupt) = cancellation.sleep_or_interrupted(delay) {
                    let _ = interrupt;
                    return Err(FedError::RetryInterrupted);
                }
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::CapturingLogger;
    use std::sync::Mutex;
    use std::time::{Duration, Instant};

    #[test]
    fn succeeds_on_third_attempt_after_two_transient_failures() {
        let policy = RetryPolicy {
            max_retries: 3,
            initial_delay: Duration::from_millis(5),
            multiplier: 2.0,
        };
        let cancellation = Cancellation::new();
        let logger: Arc<dyn Logger> = Arc::new(CapturingLogger::new());
        let calls = Mutex::new(0u32);

        let started = Instant::now();
        let result = with_retry(&policy, &cancellation, &logger, || {
            let mut n = calls.lock().unwrap();
            *n += 1;
            if *n < 3 {
                Err(FedError::transient_source("connection reset"))
            } else {
                Ok(*n)
            }
        });

        assert_eq!(result.unwrap(), 3);
        assert_eq!(*calls.lock().unwrap(), 3);
        assert!(started.elapsed() >= Duration::from_millis(15));
    }

    #[test]
    fn permanent_error_is_not_retried() {
        let policy = RetryPolicy::default();
        let cancellation = Cancellation::new();
        let logger: Arc<dyn Logger> = Arc::new(CapturingLogger::new());
        let calls = Mutex::new(0u32);

        let result: Result<(), FedError> = with_retry(&policy, &cancellation, &logger, || {
            *calls.lock().unwrap() += 1;
            Err(FedError::permanent_source("bad credentials"))
        });

        assert!(matches!(result, Err(FedError::Source { transient: false, .. })));
        assert_eq!(*calls.lock().unwrap(), 1);
    }

    #[test]
    fn cancellation_during_backoff_surfaces_retry_interrupted() {
        let policy = RetryPolicy { max_retries: 5, initial_delay: Duration::from_secs(30), multiplier: 1.0 };
        let cancellation = Cancellation::new();
        let logger: Arc<dyn Logger> = Arc::new(CapturingLogger::new());

        let waiter = cancellation.clone();
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            waiter.cancel();
        });

        let result: Result<(), FedError> =
            with_retry(&policy, &cancellation, &logger, || Err(FedError::transient_source("down")));

        assert!(matches!(result, Err(FedError::RetryInterrupted)));
    }
}
