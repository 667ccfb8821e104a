//! Condition-wait: poll a probe until it reports ready or a deadline passes.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tracing::trace;

/// Timing for [`wait_until`].
#[derive(Debug, Clone, Copy)]
pub struct WaitOptions {
    /// Give up once this much time has passed since the first probe.
    pub timeout: Duration,
    /// Pause between probes.
    pub poll_interval: Duration,
}

/// Why [`wait_until`] stopped without a value.
#[derive(Debug)]
pub enum WaitError<E> {
    /// The condition never held.
    Timeout { waited: Duration, attempts: u32 },
    /// The probe failed; waiting stops immediately.
    Aborted(E),
}

/// Run `probe` until it yields `Some`, fails, or the timeout passes.
///
/// The first probe runs right away. Later probes are spaced by
/// `poll_interval`, and the final sleep is clipped so the last probe lands
/// on the deadline.
pub async fn wait_until<T, E, F, Fut>(opts: WaitOptions, mut probe: F) -> Result<T, WaitError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, E>>,
{
    let start = Instant::now();
    let deadline = start + opts.timeout;
    let mut attempts: u32 = 0;

    loop {
        attempts += 1;
        match probe().await {
            Ok(Some(value)) => return Ok(value),
            Ok(None) => trace!(attempts, "condition not met yet"),
            Err(e) => return Err(WaitError::Aborted(e)),
        }

        let now = Instant::now();
        if now >= deadline {
            return Err(WaitError::Timeout {
                waited: now - start,
                attempts,
            });
        }

        tokio::time::sleep(opts.poll_interval.min(deadline - now)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn opts(timeout_ms: u64, interval_ms: u64) -> WaitOptions {
        WaitOptions {
            timeout: Duration::from_millis(timeout_ms),
            poll_interval: Duration::from_millis(interval_ms),
        }
    }

    #[tokio::test]
    async fn returns_as_soon_as_ready() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, WaitError<()>> = wait_until(opts(1_000, 10), || {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move { Ok(if n == 3 { Some(n) } else { None }) }
        })
        .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn times_out_when_never_ready() {
        let result: Result<(), WaitError<()>> =
            wait_until(opts(50, 10), || async { Ok(None) }).await;

        match result {
            Err(WaitError::Timeout { waited, attempts }) => {
                assert!(waited >= Duration::from_millis(50));
                assert!(attempts >= 2);
            }
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn probe_error_aborts_immediately() {
        let calls = AtomicU32::new(0);
        let result: Result<(), WaitError<&str>> = wait_until(opts(1_000, 10), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err("unreachable") }
        })
        .await;

        assert!(matches!(result, Err(WaitError::Aborted("unreachable"))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
