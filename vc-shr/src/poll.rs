//  POLL.rs
//    by Lut99
//
//  Created:
//    03 Oct 2026, 10:24:09
//  Last edited:
//    12 Oct 2026, 11:18:40
//  Auto updated?
//    Yes
//
//  Description:
//!   Implements the generic "poll until the condition holds or the
//!   timeout elapses" primitive that heartbeat, online and state
//!   confirmation are built on.
//

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use log::debug;
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;

pub use crate::errors::PollError as Error;


/***** TESTS *****/
#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[tokio::test]
    async fn poll_never_true_times_out() {
        let started: Instant = Instant::now();
        let res: Result<(), Error<String>> = poll_until("nothing", Duration::from_millis(150), Duration::from_millis(10), &CancellationToken::new(), || async { Ok::<Option<()>, String>(None) }).await;
        assert!(matches!(res, Err(Error::Timeout{ .. })));
        assert!(started.elapsed() >= Duration::from_millis(150));
    }

    #[tokio::test]
    async fn poll_returns_only_once_true() {
        let counter: Arc<AtomicUsize> = Arc::new(AtomicUsize::new(0));
        let res: usize = poll_until("third attempt", Duration::from_secs(5), Duration::from_millis(5), &CancellationToken::new(), || {
            let counter: Arc<AtomicUsize> = counter.clone();
            async move {
                let n: usize = counter.fetch_add(1, Ordering::SeqCst) + 1;
                if n == 1 { return Err("transient".to_string()); }
                Ok(if n >= 3 { Some(n) } else { None })
            }
        }).await.unwrap();
        assert_eq!(res, 3);
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn poll_keeps_last_error_on_timeout() {
        let res: Result<(), Error<String>> = poll_until("a peer", Duration::from_millis(50), Duration::from_millis(10), &CancellationToken::new(), || async { Err::<Option<()>, String>("connection refused".into()) }).await;
        match res {
            Err(Error::Timeout{ last, attempts, .. }) => {
                assert_eq!(last.as_deref(), Some("connection refused"));
                assert!(attempts >= 2);
            },
            other => panic!("Expected a timeout, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn poll_cancelled() {
        let token: CancellationToken = CancellationToken::new();
        let child: CancellationToken = token.clone();
        tokio::spawn(async move { sleep(Duration::from_millis(30)).await; child.cancel(); });
        let res: Result<(), Error<String>> = poll_until("cancellation", Duration::from_secs(30), Duration::from_millis(10), &token, || async { Ok::<Option<()>, String>(None) }).await;
        assert!(matches!(res, Err(Error::Cancelled{ .. })));
    }
}





/***** LIBRARY *****/
/// Repeatedly runs the given check until it reports a value, the timeout elapses or the token is cancelled.
///
/// The check reports `Ok(Some(value))` when the condition holds, `Ok(None)` when it does not hold (yet), and `Err(_)` when
/// it failed to even check. Errors are considered transient: they are logged and the check is tried again after the
/// interval. Only the last error is kept, to be reported on timeout.
///
/// # Arguments
/// - `what`: A description of what we are waiting for (used in logs and errors).
/// - `timeout`: The maximum amount of time to wait. Timeouts that do not fit in an `Instant` mean "wait forever".
/// - `interval`: The fixed delay between two attempts.
/// - `token`: A token that aborts the polling when cancelled. It is independent of the timeout.
/// - `check`: The closure that checks the condition.
///
/// # Returns
/// The value reported by the check once the condition holds.
///
/// # Errors
/// This function errors with [`Error::Timeout`] if the condition did not hold in time, or [`Error::Cancelled`] if the token was cancelled first.
pub async fn poll_until<T, E, F, Fut>(what: impl Display, timeout: Duration, interval: Duration, token: &CancellationToken, mut check: F) -> Result<T, Error<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, E>>,
    E: Display,
{
    let what: String = what.to_string();
    let deadline: Option<Instant> = Instant::now().checked_add(timeout);
    debug!("Waiting for {} (timeout: {:.1}s)...", what, timeout.as_secs_f64());

    let mut attempts : usize     = 0;
    let mut last     : Option<E> = None;
    loop {
        if token.is_cancelled() { return Err(Error::Cancelled{ what }); }

        // Run the check once
        attempts += 1;
        match check().await {
            Ok(Some(value)) => { return Ok(value); },
            Ok(None)        => {},
            Err(err)        => {
                debug!("Attempt {} to check {} failed: {}", attempts, what, err);
                last = Some(err);
            },
        }

        // Compute how long we may still wait
        let wait: Duration = match deadline {
            Some(deadline) => {
                let now: Instant = Instant::now();
                if now >= deadline { return Err(Error::Timeout{ what, timeout, attempts, last }); }
                interval.min(deadline - now)
            },
            None => interval,
        };

        tokio::select! {
            _ = token.cancelled() => { return Err(Error::Cancelled{ what }); },
            _ = sleep(wait)       => {},
        }
    }
}
