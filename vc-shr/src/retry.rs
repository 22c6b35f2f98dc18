//  RETRY.rs
//    by Lut99
//
//  Created:
//    03 Oct 2026, 11:02:37
//  Last edited:
//    12 Oct 2026, 11:40:22
//  Auto updated?
//    Yes
//
//  Description:
//!   Implements retry policies with bounded backoff, used both around a
//!   whole client/server cycle and around process startup.
//

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use log::{debug, warn};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;


/***** TESTS *****/





/***** LIBRARY *****/
/// Defines how long to wait between two attempts.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Backoff {
    /// Always wait the same amount of time.
    Fixed(Duration),
    /// Wait `n` times the given duration before the `n`th retry.
    Linear(Duration),
    /// Wait `2^(n - 1)` times the given duration before the `n`th retry.
    Exponential(Duration),
}

impl Backoff {
    /// Computes the delay before the given retry.
    ///
    /// # Arguments
    /// - `retry`: The (1-based) index of the retry that is about to happen.
    ///
    /// # Returns
    /// The time to wait.
    pub fn delay(&self, retry: u32) -> Duration {
        let retry: u32 = retry.max(1);
        match self {
            Self::Fixed(base)       => *base,
            Self::Linear(base)      => base.saturating_mul(retry),
            Self::Exponential(base) => base.saturating_mul(2u32.saturating_pow(retry - 1)),
        }
    }
}



/// Defines how often and with which delay an operation is retried.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RetryPolicy {
    /// The number of retries after the first attempt.
    pub retries : u32,
    /// The delay between attempts.
    pub backoff : Backoff,
}

impl RetryPolicy {
    /// Constructor for the RetryPolicy.
    #[inline]
    pub fn new(retries: u32, backoff: Backoff) -> Self {
        Self {
            retries,
            backoff,
        }
    }

    /// Constructor for a RetryPolicy that never retries.
    #[inline]
    pub fn none() -> Self { Self::new(0, Backoff::Fixed(Duration::ZERO)) }
}

impl Default for RetryPolicy {
    /// Three retries, one second apart.
    #[inline]
    fn default() -> Self { Self::new(3, Backoff::Fixed(Duration::from_secs(1))) }
}



/// Runs the given operation, retrying it according to the given policy for as long as the error is deemed retryable.
///
/// # Arguments
/// - `what`: A description of the operation (used in logs).
/// - `policy`: The RetryPolicy that determines how often and how long to wait.
/// - `token`: A token that stops further retries when cancelled (the last error is then returned).
/// - `should_retry`: Decides whether a given error is worth another attempt.
/// - `op`: The operation itself. It receives the (0-based) attempt number.
///
/// # Returns
/// The result of the first successful attempt.
///
/// # Errors
/// This function returns the last error if the operation failed with a non-retryable error, exhausted its retries or was cancelled.
pub async fn retry<T, E, F, Fut, P>(what: &str, policy: &RetryPolicy, token: &CancellationToken, should_retry: P, mut op: F) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    E: Display,
{
    let mut attempt: u32 = 0;
    loop {
        let err: E = match op(attempt).await {
            Ok(res)  => { return Ok(res); },
            Err(err) => err,
        };

        // See if we're allowed to try again
        if !should_retry(&err) {
            debug!("{} failed with a non-retryable error: {}", what, err);
            return Err(err);
        }
        if attempt >= policy.retries {
            debug!("{} failed and exhausted its {} retries: {}", what, policy.retries, err);
            return Err(err);
        }
        attempt += 1;

        // Wait before the next attempt
        let delay: Duration = policy.backoff.delay(attempt);
        warn!("{} failed (retry {}/{} in {:.1}s): {}", what, attempt, policy.retries, delay.as_secs_f64(), err);
        tokio::select! {
            _ = token.cancelled() => { return Err(err); },
            _ = sleep(delay)      => {},
        }
    }
}
