//  ERRORS.rs
//    by Lut99
//
//  Created:
//    03 Oct 2026, 10:05:50
//  Last edited:
//    09 Oct 2026, 13:30:08
//  Auto updated?
//    Yes
//
//  Description:
//!   Defines errors that occur in the `vc-shr` crate.
//

use std::error::Error;
use std::fmt::{Debug, Display, Formatter, Result as FResult};
use std::time::Duration;


/***** LIBRARY *****/
/// Errors that relate to polling for a condition.
#[derive(Debug)]
pub enum PollError<E> {
    /// The condition did not become true before the timeout elapsed.
    Timeout{ what: String, timeout: Duration, attempts: usize, last: Option<E> },
    /// The surrounding operation was cancelled while we were polling.
    Cancelled{ what: String },
}

impl<E> PollError<E> {
    /// Returns whether this error is a timeout.
    #[inline]
    pub fn is_timeout(&self) -> bool { matches!(self, Self::Timeout{ .. }) }
}

impl<E: Display> Display for PollError<E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FResult {
        use PollError::*;
        match self {
            Timeout{ what, timeout, attempts, last } => {
                write!(f, "Timed out after {:.1}s ({} attempt{}) waiting for {}", timeout.as_secs_f64(), attempts, if *attempts == 1 { "" } else { "s" }, what)?;
                if let Some(last) = last { write!(f, " (last error: {})", last)?; }
                Ok(())
            },
            Cancelled{ what } => write!(f, "Cancelled while waiting for {}", what),
        }
    }
}

impl<E: Debug + Display> Error for PollError<E> {}
