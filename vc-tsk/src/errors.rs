//  ERRORS.rs
//    by Lut99
//
//  Created:
//    06 Oct 2026, 14:03:50
//  Last edited:
//    16 Oct 2026, 10:51:08
//  Auto updated?
//    Yes
//
//  Description:
//!   Defines errors that occur in the `vc-tsk` crate.
//

use std::error::Error;
use std::fmt::{Display, Formatter, Result as FResult};
use std::path::PathBuf;
use std::time::Duration;

use specifications::reason::{ErrorReason, CLIENT_CLASS_THRESHOLD};
use vc_api::errors::ClientError;


/***** TESTS *****/





/***** LIBRARY *****/
/// Errors that relate to running a workload process.
#[derive(Debug)]
pub enum ProcessError {
    /// Failed to spawn the process.
    SpawnError{ command: String, err: std::io::Error },
    /// Failed to wait for the process.
    WaitError{ command: String, err: std::io::Error },
    /// The process exited with a code that is not considered successful.
    ExitCodeError{ command: String, code: Option<i32>, stdout: String, stderr: String },
}

impl ProcessError {
    /// Returns the text that a retry pattern is matched against: the error itself plus any captured output.
    pub fn retry_haystack(&self) -> String {
        match self {
            Self::ExitCodeError{ stdout, stderr, .. } => format!("{}\n{}\n{}", self, stderr, stdout),
            _                                         => self.to_string(),
        }
    }
}

impl Display for ProcessError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FResult {
        use ProcessError::*;
        match self {
            SpawnError{ command, err } => write!(f, "Failed to spawn process '{}': {}", command, err),
            WaitError{ command, err }  => write!(f, "Failed to wait for process '{}': {}", command, err),
            ExitCodeError{ command, code, stderr, .. } => {
                match code {
                    Some(code) => write!(f, "Process '{}' exited with unexpected code {}", command, code)?,
                    None       => write!(f, "Process '{}' was terminated by a signal", command)?,
                }
                let stderr: &str = stderr.trim();
                if !stderr.is_empty() { write!(f, ": {}", stderr.lines().last().unwrap_or(stderr))?; }
                Ok(())
            },
        }
    }
}

impl Error for ProcessError {}



/// Errors that relate to waiting for a results file.
#[derive(Debug)]
pub enum ResultsError {
    /// The file did not appear (or stayed empty) for the whole window.
    NotFound{ path: PathBuf, timeout: Duration },
    /// We were cancelled while waiting.
    Cancelled{ path: PathBuf },
}

impl Display for ResultsError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FResult {
        use ResultsError::*;
        match self {
            NotFound{ path, timeout } => write!(f, "Results file '{}' was not found or stayed empty for {:.1}s", path.display(), timeout.as_secs_f64()),
            Cancelled{ path }         => write!(f, "Cancelled while waiting for results file '{}'", path.display()),
        }
    }
}

impl Error for ResultsError {}



/// Errors that relate to the background workload supervisor.
#[derive(Debug)]
pub enum SupervisorError {
    /// The supervisor task is no longer running.
    Stopped,
}

impl Display for SupervisorError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FResult {
        use SupervisorError::*;
        match self {
            Stopped => write!(f, "Workload supervisor is no longer running"),
        }
    }
}

impl Error for SupervisorError {}



/// Errors that a component may return. Every variant names the component type and the host it failed on.
#[derive(Debug)]
pub enum ComponentError {
    /// Something the component depends on is missing or ill-defined (a package, a parameter, the layout, a peer...). Not retried.
    Dependency{ component: String, host: String, reason: ErrorReason, message: String },
    /// The workload itself failed, possibly on another node.
    Workload{ component: String, host: String, reason: ErrorReason, message: String },
    /// Another node reported that the component failed there, with the code from its state (if any).
    PeerFailed{ component: String, host: String, code: Option<i64>, message: String },
    /// Talking to the API of a node failed.
    Api{ component: String, host: String, err: ClientError },
    /// A node did not reach the expected state in time.
    Timeout{ component: String, host: String, err: ClientError },
    /// The workload process failed (after any retries).
    Process{ component: String, host: String, err: ProcessError },
    /// The workload did not produce its results file.
    ResultsNotFound{ component: String, host: String, err: ResultsError },
    /// The component was cancelled.
    Cancelled{ component: String, host: String },
    /// Anything else.
    Internal{ component: String, host: String, message: String },
}

impl ComponentError {
    /// Converts a ClientError into a ComponentError of the appropriate flavour.
    ///
    /// # Arguments
    /// - `component`: The type name of the component that failed.
    /// - `host`: The host that we were talking to.
    /// - `err`: The ClientError to convert.
    ///
    /// # Returns
    /// A [`ComponentError::Timeout`] for polling timeouts, [`ComponentError::Cancelled`] for cancellations, or a [`ComponentError::Api`] for everything else.
    pub fn from_client(component: impl Into<String>, host: impl Into<String>, err: ClientError) -> Self {
        if err.is_timeout() {
            Self::Timeout{ component: component.into(), host: host.into(), err }
        } else if err.is_cancelled() {
            Self::Cancelled{ component: component.into(), host: host.into() }
        } else {
            Self::Api{ component: component.into(), host: host.into(), err }
        }
    }



    /// Returns the reason of this error, if it has one. Errors without a reason are unclassified.
    pub fn reason(&self) -> Option<ErrorReason> {
        use ComponentError::*;
        match self {
            Dependency{ reason, .. }  => Some(*reason),
            Workload{ reason, .. }    => Some(*reason),
            PeerFailed{ code, .. }    => code.and_then(ErrorReason::from_code),
            Api{ .. }                 => Some(ErrorReason::ApiRequestFailed),
            Timeout{ .. }             => Some(ErrorReason::ApiStatePollingTimeout),
            Process{ .. }             => Some(ErrorReason::WorkloadFailed),
            ResultsNotFound{ .. }     => Some(ErrorReason::WorkloadResultsNotFound),
            Cancelled{ .. }           => None,
            Internal{ .. }            => None,
        }
    }

    /// Returns whether it makes sense to retry whatever produced this error.
    ///
    /// Errors with a client-class reason (below 500) are not retried; all other reasons, and unclassified errors, are.
    /// Cancellations are never retried.
    pub fn is_retryable(&self) -> bool {
        if matches!(self, Self::Cancelled{ .. }) { return false; }
        match self.code() {
            Some(code) => code >= CLIENT_CLASS_THRESHOLD,
            None       => true,
        }
    }

    /// Returns the numeric reason code of this error. Unlike [`ComponentError::reason()`], this also covers codes reported by peers that we do not know.
    pub fn code(&self) -> Option<i64> {
        match self {
            Self::PeerFailed{ code, .. } => *code,
            _                            => self.reason().map(|reason| reason.code()),
        }
    }

    /// Returns whether this error is a cancellation.
    #[inline]
    pub fn is_cancelled(&self) -> bool { matches!(self, Self::Cancelled{ .. }) }

    /// Returns the type name of the component that failed.
    pub fn component(&self) -> &str {
        use ComponentError::*;
        match self {
            Dependency{ component, .. } | Workload{ component, .. } | PeerFailed{ component, .. } | Api{ component, .. } | Timeout{ component, .. } | Process{ component, .. } | ResultsNotFound{ component, .. } | Cancelled{ component, .. } | Internal{ component, .. } => component,
        }
    }
}

impl Display for ComponentError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FResult {
        use ComponentError::*;
        match self {
            Dependency{ component, host, reason, message } => write!(f, "Component '{}' on '{}' is missing a dependency [{}]: {}", component, host, reason, message),
            Workload{ component, host, reason, message }   => write!(f, "Component '{}' on '{}' failed [{}]: {}", component, host, reason, message),
            PeerFailed{ component, host, code, message }   => match code.and_then(ErrorReason::from_code) {
                Some(reason) => write!(f, "Component '{}' on '{}' failed [{}]: {}", component, host, reason, message),
                None         => write!(f, "Component '{}' on '{}' failed [{}]: {}", component, host, if let Some(code) = code { code.to_string() } else { "no reason given".into() }, message),
            },
            Api{ component, host, err }                    => write!(f, "Component '{}' failed to talk to '{}': {}", component, host, err),
            Timeout{ component, host, err }                => write!(f, "Component '{}' timed out waiting on '{}': {}", component, host, err),
            Process{ component, host, err }                => write!(f, "Component '{}' on '{}' failed to run its workload: {}", component, host, err),
            ResultsNotFound{ component, host, err }        => write!(f, "Component '{}' on '{}' produced no results: {}", component, host, err),
            Cancelled{ component, host }                   => write!(f, "Component '{}' on '{}' was cancelled", component, host),
            Internal{ component, host, message }           => write!(f, "Component '{}' on '{}' failed: {}", component, host, message),
        }
    }
}

impl Error for ComponentError {}
