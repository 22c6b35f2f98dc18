//  STATE.rs
//    by Lut99
//
//  Created:
//    02 Oct 2026, 12:31:17
//  Last edited:
//    14 Oct 2026, 16:12:44
//  Auto updated?
//    Yes
//
//  Description:
//!   Defines the status-bearing state record that a node keeps per
//!   component and that peers poll for.
//

use std::fmt::{Display, Formatter, Result as FResult};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_with::{DeserializeFromStr, SerializeDisplay};

use crate::common::{Parameter, Parameters};
use crate::reason::ErrorReason;


/***** TESTS *****/
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_case_insensitive() {
        let mut state: State = State::default();
        state.properties.insert(STATUS_PROPERTY.into(), Parameter::String("executioncompleted".into()));
        assert_eq!(state.status(), Some(ClientServerStatus::ExecutionCompleted));
        assert!(state.status_in(COMPLETED_STATUSES));

        state.properties.insert(STATUS_PROPERTY.into(), Parameter::String("Whatever".into()));
        assert_eq!(state.status(), None);
        assert!(!state.status_in(COMPLETED_STATUSES));
    }

    #[test]
    fn state_failure_metadata() {
        let mut state: State = State::with_status(ClientServerStatus::Ready);
        state.set_failed(ErrorReason::DependencyNotFound, "no binary");
        assert_eq!(state.status(), Some(ClientServerStatus::Failed));
        assert_eq!(state.error_reason(), Some(300));
        assert_eq!(state.error_message(), Some("no binary".into()));

        let raw: String = serde_json::to_string(&state).unwrap();
        let back: State = serde_json::from_str(&raw).unwrap();
        assert_eq!(back, state);
    }
}





/***** CONSTANTS *****/
/// The property in which the status is stored.
pub const STATUS_PROPERTY: &str = "Status";
/// The property in which a failure's reason code is stored.
pub const ERROR_REASON_PROPERTY: &str = "ErrorReason";
/// The property in which a failure's message is stored.
pub const ERROR_MESSAGE_PROPERTY: &str = "ErrorMessage";

/// The statuses that mark the end of a component's execution.
pub const COMPLETED_STATUSES: &[ClientServerStatus] = &[ClientServerStatus::ExecutionCompleted, ClientServerStatus::Failed];





/***** LIBRARY *****/
/// The status of a component on a node.
#[derive(Clone, Copy, Debug, DeserializeFromStr, Eq, Hash, PartialEq, SerializeDisplay)]
pub enum ClientServerStatus {
    /// The component is created but not yet (confirmed to be) running.
    Ready,
    /// The component is confirmed to be running.
    ExecutionStarted,
    /// The component finished successfully.
    ExecutionCompleted,
    /// The component failed; see the error properties.
    Failed,
    /// A reset was processed.
    ResetCompleted,
}

impl Display for ClientServerStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FResult {
        use ClientServerStatus::*;
        match self {
            Ready              => write!(f, "Ready"),
            ExecutionStarted   => write!(f, "ExecutionStarted"),
            ExecutionCompleted => write!(f, "ExecutionCompleted"),
            Failed             => write!(f, "Failed"),
            ResetCompleted     => write!(f, "ResetCompleted"),
        }
    }
}

impl FromStr for ClientServerStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        use ClientServerStatus::*;
        for status in [ Ready, ExecutionStarted, ExecutionCompleted, Failed, ResetCompleted ] {
            if s.eq_ignore_ascii_case(&status.to_string()) { return Ok(status); }
        }
        Err(format!("Unknown client/server status '{}'", s))
    }
}



/// A status-bearing property bag kept per component per node.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct State {
    /// The properties of the state, including its status and error information.
    #[serde(default)]
    pub properties : Parameters,
}

impl State {
    /// Constructor for a State with the given status.
    #[inline]
    pub fn with_status(status: ClientServerStatus) -> Self {
        let mut state: Self = Self::default();
        state.set_status(status);
        state
    }



    /// Returns the status of this state (parsed case-insensitively), or `None` if it has none or an unknown one.
    pub fn status(&self) -> Option<ClientServerStatus> {
        self.properties.get(STATUS_PROPERTY).and_then(|raw| ClientServerStatus::from_str(&raw.to_string()).ok())
    }

    /// Returns whether the status of this state is one of the given ones.
    #[inline]
    pub fn status_in(&self, statuses: &[ClientServerStatus]) -> bool {
        self.status().map(|status| statuses.contains(&status)).unwrap_or(false)
    }

    /// Sets the status of this state.
    #[inline]
    pub fn set_status(&mut self, status: ClientServerStatus) {
        self.properties.insert(STATUS_PROPERTY.into(), Parameter::String(status.to_string()));
    }

    /// Marks this state as failed with the given reason and message.
    pub fn set_failed(&mut self, reason: ErrorReason, message: impl Into<String>) {
        self.set_status(ClientServerStatus::Failed);
        self.properties.insert(ERROR_REASON_PROPERTY.into(), Parameter::Integer(reason.code()));
        self.properties.insert(ERROR_MESSAGE_PROPERTY.into(), Parameter::String(message.into()));
    }

    /// Returns the raw error reason code, if any.
    pub fn error_reason(&self) -> Option<i64> {
        match self.properties.get(ERROR_REASON_PROPERTY)? {
            Parameter::Integer(code) => Some(*code),
            Parameter::String(raw)   => raw.trim().parse().ok(),
            _                        => None,
        }
    }

    /// Returns the error message, if any.
    #[inline]
    pub fn error_message(&self) -> Option<String> {
        self.properties.get(ERROR_MESSAGE_PROPERTY).map(|value| value.to_string())
    }
}
