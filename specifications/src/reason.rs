//  REASON.rs
//    by Lut99
//
//  Created:
//    02 Oct 2026, 11:30:02
//  Last edited:
//    13 Oct 2026, 09:47:55
//  Auto updated?
//    Yes
//
//  Description:
//!   Defines the numeric error-reason taxonomy that is shared between
//!   nodes (e.g., embedded in a `Failed` state).
//

use std::fmt::{Display, Formatter, Result as FResult};


/***** TESTS *****/
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reason_codes_roundtrip() {
        for reason in ErrorReason::ALL {
            assert_eq!(ErrorReason::from_code(reason.code()), Some(*reason));
        }
        assert_eq!(ErrorReason::from_code(12345), None);
    }

    #[test]
    fn reason_client_class_threshold() {
        assert!(ErrorReason::DependencyNotFound.is_client_class());
        assert!(ErrorReason::InstructionsNotSupported.is_client_class());
        assert!(!ErrorReason::WorkloadFailed.is_client_class());
        assert!(!ErrorReason::ApiStatePollingTimeout.is_client_class());
    }
}





/***** CONSTANTS *****/
/// Reason codes below this value denote client-class errors (bad profile, missing dependency, ...).
pub const CLIENT_CLASS_THRESHOLD: i64 = 500;





/***** LIBRARY *****/
/// The reason an executor, component or peer failed.
///
/// Codes below [`CLIENT_CLASS_THRESHOLD`] are caused by the configuration of the run and do not go away by
/// trying again; codes above it are caused by the workload, the network or the peer.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ErrorReason {
    /// The profile (or a component's parameters) is malformed.
    InvalidProfileDefinition,
    /// A layout file is required but was not given.
    LayoutNotDefined,
    /// The layout file does not describe this run (e.g., the agent or a role is missing).
    LayoutInvalid,
    /// Instructions named a component type that the receiving node does not know.
    InstructionsNotSupported,
    /// A package, binary or peer that the component needs does not exist.
    DependencyNotFound,

    /// The workload itself failed.
    WorkloadFailed,
    /// The workload did something we did not expect (e.g., crashed while starting).
    WorkloadUnexpectedAnomaly,
    /// The workload did not produce results.
    WorkloadResultsNotFound,
    /// The workload produced results we could not make sense of.
    WorkloadResultsParsingFailed,

    /// A request to a peer's API failed.
    ApiRequestFailed,
    /// A peer's state did not reach the expected value in time.
    ApiStatePollingTimeout,
}

impl ErrorReason {
    /// All known reasons.
    pub const ALL: &'static [ErrorReason] = &[
        Self::InvalidProfileDefinition,
        Self::LayoutNotDefined,
        Self::LayoutInvalid,
        Self::InstructionsNotSupported,
        Self::DependencyNotFound,
        Self::WorkloadFailed,
        Self::WorkloadUnexpectedAnomaly,
        Self::WorkloadResultsNotFound,
        Self::WorkloadResultsParsingFailed,
        Self::ApiRequestFailed,
        Self::ApiStatePollingTimeout,
    ];



    /// Returns the numeric code of this reason.
    pub fn code(&self) -> i64 {
        use ErrorReason::*;
        match self {
            InvalidProfileDefinition => 100,
            LayoutNotDefined         => 110,
            LayoutInvalid            => 111,
            InstructionsNotSupported => 120,
            DependencyNotFound       => 300,

            WorkloadFailed               => 500,
            WorkloadUnexpectedAnomaly    => 501,
            WorkloadResultsNotFound      => 502,
            WorkloadResultsParsingFailed => 503,

            ApiRequestFailed       => 600,
            ApiStatePollingTimeout => 601,
        }
    }

    /// Resolves a numeric code back to a reason.
    ///
    /// # Returns
    /// The matching reason, or `None` if the code is unknown to us.
    pub fn from_code(code: i64) -> Option<Self> {
        Self::ALL.iter().find(|reason| reason.code() == code).copied()
    }

    /// Returns whether this is a client-class reason (i.e., code below [`CLIENT_CLASS_THRESHOLD`]).
    #[inline]
    pub fn is_client_class(&self) -> bool { self.code() < CLIENT_CLASS_THRESHOLD }
}

impl Display for ErrorReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> FResult {
        use ErrorReason::*;
        let name: &str = match self {
            InvalidProfileDefinition => "InvalidProfileDefinition",
            LayoutNotDefined         => "LayoutNotDefined",
            LayoutInvalid            => "LayoutInvalid",
            InstructionsNotSupported => "InstructionsNotSupported",
            DependencyNotFound       => "DependencyNotFound",

            WorkloadFailed               => "WorkloadFailed",
            WorkloadUnexpectedAnomaly    => "WorkloadUnexpectedAnomaly",
            WorkloadResultsNotFound      => "WorkloadResultsNotFound",
            WorkloadResultsParsingFailed => "WorkloadResultsParsingFailed",

            ApiRequestFailed       => "ApiRequestFailed",
            ApiStatePollingTimeout => "ApiStatePollingTimeout",
        };
        write!(f, "{} ({})", name, self.code())
    }
}
