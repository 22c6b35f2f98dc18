//  ERRORS.rs
//    by Lut99
//
//  Created:
//    05 Oct 2026, 13:05:40
//  Last edited:
//    13 Oct 2026, 15:47:12
//  Auto updated?
//    Yes
//
//  Description:
//!   Defines errors that occur in the `vc-api` crate.
//

use std::error::Error;
use std::fmt::{Display, Formatter, Result as FResult};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use reqwest::StatusCode;

use vc_shr::errors::PollError;


/***** LIBRARY *****/
/// Errors that relate to the local state store.
#[derive(Debug)]
pub enum StoreError {
    /// A state with the given ID already exists.
    Exists{ id: String },
    /// No state with the given ID exists.
    NotFound{ id: String },
    /// The ID in the path and the ID in the body did not match.
    IdMismatch{ path_id: String, body_id: String },

    /// Failed to (de)serialize a state definition.
    SerializeError{ id: String, err: serde_json::Error },
    /// Failed to create the state directory.
    DirCreateError{ path: PathBuf, err: std::io::Error },
    /// Failed to read the state directory.
    DirReadError{ path: PathBuf, err: std::io::Error },
    /// Failed to read a persisted state file.
    FileReadError{ path: PathBuf, err: std::io::Error },
    /// Failed to parse a persisted state file.
    FileParseError{ path: PathBuf, err: serde_json::Error },
    /// Failed to write a persisted state file.
    FileWriteError{ path: PathBuf, err: std::io::Error },
    /// Failed to remove a persisted state file.
    FileRemoveError{ path: PathBuf, err: std::io::Error },
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FResult {
        use StoreError::*;
        match self {
            Exists{ id }                  => write!(f, "State '{}' already exists", id),
            NotFound{ id }                => write!(f, "State '{}' does not exist", id),
            IdMismatch{ path_id, body_id } => write!(f, "State ID in path ('{}') does not match the ID in the body ('{}')", path_id, body_id),

            SerializeError{ id, err }   => write!(f, "Failed to (de)serialize state '{}': {}", id, err),
            DirCreateError{ path, err } => write!(f, "Failed to create state directory '{}': {}", path.display(), err),
            DirReadError{ path, err }   => write!(f, "Failed to read state directory '{}': {}", path.display(), err),
            FileReadError{ path, err }  => write!(f, "Failed to read state file '{}': {}", path.display(), err),
            FileParseError{ path, err } => write!(f, "Failed to parse state file '{}' as JSON: {}", path.display(), err),
            FileWriteError{ path, err } => write!(f, "Failed to write state file '{}': {}", path.display(), err),
            FileRemoveError{ path, err } => write!(f, "Failed to remove state file '{}': {}", path.display(), err),
        }
    }
}

impl Error for StoreError {}



/// Errors that an [`InstructionsHandler`](crate::spec::InstructionsHandler) may return.
#[derive(Debug)]
pub enum InstructionsError {
    /// The instructions (or the component they carry) are not supported by this node.
    Unsupported{ what: String },
    /// The instructions were understood, but handling them failed.
    Failed{ err: Box<dyn 'static + Send + Sync + Error> },
}

impl Display for InstructionsError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FResult {
        use InstructionsError::*;
        match self {
            Unsupported{ what } => write!(f, "Unsupported instructions: {}", what),
            Failed{ err }       => write!(f, "Failed to handle instructions: {}", err),
        }
    }
}

impl Error for InstructionsError {}



/// Errors that relate to serving the API.
#[derive(Debug)]
pub enum ServerError {
    /// Failed to bind the server to the given address.
    BindError{ address: SocketAddr, err: warp::Error },
}

impl Display for ServerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FResult {
        use ServerError::*;
        match self {
            BindError{ address, err } => write!(f, "Failed to bind API server to '{}': {}", address, err),
        }
    }
}

impl Error for ServerError {}



/// Errors that relate to talking to the API of another node.
#[derive(Debug)]
pub enum ClientError {
    /// The address of a node is not something we can reach.
    AddressParseError{ address: String, err: url::ParseError },
    /// The address of a node parsed, but does not name a host.
    AddressWithoutHost{ address: String },
    /// Failed to create the underlying HTTP client.
    ClientBuildError{ err: reqwest::Error },
    /// Failed to build a request.
    RequestBuildError{ address: String, err: reqwest::Error },
    /// Failed to send a request.
    RequestError{ address: String, err: reqwest::Error },
    /// The request was sent, but the server responded with a non-success code.
    RequestFailure{ address: String, code: StatusCode, err: Option<String> },
    /// Failed to parse the response body.
    ResponseParseError{ address: String, err: reqwest::Error },

    /// A polled-for condition did not hold before the timeout.
    Timeout{ address: String, what: String, timeout: Duration, attempts: usize, last: Option<String> },
    /// The operation was cancelled.
    Cancelled{ address: String, what: String },
}

impl ClientError {
    /// Converts the result of a polling loop into a ClientError.
    ///
    /// # Arguments
    /// - `address`: The address of the node we were polling.
    /// - `err`: The PollError to convert.
    ///
    /// # Returns
    /// A new ClientError that remembers the last transient error as a string.
    pub fn from_poll(address: impl Into<String>, err: PollError<ClientError>) -> Self {
        match err {
            PollError::Timeout{ what, timeout, attempts, last } => Self::Timeout{ address: address.into(), what, timeout, attempts, last: last.map(|err| err.to_string()) },
            PollError::Cancelled{ what }                        => Self::Cancelled{ address: address.into(), what },
        }
    }

    /// Returns whether this error is a polling timeout.
    #[inline]
    pub fn is_timeout(&self) -> bool { matches!(self, Self::Timeout{ .. }) }

    /// Returns whether this error is caused by a cancellation.
    #[inline]
    pub fn is_cancelled(&self) -> bool { matches!(self, Self::Cancelled{ .. }) }
}

impl Display for ClientError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FResult {
        use ClientError::*;
        match self {
            AddressParseError{ address, err }  => write!(f, "Failed to parse node address '{}': {}", address, err),
            AddressWithoutHost{ address }      => write!(f, "Node address '{}' does not name a host", address),
            ClientBuildError{ err }            => write!(f, "Failed to create HTTP client: {}", err),
            RequestBuildError{ address, err }  => write!(f, "Failed to build request to '{}': {}", address, err),
            RequestError{ address, err }       => write!(f, "Failed to send request to '{}': {}", address, err),
            RequestFailure{ address, code, err } => write!(f, "Request to '{}' failed with status {} ({}){}", address, code.as_u16(), code.canonical_reason().unwrap_or("???"), if let Some(err) = err { if !err.is_empty() { format!(": {}", err) } else { String::new() } } else { String::new() }),
            ResponseParseError{ address, err } => write!(f, "Failed to parse response from '{}': {}", address, err),

            Timeout{ address, what, timeout, attempts, last } => {
                write!(f, "Timed out after {:.1}s ({} attempts) waiting for {} on '{}'", timeout.as_secs_f64(), attempts, what, address)?;
                if let Some(last) = last { write!(f, " (last error: {})", last)?; }
                Ok(())
            },
            Cancelled{ address, what } => write!(f, "Cancelled while waiting for {} on '{}'", what, address),
        }
    }
}

impl Error for ClientError {}
