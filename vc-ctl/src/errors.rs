//  ERRORS.rs
//    by Lut99
//
//  Created:
//    18 Oct 2026, 10:12:40
//  Last edited:
//    19 Oct 2026, 09:41:17
//  Auto updated?
//    Yes
//
//  Description:
//!   Defines the errors that may occur in the `virtualclient`
//!   executable.
//

use std::error::Error;
use std::fmt::{Display, Formatter, Result as FResult};
use std::path::PathBuf;

use vc_tsk::errors::ComponentError;


/***** LIBRARY *****/
/// Errors that relate to loading profiles.
#[derive(Debug)]
pub enum ProfileError {
    /// Failed to open the profile file.
    FileOpenError{ path: PathBuf, err: std::io::Error },
    /// Failed to read the profile file.
    FileReadError{ path: PathBuf, err: std::io::Error },
    /// Failed to parse the profile file.
    FileParseError{ path: PathBuf, err: serde_yaml::Error },
    /// Failed to parse a profile that was given as a string.
    ParseError{ err: serde_yaml::Error },

    /// The profile defines no actions.
    NoActions,
    /// The profile mentions a component type that is not registered.
    UnknownComponent{ kind: String, known: Vec<String> },
}
impl Display for ProfileError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FResult {
        use ProfileError::*;
        match self {
            FileOpenError{ path, err }  => write!(f, "Failed to open profile '{}': {}", path.display(), err),
            FileReadError{ path, err }  => write!(f, "Failed to read profile '{}': {}", path.display(), err),
            FileParseError{ path, err } => write!(f, "Failed to parse profile '{}' as YAML or JSON: {}", path.display(), err),
            ParseError{ err }           => write!(f, "Failed to parse profile as YAML or JSON: {}", err),

            NoActions                     => write!(f, "Profile does not define any actions"),
            UnknownComponent{ kind, known } => write!(f, "Profile uses unknown component type '{}' (known types: {})", kind, known.join(", ")),
        }
    }
}
impl Error for ProfileError {}



/// Errors that relate to running the Virtual Client.
#[derive(Debug)]
pub enum RunError {
    /// Failed to load the node config.
    NodeConfigError{ path: PathBuf, err: vc_cfg::node::Error },
    /// Failed to load the environment layout.
    LayoutError{ path: PathBuf, err: vc_cfg::layout::Error },
    /// We could not find out our own name.
    AgentIdUnknown,
    /// Failed to open the persistent state store.
    StoreError{ path: PathBuf, err: vc_api::store::Error },
    /// Failed to serve the local API.
    ServeError{ err: vc_api::server::Error },
    /// Failed to wait for Ctrl-C.
    SignalError{ err: std::io::Error },

    /// The profile could not be loaded or is invalid.
    ProfileError{ err: ProfileError },
    /// One of the actions in the profile failed.
    ActionError{ index: usize, kind: String, err: ComponentError },
}
impl Display for RunError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FResult {
        use RunError::*;
        match self {
            NodeConfigError{ path, err } => write!(f, "Failed to load node config '{}': {}", path.display(), err),
            LayoutError{ path, err }     => write!(f, "Failed to load environment layout '{}': {}", path.display(), err),
            AgentIdUnknown               => write!(f, "Could not determine the agent ID of this node (give it with '--agent-id', in the node config or via the HOSTNAME environment variable)"),
            StoreError{ path, err }      => write!(f, "Failed to open state directory '{}': {}", path.display(), err),
            ServeError{ err }            => write!(f, "Failed to serve the local API: {}", err),
            SignalError{ err }           => write!(f, "Failed to listen for Ctrl-C: {}", err),

            ProfileError{ err }             => write!(f, "{}", err),
            ActionError{ index, kind, err } => write!(f, "Action {} ('{}') failed: {}", index, kind, err),
        }
    }
}
impl Error for RunError {}
