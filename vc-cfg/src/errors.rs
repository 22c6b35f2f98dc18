//  ERRORS.rs
//    by Lut99
//
//  Created:
//    04 Oct 2026, 09:33:02
//  Last edited:
//    10 Oct 2026, 10:15:41
//  Auto updated?
//    Yes
//
//  Description:
//!   Defines errors that occur in the `vc-cfg` crate.
//

use std::error::Error;
use std::fmt::{Display, Formatter, Result as FResult};
use std::path::PathBuf;


/***** LIBRARY *****/
/// Errors that relate to the EnvironmentLayout struct.
#[derive(Debug)]
pub enum LayoutError {
    /// Failed to open the given file.
    FileOpenError{ path: PathBuf, err: std::io::Error },
    /// Failed to read/parse the given file as JSON.
    FileParseError{ path: PathBuf, err: serde_json::Error },

    /// An instance in the layout has an empty field.
    EmptyField{ index: usize, field: &'static str },
    /// Two instances in the layout have the same name.
    DuplicateName{ name: String },
}

impl Display for LayoutError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FResult {
        use LayoutError::*;
        match self {
            FileOpenError{ path, err }  => write!(f, "Failed to open environment layout file '{}': {}", path.display(), err),
            FileParseError{ path, err } => write!(f, "Failed to parse environment layout file '{}' as JSON: {}", path.display(), err),

            EmptyField{ index, field } => write!(f, "Client instance {} in the environment layout has an empty '{}' field", index, field),
            DuplicateName{ name }      => write!(f, "Client instance '{}' is defined more than once in the environment layout", name),
        }
    }
}

impl Error for LayoutError {}



/// Errors that relate to a NodeConfig.
#[derive(Debug)]
pub enum NodeConfigError {
    /// Failed to open the given config path.
    FileOpenError{ path: PathBuf, err: std::io::Error },
    /// Failed to read from the given config path.
    FileReadError{ path: PathBuf, err: std::io::Error },
    /// Failed to parse the given file.
    FileParseError{ path: PathBuf, err: serde_yaml::Error },

    /// Failed to open the given config path.
    FileCreateError{ path: PathBuf, err: std::io::Error },
    /// Failed to write to the given config path.
    FileWriteError{ path: PathBuf, err: std::io::Error },
    /// Failed to serialze the NodeConfig.
    ConfigSerializeError{ err: serde_yaml::Error },
}

impl Display for NodeConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FResult {
        use NodeConfigError::*;
        match self {
            FileOpenError{ path, err }  => write!(f, "Failed to open the node config file '{}': {}", path.display(), err),
            FileReadError{ path, err }  => write!(f, "Failed to read the node config file '{}': {}", path.display(), err),
            FileParseError{ path, err } => write!(f, "Failed to parse node config file '{}' as YAML: {}", path.display(), err),

            FileCreateError{ path, err } => write!(f, "Failed to create the node config file '{}': {}", path.display(), err),
            FileWriteError{ path, err }  => write!(f, "Failed to write to the node config file '{}': {}", path.display(), err),
            ConfigSerializeError{ err }  => write!(f, "Failed to serialize node config to YAML: {}", err),
        }
    }
}

impl Error for NodeConfigError {}
