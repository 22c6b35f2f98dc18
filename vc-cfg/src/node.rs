//  NODE.rs
//    by Lut99
//
//  Created:
//    04 Oct 2026, 10:21:44
//  Last edited:
//    15 Oct 2026, 09:02:11
//  Auto updated?
//    Yes
//
//  Description:
//!   Defines a `node.yml` file that describes the local node - in
//!   particular, under which port its API is reachable, where its
//!   directories may be found and how long it waits on its peers.
//

use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::debug;
use serde::{Deserialize, Serialize};

pub use crate::errors::NodeConfigError as Error;


/***** TESTS *****/
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_config_defaults_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let config: NodeConfig = NodeConfig::from_path_or_default(dir.path().join("node.yml")).unwrap();
        assert_eq!(config, NodeConfig::default());
        assert_eq!(config.api.port, DEFAULT_API_PORT);
        assert_eq!(config.timeouts.heartbeat(), Duration::from_secs(20 * 60));
        assert_eq!(config.timeouts.reset(), Duration::from_secs(5 * 60));
    }

    #[test]
    fn node_config_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path: PathBuf = dir.path().join("node.yml");
        std::fs::write(&path, "agent_id: node-b\napi:\n  port: 4501\ntimeouts:\n  reset: 10\n").unwrap();

        let config: NodeConfig = NodeConfig::from_path(&path).unwrap();
        assert_eq!(config.agent_id.as_deref(), Some("node-b"));
        assert_eq!(config.api.port, 4501);
        assert_eq!(config.timeouts.reset(), Duration::from_secs(10));
        assert_eq!(config.timeouts.heartbeat(), Duration::from_secs(DEFAULT_HEARTBEAT_TIMEOUT));
    }

    #[test]
    fn node_config_to_path_and_back() {
        let dir = tempfile::tempdir().unwrap();
        let path: PathBuf = dir.path().join("node.yml");
        let mut config: NodeConfig = NodeConfig::default();
        config.api.state_dir = Some(dir.path().join("state"));
        config.timeouts.poll_interval_ms = 250;
        config.to_path(&path).unwrap();

        let read: NodeConfig = NodeConfig::from_path(&path).unwrap();
        assert_eq!(read, config);
        assert_eq!(read.timeouts.poll_interval(), Duration::from_millis(250));
    }

    #[test]
    fn node_config_invalid_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path: PathBuf = dir.path().join("node.yml");
        std::fs::write(&path, "api: [ 1, 2").unwrap();
        assert!(matches!(NodeConfig::from_path(&path), Err(Error::FileParseError{ .. })));
    }
}





/***** CONSTANTS *****/
/// The port the local API listens on if nothing else is configured.
pub const DEFAULT_API_PORT: u16 = 4500;

/// Default time (in seconds) to wait for a peer's API to respond at all.
pub const DEFAULT_HEARTBEAT_TIMEOUT: u64 = 20 * 60;
/// Default time (in seconds) to wait for a peer to confirm a reset.
pub const DEFAULT_RESET_TIMEOUT: u64 = 5 * 60;
/// Default time (in seconds) to wait for a peer's workload to complete.
pub const DEFAULT_COMPLETION_TIMEOUT: u64 = 2 * 24 * 60 * 60;
/// Default time (in seconds) a host waits for a freshly started workload to report it is running.
pub const DEFAULT_START_CONFIRMATION_TIMEOUT: u64 = 2 * 60;
/// Default delay (in milliseconds) between two polls.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;





/***** HELPER FUNCTIONS *****/
#[inline]
fn default_api_port() -> u16 { DEFAULT_API_PORT }
#[inline]
fn default_heartbeat() -> u64 { DEFAULT_HEARTBEAT_TIMEOUT }
#[inline]
fn default_reset() -> u64 { DEFAULT_RESET_TIMEOUT }
#[inline]
fn default_completion() -> u64 { DEFAULT_COMPLETION_TIMEOUT }
#[inline]
fn default_start_confirmation() -> u64 { DEFAULT_START_CONFIRMATION_TIMEOUT }
#[inline]
fn default_poll_interval_ms() -> u64 { DEFAULT_POLL_INTERVAL_MS }
#[inline]
fn default_packages() -> PathBuf { PathBuf::from("./packages") }





/***** LIBRARY *****/
/// Defines where and how the local API is served.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ApiConfig {
    /// The port to listen on (on all interfaces).
    #[serde(default = "default_api_port")]
    pub port      : u16,
    /// If given, state objects are also persisted as JSON files in this directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_dir : Option<PathBuf>,
}

impl Default for ApiConfig {
    #[inline]
    fn default() -> Self {
        Self {
            port      : DEFAULT_API_PORT,
            state_dir : None,
        }
    }
}



/// Defines the directories the node works with.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct NodePaths {
    /// The directory that contains the installed workload packages (one subdirectory per package).
    #[serde(default = "default_packages")]
    pub packages : PathBuf,
}

impl Default for NodePaths {
    #[inline]
    fn default() -> Self {
        Self {
            packages : default_packages(),
        }
    }
}



/// Defines the timeouts of the client/server protocol. All are in seconds except for the poll interval.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct TimeoutsConfig {
    /// How long to wait for a peer's API to come up.
    #[serde(default = "default_heartbeat")]
    pub heartbeat          : u64,
    /// How long to wait for a peer to confirm a reset.
    #[serde(default = "default_reset")]
    pub reset              : u64,
    /// How long to wait for a peer's workload to complete.
    #[serde(default = "default_completion")]
    pub completion         : u64,
    /// How long the local host gives a freshly started workload to report it is running.
    #[serde(default = "default_start_confirmation")]
    pub start_confirmation : u64,
    /// The delay between two polls, in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms   : u64,
}

impl TimeoutsConfig {
    /// Returns the heartbeat timeout.
    #[inline]
    pub fn heartbeat(&self) -> Duration { Duration::from_secs(self.heartbeat) }
    /// Returns the reset timeout.
    #[inline]
    pub fn reset(&self) -> Duration { Duration::from_secs(self.reset) }
    /// Returns the completion timeout.
    #[inline]
    pub fn completion(&self) -> Duration { Duration::from_secs(self.completion) }
    /// Returns the start confirmation window.
    #[inline]
    pub fn start_confirmation(&self) -> Duration { Duration::from_secs(self.start_confirmation) }
    /// Returns the poll interval. Never zero.
    #[inline]
    pub fn poll_interval(&self) -> Duration { Duration::from_millis(self.poll_interval_ms.max(1)) }
}

impl Default for TimeoutsConfig {
    #[inline]
    fn default() -> Self {
        Self {
            heartbeat          : DEFAULT_HEARTBEAT_TIMEOUT,
            reset              : DEFAULT_RESET_TIMEOUT,
            completion         : DEFAULT_COMPLETION_TIMEOUT,
            start_confirmation : DEFAULT_START_CONFIRMATION_TIMEOUT,
            poll_interval_ms   : DEFAULT_POLL_INTERVAL_MS,
        }
    }
}



/// Defines a `node.yml` file, which describes the local node.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct NodeConfig {
    /// The name of this node as it appears in the environment layout. Defaults to the hostname if omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id : Option<String>,
    /// The settings of the local API.
    #[serde(default)]
    pub api      : ApiConfig,
    /// The directories of the node.
    #[serde(default)]
    pub paths    : NodePaths,
    /// The protocol timeouts.
    #[serde(default)]
    pub timeouts : TimeoutsConfig,
}

impl NodeConfig {
    /// Constructor for the NodeConfig that reads it from the given path.
    ///
    /// # Arguments
    /// - `path`: The path to read the NodeConfig from.
    ///
    /// # Returns
    /// A new NodeConfig instance with the contents defined in the file. Fields that are omitted get their default value.
    ///
    /// # Errors
    /// This function errors if the given file cannot be read or has an invalid format.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path: &Path = path.as_ref();

        // Get the raw file to parse
        let mut raw: String = String::new();
        {
            // Open the file
            let mut handle: File = match File::open(path) {
                Ok(handle) => handle,
                Err(err)   => { return Err(Error::FileOpenError { path: path.into(), err }); },
            };

            // Read the file
            if let Err(err) = handle.read_to_string(&mut raw) { return Err(Error::FileReadError { path: path.into(), err }); }
        }

        // Parse with serde
        match serde_yaml::from_str(&raw) {
            Ok(config) => Ok(config),
            Err(err)   => Err(Error::FileParseError { path: path.into(), err }),
        }
    }

    /// Like [`NodeConfig::from_path()`], but falls back to the default configuration if the file does not exist.
    ///
    /// # Errors
    /// This function errors if the file exists but cannot be read or parsed.
    pub fn from_path_or_default(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path: &Path = path.as_ref();
        if !path.exists() {
            debug!("Node config '{}' not found; using defaults", path.display());
            return Ok(Self::default());
        }
        Self::from_path(path)
    }

    /// Writes the NodeConfig to the given path.
    ///
    /// # Arguments
    /// - `path`: The path to write the NodeConfig to.
    ///
    /// # Returns
    /// Nothing, but does obviously create a new file with this NodeConfig's contents.
    ///
    /// # Errors
    /// This function errors if the given file cannot be written or we failed to serialize ourselves.
    pub fn to_path(&self, path: impl AsRef<Path>) -> Result<(), Error> {
        let path: &Path = path.as_ref();

        // Serialize the config
        let config: String = match serde_yaml::to_string(self) {
            Ok(config) => config,
            Err(err)   => { return Err(Error::ConfigSerializeError{ err }); },
        };

        // Write it
        {
            // Create the file
            let mut handle: File = match File::create(path) {
                Ok(handle) => handle,
                Err(err)   => { return Err(Error::FileCreateError { path: path.into(), err }); },
            };

            // Write the serialized config
            if let Err(err) = handle.write_all(config.as_bytes()) { return Err(Error::FileWriteError { path: path.into(), err }); }
        }

        // Done
        Ok(())
    }
}
