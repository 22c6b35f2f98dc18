//  PROFILE.rs
//    by Lut99
//
//  Created:
//    18 Oct 2026, 10:30:02
//  Last edited:
//    19 Oct 2026, 09:12:55
//  Auto updated?
//    Yes
//
//  Description:
//!   Defines the profile file, which lists the components the Virtual
//!   Client runs (in order).
//

use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};

use vc_tsk::component::ComponentRegistry;
use vc_tsk::spec::ComponentSpec;

pub use crate::errors::ProfileError as Error;


/***** TESTS *****/





/***** HELPER FUNCTIONS *****/
/// Checks that the given component and all of its sub-components are registered.
fn validate_component(spec: &ComponentSpec, registry: &ComponentRegistry) -> Result<(), Error> {
    if !registry.contains(&spec.kind) {
        return Err(Error::UnknownComponent{ kind: spec.kind.clone(), known: registry.names().into_iter().map(String::from).collect() });
    }
    for component in &spec.components {
        validate_component(component, registry)?;
    }
    Ok(())
}





/***** LIBRARY *****/
/// Defines a profile file. Since YAML is a superset of JSON, profiles may be written in either.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Profile {
    /// A human-readable description of what the profile measures.
    #[serde(default, alias = "Description", skip_serializing_if = "Option::is_none")]
    pub description : Option<String>,
    /// The components to run, in order.
    #[serde(default, alias = "Actions")]
    pub actions     : Vec<ComponentSpec>,
}

impl Profile {
    /// Constructor for the Profile that parses it from the given string.
    ///
    /// # Errors
    /// This function errors if the string is not a valid YAML or JSON profile.
    pub fn from_string(raw: impl AsRef<str>) -> Result<Self, Error> {
        match serde_yaml::from_str(raw.as_ref()) {
            Ok(profile) => Ok(profile),
            Err(err)    => Err(Error::ParseError{ err }),
        }
    }

    /// Constructor for the Profile that reads it from the given path.
    ///
    /// # Arguments
    /// - `path`: The path to read the Profile from.
    ///
    /// # Returns
    /// A new Profile instance with the contents defined in the file.
    ///
    /// # Errors
    /// This function errors if the given file cannot be read or has an invalid format.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path: &Path = path.as_ref();

        // Get the raw file to parse
        let mut raw: String = String::new();
        {
            let mut handle: File = match File::open(path) {
                Ok(handle) => handle,
                Err(err)   => { return Err(Error::FileOpenError{ path: path.into(), err }); },
            };
            if let Err(err) = handle.read_to_string(&mut raw) { return Err(Error::FileReadError{ path: path.into(), err }); }
        }

        // Parse with serde
        match serde_yaml::from_str(&raw) {
            Ok(profile) => Ok(profile),
            Err(err)    => Err(Error::FileParseError{ path: path.into(), err }),
        }
    }



    /// Checks that the profile has something to do and that every component it mentions (nested ones included) is registered.
    ///
    /// # Errors
    /// This function errors if there are no actions or if a component type is unknown.
    pub fn validate(&self, registry: &ComponentRegistry) -> Result<(), Error> {
        if self.actions.is_empty() { return Err(Error::NoActions); }
        for action in &self.actions {
            validate_component(action, registry)?;
        }
        Ok(())
    }
}
