//  LAYOUT.rs
//    by Lut99
//
//  Created:
//    04 Oct 2026, 09:40:16
//  Last edited:
//    14 Oct 2026, 10:48:03
//  Auto updated?
//    Yes
//
//  Description:
//!   Defines the `layout.json` file that lists every node taking part in
//!   a multi-machine run, together with its role and address.
//

use std::collections::HashSet;
use std::fs::File;
use std::path::Path;

use log::debug;
use serde::{Deserialize, Serialize};

pub use crate::errors::LayoutError as Error;


/***** TESTS *****/
#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn layout() -> EnvironmentLayout {
        EnvironmentLayout {
            clients : vec![
                ClientInstance::new("node-a", CLIENT_ROLE, "10.0.0.1"),
                ClientInstance::new("node-b", SERVER_ROLE, "10.0.0.2"),
                ClientInstance::new("node-c", SERVER_ROLE, "10.0.0.3"),
                ClientInstance::new("node-d", "server", "10.0.0.4"),
            ],
        }
    }

    #[test]
    fn layout_parse_ip_aliases() {
        let raw: &str = r#"{ "clients": [
            { "name": "node-a", "role": "Client", "ipAddress": "10.0.0.1" },
            { "name": "node-b", "role": "Server", "privateIPAddress": "10.0.0.2" }
        ] }"#;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(raw.as_bytes()).unwrap();

        let layout: EnvironmentLayout = EnvironmentLayout::from_path(file.path()).unwrap();
        assert_eq!(layout.clients.len(), 2);
        assert_eq!(layout.clients[1].ip_address, "10.0.0.2");
    }

    #[test]
    fn layout_role_strict_case_sensitive() {
        let layout: EnvironmentLayout = layout();
        let servers: Vec<&str> = layout.client_instances(SERVER_ROLE).iter().map(|i| i.name.as_str()).collect();
        assert_eq!(servers, vec![ "node-b", "node-c" ]);
        assert!(layout.client_instances("Undeclared").is_empty());
        assert_eq!(layout.first_with_role(SERVER_ROLE).unwrap().name, "node-b");
    }

    #[test]
    fn layout_role_relaxed() {
        let layout: EnvironmentLayout = layout();
        assert_eq!(layout.client_instances_relaxed("SERVER").len(), 3);
        assert_eq!(layout.client_instances("SERVER").len(), 0);
    }

    #[test]
    fn layout_validation() {
        let mut layout: EnvironmentLayout = layout();
        layout.clients.push(ClientInstance::new("NODE-A", CLIENT_ROLE, "10.0.0.9"));
        assert!(matches!(layout.validate(), Err(Error::DuplicateName{ .. })));

        let layout: EnvironmentLayout = EnvironmentLayout{ clients: vec![ ClientInstance::new("x", "", "1.1.1.1") ] };
        assert!(matches!(layout.validate(), Err(Error::EmptyField{ index: 0, field: "role" })));
    }

    #[test]
    fn layout_client_instance_by_name() {
        let layout: EnvironmentLayout = layout();
        assert_eq!(layout.client_instance("NODE-B").unwrap().ip_address, "10.0.0.2");
        assert!(layout.client_instance("node-z").is_none());
    }
}





/***** CONSTANTS *****/
/// The conventional role of the node that drives a client/server workload.
pub const CLIENT_ROLE: &str = "Client";
/// The conventional role of the node that serves a client/server workload.
pub const SERVER_ROLE: &str = "Server";





/***** LIBRARY *****/
/// Identifies one node in a multi-machine run.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ClientInstance {
    /// The name of the node. Must be equal to the agent ID or the hostname of the node.
    #[serde(alias = "Name")]
    pub name       : String,
    /// The role of the node (e.g., `Client` or `Server`).
    #[serde(alias = "Role")]
    pub role       : String,
    /// The address under which the node is reachable.
    #[serde(rename = "ipAddress", alias = "privateIPAddress", alias = "privateIpAddress", alias = "IPAddress", alias = "PrivateIPAddress")]
    pub ip_address : String,
}

impl ClientInstance {
    /// Constructor for the ClientInstance.
    #[inline]
    pub fn new(name: impl Into<String>, role: impl Into<String>, ip_address: impl Into<String>) -> Self {
        Self {
            name       : name.into(),
            role       : role.into(),
            ip_address : ip_address.into(),
        }
    }
}



/// Defines the `layout.json` file that describes all nodes taking part in a run.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct EnvironmentLayout {
    /// The nodes, in the order they were declared. This order matters: ties are broken by picking the first match.
    #[serde(alias = "Clients")]
    pub clients : Vec<ClientInstance>,
}

impl EnvironmentLayout {
    /// Constructor for the EnvironmentLayout that reads it from the given path.
    ///
    /// # Arguments
    /// - `path`: The path to read the layout from.
    ///
    /// # Returns
    /// A new, validated EnvironmentLayout instance with the contents defined in the file.
    ///
    /// # Errors
    /// This function errors if the given file cannot be read, has an invalid format or does not pass [`EnvironmentLayout::validate()`].
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path: &Path = path.as_ref();
        debug!("Loading environment layout '{}'...", path.display());

        // Open the file
        let handle: File = match File::open(path) {
            Ok(handle) => handle,
            Err(err)   => { return Err(Error::FileOpenError{ path: path.into(), err }); },
        };

        // Parse with serde
        let layout: Self = match serde_json::from_reader(handle) {
            Ok(layout) => layout,
            Err(err)   => { return Err(Error::FileParseError{ path: path.into(), err }); },
        };

        // Done
        layout.validate()?;
        Ok(layout)
    }

    /// Checks that all instances have all their fields and that names are unique (case-insensitively, like hostnames).
    ///
    /// # Errors
    /// This function errors if the layout is not valid.
    pub fn validate(&self) -> Result<(), Error> {
        let mut names: HashSet<String> = HashSet::with_capacity(self.clients.len());
        for (i, instance) in self.clients.iter().enumerate() {
            if instance.name.trim().is_empty()       { return Err(Error::EmptyField{ index: i, field: "name" }); }
            if instance.role.trim().is_empty()       { return Err(Error::EmptyField{ index: i, field: "role" }); }
            if instance.ip_address.trim().is_empty() { return Err(Error::EmptyField{ index: i, field: "ipAddress" }); }
            if !names.insert(instance.name.to_lowercase()) { return Err(Error::DuplicateName{ name: instance.name.clone() }); }
        }
        Ok(())
    }



    /// Returns the instance with the given name (compared case-insensitively, like hostnames).
    #[inline]
    pub fn client_instance(&self, name: &str) -> Option<&ClientInstance> {
        self.clients.iter().find(|instance| instance.name.eq_ignore_ascii_case(name))
    }

    /// Returns all instances with exactly the given role, in layout order.
    #[inline]
    pub fn client_instances(&self, role: &str) -> Vec<&ClientInstance> {
        self.clients.iter().filter(|instance| instance.role == role).collect()
    }

    /// Returns all instances whose role matches the given one case-insensitively, in layout order.
    #[inline]
    pub fn client_instances_relaxed(&self, role: &str) -> Vec<&ClientInstance> {
        self.clients.iter().filter(|instance| instance.role.eq_ignore_ascii_case(role)).collect()
    }

    /// Returns the first instance with exactly the given role.
    ///
    /// Layouts that declare a role more than once are not rejected; the first declaration simply wins.
    #[inline]
    pub fn first_with_role(&self, role: &str) -> Option<&ClientInstance> {
        self.clients.iter().find(|instance| instance.role == role)
    }
}
