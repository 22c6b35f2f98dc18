//  FIREWALL.rs
//    by Lut99
//
//  Created:
//    07 Oct 2026, 10:31:04
//  Last edited:
//    07 Oct 2026, 10:52:16
//  Auto updated?
//    Yes
//
//  Description:
//!   Defines the interface through which server components ask for
//!   inbound traffic to be allowed.
//

use std::fmt::{Display, Formatter, Result as FResult};

use log::info;


/***** LIBRARY *****/
/// Describes inbound traffic that a workload needs.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FirewallEntry {
    /// A name for the rule (usually the component type).
    pub name     : String,
    /// The protocol (e.g., `tcp` or `udp`).
    pub protocol : String,
    /// The ports that must be reachable.
    pub ports    : Vec<u16>,
}

impl Display for FirewallEntry {
    fn fmt(&self, f: &mut Formatter<'_>) -> FResult {
        write!(f, "{} ({}/{})", self.name, self.protocol, self.ports.iter().map(|p| p.to_string()).collect::<Vec<String>>().join(","))
    }
}



/// Something that can open the local firewall.
pub trait FirewallManager: Send + Sync {
    /// Makes sure the given inbound traffic is allowed.
    fn enable_inbound(&self, entry: &FirewallEntry);
}



/// A FirewallManager that only records what it is asked to do.
#[derive(Clone, Copy, Debug, Default)]
pub struct LoggingFirewall;

impl FirewallManager for LoggingFirewall {
    #[inline]
    fn enable_inbound(&self, entry: &FirewallEntry) {
        info!("Inbound traffic requested for {}", entry);
    }
}
