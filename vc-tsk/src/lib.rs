//  LIB.rs
//    by Lut99
//
//  Created:
//    06 Oct 2026, 14:01:12
//  Last edited:
//    16 Oct 2026, 10:44:39
//  Auto updated?
//    Yes
//
//  Description:
//!   The `vc-tsk` library implements the execution side of the Virtual
//!   Client: running workload processes, hosting components that other
//!   nodes start through the API, and the executors that coordinate
//!   client/server runs across nodes.
//

// Declare modules
pub mod errors;
pub mod spec;
pub mod component;
pub mod process;
pub mod results;
pub mod packages;
pub mod firewall;
pub mod protocol;
pub mod supervisor;
pub mod host;
pub mod executors;
#[cfg(test)]
pub(crate) mod test_utils;
