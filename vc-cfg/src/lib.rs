//  LIB.rs
//    by Lut99
//
//  Created:
//    04 Oct 2026, 09:31:20
//  Last edited:
//    10 Oct 2026, 10:12:57
//  Auto updated?
//    Yes
//
//  Description:
//!   The `vc-cfg` library provides functions for reading Virtual Client
//!   configuration files: the environment layout shared by all nodes
//!   of a run, and the node-local configuration.
//

// Declare modules
pub mod errors;
pub mod layout;
pub mod node;
