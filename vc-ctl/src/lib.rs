//  LIB.rs
//    by Lut99
//
//  Created:
//    18 Oct 2026, 10:08:13
//  Last edited:
//    18 Oct 2026, 11:04:58
//  Auto updated?
//    Yes
//
//  Description:
//!   The `virtualclient` executable runs workload profiles, and hosts
//!   the local API so other nodes can run the server half of a
//!   client/server workload here.
//

// Declare modules
pub mod errors;
pub mod profile;
pub mod run;
