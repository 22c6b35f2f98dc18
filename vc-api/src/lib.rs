//  LIB.rs
//    by Lut99
//
//  Created:
//    05 Oct 2026, 13:02:19
//  Last edited:
//    13 Oct 2026, 16:20:51
//  Auto updated?
//    Yes
//
//  Description:
//!   The `vc-api` library implements the small REST API that every
//!   Virtual Client node hosts (heartbeat, online signal, instructions
//!   and state), plus the client other nodes use to talk to it.
//

// Declare modules
pub mod errors;
pub mod spec;
pub mod store;
pub mod health;
pub mod instructions;
pub mod state;
pub mod server;
pub mod client;
