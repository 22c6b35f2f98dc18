//  LIB.rs
//    by Lut99
//
//  Created:
//    03 Oct 2026, 10:01:44
//  Last edited:
//    09 Oct 2026, 13:27:15
//  Auto updated?
//    Yes
//
//  Description:
//!   The `vc-shr` crate defines common tools used throughout the Virtual
//!   Client: the polling and retry primitives every protocol step is
//!   built on, and a few formatting helpers.
//

// Declare some modules
pub mod errors;
pub mod debug;
pub mod poll;
pub mod retry;
