//  LIB.rs
//    by Lut99
//
//  Created:
//    02 Oct 2026, 10:05:13
//  Last edited:
//    14 Oct 2026, 16:02:50
//  Auto updated?
//    Yes
//
//  Description:
//!   The `specifications` crate defines the types that travel between
//!   nodes: instructions, states, the item envelope around them, the
//!   error-reason taxonomy and normalized metrics.
//

// Declare modules
pub mod common;
pub mod reason;
pub mod item;
pub mod instructions;
pub mod state;
pub mod metrics;
