//  HEALTH.rs
//    by Lut99
//
//  Created:
//    05 Oct 2026, 14:10:37
//  Last edited:
//    20 Oct 2026, 12:03:11
//  Auto updated?
//    Yes
//
//  Description:
//!   Implements function(s) that handle the liveness REST function(s):
//!   `/api/heartbeat` and `/api/online`.
//

use std::sync::Arc;

use log::debug;
use serde::Serialize;
use warp::Rejection;
use warp::http::StatusCode;
use warp::reply::Response;

use crate::server::{empty, json};
use crate::spec::Context;


/***** LIBRARY *****/
/// The body of a heartbeat response.
#[derive(Clone, Copy, Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Heartbeat {
    /// Whether the node also accepts instructions (see `/api/online`).
    pub online : bool,
    /// The number of states the node currently keeps.
    pub states : usize,
}



/// Handles a GET on the `/api/heartbeat` path, returning that this service is alive.
///
/// # Arguments
/// - `context`: The context that carries options and some shared structures between the warp paths.
///
/// # Returns
/// `200 OK` with a [`Heartbeat`] describing the node.
///
/// # Errors
/// This function doesn't usually error.
pub async fn heartbeat(context: Arc<Context>) -> Result<Response, Rejection> {
    debug!("Handling GET on `/api/heartbeat` (i.e., confirming service is alive)...");
    json(StatusCode::OK, &Heartbeat{ online: context.is_online(), states: context.store.len() })
}



/// Handles a GET on the `/api/online` path, returning whether this node accepts instructions.
///
/// # Arguments
/// - `context`: The context that carries options and some shared structures between the warp paths.
///
/// # Returns
/// `200 OK` if an instructions handler is registered, or `503 SERVICE UNAVAILABLE` otherwise.
///
/// # Errors
/// This function doesn't usually error.
pub async fn online(context: Arc<Context>) -> Result<Response, Rejection> {
    debug!("Handling GET on `/api/online` (i.e., confirming node accepts instructions)...");
    if context.is_online() {
        Ok(empty(StatusCode::OK))
    } else {
        Ok(empty(StatusCode::SERVICE_UNAVAILABLE))
    }
}
