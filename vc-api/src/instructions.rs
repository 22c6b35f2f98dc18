//  INSTRUCTIONS.rs
//    by Lut99
//
//  Created:
//    05 Oct 2026, 14:22:08
//  Last edited:
//    13 Oct 2026, 16:02:44
//  Auto updated?
//    Yes
//
//  Description:
//!   Implements the handler for the `/api/instructions` path, which
//!   forwards incoming instructions to the registered handler.
//

use std::sync::Arc;

use log::{debug, error, info, warn};
use warp::Rejection;
use warp::http::StatusCode;
use warp::hyper::body::Bytes;
use warp::reply::Response;

use specifications::instructions::Instructions;
use specifications::item::Item;

use crate::server::{empty, json};
use crate::spec::{Context, InstructionsError, InstructionsHandler};


/***** LIBRARY *****/
/// Handles a POST on the `/api/instructions` path, passing the given instructions to the registered handler.
///
/// # Arguments
/// - `body`: The body of the given request, which we will attempt to parse as an `Item<Instructions>`.
/// - `context`: The context that carries options and some shared structures between the warp paths.
///
/// # Returns
/// A reponse with the following codes:
/// - `200 OK` if the instructions were accepted. The body echoes the given item.
/// - `400 BAD REQUEST` if the body could not be parsed, or the handler does not support the instructions.
/// - `500 INTERNAL SERVER ERROR` if the handler failed.
/// - `503 SERVICE UNAVAILABLE` if no handler is registered yet.
///
/// # Errors
/// This function doesn't usually error.
pub async fn post(body: Bytes, context: Arc<Context>) -> Result<Response, Rejection> {
    debug!("Handling POST on `/api/instructions` (i.e., receive instructions)...");

    // Start by parsing the incoming body
    let item: Item<Instructions> = match serde_json::from_slice(&body) {
        Ok(item) => item,
        Err(err) => {
            error!("Failed to parse incoming request body as instructions: {}", err);
            return Ok(empty(StatusCode::BAD_REQUEST));
        },
    };
    info!("Received '{}' instructions for '{}'", item.definition.kind, item.id);

    // Find someone to handle them
    let handler: Arc<dyn InstructionsHandler> = match context.handler() {
        Some(handler) => handler,
        None          => {
            warn!("Received instructions '{}' while offline", item.id);
            return Ok(empty(StatusCode::SERVICE_UNAVAILABLE));
        },
    };
    match handler.handle(&item).await {
        Ok(_)                                      => json(StatusCode::OK, &item),
        Err(err @ InstructionsError::Unsupported{ .. }) => {
            warn!("{}", err);
            Ok(empty(StatusCode::BAD_REQUEST))
        },
        Err(err @ InstructionsError::Failed{ .. }) => {
            error!("{}", err);
            Ok(empty(StatusCode::INTERNAL_SERVER_ERROR))
        },
    }
}
