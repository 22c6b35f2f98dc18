//  STATE.rs
//    by Lut99
//
//  Created:
//    05 Oct 2026, 14:40:51
//  Last edited:
//    13 Oct 2026, 16:05:19
//  Auto updated?
//    Yes
//
//  Description:
//!   Implements the handlers on the `/api/state` path (and children),
//!   which expose the local state store.
//

use std::sync::Arc;

use log::{debug, error};
use serde_json::Value;
use warp::Rejection;
use warp::http::StatusCode;
use warp::hyper::body::Bytes;
use warp::reply::Response;

use specifications::item::Item;

use crate::server::{empty, json};
use crate::spec::Context;
use crate::store::Error;


/***** HELPER FUNCTIONS *****/
/// Parses the given body as an item, logging what went wrong if it isn't one.
fn parse_item(body: &Bytes) -> Option<Item<Value>> {
    match serde_json::from_slice(body) {
        Ok(item) => Some(item),
        Err(err) => {
            error!("Failed to parse incoming request body as a state item: {}", err);
            None
        },
    }
}





/***** LIBRARY *****/
/// Handles a GET on `/api/state/{id}`, returning the state with that ID.
///
/// # Arguments
/// - `id`: The ID of the state to return.
/// - `context`: The context that carries options and some shared structures between the warp paths.
///
/// # Returns
/// `200 OK` with the JSON-encoded item, or `404 NOT FOUND` if there is no such state.
///
/// # Errors
/// This function doesn't usually error.
pub async fn get(id: String, context: Arc<Context>) -> Result<Response, Rejection> {
    debug!("Handling GET on `/api/state/{}` (i.e., get state)...", id);
    match context.store.get(&id) {
        Some(item) => json(StatusCode::OK, &item),
        None       => Ok(empty(StatusCode::NOT_FOUND)),
    }
}



/// Handles a POST on `/api/state`, creating a new state.
///
/// # Arguments
/// - `body`: The body of the request, which must be an `Item`.
/// - `context`: The context that carries options and some shared structures between the warp paths.
///
/// # Returns
/// `200 OK` with the created item, `400 BAD REQUEST` if the body was not an item, `409 CONFLICT` if the state already
/// exists, or `500 INTERNAL SERVER ERROR` if it could not be stored.
///
/// # Errors
/// This function doesn't usually error.
pub async fn create(body: Bytes, context: Arc<Context>) -> Result<Response, Rejection> {
    debug!("Handling POST on `/api/state` (i.e., create state)...");
    let item: Item<Value> = match parse_item(&body) { Some(item) => item, None => { return Ok(empty(StatusCode::BAD_REQUEST)); } };
    match context.store.create(item).await {
        Ok(item)                  => json(StatusCode::OK, &item),
        Err(Error::Exists{ id })  => { debug!("State '{}' already exists", id); Ok(empty(StatusCode::CONFLICT)) },
        Err(err)                  => { error!("{}", err); Ok(empty(StatusCode::INTERNAL_SERVER_ERROR)) },
    }
}



/// Handles a PUT on `/api/state/{id}`, replacing an existing state.
///
/// # Arguments
/// - `id`: The ID of the state to update.
/// - `body`: The body of the request, which must be an `Item` with the same ID.
/// - `context`: The context that carries options and some shared structures between the warp paths.
///
/// # Returns
/// `200 OK` with the updated item, `400 BAD REQUEST` if the body was not an item or has another ID, `404 NOT FOUND` if
/// there is no such state, or `500 INTERNAL SERVER ERROR` if it could not be stored.
///
/// # Errors
/// This function doesn't usually error.
pub async fn update(id: String, body: Bytes, context: Arc<Context>) -> Result<Response, Rejection> {
    debug!("Handling PUT on `/api/state/{}` (i.e., update state)...", id);
    let item: Item<Value> = match parse_item(&body) { Some(item) => item, None => { return Ok(empty(StatusCode::BAD_REQUEST)); } };
    match context.store.update(&id, item).await {
        Ok(item)                        => json(StatusCode::OK, &item),
        Err(err @ Error::IdMismatch{ .. }) => { error!("{}", err); Ok(empty(StatusCode::BAD_REQUEST)) },
        Err(Error::NotFound{ .. })      => Ok(empty(StatusCode::NOT_FOUND)),
        Err(err)                        => { error!("{}", err); Ok(empty(StatusCode::INTERNAL_SERVER_ERROR)) },
    }
}



/// Handles a DELETE on `/api/state/{id}`, removing the state with that ID.
///
/// Deleting a state that does not exist is not an error, so that resets are idempotent.
///
/// # Arguments
/// - `id`: The ID of the state to delete.
/// - `context`: The context that carries options and some shared structures between the warp paths.
///
/// # Returns
/// `204 NO CONTENT`, or `500 INTERNAL SERVER ERROR` if the persisted state could not be removed.
///
/// # Errors
/// This function doesn't usually error.
pub async fn delete(id: String, context: Arc<Context>) -> Result<Response, Rejection> {
    debug!("Handling DELETE on `/api/state/{}` (i.e., delete state)...", id);
    match context.store.delete(&id).await {
        Ok(_)    => Ok(empty(StatusCode::NO_CONTENT)),
        Err(err) => { error!("{}", err); Ok(empty(StatusCode::INTERNAL_SERVER_ERROR)) },
    }
}
