//  SERVER.rs
//    by Lut99
//
//  Created:
//    05 Oct 2026, 15:02:33
//  Last edited:
//    14 Oct 2026, 09:51:17
//  Auto updated?
//    Yes
//
//  Description:
//!   Contains code pertaining to the actual server itself: the warp
//!   filters that make up the API, and a function that serves them
//!   until cancelled.
//

use std::net::SocketAddr;
use std::sync::Arc;

use log::{error, info};
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use warp::{Filter, Rejection, Reply};
use warp::http::{HeaderValue, StatusCode};
use warp::hyper::Body;
use warp::reply::Response;

use crate::spec::Context;
use crate::{health, instructions, state};

pub use crate::errors::ServerError as Error;


/***** TESTS *****/





/***** CONSTANTS *****/
/// The largest request body we accept.
const MAX_BODY_SIZE: u64 = 4 * 1024 * 1024;





/***** HELPER FUNCTIONS *****/
/// "Casts" the given StatusCode to an empty response.
pub(crate) fn empty(code: StatusCode) -> Response {
    let mut response = Response::new(Body::empty());
    *response.status_mut() = code;
    response
}

/// Serializes the given value as a JSON response with the given status code.
pub(crate) fn json<T: Serialize>(code: StatusCode, value: &T) -> Result<Response, Rejection> {
    let body: String = match serde_json::to_string(value) {
        Ok(body) => body,
        Err(err) => {
            error!("Failed to serialize response body: {}", err);
            return Ok(empty(StatusCode::INTERNAL_SERVER_ERROR));
        },
    };
    let body_len: usize = body.len();

    // Construct a response with the body and the content-length header
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = code;
    response.headers_mut().insert("Content-Type", HeaderValue::from_static("application/json"));
    response.headers_mut().insert("Content-Length", HeaderValue::from(body_len));
    Ok(response)
}





/***** LIBRARY *****/
/// Builds the warp filter that implements the API.
///
/// # Arguments
/// - `context`: The Context that is shared between all paths.
///
/// # Returns
/// A filter that can be given to `warp::serve()`.
pub fn routes(context: Arc<Context>) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone + Send + Sync + 'static {
    let context = warp::any().map(move || context.clone());

    let heartbeat = warp::get()
        .and(warp::path!("api" / "heartbeat"))
        .and(context.clone())
        .and_then(health::heartbeat);
    let online = warp::get()
        .and(warp::path!("api" / "online"))
        .and(context.clone())
        .and_then(health::online);
    let post_instructions = warp::post()
        .and(warp::path!("api" / "instructions"))
        .and(warp::body::content_length_limit(MAX_BODY_SIZE))
        .and(warp::body::bytes())
        .and(context.clone())
        .and_then(instructions::post);
    let get_state = warp::get()
        .and(warp::path!("api" / "state" / String))
        .and(context.clone())
        .and_then(state::get);
    let create_state = warp::post()
        .and(warp::path!("api" / "state"))
        .and(warp::body::content_length_limit(MAX_BODY_SIZE))
        .and(warp::body::bytes())
        .and(context.clone())
        .and_then(state::create);
    let update_state = warp::put()
        .and(warp::path!("api" / "state" / String))
        .and(warp::body::content_length_limit(MAX_BODY_SIZE))
        .and(warp::body::bytes())
        .and(context.clone())
        .and_then(state::update);
    let delete_state = warp::delete()
        .and(warp::path!("api" / "state" / String))
        .and(context)
        .and_then(state::delete);

    heartbeat.or(online).or(post_instructions).or(get_state).or(create_state).or(update_state).or(delete_state)
}



/// Serves the API on the given address until the given token is cancelled.
///
/// Must be called from within a tokio runtime, since the server is spawned as a separate task.
///
/// # Arguments
/// - `context`: The Context that is shared between all paths.
/// - `address`: The address to serve on. Use port `0` to let the OS pick one.
/// - `token`: A token that gracefully shuts down the server when cancelled.
///
/// # Returns
/// The address the server is actually bound to, and a handle to the task that runs it.
///
/// # Errors
/// This function errors if we failed to bind to the given address.
pub fn serve(context: Arc<Context>, address: SocketAddr, token: CancellationToken) -> Result<(SocketAddr, JoinHandle<()>), Error> {
    let filter = routes(context);
    let (bound, server) = match warp::serve(filter).try_bind_with_graceful_shutdown(address, async move { token.cancelled().await }) {
        Ok(res)  => res,
        Err(err) => { return Err(Error::BindError{ address, err }); },
    };

    info!("API listening on '{}'", bound);
    Ok((bound, tokio::spawn(server)))
}
