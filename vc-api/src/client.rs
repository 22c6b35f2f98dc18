//  CLIENT.rs
//    by Lut99
//
//  Created:
//    06 Oct 2026, 09:12:45
//  Last edited:
//    14 Oct 2026, 11:37:02
//  Auto updated?
//    Yes
//
//  Description:
//!   Provides client code for the API of other nodes: heartbeat and
//!   online checks, sending instructions, state CRUD, and the polling
//!   operations that the client/server protocol is built on.
//

use std::collections::HashMap;
use std::net::Ipv6Addr;
use std::sync::Arc;
use std::time::Duration;

use log::debug;
use parking_lot::Mutex;
use reqwest::{Client, Request, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use url::Url;

use specifications::instructions::Instructions;
use specifications::item::Item;
use vc_shr::poll::poll_until;

pub use crate::errors::ClientError as Error;


/***** TESTS *****/





/***** CONSTANTS *****/
/// The timeout for a single request.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
/// The default delay between two polls.
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);





/***** HELPER FUNCTIONS *****/
/// Computes the base URL of the API on the given host.
///
/// # Arguments
/// - `host`: The host as found in the environment layout. It may be a plain IP address or hostname, or carry an explicit port.
/// - `default_port`: The port to use if the host does not carry one.
///
/// # Returns
/// The base URL, without trailing slash.
///
/// # Errors
/// This function errors if the host is not a valid address.
fn base_url(host: &str, default_port: u16) -> Result<String, Error> {
    let url: Url = parse_address(host)?;
    let name: &str = match url.host_str() {
        Some(name) => name,
        None       => { return Err(Error::AddressWithoutHost{ address: host.into() }); },
    };

    // Bare hosts use the API port; URLs keep the default of their scheme
    let port: u16 = if host.contains("://") { url.port_or_known_default().unwrap_or(default_port) } else { url.port().unwrap_or(default_port) };
    Ok(format!("{}://{}:{}", url.scheme(), name, port))
}





/***** LIBRARY *****/
/// Parses the address of a node as it may appear in an environment layout.
///
/// Addresses without a scheme are taken to be `http`, and bare IPv6 addresses may be given without brackets.
///
/// # Errors
/// This function errors if the address is not a valid URL, even after adding a scheme.
pub fn parse_address(address: &str) -> Result<Url, Error> {
    let address: &str = address.trim();
    let candidate: String = if address.contains("://") {
        address.into()
    } else if let Ok(ip) = address.parse::<Ipv6Addr>() {
        format!("http://[{}]", ip)
    } else {
        format!("http://{}", address)
    };
    match Url::parse(&candidate) {
        Ok(url)  => Ok(url),
        Err(err) => Err(Error::AddressParseError{ address: address.into(), err }),
    }
}



/// A client for the API of one (other) node.
///
/// Clients keep their underlying connection pool, so create one per node and reuse it (see [`ApiClientManager`]).
#[derive(Clone, Debug)]
pub struct ApiClient {
    /// The host as given.
    host          : String,
    /// The base URL of the API.
    base          : String,
    /// The HTTP client.
    client        : Client,
    /// The delay between two polls.
    poll_interval : Duration,
}

impl ApiClient {
    /// Constructor for the ApiClient.
    ///
    /// # Arguments
    /// - `host`: The host to connect to. May carry an explicit port (e.g., `10.0.0.1:4501`).
    /// - `port`: The port of the API if the host does not specify one.
    ///
    /// # Returns
    /// A new ApiClient.
    ///
    /// # Errors
    /// This function errors if the host is not a valid address or if the underlying HTTP client could not be created.
    pub fn new(host: impl Into<String>, port: u16) -> Result<Self, Error> {
        let host: String = host.into();
        let client: Client = match Client::builder().timeout(REQUEST_TIMEOUT).build() {
            Ok(client) => client,
            Err(err)   => { return Err(Error::ClientBuildError{ err }); },
        };
        Ok(Self {
            base : base_url(&host, port)?,
            host,
            client,
            poll_interval : DEFAULT_POLL_INTERVAL,
        })
    }

    /// Changes the delay between two polls.
    #[inline]
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Returns the host this client talks to.
    #[inline]
    pub fn host(&self) -> &str { &self.host }

    /// Returns the base URL of the API this client talks to.
    #[inline]
    pub fn base(&self) -> &str { &self.base }



    /// Builds and sends the given request.
    async fn send(&self, builder: RequestBuilder, address: &str) -> Result<Response, Error> {
        let req: Request = match builder.build() {
            Ok(req)  => req,
            Err(err) => { return Err(Error::RequestBuildError{ address: address.into(), err }); },
        };
        match self.client.execute(req).await {
            Ok(res)  => Ok(res),
            Err(err) => Err(Error::RequestError{ address: address.into(), err }),
        }
    }

    /// Turns a response with a non-success status code into an [`Error::RequestFailure`].
    ///
    /// # Arguments
    /// - `address`: The address the response came from (used for errors).
    /// - `res`: The response to check.
    ///
    /// # Returns
    /// The same response if it was successful.
    ///
    /// # Errors
    /// This function errors with the status code and body of the response if it was not successful.
    pub async fn ensure_success(address: impl Into<String>, res: Response) -> Result<Response, Error> {
        if res.status().is_success() { return Ok(res); }
        Err(Error::RequestFailure{ address: address.into(), code: res.status(), err: res.text().await.ok() })
    }

    /// Parses the body of the given response as JSON.
    async fn parse<T: DeserializeOwned>(address: &str, res: Response) -> Result<T, Error> {
        match res.json().await {
            Ok(value) => Ok(value),
            Err(err)  => Err(Error::ResponseParseError{ address: address.into(), err }),
        }
    }



    /// Checks whether the API is alive.
    ///
    /// # Errors
    /// This function errors if the API could not be reached or did not respond with success.
    pub async fn heartbeat(&self) -> Result<(), Error> {
        let address: String = format!("{}/api/heartbeat", self.base);
        let res: Response = self.send(self.client.get(&address), &address).await?;
        Self::ensure_success(address, res).await?;
        Ok(())
    }

    /// Checks whether the node behind the API accepts instructions.
    ///
    /// # Returns
    /// `true` if it is online, `false` if the API reported that it is not (yet).
    ///
    /// # Errors
    /// This function errors if the API could not be reached or responded with something unexpected.
    pub async fn is_online(&self) -> Result<bool, Error> {
        let address: String = format!("{}/api/online", self.base);
        let res: Response = self.send(self.client.get(&address), &address).await?;
        if res.status() == StatusCode::SERVICE_UNAVAILABLE { return Ok(false); }
        Self::ensure_success(address, res).await?;
        Ok(true)
    }

    /// Sends the given instructions to the node.
    ///
    /// # Arguments
    /// - `instructions`: The instructions to send.
    /// - `token`: A token that aborts the request when cancelled.
    ///
    /// # Returns
    /// The raw response. Its status code is not checked; see [`ApiClient::ensure_success()`].
    ///
    /// # Errors
    /// This function errors if the request could not be sent at all, or was cancelled.
    pub async fn send_instructions(&self, instructions: &Item<Instructions>, token: &CancellationToken) -> Result<Response, Error> {
        let address: String = format!("{}/api/instructions", self.base);
        debug!("Sending '{}' instructions for '{}' to '{}'...", instructions.definition.kind, instructions.id, self.host);
        tokio::select! {
            res = self.send(self.client.post(&address).json(instructions), &address) => res,
            _   = token.cancelled()                                                   => Err(Error::Cancelled{ address: address.clone(), what: format!("instructions '{}'", instructions.id) }),
        }
    }

    /// Retrieves the state with the given ID.
    ///
    /// # Returns
    /// The state, or `None` if the node has no state with that ID.
    ///
    /// # Errors
    /// This function errors if the request failed or the state could not be parsed as a `T`.
    pub async fn get_state<T: DeserializeOwned>(&self, id: &str) -> Result<Option<Item<T>>, Error> {
        let address: String = format!("{}/api/state/{}", self.base, id);
        let res: Response = self.send(self.client.get(&address), &address).await?;
        if res.status() == StatusCode::NOT_FOUND { return Ok(None); }
        let res: Response = Self::ensure_success(&address, res).await?;
        Self::parse(&address, res).await.map(Some)
    }

    /// Creates the given state on the node.
    ///
    /// # Returns
    /// The state as it was stored.
    ///
    /// # Errors
    /// This function errors if the request failed (including if the state already exists).
    pub async fn create_state<T: Serialize + DeserializeOwned>(&self, item: &Item<T>) -> Result<Item<T>, Error> {
        let address: String = format!("{}/api/state", self.base);
        let res: Response = self.send(self.client.post(&address).json(item), &address).await?;
        let res: Response = Self::ensure_success(&address, res).await?;
        Self::parse(&address, res).await
    }

    /// Replaces an existing state on the node.
    ///
    /// # Returns
    /// The state as it was stored.
    ///
    /// # Errors
    /// This function errors if the request failed (including if the state does not exist).
    pub async fn update_state<T: Serialize + DeserializeOwned>(&self, item: &Item<T>) -> Result<Item<T>, Error> {
        let address: String = format!("{}/api/state/{}", self.base, item.id);
        let res: Response = self.send(self.client.put(&address).json(item), &address).await?;
        let res: Response = Self::ensure_success(&address, res).await?;
        Self::parse(&address, res).await
    }

    /// Deletes the state with the given ID. Deleting a state that does not exist succeeds.
    ///
    /// # Errors
    /// This function errors if the request failed.
    pub async fn delete_state(&self, id: &str) -> Result<(), Error> {
        let address: String = format!("{}/api/state/{}", self.base, id);
        let res: Response = self.send(self.client.delete(&address), &address).await?;
        Self::ensure_success(address, res).await?;
        Ok(())
    }



    /// Waits until the API of the node responds.
    ///
    /// # Errors
    /// This function errors with [`Error::Timeout`] if it did not respond in time, or [`Error::Cancelled`] if the token was cancelled first.
    pub async fn poll_for_heartbeat(&self, timeout: Duration, token: &CancellationToken) -> Result<(), Error> {
        let this: &Self = self;
        match poll_until(format!("heartbeat of '{}'", self.host), timeout, self.poll_interval, token, move || async move { this.heartbeat().await.map(Some) }).await {
            Ok(_)    => Ok(()),
            Err(err) => Err(Error::from_poll(&self.base, err)),
        }
    }

    /// Waits until the node accepts instructions.
    ///
    /// # Errors
    /// This function errors with [`Error::Timeout`] if it did not come online in time, or [`Error::Cancelled`] if the token was cancelled first.
    pub async fn poll_for_server_online(&self, timeout: Duration, token: &CancellationToken) -> Result<(), Error> {
        let this: &Self = self;
        match poll_until(format!("'{}' to come online", self.host), timeout, self.poll_interval, token, move || async move {
            this.is_online().await.map(|online| if online { Some(()) } else { None })
        }).await {
            Ok(_)    => Ok(()),
            Err(err) => Err(Error::from_poll(&self.base, err)),
        }
    }

    /// Waits until the state with the given ID exists and satisfies the given predicate.
    ///
    /// # Arguments
    /// - `id`: The ID of the state to poll.
    /// - `predicate`: The condition the state must satisfy.
    /// - `timeout`: The maximum time to wait.
    /// - `token`: A token that aborts the polling when cancelled.
    ///
    /// # Returns
    /// The first state that satisfied the predicate.
    ///
    /// # Errors
    /// This function errors with [`Error::Timeout`] if the predicate did not hold in time, or [`Error::Cancelled`] if the token was cancelled first.
    pub async fn poll_for_expected_state<T, P>(&self, id: &str, predicate: P, timeout: Duration, token: &CancellationToken) -> Result<Item<T>, Error>
    where
        T: DeserializeOwned + Send,
        P: Fn(&T) -> bool + Send + Sync,
    {
        let this: &Self = self;
        let predicate: &P = &predicate;
        match poll_until(format!("state '{}' on '{}'", id, self.host), timeout, self.poll_interval, token, move || async move {
            this.get_state::<T>(id).await.map(|state| state.filter(|item| predicate(&item.definition)))
        }).await {
            Ok(item) => Ok(item),
            Err(err) => Err(Error::from_poll(&self.base, err)),
        }
    }

    /// Waits until the state with the given ID no longer exists (i.e., the node confirmed a reset).
    ///
    /// # Errors
    /// This function errors with [`Error::Timeout`] if the state was not deleted in time, or [`Error::Cancelled`] if the token was cancelled first.
    pub async fn poll_for_state_deleted(&self, id: &str, timeout: Duration, token: &CancellationToken) -> Result<(), Error> {
        let this: &Self = self;
        match poll_until(format!("deletion of state '{}' on '{}'", id, self.host), timeout, self.poll_interval, token, move || async move {
            this.get_state::<Value>(id).await.map(|state| if state.is_some() { None } else { Some(()) })
        }).await {
            Ok(_)    => Ok(()),
            Err(err) => Err(Error::from_poll(&self.base, err)),
        }
    }
}



/// Hands out one [`ApiClient`] per host, creating them on first use.
#[derive(Debug)]
pub struct ApiClientManager {
    /// The port of the API on hosts that do not specify one.
    port          : u16,
    /// The delay between two polls of every client.
    poll_interval : Duration,
    /// The clients created so far, by host.
    clients       : Mutex<HashMap<String, Arc<ApiClient>>>,
}

impl ApiClientManager {
    /// Constructor for the ApiClientManager.
    ///
    /// # Arguments
    /// - `port`: The port of the API on hosts that do not specify one.
    /// - `poll_interval`: The delay between two polls of every client.
    ///
    /// # Returns
    /// A new ApiClientManager without any clients.
    #[inline]
    pub fn new(port: u16, poll_interval: Duration) -> Self {
        Self {
            port,
            poll_interval,
            clients : Mutex::new(HashMap::new()),
        }
    }

    /// Returns the client for the given host, creating it if it does not exist yet.
    ///
    /// # Errors
    /// This function errors if a new client had to be made but could not be.
    pub fn get_or_create(&self, host: &str) -> Result<Arc<ApiClient>, Error> {
        let mut clients = self.clients.lock();
        if let Some(client) = clients.get(host) { return Ok(client.clone()); }

        debug!("Creating API client for '{}'...", host);
        let client: Arc<ApiClient> = Arc::new(ApiClient::new(host, self.port)?.with_poll_interval(self.poll_interval));
        clients.insert(host.into(), client.clone());
        Ok(client)
    }

    /// Returns the poll interval that clients of this manager use.
    #[inline]
    pub fn poll_interval(&self) -> Duration { self.poll_interval }
}
