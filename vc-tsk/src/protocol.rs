//  PROTOCOL.rs
//    by Lut99
//
//  Created:
//    08 Oct 2026, 10:21:36
//  Last edited:
//    16 Oct 2026, 16:40:12
//  Auto updated?
//    Yes
//
//  Description:
//!   Implements the client side of the client/server protocol against a
//!   single peer: waiting for it to be ready, resetting it, starting a
//!   component on it and polling its state.
//

use std::sync::Arc;
use std::time::Duration;

use log::{debug, info};
use reqwest::{Response, StatusCode};
use tokio_util::sync::CancellationToken;

use specifications::common::{ParameterAccess, ParameterError, Parameters};
use specifications::instructions::{Instructions, InstructionsType};
use specifications::item::Item;
use specifications::reason::ErrorReason;
use specifications::state::{ClientServerStatus, State, COMPLETED_STATUSES};
use vc_api::client::ApiClient;
use vc_api::errors::ClientError;
use vc_cfg::node::TimeoutsConfig;

use crate::errors::ComponentError;
use crate::spec::{ComponentContext, ComponentSpec};


/***** TESTS *****/
#[cfg(test)]
mod tests {
    use specifications::common::Parameter;
    use specifications::state::ERROR_REASON_PROPERTY;

    use super::*;
    use crate::test_utils::{registry_with, spawn_node, Scripted, TestNode};

    #[test]
    fn state_ids_are_url_safe() {
        assert_eq!(state_id(&[ "ExecuteCommand", "0" ]), "ExecuteCommand-0");
        assert_eq!(state_id(&[ "NetworkServer", "node a/b:1" ]), "NetworkServer-node-a-b-1");
    }

    #[test]
    fn cycle_timeouts_from_parameters() {
        let defaults: TimeoutsConfig = TimeoutsConfig::default();
        let mut params: Parameters = Parameters::new();
        params.insert("ResetTimeout".into(), Parameter::Integer(7));
        params.insert("CompletionTimeout".into(), Parameter::String("9".into()));

        let timeouts: CycleTimeouts = CycleTimeouts::from_parameters(&params, &defaults).unwrap();
        assert_eq!(timeouts.heartbeat, defaults.heartbeat());
        assert_eq!(timeouts.reset, Duration::from_secs(7));
        assert_eq!(timeouts.completion, Duration::from_secs(9));

        params.insert("HeartbeatTimeout".into(), Parameter::Integer(-1));
        assert!(CycleTimeouts::from_parameters(&params, &defaults).is_err());
    }

    #[tokio::test]
    async fn peer_never_starts() {
        // The workload on the peer never reports that it runs
        let node_b: TestNode = spawn_node("node-b", registry_with(Scripted::new("X").never_running().runs_for(Duration::from_secs(60))), None).await;
        let client: ApiClient = ApiClient::new(node_b.address.to_string(), 0).unwrap().with_poll_interval(Duration::from_millis(10));
        let target: ComponentSpec = ComponentSpec::new("X", Parameters::new());
        let session: PeerSession = PeerSession::new("test", &client, &target, "X-0");
        let token: CancellationToken = CancellationToken::new();

        session.await_ready(Duration::from_secs(5), &token).await.unwrap();
        session.reset(Duration::from_secs(5), &token).await.unwrap();
        session.start(&token).await.unwrap();
        match session.await_status(&[ ClientServerStatus::ExecutionStarted ], Duration::from_secs(2), &token).await {
            Err(err) => assert_eq!(err.reason(), Some(ErrorReason::ApiStatePollingTimeout)),
            Ok(state) => panic!("Expected the wait to time out, got {:?}", state),
        }
        assert_eq!(node_b.state("X-0").and_then(|state| state.status()), Some(ClientServerStatus::Ready));
    }

    #[tokio::test]
    async fn peer_rejects_unknown_component() {
        let node_b: TestNode = spawn_node("node-b", registry_with(Scripted::new("X")), None).await;
        let client: ApiClient = ApiClient::new(node_b.address.to_string(), 0).unwrap();
        let target: ComponentSpec = ComponentSpec::new("Unknown", Parameters::new());
        let session: PeerSession = PeerSession::new("test", &client, &target, "Unknown-0");

        match session.start(&CancellationToken::new()).await {
            Err(err) => assert_eq!(err.reason(), Some(ErrorReason::ApiRequestFailed)),
            Ok(_)    => panic!("Expected the peer to reject an unknown component"),
        }
    }

    #[tokio::test]
    async fn peer_failure_keeps_unknown_codes() {
        let node_b: TestNode = spawn_node("node-b", registry_with(Scripted::new("X")), None).await;
        let mut failed: State = State::with_status(ClientServerStatus::Failed);
        failed.properties.insert(ERROR_REASON_PROPERTY.into(), Parameter::Integer(404));
        node_b.store.upsert(&Item::new("X-0", failed)).await.unwrap();

        let client: ApiClient = ApiClient::new(node_b.address.to_string(), 0).unwrap();
        let target: ComponentSpec = ComponentSpec::new("X", Parameters::new());
        match PeerSession::new("test", &client, &target, "X-0").current_state().await {
            Err(err) => {
                assert_eq!(err.code(), Some(404));
                assert!(!err.is_retryable());
            },
            Ok(state) => panic!("Expected the failed state to become an error, got {:?}", state),
        }
    }
}





/***** HELPER FUNCTIONS *****/
/// Reads an optional timeout parameter, falling back to the given default.
fn secs_or(params: &Parameters, name: &str, default: Duration) -> Result<Duration, ParameterError> {
    if params.raw(name).is_none() { return Ok(default); }
    params.get_secs(name)
}





/***** LIBRARY *****/
/// Builds a state ID from the given parts. Anything that is not safe in a URL path segment is replaced by a dash.
pub fn state_id(parts: &[&str]) -> String {
    parts.iter().map(|part| part.chars().map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' { c } else { '-' }).collect::<String>()).collect::<Vec<String>>().join("-")
}



/// The three independent timeouts of a client/server cycle.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct CycleTimeouts {
    /// How long to wait for the peer's heartbeat and online signal.
    pub heartbeat  : Duration,
    /// How long to wait for the peer to confirm a reset.
    pub reset      : Duration,
    /// How long to wait for the peer to finish.
    pub completion : Duration,
}

impl CycleTimeouts {
    /// Reads the timeouts from the `HeartbeatTimeout`, `ResetTimeout` and `CompletionTimeout` parameters (in seconds), falling back to the node's configuration.
    ///
    /// # Errors
    /// This function errors if any of the parameters is given but is not a non-negative integer.
    pub fn from_parameters(params: &Parameters, defaults: &TimeoutsConfig) -> Result<Self, ParameterError> {
        Ok(Self {
            heartbeat  : secs_or(params, "HeartbeatTimeout", defaults.heartbeat())?,
            reset      : secs_or(params, "ResetTimeout", defaults.reset())?,
            completion : secs_or(params, "CompletionTimeout", defaults.completion())?,
        })
    }
}



/// Drives one component on one peer through the client/server protocol.
#[derive(Debug)]
pub struct PeerSession<'a> {
    /// The type name of the component on whose behalf we talk to the peer (used in errors).
    owner  : &'a str,
    /// The client for the peer's API.
    client : &'a ApiClient,
    /// The component to run on the peer.
    target : &'a ComponentSpec,
    /// The ID that correlates our instructions with the peer's state.
    id     : String,
}

impl<'a> PeerSession<'a> {
    /// Constructor for the PeerSession.
    ///
    /// # Arguments
    /// - `owner`: The type name of the component that runs this session.
    /// - `client`: The client for the peer's API.
    /// - `target`: The component to run on the peer.
    /// - `id`: The ID of the instructions and state for this component.
    #[inline]
    pub fn new(owner: &'a str, client: &'a ApiClient, target: &'a ComponentSpec, id: impl Into<String>) -> Self {
        Self {
            owner,
            client,
            target,
            id : id.into(),
        }
    }

    /// Returns the ID that correlates our instructions with the peer's state.
    #[inline]
    pub fn id(&self) -> &str { &self.id }

    /// Returns the host of the peer.
    #[inline]
    pub fn host(&self) -> &str { self.client.host() }

    /// Wraps a client error in a ComponentError that names us and the peer.
    #[inline]
    fn client_error(&self, err: ClientError) -> ComponentError { ComponentError::from_client(self.owner, self.host(), err) }



    /// Waits for the peer's API to respond and for the peer to accept instructions.
    ///
    /// # Errors
    /// This function errors with a [`ComponentError::Timeout`] if the peer did not become ready in time.
    pub async fn await_ready(&self, timeout: Duration, token: &CancellationToken) -> Result<(), ComponentError> {
        debug!("Waiting for '{}' to become ready...", self.host());
        if let Err(err) = self.client.poll_for_heartbeat(timeout, token).await { return Err(self.client_error(err)); }
        if let Err(err) = self.client.poll_for_server_online(timeout, token).await { return Err(self.client_error(err)); }
        Ok(())
    }

    /// Sends instructions of the given kind for our target component.
    async fn send(&self, kind: InstructionsType, token: &CancellationToken) -> Result<(), ComponentError> {
        let instructions: Item<Instructions> = Item::new(self.id.clone(), Instructions::for_component(kind, &self.target.kind, &self.target.parameters));
        let res: Response = match self.client.send_instructions(&instructions, token).await {
            Ok(res)  => res,
            Err(err) => { return Err(self.client_error(err)); },
        };
        if !res.status().is_success() {
            let code: StatusCode = res.status();
            let body: String = res.text().await.unwrap_or_default();
            return Err(ComponentError::Workload{ component: self.owner.into(), host: self.host().into(), reason: ErrorReason::ApiRequestFailed, message: format!("'{}' instructions for '{}' were rejected with status {}: {}", instructions.definition.kind, self.target.kind, code, body.trim()) });
        }
        Ok(())
    }

    /// Resets the target component on the peer and waits until the peer confirms by deleting its state.
    ///
    /// # Errors
    /// This function errors if the instructions were rejected or the state was not deleted in time.
    pub async fn reset(&self, timeout: Duration, token: &CancellationToken) -> Result<(), ComponentError> {
        debug!("Resetting '{}' on '{}'...", self.target.kind, self.host());
        self.send(InstructionsType::ClientServerReset, token).await?;
        match self.client.poll_for_state_deleted(&self.id, timeout, token).await {
            Ok(_)    => Ok(()),
            Err(err) => Err(self.client_error(err)),
        }
    }

    /// Instructs the peer to start the target component in the background.
    ///
    /// # Errors
    /// This function errors if the instructions could not be sent or were rejected.
    pub async fn start(&self, token: &CancellationToken) -> Result<(), ComponentError> {
        info!("Starting '{}' on '{}'", self.target.kind, self.host());
        self.send(InstructionsType::ClientServerStartExecution, token).await
    }

    /// Waits until the target component's state on the peer has one of the given statuses.
    ///
    /// A `Failed` state always ends the wait, and is turned into a [`ComponentError::PeerFailed`] carrying the reason code from the state.
    ///
    /// # Returns
    /// The state that satisfied the wait.
    ///
    /// # Errors
    /// This function errors if the state did not reach any of the statuses in time, or if it reached `Failed`.
    pub async fn await_status(&self, statuses: &[ClientServerStatus], timeout: Duration, token: &CancellationToken) -> Result<State, ComponentError> {
        let state: State = match self.client.poll_for_expected_state::<State, _>(&self.id, |state: &State| state.status_in(statuses) || state.status() == Some(ClientServerStatus::Failed), timeout, token).await {
            Ok(item) => item.definition,
            Err(err) => { return Err(self.client_error(err)); },
        };
        self.check_failed(state)
    }

    /// Retrieves the current state of the target component on the peer, if it has any.
    ///
    /// # Errors
    /// This function errors if the request failed, or if the state is `Failed`.
    pub async fn current_state(&self) -> Result<Option<State>, ComponentError> {
        match self.client.get_state::<State>(&self.id).await {
            Ok(Some(item)) => self.check_failed(item.definition).map(Some),
            Ok(None)       => Ok(None),
            Err(err)       => Err(self.client_error(err)),
        }
    }

    /// Turns a `Failed` state into an error.
    fn check_failed(&self, state: State) -> Result<State, ComponentError> {
        if state.status() != Some(ClientServerStatus::Failed) { return Ok(state); }
        let message: String = state.error_message().unwrap_or_else(|| format!("'{}' reported that it failed", self.target.kind));
        Err(ComponentError::PeerFailed{ component: self.target.kind.clone(), host: self.host().into(), code: state.error_reason(), message })
    }



    /// Runs a complete cycle: ready, reset, start and wait for completion.
    ///
    /// # Returns
    /// The terminal state of the component on the peer.
    ///
    /// # Errors
    /// This function errors if any step failed, or if the component failed on the peer.
    pub async fn run_to_completion(&self, timeouts: &CycleTimeouts, token: &CancellationToken) -> Result<State, ComponentError> {
        self.await_ready(timeouts.heartbeat, token).await?;
        self.reset(timeouts.reset, token).await?;
        self.start(token).await?;
        let state: State = self.await_status(COMPLETED_STATUSES, timeouts.completion, token).await?;
        info!("'{}' completed on '{}'", self.target.kind, self.host());
        Ok(state)
    }
}



/// Returns a client for the given peer, or a ComponentError naming the given component.
pub fn peer_client(ctx: &ComponentContext, owner: &str, host: &str) -> Result<Arc<ApiClient>, ComponentError> {
    ctx.clients.get_or_create(host).map_err(|err| ComponentError::from_client(owner, host, err))
}
