//  PROXY.rs
//    by Lut99
//
//  Created:
//    10 Oct 2026, 09:33:58
//  Last edited:
//    17 Oct 2026, 14:48:06
//  Auto updated?
//    Yes
//
//  Description:
//!   Implements the `ClientServerProxy`, which runs its sub-components on
//!   every node in a target role (or locally), one sub-component at a
//!   time.
//

use async_trait::async_trait;
use futures::future::join_all;
use log::{debug, error, info};
use tokio_util::sync::CancellationToken;

use specifications::common::ParameterAccess;
use specifications::reason::ErrorReason;
use vc_cfg::layout::{ClientInstance, EnvironmentLayout};
use vc_shr::retry::{retry, Backoff, RetryPolicy};

use crate::component::Component;
use crate::errors::ComponentError;
use crate::protocol::{peer_client, state_id, CycleTimeouts, PeerSession};
use crate::spec::{ComponentContext, ComponentSpec};


/***** TESTS *****/
#[cfg(test)]
mod tests {
    use std::time::Duration;

    use specifications::common::{Parameter, Parameters};
    use specifications::state::{ClientServerStatus, State};
    use vc_api::client::ApiClient;

    use super::*;
    use crate::executors::CLIENT_SERVER_PROXY;
    use crate::test_utils::{local_context, registry_with, spawn_node, Scripted, TestNode};

    fn proxy(role: &str, sub: &str) -> ClientServerProxy {
        let mut params: Parameters = Parameters::new();
        params.insert("TargetRole".into(), role.into());
        let mut sub: ComponentSpec = ComponentSpec::new(sub, Parameters::new());
        sub.parameters.insert("a".into(), Parameter::Integer(1));
        let mut spec: ComponentSpec = ComponentSpec::new(CLIENT_SERVER_PROXY, params);
        spec.components.push(sub);
        ClientServerProxy::new(spec)
    }

    #[tokio::test]
    async fn proxy_runs_locally() {
        let scripted: Scripted = Scripted::new("X");
        let ctx: ComponentContext = local_context(registry_with(scripted.clone()), None);
        proxy("localhost", "X").execute(&ctx, &CancellationToken::new()).await.unwrap();
        assert_eq!(scripted.attempts(), 1);
        assert_eq!(scripted.received()[0].get_int("a").unwrap(), 1);
    }

    #[tokio::test]
    async fn proxy_retry_threshold() {
        // Client-class reasons are tried once
        let scripted: Scripted = Scripted::new("X").fails_with(ErrorReason::DependencyNotFound);
        let ctx: ComponentContext = local_context(registry_with(scripted.clone()), None);
        assert!(proxy("localhost", "X").execute(&ctx, &CancellationToken::new()).await.is_err());
        assert_eq!(scripted.attempts(), 1);

        // Workload-class reasons are tried three times
        let scripted: Scripted = Scripted::new("X").fails_with(ErrorReason::WorkloadFailed);
        let ctx: ComponentContext = local_context(registry_with(scripted.clone()), None);
        assert!(proxy("localhost", "X").execute(&ctx, &CancellationToken::new()).await.is_err());
        assert_eq!(scripted.attempts(), 3);

        // And so are unclassified errors
        let scripted: Scripted = Scripted::new("X").fails_unclassified();
        let ctx: ComponentContext = local_context(registry_with(scripted.clone()), None);
        assert!(proxy("localhost", "X").execute(&ctx, &CancellationToken::new()).await.is_err());
        assert_eq!(scripted.attempts(), 3);
    }

    #[tokio::test]
    async fn proxy_unknown_role() {
        let layout: EnvironmentLayout = EnvironmentLayout{ clients: vec![ ClientInstance::new("node-b", "Server", "127.0.0.1:1") ] };
        let scripted: Scripted = Scripted::new("X");
        let ctx: ComponentContext = local_context(registry_with(scripted.clone()), Some(layout));
        match proxy("Database", "X").execute(&ctx, &CancellationToken::new()).await {
            Err(err) => assert_eq!(err.reason(), Some(ErrorReason::DependencyNotFound)),
            Ok(_)    => panic!("Expected an undeclared role to fail"),
        }
        assert_eq!(scripted.attempts(), 0);
    }

    #[test]
    fn proxy_role_lookup() {
        let layout: EnvironmentLayout = EnvironmentLayout{ clients: vec![
            ClientInstance::new("node-a", "Client", "10.0.0.1"),
            ClientInstance::new("node-b", "Server", "10.0.0.2"),
            ClientInstance::new("node-c", "Server", "10.0.0.3"),
        ] };
        let ctx: ComponentContext = local_context(registry_with(Scripted::new("X")), Some(layout));
        let proxy: ClientServerProxy = proxy("server", "X");
        let targets: Vec<ClientInstance> = proxy.targets(&ctx, "server").unwrap();
        assert_eq!(targets.iter().map(|target| target.name.as_str()).collect::<Vec<&str>>(), vec![ "node-b", "node-c" ]);
    }

    #[tokio::test]
    async fn proxy_runs_on_peer() {
        // Node B hosts X
        let scripted: Scripted = Scripted::new("X").runs_for(Duration::from_millis(300));
        let node_b: TestNode = spawn_node("node-b", registry_with(scripted.clone()), None).await;

        // Node A runs the proxy against it
        let layout: EnvironmentLayout = EnvironmentLayout{ clients: vec![
            ClientInstance::new("node-a", "Client", "127.0.0.1:1"),
            ClientInstance::new("node-b", "Server", node_b.address.to_string()),
        ] };
        let ctx: ComponentContext = local_context(registry_with(Scripted::new("X")), Some(layout));
        let token: CancellationToken = CancellationToken::new();
        let id: String = state_id(&[ "X", "0" ]);
        let watcher: ApiClient = ApiClient::new(node_b.address.to_string(), 0).unwrap().with_poll_interval(Duration::from_millis(5));

        // While it runs, we should see it start
        let proxy: ClientServerProxy = proxy("Server", "X");
        let (res, started) = tokio::join!(
            proxy.execute(&ctx, &token),
            watcher.poll_for_expected_state::<State, _>(&id, |state: &State| state.status_in(&[ ClientServerStatus::ExecutionStarted, ClientServerStatus::ExecutionCompleted ]), Duration::from_secs(10), &token),
        );
        res.unwrap();
        started.unwrap();
        assert_eq!(scripted.received()[0].get_int("a").unwrap(), 1);
        assert_eq!(node_b.state(&id).unwrap().status(), Some(ClientServerStatus::ExecutionCompleted));

        // A reset removes it
        let session_spec: ComponentSpec = ComponentSpec::new("X", Parameters::new());
        PeerSession::new("test", &watcher, &session_spec, id.clone()).reset(Duration::from_secs(5), &token).await.unwrap();
        assert!(node_b.state(&id).is_none());
    }

    #[tokio::test]
    async fn proxy_surfaces_peer_failure() {
        let scripted: Scripted = Scripted::new("X").fails_with(ErrorReason::WorkloadResultsNotFound);
        let node_b: TestNode = spawn_node("node-b", registry_with(scripted.clone()), None).await;
        let layout: EnvironmentLayout = EnvironmentLayout{ clients: vec![ ClientInstance::new("node-b", "Server", node_b.address.to_string()) ] };
        let ctx: ComponentContext = local_context(registry_with(Scripted::new("X")), Some(layout));

        match proxy("Server", "X").execute(&ctx, &CancellationToken::new()).await {
            Err(ComponentError::PeerFailed{ component, host, code, .. }) => {
                assert_eq!(component, "X");
                assert_eq!(host, node_b.address.to_string());
                assert_eq!(code, Some(ErrorReason::WorkloadResultsNotFound.code()));
            },
            Err(err) => panic!("Expected a peer failure, got {}", err),
            Ok(_)    => panic!("Expected the peer's failure to surface"),
        }
        // Workload-class failures are retried
        assert_eq!(scripted.attempts(), 3);
    }
}





/***** CONSTANTS *****/
/// The target role that means "run on this node, without any networking".
pub const LOCALHOST_ROLE: &str = "localhost";

/// The number of retries of a failed cycle (on top of the first attempt).
pub const CYCLE_RETRIES: u32 = 2;





/***** LIBRARY *****/
/// Runs its sub-components on every node in the `TargetRole`, concurrently across nodes but one sub-component at a time.
///
/// Each sub-component is reset, started and waited for on each node, and this cycle is retried as a whole if it fails with
/// anything that is not a client-class error.
#[derive(Debug)]
pub struct ClientServerProxy {
    /// Our definition.
    spec : ComponentSpec,
}

impl ClientServerProxy {
    /// Constructor for the ClientServerProxy.
    #[inline]
    pub fn new(spec: ComponentSpec) -> Self { Self { spec } }

    /// Returns the retry policy of a single cycle.
    #[inline]
    fn retry_policy(ctx: &ComponentContext) -> RetryPolicy { RetryPolicy::new(CYCLE_RETRIES, Backoff::Fixed(ctx.retry_backoff)) }

    /// Finds the nodes in the given role: first case-sensitively, then case-insensitively.
    ///
    /// # Errors
    /// This function errors if there is no layout, or no node in the given role.
    pub fn targets(&self, ctx: &ComponentContext, role: &str) -> Result<Vec<ClientInstance>, ComponentError> {
        let layout: &EnvironmentLayout = ctx.require_layout(&self.spec.kind)?;
        let mut targets: Vec<&ClientInstance> = layout.client_instances(role);
        if targets.is_empty() {
            debug!("No nodes with role '{}'; trying case-insensitively", role);
            targets = layout.client_instances_relaxed(role);
        }
        if targets.is_empty() {
            return Err(ComponentError::Dependency{ component: self.spec.kind.clone(), host: ctx.agent_id.clone(), reason: ErrorReason::DependencyNotFound, message: format!("The environment layout has no nodes with role '{}'", role) });
        }
        Ok(targets.into_iter().cloned().collect())
    }



    /// Runs the given sub-component on this node, with retries.
    async fn run_local(&self, ctx: &ComponentContext, sub: &ComponentSpec, token: &CancellationToken) -> Result<(), ComponentError> {
        let what: String = format!("'{}' on '{}'", sub.kind, ctx.agent_id);
        retry(&what, &Self::retry_policy(ctx), token, ComponentError::is_retryable, move |_| async move {
            match ctx.registry.create(sub.clone(), &ctx.agent_id) {
                Ok(component) => component.execute(ctx, token).await,
                Err(err)      => Err(err),
            }
        }).await
    }

    /// Runs the given sub-component on the given peer, with retries.
    async fn run_remote(&self, ctx: &ComponentContext, timeouts: &CycleTimeouts, sub: &ComponentSpec, index: usize, target: &ClientInstance, token: &CancellationToken) -> Result<(), ComponentError> {
        let client = peer_client(ctx, &self.spec.kind, &target.ip_address)?;
        let session: PeerSession = PeerSession::new(&self.spec.kind, &client, sub, state_id(&[ sub.kind.as_str(), index.to_string().as_str() ]));

        let what: String = format!("'{}' on '{}' ({})", sub.kind, target.name, target.ip_address);
        let session: &PeerSession = &session;
        retry(&what, &Self::retry_policy(ctx), token, ComponentError::is_retryable, move |_| async move {
            session.run_to_completion(timeouts, token).await.map(|_| ())
        }).await
    }
}

#[async_trait]
impl Component for ClientServerProxy {
    #[inline]
    fn spec(&self) -> &ComponentSpec { &self.spec }

    async fn execute(&self, ctx: &ComponentContext, token: &CancellationToken) -> Result<(), ComponentError> {
        let role: String = self.spec.parameters.get_string_or("TargetRole", LOCALHOST_ROLE);
        let timeouts: CycleTimeouts = CycleTimeouts::from_parameters(&self.spec.parameters, &ctx.timeouts).map_err(|err| ctx.parameter_error(&self.spec.kind, err))?;

        // Resolve the targets before running anything
        let targets: Option<Vec<ClientInstance>> = if role.eq_ignore_ascii_case(LOCALHOST_ROLE) { None } else { Some(self.targets(ctx, &role)?) };

        for (index, sub) in self.spec.components.iter().enumerate() {
            if token.is_cancelled() { return Err(ComponentError::Cancelled{ component: self.spec.kind.clone(), host: ctx.agent_id.clone() }); }
            let targets: &[ClientInstance] = match &targets {
                Some(targets) => targets,
                None          => {
                    info!("Running '{}' locally", sub.kind);
                    self.run_local(ctx, sub, token).await?;
                    continue;
                },
            };

            // Run it on all targets at the same time
            info!("Running '{}' on {} node(s) with role '{}'", sub.kind, targets.len(), role);
            let results: Vec<Result<(), ComponentError>> = join_all(targets.iter().map(|target| self.run_remote(ctx, &timeouts, sub, index, target, token))).await;
            let mut first: Option<ComponentError> = None;
            for res in results {
                if let Err(err) = res {
                    error!("{}", err);
                    if first.is_none() { first = Some(err); }
                }
            }
            if let Some(err) = first { return Err(err); }
        }
        Ok(())
    }
}
