//  NETWORK.rs
//    by Lut99
//
//  Created:
//    10 Oct 2026, 13:17:40
//  Last edited:
//    17 Oct 2026, 16:05:29
//  Auto updated?
//    Yes
//
//  Description:
//!   Implements the role-based network workload: a client half that
//!   drives its server through the client/server protocol and then runs
//!   the client tool locally, and the server half that the component host
//!   runs on request.
//

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::{info, warn};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use url::Host;

use specifications::common::{ParameterAccess, Parameters};
use specifications::reason::ErrorReason;
use specifications::state::ClientServerStatus;
use vc_api::client::parse_address;
use vc_cfg::layout::{ClientInstance, EnvironmentLayout, CLIENT_ROLE, SERVER_ROLE};

use super::{emit_metrics, process_spec, read_results, substitute, NETWORK_SERVER};
use crate::component::Component;
use crate::errors::ComponentError;
use crate::firewall::FirewallEntry;
use crate::process::{ProcessOutcome, ProcessOutput, ProcessSpec, WorkloadProcess};
use crate::protocol::{peer_client, state_id, CycleTimeouts, PeerSession};
use crate::spec::{ComponentContext, ComponentSpec};


/***** TESTS *****/





/***** HELPER FUNCTIONS *****/
/// Returns the host part of an address from the layout, without any scheme or port.
///
/// Addresses that do not parse are returned as-is, so that the tools may complain about them instead.
fn host_part(address: &str) -> String {
    match parse_address(address).as_ref().ok().and_then(|url| url.host()) {
        Some(Host::Ipv6(ip)) => ip.to_string(),
        Some(host)           => host.to_string(),
        None                 => address.trim().into(),
    }
}





/***** LIBRARY *****/
/// The role a node plays in a network workload.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Role {
    /// The node drives the workload and runs the client tool.
    Client,
    /// The node runs the server tool on request of the client.
    Server,
}



/// The role-based network workload.
///
/// On a `Client` node, it resolves the (first) `Server` node from the layout, resets it, starts a [`NetworkServer`] on it and
/// waits for it to run, then runs `ClientCommand` locally and reports the metrics it produced. On a `Server` node, it waits
/// until it is cancelled; the server half is started by the client through the API.
///
/// Parameters (besides those of the [`NetworkServer`]):
/// - `ClientCommand` (required), `ClientArguments`: The client tool. `{ServerIp}`, `{ClientIp}` and `{Port}` are substituted.
/// - `Timeout`, `SuccessCodes`, `RetryPattern`, `Retries`: How to run the client tool.
/// - `ResultsFile`, `ResultsTimeout`: Read the metrics from this file instead of stdout.
/// - `HeartbeatTimeout`, `ResetTimeout`: Protocol timeouts, in seconds.
/// - `StartTimeout`: Seconds to wait for the server to run. Defaults to the heartbeat timeout.
#[derive(Debug)]
pub struct NetworkWorkload {
    /// Our definition.
    spec : ComponentSpec,
}

impl NetworkWorkload {
    /// Constructor for the NetworkWorkload.
    #[inline]
    pub fn new(spec: ComponentSpec) -> Self { Self { spec } }

    /// Resolves which node we are in the layout, and which role we play.
    ///
    /// # Errors
    /// This function errors if there is no layout, we are not in it, or our role is neither `Client` nor `Server`.
    pub fn role<'c>(&self, ctx: &'c ComponentContext) -> Result<(&'c ClientInstance, Role), ComponentError> {
        let layout: &EnvironmentLayout = ctx.require_layout(&self.spec.kind)?;
        let me: &ClientInstance = match layout.client_instance(&ctx.agent_id) {
            Some(me) => me,
            None     => { return Err(ComponentError::Dependency{ component: self.spec.kind.clone(), host: ctx.agent_id.clone(), reason: ErrorReason::LayoutInvalid, message: format!("Node '{}' does not appear in the environment layout", ctx.agent_id) }); },
        };
        match me.role.as_str() {
            CLIENT_ROLE => Ok((me, Role::Client)),
            SERVER_ROLE => Ok((me, Role::Server)),
            role        => Err(ComponentError::Dependency{ component: self.spec.kind.clone(), host: ctx.agent_id.clone(), reason: ErrorReason::LayoutInvalid, message: format!("Node '{}' has role '{}', but this workload needs a '{}' or a '{}'", ctx.agent_id, role, CLIENT_ROLE, SERVER_ROLE) }),
        }
    }



    /// Runs the client half against the given server.
    async fn run_client(&self, ctx: &ComponentContext, session: &PeerSession<'_>, me: &ClientInstance, server: &ClientInstance, token: &CancellationToken) -> Result<(), ComponentError> {
        let kind: &str = &self.spec.kind;
        let params: &Parameters = &self.spec.parameters;
        let timeouts: CycleTimeouts = CycleTimeouts::from_parameters(params, &ctx.timeouts).map_err(|err| ctx.parameter_error(kind, err))?;
        let start_timeout: Duration = if params.raw("StartTimeout").is_some() { params.get_secs("StartTimeout").map_err(|err| ctx.parameter_error(kind, err))? } else { timeouts.heartbeat };

        // Get the server going
        session.await_ready(timeouts.heartbeat, token).await?;
        session.reset(timeouts.reset, token).await?;
        session.start(token).await?;
        session.await_status(&[ ClientServerStatus::ExecutionStarted, ClientServerStatus::ExecutionCompleted ], start_timeout, token).await?;

        // Run the client tool
        let server_ip: String = host_part(&server.ip_address);
        let client_ip: String = host_part(&me.ip_address);
        let port: String = params.get_string_or("Port", "");
        let command: String = params.get_string("ClientCommand").map_err(|err| ctx.parameter_error(kind, err))?;
        let arguments: String = substitute(&params.get_string_or("ClientArguments", ""), &[ ("ServerIp", &server_ip), ("ClientIp", &client_ip), ("Port", &port) ]);
        let process: WorkloadProcess = WorkloadProcess::new(process_spec(ctx, kind, params, command, arguments)?);
        let output: ProcessOutput = match process.run(token).await {
            Ok(output) => output,
            Err(err)   => { return Err(ComponentError::Process{ component: kind.into(), host: ctx.agent_id.clone(), err }); },
        };
        if output.outcome == ProcessOutcome::Cancelled { return Err(ComponentError::Cancelled{ component: kind.into(), host: ctx.agent_id.clone() }); }

        // Make sure the server did not die halfway
        session.current_state().await?;

        // Report
        let raw: String = read_results(ctx, kind, params, None, output.stdout, token).await?;
        let mut metadata: Parameters = Parameters::new();
        metadata.insert("Role".into(), CLIENT_ROLE.into());
        metadata.insert("Host".into(), ctx.agent_id.as_str().into());
        metadata.insert("ServerIp".into(), server_ip.into());
        metadata.insert("ClientIp".into(), client_ip.into());
        if let Ok(scenario) = params.get_string("Scenario") { metadata.insert("Scenario".into(), scenario.into()); }
        emit_metrics(ctx, kind, &metadata, &raw);
        Ok(())
    }
}

#[async_trait]
impl Component for NetworkWorkload {
    #[inline]
    fn spec(&self) -> &ComponentSpec { &self.spec }

    async fn execute(&self, ctx: &ComponentContext, token: &CancellationToken) -> Result<(), ComponentError> {
        let (me, role): (&ClientInstance, Role) = self.role(ctx)?;
        if role == Role::Server {
            ctx.sink.log_message(&self.spec.kind, &format!("'{}' is ready to serve; waiting for a client to start the server", me.name));
            token.cancelled().await;
            return Ok(());
        }

        // Find our server
        let layout: &EnvironmentLayout = ctx.require_layout(&self.spec.kind)?;
        let server: &ClientInstance = match layout.first_with_role(SERVER_ROLE) {
            Some(server) => server,
            None         => { return Err(ComponentError::Dependency{ component: self.spec.kind.clone(), host: ctx.agent_id.clone(), reason: ErrorReason::DependencyNotFound, message: format!("The environment layout has no '{}' node", SERVER_ROLE) }); },
        };
        info!("'{}' acts as the client of '{}' ({})", me.name, server.name, server.ip_address);

        // Run against it, then tear it down whatever happened
        let target: ComponentSpec = ComponentSpec::new(NETWORK_SERVER, self.spec.parameters.clone());
        let client = peer_client(ctx, &self.spec.kind, &server.ip_address)?;
        let session: PeerSession = PeerSession::new(&self.spec.kind, &client, &target, state_id(&[ NETWORK_SERVER, me.name.as_str() ]));
        let res: Result<(), ComponentError> = self.run_client(ctx, &session, me, server, token).await;
        if let Err(err) = session.reset(ctx.timeouts.reset(), &CancellationToken::new()).await { warn!("Failed to tear down the server on '{}': {}", server.name, err); }
        res
    }
}



/// The server half of the [`NetworkWorkload`], started on a server node by the client through the API.
///
/// Parameters:
/// - `ServerCommand` (required), `ServerArguments`: The server tool. `{ServerIp}` and `{Port}` are substituted.
/// - `PackageName`: A package that must be installed; the server tool runs in (and may be found in) its directory.
/// - `Port`, `Protocol`: The inbound traffic to allow.
/// - `SuccessCodes`, `RetryPattern`, `Retries`: How to run the server tool. It runs until it is reset.
#[derive(Debug)]
pub struct NetworkServer {
    /// Our definition.
    spec    : ComponentSpec,
    /// The server process, once it is started.
    process : Mutex<Option<Arc<WorkloadProcess>>>,
}

impl NetworkServer {
    /// Constructor for the NetworkServer.
    #[inline]
    pub fn new(spec: ComponentSpec) -> Self { Self { spec, process: Mutex::new(None) } }

    /// Builds the process to run.
    fn build(&self, ctx: &ComponentContext) -> Result<ProcessSpec, ComponentError> {
        let kind: &str = &self.spec.kind;
        let params: &Parameters = &self.spec.parameters;

        // Resolve the package, if any
        let mut command: String = params.get_string("ServerCommand").map_err(|err| ctx.parameter_error(kind, err))?;
        let mut package: Option<PathBuf> = None;
        if params.raw("PackageName").is_some() {
            let name: String = params.get_string("PackageName").map_err(|err| ctx.parameter_error(kind, err))?;
            let dir: PathBuf = match ctx.packages.get_package(&name) {
                Some(dir) => dir,
                None      => { return Err(ComponentError::Dependency{ component: kind.into(), host: ctx.agent_id.clone(), reason: ErrorReason::DependencyNotFound, message: format!("Package '{}' is not installed", name) }); },
            };
            let local: PathBuf = dir.join(&command);
            if PathBuf::from(&command).is_relative() && local.is_file() { command = local.display().to_string(); }
            package = Some(dir);
        }

        // Substitute what we know about ourselves
        let own_ip: String = ctx.layout.as_ref().and_then(|layout| layout.client_instance(&ctx.agent_id)).map(|me| host_part(&me.ip_address)).unwrap_or_else(|| "0.0.0.0".into());
        let port: String = params.get_string_or("Port", "");
        let arguments: String = substitute(&params.get_string_or("ServerArguments", ""), &[ ("ServerIp", &own_ip), ("Port", &port) ]);

        // The server runs until it is reset, and being killed for that is fine
        let mut spec: ProcessSpec = process_spec(ctx, kind, params, command, arguments)?.with_accept_killed(true);
        spec.timeout = None;
        if let Some(dir) = package { spec = spec.with_working_dir(dir); }
        Ok(spec)
    }
}

#[async_trait]
impl Component for NetworkServer {
    #[inline]
    fn spec(&self) -> &ComponentSpec { &self.spec }

    async fn execute(&self, ctx: &ComponentContext, token: &CancellationToken) -> Result<(), ComponentError> {
        let spec: ProcessSpec = self.build(ctx)?;

        // Let the client in
        let ports: Vec<u16> = self.spec.parameters.get_int("Port").ok().and_then(|port| u16::try_from(port).ok()).into_iter().collect();
        ctx.firewall.enable_inbound(&FirewallEntry{ name: format!("Virtual Client {}", self.spec.kind), protocol: self.spec.parameters.get_string_or("Protocol", "tcp"), ports });

        // Run the server until it exits or we are reset
        let process: Arc<WorkloadProcess> = Arc::new(WorkloadProcess::new(spec));
        *self.process.lock() = Some(process.clone());
        match process.run(token).await {
            Ok(ProcessOutput{ outcome: ProcessOutcome::Cancelled, .. }) => { info!("Server '{}' stopped", process.spec()); Ok(()) },
            Ok(_)    => Ok(()),
            Err(err) => Err(ComponentError::Process{ component: self.spec.kind.clone(), host: ctx.agent_id.clone(), err }),
        }
    }

    fn is_running(&self) -> bool {
        self.process.lock().as_ref().map(|process| process.is_running()).unwrap_or(false)
    }
}
