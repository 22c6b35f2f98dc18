//  RUN.rs
//    by Lut99
//
//  Created:
//    18 Oct 2026, 11:04:51
//  Last edited:
//    19 Oct 2026, 10:02:36
//  Auto updated?
//    Yes
//
//  Description:
//!   Implements the `run` and `api` subcommands: wires the node
//!   together, hosts the local API and runs profiles.
//

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, error, info, warn};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use vc_api::server::serve;
use vc_api::spec::Context;
use vc_api::store::StateStore;
use vc_cfg::layout::EnvironmentLayout;
use vc_cfg::node::NodeConfig;
use vc_tsk::component::{Component, ComponentRegistry};
use vc_tsk::errors::ComponentError;
use vc_tsk::executors::default_registry;
use vc_tsk::host::ComponentHost;
use vc_tsk::spec::ComponentContext;

pub use crate::errors::RunError as Error;
use crate::profile::Profile;


/***** TESTS *****/
#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use parking_lot::Mutex;

    use specifications::common::Parameters;
    use specifications::reason::ErrorReason;
    use vc_api::client::ApiClient;
    use vc_cfg::node::TimeoutsConfig;
    use vc_tsk::spec::ComponentSpec;

    use super::*;

    /// Remembers the order in which instances ran. Fails if its `Fail` parameter is set.
    struct Recorder {
        spec  : ComponentSpec,
        order : Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl Component for Recorder {
        fn spec(&self) -> &ComponentSpec { &self.spec }

        async fn execute(&self, ctx: &ComponentContext, _token: &CancellationToken) -> Result<(), ComponentError> {
            self.order.lock().push(self.spec.parameters.get("Name").map(|name| name.to_string()).unwrap_or_default());
            if self.spec.parameters.contains_key("Fail") {
                return Err(ComponentError::Workload{ component: self.spec.kind.clone(), host: ctx.agent_id.clone(), reason: ErrorReason::WorkloadFailed, message: "asked to fail".into() });
            }
            Ok(())
        }
    }

    fn recorder_context(order: Arc<Mutex<Vec<String>>>) -> ComponentContext {
        let mut registry: ComponentRegistry = default_registry();
        registry.register("Recorder", move |spec| Box::new(Recorder{ spec, order: order.clone() }));
        ComponentContext::new("node-a", None, TimeoutsConfig::default(), 0, std::env::temp_dir(), registry)
    }

    fn recorder(name: &str, fail: bool) -> ComponentSpec {
        let mut params: Parameters = Parameters::new();
        params.insert("Name".into(), name.into());
        if fail { params.insert("Fail".into(), true.into()); }
        ComponentSpec::new("Recorder", params)
    }

    #[test]
    fn agent_id_precedence() {
        let mut config: NodeConfig = NodeConfig::default();
        config.agent_id = Some("from-config".into());
        assert_eq!(resolve_agent_id(Some("from-cli".into()), &config).unwrap(), "from-cli");
        assert_eq!(resolve_agent_id(None, &config).unwrap(), "from-config");
        assert_eq!(resolve_agent_id(Some("  node-b\n".into()), &config).unwrap(), "node-b");
        assert_eq!(resolve_agent_id(Some("   ".into()), &config).unwrap(), "from-config");
    }

    #[tokio::test]
    async fn profile_runs_in_order() {
        let order: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(vec![]));
        let ctx: ComponentContext = recorder_context(order.clone());
        let profile: Profile = Profile{ description: None, actions: vec![ recorder("first", false), recorder("second", false), recorder("third", false) ] };

        run_profile(&ctx, &profile, &CancellationToken::new()).await.unwrap();
        assert_eq!(*order.lock(), vec![ "first", "second", "third" ]);
    }

    #[tokio::test]
    async fn profile_stops_at_first_failure() {
        let order: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(vec![]));
        let ctx: ComponentContext = recorder_context(order.clone());
        let profile: Profile = Profile{ description: None, actions: vec![ recorder("first", false), recorder("second", true), recorder("third", false) ] };

        match run_profile(&ctx, &profile, &CancellationToken::new()).await {
            Err(Error::ActionError{ index, kind, err }) => {
                assert_eq!(index, 1);
                assert_eq!(kind, "Recorder");
                assert_eq!(err.reason(), Some(ErrorReason::WorkloadFailed));
            },
            res => panic!("Expected an action error, got {:?}", res),
        }
        assert_eq!(*order.lock(), vec![ "first", "second" ]);
    }

    #[tokio::test]
    async fn profile_rejects_unknown_before_running() {
        let order: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(vec![]));
        let ctx: ComponentContext = recorder_context(order.clone());
        let profile: Profile = Profile{ description: None, actions: vec![ recorder("first", false), ComponentSpec::new("Bogus", Parameters::new()) ] };

        assert!(matches!(run_profile(&ctx, &profile, &CancellationToken::new()).await, Err(Error::ProfileError{ .. })));
        assert!(order.lock().is_empty());
    }

    #[tokio::test]
    async fn profile_cancelled() {
        let order: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(vec![]));
        let ctx: ComponentContext = recorder_context(order.clone());
        let profile: Profile = Profile{ description: None, actions: vec![ recorder("first", false) ] };

        let token: CancellationToken = CancellationToken::new();
        token.cancel();
        run_profile(&ctx, &profile, &token).await.unwrap();
        assert!(order.lock().is_empty());
    }

    #[tokio::test]
    async fn hosted_node_is_online() {
        let token: CancellationToken = CancellationToken::new();
        let ctx: Arc<ComponentContext> = Arc::new(ComponentContext::new("node-a", None, TimeoutsConfig::default(), 0, std::env::temp_dir(), default_registry()));
        let (address, handle) = host(ctx, Arc::new(StateStore::new()), ([ 127, 0, 0, 1 ], 0).into(), &token).unwrap();

        let client: ApiClient = ApiClient::new("127.0.0.1", address.port()).unwrap();
        client.poll_for_server_online(Duration::from_secs(5), &token).await.unwrap();

        token.cancel();
        tokio::time::timeout(Duration::from_secs(5), handle).await.unwrap().unwrap();
    }

    #[test]
    fn context_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let layout: PathBuf = dir.path().join("layout.json");
        std::fs::write(&layout, r#"{ "clients": [ { "name": "node-a", "role": "Client", "ipAddress": "10.0.0.1" } ] }"#).unwrap();

        let opts: NodeOptions = NodeOptions{ node_config: dir.path().join("node.yml"), layout: Some(layout), agent_id: Some("node-a".into()) };
        let (config, ctx) = load_context(&opts, default_registry()).unwrap();
        assert_eq!(config, NodeConfig::default());
        assert_eq!(ctx.agent_id, "node-a");
        assert!(ctx.layout.as_ref().unwrap().client_instance("node-a").is_some());

        let opts: NodeOptions = NodeOptions{ node_config: dir.path().join("node.yml"), layout: Some(dir.path().join("missing.json")), agent_id: Some("node-a".into()) };
        assert!(matches!(load_context(&opts, default_registry()), Err(Error::LayoutError{ .. })));
    }
}





/***** HELPER FUNCTIONS *****/
/// Returns the name of this node: the one given on the command line, then the one in the node config, then the hostname.
///
/// # Errors
/// This function errors if none of these sources gives a (non-empty) name.
fn resolve_agent_id(given: Option<String>, config: &NodeConfig) -> Result<String, Error> {
    let candidates = given.into_iter()
        .chain(config.agent_id.clone())
        .chain(std::env::var("HOSTNAME").ok())
        .chain(std::fs::read_to_string("/etc/hostname").ok());
    for candidate in candidates {
        let candidate: &str = candidate.trim();
        if !candidate.is_empty() { return Ok(candidate.into()); }
    }
    Err(Error::AgentIdUnknown)
}

/// Opens the state store: in-memory, or backed by the state directory if the node config names one.
async fn open_store(config: &NodeConfig) -> Result<StateStore, Error> {
    match &config.api.state_dir {
        Some(dir) => StateStore::with_dir(dir).await.map_err(|err| Error::StoreError{ path: dir.clone(), err }),
        None      => Ok(StateStore::new()),
    }
}

/// Cancels the given token when the user hits Ctrl-C.
fn cancel_on_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        tokio::select! {
            res = tokio::signal::ctrl_c() => match res {
                Ok(_)    => { warn!("Received Ctrl-C; cancelling..."); token.cancel(); },
                Err(err) => { error!("{}", Error::SignalError{ err }); },
            },
            _ = token.cancelled() => {},
        }
    });
}





/***** LIBRARY *****/
/// The options that define a node, as given on the command line.
#[derive(Clone, Debug)]
pub struct NodeOptions {
    /// The path to the `node.yml` file. Defaults are used if it does not exist.
    pub node_config : PathBuf,
    /// The path to the environment layout, if this is a multi-node run.
    pub layout      : Option<PathBuf>,
    /// Overrides the name of this node.
    pub agent_id    : Option<String>,
}



/// Loads the node config and layout, and builds the context that components run in.
///
/// # Arguments
/// - `opts`: The options that say where to find everything.
/// - `registry`: The registry with all components this node knows.
///
/// # Returns
/// The loaded node config and the new context.
///
/// # Errors
/// This function errors if the node config or layout could not be loaded, or if we do not know our own name.
pub fn load_context(opts: &NodeOptions, registry: ComponentRegistry) -> Result<(NodeConfig, ComponentContext), Error> {
    let config: NodeConfig = NodeConfig::from_path_or_default(&opts.node_config).map_err(|err| Error::NodeConfigError{ path: opts.node_config.clone(), err })?;
    let layout: Option<EnvironmentLayout> = match &opts.layout {
        Some(path) => Some(EnvironmentLayout::from_path(path).map_err(|err| Error::LayoutError{ path: path.clone(), err })?),
        None       => None,
    };
    let agent_id: String = resolve_agent_id(opts.agent_id.clone(), &config)?;
    debug!("Agent ID: '{}'", agent_id);

    let ctx: ComponentContext = ComponentContext::new(agent_id, layout, config.timeouts.clone(), config.api.port, config.paths.packages.clone(), registry);
    Ok((config, ctx))
}

/// Serves the local API with a [`ComponentHost`] attached, so that other nodes can run components here.
///
/// # Arguments
/// - `ctx`: The context for the components started by other nodes.
/// - `store`: The state store to serve.
/// - `address`: The address to serve on.
/// - `token`: Stops the API and all hosted workloads when cancelled.
///
/// # Returns
/// The address the API is bound to, and a handle to the server task.
///
/// # Errors
/// This function errors if we failed to bind the address.
pub fn host(ctx: Arc<ComponentContext>, store: Arc<StateStore>, address: SocketAddr, token: &CancellationToken) -> Result<(SocketAddr, JoinHandle<()>), Error> {
    let context: Arc<Context> = Arc::new(Context::new(store.clone()));
    context.register_handler(Arc::new(ComponentHost::new(ctx, store, token)));
    serve(context, address, token.clone()).map_err(|err| Error::ServeError{ err })
}

/// Runs the actions of the given profile one after the other.
///
/// Every component type is checked against the registry before anything runs. Execution stops at the first failure or when the token is cancelled.
///
/// # Errors
/// This function errors if the profile is invalid or if one of the actions fails.
pub async fn run_profile(ctx: &ComponentContext, profile: &Profile, token: &CancellationToken) -> Result<(), Error> {
    profile.validate(&ctx.registry).map_err(|err| Error::ProfileError{ err })?;
    if let Some(description) = &profile.description { info!("Running profile: {}", description); }

    for (i, action) in profile.actions.iter().enumerate() {
        if token.is_cancelled() {
            warn!("Cancelled; skipping the remaining {} action(s)", profile.actions.len() - i);
            break;
        }

        info!("Running action {}/{} ('{}')", i + 1, profile.actions.len(), action.kind);
        let component: Box<dyn Component> = ctx.registry.create(action.clone(), &ctx.agent_id).map_err(|err| Error::ActionError{ index: i, kind: action.kind.clone(), err })?;
        match component.execute(ctx, token).await {
            Ok(_) => { info!("Action {} ('{}') completed", i + 1, action.kind); },
            Err(ComponentError::Cancelled{ .. }) => { warn!("Action {} ('{}') was cancelled", i + 1, action.kind); },
            Err(err) => {
                error!("Action {} ('{}') failed: {}", i + 1, action.kind, err);
                return Err(Error::ActionError{ index: i, kind: action.kind.clone(), err });
            },
        }
    }
    Ok(())
}



/// Entrypoint for the `run` subcommand: hosts the API and runs the given profile.
///
/// # Arguments
/// - `opts`: Where to find the node config and layout, and our name.
/// - `profile`: The path to the profile to run.
///
/// # Errors
/// This function errors if the node could not be set up or if the profile failed.
pub async fn run(opts: NodeOptions, profile: impl AsRef<Path>) -> Result<(), Error> {
    let profile: Profile = Profile::from_path(profile).map_err(|err| Error::ProfileError{ err })?;
    let (config, ctx) = load_context(&opts, default_registry())?;
    let ctx: Arc<ComponentContext> = Arc::new(ctx);
    let store: Arc<StateStore> = Arc::new(open_store(&config).await?);

    let token: CancellationToken = CancellationToken::new();
    let (_, server) = host(ctx.clone(), store, ([ 0, 0, 0, 0 ], config.api.port).into(), &token)?;
    cancel_on_ctrl_c(token.clone());

    let res: Result<(), Error> = run_profile(&ctx, &profile, &token).await;

    // Shut the API down (and wait for it)
    token.cancel();
    if let Err(err) = server.await { error!("API server task failed: {}", err); }
    res
}

/// Entrypoint for the `api` subcommand: only hosts the API (with the component host) until Ctrl-C.
///
/// # Errors
/// This function errors if the node could not be set up.
pub async fn api(opts: NodeOptions) -> Result<(), Error> {
    let (config, ctx) = load_context(&opts, default_registry())?;
    let store: Arc<StateStore> = Arc::new(open_store(&config).await?);

    let token: CancellationToken = CancellationToken::new();
    let (address, server) = host(Arc::new(ctx), store, ([ 0, 0, 0, 0 ], config.api.port).into(), &token)?;
    cancel_on_ctrl_c(token.clone());
    info!("Hosting components on '{}'; press Ctrl-C to stop", address);

    if let Err(err) = server.await { error!("API server task failed: {}", err); }
    Ok(())
}
