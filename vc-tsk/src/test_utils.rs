//  TEST UTILS.rs
//    by Lut99
//
//  Created:
//    10 Oct 2026, 16:40:03
//  Last edited:
//    17 Oct 2026, 15:11:26
//  Auto updated?
//    Yes
//
//  Description:
//!   Shared scaffolding for the tests of this crate: a scriptable
//!   component, an in-memory metrics sink and in-process nodes that
//!   serve the API on a loopback port.
//

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use specifications::common::Parameters;
use specifications::metrics::Metric;
use specifications::reason::ErrorReason;
use specifications::state::{ClientServerStatus, State};
use vc_api::server::serve;
use vc_api::spec::Context;
use vc_api::store::StateStore;
use vc_cfg::layout::EnvironmentLayout;
use vc_cfg::node::{TimeoutsConfig, DEFAULT_API_PORT};

use crate::component::{Component, ComponentRegistry};
use crate::errors::ComponentError;
use crate::executors::register_defaults;
use crate::host::ComponentHost;
use crate::results::MetricsSink;
use crate::spec::{ComponentContext, ComponentSpec};


/***** LIBRARY *****/
/// Protocol timeouts that keep tests fast.
pub fn test_timeouts() -> TimeoutsConfig {
    TimeoutsConfig {
        heartbeat          : 5,
        reset              : 5,
        completion         : 10,
        start_confirmation : 1,
        poll_interval_ms   : 10,
    }
}

/// Returns a context for node `node-a` with fast timeouts and a short retry backoff.
pub fn local_context(registry: ComponentRegistry, layout: Option<EnvironmentLayout>) -> ComponentContext {
    let mut ctx: ComponentContext = ComponentContext::new("node-a", layout, test_timeouts(), DEFAULT_API_PORT, std::env::temp_dir(), registry);
    ctx.retry_backoff = Duration::from_millis(10);
    ctx
}

/// Returns a registry with the default executors plus the given scripted component.
pub fn registry_with(scripted: Scripted) -> ComponentRegistry {
    let mut registry: ComponentRegistry = ComponentRegistry::new();
    register_defaults(&mut registry);
    let kind: String = scripted.spec.kind.clone();
    registry.register(kind, move |spec| Box::new(scripted.instance(spec)));
    registry
}

/// Waits (up to ten seconds) until the state with the given ID has the given status.
pub async fn wait_for_status(store: &StateStore, id: &str, status: ClientServerStatus) -> State {
    let res = tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            if let Ok(Some(item)) = store.get_as::<State>(id) {
                if item.definition.status() == Some(status) { return item.definition; }
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }).await;
    match res {
        Ok(state) => state,
        Err(_)    => panic!("State '{}' did not reach status '{}' (last: {:?})", id, status, store.get(id)),
    }
}



/// A component whose behaviour is set by the test. All instances created from the same template share their counters.
#[derive(Clone, Debug)]
pub struct Scripted {
    /// The definition of this instance.
    spec         : ComponentSpec,
    /// How long it runs (unless cancelled).
    duration     : Duration,
    /// The reason it fails with, if any.
    failure      : Option<ErrorReason>,
    /// Whether it fails without a reason.
    unclassified : bool,
    /// Whether it ever reports that it is running.
    running      : bool,
    /// How often it was executed.
    attempts     : Arc<AtomicUsize>,
    /// The parameters of every execution.
    received     : Arc<Mutex<Vec<Parameters>>>,
}

impl Scripted {
    /// Creates a template for a component with the given type name that succeeds immediately.
    pub fn new(kind: &str) -> Self {
        Self {
            spec         : ComponentSpec::new(kind, Parameters::new()),
            duration     : Duration::ZERO,
            failure      : None,
            unclassified : false,
            running      : true,
            attempts     : Arc::new(AtomicUsize::new(0)),
            received     : Arc::new(Mutex::new(vec![])),
        }
    }

    /// Makes it run for the given time.
    pub fn runs_for(mut self, duration: Duration) -> Self { self.duration = duration; self }

    /// Makes it fail with the given reason.
    pub fn fails_with(mut self, reason: ErrorReason) -> Self { self.failure = Some(reason); self }

    /// Makes it fail without a reason.
    pub fn fails_unclassified(mut self) -> Self { self.unclassified = true; self }

    /// Makes it never report that it is running.
    pub fn never_running(mut self) -> Self { self.running = false; self }

    /// Creates an instance with the given definition from this template.
    fn instance(&self, spec: ComponentSpec) -> Self { Self { spec, ..self.clone() } }

    /// Returns how often any instance was executed.
    pub fn attempts(&self) -> usize { self.attempts.load(Ordering::SeqCst) }

    /// Returns the parameters of every execution so far.
    pub fn received(&self) -> Vec<Parameters> { self.received.lock().clone() }
}

#[async_trait]
impl Component for Scripted {
    fn spec(&self) -> &ComponentSpec { &self.spec }

    async fn execute(&self, ctx: &ComponentContext, token: &CancellationToken) -> Result<(), ComponentError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        self.received.lock().push(self.spec.parameters.clone());
        tokio::select! {
            _ = tokio::time::sleep(self.duration) => {},
            _ = token.cancelled()                 => { return Err(ComponentError::Cancelled{ component: self.spec.kind.clone(), host: ctx.agent_id.clone() }); },
        }
        if let Some(reason) = self.failure {
            return Err(ComponentError::Workload{ component: self.spec.kind.clone(), host: ctx.agent_id.clone(), reason, message: "scripted failure".into() });
        }
        if self.unclassified {
            return Err(ComponentError::Internal{ component: self.spec.kind.clone(), host: ctx.agent_id.clone(), message: "scripted failure".into() });
        }
        Ok(())
    }

    fn is_running(&self) -> bool { self.running }
}



/// A MetricsSink that remembers everything.
#[derive(Debug, Default)]
pub struct MemorySink {
    /// The metrics received so far.
    metrics  : Mutex<Vec<Metric>>,
    /// The messages received so far.
    messages : Mutex<Vec<String>>,
}

impl MemorySink {
    /// Returns the metrics received so far.
    pub fn metrics(&self) -> Vec<Metric> { self.metrics.lock().clone() }

    /// Returns the messages received so far.
    pub fn messages(&self) -> Vec<String> { self.messages.lock().clone() }
}

impl MetricsSink for MemorySink {
    fn log_metrics(&self, _component: &str, _metadata: &Parameters, metrics: &[Metric]) {
        self.metrics.lock().extend(metrics.iter().cloned());
    }

    fn log_message(&self, _component: &str, message: &str) {
        self.messages.lock().push(message.into());
    }
}



/// A node running in this process: an API on a loopback port with a component host attached.
pub struct TestNode {
    /// The address the API is bound to.
    pub address : SocketAddr,
    /// The state store of the node.
    pub store   : Arc<StateStore>,
    /// Shuts the node down when cancelled.
    pub token   : CancellationToken,
}

impl TestNode {
    /// Returns the state with the given ID, if any.
    pub fn state(&self, id: &str) -> Option<State> {
        self.store.get_as::<State>(id).ok().flatten().map(|item| item.definition)
    }
}

impl Drop for TestNode {
    fn drop(&mut self) { self.token.cancel(); }
}

/// Spawns a node with the given name and registry.
pub async fn spawn_node(name: &str, registry: ComponentRegistry, layout: Option<EnvironmentLayout>) -> TestNode {
    let token: CancellationToken = CancellationToken::new();
    let store: Arc<StateStore> = Arc::new(StateStore::new());
    let context: Arc<Context> = Arc::new(Context::new(store.clone()));

    let mut ctx: ComponentContext = local_context(registry, layout);
    ctx.agent_id = name.into();
    context.register_handler(Arc::new(ComponentHost::new(Arc::new(ctx), store.clone(), &token)));

    let (address, _) = serve(context, ([ 127, 0, 0, 1 ], 0).into(), token.clone()).unwrap();
    TestNode { address, store, token }
}
