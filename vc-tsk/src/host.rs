//  HOST.rs
//    by Lut99
//
//  Created:
//    09 Oct 2026, 09:48:02
//  Last edited:
//    20 Oct 2026, 11:40:27
//  Auto updated?
//    Yes
//
//  Description:
//!   Implements the component host: the instructions handler that runs
//!   components in the background on request of other nodes, and keeps
//!   their state up-to-date in the local state store.
//

use std::convert::Infallible;
use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, error, info, warn};
use tokio::sync::Mutex as AsyncMutex;
use tokio_util::sync::CancellationToken;

use specifications::instructions::{Instructions, InstructionsType};
use specifications::item::Item;
use specifications::reason::ErrorReason;
use specifications::state::{ClientServerStatus, State};
use vc_api::errors::StoreError;
use vc_api::spec::{InstructionsError, InstructionsHandler};
use vc_api::store::StateStore;
use vc_shr::poll::{poll_until, Error as PollError};

use crate::component::Component;
use crate::errors::ComponentError;
use crate::spec::{ComponentContext, ComponentSpec};
use crate::supervisor::WorkloadSupervisor;


/***** TESTS *****/
#[cfg(test)]
mod tests {
    use std::time::Duration;

    use specifications::common::Parameters;

    use super::*;
    use crate::test_utils::{local_context, registry_with, wait_for_status, Scripted};

    fn host_for(scripted: Scripted) -> (ComponentHost, Arc<StateStore>, CancellationToken) {
        let token: CancellationToken = CancellationToken::new();
        let store: Arc<StateStore> = Arc::new(StateStore::new());
        let ctx: ComponentContext = local_context(registry_with(scripted), None);
        (ComponentHost::new(Arc::new(ctx), store.clone(), &token), store, token)
    }

    fn instructions(kind: InstructionsType, component: &str) -> Item<Instructions> {
        Item::new("X-0", Instructions::for_component(kind, component, &Parameters::new()))
    }

    #[tokio::test]
    async fn host_runs_to_completion() {
        let (host, store, _token) = host_for(Scripted::new("X").runs_for(Duration::from_millis(200)));
        host.handle(&instructions(InstructionsType::ClientServerStartExecution, "X")).await.unwrap();
        wait_for_status(&store, "X-0", ClientServerStatus::ExecutionStarted).await;
        wait_for_status(&store, "X-0", ClientServerStatus::ExecutionCompleted).await;

        host.handle(&instructions(InstructionsType::ClientServerReset, "X")).await.unwrap();
        assert!(store.get("X-0").is_none());
    }

    #[tokio::test]
    async fn host_records_failures() {
        let (host, store, _token) = host_for(Scripted::new("X").fails_with(ErrorReason::WorkloadResultsNotFound));
        host.handle(&instructions(InstructionsType::ClientServerStartExecution, "X")).await.unwrap();
        let state: State = wait_for_status(&store, "X-0", ClientServerStatus::Failed).await;
        assert_eq!(state.error_reason(), Some(ErrorReason::WorkloadResultsNotFound.code()));
        assert!(state.error_message().is_some());
    }

    #[tokio::test]
    async fn host_rejects_unknown_components() {
        let (host, store, _token) = host_for(Scripted::new("X"));
        assert!(matches!(host.handle(&instructions(InstructionsType::ClientServerStartExecution, "Y")).await, Err(InstructionsError::Unsupported{ .. })));
        assert!(matches!(host.handle(&instructions(InstructionsType::Other("Restart".into()), "X")).await, Err(InstructionsError::Unsupported{ .. })));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn host_reset_stops_workload() {
        let (host, store, _token) = host_for(Scripted::new("X").runs_for(Duration::from_secs(60)));
        host.handle(&instructions(InstructionsType::ClientServerStartExecution, "X")).await.unwrap();
        wait_for_status(&store, "X-0", ClientServerStatus::ExecutionStarted).await;

        // The reset returns only once the workload is gone, and it never writes its state afterwards
        host.handle(&instructions(InstructionsType::ClientServerReset, "X")).await.unwrap();
        assert!(store.get("X-0").is_none());
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(store.get("X-0").is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn host_concurrent_start_and_reset() {
        let (host, store, _token) = host_for(Scripted::new("X").runs_for(Duration::from_millis(50)));
        for _ in 0..100 {
            let (starter, resetter): (ComponentHost, ComponentHost) = (host.clone(), host.clone());
            let start = tokio::spawn(async move { starter.handle(&instructions(InstructionsType::ClientServerStartExecution, "X")).await });
            let reset = tokio::spawn(async move { resetter.handle(&instructions(InstructionsType::ClientServerReset, "X")).await });
            start.await.unwrap().unwrap();
            reset.await.unwrap().unwrap();

            // Whichever came last wins; a reset that came last must not be undone by the workload
            if store.get("X-0").is_none() {
                tokio::time::sleep(Duration::from_millis(80)).await;
                assert!(store.get("X-0").is_none(), "A reset state came back: {:?}", store.get("X-0"));
            }
            host.handle(&instructions(InstructionsType::ClientServerReset, "X")).await.unwrap();
        }
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn host_never_recreates_states() {
        let (host, store, _token) = host_for(Scripted::new("X").runs_for(Duration::from_millis(50)));
        host.handle(&instructions(InstructionsType::ClientServerStartExecution, "X")).await.unwrap();
        wait_for_status(&store, "X-0", ClientServerStatus::ExecutionStarted).await;

        // Someone deletes the state behind the host's back
        store.delete("X-0").await.unwrap();
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(store.get("X-0").is_none());
    }
}





/***** HELPER FUNCTIONS *****/
/// Writes the given status to the state with the given ID, keeping any other properties.
///
/// A state that is gone (i.e., reset) stays gone.
async fn write_status(store: &StateStore, id: &str, update: impl FnOnce(&mut State)) -> Result<(), StoreError> {
    if !store.modify(id, update).await? { debug!("State '{}' is gone; not updating it", id); }
    Ok(())
}

/// Runs a component in the background: confirms it started, then records how it ended.
///
/// # Arguments
/// - `ctx`: The context to run the component in.
/// - `store`: The store to report the state to.
/// - `component`: The component to run.
/// - `id`: The ID of the state to report to.
/// - `token`: The workload's own token.
async fn run_in_background(ctx: Arc<ComponentContext>, store: Arc<StateStore>, component: Arc<dyn Component>, id: String, token: CancellationToken) {
    let name: String = component.type_name().to_string();
    let execution = component.execute(&ctx, &token);
    tokio::pin!(execution);

    // Wait until the workload is confirmed to be running, or until it finished already
    let running: &dyn Component = component.as_ref();
    let confirmation = poll_until(format!("'{}' to start running", name), ctx.timeouts.start_confirmation(), ctx.timeouts.poll_interval(), &token, move || async move {
        Ok::<Option<()>, Infallible>(if running.is_running() { Some(()) } else { None })
    });
    let mut finished: Option<Result<(), ComponentError>> = None;
    tokio::select! {
        res = &mut execution => { finished = Some(res); },
        res = confirmation   => match res {
            Ok(_) => {
                // Only mark it as started if nobody reset it in the meantime
                if !token.is_cancelled() {
                    if let Err(err) = write_status(&store, &id, |state| state.set_status(ClientServerStatus::ExecutionStarted)).await { error!("Failed to mark '{}' as started: {}", id, err); }
                    info!("'{}' ({}) is running", name, id);
                }
            },
            Err(PollError::Timeout{ timeout, .. }) => { warn!("'{}' ({}) did not report that it is running within {:.1}s", name, id, timeout.as_secs_f64()); },
            Err(PollError::Cancelled{ .. })        => {},
        },
    }
    let res: Result<(), ComponentError> = match finished {
        Some(res) => res,
        None      => execution.await,
    };

    // Record how it ended, unless we were reset
    if token.is_cancelled() {
        debug!("'{}' ({}) was stopped", name, id);
        return;
    }
    let written: Result<(), StoreError> = match res {
        Ok(_) => {
            info!("'{}' ({}) completed", name, id);
            write_status(&store, &id, |state| state.set_status(ClientServerStatus::ExecutionCompleted)).await
        },
        Err(err) => {
            error!("{}", err);
            let reason: ErrorReason = err.reason().unwrap_or(ErrorReason::WorkloadUnexpectedAnomaly);
            write_status(&store, &id, |state| state.set_failed(reason, err.to_string())).await
        },
    };
    if let Err(err) = written { error!("Failed to record the outcome of '{}': {}", id, err); }
    token.cancel();
}





/***** LIBRARY *****/
/// Runs components in the background on request of other nodes.
///
/// Every component gets its own state in the store, under the ID of the instructions that started it.
#[derive(Clone)]
pub struct ComponentHost {
    /// The context to run components in.
    ctx        : Arc<ComponentContext>,
    /// The store to report states to.
    store      : Arc<StateStore>,
    /// Owns the running components.
    supervisor : WorkloadSupervisor,
    /// Held for the whole of a reset or start, so that their steps never interleave.
    gate       : Arc<AsyncMutex<()>>,
}

impl ComponentHost {
    /// Constructor for the ComponentHost.
    ///
    /// # Arguments
    /// - `ctx`: The context to run components in.
    /// - `store`: The store to report states to. This should be the same store the API serves.
    /// - `token`: A token that stops all components when cancelled.
    ///
    /// # Returns
    /// A new ComponentHost with its own supervisor.
    pub fn new(ctx: Arc<ComponentContext>, store: Arc<StateStore>, token: &CancellationToken) -> Self {
        Self {
            ctx,
            store,
            supervisor : WorkloadSupervisor::spawn(token),
            gate       : Arc::new(AsyncMutex::new(())),
        }
    }

    /// Wraps any error into an instructions error.
    #[inline]
    fn failed(err: impl 'static + Send + Sync + std::error::Error) -> InstructionsError { InstructionsError::Failed{ err: Box::new(err) } }



    /// Stops the component with the given ID (if it runs) and deletes its state.
    ///
    /// Must be called with the gate held.
    async fn reset(&self, id: &str) -> Result<(), InstructionsError> {
        self.supervisor.stop(id).await.map_err(Self::failed)?;
        self.store.delete(id).await.map_err(Self::failed)?;
        debug!("Reset '{}'", id);
        Ok(())
    }

    /// Resets the component from the given instructions, then starts it anew in the background.
    ///
    /// Must be called with the gate held.
    async fn start(&self, instructions: &Item<Instructions>) -> Result<(), InstructionsError> {
        // Find out what to run
        let kind: String = match instructions.definition.component_type() {
            Some(kind) => kind,
            None       => { return Err(InstructionsError::Unsupported{ what: format!("instructions '{}' do not name a component", instructions.id) }); },
        };
        let spec: ComponentSpec = ComponentSpec::new(kind, instructions.definition.component_parameters());
        let component: Arc<dyn Component> = match self.ctx.registry.create(spec, &self.ctx.agent_id) {
            Ok(component) => Arc::from(component),
            Err(err)      => { return Err(InstructionsError::Unsupported{ what: err.to_string() }); },
        };

        // Start from a clean slate
        let id: String = instructions.id.clone();
        self.reset(&id).await?;
        self.store.upsert(&Item::new(id.clone(), State::with_status(ClientServerStatus::Ready))).await.map_err(Self::failed)?;

        // Launch it
        info!("Starting '{}' ({}) in the background", component.type_name(), id);
        let ctx: Arc<ComponentContext> = self.ctx.clone();
        let store: Arc<StateStore> = self.store.clone();
        let task_id: String = id.clone();
        self.supervisor.start(id, move |token: CancellationToken| run_in_background(ctx, store, component, task_id, token)).await.map_err(Self::failed)
    }
}

#[async_trait]
impl InstructionsHandler for ComponentHost {
    async fn handle(&self, instructions: &Item<Instructions>) -> Result<(), InstructionsError> {
        debug!("Handling '{}' instructions '{}'", instructions.definition.kind, instructions.id);
        let _gate = self.gate.lock().await;
        match &instructions.definition.kind {
            InstructionsType::ClientServerReset          => self.reset(&instructions.id).await,
            InstructionsType::ClientServerStartExecution => self.start(instructions).await,
            InstructionsType::Other(kind)                => Err(InstructionsError::Unsupported{ what: format!("instructions of type '{}'", kind) }),
        }
    }
}
