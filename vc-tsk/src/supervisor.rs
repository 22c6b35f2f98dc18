//  SUPERVISOR.rs
//    by Lut99
//
//  Created:
//    08 Oct 2026, 15:02:19
//  Last edited:
//    16 Oct 2026, 13:27:45
//  Auto updated?
//    Yes
//
//  Description:
//!   Implements the supervisor that owns the workloads a node runs in the
//!   background on behalf of other nodes. All starts and stops go through
//!   a single task, so they never race each other.
//

use std::collections::HashMap;
use std::future::Future;

use futures::future::BoxFuture;
use log::{debug, error, info};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub use crate::errors::SupervisorError as Error;


/***** TESTS *****/
#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;

    /// Spawns a workload that counts how often it was stopped.
    async fn start_counting(supervisor: &WorkloadSupervisor, id: &str, stopped: &Arc<AtomicUsize>) {
        let stopped: Arc<AtomicUsize> = stopped.clone();
        supervisor.start(id, move |token: CancellationToken| async move {
            token.cancelled().await;
            stopped.fetch_add(1, Ordering::SeqCst);
        }).await.unwrap();
    }

    #[tokio::test]
    async fn supervisor_start_stop() {
        let token: CancellationToken = CancellationToken::new();
        let supervisor: WorkloadSupervisor = WorkloadSupervisor::spawn(&token);
        let stopped: Arc<AtomicUsize> = Arc::new(AtomicUsize::new(0));

        start_counting(&supervisor, "a", &stopped).await;
        assert!(supervisor.stop("a").await.unwrap());
        assert_eq!(stopped.load(Ordering::SeqCst), 1);

        // Stopping twice is fine
        assert!(!supervisor.stop("a").await.unwrap());
        assert_eq!(stopped.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn supervisor_replaces_workload() {
        let token: CancellationToken = CancellationToken::new();
        let supervisor: WorkloadSupervisor = WorkloadSupervisor::spawn(&token);
        let stopped: Arc<AtomicUsize> = Arc::new(AtomicUsize::new(0));

        start_counting(&supervisor, "a", &stopped).await;
        start_counting(&supervisor, "a", &stopped).await;
        assert_eq!(stopped.load(Ordering::SeqCst), 1);

        // Shutting down stops the rest
        token.cancel();
        tokio::time::timeout(Duration::from_secs(5), async { while stopped.load(Ordering::SeqCst) < 2 { tokio::time::sleep(Duration::from_millis(10)).await; } }).await.unwrap();
        assert!(matches!(supervisor.stop("a").await, Err(Error::Stopped)));
    }
}





/***** HELPERS *****/
/// The tasks that the supervisor can launch.
type Launcher = Box<dyn FnOnce(CancellationToken) -> BoxFuture<'static, ()> + Send>;

/// The requests that the supervisor handles.
enum Request {
    /// Stop any workload with the same ID, then launch a new one.
    Start{ id: String, launch: Launcher, reply: oneshot::Sender<()> },
    /// Stop the workload with the given ID. Replies whether there was one.
    Stop{ id: String, reply: oneshot::Sender<bool> },
}





/***** LIBRARY *****/
/// A workload running in the background, with its own cancellation token.
#[derive(Debug)]
pub struct BackgroundWorkload {
    /// The ID of the workload (i.e., of the state it reports to).
    id     : String,
    /// The token that stops the workload. It is a child of the supervisor's token.
    token  : CancellationToken,
    /// The task running the workload.
    handle : JoinHandle<()>,
}

impl BackgroundWorkload {
    /// Spawns the given task as a new background workload.
    ///
    /// # Arguments
    /// - `id`: The ID of the workload.
    /// - `parent`: The token of which the workload's token will be a child.
    /// - `task`: The task to run. It is given the workload's own token, and should return soon after it is cancelled.
    ///
    /// # Returns
    /// A handle to the running workload.
    pub fn spawn<F, Fut>(id: impl Into<String>, parent: &CancellationToken, task: F) -> Self
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: 'static + Send + Future<Output = ()>,
    {
        let token: CancellationToken = parent.child_token();
        Self {
            id     : id.into(),
            handle : tokio::spawn(task(token.clone())),
            token,
        }
    }

    /// Returns the ID of this workload.
    #[inline]
    pub fn id(&self) -> &str { &self.id }

    /// Returns whether the workload finished by itself (or was stopped).
    #[inline]
    pub fn is_finished(&self) -> bool { self.handle.is_finished() }

    /// Stops the workload and waits for it to finish. Errors of the workload are logged, not returned.
    pub async fn stop(self) {
        debug!("Stopping background workload '{}'...", self.id);
        self.token.cancel();
        if let Err(err) = self.handle.await {
            if !err.is_cancelled() { error!("Background workload '{}' failed: {}", self.id, err); }
        }
    }
}



/// Owns the background workloads of a node. Cheap to clone; all clones talk to the same task.
#[derive(Clone, Debug)]
pub struct WorkloadSupervisor {
    /// The channel to the supervisor task.
    sender : mpsc::Sender<Request>,
}

impl WorkloadSupervisor {
    /// Spawns the supervisor task.
    ///
    /// # Arguments
    /// - `token`: A token that shuts the supervisor (and all its workloads) down when cancelled.
    ///
    /// # Returns
    /// A handle to the supervisor.
    pub fn spawn(token: &CancellationToken) -> Self {
        let (sender, receiver) = mpsc::channel(32);
        tokio::spawn(Self::run(receiver, token.clone()));
        Self { sender }
    }

    /// The supervisor task itself.
    async fn run(mut receiver: mpsc::Receiver<Request>, token: CancellationToken) {
        let mut workloads: HashMap<String, BackgroundWorkload> = HashMap::new();
        loop {
            let req: Request = tokio::select! {
                req = receiver.recv() => match req {
                    Some(req) => req,
                    None      => { break; },
                },
                _ = token.cancelled() => { break; },
            };

            match req {
                Request::Start{ id, launch, reply } => {
                    if let Some(old) = workloads.remove(&id) { old.stop().await; }
                    debug!("Starting background workload '{}'", id);
                    let workload: BackgroundWorkload = BackgroundWorkload::spawn(id.clone(), &token, launch);
                    workloads.insert(id, workload);
                    let _ = reply.send(());
                },

                Request::Stop{ id, reply } => {
                    let existed: bool = match workloads.remove(&id) {
                        Some(workload) => { workload.stop().await; true },
                        None           => false,
                    };
                    let _ = reply.send(existed);
                },
            }

            // Forget about workloads that are done
            workloads.retain(|_, workload| !workload.is_finished());
        }

        // Take everything down with us
        if !workloads.is_empty() { info!("Stopping {} background workload(s)...", workloads.len()); }
        for (_, workload) in workloads.drain() { workload.stop().await; }
    }



    /// Starts a new background workload, stopping any existing workload with the same ID first.
    ///
    /// # Arguments
    /// - `id`: The ID of the workload.
    /// - `task`: The task to run. It is given the workload's own token.
    ///
    /// # Errors
    /// This function errors if the supervisor is no longer running.
    pub async fn start<F, Fut>(&self, id: impl Into<String>, task: F) -> Result<(), Error>
    where
        F: 'static + Send + FnOnce(CancellationToken) -> Fut,
        Fut: 'static + Send + Future<Output = ()>,
    {
        let (reply, response) = oneshot::channel();
        let launch: Launcher = Box::new(move |token: CancellationToken| -> BoxFuture<'static, ()> { Box::pin(task(token)) });
        if self.sender.send(Request::Start{ id: id.into(), launch, reply }).await.is_err() { return Err(Error::Stopped); }
        response.await.map_err(|_| Error::Stopped)
    }

    /// Stops the background workload with the given ID and waits for it to finish.
    ///
    /// # Returns
    /// Whether there was such a workload.
    ///
    /// # Errors
    /// This function errors if the supervisor is no longer running.
    pub async fn stop(&self, id: impl Into<String>) -> Result<bool, Error> {
        let (reply, response) = oneshot::channel();
        if self.sender.send(Request::Stop{ id: id.into(), reply }).await.is_err() { return Err(Error::Stopped); }
        response.await.map_err(|_| Error::Stopped)
    }
}
