//  PROCESS.rs
//    by Lut99
//
//  Created:
//    07 Oct 2026, 13:44:10
//  Last edited:
//    16 Oct 2026, 15:02:27
//  Auto updated?
//    Yes
//
//  Description:
//!   Implements the workload process runner: spawns an external binary,
//!   captures its output, enforces a wall-clock timeout, validates its
//!   exit code and retries failures that look transient.
//

use std::fmt::{Display, Formatter, Result as FResult};
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use log::{debug, error, warn};
use regex::Regex;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout, Instant};
use tokio_util::sync::CancellationToken;

use vc_shr::debug::BlockFormatter;
use vc_shr::retry::{retry, RetryPolicy};

pub use crate::errors::ProcessError as Error;


/***** TESTS *****/
#[cfg(test)]
mod tests {
    use vc_shr::retry::Backoff;

    use super::*;

    #[test]
    fn split_arguments_quotes() {
        assert_eq!(split_arguments("-p 6100 --tcp"), vec![ "-p", "6100", "--tcp" ]);
        assert_eq!(split_arguments("  -c \"echo hi; exit 0\"  x"), vec![ "-c", "echo hi; exit 0", "x" ]);
        assert_eq!(split_arguments("'a \"b\"' c\\ d \"\""), vec![ "a \"b\"", "c d", "" ]);
        assert!(split_arguments("   ").is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn process_captures_output() {
        let process: WorkloadProcess = WorkloadProcess::new(ProcessSpec::new("sh", "-c \"echo hello; echo oops >&2\""));
        let output: ProcessOutput = process.run(&CancellationToken::new()).await.unwrap();
        assert_eq!(output.outcome, ProcessOutcome::Exited);
        assert_eq!(output.code, Some(0));
        assert_eq!(output.stdout.trim(), "hello");
        assert_eq!(output.stderr.trim(), "oops");
        assert!(!process.is_running());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn process_killed_on_timeout() {
        let process: WorkloadProcess = WorkloadProcess::new(ProcessSpec::new("sleep", "30").with_timeout(Duration::from_millis(200)));
        let started: Instant = Instant::now();
        let output: ProcessOutput = process.run(&CancellationToken::new()).await.unwrap();
        assert_eq!(output.outcome, ProcessOutcome::TimedOut);
        assert!(started.elapsed() < Duration::from_secs(10));
        assert!(!process.is_running());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn process_exit_codes() {
        let process: WorkloadProcess = WorkloadProcess::new(ProcessSpec::new("sh", "-c 'exit 3'"));
        assert!(matches!(process.run(&CancellationToken::new()).await, Err(Error::ExitCodeError{ code: Some(3), .. })));

        let process: WorkloadProcess = WorkloadProcess::new(ProcessSpec::new("sh", "-c 'exit 3'").with_success_codes(vec![ 0, 3 ]));
        assert_eq!(process.run(&CancellationToken::new()).await.unwrap().code, Some(3));

        let process: WorkloadProcess = WorkloadProcess::new(ProcessSpec::new("sh", "-c 'kill -9 $$'").with_accept_killed(true));
        assert!(process.run(&CancellationToken::new()).await.is_ok());

        let process: WorkloadProcess = WorkloadProcess::new(ProcessSpec::new("/definitely/not/a/binary", ""));
        assert!(matches!(process.run(&CancellationToken::new()).await, Err(Error::SpawnError{ .. })));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn process_retries_transient_failures() {
        let dir = tempfile::tempdir().unwrap();
        let script: &str = "-c 'echo attempt >> attempts; if [ -f marker ]; then exit 0; fi; touch marker; echo \"bind: Address already in use\" >&2; exit 1'";
        let process: WorkloadProcess = WorkloadProcess::new(ProcessSpec::new("sh", script)
            .with_working_dir(dir.path())
            .with_retry(Regex::new("(?i)address already in use").unwrap(), RetryPolicy::new(3, Backoff::Fixed(Duration::from_millis(10)))));
        process.run(&CancellationToken::new()).await.unwrap();
        assert_eq!(std::fs::read_to_string(dir.path().join("attempts")).unwrap().lines().count(), 2);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn process_does_not_retry_other_failures() {
        let dir = tempfile::tempdir().unwrap();
        let process: WorkloadProcess = WorkloadProcess::new(ProcessSpec::new("sh", "-c 'echo attempt >> attempts; echo \"segfault\" >&2; exit 1'")
            .with_working_dir(dir.path())
            .with_retry(Regex::new("(?i)address already in use").unwrap(), RetryPolicy::new(3, Backoff::Fixed(Duration::from_millis(10)))));
        assert!(process.run(&CancellationToken::new()).await.is_err());
        assert_eq!(std::fs::read_to_string(dir.path().join("attempts")).unwrap().lines().count(), 1);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn process_cancelled() {
        let token: CancellationToken = CancellationToken::new();
        let canceller: CancellationToken = token.clone();
        tokio::spawn(async move { sleep(Duration::from_millis(100)).await; canceller.cancel(); });

        let process: WorkloadProcess = WorkloadProcess::new(ProcessSpec::new("sleep", "30"));
        let output: ProcessOutput = process.run(&token).await.unwrap();
        assert_eq!(output.outcome, ProcessOutcome::Cancelled);
        assert!(!process.is_running());
    }
}





/***** CONSTANTS *****/
/// How long we wait for the output pipes to close after killing a process. Children of the process may keep them open.
const PIPE_GRACE: Duration = Duration::from_secs(2);
/// Exit codes that shells report for processes killed with SIGKILL or SIGTERM.
const KILLED_CODES: [i32; 2] = [ 128 + 9, 128 + 15 ];





/***** HELPER FUNCTIONS *****/
/// Reads everything from the given pipe (if any) as a lossy UTF-8 string.
async fn read_all<R: AsyncRead + Unpin>(reader: Option<R>) -> String {
    let mut buf: Vec<u8> = Vec::new();
    if let Some(mut reader) = reader {
        if let Err(err) = reader.read_to_end(&mut buf).await { debug!("Failed to read process output: {}", err); }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

/// Waits for a reader task, giving up after a grace period.
async fn collect(task: JoinHandle<String>) -> String {
    match timeout(PIPE_GRACE, task).await {
        Ok(Ok(output)) => output,
        Ok(Err(err))   => { debug!("Output reader failed: {}", err); String::new() },
        Err(_)         => { debug!("Output pipe did not close within {:.1}s", PIPE_GRACE.as_secs_f64()); String::new() },
    }
}



/// Splits an argument string into separate arguments, honouring single quotes, double quotes and backslash escapes.
///
/// # Arguments
/// - `raw`: The argument string to split.
///
/// # Returns
/// The separate arguments, without quotes.
pub fn split_arguments(raw: &str) -> Vec<String> {
    let mut args    : Vec<String>  = Vec::new();
    let mut current : String       = String::new();
    let mut started : bool         = false;
    let mut quote   : Option<char> = None;

    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        match (quote, c) {
            (Some(q), c) if c == q => { quote = None; },
            (Some('"'), '\\')      => { if let Some(next) = chars.next() { current.push(next); } },
            (Some(_), c)           => { current.push(c); },
            (None, '"') | (None, '\'') => { quote = Some(c); started = true; },
            (None, '\\')           => { if let Some(next) = chars.next() { current.push(next); started = true; } },
            (None, c) if c.is_whitespace() => {
                if started { args.push(std::mem::take(&mut current)); started = false; }
            },
            (None, c)              => { current.push(c); started = true; },
        }
    }
    if started { args.push(current); }
    args
}





/***** LIBRARY *****/
/// Defines how to run a workload process.
#[derive(Clone, Debug)]
pub struct ProcessSpec {
    /// The binary to run.
    pub command       : String,
    /// The arguments to run it with, as a single string.
    pub arguments     : String,
    /// The working directory, if not the current one.
    pub working_dir   : Option<PathBuf>,
    /// Additional environment variables.
    pub env           : Vec<(String, String)>,
    /// The wall-clock timeout after which the process is killed.
    pub timeout       : Option<Duration>,
    /// The exit codes that are considered successful.
    pub success_codes : Vec<i32>,
    /// Whether a process that was killed by someone else counts as successful.
    pub accept_killed : bool,
    /// Failures whose message or output match this pattern are retried.
    pub retry_pattern : Option<Regex>,
    /// How often and with which backoff transient failures are retried.
    pub retry         : RetryPolicy,
}

impl ProcessSpec {
    /// Constructor for a ProcessSpec with no timeout, no retries and only `0` as a successful exit code.
    #[inline]
    pub fn new(command: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            command       : command.into(),
            arguments     : arguments.into(),
            working_dir   : None,
            env           : vec![],
            timeout       : None,
            success_codes : vec![ 0 ],
            accept_killed : false,
            retry_pattern : None,
            retry         : RetryPolicy::none(),
        }
    }

    /// Sets the working directory.
    #[inline]
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self { self.working_dir = Some(dir.into()); self }

    /// Adds an environment variable.
    #[inline]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self { self.env.push((key.into(), value.into())); self }

    /// Sets the wall-clock timeout.
    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self { self.timeout = Some(timeout); self }

    /// Sets the exit codes that are considered successful.
    #[inline]
    pub fn with_success_codes(mut self, codes: Vec<i32>) -> Self { self.success_codes = codes; self }

    /// Sets whether a process killed by someone else counts as successful.
    #[inline]
    pub fn with_accept_killed(mut self, accept: bool) -> Self { self.accept_killed = accept; self }

    /// Sets which failures are retried, and how.
    #[inline]
    pub fn with_retry(mut self, pattern: Regex, policy: RetryPolicy) -> Self { self.retry_pattern = Some(pattern); self.retry = policy; self }
}

impl Display for ProcessSpec {
    fn fmt(&self, f: &mut Formatter<'_>) -> FResult {
        if self.arguments.trim().is_empty() { write!(f, "{}", self.command) } else { write!(f, "{} {}", self.command, self.arguments) }
    }
}



/// How a process ended.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProcessOutcome {
    /// The process exited by itself.
    Exited,
    /// The process exceeded its timeout and was killed.
    TimedOut,
    /// The process was killed because we were cancelled.
    Cancelled,
}

/// The result of running a process.
#[derive(Clone, Debug)]
pub struct ProcessOutput {
    /// How the process ended.
    pub outcome : ProcessOutcome,
    /// The exit code, if the process exited normally.
    pub code    : Option<i32>,
    /// Everything the process wrote to stdout.
    pub stdout  : String,
    /// Everything the process wrote to stderr.
    pub stderr  : String,
    /// How long the process ran.
    pub elapsed : Duration,
}



/// A workload process that can be run (and retried), and that can be asked whether it is running.
#[derive(Debug)]
pub struct WorkloadProcess {
    /// How to run the process.
    spec    : ProcessSpec,
    /// Whether the process is alive right now.
    running : AtomicBool,
}

impl WorkloadProcess {
    /// Constructor for the WorkloadProcess.
    #[inline]
    pub fn new(spec: ProcessSpec) -> Self {
        Self {
            spec,
            running : AtomicBool::new(false),
        }
    }

    /// Returns how this process is run.
    #[inline]
    pub fn spec(&self) -> &ProcessSpec { &self.spec }

    /// Returns whether the process is alive right now.
    #[inline]
    pub fn is_running(&self) -> bool { self.running.load(Ordering::SeqCst) }



    /// Runs the process, retrying failures that match the retry pattern.
    ///
    /// A process that exceeds its timeout is killed; that is reported as [`ProcessOutcome::TimedOut`] and is not an error.
    /// Likewise, a process killed because the token was cancelled is reported as [`ProcessOutcome::Cancelled`].
    ///
    /// # Arguments
    /// - `token`: A token that kills the process when cancelled.
    ///
    /// # Returns
    /// The output of the (last) run.
    ///
    /// # Errors
    /// This function errors if the process could not be spawned or exited with an unsuccessful code, after all retries.
    pub async fn run(&self, token: &CancellationToken) -> Result<ProcessOutput, Error> {
        let this: &Self = self;
        let what: String = format!("Process '{}'", self.spec);
        let res: Result<ProcessOutput, Error> = retry(&what, &self.spec.retry, token, |err: &Error| this.is_transient(err), move |_| async move { this.run_once(token).await }).await;
        if let Err(err) = &res { error!("{}", err); }
        res
    }

    /// Returns whether the given failure matches our retry pattern.
    fn is_transient(&self, err: &Error) -> bool {
        match &self.spec.retry_pattern {
            Some(pattern) => pattern.is_match(&err.retry_haystack()),
            None          => false,
        }
    }

    /// Runs the process exactly once.
    async fn run_once(&self, token: &CancellationToken) -> Result<ProcessOutput, Error> {
        let command: String = self.spec.to_string();
        debug!("Running '{}'...", command);

        // Prepare the command
        let mut cmd: Command = Command::new(&self.spec.command);
        cmd.args(split_arguments(&self.spec.arguments));
        cmd.envs(self.spec.env.iter().map(|(key, value)| (key.as_str(), value.as_str())));
        if let Some(dir) = &self.spec.working_dir { cmd.current_dir(dir); }
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);

        // Spawn it
        let started: Instant = Instant::now();
        let mut child: Child = match cmd.spawn() {
            Ok(child) => child,
            Err(err)  => { return Err(Error::SpawnError{ command, err }); },
        };
        self.running.store(true, Ordering::SeqCst);
        let stdout: JoinHandle<String> = tokio::spawn(read_all(child.stdout.take()));
        let stderr: JoinHandle<String> = tokio::spawn(read_all(child.stderr.take()));

        // Wait for whatever comes first
        let deadline = async {
            match self.spec.timeout {
                Some(timeout) => sleep(timeout).await,
                None          => std::future::pending::<()>().await,
            }
        };
        let (outcome, status): (ProcessOutcome, Option<Result<ExitStatus, std::io::Error>>) = tokio::select! {
            status = child.wait()   => (ProcessOutcome::Exited, Some(status)),
            _ = deadline            => (ProcessOutcome::TimedOut, None),
            _ = token.cancelled()   => (ProcessOutcome::Cancelled, None),
        };
        if outcome != ProcessOutcome::Exited {
            if let Err(err) = child.kill().await { debug!("Failed to kill '{}': {}", command, err); }
        }
        self.running.store(false, Ordering::SeqCst);
        let elapsed: Duration = started.elapsed();

        // Collect the output
        let stdout: String = collect(stdout).await;
        let stderr: String = collect(stderr).await;

        // Decide what to make of it
        match (outcome, status) {
            (ProcessOutcome::Exited, Some(Ok(status))) => {
                let code: Option<i32> = status.code();
                let success: bool = match code {
                    Some(code) => self.spec.success_codes.contains(&code) || (self.spec.accept_killed && KILLED_CODES.contains(&code)),
                    None       => self.spec.accept_killed,
                };
                if !success {
                    debug!("'{}' failed; stdout:\n{}stderr:\n{}", command, BlockFormatter::new(&stdout), BlockFormatter::new(&stderr));
                    return Err(Error::ExitCodeError{ command, code, stdout, stderr });
                }
                debug!("'{}' exited with code {:?} after {:.1}s", command, code, elapsed.as_secs_f64());
                Ok(ProcessOutput{ outcome, code, stdout, stderr, elapsed })
            },
            (ProcessOutcome::Exited, Some(Err(err))) => {
                if let Err(err) = child.kill().await { debug!("Failed to kill '{}': {}", command, err); }
                Err(Error::WaitError{ command, err })
            },
            (ProcessOutcome::TimedOut, _) => {
                warn!("'{}' did not finish within {:.1}s and was killed", command, self.spec.timeout.unwrap_or_default().as_secs_f64());
                Ok(ProcessOutput{ outcome, code: None, stdout, stderr, elapsed })
            },
            (outcome, _) => {
                debug!("'{}' was killed because it was cancelled", command);
                Ok(ProcessOutput{ outcome, code: None, stdout, stderr, elapsed })
            },
        }
    }
}
