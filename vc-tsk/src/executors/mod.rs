//  MOD.rs
//    by Lut99
//
//  Created:
//    09 Oct 2026, 13:10:45
//  Last edited:
//    17 Oct 2026, 11:02:33
//  Auto updated?
//    Yes
//
//  Description:
//!   The executors that ship with the Virtual Client, plus the
//!   parameter handling they share.
//

// Declare the modules
pub mod command;
pub mod network;
pub mod proxy;

use std::path::{Path, PathBuf};
use std::time::Duration;

use regex::Regex;
use tokio_util::sync::CancellationToken;

use specifications::common::{ParameterAccess, ParameterError, Parameters};
use specifications::metrics::Metric;
use vc_shr::retry::{Backoff, RetryPolicy};

use crate::component::ComponentRegistry;
use crate::errors::{ComponentError, ResultsError};
use crate::process::ProcessSpec;
use crate::results::wait_for_results_file;
use crate::spec::ComponentContext;

// Bring some stuff into this namespace
pub use command::ExecuteCommand;
pub use network::{NetworkServer, NetworkWorkload};
pub use proxy::ClientServerProxy;


/***** TESTS *****/
#[cfg(test)]
mod tests {
    use specifications::common::Parameter;

    use super::*;

    #[test]
    fn success_codes() {
        let mut params: Parameters = Parameters::new();
        assert_eq!(parse_success_codes(&params).unwrap(), vec![ 0 ]);
        params.insert("SuccessCodes".into(), Parameter::String("0, 3,137".into()));
        assert_eq!(parse_success_codes(&params).unwrap(), vec![ 0, 3, 137 ]);
        params.insert("SuccessCodes".into(), Parameter::Integer(2));
        assert_eq!(parse_success_codes(&params).unwrap(), vec![ 2 ]);
        params.insert("SuccessCodes".into(), Parameter::String("zero".into()));
        assert!(parse_success_codes(&params).is_err());
    }

    #[test]
    fn placeholders() {
        let raw: &str = "-c {ServerIp} -p {Port} --bind {ClientIp} {Unknown}";
        assert_eq!(substitute(raw, &[ ("ServerIp", "10.0.0.2"), ("Port", "6100"), ("ClientIp", "10.0.0.1") ]), "-c 10.0.0.2 -p 6100 --bind 10.0.0.1 {Unknown}");
    }

    #[test]
    fn default_registry_names() {
        assert_eq!(default_registry().names(), vec![ "ClientServerProxy", "ExecuteCommand", "NetworkServer", "NetworkWorkload" ]);
    }
}





/***** CONSTANTS *****/
/// The type name of the [`ClientServerProxy`].
pub const CLIENT_SERVER_PROXY: &str = "ClientServerProxy";
/// The type name of the [`ExecuteCommand`] component.
pub const EXECUTE_COMMAND: &str = "ExecuteCommand";
/// The type name of the [`NetworkWorkload`] component.
pub const NETWORK_WORKLOAD: &str = "NetworkWorkload";
/// The type name of the [`NetworkServer`] component.
pub const NETWORK_SERVER: &str = "NetworkServer";

/// How long we wait for a results file if the profile does not say otherwise.
pub const DEFAULT_RESULTS_TIMEOUT: Duration = Duration::from_secs(5 * 60);





/***** HELPER FUNCTIONS *****/
/// Reads the `SuccessCodes` parameter: a single integer or a comma-separated list. Defaults to `[0]`.
pub(crate) fn parse_success_codes(params: &Parameters) -> Result<Vec<i32>, ParameterError> {
    if params.raw("SuccessCodes").is_none() { return Ok(vec![ 0 ]); }
    let raw: String = params.get_string("SuccessCodes")?;
    let mut codes: Vec<i32> = Vec::new();
    for code in raw.split(',').map(str::trim).filter(|code| !code.is_empty()) {
        match code.parse::<i32>() {
            Ok(code) => codes.push(code),
            Err(_)   => { return Err(ParameterError::Type{ name: "SuccessCodes".into(), expected: "comma-separated list of exit codes", got: raw.as_str().into() }); },
        }
    }
    Ok(codes)
}

/// Replaces every `{Name}` in the given string with its value. Unknown placeholders are left alone.
pub(crate) fn substitute(raw: &str, values: &[(&str, &str)]) -> String {
    let mut res: String = raw.to_string();
    for (name, value) in values {
        res = res.replace(&format!("{{{}}}", name), value);
    }
    res
}

/// Reads the process-related parameters shared by all executors that run a command.
///
/// # Arguments
/// - `ctx`: The context of the component (for errors and the retry backoff).
/// - `component`: The type name of the component (for errors).
/// - `params`: The parameters to read: `Timeout`, `SuccessCodes`, `RetryPattern` and `Retries`.
/// - `command`: The command to run.
/// - `arguments`: The (already substituted) arguments to run it with.
///
/// # Returns
/// A ProcessSpec for the command.
///
/// # Errors
/// This function errors with an [`InvalidProfileDefinition`](specifications::reason::ErrorReason::InvalidProfileDefinition) dependency error if any parameter is malformed.
pub(crate) fn process_spec(ctx: &ComponentContext, component: &str, params: &Parameters, command: String, arguments: String) -> Result<ProcessSpec, ComponentError> {
    let mut spec: ProcessSpec = ProcessSpec::new(command, arguments)
        .with_success_codes(parse_success_codes(params).map_err(|err| ctx.parameter_error(component, err))?);
    if params.raw("Timeout").is_some() {
        spec = spec.with_timeout(params.get_secs("Timeout").map_err(|err| ctx.parameter_error(component, err))?);
    }
    if params.raw("RetryPattern").is_some() {
        let raw: String = params.get_string("RetryPattern").map_err(|err| ctx.parameter_error(component, err))?;
        let pattern: Regex = match Regex::new(&raw) {
            Ok(pattern) => pattern,
            Err(err)    => { return Err(ctx.parameter_error(component, ParameterError::Type{ name: "RetryPattern".into(), expected: "regular expression", got: format!("{} ({})", raw, err).into() })); },
        };
        let retries: i64 = if params.raw("Retries").is_some() { params.get_int("Retries").map_err(|err| ctx.parameter_error(component, err))? } else { 3 };
        spec = spec.with_retry(pattern, RetryPolicy::new(retries.clamp(0, u32::MAX as i64) as u32, Backoff::Fixed(ctx.retry_backoff)));
    }
    Ok(spec)
}

/// Reads the raw results of a command: either the results file named by `ResultsFile`, or its stdout.
///
/// # Errors
/// This function errors with [`ComponentError::ResultsNotFound`] if a results file is named but did not appear in time.
pub(crate) async fn read_results(ctx: &ComponentContext, component: &str, params: &Parameters, working_dir: Option<&Path>, stdout: String, token: &CancellationToken) -> Result<String, ComponentError> {
    if params.raw("ResultsFile").is_none() { return Ok(stdout); }

    let mut path: PathBuf = PathBuf::from(params.get_string("ResultsFile").map_err(|err| ctx.parameter_error(component, err))?);
    if path.is_relative() {
        if let Some(dir) = working_dir { path = dir.join(path); }
    }
    let timeout: Duration = if params.raw("ResultsTimeout").is_some() { params.get_secs("ResultsTimeout").map_err(|err| ctx.parameter_error(component, err))? } else { DEFAULT_RESULTS_TIMEOUT };
    match wait_for_results_file(&path, timeout, ctx.timeouts.poll_interval(), token).await {
        Ok(raw)  => Ok(raw),
        Err(ResultsError::Cancelled{ .. }) => Err(ComponentError::Cancelled{ component: component.into(), host: ctx.agent_id.clone() }),
        Err(err) => Err(ComponentError::ResultsNotFound{ component: component.into(), host: ctx.agent_id.clone(), err }),
    }
}

/// Parses the given raw results, tags them with the given metadata and sends them to the sink.
///
/// # Returns
/// The metrics that were found.
pub(crate) fn emit_metrics(ctx: &ComponentContext, component: &str, metadata: &Parameters, raw: &str) -> Vec<Metric> {
    let mut metrics: Vec<Metric> = ctx.parser.parse(raw);
    for metric in &mut metrics {
        for (key, value) in metadata {
            metric.metadata.entry(key.clone()).or_insert_with(|| value.clone());
        }
    }
    if metrics.is_empty() {
        ctx.sink.log_message(component, "Workload produced no recognizable metrics");
    } else {
        ctx.sink.log_metrics(component, metadata, &metrics);
    }
    metrics
}





/***** LIBRARY *****/
/// Registers all executors that ship with the Virtual Client in the given registry.
pub fn register_defaults(registry: &mut ComponentRegistry) {
    registry.register(CLIENT_SERVER_PROXY, |spec| Box::new(ClientServerProxy::new(spec)));
    registry.register(EXECUTE_COMMAND, |spec| Box::new(ExecuteCommand::new(spec)));
    registry.register(NETWORK_WORKLOAD, |spec| Box::new(NetworkWorkload::new(spec)));
    registry.register(NETWORK_SERVER, |spec| Box::new(NetworkServer::new(spec)));
}

/// Returns a registry with all executors that ship with the Virtual Client.
#[inline]
pub fn default_registry() -> ComponentRegistry {
    let mut registry: ComponentRegistry = ComponentRegistry::new();
    register_defaults(&mut registry);
    registry
}
