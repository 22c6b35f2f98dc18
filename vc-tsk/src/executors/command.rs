//  COMMAND.rs
//    by Lut99
//
//  Created:
//    09 Oct 2026, 14:02:17
//  Last edited:
//    17 Oct 2026, 11:20:40
//  Auto updated?
//    Yes
//
//  Description:
//!   Implements the `ExecuteCommand` component, which runs a single
//!   command and turns its output into metrics.
//

use std::path::PathBuf;

use async_trait::async_trait;
use log::info;
use tokio_util::sync::CancellationToken;

use specifications::common::{ParameterAccess, Parameters};
use specifications::reason::ErrorReason;

use super::{emit_metrics, process_spec, read_results};
use crate::component::Component;
use crate::errors::ComponentError;
use crate::process::{ProcessOutcome, ProcessOutput, ProcessSpec, WorkloadProcess};
use crate::spec::{ComponentContext, ComponentSpec};


/***** TESTS *****/
#[cfg(all(test, unix))]
mod tests {
    use std::sync::Arc;

    use specifications::common::Parameter;

    use super::*;
    use crate::component::ComponentRegistry;
    use crate::test_utils::{local_context, MemorySink};

    fn command(params: &[(&str, Parameter)]) -> ExecuteCommand {
        ExecuteCommand::new(ComponentSpec::new("ExecuteCommand", params.iter().map(|(name, value)| (name.to_string(), value.clone())).collect()))
    }

    #[tokio::test]
    async fn command_metrics_from_stdout() {
        let sink: Arc<MemorySink> = Arc::new(MemorySink::default());
        let mut ctx: ComponentContext = local_context(ComponentRegistry::new(), None);
        ctx.sink = sink.clone();

        command(&[ ("Command", "sh".into()), ("Arguments", "-c 'echo latency=1.5 ms'".into()) ]).execute(&ctx, &CancellationToken::new()).await.unwrap();
        let metrics = sink.metrics();
        assert_eq!(metrics.len(), 1);
        assert_eq!(metrics[0].name, "latency");
        assert_eq!(metrics[0].unit.as_deref(), Some("ms"));
    }

    #[tokio::test]
    async fn command_metrics_from_results_file() {
        let dir = tempfile::tempdir().unwrap();
        let sink: Arc<MemorySink> = Arc::new(MemorySink::default());
        let mut ctx: ComponentContext = local_context(ComponentRegistry::new(), None);
        ctx.sink = sink.clone();

        command(&[
            ("Command", "sh".into()),
            ("Arguments", "-c 'echo throughput=42 > out.txt'".into()),
            ("WorkingDirectory", dir.path().display().to_string().into()),
            ("ResultsFile", "out.txt".into()),
            ("ResultsTimeout", Parameter::Integer(5)),
        ]).execute(&ctx, &CancellationToken::new()).await.unwrap();
        assert_eq!(sink.metrics()[0].value, 42.0);
    }

    #[tokio::test]
    async fn command_failures() {
        let ctx: ComponentContext = local_context(ComponentRegistry::new(), None);

        // Bad exit code
        let err: ComponentError = command(&[ ("Command", "false".into()) ]).execute(&ctx, &CancellationToken::new()).await.unwrap_err();
        assert_eq!(err.reason(), Some(ErrorReason::WorkloadFailed));

        // Missing command
        let err: ComponentError = command(&[]).execute(&ctx, &CancellationToken::new()).await.unwrap_err();
        assert_eq!(err.reason(), Some(ErrorReason::InvalidProfileDefinition));

        // Timed out is fine
        command(&[ ("Command", "sleep".into()), ("Arguments", "30".into()), ("Timeout", Parameter::Integer(0)) ]).execute(&ctx, &CancellationToken::new()).await.unwrap();
    }
}





/***** LIBRARY *****/
/// Runs a single command, optionally with a timeout and retries, and emits the metrics found in its output.
///
/// Parameters:
/// - `Command` (required): The binary to run.
/// - `Arguments`: The arguments to run it with.
/// - `WorkingDirectory`: Where to run it. Defaults to the directory of `PackageName`, if given.
/// - `PackageName`: A package that must be installed.
/// - `Timeout`: Seconds after which the command is killed.
/// - `SuccessCodes`: Comma-separated exit codes that count as success. Defaults to `0`.
/// - `RetryPattern`, `Retries`: Failures matching the pattern are retried.
/// - `ResultsFile`, `ResultsTimeout`: Read the metrics from this file instead of stdout.
#[derive(Debug)]
pub struct ExecuteCommand {
    /// Our definition.
    spec : ComponentSpec,
}

impl ExecuteCommand {
    /// Constructor for the ExecuteCommand.
    #[inline]
    pub fn new(spec: ComponentSpec) -> Self { Self { spec } }

    /// Returns the working directory to run in, if any.
    fn working_dir(&self, ctx: &ComponentContext) -> Result<Option<PathBuf>, ComponentError> {
        let params: &Parameters = &self.spec.parameters;
        if params.raw("WorkingDirectory").is_some() {
            return params.get_string("WorkingDirectory").map(|dir| Some(PathBuf::from(dir))).map_err(|err| ctx.parameter_error(&self.spec.kind, err));
        }
        if params.raw("PackageName").is_some() {
            let name: String = params.get_string("PackageName").map_err(|err| ctx.parameter_error(&self.spec.kind, err))?;
            return match ctx.packages.get_package(&name) {
                Some(dir) => Ok(Some(dir)),
                None      => Err(ComponentError::Dependency{ component: self.spec.kind.clone(), host: ctx.agent_id.clone(), reason: ErrorReason::DependencyNotFound, message: format!("Package '{}' is not installed", name) }),
            };
        }
        Ok(None)
    }
}

#[async_trait]
impl Component for ExecuteCommand {
    #[inline]
    fn spec(&self) -> &ComponentSpec { &self.spec }

    async fn execute(&self, ctx: &ComponentContext, token: &CancellationToken) -> Result<(), ComponentError> {
        let kind: &str = &self.spec.kind;
        let params: &Parameters = &self.spec.parameters;

        // Build the process
        let command: String = params.get_string("Command").map_err(|err| ctx.parameter_error(kind, err))?;
        let arguments: String = params.get_string_or("Arguments", "");
        let working_dir: Option<PathBuf> = self.working_dir(ctx)?;
        let mut spec: ProcessSpec = process_spec(ctx, kind, params, command, arguments)?;
        if let Some(dir) = &working_dir { spec = spec.with_working_dir(dir); }

        // Run it
        let process: WorkloadProcess = WorkloadProcess::new(spec);
        let output: ProcessOutput = match process.run(token).await {
            Ok(output) => output,
            Err(err)   => { return Err(ComponentError::Process{ component: kind.into(), host: ctx.agent_id.clone(), err }); },
        };
        if output.outcome == ProcessOutcome::Cancelled { return Err(ComponentError::Cancelled{ component: kind.into(), host: ctx.agent_id.clone() }); }
        info!("'{}' finished in {:.1}s", process.spec(), output.elapsed.as_secs_f64());

        // Report what it found
        let raw: String = read_results(ctx, kind, params, working_dir.as_deref(), output.stdout, token).await?;
        let mut metadata: Parameters = Parameters::new();
        metadata.insert("Command".into(), process.spec().to_string().into());
        metadata.insert("Host".into(), ctx.agent_id.as_str().into());
        if let Ok(scenario) = params.get_string("Scenario") { metadata.insert("Scenario".into(), scenario.into()); }
        emit_metrics(ctx, kind, &metadata, &raw);
        Ok(())
    }
}
