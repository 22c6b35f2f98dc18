//  RESULTS.rs
//    by Lut99
//
//  Created:
//    07 Oct 2026, 11:02:41
//  Last edited:
//    15 Oct 2026, 14:20:33
//  Auto updated?
//    Yes
//
//  Description:
//!   Handles the results of a workload: waiting for its results file,
//!   parsing the raw output into metrics and emitting those to a sink.
//

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{debug, info};
use tokio::fs as tfs;
use tokio_util::sync::CancellationToken;

use specifications::common::Parameters;
use specifications::metrics::Metric;
use vc_shr::poll::{poll_until, Error as PollError};

pub use crate::errors::ResultsError as Error;


/***** TESTS *****/
#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn results_empty_for_whole_window() {
        let dir = tempfile::tempdir().unwrap();
        let path: PathBuf = dir.path().join("results.txt");
        tfs::write(&path, "").await.unwrap();

        let res: Result<String, Error> = wait_for_results_file(&path, Duration::from_millis(200), Duration::from_millis(20), &CancellationToken::new()).await;
        assert!(matches!(res, Err(Error::NotFound{ .. })));
    }

    #[tokio::test]
    async fn results_appear_later() {
        let dir = tempfile::tempdir().unwrap();
        let path: PathBuf = dir.path().join("results.txt");
        let writer: PathBuf = path.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            tfs::write(&writer, "throughput=12.5 Gbps\n").await.unwrap();
        });

        let raw: String = wait_for_results_file(&path, Duration::from_secs(5), Duration::from_millis(10), &CancellationToken::new()).await.unwrap();
        assert_eq!(raw.trim(), "throughput=12.5 Gbps");
    }

    #[test]
    fn key_value_parser() {
        let raw: &str = "# header\nlatency-p50 = 12.3 us\nlatency-p99: 45\nthroughput=1e3 msg/s extra\nstatus=ok\n=5\n";
        let metrics: Vec<Metric> = KeyValueParser.parse(raw);
        assert_eq!(metrics, vec![
            Metric::new("latency-p50", 12.3, Some("us".into())),
            Metric::new("latency-p99", 45.0, None),
            Metric::new("throughput", 1000.0, Some("msg/s".into())),
        ]);
    }
}





/***** LIBRARY *****/
/// Waits for the given results file to exist and be non-empty.
///
/// # Arguments
/// - `path`: The path of the results file.
/// - `timeout`: How long to wait for it.
/// - `interval`: The delay between two checks.
/// - `token`: A token that aborts the wait when cancelled.
///
/// # Returns
/// The contents of the file.
///
/// # Errors
/// This function errors with [`Error::NotFound`] if the file did not appear or stayed empty for the whole window, or [`Error::Cancelled`] if we were cancelled first.
pub async fn wait_for_results_file(path: impl AsRef<Path>, timeout: Duration, interval: Duration, token: &CancellationToken) -> Result<String, Error> {
    let path: &Path = path.as_ref();
    let res: Result<String, PollError<std::io::Error>> = poll_until(format!("results file '{}'", path.display()), timeout, interval, token, move || async move {
        match tfs::read_to_string(path).await {
            Ok(raw) if raw.trim().is_empty()             => Ok(None),
            Ok(raw)                                      => Ok(Some(raw)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err)                                     => Err(err),
        }
    }).await;
    match res {
        Ok(raw)                          => { debug!("Results file '{}' is ready ({} bytes)", path.display(), raw.len()); Ok(raw) },
        Err(PollError::Timeout{ .. })    => Err(Error::NotFound{ path: path.into(), timeout }),
        Err(PollError::Cancelled{ .. })  => Err(Error::Cancelled{ path: PathBuf::from(path) }),
    }
}



/// Turns the raw output of a workload into metrics.
pub trait MetricsParser: Send + Sync {
    /// Parses the given raw output.
    ///
    /// # Returns
    /// The metrics found. Output without recognizable metrics yields an empty list.
    fn parse(&self, raw: &str) -> Vec<Metric>;
}



/// Parses lines of the form `name = value [unit]` (or `name: value [unit]`). Lines that do not have a numeric value are skipped.
#[derive(Clone, Copy, Debug, Default)]
pub struct KeyValueParser;

impl MetricsParser for KeyValueParser {
    fn parse(&self, raw: &str) -> Vec<Metric> {
        let mut metrics: Vec<Metric> = Vec::new();
        for line in raw.lines() {
            let line: &str = line.trim();
            if line.is_empty() || line.starts_with('#') { continue; }

            // Split on the first separator
            let sep: usize = match line.find(|c: char| c == '=' || c == ':') {
                Some(sep) => sep,
                None      => { continue; },
            };
            let name: &str = line[..sep].trim();
            if name.is_empty() { continue; }

            // The value is the first word after it, the unit (if any) the second
            let mut words = line[sep + 1..].split_whitespace();
            let value: f64 = match words.next().map(|word| word.parse::<f64>()) {
                Some(Ok(value)) => value,
                _               => { continue; },
            };
            metrics.push(Metric::new(name, value, words.next().map(String::from)));
        }
        metrics
    }
}



/// Something that receives the metrics and messages of components.
pub trait MetricsSink: Send + Sync {
    /// Records the given metrics.
    ///
    /// # Arguments
    /// - `component`: The type name of the component that produced them.
    /// - `metadata`: Context shared by all metrics (e.g., scenario, host, peer).
    /// - `metrics`: The metrics themselves.
    fn log_metrics(&self, component: &str, metadata: &Parameters, metrics: &[Metric]);

    /// Records a free-form message.
    fn log_message(&self, component: &str, message: &str);
}



/// A MetricsSink that writes everything to the logger.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogSink;

impl MetricsSink for LogSink {
    fn log_metrics(&self, component: &str, metadata: &Parameters, metrics: &[Metric]) {
        let context: String = metadata.iter().map(|(key, value)| format!("{}={}", key, value)).collect::<Vec<String>>().join(", ");
        for metric in metrics {
            info!("[{}] metric {}{}", component, metric, if context.is_empty() { String::new() } else { format!(" ({})", context) });
        }
    }

    #[inline]
    fn log_message(&self, component: &str, message: &str) {
        info!("[{}] {}", component, message);
    }
}
