//  METRICS.rs
//    by Lut99
//
//  Created:
//    03 Oct 2026, 09:14:27
//  Last edited:
//    03 Oct 2026, 09:40:58
//  Auto updated?
//    Yes
//
//  Description:
//!   Defines the normalized metric that workload results are parsed into.
//

use std::fmt::{Display, Formatter, Result as FResult};

use serde::{Deserialize, Serialize};

use crate::common::Parameters;


/***** LIBRARY *****/
/// A single normalized measurement.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Metric {
    /// The name of the metric (e.g., `latency-p99`).
    pub name     : String,
    /// The measured value.
    pub value    : f64,
    /// The unit of the value, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit     : Option<String>,
    /// Additional metadata (e.g., the scenario or the peer it was measured against).
    #[serde(default)]
    pub metadata : Parameters,
}

impl Metric {
    /// Constructor for the Metric.
    ///
    /// # Arguments
    /// - `name`: The name of the metric.
    /// - `value`: The measured value.
    /// - `unit`: The unit of the value, if any.
    ///
    /// # Returns
    /// A new Metric without any metadata.
    #[inline]
    pub fn new(name: impl Into<String>, value: f64, unit: Option<String>) -> Self {
        Self {
            name : name.into(),
            value,
            unit,
            metadata : Parameters::new(),
        }
    }
}

impl Display for Metric {
    fn fmt(&self, f: &mut Formatter<'_>) -> FResult {
        write!(f, "{}={}", self.name, self.value)?;
        if let Some(unit) = &self.unit { write!(f, " {}", unit)?; }
        Ok(())
    }
}
