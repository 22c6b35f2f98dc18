//  SPEC.rs
//    by Lut99
//
//  Created:
//    06 Oct 2026, 14:30:18
//  Last edited:
//    16 Oct 2026, 11:12:55
//  Auto updated?
//    Yes
//
//  Description:
//!   Contains (public) interfaces and structs for the `vc-tsk` crate:
//!   the definition of a component as it appears in a profile, and the
//!   context that all components run in.
//

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use specifications::common::{ParameterAccess, ParameterError, Parameters};
use specifications::reason::ErrorReason;
use vc_api::client::ApiClientManager;
use vc_cfg::layout::EnvironmentLayout;
use vc_cfg::node::TimeoutsConfig;

use crate::component::ComponentRegistry;
use crate::errors::ComponentError;
use crate::firewall::{FirewallManager, LoggingFirewall};
use crate::packages::{DirectoryPackageManager, PackageManager};
use crate::results::{KeyValueParser, LogSink, MetricsParser, MetricsSink};


/***** TESTS *****/
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn component_spec_parse() {
        let raw: &str = r#"{
            "Type": "ClientServerProxy",
            "Parameters": { "TargetRole": "Server" },
            "Components": [ { "type": "ExecuteCommand", "parameters": { "Command": "true", "Timeout": 10 } } ]
        }"#;
        let spec: ComponentSpec = serde_json::from_str(raw).unwrap();
        assert_eq!(spec.kind, "ClientServerProxy");
        assert_eq!(spec.components.len(), 1);
        assert_eq!(spec.components[0].parameters.get_int("Timeout").unwrap(), 10);
    }
}





/***** LIBRARY *****/
/// Defines a component as it appears in a profile: a registered type name, its parameters and (for some components) sub-components.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct ComponentSpec {
    /// The type name of the component, as registered in the [`ComponentRegistry`].
    #[serde(rename = "type", alias = "Type")]
    pub kind       : String,
    /// The parameters of the component.
    #[serde(default, alias = "Parameters")]
    pub parameters : Parameters,
    /// Any nested components.
    #[serde(default, alias = "Components", skip_serializing_if = "Vec::is_empty")]
    pub components : Vec<ComponentSpec>,
}

impl ComponentSpec {
    /// Constructor for a ComponentSpec without sub-components.
    #[inline]
    pub fn new(kind: impl Into<String>, parameters: Parameters) -> Self {
        Self {
            kind       : kind.into(),
            parameters,
            components : vec![],
        }
    }
}



/// The context that components run in: who we are, who the others are, and the collaborators we may use.
#[derive(Clone)]
pub struct ComponentContext {
    /// The name of this node, as it (should) appear in the layout.
    pub agent_id  : String,
    /// The environment layout, if this is a multi-node run.
    pub layout    : Option<Arc<EnvironmentLayout>>,
    /// The protocol timeouts.
    pub timeouts  : TimeoutsConfig,
    /// Hands out clients for the APIs of other nodes.
    pub clients   : Arc<ApiClientManager>,
    /// Knows which components exist.
    pub registry  : Arc<ComponentRegistry>,
    /// Knows where the workload packages are.
    pub packages  : Arc<dyn PackageManager>,
    /// Parses raw workload output into metrics.
    pub parser    : Arc<dyn MetricsParser>,
    /// Receives the metrics.
    pub sink      : Arc<dyn MetricsSink>,
    /// Opens the firewall for server workloads.
    pub firewall  : Arc<dyn FirewallManager>,
    /// The fixed delay between two retries of a client/server cycle.
    pub retry_backoff : Duration,
}

impl ComponentContext {
    /// Constructor for the ComponentContext with the default collaborators.
    ///
    /// # Arguments
    /// - `agent_id`: The name of this node.
    /// - `layout`: The environment layout, if any.
    /// - `timeouts`: The protocol timeouts.
    /// - `api_port`: The port of the API of other nodes (if their address in the layout does not say otherwise).
    /// - `packages`: The directory with the installed workload packages.
    /// - `registry`: The registry of all known components.
    ///
    /// # Returns
    /// A new ComponentContext that uses a [`DirectoryPackageManager`], a [`KeyValueParser`], a [`LogSink`] and a [`LoggingFirewall`].
    pub fn new(agent_id: impl Into<String>, layout: Option<EnvironmentLayout>, timeouts: TimeoutsConfig, api_port: u16, packages: impl Into<std::path::PathBuf>, registry: ComponentRegistry) -> Self {
        let poll_interval: Duration = timeouts.poll_interval();
        Self {
            agent_id  : agent_id.into(),
            layout    : layout.map(Arc::new),
            timeouts,
            clients   : Arc::new(ApiClientManager::new(api_port, poll_interval)),
            registry  : Arc::new(registry),
            packages  : Arc::new(DirectoryPackageManager::new(packages)),
            parser    : Arc::new(KeyValueParser),
            sink      : Arc::new(LogSink),
            firewall  : Arc::new(LoggingFirewall),
            retry_backoff : Duration::from_secs(1),
        }
    }



    /// Returns the layout, or a dependency error naming the given component if this is not a multi-node run.
    pub fn require_layout(&self, component: &str) -> Result<&EnvironmentLayout, ComponentError> {
        match &self.layout {
            Some(layout) => Ok(layout),
            None         => Err(ComponentError::Dependency{ component: component.into(), host: self.agent_id.clone(), reason: ErrorReason::LayoutNotDefined, message: "An environment layout is required for this component, but none was given".into() }),
        }
    }

    /// Converts a parameter error into a dependency error for the given component.
    pub fn parameter_error(&self, component: &str, err: ParameterError) -> ComponentError {
        ComponentError::Dependency{ component: component.into(), host: self.agent_id.clone(), reason: ErrorReason::InvalidProfileDefinition, message: err.to_string() }
    }
}
