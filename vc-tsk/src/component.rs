//  COMPONENT.rs
//    by Lut99
//
//  Created:
//    06 Oct 2026, 15:10:27
//  Last edited:
//    16 Oct 2026, 11:30:02
//  Auto updated?
//    Yes
//
//  Description:
//!   Defines the `Component` trait that every executor implements, and
//!   the registry that maps type names (as they appear in profiles and
//!   instructions) to constructors.
//

use std::collections::HashMap;
use std::fmt::{Debug, Formatter, Result as FResult};
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use specifications::reason::ErrorReason;

use crate::errors::ComponentError;
use crate::spec::{ComponentContext, ComponentSpec};


/***** TESTS *****/
#[cfg(test)]
mod tests {
    use specifications::common::Parameters;

    use super::*;

    struct Noop(ComponentSpec);

    #[async_trait]
    impl Component for Noop {
        fn spec(&self) -> &ComponentSpec { &self.0 }
        async fn execute(&self, _ctx: &ComponentContext, _token: &CancellationToken) -> Result<(), ComponentError> { Ok(()) }
    }

    #[test]
    fn registry_lookup() {
        let mut registry: ComponentRegistry = ComponentRegistry::new();
        registry.register("Noop", |spec| Box::new(Noop(spec)));
        assert!(registry.contains("Noop"));
        assert!(!registry.contains("noop"));

        let component: Box<dyn Component> = registry.create(ComponentSpec::new("Noop", Parameters::new()), "node-a").unwrap();
        assert_eq!(component.type_name(), "Noop");
        assert!(component.is_running());

        match registry.create(ComponentSpec::new("Unknown", Parameters::new()), "node-a") {
            Err(ComponentError::Dependency{ reason, .. }) => assert_eq!(reason, ErrorReason::InstructionsNotSupported),
            Err(err)                                     => panic!("Expected a dependency error, got {}", err),
            Ok(_)                                        => panic!("Expected a dependency error, got a component"),
        }
    }
}





/***** LIBRARY *****/
/// Something that can be executed as part of a profile, or on request of another node.
#[async_trait]
pub trait Component: Send + Sync {
    /// Returns the definition this component was created from.
    fn spec(&self) -> &ComponentSpec;

    /// Returns the type name of this component.
    #[inline]
    fn type_name(&self) -> &str { &self.spec().kind }

    /// Runs the component to completion.
    ///
    /// # Arguments
    /// - `ctx`: The context to run in.
    /// - `token`: A token that is cancelled when the component should stop as soon as possible.
    ///
    /// # Errors
    /// This function errors if the component failed. Components that are cancelled may either return [`ComponentError::Cancelled`] or `Ok(())`.
    async fn execute(&self, ctx: &ComponentContext, token: &CancellationToken) -> Result<(), ComponentError>;

    /// Returns whether the workload of this component is actually up and running. Used to confirm that a component
    /// started in the background did not fail immediately.
    #[inline]
    fn is_running(&self) -> bool { true }
}



/// The constructor of a component.
pub type ComponentFactory = Arc<dyn Fn(ComponentSpec) -> Box<dyn Component> + Send + Sync>;

/// Maps type names to component constructors. Type names are case-sensitive.
#[derive(Clone, Default)]
pub struct ComponentRegistry {
    /// The constructors, by type name.
    factories : HashMap<String, ComponentFactory>,
}

impl ComponentRegistry {
    /// Constructor for an empty ComponentRegistry.
    #[inline]
    pub fn new() -> Self { Self::default() }

    /// Registers a new component type, replacing any existing one with the same name.
    ///
    /// # Arguments
    /// - `name`: The type name of the component.
    /// - `factory`: The function that creates a component from its definition.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: 'static + Fn(ComponentSpec) -> Box<dyn Component> + Send + Sync,
    {
        self.factories.insert(name.into(), Arc::new(factory));
    }

    /// Returns whether a component with the given type name is registered.
    #[inline]
    pub fn contains(&self, name: &str) -> bool { self.factories.contains_key(name) }

    /// Returns the names of all registered components, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(|name| name.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Creates the component with the given definition.
    ///
    /// # Arguments
    /// - `spec`: The definition of the component to create.
    /// - `host`: The name of this node (used in errors).
    ///
    /// # Returns
    /// A new component.
    ///
    /// # Errors
    /// This function errors with reason [`ErrorReason::InstructionsNotSupported`] if no such component is registered.
    pub fn create(&self, spec: ComponentSpec, host: &str) -> Result<Box<dyn Component>, ComponentError> {
        match self.factories.get(&spec.kind) {
            Some(factory) => Ok(factory(spec)),
            None          => Err(ComponentError::Dependency{ message: format!("Unknown component type '{}' (known types: {})", spec.kind, self.names().join(", ")), component: spec.kind, host: host.into(), reason: ErrorReason::InstructionsNotSupported }),
        }
    }
}

impl Debug for ComponentRegistry {
    fn fmt(&self, f: &mut Formatter<'_>) -> FResult {
        f.debug_struct("ComponentRegistry").field("factories", &self.names()).finish()
    }
}
