//  SPEC.rs
//    by Lut99
//
//  Created:
//    05 Oct 2026, 13:20:03
//  Last edited:
//    12 Oct 2026, 14:33:26
//  Auto updated?
//    Yes
//
//  Description:
//!   Contains (public) interfaces and structs for the `vc-api` crate.
//

use std::sync::Arc;

use async_trait::async_trait;
use log::info;
use parking_lot::RwLock;

use specifications::instructions::Instructions;
use specifications::item::Item;

pub use crate::errors::InstructionsError;
use crate::store::StateStore;


/***** LIBRARY *****/
/// Something that can act on instructions received through the API.
///
/// Handlers should return quickly; long-running work is expected to happen in the background.
#[async_trait]
pub trait InstructionsHandler: Send + Sync {
    /// Handles the given instructions.
    ///
    /// # Arguments
    /// - `instructions`: The instructions to handle, wrapped in an Item that carries the ID of the state they relate to.
    ///
    /// # Errors
    /// This function errors with [`InstructionsError::Unsupported`] if the instructions cannot be handled by this node, or
    /// [`InstructionsError::Failed`] if handling them went wrong.
    async fn handle(&self, instructions: &Item<Instructions>) -> Result<(), InstructionsError>;
}



/// Defines the context for all of the warp paths.
pub struct Context {
    /// The store with the state objects of this node.
    pub store : Arc<StateStore>,
    /// The handler for incoming instructions. The node is "online" once one is registered.
    handler   : RwLock<Option<Arc<dyn InstructionsHandler>>>,
}

impl Context {
    /// Constructor for the Context.
    ///
    /// # Arguments
    /// - `store`: The StateStore that the state paths operate on.
    ///
    /// # Returns
    /// A new Context that has no handler registered yet (i.e., is not online).
    #[inline]
    pub fn new(store: Arc<StateStore>) -> Self {
        Self {
            store,
            handler : RwLock::new(None),
        }
    }



    /// Registers the given handler, bringing the node online.
    pub fn register_handler(&self, handler: Arc<dyn InstructionsHandler>) {
        info!("Instructions handler registered; node is online");
        *self.handler.write() = Some(handler);
    }

    /// Removes the handler, taking the node offline again.
    pub fn unregister_handler(&self) {
        info!("Instructions handler removed; node is offline");
        *self.handler.write() = None;
    }

    /// Returns the current handler, if any.
    #[inline]
    pub fn handler(&self) -> Option<Arc<dyn InstructionsHandler>> { self.handler.read().clone() }

    /// Returns whether this node is ready to receive instructions.
    #[inline]
    pub fn is_online(&self) -> bool { self.handler.read().is_some() }
}
