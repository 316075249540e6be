//! The standard handler set, one handler per command category.

mod broadcast;
mod combat;
mod conversation;
mod dice;
mod entity;
mod inventory;
mod progress;
mod world;

use std::sync::{Arc, Mutex};

use loremaster_core::clock::Clock;
use loremaster_core::rng::DeterministicRng;

pub use broadcast::BroadcastHandler;
pub use combat::CombatHandler;
pub use conversation::{ConversationHandler, DialogueHandler};
pub use dice::DiceHandler;
pub use entity::EntityHandler;
pub use inventory::InventoryHandler;
pub use progress::{PartyHandler, QuestHandler};
pub use world::{LocationHandler, TimeHandler};

use crate::application::broadcast::BroadcastHub;
use crate::application::dispatcher::DispatcherBuilder;
use crate::domain::commands::CommandCategory;
use crate::error::DispatchError;

/// Shared collaborators the standard handlers need.
#[derive(Clone)]
pub struct HandlerDeps {
    /// Wall clock for message and dialogue timestamps.
    pub clock: Arc<dyn Clock>,
    /// Dice source.
    pub rng: Arc<Mutex<dyn DeterministicRng>>,
    /// Session event stream.
    pub hub: Arc<BroadcastHub>,
}

/// Registers one handler for every command category.
///
/// # Errors
///
/// Returns `DispatchError::DuplicateHandler` if the builder already has a
/// handler for any of the categories.
pub fn register_standard_handlers(
    builder: &mut DispatcherBuilder,
    deps: &HandlerDeps,
) -> Result<(), DispatchError> {
    builder
        .register(CommandCategory::Entity, Arc::new(EntityHandler))?
        .register(
            CommandCategory::Dice,
            Arc::new(DiceHandler::new(Arc::clone(&deps.rng))),
        )?
        .register(CommandCategory::Inventory, Arc::new(InventoryHandler))?
        .register(CommandCategory::Time, Arc::new(TimeHandler))?
        .register(
            CommandCategory::Broadcast,
            Arc::new(BroadcastHandler::new(Arc::clone(&deps.hub))),
        )?
        .register(CommandCategory::Location, Arc::new(LocationHandler))?
        .register(CommandCategory::Combat, Arc::new(CombatHandler))?
        .register(CommandCategory::Quest, Arc::new(QuestHandler))?
        .register(CommandCategory::Party, Arc::new(PartyHandler))?
        .register(
            CommandCategory::Conversation,
            Arc::new(ConversationHandler::new(Arc::clone(&deps.clock))),
        )?
        .register(
            CommandCategory::Dialogue,
            Arc::new(DialogueHandler::new(Arc::clone(&deps.clock))),
        )?;
    Ok(())
}
