//! Narrator factory backed by pre-built narrators.

use std::collections::HashMap;
use std::sync::Arc;

use loremaster_core::ids::EntityId;
use loremaster_core::session::Character;
use loremaster_narrator::application::cache::NarratorFactory;
use loremaster_narrator::application::narrator::Narrator;
use uuid::Uuid;

use crate::narrator::ScriptedNarrator;

/// Hands out a named narrator for each configured major character and one
/// shared narrator for everyone else.
#[derive(Debug)]
pub struct ScriptedFactory {
    dedicated: HashMap<EntityId, Arc<ScriptedNarrator>>,
    shared: Arc<ScriptedNarrator>,
}

impl ScriptedFactory {
    /// A factory whose every narrator is `shared`.
    #[must_use]
    pub fn new(shared: Arc<ScriptedNarrator>) -> Self {
        Self {
            dedicated: HashMap::new(),
            shared,
        }
    }

    /// Gives `entity_id` its own narrator.
    #[must_use]
    pub fn with_dedicated(mut self, entity_id: &str, narrator: Arc<ScriptedNarrator>) -> Self {
        self.dedicated.insert(EntityId::new(entity_id), narrator);
        self
    }
}

impl NarratorFactory for ScriptedFactory {
    fn dedicated(&self, _session_id: Uuid, character: &Character) -> Arc<dyn Narrator> {
        match self.dedicated.get(&character.id) {
            Some(narrator) => Arc::clone(narrator) as Arc<dyn Narrator>,
            None => Arc::clone(&self.shared) as Arc<dyn Narrator>,
        }
    }

    fn shared(&self, _session_id: Uuid) -> Arc<dyn Narrator> {
        Arc::clone(&self.shared) as Arc<dyn Narrator>
    }
}
