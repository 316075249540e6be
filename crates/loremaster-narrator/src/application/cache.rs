//! Narrator Lifecycle Cache.
//!
//! Major characters get a dedicated narrator per session, so their private
//! context survives across turns. Minor characters share one narrator per
//! session and are told who they are through a persona block on each
//! request. Entries live until the character is removed or the session ends;
//! nothing is evicted for size.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use loremaster_core::ids::EntityId;
use loremaster_core::session::{Character, Importance};
use tracing::{debug, info};
use uuid::Uuid;

use super::narrator::Narrator;

/// Creates narrator instances on cache misses.
pub trait NarratorFactory: Send + Sync {
    /// A narrator dedicated to one major character.
    fn dedicated(&self, session_id: Uuid, character: &Character) -> Arc<dyn Narrator>;

    /// The narrator shared by a session's minor characters.
    fn shared(&self, session_id: Uuid) -> Arc<dyn Narrator>;
}

/// A narrator ready to voice a character.
#[derive(Clone)]
pub struct CharacterNarrator {
    /// The instance to invoke.
    pub narrator: Arc<dyn Narrator>,
    /// Persona block to send with each request; set for shared narrators.
    pub persona: Option<String>,
}

impl fmt::Debug for CharacterNarrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CharacterNarrator")
            .field("persona", &self.persona)
            .finish_non_exhaustive()
    }
}

/// Memoizes per-character narrators, keyed by session.
pub struct NarratorCache {
    factory: Arc<dyn NarratorFactory>,
    dedicated: Mutex<HashMap<(Uuid, EntityId), Arc<dyn Narrator>>>,
    shared: Mutex<HashMap<Uuid, Arc<dyn Narrator>>>,
}

impl fmt::Debug for NarratorCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NarratorCache")
            .field("dedicated", &self.dedicated_count())
            .field("shared", &self.shared_count())
            .finish_non_exhaustive()
    }
}

/// Renders the persona block handed to a shared narrator.
#[must_use]
pub fn persona_block(character: &Character) -> String {
    if character.persona.is_empty() {
        format!("You are {}.", character.name)
    } else {
        format!("You are {}. {}", character.name, character.persona)
    }
}

impl NarratorCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new(factory: Arc<dyn NarratorFactory>) -> Self {
        Self {
            factory,
            dedicated: Mutex::new(HashMap::new()),
            shared: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the narrator for a character, creating it on first use.
    pub fn narrator_for(&self, session_id: Uuid, character: &Character) -> CharacterNarrator {
        match character.importance {
            Importance::Major => {
                let mut dedicated = self
                    .dedicated
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner);
                let narrator = dedicated
                    .entry((session_id, character.id.clone()))
                    .or_insert_with(|| {
                        debug!(%session_id, entity_id = %character.id, "creating dedicated narrator");
                        self.factory.dedicated(session_id, character)
                    });
                CharacterNarrator {
                    narrator: Arc::clone(narrator),
                    persona: None,
                }
            }
            Importance::Minor => {
                let mut shared = self.shared.lock().unwrap_or_else(PoisonError::into_inner);
                let narrator = shared.entry(session_id).or_insert_with(|| {
                    debug!(%session_id, "creating shared narrator");
                    self.factory.shared(session_id)
                });
                CharacterNarrator {
                    narrator: Arc::clone(narrator),
                    persona: Some(persona_block(character)),
                }
            }
        }
    }

    /// Drops a character's dedicated narrator. Returns whether one existed.
    pub fn evict_character(&self, session_id: Uuid, entity_id: &EntityId) -> bool {
        let removed = self
            .dedicated
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&(session_id, entity_id.clone()))
            .is_some();
        if removed {
            info!(%session_id, %entity_id, "dedicated narrator evicted");
        }
        removed
    }

    /// Drops every narrator of a session. Returns how many were dropped.
    pub fn evict_session(&self, session_id: Uuid) -> usize {
        let mut dedicated = self
            .dedicated
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let before = dedicated.len();
        dedicated.retain(|(session, _), _| *session != session_id);
        let mut evicted = before - dedicated.len();
        drop(dedicated);

        if self
            .shared
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&session_id)
            .is_some()
        {
            evicted += 1;
        }
        info!(%session_id, evicted, "session narrators evicted");
        evicted
    }

    /// Number of dedicated narrators across all sessions.
    #[must_use]
    pub fn dedicated_count(&self) -> usize {
        self.dedicated
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Number of shared narrators across all sessions.
    #[must_use]
    pub fn shared_count(&self) -> usize {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use loremaster_core::combat::EntityType;

    use super::*;
    use crate::domain::request::NarratorRequest;
    use crate::domain::stream::NarratorStream;
    use crate::error::NarratorError;

    struct SilentNarrator;

    #[async_trait]
    impl Narrator for SilentNarrator {
        async fn process(&self, _request: NarratorRequest) -> Result<NarratorStream, NarratorError> {
            Ok(NarratorStream::from_events(Vec::new()))
        }
    }

    #[derive(Default)]
    struct CountingFactory {
        created: AtomicUsize,
    }

    impl NarratorFactory for CountingFactory {
        fn dedicated(&self, _session_id: Uuid, _character: &Character) -> Arc<dyn Narrator> {
            self.created.fetch_add(1, Ordering::SeqCst);
            Arc::new(SilentNarrator)
        }

        fn shared(&self, _session_id: Uuid) -> Arc<dyn Narrator> {
            self.created.fetch_add(1, Ordering::SeqCst);
            Arc::new(SilentNarrator)
        }
    }

    fn eldrin() -> Character {
        Character::new("eldrin", "Eldrin", EntityType::Npc, 16).with_importance(Importance::Major)
    }

    fn minor(id: &str, name: &str) -> Character {
        Character::new(id, name, EntityType::Npc, 6).with_persona("Grumbles a lot.")
    }

    #[test]
    fn test_major_character_reuses_dedicated_instance() {
        // Arrange
        let factory = Arc::new(CountingFactory::default());
        let cache = NarratorCache::new(factory.clone());
        let session_id = Uuid::new_v4();

        // Act
        let first = cache.narrator_for(session_id, &eldrin());
        let second = cache.narrator_for(session_id, &eldrin());

        // Assert
        assert!(Arc::ptr_eq(&first.narrator, &second.narrator));
        assert!(first.persona.is_none());
        assert_eq!(factory.created.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_minor_characters_share_one_instance_with_own_persona() {
        let factory = Arc::new(CountingFactory::default());
        let cache = NarratorCache::new(factory.clone());
        let session_id = Uuid::new_v4();

        let guard = cache.narrator_for(session_id, &minor("guard", "Guard"));
        let smith = cache.narrator_for(session_id, &minor("smith", "Smith"));

        assert!(Arc::ptr_eq(&guard.narrator, &smith.narrator));
        assert_eq!(guard.persona.as_deref(), Some("You are Guard. Grumbles a lot."));
        assert_eq!(smith.persona.as_deref(), Some("You are Smith. Grumbles a lot."));
        assert_eq!(cache.shared_count(), 1);
    }

    #[test]
    fn test_sessions_do_not_share_instances() {
        let cache = NarratorCache::new(Arc::new(CountingFactory::default()));

        let a = cache.narrator_for(Uuid::new_v4(), &eldrin());
        let b = cache.narrator_for(Uuid::new_v4(), &eldrin());

        assert!(!Arc::ptr_eq(&a.narrator, &b.narrator));
        assert_eq!(cache.dedicated_count(), 2);
    }

    #[test]
    fn test_evict_character_forces_fresh_instance() {
        // Arrange
        let factory = Arc::new(CountingFactory::default());
        let cache = NarratorCache::new(factory.clone());
        let session_id = Uuid::new_v4();
        cache.narrator_for(session_id, &eldrin());

        // Act
        let evicted = cache.evict_character(session_id, &EntityId::new("eldrin"));
        cache.narrator_for(session_id, &eldrin());

        // Assert
        assert!(evicted);
        assert_eq!(factory.created.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_evict_session_drops_dedicated_and_shared() {
        let cache = NarratorCache::new(Arc::new(CountingFactory::default()));
        let session_id = Uuid::new_v4();
        let other = Uuid::new_v4();
        cache.narrator_for(session_id, &eldrin());
        cache.narrator_for(session_id, &minor("guard", "Guard"));
        cache.narrator_for(other, &eldrin());

        let evicted = cache.evict_session(session_id);

        assert_eq!(evicted, 2);
        assert_eq!(cache.dedicated_count(), 1);
        assert_eq!(cache.shared_count(), 0);
    }
}
