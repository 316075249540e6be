//! End-to-end scenarios through the orchestrator, with scripted narrators.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use loremaster_core::conversation::MessageRole;
use loremaster_core::error::DomainError;
use loremaster_core::ids::EntityId;
use loremaster_core::session::GameSession;
use loremaster_dispatch::domain::events::{BroadcastEvent, BroadcastKind};
use loremaster_narrator::application::narrator::Narrator;
use loremaster_narrator::domain::request::NarratorRequest;
use loremaster_narrator::domain::role::NarratorRole;
use loremaster_narrator::domain::stream::{NarratorStream, StreamEvent};
use loremaster_narrator::domain::tools::{Tool, ToolScope};
use loremaster_narrator::error::NarratorError;
use loremaster_orchestration::application::combat_loop::{
    LoopStop, fallback_suggestion, run_auto_continuation,
};
use loremaster_orchestration::application::orchestrator::{Orchestrator, TurnReport};
use loremaster_orchestration::application::services::{EngineParts, EngineServices, NarratorSet};
use loremaster_orchestration::application::step::HaltReason;
use loremaster_orchestration::application::transition::COMBAT_START_FALLBACK;
use loremaster_orchestration::config::EngineConfig;
use loremaster_orchestration::domain::context::{OrchestrationContext, TurnEvent};
use loremaster_orchestration::error::OrchestrationError;
use loremaster_store::memory_store::InMemorySessionStore;
use loremaster_test_support::{
    FixedClock, MockRng, ScriptAction, ScriptedFactory, ScriptedNarrator, ScriptedSummarizer,
    fixtures,
};
use serde_json::json;
use tokio::sync::broadcast;
use uuid::Uuid;

struct Doubles {
    narrative: Arc<ScriptedNarrator>,
    combat: Arc<ScriptedNarrator>,
    eldrin: Arc<ScriptedNarrator>,
    shared: Arc<ScriptedNarrator>,
    summarizer: Arc<ScriptedSummarizer>,
}

impl Default for Doubles {
    fn default() -> Self {
        Self {
            narrative: Arc::new(ScriptedNarrator::new("The wind stirs the reeds.")),
            combat: Arc::new(ScriptedNarrator::new("Blades clash.")),
            eldrin: Arc::new(ScriptedNarrator::new("Eldrin nods.")),
            shared: Arc::new(ScriptedNarrator::new("Mira smiles.")),
            summarizer: Arc::new(ScriptedSummarizer::new("The party's calm is broken.")),
        }
    }
}

struct Harness {
    orchestrator: Orchestrator,
    session_id: Uuid,
    doubles: Doubles,
}

impl Harness {
    async fn new(session: GameSession, doubles: Doubles) -> Self {
        let factory = ScriptedFactory::new(Arc::clone(&doubles.shared))
            .with_dedicated("eldrin", Arc::clone(&doubles.eldrin));
        let services = EngineServices::assemble(EngineParts {
            store: Arc::new(InMemorySessionStore::new()),
            narrators: NarratorSet {
                narrative: doubles.narrative.clone(),
                combat: doubles.combat.clone(),
            },
            factory: Arc::new(factory),
            summarizer: doubles.summarizer.clone(),
            clock: Arc::new(FixedClock(Utc::now())),
            rng: Arc::new(Mutex::new(MockRng)),
            config: EngineConfig::default(),
        })
        .unwrap();
        let orchestrator = Orchestrator::new(services);
        let session_id = orchestrator.open_session(session).await.unwrap();
        Self {
            orchestrator,
            session_id,
            doubles,
        }
    }

    async fn session(&self) -> GameSession {
        self.orchestrator
            .services()
            .reload(self.session_id)
            .await
            .unwrap()
    }

    async fn input(&self, text: &str) -> TurnReport {
        self.orchestrator
            .process_input(self.session_id, text)
            .await
            .unwrap()
    }

    async fn drain(&self, receiver: &mut broadcast::Receiver<BroadcastEvent>) -> Vec<BroadcastKind> {
        self.orchestrator
            .services()
            .dispatcher
            .wait_for_completion()
            .await;
        let mut kinds = Vec::new();
        while let Ok(event) = receiver.try_recv() {
            kinds.push(event.kind);
        }
        kinds
    }
}

/// The ambush in combat with the turn handed to the participant at `index`
/// in initiative order (hero, Eldrin, goblin).
fn in_combat_at(index: usize) -> GameSession {
    let mut session = fixtures::ambush_in_combat();
    for _ in 0..index {
        session.combat.advance_turn().unwrap();
    }
    session
}

fn transitions(events: &[TurnEvent]) -> Vec<(NarratorRole, NarratorRole, String)> {
    events
        .iter()
        .filter_map(|e| match e {
            TurnEvent::Transition { from, to, summary } => Some((*from, *to, summary.clone())),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn test_safety_cap_stops_stuck_narrator_with_combat_active() {
    // Arrange
    let harness = Harness::new(in_combat_at(2), Doubles::default()).await;
    let session = harness.session().await;

    // Act
    let (ctx, exit) = run_auto_continuation(
        harness.orchestrator.services(),
        OrchestrationContext::new("", session),
    )
    .await
    .unwrap();

    // Assert
    assert_eq!(exit.iterations, 50);
    assert_eq!(exit.stop, LoopStop::CapReached);
    assert_eq!(harness.doubles.combat.calls(), 50);
    assert!(ctx.session.combat.is_active);
    assert!(matches!(
        ctx.events.last(),
        Some(TurnEvent::LoopCapReached { iterations: 50 })
    ));
    let requests = harness.doubles.combat.requests();
    assert!(!requests[0].input.contains("already asked"));
    assert!(requests[1].input.contains("already asked"));
}

#[tokio::test]
async fn test_ally_turn_yields_one_suggestion_and_no_mutation() {
    // Arrange
    let doubles = Doubles {
        eldrin: Arc::new(ScriptedNarrator::repeating(vec![
            ScriptAction::call("apply_hp_delta", json!({ "entity_id": "goblin", "delta": -5 })),
            ScriptAction::say("I'll circle left and loose an arrow at the goblin."),
        ])),
        ..Doubles::default()
    };
    let harness = Harness::new(in_combat_at(1), doubles).await;
    let mut receiver = harness.orchestrator.subscribe(harness.session_id);
    let before = harness.session().await;

    // Act
    let (ctx, exit) = run_auto_continuation(
        harness.orchestrator.services(),
        OrchestrationContext::new("", before.clone()),
    )
    .await
    .unwrap();

    // Assert
    assert_eq!(exit.stop, LoopStop::AllyDecision(EntityId::new("eldrin")));
    assert_eq!(exit.iterations, 1);
    assert_eq!(harness.doubles.combat.calls(), 0);

    let after = harness.session().await;
    assert_eq!(after.version, before.version);
    assert_eq!(after.conversation.len(), before.conversation.len());
    assert_eq!(after.combat, before.combat);

    let request = &harness.doubles.eldrin.requests()[0];
    assert_eq!(request.role, NarratorRole::AllySuggestion);
    assert!(request.tools.is_empty());
    assert!(harness.doubles.eldrin.tool_results().iter().all(|r| r.is_blocked()));

    let suggestions: Vec<BroadcastKind> = harness
        .drain(&mut receiver)
        .await
        .into_iter()
        .filter(|k| !matches!(k, BroadcastKind::System { .. }))
        .collect();
    assert_eq!(
        suggestions,
        vec![BroadcastKind::Suggestion {
            entity_id: EntityId::new("eldrin"),
            suggestion: "I'll circle left and loose an arrow at the goblin.".to_owned(),
        }]
    );
    assert!(ctx.events.iter().any(|e| matches!(e, TurnEvent::Suggestion { .. })));
}

#[tokio::test]
async fn test_silent_ally_still_offers_one_suggestion() {
    // Arrange
    let doubles = Doubles {
        eldrin: Arc::new(ScriptedNarrator::failing("provider offline")),
        ..Doubles::default()
    };
    let harness = Harness::new(in_combat_at(1), doubles).await;
    let mut receiver = harness.orchestrator.subscribe(harness.session_id);

    // Act
    let (ctx, exit) = run_auto_continuation(
        harness.orchestrator.services(),
        OrchestrationContext::new("", harness.session().await),
    )
    .await
    .unwrap();

    // Assert
    assert_eq!(exit.stop, LoopStop::AllyDecision(EntityId::new("eldrin")));
    let suggestions: Vec<BroadcastKind> = harness
        .drain(&mut receiver)
        .await
        .into_iter()
        .filter(|k| matches!(k, BroadcastKind::Suggestion { .. }))
        .collect();
    assert_eq!(
        suggestions,
        vec![BroadcastKind::Suggestion {
            entity_id: EntityId::new("eldrin"),
            suggestion: "Eldrin awaits your command.".to_owned(),
        }]
    );
    assert!(ctx.events.iter().any(|e| matches!(
        e,
        TurnEvent::Suggestion { text, .. } if *text == fallback_suggestion("Eldrin")
    )));
}

#[tokio::test]
async fn test_end_combat_waits_for_the_narrator() {
    // Arrange
    let mut session = in_combat_at(0);
    session
        .combat
        .remove_participant(&EntityId::new("goblin"))
        .unwrap();
    let doubles = Doubles {
        combat: Arc::new(
            ScriptedNarrator::new("The last goblin flees.").turn(vec![ScriptAction::say(
                "The goblin lies still.",
            )]),
        ),
        ..Doubles::default()
    };
    let harness = Harness::new(session, doubles).await;

    // Act
    let (ctx, exit) = run_auto_continuation(
        harness.orchestrator.services(),
        OrchestrationContext::new("", harness.session().await),
    )
    .await
    .unwrap();

    // Assert
    assert_eq!(exit.stop, LoopStop::EndPrompted);
    assert_eq!(exit.iterations, 1);
    assert!(ctx.session.combat.is_active);
    assert!(harness.doubles.combat.requests()[0].input.contains("call end_combat"));
}

#[tokio::test]
async fn test_addressed_character_answers_and_pipeline_halts() {
    // Arrange
    let harness = Harness::new(fixtures::ambush_session(), Doubles::default()).await;

    // Act
    let report = harness.input("Mira, any rumours tonight?").await;

    // Assert
    assert_eq!(
        report.halted,
        Some(HaltReason::DialogueHandled {
            targets: vec![EntityId::new("mira")]
        })
    );
    assert!(report.narrator.is_none());
    assert_eq!(harness.doubles.narrative.calls(), 0);

    let request = &harness.doubles.shared.requests()[0];
    assert_eq!(request.role, NarratorRole::Dialogue);
    assert!(request.persona.as_deref().unwrap().starts_with("You are Mira."));
    assert_eq!(
        request.tools,
        ToolScope::for_role(NarratorRole::Dialogue).tools().collect::<Vec<Tool>>()
    );

    let session = report.session;
    assert_eq!(
        session.dialogue.as_ref().unwrap().target_ids,
        vec![EntityId::new("mira")]
    );
    let roles: Vec<(String, MessageRole)> = session
        .conversation
        .iter()
        .map(|m| (m.speaker.clone(), m.role))
        .collect();
    assert_eq!(
        roles,
        vec![
            ("Aria".to_owned(), MessageRole::Player),
            ("Mira".to_owned(), MessageRole::Npc),
        ]
    );
}

#[tokio::test]
async fn test_unaddressed_input_releases_dialogue_and_reaches_narrator() {
    let harness = Harness::new(fixtures::ambush_session(), Doubles::default()).await;
    harness.input("@Mira what's on the menu?").await;

    let report = harness.input("I head for the door.").await;

    assert!(report.halted.is_none());
    assert_eq!(report.narrator, Some(NarratorRole::Narrative));
    assert!(report.session.dialogue.is_none());
    assert_eq!(harness.doubles.narrative.calls(), 1);
}

#[tokio::test]
async fn test_dialogue_failure_is_reported_not_raised() {
    let doubles = Doubles {
        shared: Arc::new(ScriptedNarrator::failing("model offline")),
        ..Doubles::default()
    };
    let harness = Harness::new(fixtures::ambush_session(), doubles).await;

    let report = harness.input("Mira, hello there").await;

    assert!(report.halted.is_some());
    assert!(report.events.iter().any(TurnEvent::is_error));
}

#[tokio::test]
async fn test_narrative_failure_is_broadcast_and_raised() {
    let doubles = Doubles {
        narrative: Arc::new(ScriptedNarrator::failing("model offline")),
        ..Doubles::default()
    };
    let harness = Harness::new(fixtures::ambush_session(), doubles).await;
    let mut receiver = harness.orchestrator.subscribe(harness.session_id);

    let result = harness
        .orchestrator
        .process_input(harness.session_id, "I look around.")
        .await;

    assert!(matches!(
        result,
        Err(OrchestrationError::NarratorFailed {
            role: NarratorRole::Narrative,
            ..
        })
    ));
    let kinds = harness.drain(&mut receiver).await;
    assert!(kinds.iter().any(|k| matches!(k, BroadcastKind::Error { .. })));
}

#[tokio::test]
async fn test_combat_start_bridges_with_fallback_when_summarizer_fails() {
    // Arrange
    let doubles = Doubles {
        narrative: Arc::new(ScriptedNarrator::new("Quiet.").turn(vec![
            ScriptAction::say("A goblin leaps from the reeds!"),
            ScriptAction::call(
                "start_combat",
                json!({ "participants": [
                    { "entity_id": "hero", "entity_type": "player", "faction": "player", "initiative": 15 },
                    { "entity_id": "goblin", "entity_type": "monster", "faction": "enemy", "initiative": 12 }
                ]}),
            ),
        ])),
        summarizer: Arc::new(ScriptedSummarizer::always_failing()),
        ..Doubles::default()
    };
    let harness = Harness::new(fixtures::ambush_session(), doubles).await;

    // Act
    let report = harness.input("I search the mill.").await;

    // Assert
    assert_eq!(
        transitions(&report.events),
        vec![(
            NarratorRole::Narrative,
            NarratorRole::Combat,
            COMBAT_START_FALLBACK.to_owned()
        )]
    );
    assert_eq!(harness.doubles.summarizer.calls(), 2);
    assert!(
        report
            .session
            .conversation
            .iter()
            .any(|m| m.role == MessageRole::System && m.content == COMBAT_START_FALLBACK)
    );
    // Opening narration only; the hero holds the first turn.
    assert_eq!(harness.doubles.combat.calls(), 1);
    assert!(report.session.combat.is_active);
}

#[tokio::test]
async fn test_ambush_at_the_old_mill() {
    // Arrange
    let start = ScriptAction::call(
        "start_combat",
        json!({ "participants": [
            { "entity_id": "goblin", "entity_type": "monster", "faction": "enemy", "initiative": 12 },
            { "entity_id": "hero", "entity_type": "player", "faction": "player", "initiative": 15 },
            { "entity_id": "eldrin", "entity_type": "npc", "faction": "ally", "initiative": 14 }
        ]}),
    );
    let next_turn = || ScriptAction::call("next_turn", json!({}));
    let doubles = Doubles {
        narrative: Arc::new(
            ScriptedNarrator::new("The mill falls quiet again.")
                .turn(vec![ScriptAction::say("Goblins burst from the reeds!"), start]),
        ),
        combat: Arc::new(
            ScriptedNarrator::new("Steel rings.")
                // Opening narration.
                .turn(vec![ScriptAction::say("Steel flashes in the dusk.")])
                // Aria's attack.
                .turn(vec![
                    ScriptAction::call(
                        "apply_hp_delta",
                        json!({ "entity_id": "goblin", "delta": -3 }),
                    ),
                    next_turn(),
                ])
                // Eldrin's approved action.
                .turn(vec![ScriptAction::say("Eldrin's arrow flies wide."), next_turn()])
                // The goblin's turn.
                .turn(vec![ScriptAction::say("The goblin lunges."), next_turn()])
                // Aria's finishing blow.
                .turn(vec![ScriptAction::call(
                    "apply_hp_delta",
                    json!({ "entity_id": "goblin", "delta": -100 }),
                )])
                // End of combat.
                .turn(vec![
                    ScriptAction::say("The goblin falls."),
                    ScriptAction::call("end_combat", json!({ "reason": "goblin slain" })),
                ]),
        ),
        eldrin: Arc::new(ScriptedNarrator::new("I'll loose an arrow at the goblin.")),
        summarizer: Arc::new(ScriptedSummarizer::new("Goblins ambush the party at the mill.")),
        ..Doubles::default()
    };
    let harness = Harness::new(fixtures::ambush_session(), doubles).await;

    // Act / Assert: the ambush starts and the hero acts first.
    let report = harness.input("We search the mill for supplies.").await;
    assert_eq!(
        transitions(&report.events),
        vec![(
            NarratorRole::Narrative,
            NarratorRole::Combat,
            "Goblins ambush the party at the mill.".to_owned()
        )]
    );
    let combat = &report.session.combat;
    assert!(combat.is_active);
    assert_eq!((combat.turn_index, combat.round_number), (0, 1));
    assert_eq!(
        combat.current().unwrap().entity_id,
        EntityId::new("hero")
    );

    // Aria attacks; the turn passes to Eldrin, who only suggests.
    let report = harness.input("I swing at the goblin.").await;
    assert_eq!(
        report.halted,
        Some(HaltReason::AllyDecision {
            entity_id: EntityId::new("eldrin")
        })
    );
    assert_eq!(report.narrator, Some(NarratorRole::Combat));
    assert_eq!(report.session.character(&EntityId::new("goblin")).unwrap().hp, 4);

    // The player approves; the goblin's turn resolves automatically and
    // the turn wraps back to Aria in round two.
    let report = harness.input("Eldrin, do it.").await;
    assert!(report.halted.is_none());
    let combat = &report.session.combat;
    assert_eq!((combat.turn_index, combat.round_number), (0, 2));
    assert!(report.session.dialogue.is_none());

    // The goblin drops, leaves the rotation, and the narrator closes the
    // encounter before the story resumes.
    let report = harness.input("I finish the goblin.").await;
    let session = &report.session;
    assert_eq!(session.character(&EntityId::new("goblin")).unwrap().hp, 0);
    let active: Vec<EntityId> = session
        .combat
        .active_participants()
        .map(|p| p.entity_id.clone())
        .collect();
    assert_eq!(active, vec![EntityId::new("hero"), EntityId::new("eldrin")]);
    assert!(!session.combat.is_active);
    assert_eq!(
        transitions(&report.events)
            .into_iter()
            .map(|(from, to, _)| (from, to))
            .collect::<Vec<_>>(),
        vec![(NarratorRole::Combat, NarratorRole::Narrative)]
    );

    let combat_inputs: Vec<String> = harness
        .doubles
        .combat
        .requests()
        .into_iter()
        .map(|r| r.input)
        .collect();
    assert_eq!(combat_inputs.len(), 6);
    assert!(combat_inputs[3].starts_with("Round 1. It is Goblin's turn (enemy)."));
    assert!(combat_inputs[5].contains("call end_combat"));
    let aftermath = harness.doubles.narrative.requests().pop().unwrap();
    assert!(aftermath.input.contains("aftermath"));
}

#[tokio::test]
async fn test_removing_a_character_evicts_its_narrator() {
    let harness = Harness::new(fixtures::ambush_session(), Doubles::default()).await;
    harness.input("Eldrin, what do you see?").await;
    assert_eq!(harness.orchestrator.services().cache.dedicated_count(), 1);

    harness
        .orchestrator
        .remove_character(harness.session_id, &EntityId::new("eldrin"))
        .await
        .unwrap();

    let session = harness.session().await;
    assert_eq!(harness.orchestrator.services().cache.dedicated_count(), 0);
    assert!(session.party.is_empty());
    assert!(session.dialogue.is_none());
}

#[tokio::test]
async fn test_end_session_tears_everything_down() {
    let harness = Harness::new(fixtures::ambush_session(), Doubles::default()).await;
    harness.input("Mira, good evening.").await;

    let last = harness
        .orchestrator
        .end_session(harness.session_id)
        .await
        .unwrap();

    assert_eq!(last.conversation.len(), 2);
    assert_eq!(harness.orchestrator.services().cache.shared_count(), 0);
    let reopened = harness
        .orchestrator
        .services()
        .reload(harness.session_id)
        .await;
    assert_eq!(
        reopened.unwrap_err(),
        OrchestrationError::Domain(DomainError::SessionNotFound(harness.session_id))
    );
}

/// Counts how many `process` calls overlap.
#[derive(Debug, Default)]
struct OverlapNarrator {
    active: AtomicUsize,
    peak: AtomicUsize,
}

#[async_trait]
impl Narrator for OverlapNarrator {
    async fn process(&self, _request: NarratorRequest) -> Result<NarratorStream, NarratorError> {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(50)).await;
        self.active.fetch_sub(1, Ordering::SeqCst);
        Ok(NarratorStream::from_events(vec![
            StreamEvent::Chunk("Mist curls over the millpond.".to_owned()),
            StreamEvent::Complete(json!({})),
        ]))
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_inputs_for_one_session_run_one_at_a_time() {
    // Arrange
    let narrative = Arc::new(OverlapNarrator::default());
    let doubles = Doubles::default();
    let services = EngineServices::assemble(EngineParts {
        store: Arc::new(InMemorySessionStore::new()),
        narrators: NarratorSet {
            narrative: narrative.clone(),
            combat: doubles.combat.clone(),
        },
        factory: Arc::new(ScriptedFactory::new(Arc::clone(&doubles.shared))),
        summarizer: doubles.summarizer.clone(),
        clock: Arc::new(FixedClock(Utc::now())),
        rng: Arc::new(Mutex::new(MockRng)),
        config: EngineConfig::default(),
    })
    .unwrap();
    let orchestrator = Arc::new(Orchestrator::new(services));
    let session_id = orchestrator
        .open_session(fixtures::ambush_session())
        .await
        .unwrap();

    // Act
    let turns: Vec<_> = ["I look around.", "I listen at the door."]
        .into_iter()
        .map(|input| {
            let orchestrator = Arc::clone(&orchestrator);
            tokio::spawn(async move { orchestrator.process_input(session_id, input).await })
        })
        .collect();
    for turn in turns {
        turn.await.unwrap().unwrap();
    }

    // Assert
    assert_eq!(narrative.peak.load(Ordering::SeqCst), 1);
    let session = orchestrator.services().reload(session_id).await.unwrap();
    let speakers: Vec<MessageRole> = session.conversation.iter().map(|m| m.role).collect();
    assert_eq!(
        speakers,
        vec![
            MessageRole::Player,
            MessageRole::Narrator,
            MessageRole::Player,
            MessageRole::Narrator,
        ]
    );
}
