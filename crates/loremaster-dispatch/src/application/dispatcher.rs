//! The command dispatcher.
//!
//! Every `(session, category)` pair gets its own lane: a worker task fed by an
//! unbounded channel. Commands on one lane run strictly in submission order;
//! different lanes run concurrently, so a broadcast and a combat update
//! triggered by the same tool call may finish in either order.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use loremaster_core::error::DomainError;
use loremaster_core::repository::SessionStore;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::application::handler::{CommandHandler, HandlerContext};
use crate::domain::commands::{Command, CommandCategory};
use crate::domain::results::CommandResult;
use crate::error::DispatchError;

type LaneKey = (Uuid, CommandCategory);
type Reply = oneshot::Sender<Result<CommandResult, DispatchError>>;

/// Recorded result of one command in a batch.
#[derive(Debug, Clone)]
pub struct CommandOutcome {
    /// Correlation id of the command.
    pub correlation_id: Uuid,
    /// Type name of the command.
    pub command_type: &'static str,
    /// What the handler returned.
    pub result: Result<CommandResult, DispatchError>,
}

/// Outcomes of a `submit_and_wait` batch, including triggered follow-ups, in
/// completion order.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    outcomes: Vec<CommandOutcome>,
}

impl BatchReport {
    /// All outcomes in completion order.
    #[must_use]
    pub fn outcomes(&self) -> &[CommandOutcome] {
        &self.outcomes
    }

    /// Number of commands that completed.
    #[must_use]
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    /// Whether the batch was empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// The first failure, if any command failed.
    #[must_use]
    pub fn first_error(&self) -> Option<&DispatchError> {
        self.outcomes.iter().find_map(|o| o.result.as_ref().err())
    }

    /// The first outcome recorded for a correlation id.
    #[must_use]
    pub fn result_for(&self, correlation_id: Uuid) -> Option<&Result<CommandResult, DispatchError>> {
        self.outcomes
            .iter()
            .find(|o| o.correlation_id == correlation_id)
            .map(|o| &o.result)
    }

    /// Collapses the batch into its results.
    ///
    /// # Errors
    ///
    /// Returns the first failure if any command failed.
    pub fn into_results(self) -> Result<Vec<CommandResult>, DispatchError> {
        self.outcomes.into_iter().map(|o| o.result).collect()
    }
}

struct Batch {
    pending: watch::Sender<usize>,
    outcomes: Mutex<Vec<CommandOutcome>>,
}

impl Batch {
    fn new() -> Self {
        let (pending, _) = watch::channel(0);
        Self {
            pending,
            outcomes: Mutex::new(Vec::new()),
        }
    }

    fn record(&self, outcome: CommandOutcome) {
        self.outcomes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(outcome);
    }
}

struct Job {
    command: Command,
    batch: Option<Arc<Batch>>,
    reply: Option<Reply>,
}

struct Inner {
    handlers: HashMap<CommandCategory, Arc<dyn CommandHandler>>,
    store: Arc<dyn SessionStore>,
    lanes: Mutex<HashMap<LaneKey, mpsc::UnboundedSender<Job>>>,
    in_flight: watch::Sender<usize>,
}

impl Inner {
    fn enqueue(self: &Arc<Self>, job: Job) -> Result<(), DispatchError> {
        let key = (job.command.session_id, job.command.category());
        self.in_flight.send_modify(|n| *n += 1);
        if let Some(batch) = &job.batch {
            batch.pending.send_modify(|n| *n += 1);
        }

        let mut lanes = self.lanes.lock().unwrap_or_else(PoisonError::into_inner);
        let sender = lanes.entry(key).or_insert_with(|| self.spawn_lane(key));
        let Err(mpsc::error::SendError(job)) = sender.send(job) else {
            return Ok(());
        };

        // The worker is gone; replace the lane and retry once.
        let sender = self.spawn_lane(key);
        let retry = sender.send(job);
        lanes.insert(key, sender);
        if let Err(mpsc::error::SendError(job)) = retry {
            self.in_flight.send_modify(|n| *n -= 1);
            if let Some(batch) = &job.batch {
                batch.pending.send_modify(|n| *n -= 1);
            }
            return Err(DispatchError::LaneClosed(key.0));
        }
        Ok(())
    }

    fn spawn_lane(self: &Arc<Self>, key: LaneKey) -> mpsc::UnboundedSender<Job> {
        let (sender, mut receiver) = mpsc::unbounded_channel::<Job>();
        let inner = Arc::clone(self);
        tokio::spawn(async move {
            debug!(session_id = %key.0, category = %key.1, "command lane started");
            while let Some(job) = receiver.recv().await {
                inner.process(job).await;
            }
            debug!(session_id = %key.0, category = %key.1, "command lane stopped");
        });
        sender
    }

    async fn process(self: &Arc<Self>, job: Job) {
        let Job {
            command,
            batch,
            reply,
        } = job;

        let (result, triggered) = self.run(&command).await;

        match &result {
            Ok(_) => debug!(
                correlation_id = %command.correlation_id,
                command_type = command.command_type(),
                "command handled"
            ),
            Err(err) => warn!(
                correlation_id = %command.correlation_id,
                command_type = command.command_type(),
                error = %err,
                "command failed"
            ),
        }

        // The parent is recorded first so it precedes its follow-ups in the
        // report. Follow-ups join the batch before the parent is counted as
        // done, so the batch cannot drain early.
        if let Some(batch) = &batch {
            batch.record(CommandOutcome {
                correlation_id: command.correlation_id,
                command_type: command.command_type(),
                result: result.clone(),
            });
        }
        for follow_up in triggered {
            let correlation_id = follow_up.correlation_id;
            let command_type = follow_up.command_type();
            debug!(%correlation_id, command_type, "enqueueing triggered command");
            let queued = self.enqueue(Job {
                command: follow_up,
                batch: batch.clone(),
                reply: None,
            });
            if let (Err(err), Some(batch)) = (queued, &batch) {
                batch.record(CommandOutcome {
                    correlation_id,
                    command_type,
                    result: Err(err),
                });
            }
        }
        if let Some(batch) = batch {
            batch.pending.send_modify(|n| *n -= 1);
        }
        self.in_flight.send_modify(|n| *n -= 1);
        if let Some(reply) = reply {
            // The caller may have stopped waiting; the outcome is still logged.
            let _ = reply.send(result);
        }
    }

    async fn run(&self, command: &Command) -> (Result<CommandResult, DispatchError>, Vec<Command>) {
        let category = command.category();
        let Some(handler) = self
            .handlers
            .get(&category)
            .filter(|handler| handler.can_handle(command))
        else {
            return (Err(DispatchError::NoHandler(category)), Vec::new());
        };

        let session = match self.store.open(command.session_id).await {
            Ok(session) => session,
            Err(err) => return (Err(err.into()), Vec::new()),
        };

        let ctx = Arc::new(HandlerContext::new(session));
        // Run the handler on its own task so a panic fails the command
        // instead of killing the lane.
        let task = {
            let handler = Arc::clone(handler);
            let command = command.clone();
            let ctx = Arc::clone(&ctx);
            tokio::spawn(async move { handler.handle(&command, &ctx).await })
        };

        match task.await {
            Ok(Ok(result)) => (Ok(result), ctx.take_triggered()),
            Ok(Err(err)) => (Err(err.into()), Vec::new()),
            Err(join_error) => {
                error!(
                    correlation_id = %command.correlation_id,
                    command_type = command.command_type(),
                    error = %join_error,
                    "command handler panicked"
                );
                (
                    Err(DispatchError::Domain(DomainError::Infrastructure(format!(
                        "handler for {} panicked",
                        command.command_type()
                    )))),
                    Vec::new(),
                )
            }
        }
    }
}

/// Routes commands to their category handlers.
///
/// Cloning is cheap; clones share handlers, lanes, and the in-flight counter.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<Inner>,
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("categories", &self.categories())
            .field("in_flight", &self.in_flight())
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    /// Starts building a dispatcher over the given session store.
    #[must_use]
    pub fn builder(store: Arc<dyn SessionStore>) -> DispatcherBuilder {
        DispatcherBuilder {
            store,
            handlers: HashMap::new(),
        }
    }

    /// Categories with a registered handler, sorted.
    #[must_use]
    pub fn categories(&self) -> Vec<CommandCategory> {
        let mut categories: Vec<_> = self.inner.handlers.keys().copied().collect();
        categories.sort_unstable();
        categories
    }

    /// Number of commands submitted but not yet finished.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        *self.inner.in_flight.borrow()
    }

    fn check_routes(&self, commands: &[Command]) -> Result<(), DispatchError> {
        for command in commands {
            let category = command.category();
            let routable = self
                .inner
                .handlers
                .get(&category)
                .is_some_and(|handler| handler.can_handle(command));
            if !routable {
                error!(
                    correlation_id = %command.correlation_id,
                    %category,
                    "no handler for command"
                );
                return Err(DispatchError::NoHandler(category));
            }
        }
        Ok(())
    }

    /// Enqueues commands without waiting for them. Commands of one category
    /// run in the order given.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns `DispatchError::NoHandler` before anything is enqueued if any
    /// command cannot be routed.
    #[instrument(skip(self, commands), fields(count = commands.len()))]
    pub fn submit(&self, commands: Vec<Command>) -> Result<(), DispatchError> {
        self.check_routes(&commands)?;
        for command in commands {
            self.inner.enqueue(Job {
                command,
                batch: None,
                reply: None,
            })?;
        }
        Ok(())
    }

    /// Enqueues commands and waits until each of them, and every command
    /// their handlers triggered, has a recorded outcome.
    ///
    /// # Errors
    ///
    /// Returns `DispatchError::NoHandler` before anything is enqueued if any
    /// command cannot be routed. Handler failures are reported per command in
    /// the returned `BatchReport`.
    #[instrument(skip(self, commands), fields(count = commands.len()))]
    pub async fn submit_and_wait(&self, commands: Vec<Command>) -> Result<BatchReport, DispatchError> {
        self.check_routes(&commands)?;
        let batch = Arc::new(Batch::new());
        let mut pending = batch.pending.subscribe();
        for command in commands {
            self.inner.enqueue(Job {
                command,
                batch: Some(Arc::clone(&batch)),
                reply: None,
            })?;
        }

        // `batch` keeps the sender alive, so this only returns once drained.
        let _ = pending.wait_for(|n| *n == 0).await;

        let outcomes = std::mem::take(
            &mut *batch
                .outcomes
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        Ok(BatchReport { outcomes })
    }

    /// Runs one command and returns its handler's result.
    ///
    /// # Errors
    ///
    /// Returns `DispatchError::NoHandler` if no handler matches, or the
    /// handler's failure.
    #[instrument(skip(self, command), fields(correlation_id = %command.correlation_id, command_type = command.command_type()))]
    pub async fn execute(&self, command: Command) -> Result<CommandResult, DispatchError> {
        self.check_routes(std::slice::from_ref(&command))?;
        let session_id = command.session_id;
        let (reply, receiver) = oneshot::channel();
        self.inner.enqueue(Job {
            command,
            batch: None,
            reply: Some(reply),
        })?;
        receiver
            .await
            .map_err(|_| DispatchError::LaneClosed(session_id))?
    }

    /// Waits until every submitted command, across all sessions, has
    /// finished.
    pub async fn wait_for_completion(&self) {
        let mut in_flight = self.inner.in_flight.subscribe();
        // The sender lives as long as `self`, so this cannot fail.
        let _ = in_flight.wait_for(|n| *n == 0).await;
    }

    /// Stops the lanes of a session. Commands already queued still run.
    pub fn close_session(&self, session_id: Uuid) {
        let mut lanes = self
            .inner
            .lanes
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let before = lanes.len();
        lanes.retain(|(lane_session, _), _| *lane_session != session_id);
        info!(%session_id, closed = before - lanes.len(), "command lanes closed");
    }
}

/// Collects handler registrations and verifies them before the dispatcher
/// goes live.
pub struct DispatcherBuilder {
    store: Arc<dyn SessionStore>,
    handlers: HashMap<CommandCategory, Arc<dyn CommandHandler>>,
}

impl DispatcherBuilder {
    /// Registers the handler for a category.
    ///
    /// # Errors
    ///
    /// Returns `DispatchError::DuplicateHandler` if the category already has a
    /// handler, and `DispatchError::CategoryMismatch` if the handler serves a
    /// different category.
    pub fn register(
        &mut self,
        category: CommandCategory,
        handler: Arc<dyn CommandHandler>,
    ) -> Result<&mut Self, DispatchError> {
        if handler.category() != category {
            return Err(DispatchError::CategoryMismatch {
                category,
                handler: handler.category(),
            });
        }
        if self.handlers.contains_key(&category) {
            return Err(DispatchError::DuplicateHandler(category));
        }
        self.handlers.insert(category, handler);
        Ok(self)
    }

    /// Checks that every category has a handler.
    ///
    /// # Errors
    ///
    /// Returns `DispatchError::MissingHandlers` listing the uncovered
    /// categories.
    pub fn verify(&self) -> Result<(), DispatchError> {
        let missing: Vec<CommandCategory> = CommandCategory::ALL
            .into_iter()
            .filter(|category| !self.handlers.contains_key(category))
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(DispatchError::MissingHandlers(missing))
        }
    }

    /// Verifies the registrations and returns the live dispatcher.
    ///
    /// # Errors
    ///
    /// Returns `DispatchError::MissingHandlers` if verification fails.
    pub fn build(self) -> Result<Dispatcher, DispatchError> {
        self.verify()?;
        let (in_flight, _) = watch::channel(0);
        info!(categories = self.handlers.len(), "command dispatcher ready");
        Ok(Dispatcher {
            inner: Arc::new(Inner {
                handlers: self.handlers,
                store: self.store,
                lanes: Mutex::new(HashMap::new()),
                in_flight,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;
    use loremaster_core::error::DomainError;
    use loremaster_core::repository::SessionStore;
    use loremaster_store::memory_store::InMemorySessionStore;
    use loremaster_test_support::fixtures;
    use uuid::Uuid;

    use super::*;
    use crate::domain::commands::CommandKind;

    #[derive(Default)]
    struct Probe {
        log: Mutex<Vec<Command>>,
    }

    impl Probe {
        fn seen(&self) -> Vec<Command> {
            self.log.lock().unwrap().clone()
        }
    }

    enum Behavior {
        Succeed,
        Fail,
        Panic,
        Trigger(CommandKind),
        Refuse,
        Slow(Duration),
    }

    struct ProbeHandler {
        category: CommandCategory,
        behavior: Behavior,
        probe: Arc<Probe>,
    }

    #[async_trait]
    impl CommandHandler for ProbeHandler {
        fn category(&self) -> CommandCategory {
            self.category
        }

        fn can_handle(&self, command: &Command) -> bool {
            !matches!(self.behavior, Behavior::Refuse) && command.category() == self.category
        }

        async fn handle(
            &self,
            command: &Command,
            ctx: &HandlerContext,
        ) -> Result<CommandResult, DomainError> {
            match &self.behavior {
                Behavior::Fail => return Err(DomainError::Validation("probe failure".into())),
                Behavior::Panic => panic!("probe panic"),
                Behavior::Trigger(kind) => ctx.trigger(Command::caused_by(command, kind.clone())),
                Behavior::Slow(delay) => tokio::time::sleep(*delay).await,
                Behavior::Succeed | Behavior::Refuse => {}
            }
            let mut log = self.probe.log.lock().unwrap();
            log.push(command.clone());
            Ok(CommandResult::MessageRecorded {
                turn: u32::try_from(log.len()).unwrap(),
            })
        }
    }

    async fn setup(
        overrides: Vec<(CommandCategory, Behavior)>,
    ) -> (Dispatcher, Arc<Probe>, Uuid) {
        let store = Arc::new(InMemorySessionStore::new());
        let session = fixtures::ambush_session();
        let session_id = session.id;
        store.insert(session).await.unwrap();

        let probe = Arc::new(Probe::default());
        let mut overrides: HashMap<CommandCategory, Behavior> = overrides.into_iter().collect();
        let mut builder = Dispatcher::builder(store);
        for category in CommandCategory::ALL {
            let behavior = overrides.remove(&category).unwrap_or(Behavior::Succeed);
            builder
                .register(
                    category,
                    Arc::new(ProbeHandler {
                        category,
                        behavior,
                        probe: Arc::clone(&probe),
                    }),
                )
                .unwrap();
        }
        (builder.build().unwrap(), probe, session_id)
    }

    fn advance(session_id: Uuid, minutes: u32) -> Command {
        Command::new(session_id, CommandKind::AdvanceTime { minutes })
    }

    #[test]
    fn test_register_rejects_second_handler_for_category() {
        // Arrange
        let store: Arc<dyn SessionStore> = Arc::new(InMemorySessionStore::new());
        let probe = Arc::new(Probe::default());
        let handler = || -> Arc<dyn CommandHandler> {
            Arc::new(ProbeHandler {
                category: CommandCategory::Dice,
                behavior: Behavior::Succeed,
                probe: Arc::clone(&probe),
            })
        };
        let mut builder = Dispatcher::builder(store);
        builder.register(CommandCategory::Dice, handler()).unwrap();

        // Act
        let result = builder.register(CommandCategory::Dice, handler());

        // Assert
        assert_eq!(
            result.err(),
            Some(DispatchError::DuplicateHandler(CommandCategory::Dice))
        );
    }

    #[test]
    fn test_register_rejects_category_mismatch() {
        let store: Arc<dyn SessionStore> = Arc::new(InMemorySessionStore::new());
        let mut builder = Dispatcher::builder(store);

        let result = builder.register(
            CommandCategory::Quest,
            Arc::new(ProbeHandler {
                category: CommandCategory::Party,
                behavior: Behavior::Succeed,
                probe: Arc::new(Probe::default()),
            }),
        );

        assert!(matches!(
            result,
            Err(DispatchError::CategoryMismatch { .. })
        ));
    }

    #[test]
    fn test_build_fails_when_categories_are_missing() {
        // Arrange
        let store: Arc<dyn SessionStore> = Arc::new(InMemorySessionStore::new());
        let mut builder = Dispatcher::builder(store);
        builder
            .register(
                CommandCategory::Dice,
                Arc::new(ProbeHandler {
                    category: CommandCategory::Dice,
                    behavior: Behavior::Succeed,
                    probe: Arc::new(Probe::default()),
                }),
            )
            .unwrap();

        // Act
        let result = builder.build();

        // Assert
        match result {
            Err(DispatchError::MissingHandlers(missing)) => {
                assert_eq!(missing.len(), CommandCategory::ALL.len() - 1);
                assert!(!missing.contains(&CommandCategory::Dice));
            }
            other => panic!("expected MissingHandlers, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_execute_returns_handler_result() {
        let (dispatcher, probe, session_id) = setup(vec![]).await;

        let result = dispatcher.execute(advance(session_id, 10)).await.unwrap();

        assert_eq!(result, CommandResult::MessageRecorded { turn: 1 });
        assert_eq!(probe.seen().len(), 1);
    }

    #[tokio::test]
    async fn test_execute_raises_when_no_handler_matches() {
        let (dispatcher, probe, session_id) =
            setup(vec![(CommandCategory::Time, Behavior::Refuse)]).await;

        let result = dispatcher.execute(advance(session_id, 10)).await;

        assert_eq!(result, Err(DispatchError::NoHandler(CommandCategory::Time)));
        assert!(probe.seen().is_empty());
    }

    #[tokio::test]
    async fn test_submit_rejects_whole_batch_when_one_command_is_unroutable() {
        // Arrange
        let (dispatcher, probe, session_id) =
            setup(vec![(CommandCategory::Time, Behavior::Refuse)]).await;
        let commands = vec![
            Command::new(session_id, CommandKind::MoveParty { location: "Ford".into() }),
            advance(session_id, 5),
        ];

        // Act
        let result = dispatcher.submit(commands);
        dispatcher.wait_for_completion().await;

        // Assert
        assert_eq!(result, Err(DispatchError::NoHandler(CommandCategory::Time)));
        assert!(probe.seen().is_empty());
    }

    #[tokio::test]
    async fn test_execute_unknown_session_is_reported() {
        let (dispatcher, _probe, _session_id) = setup(vec![]).await;
        let unknown = Uuid::new_v4();

        let result = dispatcher.execute(advance(unknown, 1)).await;

        assert_eq!(
            result,
            Err(DispatchError::Domain(DomainError::SessionNotFound(unknown)))
        );
    }

    #[tokio::test]
    async fn test_submit_preserves_fifo_within_category() {
        // Arrange
        let (dispatcher, probe, session_id) = setup(vec![]).await;
        let commands: Vec<Command> = (1..=25).map(|m| advance(session_id, m)).collect();
        let expected: Vec<Uuid> = commands.iter().map(|c| c.correlation_id).collect();

        // Act
        dispatcher.submit(commands).unwrap();
        dispatcher.wait_for_completion().await;

        // Assert
        let seen: Vec<Uuid> = probe.seen().iter().map(|c| c.correlation_id).collect();
        assert_eq!(seen, expected);
        assert_eq!(dispatcher.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_wait_for_completion_drains_slow_commands() {
        let (dispatcher, probe, session_id) = setup(vec![(
            CommandCategory::Time,
            Behavior::Slow(Duration::from_millis(20)),
        )])
        .await;

        dispatcher
            .submit(vec![advance(session_id, 1), advance(session_id, 2)])
            .unwrap();
        dispatcher.wait_for_completion().await;

        assert_eq!(probe.seen().len(), 2);
    }

    #[tokio::test]
    async fn test_submit_and_wait_includes_triggered_commands() {
        // Arrange
        let (dispatcher, probe, session_id) = setup(vec![(
            CommandCategory::Entity,
            Behavior::Trigger(CommandKind::StartQuest {
                quest_id: "q1".into(),
                title: "Follow-up".into(),
            }),
        )])
        .await;
        let command = Command::new(
            session_id,
            CommandKind::ApplyHpDelta {
                entity_id: "goblin".into(),
                delta: -3,
                reason: None,
            },
        );

        // Act
        let report = dispatcher.submit_and_wait(vec![command]).await.unwrap();

        // Assert
        assert_eq!(report.len(), 2);
        assert!(report.first_error().is_none());
        let types: Vec<&str> = report.outcomes().iter().map(|o| o.command_type).collect();
        assert_eq!(types, vec!["entity.apply_hp_delta", "quest.start"]);
        assert_eq!(probe.seen().len(), 2);
    }

    #[tokio::test]
    async fn test_submit_and_wait_reports_handler_failure() {
        let (dispatcher, _probe, session_id) =
            setup(vec![(CommandCategory::Quest, Behavior::Fail)]).await;
        let command = Command::new(
            session_id,
            CommandKind::StartQuest {
                quest_id: "q1".into(),
                title: "Doomed".into(),
            },
        );
        let correlation_id = command.correlation_id;

        let report = dispatcher.submit_and_wait(vec![command]).await.unwrap();

        assert!(matches!(
            report.result_for(correlation_id),
            Some(Err(DispatchError::Domain(DomainError::Validation(_))))
        ));
        assert!(report.into_results().is_err());
    }

    #[tokio::test]
    async fn test_panicking_handler_fails_command_and_lane_survives() {
        // Arrange
        let (dispatcher, _probe, session_id) =
            setup(vec![(CommandCategory::Dice, Behavior::Panic)]).await;
        let roll = || {
            Command::new(
                session_id,
                CommandKind::RollDice {
                    expression: "1d20".into(),
                    purpose: None,
                },
            )
        };

        // Act
        let first = dispatcher.execute(roll()).await;
        let second = dispatcher.execute(roll()).await;

        // Assert
        assert!(matches!(
            first,
            Err(DispatchError::Domain(DomainError::Infrastructure(_)))
        ));
        assert!(matches!(
            second,
            Err(DispatchError::Domain(DomainError::Infrastructure(_)))
        ));
        assert_eq!(dispatcher.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_close_session_then_resubmit_starts_fresh_lane() {
        let (dispatcher, probe, session_id) = setup(vec![]).await;
        dispatcher.execute(advance(session_id, 1)).await.unwrap();

        dispatcher.close_session(session_id);
        dispatcher.execute(advance(session_id, 2)).await.unwrap();

        assert_eq!(probe.seen().len(), 2);
    }
}
