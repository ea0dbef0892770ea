//! Async driver around [`ApprovalController`].
//!
//! One worker task owns the controller and the conversation log. Operator actions and remote
//! outcomes both arrive on the same bounded queue, so every transition is applied in arrival
//! order. Remote calls run on their own tasks and post their outcome back with the ticket they
//! were issued for.

use std::sync::Arc;

use shared::domain::{Message, MessageId, Phase, Ticket};
use thiserror::Error;
use tokio::{
    sync::{
        broadcast,
        mpsc::{self, error::TrySendError},
        oneshot,
    },
    task::JoinHandle,
};
use tracing::{debug, info};

use crate::{
    approval::{ApprovalController, CommandPreview, Dispatch, Effect, Rejection},
    backend::{CommandExecutor, CommandTranslator},
    conversation::ConversationLog,
    error::{ExecutionError, TranslationError},
};

pub const SESSION_QUEUE_CAPACITY: usize = 64;
const EVENT_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    MessageAppended(Message),
    PhaseChanged(Phase),
    PreviewReady(CommandPreview),
    Rejected(Rejection),
    /// A remote outcome arrived for a command that is no longer pending.
    Discarded(Ticket),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub phase: Phase,
    pub preview: Option<CommandPreview>,
    pub messages: Vec<Message>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("session queue is full; please retry")]
    QueueFull,
    #[error("session worker has stopped")]
    Closed,
}

enum SessionInput {
    Submit(String),
    Execute,
    DryRun,
    Cancel,
    Snapshot(oneshot::Sender<SessionSnapshot>),
    Translated {
        ticket: Ticket,
        outcome: Result<Option<String>, TranslationError>,
    },
    Executed {
        ticket: Ticket,
        outcome: Result<String, ExecutionError>,
    },
    Shutdown,
}

impl SessionInput {
    fn name(&self) -> &'static str {
        match self {
            SessionInput::Submit(_) => "submit",
            SessionInput::Execute => "execute",
            SessionInput::DryRun => "dry_run",
            SessionInput::Cancel => "cancel",
            SessionInput::Snapshot(_) => "snapshot",
            SessionInput::Translated { .. } => "translated",
            SessionInput::Executed { .. } => "executed",
            SessionInput::Shutdown => "shutdown",
        }
    }
}

/// Cloneable front end for a running session.
#[derive(Clone)]
pub struct SessionHandle {
    inputs: mpsc::Sender<SessionInput>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionHandle {
    pub fn submit(&self, query: impl Into<String>) -> Result<(), SessionError> {
        self.dispatch(SessionInput::Submit(query.into()))
    }

    pub fn execute(&self) -> Result<(), SessionError> {
        self.dispatch(SessionInput::Execute)
    }

    pub fn dry_run(&self) -> Result<(), SessionError> {
        self.dispatch(SessionInput::DryRun)
    }

    pub fn cancel(&self) -> Result<(), SessionError> {
        self.dispatch(SessionInput::Cancel)
    }

    /// Stops the worker once the inputs queued before this one are handled.
    pub fn shutdown(&self) -> Result<(), SessionError> {
        self.dispatch(SessionInput::Shutdown)
    }

    pub async fn snapshot(&self) -> Result<SessionSnapshot, SessionError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.inputs
            .send(SessionInput::Snapshot(reply_tx))
            .await
            .map_err(|_| SessionError::Closed)?;
        reply_rx.await.map_err(|_| SessionError::Closed)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    fn dispatch(&self, input: SessionInput) -> Result<(), SessionError> {
        let name = input.name();
        match self.inputs.try_send(input) {
            Ok(()) => {
                debug!(input = name, "queued session input");
                Ok(())
            }
            Err(TrySendError::Full(_)) => Err(SessionError::QueueFull),
            Err(TrySendError::Closed(_)) => Err(SessionError::Closed),
        }
    }
}

/// Starts the worker. The join handle yields the final log after shutdown, or once every
/// handle has been dropped.
pub fn spawn_session(
    controller: ApprovalController,
    log: ConversationLog,
    translator: Arc<dyn CommandTranslator>,
    executor: Arc<dyn CommandExecutor>,
) -> (SessionHandle, JoinHandle<ConversationLog>) {
    let (inputs_tx, inputs_rx) = mpsc::channel(SESSION_QUEUE_CAPACITY);
    let (events, _) = broadcast::channel(EVENT_CAPACITY);

    let worker = SessionWorker {
        controller,
        log,
        translator,
        executor,
        outcomes: inputs_tx.downgrade(),
        events: events.clone(),
    };
    let task = tokio::spawn(worker.run(inputs_rx));

    (
        SessionHandle {
            inputs: inputs_tx,
            events,
        },
        task,
    )
}

struct SessionWorker {
    controller: ApprovalController,
    log: ConversationLog,
    translator: Arc<dyn CommandTranslator>,
    executor: Arc<dyn CommandExecutor>,
    // Weak so that dropping every handle ends the worker.
    outcomes: mpsc::WeakSender<SessionInput>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionWorker {
    async fn run(mut self, mut inputs: mpsc::Receiver<SessionInput>) -> ConversationLog {
        info!(phase = %self.controller.phase(), "approval session started");

        while let Some(input) = inputs.recv().await {
            let last_seen = self.log.last().map(|message| message.id);
            let phase_before = self.controller.phase();

            let dispatch = match input {
                SessionInput::Submit(query) => self.controller.submit(&mut self.log, &query),
                SessionInput::Execute => self.controller.execute(&mut self.log),
                SessionInput::DryRun => self.controller.dry_run(&mut self.log),
                SessionInput::Cancel => self.controller.cancel(&mut self.log),
                SessionInput::Translated { ticket, outcome } => {
                    self.controller.on_translated(&mut self.log, ticket, outcome)
                }
                SessionInput::Executed { ticket, outcome } => {
                    self.controller.on_executed(&mut self.log, ticket, outcome)
                }
                SessionInput::Snapshot(reply) => {
                    let _ = reply.send(self.snapshot());
                    continue;
                }
                SessionInput::Shutdown => break,
            };

            self.publish(last_seen, phase_before, &dispatch);
            if let Dispatch::Applied(Some(effect)) = dispatch {
                self.run_effect(effect);
            }
        }

        info!(messages = self.log.len(), "approval session stopped");
        self.log
    }

    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            phase: self.controller.phase(),
            preview: self.controller.preview(),
            messages: self.log.snapshot(),
        }
    }

    fn publish(&self, last_seen: Option<MessageId>, phase_before: Phase, dispatch: &Dispatch) {
        match dispatch {
            Dispatch::Rejected(rejection) => {
                let _ = self.events.send(SessionEvent::Rejected(*rejection));
            }
            Dispatch::Stale(ticket) => {
                let _ = self.events.send(SessionEvent::Discarded(*ticket));
            }
            Dispatch::Applied(_) => {
                for message in self.log.since(last_seen) {
                    let _ = self.events.send(SessionEvent::MessageAppended(message.clone()));
                }
                let phase = self.controller.phase();
                if phase != phase_before {
                    let _ = self.events.send(SessionEvent::PhaseChanged(phase));
                }
                if let Some(preview) = self.controller.preview() {
                    if phase_before != Phase::Preview {
                        let _ = self.events.send(SessionEvent::PreviewReady(preview));
                    }
                }
            }
        }
    }

    fn run_effect(&self, effect: Effect) {
        let outcomes = self.outcomes.clone();
        match effect {
            Effect::Translate { ticket, query } => {
                let translator = self.translator.clone();
                tokio::spawn(async move {
                    let outcome = translator.translate(&query).await;
                    if let Some(tx) = outcomes.upgrade() {
                        let _ = tx.send(SessionInput::Translated { ticket, outcome }).await;
                    }
                });
            }
            Effect::Execute {
                ticket,
                command_text,
                dry_run,
            } => {
                let executor = self.executor.clone();
                tokio::spawn(async move {
                    let outcome = executor.execute(&command_text, dry_run).await;
                    if let Some(tx) = outcomes.upgrade() {
                        let _ = tx.send(SessionInput::Executed { ticket, outcome }).await;
                    }
                });
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
