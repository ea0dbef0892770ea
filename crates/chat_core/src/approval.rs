//! Approval controller: carries one operator request from submission through translation and
//! preview to execution, dry run, or cancellation.
//!
//! The controller performs no I/O. Each operation takes the conversation log by exclusive
//! reference, applies one transition, and may hand back an [`Effect`] for the caller to run.
//! The caller feeds the remote outcome back through [`ApprovalController::on_translated`] or
//! [`ApprovalController::on_executed`] together with the ticket it was issued for; outcomes
//! for a ticket that is no longer pending are dropped.

use shared::domain::{DryRunMode, MessageDraft, MessageKind, Phase, Ticket};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    classify::DestructiveVocabulary,
    conversation::ConversationLog,
    error::{ExecutionError, TranslationError},
};

pub const NO_COMMAND_TEXT: &str = "Sorry, I could not generate a kubectl command for that query.";
pub const TRANSLATION_FAILED_TEXT: &str = "There was an error contacting the backend.";
pub const EXECUTION_FAILED_TEXT: &str = "There was an error executing the command.";
pub const DRY_RUN_PREFIX: &str = "[DRY RUN] ";
const FOLLOW_UP_TEXT: &str = "How else can I help you?";

#[derive(Debug, Clone, PartialEq, Eq)]
struct Proposal {
    command_text: String,
    is_destructive: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Stage {
    AwaitingTranslation,
    Preview(Proposal),
    Executing { proposal: Proposal, dry_run: bool },
}

/// The single in-flight approval cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingCommand {
    ticket: Ticket,
    original_query: String,
    stage: Stage,
}

impl PendingCommand {
    pub fn ticket(&self) -> Ticket {
        self.ticket
    }

    pub fn original_query(&self) -> &str {
        &self.original_query
    }

    pub fn phase(&self) -> Phase {
        match self.stage {
            Stage::AwaitingTranslation => Phase::AwaitingTranslation,
            Stage::Preview(_) => Phase::Preview,
            Stage::Executing { .. } => Phase::Executing,
        }
    }

    pub fn proposed_command_text(&self) -> Option<&str> {
        self.proposal().map(|proposal| proposal.command_text.as_str())
    }

    pub fn is_destructive(&self) -> bool {
        self.proposal()
            .map(|proposal| proposal.is_destructive)
            .unwrap_or(false)
    }

    fn proposal(&self) -> Option<&Proposal> {
        match &self.stage {
            Stage::AwaitingTranslation => None,
            Stage::Preview(proposal) | Stage::Executing { proposal, .. } => Some(proposal),
        }
    }
}

/// What the operator reviews before choosing execute, dry run, or cancel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandPreview {
    pub ticket: Ticket,
    pub original_query: String,
    pub command_text: String,
    pub is_destructive: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorAction {
    Submit,
    Execute,
    DryRun,
    Cancel,
}

impl std::fmt::Display for OperatorAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            OperatorAction::Submit => "submit",
            OperatorAction::Execute => "execute",
            OperatorAction::DryRun => "dry run",
            OperatorAction::Cancel => "cancel",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("cannot {action} while {phase}")]
    NotApplicable { action: OperatorAction, phase: Phase },
    #[error("query is empty")]
    EmptyQuery,
}

/// Remote call the caller must run and report back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Translate {
        ticket: Ticket,
        query: String,
    },
    Execute {
        ticket: Ticket,
        command_text: String,
        dry_run: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// Transition applied; run the effect if there is one.
    Applied(Option<Effect>),
    /// The event does not apply to the current state. Nothing changed.
    Rejected(Rejection),
    /// A remote outcome for a command that was cancelled or superseded. Nothing changed.
    Stale(Ticket),
}

impl Dispatch {
    pub fn effect(&self) -> Option<&Effect> {
        match self {
            Dispatch::Applied(effect) => effect.as_ref(),
            _ => None,
        }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, Dispatch::Applied(_))
    }
}

#[derive(Debug, Clone)]
pub struct ApprovalController {
    pending: Option<PendingCommand>,
    vocabulary: DestructiveVocabulary,
    dry_run_mode: DryRunMode,
    last_ticket: u64,
}

impl Default for ApprovalController {
    fn default() -> Self {
        Self::new(DestructiveVocabulary::default(), DryRunMode::default())
    }
}

impl ApprovalController {
    pub fn new(vocabulary: DestructiveVocabulary, dry_run_mode: DryRunMode) -> Self {
        Self {
            pending: None,
            vocabulary,
            dry_run_mode,
            last_ticket: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.pending
            .as_ref()
            .map(PendingCommand::phase)
            .unwrap_or(Phase::Idle)
    }

    pub fn pending(&self) -> Option<&PendingCommand> {
        self.pending.as_ref()
    }

    pub fn dry_run_mode(&self) -> DryRunMode {
        self.dry_run_mode
    }

    pub fn preview(&self) -> Option<CommandPreview> {
        let pending = self.pending.as_ref()?;
        let Stage::Preview(proposal) = &pending.stage else {
            return None;
        };
        Some(CommandPreview {
            ticket: pending.ticket,
            original_query: pending.original_query.clone(),
            command_text: proposal.command_text.clone(),
            is_destructive: proposal.is_destructive,
        })
    }

    pub fn submit(&mut self, log: &mut ConversationLog, query: &str) -> Dispatch {
        if self.pending.is_some() {
            return Dispatch::Rejected(self.not_applicable(OperatorAction::Submit));
        }
        let query = query.trim();
        if query.is_empty() {
            debug!("ignoring empty query");
            return Dispatch::Rejected(Rejection::EmptyQuery);
        }

        self.last_ticket += 1;
        let ticket = Ticket(self.last_ticket);
        log.append(MessageDraft::user(query));
        self.pending = Some(PendingCommand {
            ticket,
            original_query: query.to_string(),
            stage: Stage::AwaitingTranslation,
        });
        info!(%ticket, "query submitted for translation");

        Dispatch::Applied(Some(Effect::Translate {
            ticket,
            query: query.to_string(),
        }))
    }

    pub fn on_translated(
        &mut self,
        log: &mut ConversationLog,
        ticket: Ticket,
        outcome: Result<Option<String>, TranslationError>,
    ) -> Dispatch {
        let Some(pending) = self.pending.as_mut().filter(|pending| {
            pending.ticket == ticket && matches!(pending.stage, Stage::AwaitingTranslation)
        }) else {
            debug!(%ticket, "discarding stale translation outcome");
            return Dispatch::Stale(ticket);
        };

        match outcome {
            Ok(Some(command_text)) if !command_text.trim().is_empty() => {
                let command_text = command_text.trim().to_string();
                let is_destructive = self.vocabulary.is_destructive(&command_text);
                info!(%ticket, %command_text, is_destructive, "command ready for review");
                pending.stage = Stage::Preview(Proposal {
                    command_text,
                    is_destructive,
                });
            }
            Ok(_) => {
                info!(%ticket, "translator produced no command");
                self.pending = None;
                log.append(MessageDraft::system(MessageKind::Plain, NO_COMMAND_TEXT));
            }
            Err(error) => {
                warn!(%ticket, %error, "translation failed");
                self.pending = None;
                log.append(MessageDraft::system(
                    MessageKind::Error,
                    format!("{TRANSLATION_FAILED_TEXT} ({error})"),
                ));
            }
        }
        Dispatch::Applied(None)
    }

    pub fn execute(&mut self, log: &mut ConversationLog) -> Dispatch {
        self.begin_execution(log, OperatorAction::Execute)
    }

    pub fn dry_run(&mut self, log: &mut ConversationLog) -> Dispatch {
        self.begin_execution(log, OperatorAction::DryRun)
    }

    pub fn cancel(&mut self, log: &mut ConversationLog) -> Dispatch {
        let Some(pending) = self.pending.as_ref() else {
            return Dispatch::Rejected(self.not_applicable(OperatorAction::Cancel));
        };

        let content = match &pending.stage {
            Stage::Preview(proposal) => {
                format!("Command cancelled: {}. {FOLLOW_UP_TEXT}", proposal.command_text)
            }
            Stage::AwaitingTranslation => format!(
                "Request cancelled before a command was proposed: \"{}\". {FOLLOW_UP_TEXT}",
                pending.original_query
            ),
            Stage::Executing { .. } => {
                return Dispatch::Rejected(self.not_applicable(OperatorAction::Cancel));
            }
        };

        info!(ticket = %pending.ticket, phase = %pending.phase(), "pending command cancelled");
        let draft = match pending.proposed_command_text() {
            Some(command_text) => {
                MessageDraft::system(MessageKind::Warning, content).with_command(command_text)
            }
            None => MessageDraft::system(MessageKind::Warning, content),
        };
        self.pending = None;
        log.append(draft);
        Dispatch::Applied(None)
    }

    pub fn on_executed(
        &mut self,
        log: &mut ConversationLog,
        ticket: Ticket,
        outcome: Result<String, ExecutionError>,
    ) -> Dispatch {
        let is_current = matches!(
            &self.pending,
            Some(pending) if pending.ticket == ticket
                && matches!(pending.stage, Stage::Executing { .. })
        );
        if !is_current {
            debug!(%ticket, "discarding stale execution outcome");
            return Dispatch::Stale(ticket);
        }
        let Some(PendingCommand {
            stage: Stage::Executing { proposal, dry_run },
            ..
        }) = self.pending.take()
        else {
            return Dispatch::Stale(ticket);
        };

        match outcome {
            Ok(result_text) => {
                info!(%ticket, dry_run, "command finished");
                let content = if dry_run && !result_text.starts_with(DRY_RUN_PREFIX) {
                    format!("{DRY_RUN_PREFIX}{result_text}")
                } else {
                    result_text
                };
                log.append(
                    MessageDraft::system(MessageKind::Result, content)
                        .with_command(proposal.command_text),
                );
            }
            Err(error) => {
                warn!(%ticket, dry_run, %error, "command execution failed");
                log.append(
                    MessageDraft::system(
                        MessageKind::Error,
                        format!("{EXECUTION_FAILED_TEXT} ({error})"),
                    )
                    .with_command(proposal.command_text),
                );
            }
        }
        Dispatch::Applied(None)
    }

    fn begin_execution(&mut self, log: &mut ConversationLog, action: OperatorAction) -> Dispatch {
        let (ticket, proposal) = match &self.pending {
            Some(PendingCommand {
                ticket,
                stage: Stage::Preview(proposal),
                ..
            }) => (*ticket, proposal.clone()),
            _ => return Dispatch::Rejected(self.not_applicable(action)),
        };
        let dry_run = action == OperatorAction::DryRun;

        let label = if dry_run {
            format!("{DRY_RUN_PREFIX}{}", proposal.command_text)
        } else {
            proposal.command_text.clone()
        };
        log.append(
            MessageDraft::system(MessageKind::Command, label).with_command(&proposal.command_text),
        );

        if dry_run && self.dry_run_mode == DryRunMode::Local {
            info!(%ticket, "dry run resolved locally");
            self.pending = None;
            let content = format!(
                "{DRY_RUN_PREFIX}Command would execute: {}",
                proposal.command_text
            );
            log.append(
                MessageDraft::system(MessageKind::Result, content)
                    .with_command(proposal.command_text),
            );
            return Dispatch::Applied(None);
        }

        info!(%ticket, dry_run, is_destructive = proposal.is_destructive, "executing command");
        let command_text = proposal.command_text.clone();
        if let Some(pending) = self.pending.as_mut() {
            pending.stage = Stage::Executing { proposal, dry_run };
        }
        Dispatch::Applied(Some(Effect::Execute {
            ticket,
            command_text,
            dry_run,
        }))
    }

    fn not_applicable(&self, action: OperatorAction) -> Rejection {
        let phase = self.phase();
        debug!(%action, %phase, "event does not apply to current phase");
        Rejection::NotApplicable { action, phase }
    }
}

#[cfg(test)]
#[path = "tests/approval_tests.rs"]
mod tests;
