//! Operator lines in, rendered session events out.

use std::io::Write;

use anyhow::{Context, Result};
use chat_core::{ConversationLog, SessionEvent, SessionHandle};
use shared::domain::Phase;
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt},
    sync::broadcast::{
        self,
        error::{RecvError, TryRecvError},
    },
    task::JoinHandle,
};
use tracing::warn;

use crate::{
    commands::{parse_line, ConsoleCommand, HELP_TEXT},
    render::{render_event, render_message, render_preview},
};

/// Runs until `/quit`, or until input ends and no translation or execution is outstanding.
pub async fn run<R, W>(
    session: &SessionHandle,
    events: &mut broadcast::Receiver<SessionEvent>,
    input: R,
    out: &mut W,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut lines = input.lines();
    let mut input_open = true;

    loop {
        tokio::select! {
            line = lines.next_line(), if input_open => {
                let Some(line) = line.context("failed to read input")? else {
                    input_open = false;
                    if !in_flight(session).await {
                        break;
                    }
                    continue;
                };
                let Some(command) = parse_line(&line) else {
                    continue;
                };
                let queued = match command {
                    ConsoleCommand::Submit(query) => session.submit(query),
                    ConsoleCommand::Execute => session.execute(),
                    ConsoleCommand::DryRun => session.dry_run(),
                    ConsoleCommand::Cancel => session.cancel(),
                    ConsoleCommand::History => {
                        print_history(session, out).await?;
                        continue;
                    }
                    ConsoleCommand::Help => {
                        writeln!(out, "{HELP_TEXT}")?;
                        continue;
                    }
                    ConsoleCommand::Quit => break,
                    ConsoleCommand::Unknown(input) => {
                        writeln!(out, "Unknown command {input}. Type /help for the list.")?;
                        continue;
                    }
                };
                if let Err(error) = queued {
                    eprintln!("{error}");
                }
            }
            event = events.recv() => match event {
                Ok(event) => {
                    let phase_changed = matches!(event, SessionEvent::PhaseChanged(_));
                    emit(out, &event)?;
                    if !input_open && phase_changed && !in_flight(session).await {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "console fell behind session events; use /history");
                }
                Err(RecvError::Closed) => return Ok(()),
            },
        }
    }

    // A phase change is published ahead of the preview that goes with it.
    loop {
        match events.try_recv() {
            Ok(event) => emit(out, &event)?,
            Err(TryRecvError::Lagged(skipped)) => {
                warn!(skipped, "console fell behind session events; use /history");
            }
            Err(TryRecvError::Empty | TryRecvError::Closed) => return Ok(()),
        }
    }
}

/// Asks the worker to stop and waits for the final log. The handle is dropped first, so a
/// full queue still lets the worker end.
pub async fn close(
    session: SessionHandle,
    worker: JoinHandle<ConversationLog>,
) -> Result<ConversationLog> {
    if let Err(error) = session.shutdown() {
        warn!(%error, "shutdown request not queued; waiting for the worker to drain");
    }
    drop(session);
    worker.await.context("session worker panicked")
}

pub async fn print_history<W: Write>(session: &SessionHandle, out: &mut W) -> Result<()> {
    let snapshot = session.snapshot().await?;
    for message in &snapshot.messages {
        writeln!(out, "{}", render_message(message))?;
    }
    if let Some(preview) = &snapshot.preview {
        writeln!(out, "{}", render_preview(preview))?;
    }
    Ok(())
}

async fn in_flight(session: &SessionHandle) -> bool {
    match session.snapshot().await {
        Ok(snapshot) => matches!(snapshot.phase, Phase::AwaitingTranslation | Phase::Executing),
        Err(_) => false,
    }
}

fn emit<W: Write>(out: &mut W, event: &SessionEvent) -> Result<()> {
    if let Some(text) = render_event(event) {
        writeln!(out, "{text}")?;
    }
    Ok(())
}

#[cfg(test)]
#[path = "tests/repl_tests.rs"]
mod tests;
