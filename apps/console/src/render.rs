use chat_core::{CommandPreview, Rejection, SessionEvent};
use shared::domain::{Message, MessageKind, Sender};

pub const DESTRUCTIVE_BANNER: &str =
    "!! Potentially destructive: this command may change cluster state. Review it carefully.";

pub fn render_message(message: &Message) -> String {
    let time = message.created_at.format("%H:%M:%S");
    match (message.sender, message.kind) {
        (Sender::User, _) => format!("[{time}] you> {}", message.content),
        (Sender::System, MessageKind::Plain) => format!("[{time}] kubechat> {}", message.content),
        (Sender::System, MessageKind::Command) => format!("[{time}] $ {}", message.content),
        (Sender::System, MessageKind::Result) => {
            format!("[{time}] result:\n{}", indent(&message.content))
        }
        (Sender::System, MessageKind::Error) => format!("[{time}] error: {}", message.content),
        (Sender::System, MessageKind::Warning) => format!("[{time}] warning: {}", message.content),
    }
}

pub fn render_preview(preview: &CommandPreview) -> String {
    let mut out = format!(
        "Proposed command for \"{}\":\n    {}\n",
        preview.original_query, preview.command_text
    );
    if preview.is_destructive {
        out.push_str(DESTRUCTIVE_BANNER);
        out.push('\n');
    }
    out.push_str("/execute, /dry-run, or /cancel?");
    out
}

pub fn render_rejection(rejection: &Rejection) -> String {
    match rejection {
        Rejection::EmptyQuery => "Nothing to send.".to_string(),
        Rejection::NotApplicable { .. } => format!("Not now: {rejection}."),
    }
}

/// Text to print for a session event, if any.
pub fn render_event(event: &SessionEvent) -> Option<String> {
    match event {
        SessionEvent::MessageAppended(message) => Some(render_message(message)),
        SessionEvent::PreviewReady(preview) => Some(render_preview(preview)),
        SessionEvent::Rejected(rejection) => Some(render_rejection(rejection)),
        SessionEvent::PhaseChanged(_) | SessionEvent::Discarded(_) => None,
    }
}

fn indent(text: &str) -> String {
    text.lines()
        .map(|line| format!("    {line}"))
        .collect::<Vec<_>>()
        .join("\n")
}
