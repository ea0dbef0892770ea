use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub u64);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(MessageId);
id_newtype!(Ticket);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    User,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Plain,
    Command,
    Result,
    Error,
    Warning,
}

/// One transcript entry. Only the conversation log constructs these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub content: String,
    pub sender: Sender,
    pub created_at: DateTime<Utc>,
    pub kind: MessageKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command_text: Option<String>,
}

/// Message contents before the log assigns an id and timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageDraft {
    pub content: String,
    pub sender: Sender,
    pub kind: MessageKind,
    pub command_text: Option<String>,
}

impl MessageDraft {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            sender: Sender::User,
            kind: MessageKind::Plain,
            command_text: None,
        }
    }

    pub fn system(kind: MessageKind, content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            sender: Sender::System,
            kind,
            command_text: None,
        }
    }

    pub fn with_command(mut self, command_text: impl Into<String>) -> Self {
        self.command_text = Some(command_text.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    AwaitingTranslation,
    Preview,
    Executing,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Phase::Idle => "idle",
            Phase::AwaitingTranslation => "awaiting_translation",
            Phase::Preview => "preview",
            Phase::Executing => "executing",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DryRunMode {
    /// Synthesize the dry-run result without contacting the executor.
    #[default]
    Local,
    /// Ask the executor to validate the command with `dry_run = true`.
    Remote,
}

impl std::str::FromStr for DryRunMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(DryRunMode::Local),
            "remote" => Ok(DryRunMode::Remote),
            other => Err(format!("unknown dry run mode '{other}' (expected local or remote)")),
        }
    }
}
