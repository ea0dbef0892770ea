//! Client side of KubeChat: the conversation log, the approval controller that gates every
//! generated kubectl command behind an explicit operator decision, and the HTTP adapters
//! that reach the translation and execution backend.

pub mod approval;
pub mod backend;
pub mod classify;
pub mod config;
pub mod conversation;
pub mod error;
pub mod session;

pub use approval::{
    ApprovalController, CommandPreview, Dispatch, Effect, OperatorAction, PendingCommand,
    Rejection,
};
pub use backend::{CommandExecutor, CommandTranslator, HttpBackend, MissingExecutor, MissingTranslator};
pub use classify::DestructiveVocabulary;
pub use config::{load_settings, ClientSettings};
pub use conversation::ConversationLog;
pub use error::{ExecutionError, TranslationError};
pub use session::{spawn_session, SessionError, SessionEvent, SessionHandle, SessionSnapshot};
