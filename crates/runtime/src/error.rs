//! Runtime-level errors.

use battle_core::{BattleError, CoreError, SaveError};

#[derive(Debug, Clone, thiserror::Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Battle(#[from] BattleError),

    #[error(transparent)]
    Save(#[from] SaveError),

    #[error("save blob failed to decode: {0}")]
    BadSaveBlob(String),

    #[error("no battle in progress")]
    NoBattle,

    #[error("content failed to load: {0}")]
    Content(String),

    #[error("unknown unit template '{0}'")]
    UnknownTemplate(String),

    #[error("runtime command channel closed")]
    CommandChannelClosed,

    #[error("runtime reply channel closed")]
    ReplyChannelClosed,
}

impl RuntimeError {
    /// Stable code for transports and logs.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Battle(e) => e.error_code(),
            Self::Save(e) => e.error_code(),
            Self::BadSaveBlob(_) => "RUNTIME_BAD_SAVE_BLOB",
            Self::NoBattle => "RUNTIME_NO_BATTLE",
            Self::Content(_) => "RUNTIME_CONTENT_LOAD_FAILED",
            Self::UnknownTemplate(_) => "RUNTIME_UNKNOWN_TEMPLATE",
            Self::CommandChannelClosed => "RUNTIME_COMMAND_CHANNEL_CLOSED",
            Self::ReplyChannelClosed => "RUNTIME_REPLY_CHANNEL_CLOSED",
        }
    }
}

pub type Result<T> = std::result::Result<T, RuntimeError>;
