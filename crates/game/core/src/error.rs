//! Core error taxonomy.
//!
//! Every public error enum implements [`CoreError`], exposing a coarse
//! [`ErrorSeverity`] and a stable machine-readable code. Facade callers route
//! on the severity; the code string survives serialization boundaries.

use std::fmt;

/// Severity classification for routing and logging decisions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorSeverity {
    /// Caller supplied something the rules reject; retry with different input.
    Validation,
    /// Transient state conflict (occupied cell, dead unit); safe to skip.
    Recoverable,
    /// Bad data at startup; the offending entry is dropped and logged.
    Malformed,
    /// An internal invariant broke; abort the battle, preserve the save.
    Internal,
    /// Unrecoverable at any level.
    Fatal,
}

/// Common contract for all battle-core error types.
pub trait CoreError: fmt::Display {
    fn severity(&self) -> ErrorSeverity;

    /// Stable machine-readable code (SCREAMING_SNAKE, prefixed per module).
    fn error_code(&self) -> &'static str;

    /// True when the caller may simply retry with different input.
    fn is_recoverable(&self) -> bool {
        matches!(
            self.severity(),
            ErrorSeverity::Validation | ErrorSeverity::Recoverable
        )
    }
}

/// Errors raised by lookups into battle state.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LookupError {
    #[error("unknown unit {0}")]
    UnknownUnit(crate::types::UnitId),

    #[error("unknown action '{0}'")]
    UnknownAction(String),

    #[error("position {0} outside the grid")]
    OutOfBounds(crate::types::Position),
}

impl CoreError for LookupError {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Validation
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::UnknownUnit(_) => "LOOKUP_UNKNOWN_UNIT",
            Self::UnknownAction(_) => "LOOKUP_UNKNOWN_ACTION",
            Self::OutOfBounds(_) => "LOOKUP_OUT_OF_BOUNDS",
        }
    }
}

/// Internal invariant violations. These abort the battle.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum InvariantError {
    #[error("timeline holds {timeline} events but queues hold {queued} actions")]
    TimelineMismatch { timeline: usize, queued: usize },

    #[error("unit {unit} occupies {cell} but reports position {reported:?}")]
    OccupancyDesync {
        unit: crate::types::UnitId,
        cell: crate::types::Position,
        reported: Option<crate::types::Position>,
    },
}

impl CoreError for InvariantError {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Internal
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::TimelineMismatch { .. } => "INVARIANT_TIMELINE_MISMATCH",
            Self::OccupancyDesync { .. } => "INVARIANT_OCCUPANCY_DESYNC",
        }
    }
}
