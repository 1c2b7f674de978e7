use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::data::codec::CoerceError;
use crate::data::revert::RevertReason;

/// Closed set of failure categories reported to consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    MalformedRequest,
    UnknownExercise,
    FunctionNotFound,
    NotReadOnly,
    Encoding,
    Decoding,
    Revert,
    Panic,
    CustomError,
    Transport,
    Timeout,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::MalformedRequest => write!(f, "malformed_request"),
            ErrorKind::UnknownExercise => write!(f, "unknown_exercise"),
            ErrorKind::FunctionNotFound => write!(f, "function_not_found"),
            ErrorKind::NotReadOnly => write!(f, "not_read_only"),
            ErrorKind::Encoding => write!(f, "encoding"),
            ErrorKind::Decoding => write!(f, "decoding"),
            ErrorKind::Revert => write!(f, "revert"),
            ErrorKind::Panic => write!(f, "panic"),
            ErrorKind::CustomError => write!(f, "custom_error"),
            ErrorKind::Transport => write!(f, "transport"),
            ErrorKind::Timeout => write!(f, "timeout"),
        }
    }
}

#[derive(Debug, Error)]
pub enum InvocationError {
    #[error("malformed request: {0}")]
    MalformedRequest(String),

    #[error("unknown exercise `{0}`")]
    UnknownExercise(String),

    #[error("function `{0}` not found in ABI")]
    FunctionNotFound(String),

    #[error("function `{0}` is not a view or pure function")]
    NotReadOnly(String),

    #[error("function `{function}` expects {expected} argument(s), got {actual}")]
    ArgumentCount {
        function: String,
        expected: usize,
        actual: usize,
    },

    #[error(transparent)]
    Argument(#[from] CoerceError),

    #[error("failed to encode call to `{function}`: {reason}")]
    Encoding { function: String, reason: String },

    #[error("failed to decode return data of `{function}`: {reason}")]
    Decoding { function: String, reason: String },

    #[error("{0}")]
    Reverted(RevertReason),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("call timed out after {}ms", .0.as_millis())]
    Timeout(Duration),
}

impl InvocationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            InvocationError::MalformedRequest(_) => ErrorKind::MalformedRequest,
            InvocationError::UnknownExercise(_) => ErrorKind::UnknownExercise,
            InvocationError::FunctionNotFound(_) => ErrorKind::FunctionNotFound,
            InvocationError::NotReadOnly(_) => ErrorKind::NotReadOnly,
            InvocationError::ArgumentCount { .. }
            | InvocationError::Argument(_)
            | InvocationError::Encoding { .. } => ErrorKind::Encoding,
            InvocationError::Decoding { .. } => ErrorKind::Decoding,
            InvocationError::Reverted(reason) => reason.kind(),
            InvocationError::Transport(_) => ErrorKind::Transport,
            InvocationError::Timeout(_) => ErrorKind::Timeout,
        }
    }

    /// Structured payload accompanying the message, when there is one.
    pub fn details(&self) -> Option<Value> {
        match self {
            InvocationError::Reverted(reason) => reason.details(),
            InvocationError::Argument(err) => Some(serde_json::json!({
                "path": err.path,
                "type": err.ty,
            })),
            _ => None,
        }
    }
}
