use std::time::Duration;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use narrate_core::HttpError;
use serde::Serialize;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, JobError>;

/// Longest stretch of engine diagnostics included in a client-facing message
const DIAGNOSTIC_TAIL_CHARS: usize = 512;

/// Everything that can stop a synthesis request from producing audio
#[derive(Debug, Error)]
pub enum JobError {
    /// The request was rejected before any job was created
    #[error("{0}")]
    Validation(String),

    /// The working area could not be created, written or cleaned
    ///
    /// The detail may contain filesystem paths and is only logged.
    #[error("resource error: {0}")]
    Resource(String),

    /// The engine could not be located or started
    #[error("synthesis engine unavailable: {0}")]
    EngineUnavailable(String),

    /// The engine ran but did not produce usable audio
    #[error(transparent)]
    Execution(#[from] ExecutionFailure),

    /// Audio was synthesized but could not be handed back to the caller
    #[error("delivery failed: {0}")]
    Delivery(String),
}

/// Why an engine run was classified as failed
#[derive(Debug, Error)]
pub enum ExecutionFailure {
    /// The engine exited unsuccessfully, or was killed by a signal (`code` is `None`)
    #[error("engine exited with {}", exit_description(*.code))]
    NonZeroExit { code: Option<i32>, diagnostics: String },

    /// The engine exited successfully but left no audio behind
    #[error("engine exited successfully but produced no audio")]
    EmptyOutput { diagnostics: String },

    /// The engine outlived its time budget and was killed
    #[error("engine timed out after {}s", .timeout.as_secs_f64())]
    TimedOut { timeout: Duration, diagnostics: String },
}

impl ExecutionFailure {
    /// Captured stderr (or stdout when stderr was empty) of the engine run
    pub fn diagnostics(&self) -> &str {
        match self {
            Self::NonZeroExit { diagnostics, .. }
            | Self::EmptyOutput { diagnostics }
            | Self::TimedOut { diagnostics, .. } => diagnostics,
        }
    }

    /// Short label used in logs and metrics
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::NonZeroExit { .. } => "non_zero_exit",
            Self::EmptyOutput { .. } => "empty_output",
            Self::TimedOut { .. } => "timeout",
        }
    }
}

impl JobError {
    /// Outcome label recorded on job metrics
    pub const fn outcome(&self) -> &'static str {
        match self {
            Self::Validation(_) => "rejected",
            Self::Resource(_) => "resource_error",
            Self::EngineUnavailable(_) => "engine_unavailable",
            Self::Execution(failure) => failure.kind(),
            Self::Delivery(_) => "delivery_failure",
        }
    }
}

fn exit_description(code: Option<i32>) -> String {
    code.map_or_else(|| "a signal".to_string(), |code| format!("status {code}"))
}

/// Last `max_chars` characters of `text`, on a char boundary
fn tail(text: &str, max_chars: usize) -> &str {
    let skip = text.chars().count().saturating_sub(max_chars);
    text.char_indices().nth(skip).map_or("", |(idx, _)| &text[idx..])
}

impl HttpError for JobError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Resource(_) | Self::Delivery(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::EngineUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Execution(ExecutionFailure::TimedOut { .. }) => StatusCode::GATEWAY_TIMEOUT,
            Self::Execution(_) => StatusCode::BAD_GATEWAY,
        }
    }

    fn error_type(&self) -> &str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::Resource(_) => "resource_error",
            Self::EngineUnavailable(_) => "engine_unavailable",
            Self::Execution(ExecutionFailure::TimedOut { .. }) => "execution_timeout",
            Self::Execution(_) => "execution_failure",
            Self::Delivery(_) => "delivery_failure",
        }
    }

    fn client_message(&self) -> String {
        match self {
            Self::Validation(message) => message.clone(),
            Self::Resource(_) => "Failed to prepare synthesis job".to_string(),
            Self::EngineUnavailable(_) => "Synthesis engine is unavailable".to_string(),
            Self::Execution(failure) => {
                let diagnostics = tail(failure.diagnostics().trim(), DIAGNOSTIC_TAIL_CHARS);
                if diagnostics.is_empty() {
                    format!("Audio generation failed: {failure}")
                } else {
                    format!("Audio generation failed: {failure}: {diagnostics}")
                }
            }
            Self::Delivery(_) => "Failed to deliver synthesized audio".to_string(),
        }
    }
}

/// Failure body returned to callers
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for JobError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: self.client_message(),
        };

        (status, Json(body)).into_response()
    }
}
