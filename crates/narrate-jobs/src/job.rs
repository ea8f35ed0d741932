use std::fmt;

use crate::{command::VoiceParams, id::JobId};

/// Lifecycle of a job; `Succeeded` and `Failed` are terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
}

impl JobStatus {
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }

    const fn can_become(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Running | Self::Failed) | (Self::Running, Self::Succeeded | Self::Failed)
        )
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One synthesis request from acceptance to a terminal state
///
/// Owned by the task handling the request and never shared.
#[derive(Debug)]
pub struct Job {
    id: JobId,
    text: String,
    params: VoiceParams,
    status: JobStatus,
}

impl Job {
    pub fn new(text: String, params: VoiceParams) -> Self {
        Self {
            id: JobId::generate(),
            text,
            params,
            status: JobStatus::Pending,
        }
    }

    pub const fn id(&self) -> &JobId {
        &self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub const fn params(&self) -> &VoiceParams {
        &self.params
    }

    pub const fn status(&self) -> JobStatus {
        self.status
    }

    /// Move to `next`, ignoring transitions the lifecycle does not allow
    ///
    /// A terminal job never changes again.
    pub fn advance(&mut self, next: JobStatus) {
        if self.status.can_become(next) {
            tracing::trace!(from = %self.status, to = %next, "job status changed");
            self.status = next;
        } else {
            tracing::debug!(from = %self.status, to = %next, "ignored job status transition");
        }
    }
}
