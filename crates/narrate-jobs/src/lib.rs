#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

mod command;
mod delivery;
mod error;
mod executor;
mod id;
mod job;
mod request;
mod retention;
mod runner;
#[cfg(all(test, unix))]
mod testing;
mod types;
mod workspace;

use std::sync::Arc;

use axum::{Router, extract::State, response::IntoResponse, routing::post};

pub use command::{EngineCommand, VoiceParams};
pub use delivery::{Delivered, Delivery, buffered::BufferedDelivery, referenced::ReferencedDelivery};
pub use error::{ExecutionFailure, JobError, Result};
pub use executor::{Executor, Synthesized};
pub use id::JobId;
pub use job::{Job, JobStatus};
pub use retention::RetentionSweeper;
pub use runner::{JobRunner, JobRunnerBuilder, build_runner};
pub use types::SynthesisRequest;
pub use workspace::{JobScope, Workspace};
use request::ExtractPayload;

/// Path of the synthesis endpoint
pub const GENERATE_PATH: &str = "/api/generate";

/// Create the endpoint router for synthesis jobs
pub fn endpoint_router() -> Router<Arc<JobRunner>> {
    Router::new().route(GENERATE_PATH, post(generate))
}

/// Handle one synthesis request
async fn generate(
    State(runner): State<Arc<JobRunner>>,
    ExtractPayload(request): ExtractPayload<SynthesisRequest>,
) -> Result<axum::response::Response> {
    let delivered = runner.synthesize(request).await?;
    Ok(delivered.into_response())
}
