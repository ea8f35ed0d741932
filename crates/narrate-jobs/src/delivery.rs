pub mod buffered;
pub mod referenced;

use async_trait::async_trait;
use axum::{
    Json,
    body::Body,
    response::{IntoResponse, Response},
};
use http::{StatusCode, header};
use serde::Serialize;

use crate::{error::Result, executor::Synthesized, id::JobId, workspace::JobScope};

/// Hands a finished job's audio back to the caller
///
/// Exactly one strategy is active per deployment. Implementations own the
/// job scope from here on and must close it; a failure while delivering
/// is reported as [`crate::JobError::Delivery`], never as success.
#[async_trait]
pub trait Delivery: Send + Sync {
    /// Deliver the audio left in `scope`'s output artifact
    async fn deliver(&self, id: &JobId, scope: JobScope, synthesized: Synthesized) -> Result<Delivered>;

    /// Strategy name for logs
    fn name(&self) -> &str;
}

/// What the caller receives for a successful job
#[derive(Debug)]
pub enum Delivered {
    /// Audio bytes returned as the response body
    Audio(Vec<u8>),
    /// Location the audio was published at
    Reference { url: String },
}

#[derive(Serialize)]
struct ReferenceBody<'a> {
    success: bool,
    url: &'a str,
}

impl IntoResponse for Delivered {
    fn into_response(self) -> Response {
        match self {
            Self::Audio(audio) => {
                let length = audio.len();
                (
                    StatusCode::OK,
                    [
                        (header::CONTENT_TYPE, "audio/mpeg".to_string()),
                        (header::CONTENT_LENGTH, length.to_string()),
                    ],
                    Body::from(audio),
                )
                    .into_response()
            }
            Self::Reference { url } => Json(ReferenceBody {
                success: true,
                url: &url,
            })
            .into_response(),
        }
    }
}
