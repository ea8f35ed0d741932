use async_trait::async_trait;

use super::{Delivered, Delivery};
use crate::{
    error::{JobError, Result},
    executor::Synthesized,
    id::JobId,
    workspace::JobScope,
};

/// Reads the audio into memory and closes the whole scope
#[derive(Debug, Default)]
pub struct BufferedDelivery;

#[async_trait]
impl Delivery for BufferedDelivery {
    async fn deliver(&self, id: &JobId, scope: JobScope, synthesized: Synthesized) -> Result<Delivered> {
        let read = tokio::fs::read(scope.output_path()).await;

        // Both artifacts go regardless of whether the read worked
        scope.close().await;

        let audio = read.map_err(|e| JobError::Delivery(format!("failed to read audio for job {id}: {e}")))?;

        if audio.is_empty() {
            return Err(JobError::Delivery(format!("audio for job {id} vanished before delivery")));
        }

        tracing::debug!(bytes = audio.len(), engine_ms = synthesized.elapsed().as_millis(), "audio buffered");

        Ok(Delivered::Audio(audio))
    }

    fn name(&self) -> &'static str {
        "buffered"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workspace::Workspace;

    #[tokio::test]
    async fn returns_audio_and_removes_both_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let id = JobId::generate();
        let mut scope = Workspace::new(dir.path()).open(&id).await.unwrap();
        scope.write_input("hello").await.unwrap();
        std::fs::write(scope.output_path(), b"ID3audio").unwrap();

        let delivered = BufferedDelivery
            .deliver(&id, scope, Synthesized::for_tests(8))
            .await
            .unwrap();

        let Delivered::Audio(audio) = delivered else {
            panic!("expected buffered audio");
        };
        assert_eq!(audio, b"ID3audio");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn unreadable_audio_is_a_delivery_failure() {
        let dir = tempfile::tempdir().unwrap();
        let id = JobId::generate();
        let mut scope = Workspace::new(dir.path()).open(&id).await.unwrap();
        scope.write_input("hello").await.unwrap();

        let err = BufferedDelivery
            .deliver(&id, scope, Synthesized::for_tests(8))
            .await
            .unwrap_err();

        assert!(matches!(err, JobError::Delivery(_)));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
