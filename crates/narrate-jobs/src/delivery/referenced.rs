use std::{
    io,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use narrate_config::ReferencedConfig;

use super::{Delivered, Delivery};
use crate::{
    error::{JobError, Result},
    executor::Synthesized,
    id::JobId,
    workspace::JobScope,
};

/// Publishes the audio under a served directory and returns its URL
///
/// Only the input artifact is removed. Published files stay until the
/// retention sweeper (if configured) deletes them.
#[derive(Debug, Clone)]
pub struct ReferencedDelivery {
    public_dir: PathBuf,
    url_prefix: String,
}

impl ReferencedDelivery {
    pub fn new(public_dir: impl Into<PathBuf>, url_prefix: &str) -> Self {
        Self {
            public_dir: public_dir.into(),
            url_prefix: url_prefix.trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &ReferencedConfig) -> Self {
        Self::new(&config.public_dir, &config.url_prefix)
    }

    pub fn public_dir(&self) -> &Path {
        &self.public_dir
    }

    fn url_for(&self, file_name: &str) -> String {
        format!("{}/{file_name}", self.url_prefix)
    }
}

#[async_trait]
impl Delivery for ReferencedDelivery {
    async fn deliver(&self, id: &JobId, mut scope: JobScope, _synthesized: Synthesized) -> Result<Delivered> {
        let file_name = format!("{id}.mp3");
        let destination = self.public_dir.join(&file_name);

        tokio::fs::create_dir_all(&self.public_dir)
            .await
            .map_err(|e| JobError::Delivery(format!("failed to create {}: {e}", self.public_dir.display())))?;

        match tokio::fs::rename(scope.output_path(), &destination).await {
            Ok(()) => scope.release_output(),
            Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
                // The scope still owns the source file, so close() removes it
                copy_across(scope.output_path(), &destination).await?;
            }
            Err(e) => {
                return Err(JobError::Delivery(format!(
                    "failed to publish audio for job {id}: {e}"
                )));
            }
        }

        scope.close().await;

        tracing::debug!(path = %destination.display(), "audio published");

        Ok(Delivered::Reference {
            url: self.url_for(&file_name),
        })
    }

    fn name(&self) -> &'static str {
        "referenced"
    }
}

/// Copy for when the working area and public directory sit on different filesystems
async fn copy_across(from: &Path, to: &Path) -> Result<()> {
    if let Err(e) = tokio::fs::copy(from, to).await {
        if let Err(cleanup) = tokio::fs::remove_file(to).await
            && cleanup.kind() != io::ErrorKind::NotFound
        {
            tracing::warn!(path = %to.display(), error = %cleanup, "failed to remove partial copy");
        }

        return Err(JobError::Delivery(format!("failed to copy audio to {}: {e}", to.display())));
    }

    Ok(())
}
