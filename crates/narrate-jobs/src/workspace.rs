//! Working area and per-job artifact scopes

use std::{
    io,
    path::{Path, PathBuf},
};

use tokio::io::AsyncWriteExt;

use crate::{
    error::{JobError, Result},
    id::JobId,
};

/// Directory that job artifacts are created in
///
/// Passed into the pipeline rather than discovered globally, so tests and
/// deployments each choose their own. Jobs sharing a workspace are kept
/// apart only by their unique ids.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Reserve artifact paths for `id`, creating the working area if needed
    ///
    /// # Errors
    ///
    /// Returns [`JobError::Resource`] if the working area cannot be created
    pub async fn open(&self, id: &JobId) -> Result<JobScope> {
        tokio::fs::create_dir_all(&self.root).await.map_err(|e| {
            JobError::Resource(format!("failed to create working area {}: {e}", self.root.display()))
        })?;

        Ok(JobScope {
            input: self.root.join(format!("{id}.txt")),
            output: self.root.join(format!("{id}.mp3")),
            input_created: false,
            owns_output: true,
            closed: false,
        })
    }
}

/// Artifacts of one job, removed when the scope ends
///
/// [`close`](Self::close) removes them asynchronously on the normal path.
/// If the scope is dropped without being closed (an error unwound past it
/// or the request future was cancelled) `Drop` removes them instead, so
/// every exit path reclaims the files exactly once.
#[derive(Debug)]
pub struct JobScope {
    input: PathBuf,
    output: PathBuf,
    input_created: bool,
    owns_output: bool,
    closed: bool,
}

impl JobScope {
    pub fn input_path(&self) -> &Path {
        &self.input
    }

    pub fn output_path(&self) -> &Path {
        &self.output
    }

    /// Write the job text to the input artifact
    ///
    /// The file is created exclusively; an existing file with the same name
    /// is an error rather than something to overwrite.
    ///
    /// # Errors
    ///
    /// Returns [`JobError::Resource`] if the file cannot be created or written
    pub async fn write_input(&mut self, text: &str) -> Result<()> {
        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.input)
            .await
            .map_err(|e| JobError::Resource(format!("failed to create {}: {e}", self.input.display())))?;

        self.input_created = true;

        file.write_all(text.as_bytes())
            .await
            .map_err(|e| JobError::Resource(format!("failed to write {}: {e}", self.input.display())))?;
        file.flush()
            .await
            .map_err(|e| JobError::Resource(format!("failed to flush {}: {e}", self.input.display())))?;

        Ok(())
    }

    /// Hand the output artifact over to the caller
    ///
    /// After this the scope no longer deletes the output path; used once
    /// delivery has moved the audio somewhere permanent.
    pub fn release_output(&mut self) {
        self.owns_output = false;
    }

    /// Remove the artifacts this scope still owns
    pub async fn close(mut self) {
        for path in self.owned_paths() {
            if let Err(e) = tokio::fs::remove_file(path).await {
                log_remove_failure(path, &e);
            }
        }

        self.closed = true;
    }

    /// Paths this scope is responsible for removing
    ///
    /// Nothing is owned until the input artifact has been created, so a
    /// scope that failed early never touches another job's files.
    fn owned_paths(&self) -> impl Iterator<Item = &Path> {
        let input = self.input_created.then_some(self.input.as_path());
        let output = (self.input_created && self.owns_output).then_some(self.output.as_path());
        input.into_iter().chain(output)
    }
}

impl Drop for JobScope {
    fn drop(&mut self) {
        if self.closed {
            return;
        }

        for path in self.owned_paths() {
            if let Err(e) = std::fs::remove_file(path) {
                log_remove_failure(path, &e);
            }
        }
    }
}

fn log_remove_failure(path: &Path, error: &io::Error) {
    if error.kind() != io::ErrorKind::NotFound {
        tracing::warn!(path = %path.display(), error = %error, "failed to remove job artifact");
    }
}
