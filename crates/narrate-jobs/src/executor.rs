//! Runs the engine process and classifies how it ended

use std::{
    path::{Path, PathBuf},
    process::{ExitStatus, Stdio},
    time::{Duration, Instant},
};

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::{
    command::EngineCommand,
    error::{ExecutionFailure, JobError, Result},
};

/// How long to keep reading engine output once the engine has exited
const PIPE_GRACE: Duration = Duration::from_millis(250);

/// Proof that the engine succeeded and left non-empty audio behind
///
/// Only [`Executor::run`] can create one, and delivery requires one, so
/// the output artifact is never read for a job that has not succeeded.
#[derive(Debug)]
pub struct Synthesized {
    audio_len: u64,
    elapsed: Duration,
}

impl Synthesized {
    /// Size of the produced audio in bytes
    pub const fn audio_len(&self) -> u64 {
        self.audio_len
    }

    /// Wall time of the engine run
    pub const fn elapsed(&self) -> Duration {
        self.elapsed
    }

    #[cfg(test)]
    pub(crate) const fn for_tests(audio_len: u64) -> Self {
        Self {
            audio_len,
            elapsed: Duration::ZERO,
        }
    }
}

/// Spawns one engine process per job and waits for it under a time budget
#[derive(Debug, Clone)]
pub struct Executor {
    script: Option<PathBuf>,
    timeout: Duration,
}

impl Executor {
    pub const fn new(script: Option<PathBuf>, timeout: Duration) -> Self {
        Self { script, timeout }
    }

    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run `command` once and check that it produced `output`
    ///
    /// The engine leads its own process group. The whole group is killed
    /// when this returns or is cancelled, so processes the engine forked
    /// do not outlive the job. Classification happens as soon as the
    /// engine exits; output pipes still held open by its children get a
    /// short grace period and then whatever arrived is kept.
    ///
    /// # Errors
    ///
    /// - [`JobError::EngineUnavailable`] if the engine script is missing or
    ///   the program cannot be started
    /// - [`JobError::Execution`] for a non-zero exit, missing or empty
    ///   output, or a timeout
    pub async fn run(&self, command: &EngineCommand, output: &Path) -> Result<Synthesized> {
        if let Some(ref script) = self.script
            && !tokio::fs::try_exists(script).await.unwrap_or(false)
        {
            return Err(JobError::EngineUnavailable(format!(
                "engine script {} not found",
                script.display()
            )));
        }

        let started = Instant::now();

        let mut process = command.to_command();
        process
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        process.process_group(0);

        let mut child = process.spawn().map_err(|e| {
            JobError::EngineUnavailable(format!(
                "failed to start {}: {e}",
                command.program().to_string_lossy()
            ))
        })?;
        // Declared after `child` so the group is signalled before the child is dropped
        let group = ProcessGroup::led_by(child.id());

        tracing::debug!(pid = child.id(), "engine started");

        let mut stdout = child.stdout.take();
        let mut stderr = child.stderr.take();
        let mut stdout_buf = Vec::new();
        let mut stderr_buf = Vec::new();

        let waited = {
            let drains = async {
                tokio::join!(
                    drain(stdout.as_mut(), &mut stdout_buf),
                    drain(stderr.as_mut(), &mut stderr_buf),
                );
            };
            tokio::pin!(drains);
            let mut drained = false;

            let waited = tokio::time::timeout(self.timeout, async {
                loop {
                    tokio::select! {
                        status = child.wait() => break status,
                        () = &mut drains, if !drained => drained = true,
                    }
                }
            })
            .await;

            // Anything the engine forked may still hold the pipes open
            if !drained
                && matches!(waited, Ok(Ok(_)))
                && tokio::time::timeout(PIPE_GRACE, &mut drains).await.is_err()
            {
                tracing::debug!("engine output still open after exit");
            }

            waited
        };

        let elapsed = started.elapsed();

        let status = match waited {
            Ok(Ok(status)) => status,
            Ok(Err(e)) => {
                return Err(JobError::EngineUnavailable(format!("failed to wait for engine: {e}")));
            }
            Err(_) => {
                group.kill();
                if let Err(e) = child.kill().await {
                    tracing::warn!(error = %e, "failed to kill timed out engine");
                }

                let failure = ExecutionFailure::TimedOut {
                    timeout: self.timeout,
                    diagnostics: diagnostics(&stdout_buf, &stderr_buf),
                };
                log_failure(&failure, elapsed);
                return Err(failure.into());
            }
        };

        tracing::debug!(
            code = status.code(),
            elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            stdout = %String::from_utf8_lossy(&stdout_buf).trim(),
            "engine finished"
        );

        classify(status, output, &stdout_buf, &stderr_buf, elapsed).await
    }
}

/// The engine's process group, killed as a whole when dropped
///
/// The engine is spawned as a group leader, so everything it forks shares
/// the group and can be signalled even after the leader has exited.
struct ProcessGroup {
    #[cfg(unix)]
    leader: Option<nix::unistd::Pid>,
}

impl ProcessGroup {
    fn led_by(pid: Option<u32>) -> Self {
        #[cfg(unix)]
        {
            Self {
                leader: pid.and_then(|pid| i32::try_from(pid).ok()).map(nix::unistd::Pid::from_raw),
            }
        }
        #[cfg(not(unix))]
        {
            let _ = pid;
            Self {}
        }
    }

    fn kill(&self) {
        #[cfg(unix)]
        if let Some(leader) = self.leader {
            match nix::sys::signal::killpg(leader, nix::sys::signal::Signal::SIGKILL) {
                // ESRCH: every member has already exited
                Ok(()) | Err(nix::errno::Errno::ESRCH) => {}
                Err(e) => tracing::warn!(error = %e, "failed to kill engine process group"),
            }
        }
    }
}

impl Drop for ProcessGroup {
    fn drop(&mut self) {
        self.kill();
    }
}

/// Decide between success and failure once the engine has exited
///
/// Success needs both a zero exit status and a non-empty output file.
async fn classify(
    status: ExitStatus,
    output: &Path,
    stdout: &[u8],
    stderr: &[u8],
    elapsed: Duration,
) -> Result<Synthesized> {
    if !status.success() {
        let failure = ExecutionFailure::NonZeroExit {
            code: status.code(),
            diagnostics: diagnostics(stdout, stderr),
        };
        log_failure(&failure, elapsed);
        return Err(failure.into());
    }

    match tokio::fs::metadata(output).await {
        Ok(metadata) if metadata.is_file() && metadata.len() > 0 => Ok(Synthesized {
            audio_len: metadata.len(),
            elapsed,
        }),
        _ => {
            let failure = ExecutionFailure::EmptyOutput {
                diagnostics: diagnostics(stdout, stderr),
            };
            log_failure(&failure, elapsed);
            Err(failure.into())
        }
    }
}

/// Read a child pipe to the end, keeping whatever arrived if cut short
async fn drain<R: AsyncRead + Unpin>(pipe: Option<&mut R>, buf: &mut Vec<u8>) {
    let Some(pipe) = pipe else {
        return;
    };

    if let Err(e) = pipe.read_to_end(buf).await {
        tracing::debug!(error = %e, "failed to read engine output");
    }
}

/// Engine diagnostics: stderr, or stdout for engines that report errors there
fn diagnostics(stdout: &[u8], stderr: &[u8]) -> String {
    let stderr = String::from_utf8_lossy(stderr);
    if stderr.trim().is_empty() {
        String::from_utf8_lossy(stdout).trim().to_string()
    } else {
        stderr.trim().to_string()
    }
}

fn log_failure(failure: &ExecutionFailure, elapsed: Duration) {
    tracing::warn!(
        kind = failure.kind(),
        elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
        diagnostics = failure.diagnostics(),
        "engine run failed: {failure}"
    );
}
