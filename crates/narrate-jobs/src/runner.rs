use std::{sync::Arc, time::Instant};

use narrate_config::{DeliveryConfig, EngineConfig, VoiceDefaults};
use narrate_core::HttpError;
use narrate_telemetry::JobMetrics;
use tokio::sync::Semaphore;
use tracing::Instrument;

use crate::{
    command::{EngineCommand, VoiceParams},
    delivery::{Delivered, Delivery, buffered::BufferedDelivery, referenced::ReferencedDelivery},
    error::{JobError, Result},
    executor::Executor,
    job::{Job, JobStatus},
    types::SynthesisRequest,
    workspace::Workspace,
};

/// Characters of input text included in debug logs
const TEXT_PREVIEW_CHARS: usize = 50;

/// Runs one job per request through the whole pipeline
///
/// Holds configuration only; no job state lives here, so one runner is
/// shared by every in-flight request.
pub struct JobRunner {
    workspace: Workspace,
    engine: EngineConfig,
    executor: Executor,
    defaults: VoiceDefaults,
    delivery: Box<dyn Delivery>,
    admission: Option<Semaphore>,
    max_text_bytes: usize,
    metrics: JobMetrics,
}

impl JobRunner {
    /// Validate `request`, run its job and deliver the result
    ///
    /// Every artifact the job created is gone (or published, for
    /// referenced delivery) by the time this returns, whatever the outcome.
    /// Dropping the future part way through has the same guarantee.
    pub async fn synthesize(&self, request: SynthesisRequest) -> Result<Delivered> {
        let started = Instant::now();

        let text = match self.validate(request.text) {
            Ok(text) => text,
            Err(e) => {
                self.metrics.record(e.outcome(), started);
                return Err(e);
            }
        };

        let params = VoiceParams::resolve(
            request.voice.as_deref(),
            request.rate.as_deref(),
            request.pitch.as_deref(),
            &self.defaults,
        );

        let mut job = Job::new(text, params);
        let span = tracing::info_span!("job", id = %job.id());

        let result = self.run(&mut job).instrument(span.clone()).await;

        span.in_scope(|| match result {
            Ok(delivered) => {
                self.metrics.record("succeeded", started);
                tracing::info!(
                    delivery = self.delivery.name(),
                    elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
                    "job succeeded"
                );
                Ok(delivered)
            }
            Err(e) => {
                if !job.status().is_terminal() {
                    job.advance(JobStatus::Failed);
                }
                self.metrics.record(e.outcome(), started);
                tracing::warn!(
                    error_type = e.error_type(),
                    outcome = e.outcome(),
                    status = %job.status(),
                    "job failed: {e}"
                );
                Err(e)
            }
        })
    }

    fn validate(&self, text: Option<String>) -> Result<String> {
        let text = text.unwrap_or_default();

        if text.trim().is_empty() {
            return Err(JobError::Validation("Text is required".to_string()));
        }

        if text.len() > self.max_text_bytes {
            return Err(JobError::Validation(format!(
                "Text is too long, limit is {} bytes",
                self.max_text_bytes
            )));
        }

        Ok(text)
    }

    async fn run(&self, job: &mut Job) -> Result<Delivered> {
        tracing::debug!(
            chars = job.text().chars().count(),
            preview = %preview(job.text()),
            voice = %job.params().voice,
            rate = %job.params().rate,
            pitch = %job.params().pitch,
            "job accepted"
        );

        let _permit = match self.admission {
            Some(ref semaphore) => Some(
                semaphore
                    .acquire()
                    .await
                    .map_err(|_| JobError::Resource("admission limit closed".to_string()))?,
            ),
            None => None,
        };

        let mut scope = self.workspace.open(job.id()).await?;
        scope.write_input(job.text()).await?;

        let command = EngineCommand::build(&self.engine, scope.input_path(), scope.output_path(), job.params());

        job.advance(JobStatus::Running);
        let synthesized = self.executor.run(&command, scope.output_path()).await?;
        job.advance(JobStatus::Succeeded);

        tracing::debug!(
            bytes = synthesized.audio_len(),
            engine_ms = u64::try_from(synthesized.elapsed().as_millis()).unwrap_or(u64::MAX),
            "engine produced audio"
        );

        self.delivery.deliver(job.id(), scope, synthesized).await
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }
}

fn preview(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(TEXT_PREVIEW_CHARS).collect();
    if chars.next().is_some() { format!("{head}...") } else { head }
}

/// Builder for constructing the job runner from configuration
pub struct JobRunnerBuilder<'a> {
    config: &'a narrate_config::Config,
    delivery: Option<Box<dyn Delivery>>,
}

impl<'a> JobRunnerBuilder<'a> {
    pub const fn new(config: &'a narrate_config::Config) -> Self {
        Self { config, delivery: None }
    }

    /// Use `delivery` instead of the configured strategy
    pub fn delivery(mut self, delivery: impl Delivery + 'static) -> Self {
        self.delivery = Some(Box::new(delivery));
        self
    }

    pub fn build(self) -> anyhow::Result<JobRunner> {
        let config = self.config;

        VoiceParams::check_defaults(&config.jobs.defaults).map_err(|e| anyhow::anyhow!("jobs.defaults: {e}"))?;

        let timeout = config.engine.timeout_duration()?;
        let executor = Executor::new(config.engine.script.clone(), timeout);

        let delivery: Box<dyn Delivery> = match (self.delivery, &config.delivery) {
            (Some(delivery), _) => delivery,
            (None, DeliveryConfig::Buffered(_)) => Box::new(BufferedDelivery),
            (None, DeliveryConfig::Referenced(referenced)) => Box::new(ReferencedDelivery::from_config(referenced)),
        };

        let admission = config.jobs.max_concurrent.map(Semaphore::new);
        let workspace = Workspace::new(config.jobs.working_dir());

        tracing::debug!(
            program = %config.engine.program,
            working_dir = %workspace.root().display(),
            delivery = delivery.name(),
            timeout_secs = timeout.as_secs_f64(),
            max_concurrent = ?config.jobs.max_concurrent,
            "job runner initialized"
        );

        Ok(JobRunner {
            workspace,
            engine: config.engine.clone(),
            executor,
            defaults: config.jobs.defaults.clone(),
            delivery,
            admission,
            max_text_bytes: config.jobs.max_text_bytes,
            metrics: JobMetrics::default(),
        })
    }
}

/// Build a shared runner from configuration
pub fn build_runner(config: &narrate_config::Config) -> anyhow::Result<Arc<JobRunner>> {
    let runner = JobRunnerBuilder::new(config)
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to initialize job runner: {e}"))?;

    Ok(Arc::new(runner))
}
