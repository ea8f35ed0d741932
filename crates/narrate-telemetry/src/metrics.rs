//! Metric names and recording helpers

use std::time::Instant;

use opentelemetry::{
    KeyValue, global,
    metrics::{Counter, Histogram},
};

/// Wall time of one synthesis job, from acceptance to delivery or failure
pub const JOB_DURATION: &str = "narrate.job.duration";
/// Finished synthesis jobs
pub const JOB_COUNT: &str = "narrate.job.count";

/// Instruments recorded once per finished job, tagged by `outcome`
///
/// Backed by the global meter provider, so recording is a no-op until
/// OTLP export is configured.
#[derive(Clone)]
pub struct JobMetrics {
    duration: Histogram<f64>,
    count: Counter<u64>,
}

impl Default for JobMetrics {
    fn default() -> Self {
        let meter = global::meter("narrate");

        Self {
            duration: meter
                .f64_histogram(JOB_DURATION)
                .with_unit("s")
                .with_description("Duration of synthesis jobs")
                .build(),
            count: meter
                .u64_counter(JOB_COUNT)
                .with_description("Number of finished synthesis jobs")
                .build(),
        }
    }
}

impl JobMetrics {
    /// Record a finished job
    pub fn record(&self, outcome: &'static str, started: Instant) {
        let attributes = [KeyValue::new("outcome", outcome)];
        self.duration.record(started.elapsed().as_secs_f64(), &attributes);
        self.count.add(1, &attributes);
    }
}
