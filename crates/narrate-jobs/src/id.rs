use std::{
    fmt,
    sync::atomic::{AtomicU64, Ordering},
};

use rand::{TryRngCore, rngs::OsRng};

/// Per-process sequence; guarantees distinct ids within one clock tick
static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Opaque identifier namespacing one job's artifacts
///
/// Rendered as `{unix_millis}-{sequence}-{salt}` in lowercase hex. Only
/// `[0-9a-f-]` ever appears, so the id is safe as a filename component
/// and needs no quoting.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobId(String);

impl JobId {
    /// Generate a fresh id; never fails
    ///
    /// The salt comes from the OS random source and falls back to the
    /// process id, which still keeps ids apart across processes sharing a
    /// working area. Uniqueness inside the process rests on the sequence.
    pub fn generate() -> Self {
        let millis = u64::try_from(jiff::Timestamp::now().as_millisecond()).unwrap_or(0);
        let sequence = SEQUENCE.fetch_add(1, Ordering::Relaxed);
        let salt = OsRng.try_next_u32().unwrap_or_else(|_| std::process::id());

        Self(format!("{millis:x}-{sequence:x}-{salt:08x}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
