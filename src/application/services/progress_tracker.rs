use std::time::Duration;

use tokio::time::Instant;

use crate::domain::{JobCounters, JobId};

use super::RowOutcome;

/// Limits how often a progress snapshot is emitted. One policy per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrottlePolicy {
    /// At most one snapshot per interval.
    Interval(Duration),
    /// One snapshot every N rows.
    EveryRows(u64),
}

impl Default for ThrottlePolicy {
    fn default() -> Self {
        ThrottlePolicy::Interval(Duration::from_secs(1))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProgressSnapshot {
    pub processed: u64,
    pub errors: u64,
    pub total: Option<u64>,
    pub elapsed: Duration,
    /// Processed rows per second since the run started.
    pub throughput: f64,
    /// Estimated time remaining; `None` while throughput is zero or the total is unknown.
    pub eta: Option<Duration>,
}

impl ProgressSnapshot {
    pub fn counters(&self) -> JobCounters {
        JobCounters {
            total: self.total,
            processed: self.processed,
            errors: self.errors,
        }
    }

    /// Share of the known total that has been accounted for, in percent.
    pub fn percent(&self) -> Option<f64> {
        match self.total {
            Some(0) => Some(100.0),
            Some(total) => Some((self.processed + self.errors) as f64 * 100.0 / total as f64),
            None => None,
        }
    }
}

/// Receives every emitted snapshot, including the final one.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, job_id: JobId, snapshot: &ProgressSnapshot);
}

pub struct TracingProgressReporter;

impl ProgressReporter for TracingProgressReporter {
    fn report(&self, job_id: JobId, snapshot: &ProgressSnapshot) {
        tracing::info!(
            job_id = %job_id,
            processed = snapshot.processed,
            errors = snapshot.errors,
            total = ?snapshot.total,
            percent = ?snapshot.percent().map(|p| (p * 10.0).round() / 10.0),
            rows_per_sec = %format_args!("{:.2}", snapshot.throughput),
            eta_secs = ?snapshot.eta.map(|d| d.as_secs()),
            "Progress"
        );
    }
}

pub struct ProgressTracker {
    policy: ThrottlePolicy,
    started_at: Instant,
    last_emitted_at: Instant,
    rows_since_emit: u64,
    processed: u64,
    errors: u64,
    total: Option<u64>,
}

impl ProgressTracker {
    pub fn new(policy: ThrottlePolicy) -> Self {
        Self::started_at(policy, Instant::now())
    }

    pub fn started_at(policy: ThrottlePolicy, now: Instant) -> Self {
        Self {
            policy,
            started_at: now,
            last_emitted_at: now,
            rows_since_emit: 0,
            processed: 0,
            errors: 0,
            total: None,
        }
    }

    pub fn set_total(&mut self, total: u64) {
        self.total = Some(total.max(self.accounted()));
    }

    pub fn counters(&self) -> JobCounters {
        JobCounters {
            total: self.total,
            processed: self.processed,
            errors: self.errors,
        }
    }

    pub fn record(&mut self, outcome: RowOutcome) -> Option<ProgressSnapshot> {
        self.record_at(outcome, Instant::now())
    }

    /// Counts one row and returns a snapshot if the throttle allows one now.
    pub fn record_at(&mut self, outcome: RowOutcome, now: Instant) -> Option<ProgressSnapshot> {
        match outcome {
            RowOutcome::Processed => self.processed += 1,
            RowOutcome::Failed { .. } => self.errors += 1,
        }
        self.rows_since_emit += 1;

        // A pre-scan may undercount; the invariant processed + errors <= total wins.
        if let Some(total) = self.total {
            if self.accounted() > total {
                self.total = Some(self.accounted());
            }
        }

        let due = match self.policy {
            ThrottlePolicy::Interval(interval) => {
                now.saturating_duration_since(self.last_emitted_at) >= interval
            }
            ThrottlePolicy::EveryRows(every) => self.rows_since_emit >= every.max(1),
        };
        if !due {
            return None;
        }

        self.last_emitted_at = now;
        self.rows_since_emit = 0;
        Some(self.snapshot_at(now))
    }

    pub fn snapshot_at(&self, now: Instant) -> ProgressSnapshot {
        let elapsed = now.saturating_duration_since(self.started_at);
        let elapsed_secs = elapsed.as_secs_f64();
        let throughput = if elapsed_secs > 0.0 {
            self.processed as f64 / elapsed_secs
        } else {
            0.0
        };
        let eta = match self.total {
            Some(total) if throughput > 0.0 => {
                let remaining = total.saturating_sub(self.processed) as f64;
                Some(Duration::from_secs_f64(remaining / throughput))
            }
            _ => None,
        };

        ProgressSnapshot {
            processed: self.processed,
            errors: self.errors,
            total: self.total,
            elapsed,
            throughput,
            eta,
        }
    }

    pub fn finish(&mut self, exhausted: bool) -> ProgressSnapshot {
        self.finish_at(exhausted, Instant::now())
    }

    /// Final snapshot, produced regardless of the throttle. When the stream was
    /// read to the end the total becomes the exact number of rows seen.
    pub fn finish_at(&mut self, exhausted: bool, now: Instant) -> ProgressSnapshot {
        if exhausted {
            self.total = Some(self.accounted());
        }
        self.last_emitted_at = now;
        self.rows_since_emit = 0;
        self.snapshot_at(now)
    }

    fn accounted(&self) -> u64 {
        self.processed + self.errors
    }
}
