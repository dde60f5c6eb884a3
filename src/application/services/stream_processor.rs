use std::sync::Arc;

use futures::StreamExt;
use serde::Deserialize;
use tracing::Instrument;

use crate::application::ports::{Delivery, JobRepository, RowSource, RowSourceError, Settlement};
use crate::domain::{
    Job, JobCompletion, JobCounters, JobId, JobStatus, MessageError, QueueMessage, SourcePath,
};

use super::{
    JobStateMachine, ProgressReporter, ProgressSnapshot, ProgressTracker, RowOutcome,
    RowOutcomeRecorder, Termination, ThrottlePolicy, TracingProgressReporter,
};

/// What to do with the triggering message when the byte source faults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultAction {
    /// Fail the job and acknowledge. Nothing is redelivered.
    #[default]
    Acknowledge,
    /// Leave the job in `Processing` and requeue until `max_deliveries` is reached.
    Requeue,
    /// Fail the job and move the message to the dead-letter store.
    DeadLetter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RedeliveryPolicy {
    pub on_fault: FaultAction,
    pub max_deliveries: u32,
}

impl Default for RedeliveryPolicy {
    fn default() -> Self {
        Self {
            on_fault: FaultAction::Acknowledge,
            max_deliveries: 3,
        }
    }
}

enum FaultDisposition {
    Finalize(Settlement),
    Requeue,
}

impl RedeliveryPolicy {
    fn on_fault(&self, delivery_count: u32, reason: &str) -> FaultDisposition {
        match self.on_fault {
            FaultAction::Acknowledge => FaultDisposition::Finalize(Settlement::Ack),
            FaultAction::DeadLetter => {
                FaultDisposition::Finalize(Settlement::DeadLetter(reason.to_string()))
            }
            FaultAction::Requeue if delivery_count < self.max_deliveries => {
                FaultDisposition::Requeue
            }
            FaultAction::Requeue => FaultDisposition::Finalize(Settlement::Ack),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StreamProcessorConfig {
    pub throttle: ThrottlePolicy,
    pub precount_rows: bool,
    pub redelivery: RedeliveryPolicy,
}

impl Default for StreamProcessorConfig {
    fn default() -> Self {
        Self {
            throttle: ThrottlePolicy::default(),
            precount_rows: true,
            redelivery: RedeliveryPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// The message referenced no usable job and was dropped.
    Dropped { reason: String },
    /// The job was already terminal; the redelivered message was acknowledged.
    AlreadyTerminal(JobStatus),
    Finalized(JobStatus),
    Requeued,
}

/// Summary of one delivery's handling.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub job_id: Option<JobId>,
    pub outcome: RunOutcome,
    pub counters: JobCounters,
    pub final_snapshot: Option<ProgressSnapshot>,
    pub dropped_diagnostics: u64,
    pub finalization_persisted: bool,
    pub settlement: Settlement,
    pub settled: bool,
    pub fault: Option<String>,
}

impl RunReport {
    fn dropped(job_id: Option<JobId>, reason: String) -> Self {
        Self {
            job_id,
            outcome: RunOutcome::Dropped { reason },
            counters: JobCounters::default(),
            final_snapshot: None,
            dropped_diagnostics: 0,
            finalization_persisted: false,
            settlement: Settlement::Ack,
            settled: false,
            fault: None,
        }
    }
}

/// State carried through one run of one job.
struct Run {
    machine: JobStateMachine,
    tracker: ProgressTracker,
    dropped_diagnostics: u64,
}

/// Drives one job from a queue delivery to a terminal state, then settles the
/// delivery exactly once.
pub struct StreamProcessor {
    jobs: Arc<dyn JobRepository>,
    rows: Arc<dyn RowSource>,
    recorder: RowOutcomeRecorder,
    reporter: Arc<dyn ProgressReporter>,
    config: StreamProcessorConfig,
}

impl StreamProcessor {
    pub fn new(
        jobs: Arc<dyn JobRepository>,
        rows: Arc<dyn RowSource>,
        recorder: RowOutcomeRecorder,
        config: StreamProcessorConfig,
    ) -> Self {
        Self {
            jobs,
            rows,
            recorder,
            reporter: Arc::new(TracingProgressReporter),
            config,
        }
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub async fn handle(&self, delivery: Delivery) -> RunReport {
        let message = match QueueMessage::decode(&delivery.body) {
            Ok(message) => message,
            Err(e) => return self.reject_message(delivery, e).await,
        };

        let span = tracing::info_span!(
            "job_run",
            job_id = %message.job_id,
            delivery_count = delivery.delivery_count,
        );
        self.run(delivery, message).instrument(span).await
    }

    async fn reject_message(&self, delivery: Delivery, error: MessageError) -> RunReport {
        tracing::warn!(error = %error, "Malformed queue message");

        let Some(job_id) = error.job_id() else {
            let mut report = RunReport::dropped(None, error.to_string());
            report.settled = self.settle(delivery, Settlement::Ack).await;
            return report;
        };

        let job = match self.jobs.get_by_id(job_id).await {
            Ok(Some(job)) if !job.status.is_terminal() => job,
            Ok(_) => {
                let mut report = RunReport::dropped(Some(job_id), error.to_string());
                report.settled = self.settle(delivery, Settlement::Ack).await;
                return report;
            }
            Err(e) => {
                tracing::error!(job_id = %job_id, error = %e, "Failed to load job for malformed message");
                let mut report = RunReport::dropped(Some(job_id), error.to_string());
                report.settled = self.settle(delivery, Settlement::Ack).await;
                return report;
            }
        };

        let mut run = self.start_run(&job);
        self.conclude(
            delivery,
            &mut run,
            Termination::Failed,
            Settlement::Ack,
            Some(format!("malformed dispatch message: {}", error)),
            None,
        )
        .await
    }

    async fn run(&self, delivery: Delivery, message: QueueMessage) -> RunReport {
        let job = match self.jobs.get_by_id(message.job_id).await {
            Ok(Some(job)) => job,
            Ok(None) => {
                tracing::warn!("Job not found; dropping message");
                let mut report =
                    RunReport::dropped(Some(message.job_id), "job not found".to_string());
                report.settled = self.settle(delivery, Settlement::Ack).await;
                return report;
            }
            Err(e) => {
                // Status unknown; Pending admits the move to Failed.
                let placeholder =
                    Job::with_id(message.job_id, String::new(), message.filepath.clone());
                let mut run = self.start_run(&placeholder);
                return self
                    .fault(delivery, &mut run, format!("failed to load job: {}", e))
                    .await;
            }
        };

        if job.status.is_terminal() {
            tracing::info!(status = %job.status, "Job already finalized; acknowledging redelivery");
            let settled = self.settle(delivery, Settlement::Ack).await;
            return RunReport {
                job_id: Some(job.id),
                outcome: RunOutcome::AlreadyTerminal(job.status),
                counters: job.counters(),
                final_snapshot: None,
                dropped_diagnostics: 0,
                finalization_persisted: false,
                settlement: Settlement::Ack,
                settled,
                fault: None,
            };
        }

        if job.filepath != message.filepath {
            tracing::warn!(
                stored = %job.filepath,
                message = %message.filepath,
                "Message filepath differs from job record; using message filepath"
            );
        }

        let mut run = self.start_run(&job);
        let path = message.filepath;

        match self.rows.exists(&path).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::error!(path = %path, "Source file does not exist");
                // Retrying cannot make the file appear.
                return self
                    .conclude(
                        delivery,
                        &mut run,
                        Termination::Failed,
                        Settlement::Ack,
                        Some(format!("source file not found: {}", path)),
                        None,
                    )
                    .await;
            }
            Err(e) => {
                return self
                    .fault(delivery, &mut run, format!("failed to stat source: {}", e))
                    .await;
            }
        }

        if let Err(e) = run.machine.begin_processing() {
            return self.fault(delivery, &mut run, e.to_string()).await;
        }
        if let Err(e) = self
            .jobs
            .update_status(job.id, JobStatus::Processing)
            .await
        {
            return self
                .fault(delivery, &mut run, format!("failed to claim job: {}", e))
                .await;
        }
        if job.processed_rows > 0 || job.error_rows > 0 {
            // Redelivery after an interrupted run: rows are processed again from line 1.
            tracing::warn!(
                previous_processed = job.processed_rows,
                previous_errors = job.error_rows,
                "Restarting interrupted run; counters reset"
            );
            if let Err(e) = self.jobs.update_progress(job.id, 0, 0).await {
                tracing::warn!(error = %e, "Failed to reset counters");
            }
        }

        if self.config.precount_rows {
            self.precount(job.id, &path, &mut run).await;
        }

        match self.stream_rows(job.id, &path, &mut run).await {
            None => {
                let error_rows = run.tracker.counters().errors;
                self.conclude(
                    delivery,
                    &mut run,
                    Termination::Exhausted { error_rows },
                    Settlement::Ack,
                    None,
                    None,
                )
                .await
            }
            Some(fault) => self.fault(delivery, &mut run, fault).await,
        }
    }

    fn start_run(&self, job: &Job) -> Run {
        Run {
            machine: JobStateMachine::new(job.id, job.status),
            tracker: ProgressTracker::new(self.config.throttle),
            dropped_diagnostics: 0,
        }
    }

    async fn precount(&self, job_id: JobId, path: &SourcePath, run: &mut Run) {
        match self.rows.count_rows(path).await {
            Ok(total) => {
                tracing::info!(total_rows = total, "Rows pre-counted");
                run.tracker.set_total(total);
                if let Err(e) = self.jobs.set_total_rows(job_id, total).await {
                    tracing::warn!(error = %e, "Failed to persist total row count");
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Row pre-count failed; total unknown");
            }
        }
    }

    /// Pulls rows strictly one at a time: the next row is requested only after
    /// the hook, the error write and any progress write for the current row
    /// have completed. Returns the stream fault, if any.
    async fn stream_rows(
        &self,
        job_id: JobId,
        path: &SourcePath,
        run: &mut Run,
    ) -> Option<String> {
        let mut stream = match self.rows.open(path).await {
            Ok(stream) => stream,
            Err(e) => return Some(format!("failed to open source: {}", e)),
        };

        let mut line_number: u64 = 0;
        while let Some(item) = stream.next().await {
            let outcome = match item {
                Ok(row) => {
                    line_number += 1;
                    self.recorder.record(job_id, line_number, &row).await
                }
                Err(RowSourceError::Malformed(message)) => {
                    line_number += 1;
                    self.recorder
                        .record_unreadable(job_id, line_number, message)
                        .await
                }
                Err(e) => {
                    tracing::error!(after_line = line_number, error = %e, "Stream fault");
                    return Some(e.to_string());
                }
            };

            if let RowOutcome::Failed {
                diagnostic_persisted: false,
            } = outcome
            {
                run.dropped_diagnostics += 1;
            }

            if let Some(snapshot) = run.tracker.record(outcome) {
                self.publish_progress(job_id, &snapshot).await;
            }
        }

        None
    }

    async fn publish_progress(&self, job_id: JobId, snapshot: &ProgressSnapshot) {
        self.reporter.report(job_id, snapshot);
        if let Err(e) = self
            .jobs
            .update_progress(job_id, snapshot.processed, snapshot.errors)
            .await
        {
            tracing::warn!(error = %e, "Failed to persist progress");
        }
    }

    async fn fault(&self, delivery: Delivery, run: &mut Run, fault: String) -> RunReport {
        match self
            .config
            .redelivery
            .on_fault(delivery.delivery_count, &fault)
        {
            FaultDisposition::Finalize(settlement) => {
                self.conclude(
                    delivery,
                    run,
                    Termination::Failed,
                    settlement,
                    Some(fault.clone()),
                    Some(fault),
                )
                .await
            }
            FaultDisposition::Requeue => {
                let job_id = run.machine.job_id();
                let snapshot = run.tracker.finish(false);
                self.publish_progress(job_id, &snapshot).await;
                tracing::warn!(
                    delivery_count = delivery.delivery_count,
                    max_deliveries = self.config.redelivery.max_deliveries,
                    "Requeueing message after stream fault"
                );
                let settled = self.settle(delivery, Settlement::Requeue).await;
                RunReport {
                    job_id: Some(job_id),
                    outcome: RunOutcome::Requeued,
                    counters: snapshot.counters(),
                    final_snapshot: Some(snapshot),
                    dropped_diagnostics: run.dropped_diagnostics,
                    finalization_persisted: false,
                    settlement: Settlement::Requeue,
                    settled,
                    fault: Some(fault),
                }
            }
        }
    }

    /// Finalizes the job and settles the delivery as one unit. A failed
    /// finalize write does not stop settlement.
    async fn conclude(
        &self,
        delivery: Delivery,
        run: &mut Run,
        termination: Termination,
        settlement: Settlement,
        error_message: Option<String>,
        fault: Option<String>,
    ) -> RunReport {
        let job_id = run.machine.job_id();
        let exhausted = matches!(termination, Termination::Exhausted { .. });
        let snapshot = run.tracker.finish(exhausted);
        self.reporter.report(job_id, &snapshot);

        let (status, persisted) = match run.machine.finalize(termination) {
            Ok(status) => {
                let completion =
                    JobCompletion::new(status, snapshot.counters(), error_message.clone());
                let persisted = match self.jobs.finalize(job_id, &completion).await {
                    Ok(true) => true,
                    Ok(false) => {
                        tracing::warn!("Job already had finished_at; final write skipped");
                        false
                    }
                    Err(e) => {
                        tracing::error!(
                            error = %e,
                            status = %status,
                            "Finalization not persisted; settling message anyway"
                        );
                        false
                    }
                };
                (status, persisted)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Finalize rejected");
                (run.machine.status(), false)
            }
        };

        match &fault {
            Some(fault) => tracing::error!(
                status = %status,
                processed = snapshot.processed,
                errors = snapshot.errors,
                fault = %fault,
                "Job failed"
            ),
            None => tracing::info!(
                status = %status,
                processed = snapshot.processed,
                errors = snapshot.errors,
                total = ?snapshot.total,
                rows_per_sec = %format_args!("{:.2}", snapshot.throughput),
                "Job finished"
            ),
        }

        let settled = self.settle(delivery, settlement.clone()).await;

        RunReport {
            job_id: Some(job_id),
            outcome: RunOutcome::Finalized(status),
            counters: snapshot.counters(),
            final_snapshot: Some(snapshot),
            dropped_diagnostics: run.dropped_diagnostics,
            finalization_persisted: persisted,
            settlement,
            settled,
            fault,
        }
    }

    async fn settle(&self, delivery: Delivery, settlement: Settlement) -> bool {
        let kind = settlement.as_str();
        match delivery.settle(settlement).await {
            Ok(()) => {
                tracing::debug!(settlement = kind, "Message settled");
                true
            }
            Err(e) => {
                tracing::error!(settlement = kind, error = %e, "Failed to settle message");
                false
            }
        }
    }
}
