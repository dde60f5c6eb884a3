use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::domain::{JobId, JobStatus};

/// How a run ended, from the state machine's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    Exhausted { error_rows: u64 },
    Failed,
}

impl Termination {
    pub fn target(&self) -> JobStatus {
        match self {
            Termination::Exhausted { error_rows } => JobStatus::for_exhausted_stream(*error_rows),
            Termination::Failed => JobStatus::Failed,
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("invalid job transition {from} -> {to}")]
    Invalid { from: JobStatus, to: JobStatus },
    #[error("job {0} already finalized in this run")]
    AlreadyFinalized(JobId),
}

/// In-run view of a job's lifecycle.
///
/// Non-terminal moves go through [`JobStateMachine::transition`]; the single
/// move into a terminal status goes through [`JobStateMachine::finalize`],
/// which succeeds at most once per instance even under concurrent callers.
pub struct JobStateMachine {
    job_id: JobId,
    status: Mutex<JobStatus>,
    finalized: AtomicBool,
}

impl JobStateMachine {
    pub fn new(job_id: JobId, status: JobStatus) -> Self {
        Self {
            job_id,
            status: Mutex::new(status),
            finalized: AtomicBool::new(status.is_terminal()),
        }
    }

    pub fn job_id(&self) -> JobId {
        self.job_id
    }

    pub fn status(&self) -> JobStatus {
        *self.status.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized.load(Ordering::Acquire)
    }

    pub fn transition(&self, next: JobStatus) -> Result<JobStatus, TransitionError> {
        let mut status = self
            .status
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if next.is_terminal() || !status.can_transition_to(next) {
            return Err(TransitionError::Invalid {
                from: *status,
                to: next,
            });
        }
        let previous = *status;
        *status = next;
        tracing::debug!(job_id = %self.job_id, from = %previous, to = %next, "Job status transition");
        Ok(previous)
    }

    pub fn begin_processing(&self) -> Result<JobStatus, TransitionError> {
        self.transition(JobStatus::Processing)
    }

    pub fn finalize(&self, termination: Termination) -> Result<JobStatus, TransitionError> {
        let mut status = self
            .status
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let target = termination.target();

        if self
            .finalized
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(TransitionError::AlreadyFinalized(self.job_id));
        }
        if !status.can_transition_to(target) {
            self.finalized.store(false, Ordering::Release);
            return Err(TransitionError::Invalid {
                from: *status,
                to: target,
            });
        }

        *status = target;
        tracing::debug!(job_id = %self.job_id, status = %target, "Job finalized");
        Ok(target)
    }
}
