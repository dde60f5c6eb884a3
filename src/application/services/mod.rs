mod dispatcher;
mod job_state_machine;
mod progress_tracker;
mod queue_consumer;
mod row_outcome_recorder;
mod stream_processor;

pub use dispatcher::{DispatchCompensation, DispatchError, Dispatcher, DispatcherConfig};
pub use job_state_machine::{JobStateMachine, Termination, TransitionError};
pub use progress_tracker::{
    ProgressReporter, ProgressSnapshot, ProgressTracker, ThrottlePolicy, TracingProgressReporter,
};
pub use queue_consumer::{QueueConsumer, spawn_consumers};
pub use row_outcome_recorder::{RowOutcome, RowOutcomeRecorder};
pub use stream_processor::{
    FaultAction, RedeliveryPolicy, RunOutcome, RunReport, StreamProcessor, StreamProcessorConfig,
};
