use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    CompletedWithErrors,
    Failed,
}

/// Label set used when a status is written to the store or rendered to clients.
///
/// Both vocabularies are accepted when parsing, so a store populated by either
/// worker generation can be read back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusVocabulary {
    #[default]
    Standard,
    Legacy,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        self.label(StatusVocabulary::Standard)
    }

    pub fn label(&self, vocabulary: StatusVocabulary) -> &'static str {
        match (self, vocabulary) {
            (JobStatus::Pending, _) => "PENDING",
            (JobStatus::Processing, _) => "PROCESSING",
            (JobStatus::Completed, StatusVocabulary::Standard) => "COMPLETED",
            (JobStatus::Completed, StatusVocabulary::Legacy) => "DONE",
            (JobStatus::CompletedWithErrors, StatusVocabulary::Standard) => {
                "COMPLETED_WITH_ERRORS"
            }
            (JobStatus::CompletedWithErrors, StatusVocabulary::Legacy) => "DONE_WITH_ERRORS",
            (JobStatus::Failed, StatusVocabulary::Standard) => "FAILED",
            (JobStatus::Failed, StatusVocabulary::Legacy) => "ERROR",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::CompletedWithErrors | JobStatus::Failed
        )
    }

    /// Whether `self -> next` is an edge of the job lifecycle.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        match (self, next) {
            (JobStatus::Pending, JobStatus::Processing) => true,
            (JobStatus::Pending, JobStatus::Failed) => true,
            (JobStatus::Processing, JobStatus::Processing) => true,
            (JobStatus::Processing, JobStatus::Completed) => true,
            (JobStatus::Processing, JobStatus::CompletedWithErrors) => true,
            (JobStatus::Processing, JobStatus::Failed) => true,
            _ => false,
        }
    }

    /// Terminal status for a stream that was read to the end.
    pub fn for_exhausted_stream(error_rows: u64) -> Self {
        if error_rows > 0 {
            JobStatus::CompletedWithErrors
        } else {
            JobStatus::Completed
        }
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(JobStatus::Pending),
            "PROCESSING" => Ok(JobStatus::Processing),
            "COMPLETED" | "DONE" => Ok(JobStatus::Completed),
            "COMPLETED_WITH_ERRORS" | "DONE_WITH_ERRORS" => Ok(JobStatus::CompletedWithErrors),
            "FAILED" | "ERROR" => Ok(JobStatus::Failed),
            _ => Err(format!("Invalid job status: {}", s)),
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
