use serde::{Deserialize, Serialize};

use super::{JobId, SourcePath};

/// Body of the message that hands a job from the dispatcher to a worker.
///
/// On the wire this is `{"jobId": "<uuid>", "filepath": "<path>"}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueMessage {
    pub job_id: JobId,
    pub filepath: SourcePath,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireMessage {
    #[serde(default)]
    job_id: Option<String>,
    #[serde(default)]
    filepath: Option<String>,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum MessageError {
    #[error("message body is not valid JSON: {0}")]
    InvalidJson(String),
    #[error("message has no jobId")]
    MissingJobId,
    #[error("message jobId is not a UUID: {0}")]
    InvalidJobId(String),
    #[error("message for job {job_id} has no filepath")]
    MissingFilepath { job_id: JobId },
}

impl MessageError {
    /// Job the malformed message still identifies, if any.
    pub fn job_id(&self) -> Option<JobId> {
        match self {
            MessageError::MissingFilepath { job_id } => Some(*job_id),
            _ => None,
        }
    }
}

impl QueueMessage {
    pub fn new(job_id: JobId, filepath: SourcePath) -> Self {
        Self { job_id, filepath }
    }

    pub fn encode(&self) -> Vec<u8> {
        let wire = WireMessage {
            job_id: Some(self.job_id.to_string()),
            filepath: Some(self.filepath.to_string_lossy()),
        };
        // A struct of two optional strings always serializes.
        serde_json::to_vec(&wire).unwrap_or_default()
    }

    pub fn decode(body: &[u8]) -> Result<Self, MessageError> {
        let wire: WireMessage =
            serde_json::from_slice(body).map_err(|e| MessageError::InvalidJson(e.to_string()))?;

        let raw_id = wire
            .job_id
            .filter(|id| !id.trim().is_empty())
            .ok_or(MessageError::MissingJobId)?;
        let job_id = raw_id
            .trim()
            .parse::<JobId>()
            .map_err(|_| MessageError::InvalidJobId(raw_id.clone()))?;

        let filepath = wire
            .filepath
            .filter(|p| !p.trim().is_empty())
            .ok_or(MessageError::MissingFilepath { job_id })?;

        Ok(Self {
            job_id,
            filepath: SourcePath::from_raw(filepath),
        })
    }
}
