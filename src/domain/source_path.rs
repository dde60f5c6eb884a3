use std::fmt;
use std::path::{Path, PathBuf};

use super::JobId;

/// Location of an uploaded file on the worker-visible filesystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcePath(PathBuf);

impl SourcePath {
    /// Builds the canonical upload location for a job: `<upload_dir>/<job_id>.csv`.
    pub fn for_upload(upload_dir: &Path, job_id: &JobId) -> Self {
        Self(upload_dir.join(format!("{}.csv", job_id.as_uuid())))
    }

    pub fn from_raw(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    pub fn as_path(&self) -> &Path {
        &self.0
    }

    pub fn to_string_lossy(&self) -> String {
        self.0.to_string_lossy().into_owned()
    }
}

impl fmt::Display for SourcePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}
