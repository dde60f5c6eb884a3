mod error_response;
mod health;
mod job_status;
mod upload;

pub use error_response::ErrorResponse;
pub use health::health_handler;
pub use job_status::{
    JobErrorsResponse, JobStatusResponse, RowErrorResponse, job_errors_handler,
    job_status_handler,
};
pub use upload::{UploadResponse, upload_handler};
