use std::path::PathBuf;
use std::sync::Arc;

use crate::application::ports::{JobRepository, RowErrorRepository, UploadStore};
use crate::application::services::Dispatcher;
use crate::domain::StatusVocabulary;

#[derive(Clone)]
pub struct AppState {
    pub job_repository: Arc<dyn JobRepository>,
    pub row_error_repository: Arc<dyn RowErrorRepository>,
    pub upload_store: Arc<dyn UploadStore>,
    pub dispatcher: Arc<Dispatcher>,
    pub upload_dir: PathBuf,
    pub vocabulary: StatusVocabulary,
}
