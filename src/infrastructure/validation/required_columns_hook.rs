use async_trait::async_trait;

use crate::application::ports::{RowHook, RowHookError};
use crate::domain::Row;

/// Rejects rows where any of the configured columns is absent or blank.
pub struct RequiredColumnsHook {
    columns: Vec<String>,
}

impl RequiredColumnsHook {
    pub fn new(columns: Vec<String>) -> Self {
        Self { columns }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }
}

#[async_trait]
impl RowHook for RequiredColumnsHook {
    async fn process(&self, row: &Row) -> Result<(), RowHookError> {
        let missing: Vec<&str> = self
            .columns
            .iter()
            .filter(|column| row.get(column).is_none_or(|value| value.trim().is_empty()))
            .map(String::as_str)
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(RowHookError::Rejected(format!(
                "missing required value for: {}",
                missing.join(", ")
            )))
        }
    }
}
