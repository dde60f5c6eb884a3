mod accept_all_hook;
mod required_columns_hook;

use std::sync::Arc;

use crate::application::ports::RowHook;

pub use accept_all_hook::AcceptAllHook;
pub use required_columns_hook::RequiredColumnsHook;

/// Accept-all when no columns are configured, otherwise a required-columns check.
pub fn create_row_hook(required_columns: &[String]) -> Arc<dyn RowHook> {
    if required_columns.is_empty() {
        Arc::new(AcceptAllHook)
    } else {
        Arc::new(RequiredColumnsHook::new(required_columns.to_vec()))
    }
}
