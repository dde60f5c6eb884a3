mod environment;
mod settings;

pub use environment::Environment;
pub use settings::{
    AppMode, AppSettings, BackendSetting, DatabaseSettings, DispatchSettings, LoggingSettings,
    ProcessingSettings, ProgressPolicySetting, QueueSettings, ServerSettings, Settings,
    StorageSettings, ValidationSettings, WorkerSettings,
};
