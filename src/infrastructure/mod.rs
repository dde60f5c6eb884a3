pub mod observability;
pub mod parsing;
pub mod persistence;
pub mod queue;
pub mod storage;
pub mod validation;
