pub mod execution;
pub mod package;
