pub mod catalog;
pub mod execution;
pub mod package;
pub mod parameters;

pub use catalog::{
    CatalogStatus, ExecutionSnapshot, FolderRef, MessageType, PackageRef, ProjectParameter,
    ProjectRef,
};
pub use execution::{Execution, ExecutionStatus};
pub use package::Package;
pub use parameters::ParameterSet;
