pub mod catalog_service;
pub mod execution_service;
pub mod package_service;

pub use catalog_service::{
    CatalogExecutionResult, CatalogService, ExecutionStatusReport, PackageExistence,
    PackageLocator, PollSettings, StartedExecution,
};
pub use execution_service::{ExecutionPage, ExecutionService, PageRequest, StartOutcome};
pub use package_service::{NewPackage, PackageService};
