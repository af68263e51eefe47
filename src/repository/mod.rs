pub mod connection;
pub mod execution_repository;
pub mod package_repository;

pub use connection::establish_connection;
pub use execution_repository::ExecutionRepository;
pub use package_repository::PackageRepository;

pub type DbPool = sqlx::SqlitePool;
