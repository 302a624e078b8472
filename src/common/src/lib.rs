pub mod cli;
pub mod config;
pub mod database;
pub mod model;
pub mod repository;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use database::Database;
pub use repository::{RepositoryError, ShareObjectRepository};
