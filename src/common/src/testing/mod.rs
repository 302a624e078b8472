//! Test utilities for the share workflow.
//!
//! This module provides reusable test utilities for creating test configurations
//! and seeding an in-memory share database.
//!
//! # Feature Flag
//!
//! This module is only available when the `testing` feature is enabled or during tests:
//!
//! ```toml
//! [dev-dependencies]
//! common = { path = "../common", features = ["testing"] }
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use common::database::Database;
//! use common::model::ShareItemStatus;
//! use common::testing::ShareFixture;
//!
//! let database = Database::new_in_memory().await?;
//! let share = ShareFixture::cross_account()
//!     .with_tables(&["orders"], ShareItemStatus::ShareApproved)
//!     .seed(&database)
//!     .await?;
//! ```

mod config_builder;
mod fixtures;

pub use config_builder::TestConfigBuilder;
pub use fixtures::{REGION, SOURCE_ACCOUNT, SeededShare, ShareFixture, TARGET_ACCOUNT};
