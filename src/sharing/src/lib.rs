//! Share approval and revocation engine.
//!
//! [`DataSharingService`] drives a share through its approve and revoke cycles,
//! dispatching tables and folders to the resource processors and recording every
//! status change through the state machines.

pub mod capabilities;
pub mod catalog;
pub mod cloud;
pub mod error;
pub mod processors;
pub mod service;
pub mod state_machine;

pub use capabilities::ShareCapabilities;
pub use cloud::{CloudClients, CloudError, DryRunCloud};
pub use error::{SharingError, SharingResult};
pub use processors::{BatchReport, ItemOutcome};
pub use service::DataSharingService;
