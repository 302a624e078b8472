use common::config::SharingConfig;

use crate::error::{SharingError, SharingResult};

/// Snapshot of the sharing switches taken when a service is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShareCapabilities {
    pub cross_account_sharing: bool,
    pub cleanup: bool,
}

impl Default for ShareCapabilities {
    fn default() -> Self {
        Self::from(&SharingConfig::default())
    }
}

impl From<&SharingConfig> for ShareCapabilities {
    fn from(config: &SharingConfig) -> Self {
        Self {
            cross_account_sharing: config.cross_account_sharing,
            cleanup: config.cleanup,
        }
    }
}

impl ShareCapabilities {
    pub fn require_cross_account_sharing(&self) -> SharingResult<()> {
        if self.cross_account_sharing {
            Ok(())
        } else {
            Err(SharingError::FeatureDisabled("sharing.cross_account_sharing"))
        }
    }
}
