use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Returned when a persisted name does not map to a known enum variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

macro_rules! named_enum {
    ($(#[$meta:meta])* $name:ident, $kind:literal { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $text)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(UnknownVariant {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

named_enum!(
    /// Lifecycle status of a share object.
    ShareObjectStatus, "share object status" {
        Deleted => "Deleted",
        Approved => "Approved",
        Rejected => "Rejected",
        Revoked => "Revoked",
        Draft => "Draft",
        Submitted => "Submitted",
        RevokeInProgress => "Revoke_In_Progress",
        ShareInProgress => "Share_In_Progress",
        Processed => "Processed",
    }
);

named_enum!(
    /// Lifecycle status of a single share item.
    ShareItemStatus, "share item status" {
        Deleted => "Deleted",
        PendingApproval => "PendingApproval",
        ShareApproved => "Share_Approved",
        ShareRejected => "Share_Rejected",
        ShareInProgress => "Share_In_Progress",
        ShareSucceeded => "Share_Succeeded",
        ShareFailed => "Share_Failed",
        RevokeApproved => "Revoke_Approved",
        RevokeInProgress => "Revoke_In_Progress",
        RevokeFailed => "Revoke_Failed",
        RevokeSucceeded => "Revoke_Succeeded",
    }
);

named_enum!(
    /// Actions accepted by the share object state machine.
    ShareObjectAction, "share object action" {
        Submit => "Submit",
        Approve => "Approve",
        Reject => "Reject",
        RevokeItems => "RevokeItems",
        Start => "Start",
        Finish => "Finish",
        FinishPending => "FinishPending",
        Delete => "Delete",
        AddItem => "AddItem",
    }
);

named_enum!(
    /// Actions accepted by the share item state machine.
    ShareItemAction, "share item action" {
        Submit => "Submit",
        Approve => "Approve",
        Reject => "Reject",
        Start => "Start",
        Success => "Success",
        Failure => "Failure",
        RevokeItems => "RevokeItems",
        RemoveItem => "RemoveItem",
        Delete => "Delete",
    }
);

named_enum!(
    /// Kind of dataset sub-resource a share item points at.
    ShareableType, "shareable type" {
        Table => "Table",
        StorageLocation => "StorageLocation",
    }
);

impl ShareItemStatus {
    /// Statuses in which the consumer still holds, or is about to hold, access.
    pub const STILL_SHARED: &'static [ShareItemStatus] = &[
        ShareItemStatus::ShareSucceeded,
        ShareItemStatus::ShareInProgress,
        ShareItemStatus::RevokeApproved,
        ShareItemStatus::RevokeInProgress,
        ShareItemStatus::RevokeFailed,
    ];

    /// Statuses that still wait for an approver decision.
    pub const PENDING: &'static [ShareItemStatus] = &[ShareItemStatus::PendingApproval];

    pub fn is_still_shared(&self) -> bool {
        Self::STILL_SHARED.contains(self)
    }
}

/// One sharing relationship between a dataset and a consuming environment group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShareObject {
    pub share_uri: String,
    pub dataset_uri: String,
    /// Target (consuming) environment
    pub environment_uri: String,
    /// Target group that receives access
    pub group_uri: String,
    pub owner: String,
    pub status: ShareObjectStatus,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

/// A table or folder tracked inside a share object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShareItem {
    pub share_item_uri: String,
    pub share_uri: String,
    pub item_type: ShareableType,
    /// `table_uri` or `location_uri` of the shared resource
    pub item_uri: String,
    pub item_name: String,
    pub status: ShareItemStatus,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}
