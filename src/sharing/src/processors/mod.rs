//! Cloud-side work for one share: tables through Lake Formation, folders through S3.
//!
//! Processors walk their items in order and record each item's outcome as soon as it
//! is known, each in its own short-lived connection. A cloud failure on one item never
//! stops the batch; storage failures do.

use common::Database;
use common::model::{ShareItem, ShareItemAction, ShareItemStatus};
use common::repository::ShareObjectRepository;

use crate::cloud::CloudResult;
use crate::error::SharingResult;
use crate::state_machine::ShareItemSM;

pub mod lake_formation;
pub mod s3;

pub use lake_formation::{CrossAccountTableProcessor, SameAccountTableProcessor, TableProcessor};
pub use s3::FolderProcessor;

const MAX_DATABASE_NAME_LEN: usize = 254;
const MAX_ACCESS_POINT_NAME_LEN: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    Succeeded,
    Failed(String),
    /// The share has no item for the resource
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemReport {
    pub item_uri: String,
    pub name: String,
    pub outcome: ItemOutcome,
}

/// Outcomes of one processor run, in processing order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub items: Vec<ItemReport>,
}

impl BatchReport {
    pub fn push(&mut self, report: ItemReport) {
        self.items.push(report);
    }

    /// True unless some item failed. Skipped items do not count against the batch.
    pub fn succeeded(&self) -> bool {
        !self
            .items
            .iter()
            .any(|item| matches!(item.outcome, ItemOutcome::Failed(_)))
    }

    pub fn failures(&self) -> impl Iterator<Item = &ItemReport> {
        self.items
            .iter()
            .filter(|item| matches!(item.outcome, ItemOutcome::Failed(_)))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Direction of a processor run, which fixes where its items start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemPhase {
    /// Items start in `Share_Approved` and are moved to `Share_In_Progress` one by one
    Share,
    /// Items were already moved to `Revoke_In_Progress` in bulk
    Revoke,
}

impl ItemPhase {
    fn initial_status(self) -> ShareItemStatus {
        match self {
            ItemPhase::Share => ShareItemStatus::ShareApproved,
            ItemPhase::Revoke => ShareItemStatus::RevokeInProgress,
        }
    }
}

/// An item taken into processing together with its state machine.
pub struct TrackedItem {
    item: ShareItem,
    sm: ShareItemSM,
}

impl TrackedItem {
    pub fn item(&self) -> &ShareItem {
        &self.item
    }
}

/// Look up the item for `item_uri` and, when sharing, move it to `Share_In_Progress`.
///
/// Returns `None` when the share has no such item.
pub async fn begin_item(
    database: &Database,
    share_uri: &str,
    item_uri: &str,
    phase: ItemPhase,
) -> SharingResult<Option<TrackedItem>> {
    let mut conn = database.connection().await?;
    let Some(mut item) =
        ShareObjectRepository::find_sharable_item(&mut conn, share_uri, item_uri).await?
    else {
        return Ok(None);
    };

    let mut sm = ShareItemSM::new(phase.initial_status());
    if phase == ItemPhase::Share {
        let new_status = sm.run_transition(ShareItemAction::Start)?;
        sm.update_state_single_item(&mut conn, &mut item, new_status)
            .await?;
    }

    Ok(Some(TrackedItem { item, sm }))
}

/// Record the result of the cloud steps for one item.
pub async fn finish_item(
    database: &Database,
    tracked: TrackedItem,
    result: CloudResult<()>,
) -> SharingResult<ItemReport> {
    let TrackedItem { mut item, mut sm } = tracked;

    let (action, outcome) = match result {
        Ok(()) => (ShareItemAction::Success, ItemOutcome::Succeeded),
        Err(e) => {
            log::error!(
                "Failed to process {} {} of share {}: {e}",
                item.item_type,
                item.item_name,
                item.share_uri
            );
            (ShareItemAction::Failure, ItemOutcome::Failed(e.to_string()))
        }
    };

    let mut conn = database.connection().await?;
    let new_status = sm.run_transition(action)?;
    sm.update_state_single_item(&mut conn, &mut item, new_status)
        .await?;
    log::info!("Item {} of share {} is {new_status}", item.item_name, item.share_uri);

    Ok(ItemReport {
        item_uri: item.item_uri,
        name: item.item_name,
        outcome,
    })
}

/// Report entry for a resource the share has no item for.
pub fn skipped_item(share_uri: &str, item_uri: &str, name: &str) -> ItemReport {
    log::info!("No share item for {name} ({item_uri}) in share {share_uri}, skipping");
    ItemReport {
        item_uri: item_uri.to_string(),
        name: name.to_string(),
        outcome: ItemOutcome::Skipped,
    }
}

/// Name of the consumer-side database holding the resource links of a share.
pub fn shared_database_name(glue_database_name: &str, share_uri: &str) -> String {
    let name = format!("{glue_database_name}_shared_{share_uri}");
    name.chars().take(MAX_DATABASE_NAME_LEN).collect()
}

/// Access point name for one consumer group of a dataset.
///
/// Lowercase alphanumerics separated by single dashes, at most 50 characters.
pub fn access_point_name(dataset_uri: &str, group_uri: &str) -> String {
    let raw = format!("{dataset_uri}-{group_uri}");
    let mut slug = String::with_capacity(raw.len());
    for c in raw.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    let mut slug: String = slug.chars().take(MAX_ACCESS_POINT_NAME_LEN).collect();
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}
