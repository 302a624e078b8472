//! Approve and revoke cycles for one share.
//!
//! The Start transition and the item fetch share one short transaction that is
//! committed before any cloud call. Processors then record item outcomes on their
//! own, and the object-level Finish (or FinishPending) runs in a fresh transaction
//! once every processor has returned.

use common::Database;
use common::model::{
    DatasetTable, ShareItemAction, ShareItemStatus, ShareObject, ShareObjectAction,
    ShareableType,
};
use common::repository::{ShareData, ShareObjectRepository};

use crate::capabilities::ShareCapabilities;
use crate::cloud::CloudClients;
use crate::error::{SharingError, SharingResult};
use crate::processors::{BatchReport, FolderProcessor, ItemOutcome, ItemReport, TableProcessor};
use crate::state_machine::{ShareItemSM, ShareObjectSM};

pub struct DataSharingService {
    database: Database,
    clients: CloudClients,
    capabilities: ShareCapabilities,
}

impl DataSharingService {
    pub fn new(database: Database, clients: CloudClients, capabilities: ShareCapabilities) -> Self {
        Self {
            database,
            clients,
            capabilities,
        }
    }

    pub fn capabilities(&self) -> ShareCapabilities {
        self.capabilities
    }

    /// Grant every `Share_Approved` item of the share.
    ///
    /// Returns false when any folder or table failed. A folder failure makes the
    /// whole approval unsuccessful whatever happened to the tables.
    pub async fn approve_share(&self, share_uri: &str) -> SharingResult<bool> {
        log::info!("Approving share {share_uri}");

        let (mut data, items, mut share_sm) = {
            let mut session = self.database.scoped_session().await?;
            let mut data = ShareObjectRepository::get_share_data(&mut session, share_uri).await?;

            let mut share_sm = ShareObjectSM::new(data.share.status);
            let new_status = share_sm.run_transition(ShareObjectAction::Start)?;
            share_sm
                .update_state(&mut session, &mut data.share, new_status)
                .await?;

            let items = ShareObjectRepository::get_share_data_items(
                &mut session,
                share_uri,
                ShareItemStatus::ShareApproved,
            )
            .await?;
            session.commit().await?;
            (data, items, share_sm)
        };
        log::info!(
            "Share {share_uri} has {} approved tables and {} approved folders",
            items.tables.len(),
            items.folders.len()
        );

        let folder_processor =
            FolderProcessor::new(&self.database, self.clients.object_storage.clone(), &data);
        let folders = folder_processor
            .process_approved_shares(&items.folders)
            .await?;
        log_report(share_uri, "folder grant", &folders);

        let tables = if items.tables.is_empty() {
            BatchReport::default()
        } else {
            match self.table_processor(&data, items.tables.clone(), Vec::new()).await? {
                Ok(processor) => processor.process_approved_shares().await?,
                Err(reason) => {
                    self.handle_table_share_failure(&data, &items.tables, &[], &reason)
                        .await?
                }
            }
        };
        log_report(share_uri, "table grant", &tables);

        self.finish_share(&mut data.share, &mut share_sm, ShareObjectAction::Finish)
            .await?;

        if !folders.succeeded() {
            return Ok(false);
        }
        Ok(tables.succeeded())
    }

    /// Revoke every `Revoke_Approved` item of the share and clean up what is no longer used.
    pub async fn revoke_share(&self, share_uri: &str) -> SharingResult<bool> {
        log::info!("Revoking share {share_uri}");

        let (mut data, items, mut share_sm) = {
            let mut session = self.database.scoped_session().await?;
            let mut data = ShareObjectRepository::get_share_data(&mut session, share_uri).await?;

            let mut share_sm = ShareObjectSM::new(data.share.status);
            let new_status = share_sm.run_transition(ShareObjectAction::Start)?;
            share_sm
                .update_state(&mut session, &mut data.share, new_status)
                .await?;

            let mut revoked_item_sm = ShareItemSM::new(ShareItemStatus::RevokeApproved);
            let new_status = revoked_item_sm.run_transition(ShareItemAction::Start)?;
            revoked_item_sm
                .update_state(&mut session, share_uri, new_status)
                .await?;

            let items = ShareObjectRepository::get_share_data_items(
                &mut session,
                share_uri,
                ShareItemStatus::RevokeInProgress,
            )
            .await?;
            session.commit().await?;
            (data, items, share_sm)
        };
        log::info!(
            "Share {share_uri} has {} tables and {} folders to revoke",
            items.tables.len(),
            items.folders.len()
        );

        let folder_processor =
            FolderProcessor::new(&self.database, self.clients.object_storage.clone(), &data);
        let folders = folder_processor
            .process_revoked_shares(&items.folders)
            .await?;
        log_report(share_uri, "folder revoke", &folders);

        if !items.folders.is_empty()
            && !self
                .has_shared_items_of_type(share_uri, ShareableType::StorageLocation)
                .await?
        {
            if self.capabilities.cleanup {
                log::info!("No folders of share {share_uri} remain shared, cleaning up");
                folder_processor.clean_up_share().await;
            } else {
                log::info!("Clean-up disabled, keeping access point of share {share_uri}");
            }
        }

        let tables = if items.tables.is_empty() {
            BatchReport::default()
        } else {
            match self.table_processor(&data, Vec::new(), items.tables.clone()).await? {
                Ok(processor) => {
                    let report = processor.process_revoked_shares().await?;
                    if !self
                        .has_shared_items_of_type(share_uri, ShareableType::Table)
                        .await?
                    {
                        if self.capabilities.cleanup {
                            log::info!("No tables of share {share_uri} remain shared, cleaning up");
                            processor.delete_shared_database().await;
                        } else {
                            log::info!(
                                "Clean-up disabled, keeping shared database of share {share_uri}"
                            );
                        }
                    }
                    report
                }
                Err(reason) => {
                    self.handle_table_share_failure(&data, &[], &items.tables, &reason)
                        .await?
                }
            }
        };
        log_report(share_uri, "table revoke", &tables);

        let pending = {
            let mut conn = self.database.connection().await?;
            ShareObjectRepository::check_pending_share_items(&mut conn, share_uri).await?
        };
        let action = if pending {
            log::info!("Share {share_uri} still has pending items");
            ShareObjectAction::FinishPending
        } else {
            ShareObjectAction::Finish
        };
        self.finish_share(&mut data.share, &mut share_sm, action)
            .await?;

        Ok(tables.succeeded() && folders.succeeded())
    }

    /// Build the table processor, turning construction failures into `Err(reason)`.
    async fn table_processor(
        &self,
        data: &ShareData,
        shared: Vec<DatasetTable>,
        revoked: Vec<DatasetTable>,
    ) -> SharingResult<Result<TableProcessor, String>> {
        match TableProcessor::create(
            &self.database,
            &self.clients,
            self.capabilities,
            data,
            shared,
            revoked,
        )
        .await
        {
            Ok(processor) => Ok(Ok(processor)),
            Err(SharingError::ProcessorConstruction(reason)) => Ok(Err(reason)),
            Err(e) => Err(e),
        }
    }

    /// Mark every table of a batch whose processor could not be built as failed.
    ///
    /// Approved tables end in `Share_Failed`, revoked tables in `Revoke_Failed`.
    pub async fn handle_table_share_failure(
        &self,
        data: &ShareData,
        shared_tables: &[DatasetTable],
        revoked_tables: &[DatasetTable],
        reason: &str,
    ) -> SharingResult<BatchReport> {
        let share_uri = &data.share.share_uri;
        log::error!(
            "No table processor for share {share_uri}, failing {} tables: {reason}",
            shared_tables.len() + revoked_tables.len()
        );

        let mut report = BatchReport::default();
        let mut conn = self.database.connection().await?;
        for table in shared_tables.iter().chain(revoked_tables) {
            let Some(mut item) =
                ShareObjectRepository::find_sharable_item(&mut conn, share_uri, &table.table_uri)
                    .await?
            else {
                return Err(SharingError::NotFound {
                    kind: "share item",
                    id: table.table_uri.clone(),
                });
            };

            let mut sm = ShareItemSM::new(item.status);
            if matches!(
                item.status,
                ShareItemStatus::ShareApproved | ShareItemStatus::RevokeApproved
            ) {
                let new_status = sm.run_transition(ShareItemAction::Start)?;
                sm.update_state_single_item(&mut conn, &mut item, new_status)
                    .await?;
            }
            let new_status = sm.run_transition(ShareItemAction::Failure)?;
            sm.update_state_single_item(&mut conn, &mut item, new_status)
                .await?;

            report.push(ItemReport {
                item_uri: item.item_uri,
                name: item.item_name,
                outcome: ItemOutcome::Failed(reason.to_string()),
            });
        }
        Ok(report)
    }

    async fn has_shared_items_of_type(
        &self,
        share_uri: &str,
        item_type: ShareableType,
    ) -> SharingResult<bool> {
        let mut conn = self.database.connection().await?;
        let shared =
            ShareObjectRepository::check_existing_shared_items_of_type(&mut conn, share_uri, item_type)
                .await?;
        Ok(shared)
    }

    async fn finish_share(
        &self,
        share: &mut ShareObject,
        share_sm: &mut ShareObjectSM,
        action: ShareObjectAction,
    ) -> SharingResult<()> {
        let mut session = self.database.scoped_session().await?;
        let new_status = share_sm.run_transition(action)?;
        share_sm.update_state(&mut session, share, new_status).await?;
        session.commit().await?;
        log::info!("Share {} is {new_status}", share.share_uri);
        Ok(())
    }
}

fn log_report(share_uri: &str, stage: &str, report: &BatchReport) {
    if report.is_empty() {
        return;
    }
    let failed = report.failures().count();
    if failed == 0 {
        log::info!("{stage} of share {share_uri}: {} items done", report.len());
    } else {
        log::warn!(
            "{stage} of share {share_uri}: {failed} of {} items failed",
            report.len()
        );
    }
}
