//! Folder sharing through a per-consumer S3 access point.

use std::sync::Arc;

use common::Database;
use common::model::DatasetStorageLocation;
use common::repository::ShareData;

use super::{BatchReport, ItemPhase, access_point_name, begin_item, finish_item, skipped_item};
use crate::cloud::{AccessPoint, CloudResult, FolderGrant, ObjectStorageClient};
use crate::error::SharingResult;

pub struct FolderProcessor {
    database: Database,
    storage: Arc<dyn ObjectStorageClient>,
    share_uri: String,
    access_point: AccessPoint,
}

impl FolderProcessor {
    pub fn new(database: &Database, storage: Arc<dyn ObjectStorageClient>, data: &ShareData) -> Self {
        let access_point = AccessPoint {
            source_account_id: data.source_environment.aws_account_id.clone(),
            region: data.dataset.region.clone(),
            bucket: data.dataset.s3_bucket_name.clone(),
            name: access_point_name(&data.dataset.dataset_uri, &data.env_group.group_uri),
            target_account_id: data.target_environment.aws_account_id.clone(),
            target_role_arn: data.env_group.environment_iam_role_arn.clone(),
            target_role_name: data.env_group.environment_iam_role_name.clone(),
            kms_alias: data.dataset.kms_alias.clone(),
        };

        Self {
            database: database.clone(),
            storage,
            share_uri: data.share.share_uri.clone(),
            access_point,
        }
    }

    fn grant(&self, folder: &DatasetStorageLocation) -> FolderGrant {
        FolderGrant {
            access_point: self.access_point.clone(),
            prefix: folder.s3_prefix.clone(),
        }
    }

    async fn grant_folder(&self, folder: &DatasetStorageLocation) -> CloudResult<()> {
        let grant = self.grant(folder);
        self.storage.manage_bucket_policy(&grant.access_point).await?;
        self.storage.attach_target_role_policy(&grant).await?;
        self.storage.put_access_point_prefix(&grant).await?;
        self.storage.add_kms_key_grant(&grant.access_point).await
    }

    pub async fn process_approved_shares(
        &self,
        folders: &[DatasetStorageLocation],
    ) -> SharingResult<BatchReport> {
        let mut report = BatchReport::default();
        if !folders.is_empty() {
            log::info!(
                "Granting {} folders of share {} through access point {}",
                folders.len(),
                self.share_uri,
                self.access_point.name
            );
        }

        for folder in folders {
            let Some(tracked) =
                begin_item(&self.database, &self.share_uri, &folder.location_uri, ItemPhase::Share)
                    .await?
            else {
                report.push(skipped_item(&self.share_uri, &folder.location_uri, &folder.label));
                continue;
            };

            let result = self.grant_folder(folder).await;
            report.push(finish_item(&self.database, tracked, result).await?);
        }

        Ok(report)
    }

    pub async fn process_revoked_shares(
        &self,
        folders: &[DatasetStorageLocation],
    ) -> SharingResult<BatchReport> {
        let mut report = BatchReport::default();

        for folder in folders {
            let Some(tracked) =
                begin_item(&self.database, &self.share_uri, &folder.location_uri, ItemPhase::Revoke)
                    .await?
            else {
                report.push(skipped_item(&self.share_uri, &folder.location_uri, &folder.label));
                continue;
            };

            let result = self
                .storage
                .remove_access_point_prefix(&self.grant(folder))
                .await;
            report.push(finish_item(&self.database, tracked, result).await?);
        }

        Ok(report)
    }

    /// Remove the access point and the consumer's grants once no folder is shared.
    ///
    /// Every step is attempted. Returns false if any of them failed.
    pub async fn clean_up_share(&self) -> bool {
        let ap = &self.access_point;
        let results = [
            ("delete access point", self.storage.delete_access_point(ap).await),
            (
                "detach target role policy",
                self.storage.detach_target_role_policy(ap).await,
            ),
            ("remove KMS key grant", self.storage.remove_kms_key_grant(ap).await),
        ];

        let mut ok = true;
        for (step, result) in results {
            if let Err(e) = result {
                log::error!("Folder clean-up of share {} failed to {step}: {e}", self.share_uri);
                ok = false;
            }
        }
        if ok {
            log::info!("Cleaned up access point {} of share {}", ap.name, self.share_uri);
        }
        ok
    }
}
