//! Seed data for share workflow tests.

use chrono::Utc;

use crate::database::Database;
use crate::model::{
    Dataset, DatasetStorageLocation, DatasetTable, Environment, EnvironmentGroup,
    ShareItemStatus, ShareObject, ShareObjectStatus, ShareableType,
};
use crate::repository::{RepositoryResult, ShareObjectRepository};

pub const SOURCE_ACCOUNT: &str = "111111111111";
pub const TARGET_ACCOUNT: &str = "222222222222";
pub const REGION: &str = "eu-west-1";

/// Builder for one dataset shared from a source environment to a target group.
#[derive(Debug, Clone)]
pub struct ShareFixture {
    target_account: String,
    share_status: ShareObjectStatus,
    items: Vec<(ShareableType, String, ShareItemStatus)>,
}

/// Identifiers of the rows written by [`ShareFixture::seed`].
#[derive(Debug, Clone)]
pub struct SeededShare {
    pub share_uri: String,
    pub dataset_uri: String,
    pub glue_database_name: String,
    pub source_environment_uri: String,
    pub target_environment_uri: String,
    pub target_account: String,
}

impl SeededShare {
    pub fn table_uri(&self, name: &str) -> String {
        format!("table-{name}")
    }

    pub fn location_uri(&self, name: &str) -> String {
        format!("folder-{name}")
    }
}

impl ShareFixture {
    /// Consumer lives in the same account as the dataset.
    pub fn same_account() -> Self {
        Self::with_target_account(SOURCE_ACCOUNT)
    }

    /// Consumer lives in [`TARGET_ACCOUNT`].
    pub fn cross_account() -> Self {
        Self::with_target_account(TARGET_ACCOUNT)
    }

    pub fn with_target_account(account: &str) -> Self {
        Self {
            target_account: account.to_string(),
            share_status: ShareObjectStatus::Draft,
            items: Vec::new(),
        }
    }

    pub fn with_share_status(mut self, status: ShareObjectStatus) -> Self {
        self.share_status = status;
        self
    }

    /// Add one table item per name, all in `status`.
    pub fn with_tables(mut self, names: &[&str], status: ShareItemStatus) -> Self {
        for name in names {
            self.items
                .push((ShareableType::Table, name.to_string(), status));
        }
        self
    }

    /// Add one folder item per name, all in `status`.
    pub fn with_folders(mut self, names: &[&str], status: ShareItemStatus) -> Self {
        for name in names {
            self.items
                .push((ShareableType::StorageLocation, name.to_string(), status));
        }
        self
    }

    pub async fn seed(self, database: &Database) -> RepositoryResult<SeededShare> {
        let mut session = database.scoped_session().await?;

        let source = Environment {
            environment_uri: "env-source".to_string(),
            label: "source".to_string(),
            aws_account_id: SOURCE_ACCOUNT.to_string(),
            region: REGION.to_string(),
        };
        let target = Environment {
            environment_uri: "env-target".to_string(),
            label: "target".to_string(),
            aws_account_id: self.target_account.clone(),
            region: REGION.to_string(),
        };
        ShareObjectRepository::create_environment(&mut session, &source).await?;
        ShareObjectRepository::create_environment(&mut session, &target).await?;

        ShareObjectRepository::create_environment_group(
            &mut session,
            &EnvironmentGroup {
                group_uri: "dataset-admins".to_string(),
                environment_uri: source.environment_uri.clone(),
                environment_iam_role_arn: format!("arn:aws:iam::{SOURCE_ACCOUNT}:role/dataset-admins"),
                environment_iam_role_name: "dataset-admins".to_string(),
            },
        )
        .await?;
        ShareObjectRepository::create_environment_group(
            &mut session,
            &EnvironmentGroup {
                group_uri: "consumers".to_string(),
                environment_uri: target.environment_uri.clone(),
                environment_iam_role_arn: format!(
                    "arn:aws:iam::{}:role/consumers",
                    self.target_account
                ),
                environment_iam_role_name: "consumers".to_string(),
            },
        )
        .await?;

        let dataset = Dataset {
            dataset_uri: "dataset-sales".to_string(),
            label: "sales".to_string(),
            environment_uri: source.environment_uri.clone(),
            admin_group: "dataset-admins".to_string(),
            aws_account_id: SOURCE_ACCOUNT.to_string(),
            region: REGION.to_string(),
            glue_database_name: "sales_db".to_string(),
            s3_bucket_name: "sales-bucket".to_string(),
            kms_alias: Some("alias/sales".to_string()),
        };
        ShareObjectRepository::create_dataset(&mut session, &dataset).await?;

        let now = Utc::now();
        let share = ShareObject {
            share_uri: "share-1".to_string(),
            dataset_uri: dataset.dataset_uri.clone(),
            environment_uri: target.environment_uri.clone(),
            group_uri: "consumers".to_string(),
            owner: "requester@example.com".to_string(),
            status: self.share_status,
            created: now,
            updated: now,
        };
        ShareObjectRepository::create_share_object(&mut session, &share).await?;

        for (item_type, name, status) in &self.items {
            let item_uri = match item_type {
                ShareableType::Table => {
                    let table = DatasetTable {
                        table_uri: format!("table-{name}"),
                        dataset_uri: dataset.dataset_uri.clone(),
                        glue_database_name: dataset.glue_database_name.clone(),
                        glue_table_name: name.clone(),
                        s3_prefix: format!("tables/{name}"),
                    };
                    ShareObjectRepository::create_dataset_table(&mut session, &table).await?;
                    table.table_uri
                }
                ShareableType::StorageLocation => {
                    let location = DatasetStorageLocation {
                        location_uri: format!("folder-{name}"),
                        dataset_uri: dataset.dataset_uri.clone(),
                        label: name.clone(),
                        s3_prefix: name.clone(),
                    };
                    ShareObjectRepository::create_storage_location(&mut session, &location)
                        .await?;
                    location.location_uri
                }
            };
            ShareObjectRepository::add_share_item(
                &mut session,
                &share.share_uri,
                *item_type,
                &item_uri,
                name,
                *status,
            )
            .await?;
        }

        session.commit().await?;

        Ok(SeededShare {
            share_uri: share.share_uri,
            dataset_uri: dataset.dataset_uri,
            glue_database_name: dataset.glue_database_name,
            source_environment_uri: source.environment_uri,
            target_environment_uri: target.environment_uri,
            target_account: self.target_account,
        })
    }
}
