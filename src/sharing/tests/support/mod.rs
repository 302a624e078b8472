#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use common::Database;
use common::model::{ShareItemStatus, ShareObjectStatus};
use common::repository::ShareObjectRepository;
use sharing::cloud::{
    AccessPoint, CatalogDetails, CloudClients, CloudError, CloudResult, FolderGrant, GlueClient,
    LakeFormationClient, LfGrant, ObjectStorageClient, ResourceLink, ResourceShareClient,
    TableResource,
};
use sharing::{DataSharingService, ShareCapabilities};

/// In-memory cloud that records every call as `"<operation> <detail>"`.
#[derive(Default)]
pub struct FakeCloud {
    calls: Mutex<Vec<String>>,
    failures: Mutex<Vec<(&'static str, String)>>,
    catalog: Mutex<Option<CatalogDetails>>,
    catalog_unavailable: AtomicBool,
}

impl FakeCloud {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make `operation` fail whenever its recorded detail contains `needle`.
    pub fn fail(&self, operation: &'static str, needle: &str) {
        self.failures
            .lock()
            .unwrap()
            .push((operation, needle.to_string()));
    }

    pub fn redirect_catalog(&self, details: CatalogDetails) {
        *self.catalog.lock().unwrap() = Some(details);
    }

    /// Make the source catalog lookup fail.
    pub fn break_catalog(&self) {
        self.catalog_unavailable.store(true, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, operation: &str) -> usize {
        self.calls()
            .iter()
            .filter(|call| call.split(' ').next() == Some(operation))
            .count()
    }

    fn record(&self, operation: &'static str, detail: String) -> CloudResult<()> {
        let fails = self
            .failures
            .lock()
            .unwrap()
            .iter()
            .any(|(op, needle)| *op == operation && detail.contains(needle.as_str()));
        self.calls
            .lock()
            .unwrap()
            .push(format!("{operation} {detail}"));

        if fails {
            Err(CloudError::Api {
                service: "fake",
                operation,
                message: format!("injected failure for {detail}"),
            })
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl GlueClient for FakeCloud {
    async fn get_source_catalog(
        &self,
        account_id: &str,
        region: &str,
        database: &str,
    ) -> CloudResult<Option<CatalogDetails>> {
        self.record(
            "glue.get_source_catalog",
            format!("{account_id}/{region}/{database}"),
        )?;
        if self.catalog_unavailable.load(Ordering::SeqCst) {
            return Err(CloudError::AccessDenied("glue:GetDatabase".to_string()));
        }
        Ok(self.catalog.lock().unwrap().clone())
    }

    async fn table_exists(&self, table: &TableResource) -> CloudResult<bool> {
        let missing = self.record("glue.table_exists", table.to_string()).is_err();
        Ok(!missing)
    }

    async fn create_database(
        &self,
        account_id: &str,
        region: &str,
        database: &str,
    ) -> CloudResult<()> {
        self.record(
            "glue.create_database",
            format!("{account_id}/{region}/{database}"),
        )
    }

    async fn delete_database(
        &self,
        account_id: &str,
        region: &str,
        database: &str,
    ) -> CloudResult<()> {
        self.record(
            "glue.delete_database",
            format!("{account_id}/{region}/{database}"),
        )
    }

    async fn create_resource_link(&self, link: &ResourceLink) -> CloudResult<()> {
        self.record(
            "glue.create_resource_link",
            format!("{} -> {}", link.link, link.target),
        )
    }

    async fn delete_table(&self, table: &TableResource) -> CloudResult<()> {
        self.record("glue.delete_table", table.to_string())
    }
}

#[async_trait]
impl LakeFormationClient for FakeCloud {
    async fn grant_permissions(&self, grant: &LfGrant) -> CloudResult<()> {
        self.record(
            "lf.grant",
            format!("{:?} {} {}", grant.permissions, grant.resource, grant.principal),
        )
    }

    async fn revoke_permissions(&self, grant: &LfGrant) -> CloudResult<()> {
        self.record(
            "lf.revoke",
            format!("{:?} {} {}", grant.permissions, grant.resource, grant.principal),
        )
    }
}

#[async_trait]
impl ResourceShareClient for FakeCloud {
    async fn accept_invitations(
        &self,
        account_id: &str,
        region: &str,
        sender_account_id: &str,
    ) -> CloudResult<()> {
        self.record(
            "ram.accept_invitations",
            format!("{account_id}/{region} from {sender_account_id}"),
        )
    }
}

#[async_trait]
impl ObjectStorageClient for FakeCloud {
    async fn manage_bucket_policy(&self, access_point: &AccessPoint) -> CloudResult<()> {
        self.record("s3.manage_bucket_policy", access_point.bucket.clone())
    }

    async fn attach_target_role_policy(&self, grant: &FolderGrant) -> CloudResult<()> {
        self.record(
            "iam.attach_target_role_policy",
            format!("{} {}", grant.access_point.target_role_name, grant.prefix),
        )
    }

    async fn put_access_point_prefix(&self, grant: &FolderGrant) -> CloudResult<()> {
        self.record(
            "s3.put_access_point_prefix",
            format!("{} {}", grant.access_point.name, grant.prefix),
        )
    }

    async fn add_kms_key_grant(&self, access_point: &AccessPoint) -> CloudResult<()> {
        self.record("kms.add_key_grant", access_point.target_role_arn.clone())
    }

    async fn remove_access_point_prefix(&self, grant: &FolderGrant) -> CloudResult<()> {
        self.record(
            "s3.remove_access_point_prefix",
            format!("{} {}", grant.access_point.name, grant.prefix),
        )
    }

    async fn delete_access_point(&self, access_point: &AccessPoint) -> CloudResult<()> {
        self.record("s3.delete_access_point", access_point.name.clone())
    }

    async fn detach_target_role_policy(&self, access_point: &AccessPoint) -> CloudResult<()> {
        self.record(
            "iam.detach_target_role_policy",
            access_point.target_role_name.clone(),
        )
    }

    async fn remove_kms_key_grant(&self, access_point: &AccessPoint) -> CloudResult<()> {
        self.record("kms.remove_key_grant", access_point.target_role_arn.clone())
    }
}

pub fn service(
    database: &Database,
    cloud: &Arc<FakeCloud>,
    capabilities: ShareCapabilities,
) -> DataSharingService {
    DataSharingService::new(
        database.clone(),
        CloudClients::from_single(cloud.clone()),
        capabilities,
    )
}

pub async fn share_status(database: &Database, share_uri: &str) -> ShareObjectStatus {
    let mut conn = database.connection().await.unwrap();
    ShareObjectRepository::get_share_by_uri(&mut conn, share_uri)
        .await
        .unwrap()
        .status
}

/// `(item name, status)` for every item of the share, in the order they were added.
pub async fn item_statuses(database: &Database, share_uri: &str) -> Vec<(String, ShareItemStatus)> {
    let mut conn = database.connection().await.unwrap();
    ShareObjectRepository::list_share_items(&mut conn, share_uri)
        .await
        .unwrap()
        .into_iter()
        .map(|item| (item.item_name, item.status))
        .collect()
}

pub async fn status_of(database: &Database, share_uri: &str, name: &str) -> ShareItemStatus {
    item_statuses(database, share_uri)
        .await
        .into_iter()
        .find(|(item, _)| item == name)
        .map(|(_, status)| status)
        .unwrap()
}
