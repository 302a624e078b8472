use async_trait::async_trait;

use super::{
    AccessPoint, CatalogDetails, CloudResult, FolderGrant, GlueClient, LakeFormationClient, LfGrant,
    ObjectStorageClient, ResourceLink, ResourceShareClient, TableResource,
};

/// Cloud backend that logs every call and reports success.
///
/// Used by the worker binary's `--dry-run` mode to exercise a share's state
/// transitions without touching any account.
#[derive(Debug, Default, Clone)]
pub struct DryRunCloud;

#[async_trait]
impl GlueClient for DryRunCloud {
    async fn get_source_catalog(
        &self,
        account_id: &str,
        region: &str,
        database: &str,
    ) -> CloudResult<Option<CatalogDetails>> {
        log::info!("[dry-run] glue get_database {account_id}/{region}/{database}");
        Ok(None)
    }

    async fn table_exists(&self, table: &TableResource) -> CloudResult<bool> {
        log::info!("[dry-run] glue get_table {table}");
        Ok(true)
    }

    async fn create_database(
        &self,
        account_id: &str,
        region: &str,
        database: &str,
    ) -> CloudResult<()> {
        log::info!("[dry-run] glue create_database {account_id}/{region}/{database}");
        Ok(())
    }

    async fn delete_database(
        &self,
        account_id: &str,
        region: &str,
        database: &str,
    ) -> CloudResult<()> {
        log::info!("[dry-run] glue delete_database {account_id}/{region}/{database}");
        Ok(())
    }

    async fn create_resource_link(&self, link: &ResourceLink) -> CloudResult<()> {
        log::info!(
            "[dry-run] glue create_table {} -> {}",
            link.link,
            link.target
        );
        Ok(())
    }

    async fn delete_table(&self, table: &TableResource) -> CloudResult<()> {
        log::info!("[dry-run] glue delete_table {table}");
        Ok(())
    }
}

#[async_trait]
impl LakeFormationClient for DryRunCloud {
    async fn grant_permissions(&self, grant: &LfGrant) -> CloudResult<()> {
        log::info!(
            "[dry-run] lakeformation grant {:?} on {} to {}",
            grant.permissions,
            grant.resource,
            grant.principal
        );
        Ok(())
    }

    async fn revoke_permissions(&self, grant: &LfGrant) -> CloudResult<()> {
        log::info!(
            "[dry-run] lakeformation revoke {:?} on {} from {}",
            grant.permissions,
            grant.resource,
            grant.principal
        );
        Ok(())
    }
}

#[async_trait]
impl ResourceShareClient for DryRunCloud {
    async fn accept_invitations(
        &self,
        account_id: &str,
        region: &str,
        sender_account_id: &str,
    ) -> CloudResult<()> {
        log::info!(
            "[dry-run] ram accept invitations from {sender_account_id} in {account_id}/{region}"
        );
        Ok(())
    }
}

#[async_trait]
impl ObjectStorageClient for DryRunCloud {
    async fn manage_bucket_policy(&self, access_point: &AccessPoint) -> CloudResult<()> {
        log::info!("[dry-run] s3 put_bucket_policy {}", access_point.bucket);
        Ok(())
    }

    async fn attach_target_role_policy(&self, grant: &FolderGrant) -> CloudResult<()> {
        log::info!(
            "[dry-run] iam put_role_policy {} prefix {}",
            grant.access_point.target_role_name,
            grant.prefix
        );
        Ok(())
    }

    async fn put_access_point_prefix(&self, grant: &FolderGrant) -> CloudResult<()> {
        log::info!(
            "[dry-run] s3control put_access_point_policy {} prefix {}",
            grant.access_point.name,
            grant.prefix
        );
        Ok(())
    }

    async fn add_kms_key_grant(&self, access_point: &AccessPoint) -> CloudResult<()> {
        log::info!(
            "[dry-run] kms put_key_policy {:?} for {}",
            access_point.kms_alias,
            access_point.target_role_arn
        );
        Ok(())
    }

    async fn remove_access_point_prefix(&self, grant: &FolderGrant) -> CloudResult<()> {
        log::info!(
            "[dry-run] s3control remove prefix {} from {}",
            grant.prefix,
            grant.access_point.name
        );
        Ok(())
    }

    async fn delete_access_point(&self, access_point: &AccessPoint) -> CloudResult<()> {
        log::info!("[dry-run] s3control delete_access_point {}", access_point.name);
        Ok(())
    }

    async fn detach_target_role_policy(&self, access_point: &AccessPoint) -> CloudResult<()> {
        log::info!("[dry-run] iam delete_role_policy {}", access_point.target_role_name);
        Ok(())
    }

    async fn remove_kms_key_grant(&self, access_point: &AccessPoint) -> CloudResult<()> {
        log::info!(
            "[dry-run] kms remove {} from {:?}",
            access_point.target_role_arn,
            access_point.kms_alias
        );
        Ok(())
    }
}
