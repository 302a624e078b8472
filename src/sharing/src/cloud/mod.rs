//! Interfaces to the cloud services the processors drive.
//!
//! Implementations own retries and timeouts. The sharing core only sequences
//! calls and records outcomes.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

pub mod dry_run;

pub use dry_run::DryRunCloud;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CloudError {
    #[error("{service} {operation} failed: {message}")]
    Api {
        service: &'static str,
        operation: &'static str,
        message: String,
    },
    #[error("{0} not found")]
    NotFound(String),
    #[error("Access denied: {0}")]
    AccessDenied(String),
}

pub type CloudResult<T> = Result<T, CloudError>;

/// Where a catalog database actually lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogDetails {
    pub account_id: String,
    pub database: String,
    pub region: String,
}

/// A table in some account's catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableResource {
    pub catalog_id: String,
    pub region: String,
    pub database: String,
    pub table: String,
}

impl fmt::Display for TableResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}.{}", self.catalog_id, self.database, self.table)
    }
}

/// A table in the shared database pointing at a table of another database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceLink {
    pub link: TableResource,
    pub target: TableResource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LfPermission {
    Describe,
    Select,
}

/// Lake Formation permission grant (or revocation) on a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LfGrant {
    /// Role ARN or account id
    pub principal: String,
    pub resource: TableResource,
    pub permissions: Vec<LfPermission>,
    /// Allow the principal to re-grant to its own principals
    pub grantable: bool,
}

/// A dataset bucket access point dedicated to one consumer role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessPoint {
    pub source_account_id: String,
    pub region: String,
    pub bucket: String,
    pub name: String,
    pub target_account_id: String,
    pub target_role_arn: String,
    pub target_role_name: String,
    pub kms_alias: Option<String>,
}

/// Access to one folder (prefix) through an access point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderGrant {
    pub access_point: AccessPoint,
    pub prefix: String,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GlueClient: Send + Sync {
    /// Catalog a database links to, if `database` is a resource link into another catalog.
    async fn get_source_catalog(
        &self,
        account_id: &str,
        region: &str,
        database: &str,
    ) -> CloudResult<Option<CatalogDetails>>;

    async fn table_exists(&self, table: &TableResource) -> CloudResult<bool>;

    /// Create the database if it is missing. Existing databases are left alone.
    async fn create_database(
        &self,
        account_id: &str,
        region: &str,
        database: &str,
    ) -> CloudResult<()>;

    async fn delete_database(
        &self,
        account_id: &str,
        region: &str,
        database: &str,
    ) -> CloudResult<()>;

    async fn create_resource_link(&self, link: &ResourceLink) -> CloudResult<()>;

    async fn delete_table(&self, table: &TableResource) -> CloudResult<()>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LakeFormationClient: Send + Sync {
    async fn grant_permissions(&self, grant: &LfGrant) -> CloudResult<()>;

    async fn revoke_permissions(&self, grant: &LfGrant) -> CloudResult<()>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ResourceShareClient: Send + Sync {
    /// Accept every pending resource share invitation sent by `sender_account_id`.
    async fn accept_invitations(
        &self,
        account_id: &str,
        region: &str,
        sender_account_id: &str,
    ) -> CloudResult<()>;
}

/// Bucket policy, access point, IAM and KMS operations behind folder sharing.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectStorageClient: Send + Sync {
    /// Make the bucket delegate access control to its access points.
    async fn manage_bucket_policy(&self, access_point: &AccessPoint) -> CloudResult<()>;

    async fn attach_target_role_policy(&self, grant: &FolderGrant) -> CloudResult<()>;

    /// Create the access point if needed and allow the target role on the prefix.
    async fn put_access_point_prefix(&self, grant: &FolderGrant) -> CloudResult<()>;

    async fn add_kms_key_grant(&self, access_point: &AccessPoint) -> CloudResult<()>;

    async fn remove_access_point_prefix(&self, grant: &FolderGrant) -> CloudResult<()>;

    async fn delete_access_point(&self, access_point: &AccessPoint) -> CloudResult<()>;

    async fn detach_target_role_policy(&self, access_point: &AccessPoint) -> CloudResult<()>;

    async fn remove_kms_key_grant(&self, access_point: &AccessPoint) -> CloudResult<()>;
}

/// The set of cloud clients handed to processors.
#[derive(Clone)]
pub struct CloudClients {
    pub glue: Arc<dyn GlueClient>,
    pub lake_formation: Arc<dyn LakeFormationClient>,
    pub resource_shares: Arc<dyn ResourceShareClient>,
    pub object_storage: Arc<dyn ObjectStorageClient>,
}

impl CloudClients {
    /// Use one value implementing every client trait.
    pub fn from_single<C>(client: Arc<C>) -> Self
    where
        C: GlueClient + LakeFormationClient + ResourceShareClient + ObjectStorageClient + 'static,
    {
        Self {
            glue: client.clone(),
            lake_formation: client.clone(),
            resource_shares: client.clone(),
            object_storage: client,
        }
    }
}
