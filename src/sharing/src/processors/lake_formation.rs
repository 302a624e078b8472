//! Table sharing through Lake Formation grants and Glue resource links.

use std::collections::HashSet;

use async_trait::async_trait;
use common::Database;
use common::model::{Dataset, DatasetTable, Environment, EnvironmentGroup, ShareObject};
use common::repository::{ShareData, ShareObjectRepository};

use super::{BatchReport, ItemPhase, begin_item, finish_item, shared_database_name, skipped_item};
use crate::capabilities::ShareCapabilities;
use crate::catalog::{ResolvedCatalog, SharingTopology, resolve_source_catalog, select_topology};
use crate::cloud::{
    CloudClients, CloudError, CloudResult, LfGrant, LfPermission, ResourceLink, TableResource,
};
use crate::error::{SharingError, SharingResult};

/// Everything a table processor needs about one share.
pub struct LfShareContext {
    pub database: Database,
    pub clients: CloudClients,
    pub share: ShareObject,
    pub dataset: Dataset,
    pub source_environment: Environment,
    pub target_environment: Environment,
    pub env_group: EnvironmentGroup,
    pub catalog: ResolvedCatalog,
    pub shared_tables: Vec<DatasetTable>,
    pub revoked_tables: Vec<DatasetTable>,
}

impl LfShareContext {
    pub fn shared_database(&self) -> String {
        shared_database_name(&self.dataset.glue_database_name, &self.share.share_uri)
    }

    fn principals(&self) -> Vec<String> {
        vec![self.env_group.environment_iam_role_arn.clone()]
    }

    fn source_table(&self, table: &DatasetTable) -> TableResource {
        TableResource {
            catalog_id: self.catalog.account_id.clone(),
            region: self.catalog.region.clone(),
            database: self.catalog.database.clone(),
            table: table.glue_table_name.clone(),
        }
    }

    fn link_table(&self, table: &DatasetTable) -> TableResource {
        TableResource {
            catalog_id: self.target_environment.aws_account_id.clone(),
            region: self.target_environment.region.clone(),
            database: self.shared_database(),
            table: table.glue_table_name.clone(),
        }
    }

    fn account_grant(&self, table: &DatasetTable) -> LfGrant {
        LfGrant {
            principal: self.target_environment.aws_account_id.clone(),
            resource: self.source_table(table),
            permissions: vec![LfPermission::Describe, LfPermission::Select],
            grantable: true,
        }
    }

    async fn create_shared_database(&self) -> CloudResult<()> {
        let name = self.shared_database();
        log::info!(
            "Creating shared database {name} in {}/{}",
            self.target_environment.aws_account_id,
            self.target_environment.region
        );
        self.clients
            .glue
            .create_database(
                &self.target_environment.aws_account_id,
                &self.target_environment.region,
                &name,
            )
            .await
    }

    async fn check_table_exists(&self, table: &DatasetTable) -> CloudResult<()> {
        let source = self.source_table(table);
        if self.clients.glue.table_exists(&source).await? {
            Ok(())
        } else {
            Err(CloudError::NotFound(format!("table {source}")))
        }
    }

    /// Link the table into the shared database and let the principals read it.
    async fn create_link_and_grant(&self, table: &DatasetTable) -> CloudResult<()> {
        let link = ResourceLink {
            link: self.link_table(table),
            target: self.source_table(table),
        };
        self.clients.glue.create_resource_link(&link).await?;

        for principal in self.principals() {
            self.clients
                .lake_formation
                .grant_permissions(&LfGrant {
                    principal: principal.clone(),
                    resource: link.link.clone(),
                    permissions: vec![LfPermission::Describe],
                    grantable: false,
                })
                .await?;
            self.clients
                .lake_formation
                .grant_permissions(&LfGrant {
                    principal,
                    resource: link.target.clone(),
                    permissions: vec![LfPermission::Select, LfPermission::Describe],
                    grantable: false,
                })
                .await?;
        }
        Ok(())
    }

    /// Undo [`Self::create_link_and_grant`].
    async fn revoke_principals(&self, table: &DatasetTable) -> CloudResult<()> {
        let link = self.link_table(table);
        let source = self.source_table(table);

        for principal in self.principals() {
            self.clients
                .lake_formation
                .revoke_permissions(&LfGrant {
                    principal: principal.clone(),
                    resource: link.clone(),
                    permissions: vec![LfPermission::Describe],
                    grantable: false,
                })
                .await?;
            self.clients
                .lake_formation
                .revoke_permissions(&LfGrant {
                    principal,
                    resource: source.clone(),
                    permissions: vec![LfPermission::Select, LfPermission::Describe],
                    grantable: false,
                })
                .await?;
        }
        self.clients.glue.delete_table(&link).await
    }
}

/// Approve and revoke loops shared by both account topologies.
#[async_trait]
pub trait LfTableSharing: Send + Sync {
    fn context(&self) -> &LfShareContext;

    /// Cloud steps giving the consumer access to one table.
    async fn grant_table(&self, table: &DatasetTable) -> CloudResult<()>;

    /// Cloud steps taking access to one table away from the consumer.
    async fn revoke_table(&self, table: &DatasetTable) -> CloudResult<()>;

    async fn process_approved_shares(&self) -> SharingResult<BatchReport> {
        let ctx = self.context();
        let mut report = BatchReport::default();
        if ctx.shared_tables.is_empty() {
            return Ok(report);
        }

        log::info!(
            "Granting {} tables of share {} to {}",
            ctx.shared_tables.len(),
            ctx.share.share_uri,
            ctx.env_group.group_uri
        );
        let setup = ctx.create_shared_database().await;
        if let Err(e) = &setup {
            log::error!(
                "Failed to create shared database {}: {e}",
                ctx.shared_database()
            );
        }

        for table in &ctx.shared_tables {
            let Some(tracked) = begin_item(
                &ctx.database,
                &ctx.share.share_uri,
                &table.table_uri,
                ItemPhase::Share,
            )
            .await?
            else {
                report.push(skipped_item(
                    &ctx.share.share_uri,
                    &table.table_uri,
                    &table.glue_table_name,
                ));
                continue;
            };

            let result = match &setup {
                Ok(()) => self.grant_table(table).await,
                Err(e) => Err(e.clone()),
            };
            report.push(finish_item(&ctx.database, tracked, result).await?);
        }

        Ok(report)
    }

    async fn process_revoked_shares(&self) -> SharingResult<BatchReport> {
        let ctx = self.context();
        let mut report = BatchReport::default();

        for table in &ctx.revoked_tables {
            let Some(tracked) = begin_item(
                &ctx.database,
                &ctx.share.share_uri,
                &table.table_uri,
                ItemPhase::Revoke,
            )
            .await?
            else {
                report.push(skipped_item(
                    &ctx.share.share_uri,
                    &table.table_uri,
                    &table.glue_table_name,
                ));
                continue;
            };

            let result = self.revoke_table(table).await;
            report.push(finish_item(&ctx.database, tracked, result).await?);
        }

        Ok(report)
    }

    /// Drop the consumer-side database of the share. Returns false on failure.
    async fn delete_shared_database(&self) -> bool {
        let ctx = self.context();
        let name = ctx.shared_database();
        match ctx
            .clients
            .glue
            .delete_database(
                &ctx.target_environment.aws_account_id,
                &ctx.target_environment.region,
                &name,
            )
            .await
        {
            Ok(()) => {
                log::info!("Deleted shared database {name}");
                true
            }
            Err(e) => {
                log::error!("Failed to delete shared database {name}: {e}");
                false
            }
        }
    }
}

/// Consumer and catalog owner are the same account.
pub struct SameAccountTableProcessor {
    ctx: LfShareContext,
}

#[async_trait]
impl LfTableSharing for SameAccountTableProcessor {
    fn context(&self) -> &LfShareContext {
        &self.ctx
    }

    async fn grant_table(&self, table: &DatasetTable) -> CloudResult<()> {
        self.ctx.check_table_exists(table).await?;
        self.ctx.create_link_and_grant(table).await
    }

    async fn revoke_table(&self, table: &DatasetTable) -> CloudResult<()> {
        self.ctx.revoke_principals(table).await
    }
}

/// Consumer lives in another account than the catalog owner.
pub struct CrossAccountTableProcessor {
    ctx: LfShareContext,
    /// Revoked tables another share still grants to the target account
    retained_account_grants: HashSet<String>,
}

#[async_trait]
impl LfTableSharing for CrossAccountTableProcessor {
    fn context(&self) -> &LfShareContext {
        &self.ctx
    }

    async fn grant_table(&self, table: &DatasetTable) -> CloudResult<()> {
        self.ctx.check_table_exists(table).await?;
        self.ctx
            .clients
            .lake_formation
            .grant_permissions(&self.ctx.account_grant(table))
            .await?;
        self.ctx
            .clients
            .resource_shares
            .accept_invitations(
                &self.ctx.target_environment.aws_account_id,
                &self.ctx.target_environment.region,
                &self.ctx.catalog.account_id,
            )
            .await?;
        self.ctx.create_link_and_grant(table).await
    }

    async fn revoke_table(&self, table: &DatasetTable) -> CloudResult<()> {
        self.ctx.revoke_principals(table).await?;
        if self.retained_account_grants.contains(&table.table_uri) {
            log::info!(
                "Table {} is still shared with account {} by another share, keeping its grant",
                table.glue_table_name,
                self.ctx.target_environment.aws_account_id
            );
            return Ok(());
        }
        self.ctx
            .clients
            .lake_formation
            .revoke_permissions(&self.ctx.account_grant(table))
            .await
    }
}

/// Table processor for the topology of a share.
pub enum TableProcessor {
    SameAccount(SameAccountTableProcessor),
    CrossAccount(CrossAccountTableProcessor),
}

impl TableProcessor {
    /// Resolve the source catalog and pick the processor for the resulting topology.
    ///
    /// Fails with [`SharingError::ProcessorConstruction`] when the catalog lookup fails
    /// or the share needs cross-account sharing while it is disabled.
    pub async fn create(
        database: &Database,
        clients: &CloudClients,
        capabilities: ShareCapabilities,
        data: &ShareData,
        shared_tables: Vec<DatasetTable>,
        revoked_tables: Vec<DatasetTable>,
    ) -> SharingResult<Self> {
        let catalog =
            resolve_source_catalog(clients.glue.as_ref(), &data.dataset, &data.source_environment)
                .await
                .map_err(|e| {
                    SharingError::ProcessorConstruction(format!(
                        "cannot resolve catalog of {}: {e}",
                        data.dataset.glue_database_name
                    ))
                })?;

        let topology = select_topology(
            &catalog.account_id,
            &data.target_environment.aws_account_id,
        );
        if topology == SharingTopology::CrossAccount {
            capabilities
                .require_cross_account_sharing()
                .map_err(|e| SharingError::ProcessorConstruction(e.to_string()))?;
        }

        let retained_account_grants = if topology == SharingTopology::CrossAccount {
            let mut conn = database.connection().await?;
            let mut retained = HashSet::new();
            for table in &revoked_tables {
                if ShareObjectRepository::is_item_shared_with_account(
                    &mut conn,
                    &table.table_uri,
                    &data.share.share_uri,
                    &data.target_environment.aws_account_id,
                )
                .await?
                {
                    retained.insert(table.table_uri.clone());
                }
            }
            retained
        } else {
            HashSet::new()
        };

        let ctx = LfShareContext {
            database: database.clone(),
            clients: clients.clone(),
            share: data.share.clone(),
            dataset: data.dataset.clone(),
            source_environment: data.source_environment.clone(),
            target_environment: data.target_environment.clone(),
            env_group: data.env_group.clone(),
            catalog,
            shared_tables,
            revoked_tables,
        };

        log::debug!(
            "Using {topology:?} table processor for share {}",
            ctx.share.share_uri
        );
        Ok(match topology {
            SharingTopology::SameAccount => {
                TableProcessor::SameAccount(SameAccountTableProcessor { ctx })
            }
            SharingTopology::CrossAccount => TableProcessor::CrossAccount(
                CrossAccountTableProcessor {
                    ctx,
                    retained_account_grants,
                },
            ),
        })
    }

    pub fn topology(&self) -> SharingTopology {
        match self {
            TableProcessor::SameAccount(_) => SharingTopology::SameAccount,
            TableProcessor::CrossAccount(_) => SharingTopology::CrossAccount,
        }
    }

    fn inner(&self) -> &dyn LfTableSharing {
        match self {
            TableProcessor::SameAccount(p) => p,
            TableProcessor::CrossAccount(p) => p,
        }
    }

    pub fn context(&self) -> &LfShareContext {
        self.inner().context()
    }

    pub async fn process_approved_shares(&self) -> SharingResult<BatchReport> {
        self.inner().process_approved_shares().await
    }

    pub async fn process_revoked_shares(&self) -> SharingResult<BatchReport> {
        self.inner().process_revoked_shares().await
    }

    pub async fn delete_shared_database(&self) -> bool {
        self.inner().delete_shared_database().await
    }
}
