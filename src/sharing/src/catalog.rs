//! Works out which account really owns a dataset's catalog database.

use common::model::{Dataset, Environment};

use crate::cloud::{CatalogDetails, CloudResult, GlueClient};

/// Account topology of a table share.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SharingTopology {
    SameAccount,
    CrossAccount,
}

/// Catalog coordinates the table processors grant against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCatalog {
    pub account_id: String,
    pub region: String,
    pub database: String,
    /// Present when the dataset database is a link into another catalog
    pub details: Option<CatalogDetails>,
}

impl ResolvedCatalog {
    pub fn from_details(
        details: Option<CatalogDetails>,
        dataset: &Dataset,
        source_environment: &Environment,
    ) -> Self {
        match details {
            Some(details) => Self {
                account_id: details.account_id.clone(),
                region: details.region.clone(),
                database: details.database.clone(),
                details: Some(details),
            },
            None => Self {
                account_id: source_environment.aws_account_id.clone(),
                region: source_environment.region.clone(),
                database: dataset.glue_database_name.clone(),
                details: None,
            },
        }
    }

    pub fn is_redirected(&self) -> bool {
        self.details.is_some()
    }
}

/// Choose same- or cross-account sharing from the resolved owner and the consumer account.
pub fn select_topology(source_account_id: &str, target_account_id: &str) -> SharingTopology {
    if source_account_id == target_account_id {
        SharingTopology::SameAccount
    } else {
        SharingTopology::CrossAccount
    }
}

/// Ask the catalog whether the dataset database is redirected to another account.
pub async fn resolve_source_catalog(
    glue: &dyn GlueClient,
    dataset: &Dataset,
    source_environment: &Environment,
) -> CloudResult<ResolvedCatalog> {
    let details = glue
        .get_source_catalog(
            &source_environment.aws_account_id,
            &source_environment.region,
            &dataset.glue_database_name,
        )
        .await?;

    if let Some(details) = &details {
        log::info!(
            "Database {} of dataset {} links to catalog {} in {}",
            dataset.glue_database_name,
            dataset.dataset_uri,
            details.account_id,
            details.region
        );
    }

    Ok(ResolvedCatalog::from_details(
        details,
        dataset,
        source_environment,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloud::{CloudError, MockGlueClient};

    fn dataset() -> Dataset {
        Dataset {
            dataset_uri: "dataset-sales".to_string(),
            label: "sales".to_string(),
            environment_uri: "env-source".to_string(),
            admin_group: "admins".to_string(),
            aws_account_id: "111111111111".to_string(),
            region: "eu-west-1".to_string(),
            glue_database_name: "sales_db".to_string(),
            s3_bucket_name: "sales-bucket".to_string(),
            kms_alias: None,
        }
    }

    fn environment() -> Environment {
        Environment {
            environment_uri: "env-source".to_string(),
            label: "source".to_string(),
            aws_account_id: "111111111111".to_string(),
            region: "eu-west-1".to_string(),
        }
    }

    #[test]
    fn test_select_topology() {
        assert_eq!(
            select_topology("111111111111", "111111111111"),
            SharingTopology::SameAccount
        );
        assert_eq!(
            select_topology("111111111111", "222222222222"),
            SharingTopology::CrossAccount
        );
    }

    #[tokio::test]
    async fn test_no_redirection_uses_source_environment() {
        let mut glue = MockGlueClient::new();
        glue.expect_get_source_catalog()
            .withf(|account, region, database| {
                account == "111111111111" && region == "eu-west-1" && database == "sales_db"
            })
            .times(1)
            .returning(|_, _, _| Ok(None));

        let resolved = resolve_source_catalog(&glue, &dataset(), &environment())
            .await
            .unwrap();

        assert!(!resolved.is_redirected());
        assert_eq!(resolved.account_id, "111111111111");
        assert_eq!(resolved.database, "sales_db");
    }

    #[tokio::test]
    async fn test_redirection_overrides_owner() {
        let mut glue = MockGlueClient::new();
        glue.expect_get_source_catalog().returning(|_, _, _| {
            Ok(Some(CatalogDetails {
                account_id: "333333333333".to_string(),
                database: "central_sales".to_string(),
                region: "us-east-1".to_string(),
            }))
        });

        let resolved = resolve_source_catalog(&glue, &dataset(), &environment())
            .await
            .unwrap();

        assert!(resolved.is_redirected());
        assert_eq!(resolved.account_id, "333333333333");
        assert_eq!(resolved.region, "us-east-1");
        assert_eq!(resolved.database, "central_sales");
        // A consumer in the dataset's home account is now cross-account
        assert_eq!(
            select_topology(&resolved.account_id, "111111111111"),
            SharingTopology::CrossAccount
        );
    }

    #[tokio::test]
    async fn test_lookup_error_is_propagated() {
        let mut glue = MockGlueClient::new();
        glue.expect_get_source_catalog()
            .returning(|_, _, _| Err(CloudError::AccessDenied("glue:GetDatabase".to_string())));

        let err = resolve_source_catalog(&glue, &dataset(), &environment())
            .await
            .unwrap_err();
        assert_eq!(err, CloudError::AccessDenied("glue:GetDatabase".to_string()));
    }
}
