//! Persistence for share objects, share items and the metadata they reference.
//!
//! Every function takes an open connection so the caller decides the unit of
//! work: pass a transaction from [`crate::database::Database::scoped_session`]
//! to group statements, or a pooled connection for autocommitted writes.

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, query};
use uuid::Uuid;

use crate::model::{
    Dataset, DatasetStorageLocation, DatasetTable, Environment, EnvironmentGroup, ShareItem,
    ShareItemStatus, ShareObject, ShareObjectStatus, ShareableType, UnknownVariant,
};

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("{kind} '{id}' not found")]
    NotFound { kind: &'static str, id: String },
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Corrupt row: {0}")]
    Decode(String),
}

impl From<UnknownVariant> for RepositoryError {
    fn from(e: UnknownVariant) -> Self {
        RepositoryError::Decode(e.to_string())
    }
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Everything the sharing workflow reads about one share object.
#[derive(Debug, Clone)]
pub struct ShareData {
    /// Dataset owners in the source environment
    pub source_env_group: EnvironmentGroup,
    /// Consumers in the target environment
    pub env_group: EnvironmentGroup,
    pub dataset: Dataset,
    pub share: ShareObject,
    pub source_environment: Environment,
    pub target_environment: Environment,
}

/// Dataset sub-resources of a share in one item status, split by type.
#[derive(Debug, Clone, Default)]
pub struct ShareDataItems {
    pub tables: Vec<DatasetTable>,
    pub folders: Vec<DatasetStorageLocation>,
}

pub struct ShareObjectRepository;

impl ShareObjectRepository {
    pub async fn get_share_by_uri(
        conn: &mut SqliteConnection,
        share_uri: &str,
    ) -> RepositoryResult<ShareObject> {
        let row = query(
            r#"
            SELECT share_uri, dataset_uri, environment_uri, group_uri, owner, status, created, updated
            FROM share_objects WHERE share_uri = ?
            "#,
        )
        .bind(share_uri)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| not_found("share object", share_uri))?;

        share_from_row(&row)
    }

    /// Load the share together with its dataset, both environments and both groups.
    pub async fn get_share_data(
        conn: &mut SqliteConnection,
        share_uri: &str,
    ) -> RepositoryResult<ShareData> {
        let share = Self::get_share_by_uri(conn, share_uri).await?;
        let dataset = Self::get_dataset(conn, &share.dataset_uri).await?;
        let source_environment = Self::get_environment(conn, &dataset.environment_uri).await?;
        let target_environment = Self::get_environment(conn, &share.environment_uri).await?;
        let source_env_group =
            Self::get_environment_group(conn, &dataset.admin_group, &dataset.environment_uri)
                .await?;
        let env_group =
            Self::get_environment_group(conn, &share.group_uri, &share.environment_uri).await?;

        Ok(ShareData {
            source_env_group,
            env_group,
            dataset,
            share,
            source_environment,
            target_environment,
        })
    }

    /// Tables and folders of the share whose item is in `status`, in the order they were added.
    pub async fn get_share_data_items(
        conn: &mut SqliteConnection,
        share_uri: &str,
        status: ShareItemStatus,
    ) -> RepositoryResult<ShareDataItems> {
        let share = Self::get_share_by_uri(conn, share_uri).await?;

        let rows = query(
            r#"
            SELECT t.table_uri, t.dataset_uri, t.glue_database_name, t.glue_table_name, t.s3_prefix
            FROM dataset_tables t
            JOIN share_object_items i ON i.item_uri = t.table_uri
            WHERE i.share_uri = ? AND i.item_type = ? AND i.status = ? AND t.dataset_uri = ?
            ORDER BY i.rowid
            "#,
        )
        .bind(&share.share_uri)
        .bind(ShareableType::Table.as_str())
        .bind(status.as_str())
        .bind(&share.dataset_uri)
        .fetch_all(&mut *conn)
        .await?;
        let tables = rows.iter().map(table_from_row).collect();

        let rows = query(
            r#"
            SELECT l.location_uri, l.dataset_uri, l.label, l.s3_prefix
            FROM dataset_storage_locations l
            JOIN share_object_items i ON i.item_uri = l.location_uri
            WHERE i.share_uri = ? AND i.item_type = ? AND i.status = ? AND l.dataset_uri = ?
            ORDER BY i.rowid
            "#,
        )
        .bind(&share.share_uri)
        .bind(ShareableType::StorageLocation.as_str())
        .bind(status.as_str())
        .bind(&share.dataset_uri)
        .fetch_all(&mut *conn)
        .await?;
        let folders = rows.iter().map(location_from_row).collect();

        Ok(ShareDataItems { tables, folders })
    }

    /// Whether any item of `item_type` still grants (or is about to grant) access.
    pub async fn check_existing_shared_items_of_type(
        conn: &mut SqliteConnection,
        share_uri: &str,
        item_type: ShareableType,
    ) -> RepositoryResult<bool> {
        let count =
            count_items_in(conn, share_uri, Some(item_type), ShareItemStatus::STILL_SHARED).await?;
        Ok(count > 0)
    }

    /// Whether any item of the share still waits for approval.
    pub async fn check_pending_share_items(
        conn: &mut SqliteConnection,
        share_uri: &str,
    ) -> RepositoryResult<bool> {
        let count = count_items_in(conn, share_uri, None, ShareItemStatus::PENDING).await?;
        Ok(count > 0)
    }

    pub async fn find_sharable_item(
        conn: &mut SqliteConnection,
        share_uri: &str,
        item_uri: &str,
    ) -> RepositoryResult<Option<ShareItem>> {
        let row = query(
            r#"
            SELECT share_item_uri, share_uri, item_type, item_uri, item_name, status, created, updated
            FROM share_object_items WHERE share_uri = ? AND item_uri = ?
            "#,
        )
        .bind(share_uri)
        .bind(item_uri)
        .fetch_optional(&mut *conn)
        .await?;

        row.as_ref().map(item_from_row).transpose()
    }

    pub async fn list_share_items(
        conn: &mut SqliteConnection,
        share_uri: &str,
    ) -> RepositoryResult<Vec<ShareItem>> {
        let rows = query(
            r#"
            SELECT share_item_uri, share_uri, item_type, item_uri, item_name, status, created, updated
            FROM share_object_items WHERE share_uri = ?
            ORDER BY rowid
            "#,
        )
        .bind(share_uri)
        .fetch_all(&mut *conn)
        .await?;

        rows.iter().map(item_from_row).collect()
    }

    pub async fn update_share_status(
        conn: &mut SqliteConnection,
        share_uri: &str,
        status: ShareObjectStatus,
        updated: DateTime<Utc>,
    ) -> RepositoryResult<()> {
        let result = query("UPDATE share_objects SET status = ?, updated = ? WHERE share_uri = ?")
            .bind(status.as_str())
            .bind(updated.to_rfc3339())
            .bind(share_uri)
            .execute(&mut *conn)
            .await?;
        if result.rows_affected() == 0 {
            return Err(not_found("share object", share_uri));
        }
        Ok(())
    }

    pub async fn update_share_item_status(
        conn: &mut SqliteConnection,
        share_item_uri: &str,
        status: ShareItemStatus,
        updated: DateTime<Utc>,
    ) -> RepositoryResult<()> {
        let result = query(
            "UPDATE share_object_items SET status = ?, updated = ? WHERE share_item_uri = ?",
        )
        .bind(status.as_str())
        .bind(updated.to_rfc3339())
        .bind(share_item_uri)
        .execute(&mut *conn)
        .await?;
        if result.rows_affected() == 0 {
            return Err(not_found("share item", share_item_uri));
        }
        Ok(())
    }

    /// Move every item of the share currently in `from` to `to`. Returns the number of items moved.
    pub async fn update_share_items_status(
        conn: &mut SqliteConnection,
        share_uri: &str,
        from: ShareItemStatus,
        to: ShareItemStatus,
    ) -> RepositoryResult<u64> {
        let result = query(
            "UPDATE share_object_items SET status = ?, updated = ? WHERE share_uri = ? AND status = ?",
        )
        .bind(to.as_str())
        .bind(Utc::now().to_rfc3339())
        .bind(share_uri)
        .bind(from.as_str())
        .execute(&mut *conn)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn get_dataset(
        conn: &mut SqliteConnection,
        dataset_uri: &str,
    ) -> RepositoryResult<Dataset> {
        let row = query(
            r#"
            SELECT dataset_uri, label, environment_uri, admin_group, aws_account_id, region,
                   glue_database_name, s3_bucket_name, kms_alias
            FROM datasets WHERE dataset_uri = ?
            "#,
        )
        .bind(dataset_uri)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| not_found("dataset", dataset_uri))?;

        Ok(Dataset {
            dataset_uri: row.get("dataset_uri"),
            label: row.get("label"),
            environment_uri: row.get("environment_uri"),
            admin_group: row.get("admin_group"),
            aws_account_id: row.get("aws_account_id"),
            region: row.get("region"),
            glue_database_name: row.get("glue_database_name"),
            s3_bucket_name: row.get("s3_bucket_name"),
            kms_alias: row.get("kms_alias"),
        })
    }

    pub async fn get_environment(
        conn: &mut SqliteConnection,
        environment_uri: &str,
    ) -> RepositoryResult<Environment> {
        let row = query(
            "SELECT environment_uri, label, aws_account_id, region FROM environments WHERE environment_uri = ?",
        )
        .bind(environment_uri)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| not_found("environment", environment_uri))?;

        Ok(Environment {
            environment_uri: row.get("environment_uri"),
            label: row.get("label"),
            aws_account_id: row.get("aws_account_id"),
            region: row.get("region"),
        })
    }

    pub async fn get_environment_group(
        conn: &mut SqliteConnection,
        group_uri: &str,
        environment_uri: &str,
    ) -> RepositoryResult<EnvironmentGroup> {
        let row = query(
            r#"
            SELECT group_uri, environment_uri, environment_iam_role_arn, environment_iam_role_name
            FROM environment_groups WHERE group_uri = ? AND environment_uri = ?
            "#,
        )
        .bind(group_uri)
        .bind(environment_uri)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| not_found("environment group", format!("{group_uri}@{environment_uri}")))?;

        Ok(EnvironmentGroup {
            group_uri: row.get("group_uri"),
            environment_uri: row.get("environment_uri"),
            environment_iam_role_arn: row.get("environment_iam_role_arn"),
            environment_iam_role_name: row.get("environment_iam_role_name"),
        })
    }

    pub async fn create_environment(
        conn: &mut SqliteConnection,
        environment: &Environment,
    ) -> RepositoryResult<()> {
        query(
            "INSERT INTO environments (environment_uri, label, aws_account_id, region) VALUES (?, ?, ?, ?)",
        )
        .bind(&environment.environment_uri)
        .bind(&environment.label)
        .bind(&environment.aws_account_id)
        .bind(&environment.region)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    pub async fn create_environment_group(
        conn: &mut SqliteConnection,
        group: &EnvironmentGroup,
    ) -> RepositoryResult<()> {
        query(
            r#"
            INSERT INTO environment_groups
                (group_uri, environment_uri, environment_iam_role_arn, environment_iam_role_name)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&group.group_uri)
        .bind(&group.environment_uri)
        .bind(&group.environment_iam_role_arn)
        .bind(&group.environment_iam_role_name)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    pub async fn create_dataset(
        conn: &mut SqliteConnection,
        dataset: &Dataset,
    ) -> RepositoryResult<()> {
        query(
            r#"
            INSERT INTO datasets
                (dataset_uri, label, environment_uri, admin_group, aws_account_id, region,
                 glue_database_name, s3_bucket_name, kms_alias)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&dataset.dataset_uri)
        .bind(&dataset.label)
        .bind(&dataset.environment_uri)
        .bind(&dataset.admin_group)
        .bind(&dataset.aws_account_id)
        .bind(&dataset.region)
        .bind(&dataset.glue_database_name)
        .bind(&dataset.s3_bucket_name)
        .bind(&dataset.kms_alias)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    pub async fn create_dataset_table(
        conn: &mut SqliteConnection,
        table: &DatasetTable,
    ) -> RepositoryResult<()> {
        query(
            r#"
            INSERT INTO dataset_tables
                (table_uri, dataset_uri, glue_database_name, glue_table_name, s3_prefix)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&table.table_uri)
        .bind(&table.dataset_uri)
        .bind(&table.glue_database_name)
        .bind(&table.glue_table_name)
        .bind(&table.s3_prefix)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    pub async fn create_storage_location(
        conn: &mut SqliteConnection,
        location: &DatasetStorageLocation,
    ) -> RepositoryResult<()> {
        query(
            r#"
            INSERT INTO dataset_storage_locations (location_uri, dataset_uri, label, s3_prefix)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&location.location_uri)
        .bind(&location.dataset_uri)
        .bind(&location.label)
        .bind(&location.s3_prefix)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    pub async fn create_share_object(
        conn: &mut SqliteConnection,
        share: &ShareObject,
    ) -> RepositoryResult<()> {
        query(
            r#"
            INSERT INTO share_objects
                (share_uri, dataset_uri, environment_uri, group_uri, owner, status, created, updated)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&share.share_uri)
        .bind(&share.dataset_uri)
        .bind(&share.environment_uri)
        .bind(&share.group_uri)
        .bind(&share.owner)
        .bind(share.status.as_str())
        .bind(share.created.to_rfc3339())
        .bind(share.updated.to_rfc3339())
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    /// Attach a table or folder to a share in the given initial status.
    pub async fn add_share_item(
        conn: &mut SqliteConnection,
        share_uri: &str,
        item_type: ShareableType,
        item_uri: &str,
        item_name: &str,
        status: ShareItemStatus,
    ) -> RepositoryResult<ShareItem> {
        let now = Utc::now();
        let item = ShareItem {
            share_item_uri: Uuid::new_v4().to_string(),
            share_uri: share_uri.to_string(),
            item_type,
            item_uri: item_uri.to_string(),
            item_name: item_name.to_string(),
            status,
            created: now,
            updated: now,
        };

        query(
            r#"
            INSERT INTO share_object_items
                (share_item_uri, share_uri, item_type, item_uri, item_name, status, created, updated)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&item.share_item_uri)
        .bind(&item.share_uri)
        .bind(item.item_type.as_str())
        .bind(&item.item_uri)
        .bind(&item.item_name)
        .bind(item.status.as_str())
        .bind(item.created.to_rfc3339())
        .bind(item.updated.to_rfc3339())
        .execute(&mut *conn)
        .await?;

        Ok(item)
    }

    /// Whether another share still grants `item_uri` to some group of `target_account_id`.
    pub async fn is_item_shared_with_account(
        conn: &mut SqliteConnection,
        item_uri: &str,
        excluding_share_uri: &str,
        target_account_id: &str,
    ) -> RepositoryResult<bool> {
        let statuses = ShareItemStatus::STILL_SHARED;
        let placeholders = vec!["?"; statuses.len()].join(", ");
        let sql = format!(
            r#"
            SELECT COUNT(*) AS n
            FROM share_object_items i
            JOIN share_objects s ON s.share_uri = i.share_uri
            JOIN environments e ON e.environment_uri = s.environment_uri
            WHERE i.item_uri = ? AND i.share_uri != ? AND e.aws_account_id = ?
              AND i.status IN ({placeholders})
            "#
        );

        let mut stmt = query(&sql)
            .bind(item_uri)
            .bind(excluding_share_uri)
            .bind(target_account_id);
        for status in statuses {
            stmt = stmt.bind(status.as_str());
        }

        let row = stmt.fetch_one(&mut *conn).await?;
        let count: i64 = row.get("n");
        Ok(count > 0)
    }
}

fn not_found(kind: &'static str, id: impl Into<String>) -> RepositoryError {
    RepositoryError::NotFound {
        kind,
        id: id.into(),
    }
}

async fn count_items_in(
    conn: &mut SqliteConnection,
    share_uri: &str,
    item_type: Option<ShareableType>,
    statuses: &[ShareItemStatus],
) -> RepositoryResult<i64> {
    let placeholders = vec!["?"; statuses.len()].join(", ");
    let type_filter = if item_type.is_some() {
        " AND item_type = ?"
    } else {
        ""
    };
    let sql = format!(
        "SELECT COUNT(*) AS n FROM share_object_items WHERE share_uri = ?{type_filter} AND status IN ({placeholders})"
    );

    let mut stmt = query(&sql).bind(share_uri);
    if let Some(item_type) = item_type {
        stmt = stmt.bind(item_type.as_str());
    }
    for status in statuses {
        stmt = stmt.bind(status.as_str());
    }

    let row = stmt.fetch_one(&mut *conn).await?;
    Ok(row.get("n"))
}

fn parse_timestamp(value: &str) -> RepositoryResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|_| RepositoryError::Decode(format!("invalid timestamp '{value}'")))
}

fn share_from_row(row: &SqliteRow) -> RepositoryResult<ShareObject> {
    let status: String = row.get("status");
    let created: String = row.get("created");
    let updated: String = row.get("updated");

    Ok(ShareObject {
        share_uri: row.get("share_uri"),
        dataset_uri: row.get("dataset_uri"),
        environment_uri: row.get("environment_uri"),
        group_uri: row.get("group_uri"),
        owner: row.get("owner"),
        status: status.parse()?,
        created: parse_timestamp(&created)?,
        updated: parse_timestamp(&updated)?,
    })
}

fn item_from_row(row: &SqliteRow) -> RepositoryResult<ShareItem> {
    let item_type: String = row.get("item_type");
    let status: String = row.get("status");
    let created: String = row.get("created");
    let updated: String = row.get("updated");

    Ok(ShareItem {
        share_item_uri: row.get("share_item_uri"),
        share_uri: row.get("share_uri"),
        item_type: item_type.parse()?,
        item_uri: row.get("item_uri"),
        item_name: row.get("item_name"),
        status: status.parse()?,
        created: parse_timestamp(&created)?,
        updated: parse_timestamp(&updated)?,
    })
}

fn table_from_row(row: &SqliteRow) -> DatasetTable {
    DatasetTable {
        table_uri: row.get("table_uri"),
        dataset_uri: row.get("dataset_uri"),
        glue_database_name: row.get("glue_database_name"),
        glue_table_name: row.get("glue_table_name"),
        s3_prefix: row.get("s3_prefix"),
    }
}

fn location_from_row(row: &SqliteRow) -> DatasetStorageLocation {
    DatasetStorageLocation {
        location_uri: row.get("location_uri"),
        dataset_uri: row.get("dataset_uri"),
        label: row.get("label"),
        s3_prefix: row.get("s3_prefix"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Database;
    use crate::testing::ShareFixture;

    #[tokio::test]
    async fn test_get_share_data_missing_share_is_not_found() {
        let database = Database::new_in_memory().await.unwrap();
        let mut conn = database.connection().await.unwrap();

        let err = ShareObjectRepository::get_share_data(&mut conn, "missing")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RepositoryError::NotFound { kind: "share object", ref id } if id == "missing"
        ));
    }

    #[tokio::test]
    async fn test_get_share_data_resolves_both_sides() {
        let database = Database::new_in_memory().await.unwrap();
        let fixture = ShareFixture::same_account()
            .with_share_status(ShareObjectStatus::Approved)
            .seed(&database)
            .await
            .unwrap();

        let mut conn = database.connection().await.unwrap();
        let data = ShareObjectRepository::get_share_data(&mut conn, &fixture.share_uri)
            .await
            .unwrap();

        assert_eq!(data.share.status, ShareObjectStatus::Approved);
        assert_eq!(data.dataset.dataset_uri, fixture.dataset_uri);
        assert_eq!(data.source_environment.environment_uri, fixture.source_environment_uri);
        assert_eq!(data.target_environment.environment_uri, fixture.target_environment_uri);
        assert_eq!(data.source_env_group.group_uri, "dataset-admins");
        assert_eq!(data.env_group.group_uri, "consumers");
    }

    #[tokio::test]
    async fn test_get_share_data_items_partitions_by_type_and_status() {
        let database = Database::new_in_memory().await.unwrap();
        let fixture = ShareFixture::same_account()
            .with_tables(&["orders", "customers"], ShareItemStatus::ShareApproved)
            .with_folders(&["raw"], ShareItemStatus::ShareApproved)
            .with_tables(&["returns"], ShareItemStatus::PendingApproval)
            .seed(&database)
            .await
            .unwrap();

        let mut conn = database.connection().await.unwrap();
        let items = ShareObjectRepository::get_share_data_items(
            &mut conn,
            &fixture.share_uri,
            ShareItemStatus::ShareApproved,
        )
        .await
        .unwrap();

        let tables: Vec<&str> = items
            .tables
            .iter()
            .map(|t| t.glue_table_name.as_str())
            .collect();
        assert_eq!(tables, vec!["orders", "customers"]);
        assert_eq!(items.folders.len(), 1);
        assert_eq!(items.folders[0].s3_prefix, "raw");
    }

    #[tokio::test]
    async fn test_shared_and_pending_checks() {
        let database = Database::new_in_memory().await.unwrap();
        let fixture = ShareFixture::same_account()
            .with_tables(&["orders"], ShareItemStatus::RevokeFailed)
            .with_folders(&["raw"], ShareItemStatus::RevokeSucceeded)
            .seed(&database)
            .await
            .unwrap();

        let mut conn = database.connection().await.unwrap();
        assert!(
            ShareObjectRepository::check_existing_shared_items_of_type(
                &mut conn,
                &fixture.share_uri,
                ShareableType::Table
            )
            .await
            .unwrap()
        );
        assert!(
            !ShareObjectRepository::check_existing_shared_items_of_type(
                &mut conn,
                &fixture.share_uri,
                ShareableType::StorageLocation
            )
            .await
            .unwrap()
        );
        assert!(
            !ShareObjectRepository::check_pending_share_items(&mut conn, &fixture.share_uri)
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_bulk_item_update_only_touches_matching_status() {
        let database = Database::new_in_memory().await.unwrap();
        let fixture = ShareFixture::same_account()
            .with_tables(&["orders", "customers"], ShareItemStatus::RevokeApproved)
            .with_tables(&["returns"], ShareItemStatus::ShareSucceeded)
            .seed(&database)
            .await
            .unwrap();

        let mut conn = database.connection().await.unwrap();
        let moved = ShareObjectRepository::update_share_items_status(
            &mut conn,
            &fixture.share_uri,
            ShareItemStatus::RevokeApproved,
            ShareItemStatus::RevokeInProgress,
        )
        .await
        .unwrap();
        assert_eq!(moved, 2);

        let returns = ShareObjectRepository::find_sharable_item(
            &mut conn,
            &fixture.share_uri,
            &fixture.table_uri("returns"),
        )
        .await
        .unwrap()
        .expect("returns item");
        assert_eq!(returns.status, ShareItemStatus::ShareSucceeded);
    }

    #[tokio::test]
    async fn test_find_sharable_item_absent() {
        let database = Database::new_in_memory().await.unwrap();
        let fixture = ShareFixture::same_account().seed(&database).await.unwrap();

        let mut conn = database.connection().await.unwrap();
        let item =
            ShareObjectRepository::find_sharable_item(&mut conn, &fixture.share_uri, "nope")
                .await
                .unwrap();
        assert!(item.is_none());
    }

    #[tokio::test]
    async fn test_uncommitted_session_is_rolled_back() {
        let database = Database::new_in_memory().await.unwrap();
        let fixture = ShareFixture::same_account()
            .with_share_status(ShareObjectStatus::Approved)
            .seed(&database)
            .await
            .unwrap();

        {
            let mut session = database.scoped_session().await.unwrap();
            ShareObjectRepository::update_share_status(
                &mut session,
                &fixture.share_uri,
                ShareObjectStatus::ShareInProgress,
                Utc::now(),
            )
            .await
            .unwrap();
            // dropped without commit
        }

        let mut conn = database.connection().await.unwrap();
        let share = ShareObjectRepository::get_share_by_uri(&mut conn, &fixture.share_uri)
            .await
            .unwrap();
        assert_eq!(share.status, ShareObjectStatus::Approved);
    }

    #[tokio::test]
    async fn test_item_shared_with_account_ignores_current_share() {
        let database = Database::new_in_memory().await.unwrap();
        let fixture = ShareFixture::cross_account()
            .with_tables(&["orders"], ShareItemStatus::ShareSucceeded)
            .seed(&database)
            .await
            .unwrap();
        let table_uri = fixture.table_uri("orders");

        let mut conn = database.connection().await.unwrap();
        let shared = ShareObjectRepository::is_item_shared_with_account(
            &mut conn,
            &table_uri,
            &fixture.share_uri,
            &fixture.target_account,
        )
        .await
        .unwrap();
        assert!(!shared);

        let now = Utc::now();
        let other = ShareObject {
            share_uri: "share-2".to_string(),
            dataset_uri: fixture.dataset_uri.clone(),
            environment_uri: fixture.target_environment_uri.clone(),
            group_uri: "consumers".to_string(),
            owner: "other@example.com".to_string(),
            status: ShareObjectStatus::Processed,
            created: now,
            updated: now,
        };
        ShareObjectRepository::create_share_object(&mut conn, &other)
            .await
            .unwrap();
        ShareObjectRepository::add_share_item(
            &mut conn,
            &other.share_uri,
            ShareableType::Table,
            &table_uri,
            "orders",
            ShareItemStatus::ShareSucceeded,
        )
        .await
        .unwrap();

        let shared = ShareObjectRepository::is_item_shared_with_account(
            &mut conn,
            &table_uri,
            &fixture.share_uri,
            &fixture.target_account,
        )
        .await
        .unwrap();
        assert!(shared);

        let shared = ShareObjectRepository::is_item_shared_with_account(
            &mut conn,
            &table_uri,
            &fixture.share_uri,
            "999999999999",
        )
        .await
        .unwrap();
        assert!(!shared);
    }
}
