mod support;

use common::Database;
use common::model::{ShareItemStatus, ShareObjectStatus};
use common::testing::{SOURCE_ACCOUNT, ShareFixture, TARGET_ACCOUNT, TestConfigBuilder};
use sharing::cloud::CatalogDetails;
use sharing::{ShareCapabilities, SharingError};
use support::{FakeCloud, item_statuses, service, share_status, status_of};

async fn approved_share(fixture: ShareFixture) -> (Database, String) {
    let database = Database::new_in_memory().await.unwrap();
    let seeded = fixture
        .with_share_status(ShareObjectStatus::Approved)
        .seed(&database)
        .await
        .unwrap();
    (database, seeded.share_uri)
}

#[tokio::test]
async fn test_approve_grants_every_item() {
    let (database, share_uri) = approved_share(
        ShareFixture::same_account()
            .with_tables(&["orders", "customers"], ShareItemStatus::ShareApproved)
            .with_folders(&["raw", "curated"], ShareItemStatus::ShareApproved),
    )
    .await;
    let cloud = FakeCloud::new();

    let ok = service(&database, &cloud, ShareCapabilities::default())
        .approve_share(&share_uri)
        .await
        .unwrap();

    assert!(ok);
    assert!(
        item_statuses(&database, &share_uri)
            .await
            .iter()
            .all(|(_, status)| *status == ShareItemStatus::ShareSucceeded)
    );
    assert_eq!(share_status(&database, &share_uri).await, ShareObjectStatus::Processed);
    assert_eq!(cloud.count("glue.create_database"), 1);
    assert_eq!(cloud.count("glue.create_resource_link"), 2);
    assert_eq!(cloud.count("s3.put_access_point_prefix"), 2);
    assert_eq!(cloud.count("ram.accept_invitations"), 0);
}

#[tokio::test]
async fn test_folder_failure_fails_approval_even_if_tables_succeed() {
    let (database, share_uri) = approved_share(
        ShareFixture::same_account()
            .with_tables(&["orders", "customers"], ShareItemStatus::ShareApproved)
            .with_folders(&["raw", "curated"], ShareItemStatus::ShareApproved),
    )
    .await;
    let cloud = FakeCloud::new();
    cloud.fail("s3.put_access_point_prefix", "raw");

    let ok = service(&database, &cloud, ShareCapabilities::default())
        .approve_share(&share_uri)
        .await
        .unwrap();

    assert!(!ok);
    assert_eq!(
        item_statuses(&database, &share_uri).await,
        vec![
            ("orders".to_string(), ShareItemStatus::ShareSucceeded),
            ("customers".to_string(), ShareItemStatus::ShareSucceeded),
            ("raw".to_string(), ShareItemStatus::ShareFailed),
            ("curated".to_string(), ShareItemStatus::ShareSucceeded),
        ]
    );
    assert_eq!(share_status(&database, &share_uri).await, ShareObjectStatus::Processed);
}

#[tokio::test]
async fn test_table_failure_is_isolated() {
    let (database, share_uri) = approved_share(
        ShareFixture::same_account()
            .with_tables(&["orders", "customers"], ShareItemStatus::ShareApproved),
    )
    .await;
    let cloud = FakeCloud::new();
    cloud.fail("glue.table_exists", "orders");

    let ok = service(&database, &cloud, ShareCapabilities::default())
        .approve_share(&share_uri)
        .await
        .unwrap();

    assert!(!ok);
    assert_eq!(
        status_of(&database, &share_uri, "orders").await,
        ShareItemStatus::ShareFailed
    );
    assert_eq!(
        status_of(&database, &share_uri, "customers").await,
        ShareItemStatus::ShareSucceeded
    );
    // Only the existing table got a link
    assert_eq!(cloud.count("glue.create_resource_link"), 1);
}

#[tokio::test]
async fn test_cross_account_approval_accepts_invitations() {
    let (database, share_uri) = approved_share(
        ShareFixture::cross_account()
            .with_tables(&["orders"], ShareItemStatus::ShareApproved),
    )
    .await;
    let cloud = FakeCloud::new();

    let ok = service(&database, &cloud, ShareCapabilities::default())
        .approve_share(&share_uri)
        .await
        .unwrap();

    assert!(ok);
    let calls = cloud.calls();
    assert!(calls.contains(&format!(
        "ram.accept_invitations {TARGET_ACCOUNT}/eu-west-1 from {SOURCE_ACCOUNT}"
    )));
    assert!(calls.iter().any(|call| call.starts_with("lf.grant")
        && call.ends_with(&format!("{SOURCE_ACCOUNT}:sales_db.orders {TARGET_ACCOUNT}"))));
}

#[tokio::test]
async fn test_redirected_catalog_is_granted_from_its_owner() {
    let (database, share_uri) = approved_share(
        ShareFixture::same_account()
            .with_tables(&["orders"], ShareItemStatus::ShareApproved),
    )
    .await;
    let cloud = FakeCloud::new();
    cloud.redirect_catalog(CatalogDetails {
        account_id: "333333333333".to_string(),
        database: "central_sales".to_string(),
        region: "eu-west-1".to_string(),
    });

    let ok = service(&database, &cloud, ShareCapabilities::default())
        .approve_share(&share_uri)
        .await
        .unwrap();

    assert!(ok);
    let calls = cloud.calls();
    assert!(calls.contains(&"glue.table_exists 333333333333:central_sales.orders".to_string()));
    assert!(calls.contains(&format!(
        "ram.accept_invitations {SOURCE_ACCOUNT}/eu-west-1 from 333333333333"
    )));
}

#[tokio::test]
async fn test_catalog_failure_fails_tables_but_finishes_share() {
    let (database, share_uri) = approved_share(
        ShareFixture::same_account()
            .with_tables(&["orders", "customers"], ShareItemStatus::ShareApproved)
            .with_folders(&["raw"], ShareItemStatus::ShareApproved),
    )
    .await;
    let cloud = FakeCloud::new();
    cloud.break_catalog();

    let ok = service(&database, &cloud, ShareCapabilities::default())
        .approve_share(&share_uri)
        .await
        .unwrap();

    assert!(!ok);
    assert_eq!(
        item_statuses(&database, &share_uri).await,
        vec![
            ("orders".to_string(), ShareItemStatus::ShareFailed),
            ("customers".to_string(), ShareItemStatus::ShareFailed),
            ("raw".to_string(), ShareItemStatus::ShareSucceeded),
        ]
    );
    assert_eq!(share_status(&database, &share_uri).await, ShareObjectStatus::Processed);
    assert_eq!(cloud.count("glue.create_database"), 0);
}

#[tokio::test]
async fn test_disabled_cross_account_sharing_fails_tables() {
    let (database, share_uri) = approved_share(
        ShareFixture::cross_account()
            .with_tables(&["orders"], ShareItemStatus::ShareApproved),
    )
    .await;
    let cloud = FakeCloud::new();
    let config = TestConfigBuilder::new()
        .in_memory()
        .without_cross_account_sharing()
        .build();
    let capabilities = ShareCapabilities::from(&config.sharing);

    let ok = service(&database, &cloud, capabilities)
        .approve_share(&share_uri)
        .await
        .unwrap();

    assert!(!ok);
    assert_eq!(
        status_of(&database, &share_uri, "orders").await,
        ShareItemStatus::ShareFailed
    );
    assert_eq!(cloud.count("lf.grant"), 0);
    assert_eq!(share_status(&database, &share_uri).await, ShareObjectStatus::Processed);
}

#[tokio::test]
async fn test_share_without_items_touches_no_cloud() {
    let (database, share_uri) = approved_share(ShareFixture::same_account()).await;
    let cloud = FakeCloud::new();

    let ok = service(&database, &cloud, ShareCapabilities::default())
        .approve_share(&share_uri)
        .await
        .unwrap();

    assert!(ok);
    assert!(cloud.calls().is_empty());
    assert_eq!(share_status(&database, &share_uri).await, ShareObjectStatus::Processed);
}

#[tokio::test]
async fn test_missing_share_is_not_found() {
    let database = Database::new_in_memory().await.unwrap();
    let cloud = FakeCloud::new();

    let err = service(&database, &cloud, ShareCapabilities::default())
        .approve_share("missing")
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        SharingError::NotFound { kind: "share object", ref id } if id == "missing"
    ));
}

#[tokio::test]
async fn test_unapproved_share_is_rejected_without_changes() {
    let database = Database::new_in_memory().await.unwrap();
    let share_uri = ShareFixture::same_account()
        .with_tables(&["orders"], ShareItemStatus::ShareApproved)
        .seed(&database)
        .await
        .unwrap()
        .share_uri;
    let cloud = FakeCloud::new();

    let err = service(&database, &cloud, ShareCapabilities::default())
        .approve_share(&share_uri)
        .await
        .unwrap_err();

    assert!(matches!(err, SharingError::InvalidTransition { .. }));
    assert_eq!(share_status(&database, &share_uri).await, ShareObjectStatus::Draft);
    assert_eq!(
        status_of(&database, &share_uri, "orders").await,
        ShareItemStatus::ShareApproved
    );
    assert!(cloud.calls().is_empty());
}
