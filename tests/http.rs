mod common;

use std::sync::Arc;
use std::time::Duration;

use common::name_fields;
use restable::conf::RemoteConfig;
use restable::controller::{ResourceTableController, ViewState};
use restable::core::{ErrorKind, SyncError};
use restable::query::{QueryState, SortDirection};
use restable::remote::{HttpRemote, Remote};
use restable::testutil::{MemoryCollection, MemoryRemote, fields, serve};
use serde_json::json;

async fn setup_http(rows: usize) -> (Arc<MemoryRemote>, HttpRemote) {
    let backend = Arc::new(
        MemoryRemote::new()
            .with_collection("clients", MemoryCollection::named(rows))
            .with_collection(
                "users",
                MemoryCollection::new().with_unique_field("email"),
            ),
    );
    let addr = serve(backend.clone()).await.unwrap();
    let remote = HttpRemote::new(&RemoteConfig {
        base_url: format!("http://{addr}"),
        timeout: Duration::from_secs(5),
    })
    .unwrap();
    (backend, remote)
}

#[tokio::test]
async fn test_list_over_http() {
    let (_backend, remote) = setup_http(25).await;

    let page = remote
        .list("clients", &QueryState::new(10).with_page(3))
        .await
        .unwrap();
    assert_eq!(page.total, 25);
    assert_eq!(page.page, 3);
    assert_eq!(page.page_size, 10);
    assert_eq!(page.records.len(), 5);
    assert_eq!(page.records[0].id, 21);

    let query = QueryState::new(5)
        .with_search("client 1")
        .with_sort("name", SortDirection::Desc);
    let page = remote.list("clients", &query).await.unwrap();
    assert_eq!(page.total, 11);
    assert_eq!(page.records[0].get("name"), Some(&json!("Client 19")));
}

#[tokio::test]
async fn test_mutations_over_http() {
    let (backend, remote) = setup_http(3).await;

    let created = remote.create("clients", &name_fields("Acme")).await.unwrap();
    assert_eq!(created.id, 4);
    assert_eq!(created.get("name"), Some(&json!("Acme")));

    let updated = remote
        .update("clients", 2, &name_fields("Renamed"))
        .await
        .unwrap();
    assert_eq!(updated.id, 2);
    assert_eq!(updated.get("name"), Some(&json!("Renamed")));

    remote.delete("clients", 1).await.unwrap();
    assert_eq!(backend.collection("clients").unwrap().len(), 3);

    let err = remote.delete("clients", 1).await.unwrap_err();
    assert_eq!(err, SyncError::NotFound("Record 1 not found".into()));
}

#[tokio::test]
async fn test_error_statuses_map_to_kinds() {
    let (backend, remote) = setup_http(1).await;

    let mut bad = name_fields("Bad");
    bad.insert("id".to_string(), json!(1));
    match remote.create("clients", &bad).await.unwrap_err() {
        SyncError::Validation { message, fields } => {
            assert_eq!(message, "Validation failed");
            assert_eq!(fields["id"], vec!["is assigned by the server".to_string()]);
        }
        other => panic!("expected validation error, got {other:?}"),
    }

    let email = fields(&[("email", json!("a@x.io"))]);
    remote.create("users", &email).await.unwrap();
    let err = remote.create("users", &email).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    let err = remote.update("clients", 99, &name_fields("X")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    backend.fail_next(SyncError::Server {
        status: Some(503),
        message: "Database unavailable".into(),
    });
    let err = remote.list("clients", &QueryState::default()).await.unwrap_err();
    assert_eq!(
        err,
        SyncError::Server {
            status: Some(503),
            message: "Database unavailable".into(),
        }
    );

    backend.fail_next(SyncError::Parse("truncated".into()));
    let err = remote.list("clients", &QueryState::default()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Parse);
}

#[tokio::test]
async fn test_unreachable_server_is_network_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let remote = HttpRemote::new(&RemoteConfig {
        base_url: format!("http://{addr}/api"),
        timeout: Duration::from_secs(2),
    })
    .unwrap();
    let err = remote.list("clients", &QueryState::default()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Network);
}

#[tokio::test]
async fn test_controller_over_http() {
    let (_backend, remote) = setup_http(21).await;
    let controller = ResourceTableController::new(Arc::new(remote), "clients", QueryState::new(10));

    controller.load().await.unwrap();
    controller.change_page(3).await.unwrap();
    assert_eq!(controller.total(), Some(21));

    controller.delete(21).await.unwrap();
    assert_eq!(controller.query().page(), 2);
    assert_eq!(controller.total(), Some(20));
    assert_eq!(controller.page().unwrap().records.len(), 10);

    controller.change_filter("search", "Client 1").await.unwrap();
    assert_eq!(controller.query().page(), 1);
    assert_eq!(controller.total(), Some(11));
    assert!(matches!(controller.view(), ViewState::Ready(_)));
}
