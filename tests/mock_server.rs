//! End-to-end tests: the mock backend served over HTTP, driven through
//! `HttpTransport` and `UserClient`.

use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::oneshot;

use userdesk::cache::QueryCache;
use userdesk::client::{ApiError, UserClient};
use userdesk::mock::{MockBackend, server};
use userdesk::models::{CreateUser, Role, SearchParams, Status, UpdateUser};
use userdesk::transport::http::HttpTransport;
use userdesk::transport::{ApiRequest, Transport};

struct Running {
    base_url: String,
    backend: Arc<MockBackend>,
    stop: Option<oneshot::Sender<()>>,
    handle: tokio::task::JoinHandle<std::io::Result<()>>,
}

impl Running {
    async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let backend = Arc::new(MockBackend::new());
        let (stop, stopped) = oneshot::channel::<()>();
        let handle = tokio::spawn(server::serve_on(listener, backend.clone(), async {
            let _ = stopped.await;
        }));
        Self {
            base_url: format!("http://{addr}"),
            backend,
            stop: Some(stop),
            handle,
        }
    }

    fn transport(&self) -> HttpTransport {
        HttpTransport::new(&self.base_url, Duration::from_secs(5)).unwrap()
    }

    fn client(&self) -> UserClient {
        UserClient::new(Arc::new(self.transport()), Arc::new(QueryCache::default()))
    }

    async fn shutdown(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        self.handle.await.unwrap().unwrap();
    }
}

#[tokio::test]
async fn crud_round_trip_over_http() {
    let server = Running::start().await;
    let client = server.client();

    let list = client.list(&SearchParams::default()).await.unwrap();
    assert_eq!(list.total, 5);

    let created = client
        .create(&CreateUser {
            name: "Eve Adams".into(),
            email: "eve@example.com".into(),
            role: Role::User,
            status: Status::Active,
            avatar: Some("https://example.com/eve.png".into()),
            password: "correct-horse".into(),
        })
        .await
        .unwrap();
    assert_eq!(server.backend.len(), 6);

    let updated = client
        .update(
            &created.id,
            &UpdateUser {
                role: Some(Role::Admin),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.role, Role::Admin);

    client.delete(&created.id).await.unwrap();
    assert_eq!(client.list(&SearchParams::default()).await.unwrap().total, 5);

    server.shutdown().await;
}

#[tokio::test]
async fn query_parameters_reach_the_backend() {
    let server = Running::start().await;
    let client = server.client();

    let params = SearchParams {
        limit: 2,
        page: 2,
        search: Some("example.com".into()),
        ..Default::default()
    };
    let list = client.list(&params).await.unwrap();
    assert_eq!(list.total, 5);
    assert_eq!(list.page, 2);
    let ids: Vec<&str> = list.users.iter().map(|u| u.id.as_str()).collect();
    assert_eq!(ids, ["3", "4"]);

    server.shutdown().await;
}

#[tokio::test]
async fn missing_user_maps_to_not_found() {
    let server = Running::start().await;
    let client = server.client();

    assert_eq!(
        client.get("999").await.unwrap_err(),
        ApiError::NotFound { id: "999".into() }
    );
    assert!(matches!(
        client.delete("999").await,
        Err(ApiError::NotFound { .. })
    ));

    server.shutdown().await;
}

#[tokio::test]
async fn invalid_body_is_rejected_with_422() {
    let server = Running::start().await;
    let transport = server.transport();

    let response = transport
        .send(ApiRequest::post(
            "/users",
            serde_json::json!({ "name": "X", "email": "nope" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status, 422);
    assert!(response.body.contains("email"));

    server.shutdown().await;
}

#[tokio::test]
async fn unknown_route_is_404() {
    let server = Running::start().await;
    let response = server
        .transport()
        .send(ApiRequest::get("/nothing-here"))
        .await
        .unwrap();
    assert_eq!(response.status, 404);

    server.shutdown().await;
}

#[tokio::test]
async fn health_endpoint_reports_ok() {
    let server = Running::start().await;
    let report = server.client().health().await.unwrap();
    assert!(report.is_healthy());
    server.shutdown().await;
}
