//! API integration tests
//!
//! The first group runs against a throwaway local HTTP responder and checks
//! what the client puts on the wire. The `#[ignore]` group needs a running
//! backend at `BASE_URL` with the seeded demo accounts.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use rentkar_client::{
    api::{AuthApi, AuthClient, HttpClient, ItemsApi, ItemsClient, RequestsApi, RequestsClient},
    config::{ApiConfig, UploadConfig},
    error::ErrorKind,
    models::{
        item::{CreateItem, UpdateItem},
        ItemStatus, LoginRequest, RequestAction, RequestStatus, ResponsePayload, ViewRole,
    },
    services::{
        notifications::ChannelNotifier,
        session::{SessionService, SessionStore},
    },
    workflow::RequestsController,
};

const BASE_URL: &str = "http://localhost:8080/api";

/// Answer a single HTTP request with a canned response; yields the raw request
async fn respond_once(status: &str, headers: &[(&str, &str)], body: &str) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let mut response = format!("HTTP/1.1 {}\r\nConnection: close\r\n", status);
    if !status.starts_with("204") {
        response.push_str(&format!("Content-Length: {}\r\n", body.len()));
    }
    if !body.is_empty() {
        response.push_str("Content-Type: application/json\r\n");
    }
    for (name, value) in headers {
        response.push_str(&format!("{}: {}\r\n", name, value));
    }
    response.push_str("\r\n");
    response.push_str(body);

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut raw = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            raw.extend_from_slice(&buf[..n]);
            let text = String::from_utf8_lossy(&raw).to_string();
            if let Some(end) = text.find("\r\n\r\n") {
                let length = text[..end]
                    .lines()
                    .find_map(|l| {
                        let (name, value) = l.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if raw.len() >= end + 4 + length {
                    break;
                }
            }
        }
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.ok();
        String::from_utf8_lossy(&raw).to_string()
    });

    (format!("http://{}/api", addr), handle)
}

fn http(base_url: String, session: Arc<SessionStore>) -> HttpClient {
    let config = ApiConfig {
        base_url,
        timeout_secs: 5,
        ..Default::default()
    };
    HttpClient::new(&config, session).unwrap()
}

fn borrow_request_json(id: i64, status: &str) -> serde_json::Value {
    json!({
        "id": id,
        "item": {"id": 3, "title": "Ladder", "status": "AVAILABLE",
                 "owner": {"id": 2, "username": "lena", "fullName": "Lena Park"}},
        "borrower": {"id": 1, "username": "bob", "email": "bob@example.com", "fullName": "Bob Ray"},
        "lender": {"id": 2, "username": "lena", "email": "lena@example.com", "fullName": "Lena Park"},
        "status": status,
        "responseMessage": "ok",
        "borrowDate": "2025-06-01",
        "returnDate": "2025-06-04",
        "createdAt": "2025-05-20T08:15:30",
        "updatedAt": "2025-05-21T10:00:00"
    })
}

#[tokio::test]
async fn test_approve_sends_token_and_message() {
    let body = json!({"success": true, "message": "Request approved", "data": borrow_request_json(7, "APPROVED")});
    let (base_url, server) = respond_once("200 OK", &[], &body.to_string()).await;

    let session = Arc::new(SessionStore::in_memory());
    session.set_token("tok-abc".to_string());
    let client = RequestsClient::new(http(base_url, session));

    let approved = client
        .approve(7, &ResponsePayload::new(Some("ok".to_string())))
        .await
        .unwrap();
    assert_eq!(approved.status, RequestStatus::Approved);
    assert_eq!(approved.response_message.as_deref(), Some("ok"));

    let raw = server.await.unwrap();
    assert!(raw.starts_with("POST /api/requests/7/approve "));
    assert!(raw.to_lowercase().contains("authorization: bearer tok-abc"));
    assert!(raw.ends_with(r#"{"responseMessage":"ok"}"#));
}

#[tokio::test]
async fn test_list_sends_status_filter() {
    let body = json!([borrow_request_json(1, "RETURNED")]);
    let (base_url, server) = respond_once("200 OK", &[], &body.to_string()).await;
    let client = RequestsClient::new(http(base_url, Arc::new(SessionStore::in_memory())));

    let requests = client.list_received(Some(RequestStatus::Returned)).await.unwrap();
    assert_eq!(requests.len(), 1);

    let raw = server.await.unwrap();
    assert!(raw.starts_with("GET /api/requests/received?status=RETURNED "));
    assert!(!raw.to_lowercase().contains("authorization:"));
}

#[tokio::test]
async fn test_unauthorized_clears_session() {
    let (base_url, server) = respond_once("401 Unauthorized", &[], r#"{"message":"Token expired"}"#).await;

    let session = Arc::new(SessionStore::in_memory());
    session.set_token("stale".to_string());
    let client = RequestsClient::new(http(base_url, session.clone()));

    let err = client.statistics().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Authentication);
    assert_eq!(err.user_message(), "Token expired");
    assert_eq!(session.token(), None);
    server.await.unwrap();
}

#[tokio::test]
async fn test_rate_limit_reads_retry_after() {
    let (base_url, server) = respond_once(
        "429 Too Many Requests",
        &[("Retry-After", "42")],
        r#"{"message":"Slow down","retryAfter":10}"#,
    )
    .await;
    let client = RequestsClient::new(http(base_url, Arc::new(SessionStore::in_memory())));

    let err = client.get(1).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RateLimited);
    assert_eq!(err.retry_after(), Some(Duration::from_secs(42)));
    assert_eq!(err.user_message(), "Slow down");
    server.await.unwrap();
}

#[tokio::test]
async fn test_server_error_without_message_is_generic() {
    let (base_url, server) = respond_once("503 Service Unavailable", &[], "").await;
    let client = RequestsClient::new(http(base_url, Arc::new(SessionStore::in_memory())));

    let err = client.list_sent(None).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ServiceUnavailable);
    assert!(err.user_message().contains("temporarily unavailable"));
    server.await.unwrap();
}

#[tokio::test]
async fn test_cancel_accepts_no_content() {
    let (base_url, server) = respond_once("204 No Content", &[], "").await;
    let client = RequestsClient::new(http(base_url, Arc::new(SessionStore::in_memory())));

    client.cancel(42).await.unwrap();
    let raw = server.await.unwrap();
    assert!(raw.starts_with("DELETE /api/requests/42 "));
}

#[tokio::test]
async fn test_unreachable_backend_is_a_network_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = RequestsClient::new(http(format!("http://{}/api", addr), Arc::new(SessionStore::in_memory())));
    let err = client.statistics().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Network);
    assert!(err.is_transport());
}

fn items(base_url: String, session: Arc<SessionStore>) -> ItemsClient {
    ItemsClient::new(http(base_url, session), UploadConfig::default())
}

fn item_json(id: i64, title: &str, status: &str) -> serde_json::Value {
    json!({
        "id": id,
        "title": title,
        "category": "Tools",
        "status": status,
        "owner": {"id": 2, "username": "lena", "fullName": "Lena Park"},
        "createdAt": "2025-05-01T09:00:00"
    })
}

#[tokio::test]
async fn test_my_items_sends_paging() {
    let body = json!({
        "success": true,
        "data": {
            "items": [item_json(3, "Ladder", "AVAILABLE"), item_json(4, "Drill", "BORROWED")],
            "pagination": {"currentPage": 1, "totalPages": 3, "totalItems": 12, "pageSize": 5}
        }
    });
    let (base_url, server) = respond_once("200 OK", &[], &body.to_string()).await;

    let session = Arc::new(SessionStore::in_memory());
    session.set_token("tok-owner".to_string());
    let page = items(base_url, session).my_items(1, 5).await.unwrap();

    assert_eq!(page.items.len(), 2);
    assert_eq!(page.items[1].status, ItemStatus::Borrowed);
    assert_eq!(page.pagination.current_page, 1);
    assert!(page.pagination.has_next());

    let raw = server.await.unwrap();
    assert!(raw.starts_with("GET /api/items/my-items?page=1&size=5 "));
    assert!(raw.to_lowercase().contains("authorization: bearer tok-owner"));
}

#[tokio::test]
async fn test_create_item_is_validated_before_sending() {
    // Nothing listens here; a request that went out would fail as a network error
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = items(format!("http://{}/api", addr), Arc::new(SessionStore::in_memory()));
    let err = client
        .create(&CreateItem {
            title: "ab".to_string(),
            description: None,
            category: None,
            image_url: None,
        })
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(err.user_message(), "Title must be between 3 and 200 characters");
}

#[tokio::test]
async fn test_create_item_posts_payload() {
    let body = json!({"success": true, "data": item_json(11, "Camping tent", "AVAILABLE")});
    let (base_url, server) = respond_once("201 Created", &[], &body.to_string()).await;

    let created = items(base_url, Arc::new(SessionStore::in_memory()))
        .create(&CreateItem {
            title: "Camping tent".to_string(),
            description: None,
            category: Some("Tools".to_string()),
            image_url: None,
        })
        .await
        .unwrap();
    assert_eq!(created.id, 11);
    assert!(created.is_borrowable());

    let raw = server.await.unwrap();
    assert!(raw.starts_with("POST /api/items "));
    assert!(raw.ends_with(r#"{"title":"Camping tent","category":"Tools"}"#));
}

#[tokio::test]
async fn test_update_item_sends_only_changes() {
    let body = json!({"success": true, "data": item_json(4, "Drill", "UNAVAILABLE")});
    let (base_url, server) = respond_once("200 OK", &[], &body.to_string()).await;

    let changes = UpdateItem {
        status: Some(ItemStatus::Unavailable),
        ..Default::default()
    };
    let updated = items(base_url, Arc::new(SessionStore::in_memory()))
        .update(4, &changes)
        .await
        .unwrap();
    assert_eq!(updated.status, ItemStatus::Unavailable);

    let raw = server.await.unwrap();
    assert!(raw.starts_with("PUT /api/items/4 "));
    assert!(raw.ends_with(r#"{"status":"UNAVAILABLE"}"#));
}

#[tokio::test]
async fn test_delete_item_forbidden_keeps_server_message() {
    let (base_url, server) = respond_once(
        "403 Forbidden",
        &[],
        r#"{"success":false,"message":"You can only delete your own items"}"#,
    )
    .await;

    let err = items(base_url, Arc::new(SessionStore::in_memory()))
        .delete(4)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Authorization);
    assert_eq!(err.user_message(), "You can only delete your own items");

    let raw = server.await.unwrap();
    assert!(raw.starts_with("DELETE /api/items/4 "));
}

#[tokio::test]
async fn test_item_detail() {
    let body = json!({"success": true, "data": item_json(3, "Ladder", "BORROWED")});
    let (base_url, server) = respond_once("200 OK", &[], &body.to_string()).await;

    let item = items(base_url, Arc::new(SessionStore::in_memory())).get(3).await.unwrap();
    assert_eq!(item.title, "Ladder");
    assert!(!item.is_borrowable());
    assert_eq!(item.owner.full_name, "Lena Park");

    let raw = server.await.unwrap();
    assert!(raw.starts_with("GET /api/items/3 "));
}

#[tokio::test]
async fn test_spring_error_list_keeps_message() {
    let body = json!({
        "status": 400,
        "message": "Return date must be after borrow date",
        "errors": [{"field": "returnDate", "defaultMessage": "must be after borrow date"}]
    });
    let (base_url, server) = respond_once("400 Bad Request", &[], &body.to_string()).await;
    let client = RequestsClient::new(http(base_url, Arc::new(SessionStore::in_memory())));

    let err = client.get(5).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(err.user_message(), "Return date must be after borrow date");
    server.await.unwrap();
}

// ---------------------------------------------------------------------------
// Live backend
// ---------------------------------------------------------------------------

async fn live_session(username: &str) -> (Arc<SessionStore>, HttpClient) {
    let session = Arc::new(SessionStore::in_memory());
    let http = http(BASE_URL.to_string(), session.clone());
    let service = SessionService::new(session.clone(), Arc::new(AuthClient::new(http.clone())));
    service
        .login(LoginRequest {
            username: username.to_string(),
            password: "password123".to_string(),
        })
        .await
        .expect("Failed to log in");
    (session, http)
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn test_login_and_whoami() {
    let (session, http) = live_session("john").await;
    assert!(session.snapshot().is_authenticated());

    let me = AuthClient::new(http).current_user().await.unwrap();
    assert_eq!(me.username, "john");
}

#[tokio::test]
#[ignore]
async fn test_login_invalid_credentials() {
    let session = Arc::new(SessionStore::in_memory());
    let auth = AuthClient::new(http(BASE_URL.to_string(), session));

    let err = auth
        .login(&LoginRequest {
            username: "john".to_string(),
            password: "wrong".to_string(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::Authentication | ErrorKind::Validation));
}

#[tokio::test]
#[ignore]
async fn test_received_requests_and_statistics() {
    let (_session, http) = live_session("john").await;
    let (notifier, _rx) = ChannelNotifier::new();
    let controller = RequestsController::new(
        ViewRole::Lender,
        Arc::new(RequestsClient::new(http)),
        Arc::new(notifier),
    );

    controller.mount().await;
    assert_eq!(controller.load_error(), None);
    let stats = controller.statistics().expect("statistics loaded");
    assert!(stats.total_received as usize >= controller.requests().len());
}

#[tokio::test]
#[ignore]
async fn test_out_of_order_action_is_refused_locally() {
    let (_session, http) = live_session("john").await;
    let (notifier, mut rx) = ChannelNotifier::new();
    let controller = RequestsController::new(
        ViewRole::Borrower,
        Arc::new(RequestsClient::new(http)),
        Arc::new(notifier),
    );
    controller.mount().await;

    let Some(pending) = controller
        .requests()
        .into_iter()
        .find(|r| r.status == RequestStatus::Pending)
    else {
        return;
    };

    let before = controller.requests();
    let err = controller
        .request_action(RequestAction::Confirm, pending.id)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidTransition);
    assert_eq!(controller.requests(), before);
    assert!(rx.try_recv().is_err());
}
