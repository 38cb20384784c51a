//! HTTP transport tests against a local mock server

use edgecheck_e2e::transport::{HEADER_INSTANCE_ID, HEADER_PURGE_INSTANCES};
use edgecheck_e2e::{E2eError, FetchOptions, HttpClient, TransportConfig};

fn client() -> HttpClient {
    HttpClient::new(TransportConfig::default()).unwrap()
}

#[tokio::test]
async fn redirects_are_returned_by_default() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/old")
        .with_status(302)
        .with_header("location", "/new")
        .create_async()
        .await;
    let target = server
        .mock("GET", "/new")
        .with_body("moved")
        .expect(0)
        .create_async()
        .await;

    let response = client()
        .fetch(&format!("{}/old", server.url()), &FetchOptions::get())
        .await
        .unwrap();

    assert_eq!(response.status.as_u16(), 302);
    assert_eq!(response.header("location"), Some("/new"));
    assert!(!response.is_success());
    target.assert_async().await;
}

#[tokio::test]
async fn redirects_are_followed_on_request() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/old")
        .with_status(301)
        .with_header("location", "/new")
        .create_async()
        .await;
    server
        .mock("GET", "/new")
        .with_body("moved")
        .create_async()
        .await;

    let response = client()
        .fetch(
            &format!("{}/old", server.url()),
            &FetchOptions::get().follow_redirects(),
        )
        .await
        .unwrap();

    assert_eq!(response.status.as_u16(), 200);
    assert!(response.url.ends_with("/new"));
    assert_eq!(response.text().unwrap(), "moved");
}

#[tokio::test]
async fn posts_body_and_headers() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/submit")
        .match_header("x-test", "yes")
        .match_header(HEADER_PURGE_INSTANCES, "1")
        .match_body("payload")
        .with_status(201)
        .with_header(HEADER_INSTANCE_ID, "inst-42")
        .with_body(r#"{"ok":true}"#)
        .create_async()
        .await;

    let options = FetchOptions::post("payload")
        .header("x-test", "yes")
        .unwrap()
        .purge_instances();
    let response = client()
        .fetch(&format!("{}/submit", server.url()), &options)
        .await
        .unwrap();

    assert_eq!(response.status.as_u16(), 201);
    assert_eq!(response.instance_id(), Some("inst-42"));
    let body: serde_json::Value = response.json().unwrap();
    assert_eq!(body["ok"], true);
    mock.assert_async().await;
}

#[tokio::test]
async fn error_statuses_are_not_errors_at_this_layer() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/missing")
        .with_status(404)
        .with_body("nope")
        .create_async()
        .await;

    let response = client()
        .fetch(&format!("{}/missing", server.url()), &FetchOptions::get())
        .await
        .unwrap();

    assert_eq!(response.status.as_u16(), 404);
    assert_eq!(response.text().unwrap(), "nope");
}

#[tokio::test]
async fn pinned_server_keeps_host_and_port() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/")
        .match_header("host", format!("app.wasmer.invalid:{}", server.socket_address().port()).as_str())
        .with_body("pinned")
        .create_async()
        .await;

    let client = HttpClient::new(TransportConfig {
        target_server: Some("127.0.0.1".to_string()),
        accept_invalid_certs: true,
    })
    .unwrap();
    assert_eq!(client.target_server(), Some("127.0.0.1"));

    // `.invalid` never resolves through DNS.
    let url = format!("http://app.wasmer.invalid:{}/", server.socket_address().port());
    let response = client.fetch(&url, &FetchOptions::get()).await.unwrap();

    assert_eq!(response.text().unwrap(), "pinned");
    mock.assert_async().await;
}

#[tokio::test]
async fn invalid_url_is_rejected() {
    let err = client()
        .fetch("not a url", &FetchOptions::get())
        .await
        .unwrap_err();
    assert!(matches!(err, E2eError::InvalidUrl { .. }), "{err:?}");
}

#[tokio::test]
async fn connection_errors_propagate() {
    // Bind then drop to get a port nothing listens on.
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();

    let err = client()
        .fetch(&format!("http://127.0.0.1:{}/", port), &FetchOptions::get())
        .await
        .unwrap_err();
    assert!(matches!(err, E2eError::Http(_)), "{err:?}");
}
