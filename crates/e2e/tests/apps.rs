//! Live deployment scenarios
//!
//! These deploy real apps and need registry credentials
//! (`WASMER_TOKEN` or `~/.wasmer/wasmer.toml`) plus a `wasmer` binary.
//! Run with: cargo test --package edgecheck-e2e --test apps -- --ignored

use serde_json::Value;

use edgecheck_e2e::{AppDefinition, DeployOptions, FetchOptions, TestEnv};

fn env() -> TestEnv {
    edgecheck_e2e::init_test_logging();
    TestEnv::from_env().expect("test environment")
}

#[tokio::test]
#[ignore = "deploys to the live platform"]
async fn php_echo_query_parameter() {
    let env = env();
    let app = env
        .deploy_app(
            AppDefinition::php("<?php\necho $_GET['name'];\n"),
            DeployOptions::default(),
        )
        .await
        .unwrap();

    let response = env
        .fetch_app(&app, "/?name=world", FetchOptions::get())
        .await
        .unwrap();
    assert_eq!(response.status.as_u16(), 200);
    assert_eq!(response.text().unwrap(), "world");

    env.delete_app(&app).await.unwrap();
}

const PHP_MYSQL_INDEX: &str = r#"<?php
$db = new mysqli(
    getenv('DB_HOST'),
    getenv('DB_USERNAME'),
    getenv('DB_PASSWORD'),
    getenv('DB_NAME'),
    (int) getenv('DB_PORT')
);
if ($db->connect_error) {
    http_response_code(500);
    die('connect failed: ' . $db->connect_error);
}
$db->query('CREATE TABLE IF NOT EXISTS greetings (msg VARCHAR(64))');
$db->query('DELETE FROM greetings');
$db->query("INSERT INTO greetings (msg) VALUES ('Hello, Wasmer!')");
$row = $db->query('SELECT msg FROM greetings LIMIT 1')->fetch_assoc();
echo $row['msg'];
"#;

#[tokio::test]
#[ignore = "deploys to the live platform"]
async fn php_with_mysql_database() {
    let env = env();
    let app = env
        .deploy_app(
            AppDefinition::php(PHP_MYSQL_INDEX).with_mysql(),
            DeployOptions::default(),
        )
        .await
        .unwrap();

    let response = env.fetch_app(&app, "/", FetchOptions::get()).await.unwrap();
    assert_eq!(response.status.as_u16(), 200);
    assert!(response.text().unwrap().contains("Hello, Wasmer!"));

    env.delete_app(&app).await.unwrap();
}

#[tokio::test]
#[ignore = "deploys to the live platform"]
async fn static_site_serves_index() {
    let env = env();
    let app = env
        .deploy_app(AppDefinition::static_site(), DeployOptions::default())
        .await
        .unwrap();

    let response = env.fetch_app(&app, "/", FetchOptions::get()).await.unwrap();
    assert!(response.text().unwrap().contains("Hello!"));

    let missing = env
        .fetch_app(&app, "/does-not-exist.html", FetchOptions::get().allow_failure())
        .await
        .unwrap();
    assert_eq!(missing.status.as_u16(), 404);

    env.delete_app(&app).await.unwrap();
}

#[tokio::test]
#[ignore = "deploys to the live platform"]
async fn js_worker_sees_request_headers() {
    let env = env();
    let app = env
        .deploy_app(AppDefinition::js_worker(None), DeployOptions::default())
        .await
        .unwrap();

    let response = env
        .fetch_app(
            &app,
            "/",
            FetchOptions::get().header("x-edgecheck", "hello").unwrap(),
        )
        .await
        .unwrap();
    let body: Value = response.json().unwrap();
    assert_eq!(body["headers"]["x-edgecheck"], "hello");

    env.delete_app(&app).await.unwrap();
}
