//! End-to-end tests for the admin surface.

mod common;

use serde_json::{json, Value};

use common::{start_echo_backend, start_gateway, unreachable_addr};

async fn add(client: &reqwest::Client, url: &str, body: Value) -> (u16, String) {
    let res = client.post(url).json(&body).send().await.unwrap();
    let status = res.status().as_u16();
    (status, res.text().await.unwrap())
}

#[tokio::test]
async fn test_add_then_list_then_proxy() {
    let backend = start_echo_backend().await;
    let gateway = start_gateway(&[], |_| {}).await;
    let client = reqwest::Client::new();
    let target = format!("http://{}", backend);

    let (status, body) = add(
        &client,
        &gateway.url("/targets"),
        json!({ "path": "/users", "target": target }),
    )
    .await;
    assert_eq!(status, 201);
    assert_eq!(body, format!("Added route: /users → {}", target));

    let table: Value = client
        .get(gateway.url("/targets"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(table, json!({ "/users": target }));

    let on_disk: Value =
        serde_json::from_str(&std::fs::read_to_string(&gateway.route_file).unwrap()).unwrap();
    assert_eq!(on_disk, table);

    let res = client.get(gateway.url("/users/42")).send().await.unwrap();
    assert_eq!(res.status(), 200);
    let echo: Value = res.json().await.unwrap();
    assert_eq!(echo["path"], "/42");

    gateway.stop().await;
}

#[tokio::test]
async fn test_duplicate_path_is_409_and_table_unchanged() {
    let gateway = start_gateway(&[("/api", "http://one.local")], |_| {}).await;
    let client = reqwest::Client::new();

    let (status, body) = add(
        &client,
        &gateway.url("/targets"),
        json!({ "path": "/api", "target": "http://two.local" }),
    )
    .await;
    assert_eq!(status, 409);
    assert_eq!(body, "Path already exists");

    let table = gateway.routes.load().await.unwrap();
    assert_eq!(table.get("/api"), Some("http://one.local"));
    assert_eq!(table.len(), 1);

    gateway.stop().await;
}

#[tokio::test]
async fn test_invalid_entries_are_rejected() {
    let gateway = start_gateway(&[], |_| {}).await;
    let client = reqwest::Client::new();
    let url = gateway.url("/targets");

    let cases = [
        (json!({ "path": "api", "target": "http://x.local" }), 400, "Path must start with '/'"),
        (json!({ "path": "/api", "target": "not a url" }), 400, "Invalid target URL"),
        (json!({ "path": "/api", "target": "ftp://x.local" }), 400, "Invalid target URL"),
        (
            json!({ "path": "/metrics", "target": "http://x.local" }),
            403,
            "This path is reserved and cannot be overridden",
        ),
        (
            json!({ "path": "/targets", "target": "http://x.local" }),
            403,
            "This path is reserved and cannot be overridden",
        ),
        (json!({ "path": "/api" }), 400, "Invalid request format"),
    ];

    for (body, want_status, want_body) in cases {
        let (status, text) = add(&client, &url, body.clone()).await;
        assert_eq!(status, want_status, "body: {}", body);
        assert_eq!(text, want_body, "body: {}", body);
    }

    let res = client.post(&url).body("{ not json").send().await.unwrap();
    assert_eq!(res.status(), 400);

    assert!(gateway.routes.load().await.unwrap().is_empty());
    assert!(!gateway.route_file.exists());

    gateway.stop().await;
}

#[tokio::test]
async fn test_delete_route_then_proxy_misses() {
    let backend = start_echo_backend().await;
    let upstream = format!("http://{}", backend);
    let gateway = start_gateway(&[("/api", upstream.as_str()), ("/keep", upstream.as_str())], |_| {}).await;
    let client = reqwest::Client::new();

    assert_eq!(client.get(gateway.url("/api")).send().await.unwrap().status(), 200);

    let res = client.delete(gateway.url("/targets/api")).send().await.unwrap();
    assert_eq!(res.status(), 204);

    let table = gateway.routes.load().await.unwrap();
    assert!(!table.contains("/api"));
    assert!(table.contains("/keep"));

    let res = client.get(gateway.url("/api")).send().await.unwrap();
    assert_eq!(res.status(), 404);

    let stat = gateway.stats.get("/api").unwrap();
    assert_eq!((stat.success, stat.fail), (1, 1));

    // Deleting an absent route is still a success.
    let res = client.delete(gateway.url("/targets/api")).send().await.unwrap();
    assert_eq!(res.status(), 204);

    gateway.stop().await;
}

#[tokio::test]
async fn test_non_ascii_and_spaced_keys_route_and_delete() {
    let backend = start_echo_backend().await;
    let gateway = start_gateway(&[], |_| {}).await;
    let client = reqwest::Client::new();
    let target = format!("http://{}", backend);

    for key in ["/café", "/my api"] {
        let (status, _) = add(
            &client,
            &gateway.url("/targets"),
            json!({ "path": key, "target": target }),
        )
        .await;
        assert_eq!(status, 201, "key: {}", key);
    }

    let res = client.get(gateway.url("/café/crème")).send().await.unwrap();
    assert_eq!(res.status(), 200);
    let echo: Value = res.json().await.unwrap();
    assert_eq!(echo["path"], "/cr%C3%A8me");

    let res = client.get(gateway.url("/my api")).send().await.unwrap();
    assert_eq!(res.status(), 200);

    assert_eq!(gateway.stats.get("/café").unwrap().success, 1);
    assert_eq!(gateway.stats.get("/my api").unwrap().success, 1);
    assert!(gateway.stats.get("/caf%C3%A9").is_none());

    let res = client.delete(gateway.url("/targets/café")).send().await.unwrap();
    assert_eq!(res.status(), 204);
    let res = client.delete(gateway.url("/targets/my%20api")).send().await.unwrap();
    assert_eq!(res.status(), 204);
    assert!(gateway.routes.load().await.unwrap().is_empty());

    let res = client.get(gateway.url("/café")).send().await.unwrap();
    assert_eq!(res.status(), 404);
    assert_eq!(gateway.stats.get("/café").unwrap().fail, 1);

    gateway.stop().await;
}

#[tokio::test]
async fn test_delete_nested_path() {
    let gateway = start_gateway(&[("/api/v2", "http://v2.local")], |_| {}).await;
    let client = reqwest::Client::new();

    let res = client.delete(gateway.url("/targets/api/v2")).send().await.unwrap();
    assert_eq!(res.status(), 204);
    assert!(gateway.routes.load().await.unwrap().is_empty());

    gateway.stop().await;
}

#[tokio::test]
async fn test_delete_without_path_is_400() {
    let gateway = start_gateway(&[], |_| {}).await;

    let res = reqwest::Client::new()
        .delete(gateway.url("/targets/"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 400);
    assert_eq!(res.text().await.unwrap(), "missing path");

    gateway.stop().await;
}

#[tokio::test]
async fn test_purge_stats_on_delete() {
    let dead = unreachable_addr().await;
    let upstream = format!("http://{}", dead);
    let gateway = start_gateway(&[("/api", upstream.as_str())], |config| {
        config.admin.purge_stats_on_delete = true;
    })
    .await;
    let client = reqwest::Client::new();

    assert_eq!(client.get(gateway.url("/api")).send().await.unwrap().status(), 502);
    assert!(gateway.stats.get("/api").is_some());

    client.delete(gateway.url("/targets/api")).send().await.unwrap();

    assert!(gateway.stats.get("/api").is_none());
    assert!(gateway.stats.persisted().await.unwrap().is_empty());

    gateway.stop().await;
}

#[tokio::test]
async fn test_metrics_and_dashboard() {
    let dead = unreachable_addr().await;
    let upstream = format!("http://{}", dead);
    let gateway = start_gateway(&[("/down", upstream.as_str())], |_| {}).await;
    let client = reqwest::Client::new();

    client.get(gateway.url("/down")).send().await.unwrap();
    client.get(gateway.url("/missing")).send().await.unwrap();

    let metrics: Value = client
        .get(gateway.url("/metrics"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(
        metrics,
        json!([
            { "path": "/down", "success": 0, "fail": 1 },
            { "path": "/missing", "success": 0, "fail": 1 },
        ])
    );

    let res = client.get(gateway.url("/dashboard")).send().await.unwrap();
    assert_eq!(res.status(), 200);
    let content_type = res.headers()["content-type"].to_str().unwrap().to_string();
    assert!(content_type.starts_with("text/html"));
    let html = res.text().await.unwrap();
    assert!(html.contains("Gateway Monitoring Dashboard"));
    assert!(html.contains("<tr><td>/down</td><td>0</td><td>1</td></tr>"));
    assert!(html.contains("<tr><td>/missing</td><td>0</td><td>1</td></tr>"));

    gateway.stop().await;
}

#[tokio::test]
async fn test_admin_paths_are_not_counted() {
    let gateway = start_gateway(&[], |_| {}).await;
    let client = reqwest::Client::new();

    client.get(gateway.url("/targets")).send().await.unwrap();
    client.get(gateway.url("/metrics")).send().await.unwrap();
    client.get(gateway.url("/dashboard")).send().await.unwrap();

    assert!(gateway.stats.all().is_empty());
    gateway.stop().await;
}

#[tokio::test]
async fn test_responses_carry_request_id() {
    let gateway = start_gateway(&[], |_| {}).await;

    let res = reqwest::get(gateway.url("/targets")).await.unwrap();
    let id = res.headers()["x-request-id"].to_str().unwrap();
    assert!(uuid::Uuid::parse_str(id).is_ok());

    gateway.stop().await;
}
