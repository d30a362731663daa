//! End-to-end tests over real TCP

use std::sync::Arc;
use std::time::Duration;

use fngate_core::{HANDLER_NOT_FOUND_MESSAGE, INVALID_EXPORT_MESSAGE};
use fngate_runtime::{
    handler_fn, GatewayState, HandlerDefaults, HandlerModule, InvocationCoordinator,
    ModuleRegistry,
};
use fngate_test::{GatewayClient, TestServer};
use reqwest::StatusCode;
use serde_json::{json, Value};

fn registry() -> ModuleRegistry {
    ModuleRegistry::new().with_module(
        "fn/orders",
        HandlerModule::new()
            .with_handler(
                "handle",
                handler_fn(|event, _context, _callback| async move {
                    Ok(Some(json!({"received": event})))
                }),
            )
            .with_handler(
                "greet",
                handler_fn(|event, _context, callback| async move {
                    let name = event["name"].as_str().unwrap_or("stranger").to_string();
                    tokio::spawn(async move {
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        callback.succeed(json!(format!("hello {name}")));
                    });
                    Ok(None)
                }),
            )
            .with_value("version", json!("1.0")),
    )
}

#[tokio::test]
async fn test_invoke_over_tcp() {
    let server = TestServer::start(Arc::new(registry())).await.unwrap();

    let response = server
        .client()
        .invoke("fn/orders", "handle", json!({"id": 7}), json!({}))
        .await
        .unwrap();

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.content_type.as_deref(), Some("application/json"));
    assert!(response.request_id.is_some());
    assert_eq!(response.json().unwrap(), json!({"received": {"id": 7}}));
}

#[tokio::test]
async fn test_deferred_callback_completes_request() {
    let server = TestServer::start(Arc::new(registry())).await.unwrap();

    let response = server
        .client()
        .invoke("fn/orders", "greet", json!({"name": "ada"}), Value::Null)
        .await
        .unwrap();

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        response.content_type.as_deref(),
        Some("text/plain; charset=utf-8")
    );
    assert_eq!(response.text, "hello ada");
}

#[tokio::test]
async fn test_request_ids_are_unique() {
    let server = TestServer::start(Arc::new(registry())).await.unwrap();
    let client = server.client();

    let first = client
        .invoke("fn/orders", "handle", json!(1), Value::Null)
        .await
        .unwrap();
    let second = client
        .invoke("fn/orders", "handle", json!(2), Value::Null)
        .await
        .unwrap();

    assert_ne!(first.request_id, second.request_id);
}

#[tokio::test]
async fn test_unknown_module_reports_misconfiguration() {
    let server = TestServer::start(Arc::new(registry())).await.unwrap();

    let response = server
        .client()
        .invoke("fn/missing", "handle", Value::Null, Value::Null)
        .await
        .unwrap();

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.text, HANDLER_NOT_FOUND_MESSAGE);
}

#[tokio::test]
async fn test_value_export_is_not_invocable() {
    let server = TestServer::start(Arc::new(registry())).await.unwrap();

    let response = server
        .client()
        .invoke("fn/orders", "version", Value::Null, Value::Null)
        .await
        .unwrap();

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.text, INVALID_EXPORT_MESSAGE);
}

#[tokio::test]
async fn test_defaults_fill_missing_fields() {
    let coordinator =
        InvocationCoordinator::new(Arc::new(registry())).with_defaults(HandlerDefaults {
            module_path: Some("fn/orders".to_string()),
            export_name: Some("handle".to_string()),
        });
    let server = TestServer::start_with_state(GatewayState::new(coordinator))
        .await
        .unwrap();

    let response = server
        .client()
        .post_json("/orders/42", &json!({"event": "ping"}))
        .await
        .unwrap();

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json().unwrap(), json!({"received": "ping"}));
}

#[tokio::test]
async fn test_get_without_body_reaches_cached_handler() {
    let server = TestServer::start(Arc::new(registry())).await.unwrap();
    let client = server.client();

    client
        .invoke("fn/orders", "handle", json!("warm"), Value::Null)
        .await
        .unwrap();
    let response = client.get("/status").await.unwrap();

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json().unwrap(), json!({"received": null}));
}

#[tokio::test]
async fn test_text_body_reaches_cached_handler() {
    let server = TestServer::start(Arc::new(registry())).await.unwrap();
    let client = server.client();
    assert_eq!(client.base_url(), format!("http://127.0.0.1:{}", server.port()));

    client
        .invoke("fn/orders", "handle", json!("warm"), Value::Null)
        .await
        .unwrap();
    let response = client.post_text("/orders", "not json at all").await.unwrap();

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json().unwrap(), json!({"received": null}));
}

#[tokio::test]
async fn test_stopped_server_refuses_connections() {
    let server = TestServer::start(Arc::new(registry())).await.unwrap();
    let url = server.url().to_string();

    server.stop();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let fresh = GatewayClient::with_timeout(url, Duration::from_secs(2));
    assert!(fresh.get("/").await.is_err());
}

#[tokio::test]
async fn test_hung_invocation_times_out_at_client() {
    let registry = ModuleRegistry::new().with_module(
        "fn/idle",
        HandlerModule::new().with_handler(
            "handle",
            handler_fn(|_event, _context, _callback| async { Ok(Some(json!(0))) }),
        ),
    );
    let server = TestServer::start(Arc::new(registry)).await.unwrap();
    let client = GatewayClient::with_timeout(server.url().to_string(), Duration::from_millis(300));

    let err = client
        .invoke("fn/idle", "handle", Value::Null, Value::Null)
        .await
        .unwrap_err();

    assert!(err.is_timeout());
}

#[cfg(unix)]
mod process {
    use super::*;
    use fngate_runtime::ProcessLoader;
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;

    fn write_script(dir: &Path, name: &str, body: &str) {
        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    }

    #[tokio::test]
    async fn test_process_handler_over_tcp() {
        let dir = tempfile::tempdir().unwrap();
        write_script(
            dir.path(),
            "echo.sh",
            r#"input=$(cat)
printf '{"export":"%s","input":%s}' "$1" "$input""#,
        );
        let loader = ProcessLoader::new(dir.path());
        let server = TestServer::start(Arc::new(loader)).await.unwrap();

        let response = server
            .client()
            .invoke("echo.sh", "handle", json!({"n": 1}), json!({"fn": "echo"}))
            .await
            .unwrap();

        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(
            response.json().unwrap(),
            json!({
                "export": "handle",
                "input": {"event": {"n": 1}, "context": {"fn": "echo"}},
            })
        );
    }

    #[tokio::test]
    async fn test_failing_process_reports_stderr() {
        let dir = tempfile::tempdir().unwrap();
        write_script(dir.path(), "fail.sh", "echo 'quota exceeded' >&2\nexit 3");
        let server = TestServer::start(Arc::new(ProcessLoader::new(dir.path())))
            .await
            .unwrap();

        let response = server
            .client()
            .invoke("fail.sh", "handle", Value::Null, Value::Null)
            .await
            .unwrap();

        assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.text, "quota exceeded");
    }
}
