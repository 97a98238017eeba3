//! Integration tests using wiremock to simulate HTTP servers.

mod common;

use common::EventLog;
use outcall::{
    AuthDescriptor, CallShape, Client, Error, ExternalRequest, Outcome, RequestDescriptor,
    TransportErrorKind,
};
use http::Method;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct Order {
    id: String,
}

fn client_for(server: &MockServer, log: &EventLog) -> Client {
    common::init_tracing();
    Client::builder()
        .base_url(server.uri())
        .unwrap()
        .notifier(log.notifier())
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_post_order_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/orders"))
        .and(body_json(json!({"qty": 2})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "o1"})))
        .mount(&mock_server)
        .await;

    let log = EventLog::default();
    let client = client_for(&mock_server, &log);

    let success_log = log.clone();
    let error_log = log.clone();
    let descriptor = RequestDescriptor::<Order>::new(Method::POST, "/api/orders")
        .json_body(&json!({"qty": 2}))
        .unwrap()
        .success_message("Order placed")
        .on_success(move |order, raw| {
            assert_eq!(raw.status.as_u16(), 201);
            success_log.push(format!("on_success:{}", order.id));
        })
        .on_error(move |_| error_log.push("on_error"));

    let order = client.call(descriptor).await;

    assert_eq!(order, Some(Order { id: "o1".to_string() }));
    assert_eq!(
        log.events(),
        vec!["notify:success:Order placed", "on_success:o1"]
    );
}

#[tokio::test]
async fn test_server_error_message_from_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/orders"))
        .respond_with(
            ResponseTemplate::new(500).set_body_json(json!({"message": "insufficient stock"})),
        )
        .mount(&mock_server)
        .await;

    let log = EventLog::default();
    let client = client_for(&mock_server, &log);

    let error_log = log.clone();
    let descriptor = RequestDescriptor::<Order>::new(Method::POST, "/api/orders")
        .json_body(&json!({"qty": 2}))
        .unwrap()
        .on_error(move |err| {
            assert_eq!(err.user_message("default"), "insufficient stock");
            assert_eq!(err.status().map(|s| s.as_u16()), Some(500));
            error_log.push("on_error");
        });

    let order = client.call(descriptor).await;

    assert!(order.is_none());
    assert_eq!(
        log.events(),
        vec!["notify:error:insufficient stock", "on_error"]
    );
}

#[tokio::test]
async fn test_http_error_4xx_plain_text() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/test"))
        .respond_with(ResponseTemplate::new(404).set_body_string("Not found"))
        .mount(&mock_server)
        .await;

    let log = EventLog::default();
    let client = client_for(&mock_server, &log);

    let outcome = client
        .execute(RequestDescriptor::<Value>::new(Method::GET, "/test"))
        .await;

    match outcome {
        Outcome::Failure {
            message,
            cause: Error::Transport(err),
        } => {
            assert_eq!(message, "Not found");
            assert_eq!(err.kind, TransportErrorKind::Status);
            assert_eq!(err.raw_body.as_deref(), Some("Not found"));
        }
        other => panic!("Expected transport failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_deserialization_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/test"))
        .respond_with(ResponseTemplate::new(200).set_body_string("invalid json"))
        .mount(&mock_server)
        .await;

    let log = EventLog::default();
    let client = client_for(&mock_server, &log);

    let outcome = client
        .execute(RequestDescriptor::<Order>::new(Method::GET, "/test"))
        .await;

    match outcome {
        Outcome::Failure {
            cause:
                Error::Parse {
                    status,
                    raw_response,
                    message,
                },
            ..
        } => {
            assert_eq!(status.as_u16(), 200);
            assert_eq!(raw_response, "invalid json");
            assert!(message.contains("expected"));
        }
        other => panic!("Expected Parse failure, got {:?}", other),
    }
    assert_eq!(log.count("notify:error"), 1);
}

#[tokio::test]
async fn test_protocol_redirect() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/session"))
        .respond_with(ResponseTemplate::new(302).insert_header("Location", "/login"))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>login</html>"))
        .mount(&mock_server)
        .await;

    let log = EventLog::default();
    let client = client_for(&mock_server, &log);

    let redirect_log = log.clone();
    let success_log = log.clone();
    let error_log = log.clone();
    let descriptor = RequestDescriptor::<Value>::new(Method::GET, "/session")
        .show_notifications(true)
        .on_redirect(move |location| redirect_log.push(format!("on_redirect:{location}")))
        .on_success(move |_, _| success_log.push("on_success"))
        .on_error(move |_| error_log.push("on_error"));

    let result = client.call(descriptor).await;

    assert!(result.is_none());
    assert_eq!(
        log.events(),
        vec![format!("on_redirect:{}/login", mock_server.uri())]
    );
}

#[tokio::test]
async fn test_fragment_in_url_is_not_a_redirect() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/docs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let log = EventLog::default();
    let client = client_for(&mock_server, &log);

    let success_log = log.clone();
    let redirect_log = log.clone();
    let outcome = client
        .execute(
            RequestDescriptor::<Value>::new(Method::GET, "/docs#section")
                .success_message("Loaded")
                .on_success(move |_, _| success_log.push("on_success"))
                .on_redirect(move |location| {
                    redirect_log.push(format!("on_redirect:{location}"))
                }),
        )
        .await;

    assert_eq!(outcome.into_data(), Some(json!({"ok": true})));
    assert_eq!(log.events(), vec!["notify:success:Loaded", "on_success"]);
}

#[tokio::test]
async fn test_payload_redirect_hint() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"redirectTo": "/dashboard"})))
        .mount(&mock_server)
        .await;

    let log = EventLog::default();
    let client = client_for(&mock_server, &log);

    let redirect_log = log.clone();
    let result: Option<Value> = client
        .call(
            RequestDescriptor::new(Method::POST, "/api/login")
                .on_redirect(move |location| redirect_log.push(format!("on_redirect:{location}"))),
        )
        .await;

    assert!(result.is_none());
    assert_eq!(log.events(), vec!["on_redirect:/dashboard"]);
}

#[tokio::test]
async fn test_external_call_with_api_key() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v2/rates"))
        .and(header("X-Key", "abc123"))
        .and(query_param("base", "EUR"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"usd": 1.08})))
        .mount(&mock_server)
        .await;

    let log = EventLog::default();
    let client = Client::builder()
        .notifier(log.notifier())
        .build()
        .unwrap();

    let request = ExternalRequest::new(
        RequestDescriptor::<Value>::new(Method::GET, "/v2/rates").with_query_param("base", "EUR"),
    )
    .base_url(mock_server.uri())
    .auth(AuthDescriptor::api_key("abc123", Some("X-Key".to_string())));

    let rates = client.call_external(request).await;

    assert_eq!(rates, Some(json!({"usd": 1.08})));
    // External calls are silent unless opted in
    assert!(log.events().is_empty());
}

#[tokio::test]
async fn test_external_auth_overrides_caller_header() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/me"))
        .and(header("Authorization", "Bearer fresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "ada"})))
        .mount(&mock_server)
        .await;

    let log = EventLog::default();
    let client = client_for(&mock_server, &log);

    let request = ExternalRequest::new(
        RequestDescriptor::<Value>::new(Method::GET, "/me")
            .with_header("Authorization", "Bearer stale")
            .unwrap(),
    )
    .auth(AuthDescriptor::bearer("fresh"));

    assert_eq!(
        client.call_external(request).await,
        Some(json!({"name": "ada"}))
    );
}

#[tokio::test]
async fn test_external_timeout() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({}))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&mock_server)
        .await;

    let log = EventLog::default();
    let client = Client::builder()
        .base_url(mock_server.uri())
        .unwrap()
        .notifier(log.notifier())
        .external_timeout(Duration::from_millis(50))
        .build()
        .unwrap();

    let outcome = client
        .execute_external(ExternalRequest::new(
            RequestDescriptor::<Value>::new(Method::GET, "/slow").show_notifications(true),
        ))
        .await;

    match outcome {
        Outcome::Failure {
            message,
            cause: Error::Transport(err),
        } => {
            assert_eq!(err.kind, TransportErrorKind::Timeout);
            assert_eq!(message, "Request timed out");
        }
        other => panic!("Expected timeout, got {:?}", other),
    }
    assert_eq!(log.events(), vec!["notify:error:Request timed out"]);
}

#[tokio::test]
async fn test_structured_shape_uses_detail_field() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/profile"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({"detail": "name too long"})))
        .mount(&mock_server)
        .await;

    let log = EventLog::default();
    let client = Client::builder()
        .base_url(mock_server.uri())
        .unwrap()
        .call_shape(CallShape::Structured)
        .notifier(log.notifier())
        .build()
        .unwrap();

    let result: Option<Value> = client.put("/profile", &json!({"name": "x"})).await;

    assert!(result.is_none());
    assert_eq!(log.events(), vec!["notify:error:name too long"]);
}

#[tokio::test]
async fn test_structured_shape_success_passes_payload() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/orders/o1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "o1"})))
        .mount(&mock_server)
        .await;

    let log = EventLog::default();
    let client = Client::builder()
        .base_url(mock_server.uri())
        .unwrap()
        .call_shape(CallShape::Structured)
        .notifier(log.notifier())
        .build()
        .unwrap();

    let order: Option<Order> = client.get("/orders/o1").await;
    assert_eq!(order, Some(Order { id: "o1".to_string() }));
    assert_eq!(log.events(), vec!["notify:success:Success"]);
}

#[tokio::test]
async fn test_default_headers_and_verb_shorthands() {
    let mock_server = MockServer::start().await;

    for verb in ["GET", "PATCH", "DELETE"] {
        Mock::given(method(verb))
            .and(path("/items/1"))
            .and(header("x-client", "web"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"verb": verb})))
            .mount(&mock_server)
            .await;
    }

    let log = EventLog::default();
    let client = Client::builder()
        .base_url(mock_server.uri())
        .unwrap()
        .default_header("X-Client", "web")
        .unwrap()
        .notifier(log.notifier())
        .build()
        .unwrap();

    let got: Option<Value> = client.get("/items/1").await;
    assert_eq!(got, Some(json!({"verb": "GET"})));

    let patched: Option<Value> = client.patch("/items/1", &json!({"n": 1})).await;
    assert_eq!(patched, Some(json!({"verb": "PATCH"})));

    let deleted: Option<Value> = client.delete("/items/1").await;
    assert_eq!(deleted, Some(json!({"verb": "DELETE"})));

    assert_eq!(log.count("notify:success"), 3);
}

#[tokio::test]
async fn test_network_failure_is_absorbed() {
    let log = EventLog::default();
    let client = Client::builder()
        // Nothing listens on port 9 (discard) in the test environment
        .base_url("http://127.0.0.1:9")
        .unwrap()
        .notifier(log.notifier())
        .error_message("Server unreachable")
        .build()
        .unwrap();

    let error_log = log.clone();
    let outcome = client
        .execute(
            RequestDescriptor::<Value>::new(Method::GET, "/ping")
                .on_error(move |err| {
                    error_log.push(format!("on_error:{}", err.status().is_none()))
                }),
        )
        .await;

    assert!(matches!(
        outcome.error(),
        Some(Error::Transport(err)) if err.kind == TransportErrorKind::Network
    ));
    assert_eq!(log.count("notify:error"), 1);
    assert_eq!(log.events().last().map(String::as_str), Some("on_error:true"));
}
