//! End-to-end dispatch against a local mock server.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use restclient::{Body, Params, RequestOptions, RestClient, RestError, Verb};
use restclient_test_utils::wiremock::ResponseTemplate;
use restclient_test_utils::{
    assert_err, assert_ok, capture_logs, init_tracing, TestHttpServer,
};
use serde_json::json;
use tokio::sync::oneshot;

fn header<'a>(request: &'a restclient_test_utils::wiremock::Request, name: &str) -> Option<&'a str> {
    request.headers.get(name).and_then(|v| v.to_str().ok())
}

fn client() -> RestClient {
    init_tracing();
    assert_ok!(RestClient::new())
}

#[tokio::test]
async fn test_get_sends_params_as_query() {
    let server = TestHttpServer::start().await;
    server.text("GET", "/path", 200, "ok").await;

    let options = RequestOptions::new().data(Params::new().with("a", "1").with("b", "2"));
    let completion = assert_ok!(assert_ok!(client().get(&server.url_for("/path"), options)).await);

    assert_eq!(completion.status, 200);
    assert_eq!(completion.body, Body::Text("ok".to_string()));

    let request = server.only_request().await;
    assert_eq!(request.method.as_str(), "GET");
    assert_eq!(request.url.query(), Some("a=1&b=2"));
    assert!(request.body.is_empty());
}

#[tokio::test]
async fn test_post_sends_form_body() {
    let server = TestHttpServer::start().await;
    server.text("POST", "/path", 201, "created").await;

    let options = RequestOptions::new().data(Params::new().with("a", "x y"));
    let completion = assert_ok!(assert_ok!(client().post(&server.url_for("/path"), options)).await);
    assert_eq!(completion.status, 201);

    let request = server.only_request().await;
    assert_eq!(request.body, b"a=x+y");
    assert_eq!(header(&request, "content-length"), Some("5"));
    assert_eq!(request.url.query(), None);
}

#[tokio::test]
async fn test_put_sends_encoded_string_body() {
    let server = TestHttpServer::start().await;
    server.text("PUT", "/items/1", 200, "").await;

    let options = RequestOptions::new().data("name=widget&qty=2");
    assert_ok!(assert_ok!(client().put(&server.url_for("/items/1"), options)).await);

    let request = server.only_request().await;
    assert_eq!(request.body, b"name=widget&qty=2");
    assert_eq!(header(&request, "content-length"), Some("17"));
}

#[tokio::test]
async fn test_delete_sends_query_and_repeated_keys() {
    let server = TestHttpServer::start().await;
    server.text("DELETE", "/items", 204, "").await;

    let options = RequestOptions::new().data(Params::new().with_list("id", [3, 5, 8]));
    let completion = assert_ok!(assert_ok!(client().del(&server.url_for("/items"), options)).await);
    assert_eq!(completion.status, 204);

    let request = server.only_request().await;
    assert_eq!(request.url.query(), Some("id=3&id=5&id=8"));
}

#[tokio::test]
async fn test_head_ignores_data() {
    let server = TestHttpServer::start().await;
    server.text("HEAD", "/status", 200, "").await;

    let options = RequestOptions::new().data(Params::new().with("a", "1"));
    let completion = assert_ok!(assert_ok!(client().head(&server.url_for("/status"), options)).await);
    assert_eq!(completion.status, 200);
    assert_eq!(completion.body, Body::Text(String::new()));

    let request = server.only_request().await;
    assert_eq!(request.url.query(), None);
}

#[tokio::test]
async fn test_explicit_query_is_used_verbatim() {
    let server = TestHttpServer::start().await;
    server.text("GET", "/search", 200, "").await;

    let options = RequestOptions::new().data(Params::new().with("ignored", "yes"));
    assert_ok!(assert_ok!(client().get(&server.url_for("/search?q=kept"), options)).await);

    let request = server.only_request().await;
    assert_eq!(request.url.query(), Some("q=kept"));
}

#[tokio::test]
async fn test_default_headers_are_sent() {
    let server = TestHttpServer::start().await;
    server.text("GET", "/", 200, "").await;

    assert_ok!(assert_ok!(client().get(&server.url(), RequestOptions::new())).await);

    let request = server.only_request().await;
    assert_eq!(header(&request, "host"), Some("127.0.0.1"));
    assert!(header(&request, "user-agent").unwrap().starts_with("restclient/"));
    assert_eq!(header(&request, "authorization"), None);
    assert_eq!(header(&request, "accept"), None);
}

#[tokio::test]
async fn test_basic_auth_from_url_credentials() {
    let server = TestHttpServer::start().await;
    server.text("GET", "/private", 200, "secret").await;

    let url = server.url_with_credentials("user", "pass", "/private");
    assert_ok!(assert_ok!(client().get(&url, RequestOptions::new())).await);

    let request = server.only_request().await;
    assert_eq!(header(&request, "authorization"), Some("Basic dXNlcjpwYXNz"));
}

#[tokio::test]
async fn test_credentials_stay_out_of_logs() {
    let server = TestHttpServer::start().await;
    server.text("GET", "/private", 200, "secret").await;
    let client = client();

    let (logs, _guard) = capture_logs();
    let url = server.url_with_credentials("user", "pass", "/private");
    assert_ok!(assert_ok!(client.get(&url, RequestOptions::new())).await);

    let logs = logs.contents();
    assert!(logs.contains("url=http://127.0.0.1:"), "{logs}");
    assert!(logs.contains("status=200"), "{logs}");
    assert!(!logs.contains("user:pass"), "{logs}");
    assert!(!logs.contains("pass@"), "{logs}");
}

#[tokio::test]
async fn test_caller_headers_win() {
    let server = TestHttpServer::start().await;
    server.text("GET", "/", 200, "").await;

    let options = RequestOptions::new()
        .json()
        .header("Accept", "text/plain")
        .header("User-Agent", "integration/1.0")
        .header("X-Request-Id", "42");
    let url = server.url_with_credentials("user", "pass", "/");
    let options = options.header("Authorization", "Bearer abc");
    assert_ok!(assert_ok!(client().get(&url, options)).await);

    let request = server.only_request().await;
    assert_eq!(header(&request, "accept"), Some("text/plain"));
    assert_eq!(header(&request, "user-agent"), Some("integration/1.0"));
    assert_eq!(header(&request, "x-request-id"), Some("42"));
    assert_eq!(header(&request, "authorization"), Some("Bearer abc"));
}

#[tokio::test]
async fn test_json_response_is_parsed() {
    let server = TestHttpServer::start().await;
    server.json("GET", "/data", &json!({"items": [1, 2, 3]})).await;

    let completion = assert_ok!(
        assert_ok!(client().get(&server.url_for("/data"), RequestOptions::new().json())).await
    );
    assert_eq!(completion.status, 200);
    assert_eq!(completion.body, Body::Json(json!({"items": [1, 2, 3]})));

    let request = server.only_request().await;
    assert_eq!(header(&request, "accept"), Some("application/json"));
}

#[tokio::test]
async fn test_json_callback_receives_object_and_status() {
    let server = TestHttpServer::start().await;
    server.text("GET", "/empty-object", 200, "{}").await;

    let (tx, rx) = oneshot::channel();
    let options = RequestOptions::new().json().on_complete(move |body, status| {
        let _ = tx.send((body, status));
    });
    let in_flight = assert_ok!(client().get(&server.url_for("/empty-object"), options));

    let (body, status) = assert_ok!(rx.await);
    assert_eq!(body, Body::Json(json!({})));
    assert_eq!(status, 200);
    assert_ok!(in_flight.await);
}

#[tokio::test]
async fn test_empty_json_body_is_empty_object() {
    let server = TestHttpServer::start().await;
    server.text("POST", "/nothing", 202, "").await;

    let completion = assert_ok!(
        assert_ok!(client().post(&server.url_for("/nothing"), RequestOptions::new().json())).await
    );
    assert_eq!(completion.status, 202);
    assert_eq!(completion.body, Body::Json(json!({})));
}

#[tokio::test]
async fn test_text_response_is_not_parsed() {
    let server = TestHttpServer::start().await;
    server.text("GET", "/raw", 200, "{\"a\": 1}").await;

    let (tx, rx) = oneshot::channel();
    let options = RequestOptions::new().on_complete(move |body, status| {
        let _ = tx.send((body, status));
    });
    let _ = assert_ok!(client().get(&server.url_for("/raw"), options));

    let (body, status) = assert_ok!(rx.await);
    assert_eq!(body, Body::Text("{\"a\": 1}".to_string()));
    assert_eq!(status, 200);
}

#[tokio::test]
async fn test_malformed_json_fails_without_callback() {
    let server = TestHttpServer::start().await;
    server.text("GET", "/broken", 500, "<html>oops</html>").await;

    let called = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&called);
    let options = RequestOptions::new()
        .json()
        .on_complete(move |_, _| flag.store(true, Ordering::SeqCst));

    let err = assert_err!(assert_ok!(client().get(&server.url_for("/broken"), options)).await);
    match err {
        RestError::Json { status, body, .. } => {
            assert_eq!(status, 500);
            assert_eq!(body, "<html>oops</html>");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(!called.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_error_status_is_passed_through() {
    let server = TestHttpServer::start().await;
    server.text("GET", "/missing", 404, "not here").await;

    let completion =
        assert_ok!(assert_ok!(client().get(&server.url_for("/missing"), RequestOptions::new())).await);
    assert_eq!(completion.status, 404);
    assert_eq!(completion.body.as_text(), Some("not here"));
}

#[tokio::test]
async fn test_redirects_are_not_followed() {
    let server = TestHttpServer::start().await;
    server
        .respond(
            "GET",
            "/old",
            ResponseTemplate::new(302).insert_header("Location", "/new"),
        )
        .await;
    server.text("GET", "/new", 200, "moved").await;

    let completion =
        assert_ok!(assert_ok!(client().get(&server.url_for("/old"), RequestOptions::new())).await);
    assert_eq!(completion.status, 302);
    assert_eq!(server.received_requests().await.len(), 1);
}

#[tokio::test]
async fn test_dropped_handle_still_completes() {
    let server = TestHttpServer::start().await;
    server.text("GET", "/detached", 200, "done").await;

    let (tx, rx) = oneshot::channel();
    let options = RequestOptions::new().on_complete(move |body, _| {
        let _ = tx.send(body);
    });
    drop(assert_ok!(client().get(&server.url_for("/detached"), options)));

    assert_eq!(assert_ok!(rx.await), Body::Text("done".to_string()));
}

#[tokio::test]
async fn test_connection_refused_is_request_error() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let url = format!("http://127.0.0.1:{port}/");
    let err = assert_err!(assert_ok!(client().get(&url, RequestOptions::new())).await);
    assert!(matches!(err, RestError::Request(_)));
}

#[tokio::test]
async fn test_invalid_url_fails_synchronously() {
    let err = assert_err!(client().get("http//missing-colon", RequestOptions::new()));
    assert!(matches!(err, RestError::InvalidUrl(_)));

    let err = assert_err!(client().get("mailto:someone@example.com", RequestOptions::new()));
    assert!(matches!(err, RestError::UnsupportedScheme(_)));
}

#[tokio::test]
async fn test_dispatch_by_verb() {
    let server = TestHttpServer::start().await;
    server.text("PUT", "/v", 200, "put").await;

    let completion = assert_ok!(
        assert_ok!(client().dispatch(Verb::Put, &server.url_for("/v"), RequestOptions::new())).await
    );
    assert_eq!(completion.body.as_text(), Some("put"));

    let request = server.only_request().await;
    assert_eq!(header(&request, "content-length"), Some("0"));
}

#[tokio::test]
async fn test_free_functions_use_env_config() {
    init_tracing();
    let server = TestHttpServer::start().await;
    server.json("GET", "/free", &json!({"ok": true})).await;

    let completion =
        assert_ok!(assert_ok!(restclient::get(&server.url_for("/free"), RequestOptions::new().json())).await);
    assert_eq!(completion.body.as_json(), Some(&json!({"ok": true})));
}
