mod common;

use std::time::Duration;

use serde_json::json;

use astra_client::{ApiCommander, ApiFamily, ApiRequest, Error, TimeoutContext};
use common::{MockResponse, MockServer, ThreadedMockServer};

fn data_api_commander(url: &str) -> ApiCommander {
    ApiCommander::builder(url)
        .path_segment("api/json")
        .path_segment("v1")
        .path_segment("default_keyspace")
        .header("Token", "AstraCS:secret")
        .family(ApiFamily::DataApi)
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_successful_command_roundtrip() {
    let server = MockServer::start(vec![MockResponse::json(
        200,
        r#"{"status":{"collections":["movies","books"]}}"#,
    )])
    .await;
    let commander = data_api_commander(&server.url);

    let payload = json!({"findCollections": {}});
    let response = commander
        .async_request(&ApiRequest::post(&payload))
        .await
        .unwrap();
    assert_eq!(response["status"]["collections"], json!(["movies", "books"]));

    let received = server.requests();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].method, "POST");
    assert_eq!(received[0].target, "/api/json/v1/default_keyspace");
    assert_eq!(received[0].header("Token"), Some("AstraCS:secret"));
    assert_eq!(received[0].header("Content-Type"), Some("application/json"));
    assert_eq!(received[0].body, r#"{"findCollections":{}}"#);
    // the client always announces itself
    assert!(received[0].header("User-Agent").unwrap().contains("astra-client/"));
}

#[tokio::test]
async fn test_errors_array_is_raised() {
    let body = r#"{"errors":[{"errorCode":"EXISTING_COLLECTION","message":"already there"}]}"#;
    let server = MockServer::start(vec![MockResponse::json(200, body)]).await;
    let commander = data_api_commander(&server.url);

    let payload = json!({"createCollection": {"name": "movies"}});
    let err = commander
        .async_request(&ApiRequest::post(&payload))
        .await
        .unwrap_err();
    match err {
        Error::ApiResponse {
            family,
            message,
            command,
            error_descriptors,
            ..
        } => {
            assert_eq!(family, ApiFamily::DataApi);
            assert!(message.contains("EXISTING_COLLECTION"));
            assert_eq!(command, Some(payload.clone()));
            assert_eq!(error_descriptors.len(), 1);
        }
        other => panic!("unexpected error variant: {other:?}"),
    }

    // the escape hatch hands the body back instead
    let response = commander
        .async_request(&ApiRequest::post(&payload).keep_api_errors())
        .await
        .unwrap();
    assert_eq!(response["errors"][0]["message"], json!("already there"));
}

#[tokio::test]
async fn test_non_2xx_status_maps_to_http_error() {
    let body = r#"{"errors":[{"ID":10,"message":"unauthorized"}]}"#;
    let server = MockServer::start(vec![MockResponse::json(401, body)]).await;
    let commander = data_api_commander(&server.url);

    let payload = json!({"findCollections": {}});
    let err = commander
        .async_request(&ApiRequest::post(&payload))
        .await
        .unwrap_err();
    match err {
        Error::Http {
            status,
            message,
            error_descriptors,
            ..
        } => {
            assert_eq!(status, 401);
            assert_eq!(message, "unauthorized (10)");
            assert_eq!(error_descriptors[0].error_code.as_deref(), Some("10"));
        }
        other => panic!("unexpected error variant: {other:?}"),
    }
}

#[tokio::test]
async fn test_timeout_error_names_the_parameter() {
    let server = MockServer::start(vec![
        MockResponse::json(200, "{}").with_delay(Duration::from_millis(500))
    ])
    .await;
    let commander = data_api_commander(&server.url);

    let payload = json!({"findCollections": {}});
    let context = TimeoutContext::new(Some(50)).with_label("request_timeout_ms");
    let err = commander
        .async_request(&ApiRequest::post(&payload).with_timeout(context))
        .await
        .unwrap_err();
    assert!(err.is_timeout());
    assert_eq!(err.family(), Some(ApiFamily::DataApi));
    let message = err.to_string();
    assert!(message.contains("50 ms"), "message was: {message}");
    assert!(message.contains("'request_timeout_ms'"), "message was: {message}");
}

#[tokio::test]
async fn test_unparseable_body_names_the_command() {
    let server = MockServer::start(vec![MockResponse::json(200, "<html>gateway</html>")]).await;
    let commander = data_api_commander(&server.url);

    let payload = json!({"findCollections": {}});
    let err = commander
        .async_request(&ApiRequest::post(&payload))
        .await
        .unwrap_err();
    match err {
        Error::UnexpectedResponse { message, raw_text, .. } => {
            assert!(message.contains("findCollections"));
            assert_eq!(raw_text, "<html>gateway</html>");
        }
        other => panic!("unexpected error variant: {other:?}"),
    }
}

#[tokio::test]
async fn test_decimal_aware_traffic_keeps_exact_literals() {
    use rust_decimal::Decimal;
    use std::str::FromStr;

    let server = MockServer::start(vec![MockResponse::json(
        200,
        r#"{"status":{"value":0.1234567890123456789012345678}}"#,
    )])
    .await;
    let commander = ApiCommander::builder(&server.url)
        .path_segment("api/json/v1/default_keyspace")
        .header("Token", "AstraCS:secret")
        .handle_decimals(true, true)
        .build()
        .unwrap();

    let price = astra_core::codec::decimal_to_value(&Decimal::from_str("123.4500").unwrap());
    let payload = json!({"insertOne": {"document": {"price": price}}});
    let response = commander
        .async_request(&ApiRequest::post(&payload))
        .await
        .unwrap();

    // outgoing: the decimal traveled as a bare number literal
    let sent = server.requests()[0].body.clone();
    assert!(sent.contains("123.4500"));
    assert!(!sent.contains("\"123.4500\""));

    // incoming: the high-precision number is recoverable without loss
    let number = response["status"]["value"].as_number().unwrap();
    let recovered = astra_core::codec::number_to_decimal(number).unwrap();
    assert_eq!(recovered, Decimal::from_str("0.1234567890123456789012345678").unwrap());
}

#[tokio::test]
async fn test_query_params_reach_the_wire() {
    let server = MockServer::start(vec![MockResponse::json(200, "[]")]).await;
    let commander = ApiCommander::builder(&server.url)
        .path_segment("v2")
        .family(ApiFamily::DevOpsApi)
        .build()
        .unwrap();

    let params = [("limit", "50".to_owned()), ("starting_after", "db-49".to_owned())];
    commander
        .async_request(
            &ApiRequest::get()
                .with_additional_path("databases")
                .with_params(&params),
        )
        .await
        .unwrap();

    let target = server.requests()[0].target.clone();
    assert!(target.starts_with("/v2/databases?"), "target was: {target}");
    assert!(target.contains("limit=50"));
    assert!(target.contains("starting_after=db-49"));
}

// The blocking path must run outside any async runtime.
#[test]
fn test_blocking_raw_request_exposes_status_and_headers() {
    let server = ThreadedMockServer::start(vec![MockResponse::json(201, r#"{"ok":1}"#)
        .with_header("Location", "new-db-id")]);
    let commander = ApiCommander::builder(&server.url)
        .path_segment("v2")
        .family(ApiFamily::DevOpsApi)
        .build()
        .unwrap();

    let payload = json!({"name": "mydb"});
    let raw = commander
        .raw_request(&ApiRequest::post(&payload).with_additional_path("databases"))
        .unwrap();
    assert_eq!(raw.status, 201);
    assert_eq!(raw.header("Location"), Some("new-db-id"));
    assert_eq!(raw.text, r#"{"ok":1}"#);
    assert_eq!(server.requests()[0].method, "POST");
}
