//! The HTTP command layer shared by both API surfaces.
//!
//! An [`ApiCommander`] is an immutable, cheaply-cloneable wrapper around one
//! fully-composed URL plus the headers to send with every request to it.
//! Facades hold one commander per scope (a database's Data API endpoint, the
//! DevOps API root) and funnel all their traffic through it. The commander
//! owns the whole request/response cycle: payload encoding, transport
//! dispatch through a pooled client, error mapping, response parsing, and
//! the `errors`/`warnings` interpretation rules of the two API families.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, OnceLock};

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE, USER_AGENT};
use serde_json::Value;
use tracing::{debug, warn};

use astra_core::{
    codec, error_descriptors, ApiFamily, Error, ErrorDescriptor, Result, TimeoutContext,
    FIXED_SECRET_PLACEHOLDER,
};

use crate::caller::{compose_user_agent, Caller};
use crate::config::default_redacted_header_names;

/// Lazily-constructed HTTP clients shared across commanders.
///
/// Both clients keep their connection pools alive for as long as the
/// `HttpPool` lives; commanders built from the same pool reuse the same
/// connections. The blocking client is only ever constructed if a
/// synchronous request is actually issued, so purely-async programs never
/// pay for it (and never trip the blocking client's refusal to be created
/// inside an async runtime).
#[derive(Debug, Default)]
pub struct HttpPool {
    async_client: OnceLock<reqwest::Client>,
    blocking_client: OnceLock<reqwest::blocking::Client>,
}

impl HttpPool {
    /// Creates an empty pool; clients are built on first use.
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide pool used by commanders unless one is injected.
    pub fn shared() -> Arc<HttpPool> {
        static SHARED: OnceLock<Arc<HttpPool>> = OnceLock::new();
        SHARED.get_or_init(|| Arc::new(HttpPool::new())).clone()
    }

    fn async_client(&self) -> &reqwest::Client {
        self.async_client.get_or_init(reqwest::Client::new)
    }

    fn blocking_client(&self) -> &reqwest::blocking::Client {
        self.blocking_client.get_or_init(reqwest::blocking::Client::new)
    }
}

/// The HTTP verbs the two API surfaces use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HttpMethod {
    /// Reads on the DevOps API.
    Get,
    /// Data API commands and DevOps API mutations (including keyspace
    /// creation).
    #[default]
    Post,
    /// Full-resource replacement on the DevOps API.
    Put,
    /// Partial updates on the DevOps API.
    Patch,
    /// Keyspace deletion on the DevOps API.
    Delete,
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
        }
    }
}

/// One request to be issued through a commander.
///
/// Borrowed throughout: building one allocates nothing beyond what the
/// caller already holds.
#[derive(Debug, Clone)]
pub struct ApiRequest<'a> {
    /// The HTTP verb.
    pub http_method: HttpMethod,
    /// The JSON body, if any.
    pub payload: Option<&'a Value>,
    /// Extra path segments appended below the commander's URL.
    pub additional_path: Option<&'a str>,
    /// Query-string parameters.
    pub request_params: &'a [(&'a str, String)],
    /// Whether a non-empty `errors` array in the response body is raised as
    /// an error. Disable to inspect error-bearing responses directly.
    pub raise_api_errors: bool,
    /// The resolved deadline for this attempt.
    pub timeout_context: TimeoutContext,
}

impl Default for ApiRequest<'_> {
    fn default() -> Self {
        Self {
            http_method: HttpMethod::default(),
            payload: None,
            additional_path: None,
            request_params: &[],
            raise_api_errors: true,
            timeout_context: TimeoutContext::default(),
        }
    }
}

impl<'a> ApiRequest<'a> {
    /// A POST request carrying a JSON payload (the Data API command shape).
    pub fn post(payload: &'a Value) -> Self {
        Self {
            payload: Some(payload),
            ..Self::default()
        }
    }

    /// A bodyless GET request.
    pub fn get() -> Self {
        Self {
            http_method: HttpMethod::Get,
            ..Self::default()
        }
    }

    /// Sets the HTTP verb.
    pub fn with_method(mut self, http_method: HttpMethod) -> Self {
        self.http_method = http_method;
        self
    }

    /// Appends extra path segments below the commander's URL.
    pub fn with_additional_path(mut self, additional_path: &'a str) -> Self {
        self.additional_path = Some(additional_path);
        self
    }

    /// Attaches query-string parameters.
    pub fn with_params(mut self, request_params: &'a [(&'a str, String)]) -> Self {
        self.request_params = request_params;
        self
    }

    /// Attaches the resolved deadline.
    pub fn with_timeout(mut self, timeout_context: TimeoutContext) -> Self {
        self.timeout_context = timeout_context;
        self
    }

    /// Keeps error-bearing response bodies instead of raising them.
    pub fn keep_api_errors(mut self) -> Self {
        self.raise_api_errors = false;
        self
    }
}

/// The raw outcome of a successful (2xx) HTTP exchange.
#[derive(Debug, Clone)]
pub struct RawApiResponse {
    /// The HTTP status code (some DevOps operations distinguish 201/202).
    pub status: u16,
    /// The response headers.
    pub headers: HeaderMap,
    /// The literal response body.
    pub text: String,
}

impl RawApiResponse {
    /// Looks up a response header as text.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }
}

/// Normalizes path pieces into one clean `a/b/c` string.
///
/// Pieces may themselves contain slashes; empty pieces and redundant
/// slashes vanish, which makes composition idempotent.
pub fn join_path_segments<S: AsRef<str>>(segments: &[S]) -> String {
    segments
        .iter()
        .flat_map(|segment| segment.as_ref().split('/'))
        .filter(|piece| !piece.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// Builder for [`ApiCommander`].
#[derive(Debug)]
pub struct ApiCommanderBuilder {
    api_endpoint: String,
    path_segments: Vec<String>,
    headers: Vec<(String, String)>,
    callers: Vec<Caller>,
    redacted_header_names: HashSet<String>,
    family: ApiFamily,
    handle_decimals_writes: bool,
    handle_decimals_reads: bool,
    pool: Option<Arc<HttpPool>>,
}

impl ApiCommanderBuilder {
    fn new(api_endpoint: impl Into<String>) -> Self {
        Self {
            api_endpoint: api_endpoint.into(),
            path_segments: Vec::new(),
            headers: Vec::new(),
            callers: Vec::new(),
            redacted_header_names: default_redacted_header_names(),
            family: ApiFamily::DataApi,
            handle_decimals_writes: false,
            handle_decimals_reads: false,
            pool: None,
        }
    }

    /// Appends a path piece below the endpoint (may contain slashes).
    pub fn path_segment(mut self, segment: impl Into<String>) -> Self {
        self.path_segments.push(segment.into());
        self
    }

    /// Adds a header sent with every request.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Adds a header only when a value is present.
    pub fn optional_header(self, name: impl Into<String>, value: Option<String>) -> Self {
        match value {
            Some(value) => self.header(name, value),
            None => self,
        }
    }

    /// Registers a caller identity for the composed `User-Agent`.
    pub fn caller(mut self, caller: Caller) -> Self {
        self.callers.push(caller);
        self
    }

    /// Marks one more header name as secret in logs.
    pub fn redact_header(mut self, name: impl Into<String>) -> Self {
        self.redacted_header_names.insert(name.into());
        self
    }

    /// Tags the commander with the API surface it talks to.
    pub fn family(mut self, family: ApiFamily) -> Self {
        self.family = family;
        self
    }

    /// Enables the decimal-aware codec for payloads, responses, or both.
    pub fn handle_decimals(mut self, writes: bool, reads: bool) -> Self {
        self.handle_decimals_writes = writes;
        self.handle_decimals_reads = reads;
        self
    }

    /// Injects an HTTP pool (defaults to [`HttpPool::shared`]).
    pub fn pool(mut self, pool: Arc<HttpPool>) -> Self {
        self.pool = Some(pool);
        self
    }

    /// Validates the settings and assembles the commander.
    ///
    /// Fails with [`Error::Configuration`] on an empty endpoint or a header
    /// name/value the HTTP layer cannot represent.
    pub fn build(self) -> Result<ApiCommander> {
        if self.api_endpoint.trim().is_empty() {
            return Err(Error::Configuration("the API endpoint must not be empty".to_owned()));
        }

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let user_agent = compose_user_agent(&self.callers);
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&user_agent)
                .map_err(|e| Error::Configuration(format!("invalid User-Agent '{user_agent}': {e}")))?,
        );
        for (name, value) in &self.headers {
            let header_name = HeaderName::try_from(name.as_str())
                .map_err(|e| Error::Configuration(format!("invalid header name '{name}': {e}")))?;
            let header_value = HeaderValue::from_str(value)
                .map_err(|e| Error::Configuration(format!("invalid value for header '{name}': {e}")))?;
            headers.insert(header_name, header_value);
        }

        let redacted_names: HashSet<String> = self
            .redacted_header_names
            .iter()
            .map(|name| name.to_uppercase())
            .collect();
        let loggable_headers: HashMap<String, String> = headers
            .iter()
            .map(|(name, value)| {
                let rendered = if redacted_names.contains(&name.as_str().to_uppercase()) {
                    FIXED_SECRET_PLACEHOLDER.to_owned()
                } else {
                    value.to_str().unwrap_or(FIXED_SECRET_PLACEHOLDER).to_owned()
                };
                (name.as_str().to_owned(), rendered)
            })
            .collect();

        let api_endpoint = self.api_endpoint.trim_end_matches('/').to_owned();
        let path = join_path_segments(&self.path_segments);
        let full_url = if path.is_empty() {
            api_endpoint.clone()
        } else {
            format!("{api_endpoint}/{path}")
        };

        Ok(ApiCommander {
            api_endpoint,
            path,
            full_url,
            headers,
            loggable_headers,
            family: self.family,
            handle_decimals_writes: self.handle_decimals_writes,
            handle_decimals_reads: self.handle_decimals_reads,
            pool: self.pool.unwrap_or_else(HttpPool::shared),
        })
    }
}

/// An immutable HTTP wrapper around one composed URL.
#[derive(Debug, Clone)]
pub struct ApiCommander {
    api_endpoint: String,
    path: String,
    full_url: String,
    headers: HeaderMap,
    loggable_headers: HashMap<String, String>,
    family: ApiFamily,
    handle_decimals_writes: bool,
    handle_decimals_reads: bool,
    pool: Arc<HttpPool>,
}

impl ApiCommander {
    /// Starts building a commander rooted at an API endpoint.
    pub fn builder(api_endpoint: impl Into<String>) -> ApiCommanderBuilder {
        ApiCommanderBuilder::new(api_endpoint)
    }

    /// The endpoint this commander was rooted at.
    pub fn api_endpoint(&self) -> &str {
        &self.api_endpoint
    }

    /// The normalized path below the endpoint.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The fully-composed URL all requests go to.
    pub fn full_url(&self) -> &str {
        &self.full_url
    }

    /// Which API surface this commander talks to.
    pub fn family(&self) -> ApiFamily {
        self.family
    }

    /// The headers as they may appear in logs (secrets already replaced).
    pub fn loggable_headers(&self) -> &HashMap<String, String> {
        &self.loggable_headers
    }

    fn request_url(&self, additional_path: Option<&str>) -> String {
        match additional_path {
            Some(extra) => {
                let cleaned = join_path_segments(&[extra]);
                if cleaned.is_empty() {
                    self.full_url.clone()
                } else {
                    format!("{}/{}", self.full_url, cleaned)
                }
            }
            None => self.full_url.clone(),
        }
    }

    fn encode(&self, payload: Option<&Value>) -> Result<Option<String>> {
        codec::encode_payload(payload, self.handle_decimals_writes)
    }

    fn log_outgoing(&self, request: &ApiRequest<'_>, url: &str) {
        debug!(
            family = %self.family,
            method = ?request.http_method,
            url,
            headers = ?self.loggable_headers,
            timeout_ms = ?request.timeout_context.request_ms,
            "issuing API request"
        );
    }

    fn timeout_message(context: &TimeoutContext) -> String {
        match (context.request_ms, context.label) {
            (Some(ms), Some(label)) => {
                format!("HTTP request timed out (timeout honoured: {ms} ms, set by '{label}')")
            }
            (Some(ms), None) => format!("HTTP request timed out (timeout honoured: {ms} ms)"),
            _ => "HTTP request timed out".to_owned(),
        }
    }

    fn map_send_error(&self, err: reqwest::Error, context: &TimeoutContext) -> Error {
        if err.is_timeout() {
            Error::Timeout {
                family: self.family,
                message: Self::timeout_message(context),
                context: *context,
            }
        } else {
            Error::Connection {
                family: self.family,
                message: err.to_string(),
            }
        }
    }

    fn finish_raw(&self, status: u16, headers: HeaderMap, text: String) -> Result<RawApiResponse> {
        debug!(family = %self.family, status, body_bytes = text.len(), "API response received");
        if !(200..300).contains(&status) {
            return Err(Error::http(self.family, status, text));
        }
        Ok(RawApiResponse { status, headers, text })
    }

    /// Issues one HTTP request synchronously, returning the raw 2xx outcome.
    ///
    /// Must not be called from inside an async runtime; use
    /// [`async_raw_request`](Self::async_raw_request) there.
    pub fn raw_request(&self, request: &ApiRequest<'_>) -> Result<RawApiResponse> {
        let body = self.encode(request.payload)?;
        let url = self.request_url(request.additional_path);
        self.log_outgoing(request, &url);

        let mut builder = self
            .pool
            .blocking_client()
            .request(request.http_method.into(), &url)
            .headers(self.headers.clone())
            .query(request.request_params);
        if let Some(timeout) = request.timeout_context.request_timeout() {
            builder = builder.timeout(timeout);
        }
        if let Some(body) = body {
            builder = builder.body(body);
        }

        let response = builder
            .send()
            .map_err(|e| self.map_send_error(e, &request.timeout_context))?;
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let text = response
            .text()
            .map_err(|e| self.map_send_error(e, &request.timeout_context))?;
        self.finish_raw(status, headers, text)
    }

    /// Issues one HTTP request, returning the raw 2xx outcome.
    pub async fn async_raw_request(&self, request: &ApiRequest<'_>) -> Result<RawApiResponse> {
        let body = self.encode(request.payload)?;
        let url = self.request_url(request.additional_path);
        self.log_outgoing(request, &url);

        let mut builder = self
            .pool
            .async_client()
            .request(request.http_method.into(), &url)
            .headers(self.headers.clone())
            .query(request.request_params);
        if let Some(timeout) = request.timeout_context.request_timeout() {
            builder = builder.timeout(timeout);
        }
        if let Some(body) = body {
            builder = builder.body(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| self.map_send_error(e, &request.timeout_context))?;
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let text = response
            .text()
            .await
            .map_err(|e| self.map_send_error(e, &request.timeout_context))?;
        self.finish_raw(status, headers, text)
    }

    /// Issues one request synchronously and interprets the body as JSON.
    pub fn request(&self, request: &ApiRequest<'_>) -> Result<Value> {
        let raw = self.raw_request(request)?;
        self.response_to_json(&raw, request.payload, request.raise_api_errors)
    }

    /// Issues one request and interprets the body as JSON.
    pub async fn async_request(&self, request: &ApiRequest<'_>) -> Result<Value> {
        let raw = self.async_raw_request(request).await?;
        self.response_to_json(&raw, request.payload, request.raise_api_errors)
    }

    /// Interprets a raw 2xx response body under the family's rules.
    ///
    /// Parsing runs through the codec in this commander's decimal mode. A
    /// non-empty `errors` array is raised as [`Error::ApiResponse`] (unless
    /// `raise_api_errors` is off), taking precedence over warnings. Data API
    /// `status.warnings` items are logged and never affect the outcome.
    pub fn response_to_json(
        &self,
        raw: &RawApiResponse,
        command: Option<&Value>,
        raise_api_errors: bool,
    ) -> Result<Value> {
        let parsed = match codec::parse_response(&raw.text, self.handle_decimals_reads) {
            Ok(parsed) => parsed,
            Err(e) => {
                return Err(Error::UnexpectedResponse {
                    family: self.family,
                    message: format!(
                        "unparseable response to command '{}': {e}",
                        describe_command(command),
                    ),
                    raw_text: raw.text.clone(),
                });
            }
        };

        if raise_api_errors && !error_descriptors(&parsed).is_empty() {
            return Err(Error::api_response(self.family, command.cloned(), parsed));
        }

        if self.family == ApiFamily::DataApi {
            if let Some(warnings) = parsed
                .get("status")
                .and_then(|status| status.get("warnings"))
                .and_then(Value::as_array)
            {
                for warning in warnings {
                    let summary = ErrorDescriptor::from_value(warning).summary();
                    warn!(
                        command = %describe_command(command),
                        warning = %summary,
                        "the API returned a warning"
                    );
                }
            }
        }

        Ok(parsed)
    }
}

/// Names a command by its sorted top-level keys, for messages and logs.
fn describe_command(command: Option<&Value>) -> String {
    let keys: Vec<&str> = command
        .and_then(Value::as_object)
        .map(|fields| fields.keys().map(String::as_str).collect())
        .unwrap_or_default();
    if keys.is_empty() {
        "(none)".to_owned()
    } else {
        let mut keys = keys;
        keys.sort_unstable();
        keys.join("/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn test_commander() -> ApiCommander {
        ApiCommander::builder("http://localhost:1")
            .path_segment("api/json")
            .path_segment("v1")
            .header("Token", "AstraCS:secret")
            .family(ApiFamily::DataApi)
            .build()
            .unwrap()
    }

    #[test]
    fn test_join_path_segments_is_idempotent() {
        let once = join_path_segments(&["api/json", "v1", "ks", "coll"]);
        assert_eq!(once, "api/json/v1/ks/coll");
        assert_eq!(join_path_segments(&[once.as_str()]), "api/json/v1/ks/coll");
        assert_eq!(join_path_segments(&["//api//json/", "", "/v1/"]), "api/json/v1");
    }

    #[test]
    fn test_full_url_composition() {
        let commander = ApiCommander::builder("https://db.example.com/")
            .path_segment("api/json")
            .path_segment("/v1/")
            .path_segment("default_keyspace")
            .build()
            .unwrap();
        assert_eq!(commander.full_url(), "https://db.example.com/api/json/v1/default_keyspace");
        assert_eq!(commander.path(), "api/json/v1/default_keyspace");
    }

    #[test]
    fn test_request_url_with_additional_path() {
        let commander = test_commander();
        assert_eq!(
            commander.request_url(Some("/collections//movies/")),
            format!("{}/collections/movies", commander.full_url()),
        );
        assert_eq!(commander.request_url(None), commander.full_url());
    }

    #[test]
    fn test_builder_rejects_empty_endpoint() {
        let err = ApiCommander::builder("  ").build().unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_builder_rejects_bad_header_name() {
        let err = ApiCommander::builder("http://localhost:1")
            .header("bad header name", "v")
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_loggable_headers_redact_secrets() {
        let commander = ApiCommander::builder("http://localhost:1")
            .header("Token", "AstraCS:secret")
            .header("X-Custom-Trace", "trace-1")
            .header("X-My-Secret", "hidden")
            .redact_header("X-My-Secret")
            .build()
            .unwrap();
        let loggable = commander.loggable_headers();
        assert_eq!(loggable.get("token").map(String::as_str), Some("***"));
        assert_eq!(loggable.get("x-my-secret").map(String::as_str), Some("***"));
        assert_eq!(loggable.get("x-custom-trace").map(String::as_str), Some("trace-1"));
        // the real header map still carries the secret for the wire
        assert_eq!(
            commander.headers.get("Token").and_then(|v| v.to_str().ok()),
            Some("AstraCS:secret"),
        );
    }

    #[test]
    fn test_user_agent_is_always_set() {
        let commander = ApiCommander::builder("http://localhost:1")
            .caller(Caller::new("myapp", "2.0"))
            .build()
            .unwrap();
        let user_agent = commander
            .headers
            .get(USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .unwrap();
        assert!(user_agent.starts_with("myapp/2.0 "));
    }

    #[test]
    fn test_describe_command_sorted_keys() {
        assert_eq!(describe_command(Some(&json!({"b": 1, "a": 2}))), "a/b");
        assert_eq!(describe_command(Some(&json!({"findCollections": {}}))), "findCollections");
        assert_eq!(describe_command(None), "(none)");
        assert_eq!(describe_command(Some(&json!([1, 2]))), "(none)");
    }

    #[test]
    fn test_response_to_json_raises_api_errors() {
        let commander = test_commander();
        let raw = RawApiResponse {
            status: 200,
            headers: HeaderMap::new(),
            text: r#"{"errors":[{"errorCode":"EXISTING_COLLECTION","message":"already there"}]}"#
                .to_owned(),
        };
        let command = json!({"createCollection": {"name": "movies"}});
        let err = commander
            .response_to_json(&raw, Some(&command), true)
            .unwrap_err();
        match err {
            Error::ApiResponse {
                command: Some(cmd),
                error_descriptors,
                ..
            } => {
                assert_eq!(cmd, command);
                assert_eq!(
                    error_descriptors[0].error_code.as_deref(),
                    Some("EXISTING_COLLECTION"),
                );
            }
            other => panic!("unexpected error variant: {other:?}"),
        }
    }

    #[test]
    fn test_response_to_json_can_keep_api_errors() {
        let commander = test_commander();
        let raw = RawApiResponse {
            status: 200,
            headers: HeaderMap::new(),
            text: r#"{"errors":[{"message":"boom"}]}"#.to_owned(),
        };
        let parsed = commander.response_to_json(&raw, None, false).unwrap();
        assert_eq!(parsed["errors"][0]["message"], json!("boom"));
    }

    #[test]
    fn test_response_to_json_unparseable_body_names_command() {
        let commander = test_commander();
        let raw = RawApiResponse {
            status: 200,
            headers: HeaderMap::new(),
            text: "<html>gateway</html>".to_owned(),
        };
        let command = json!({"findCollections": {}});
        let err = commander
            .response_to_json(&raw, Some(&command), true)
            .unwrap_err();
        match err {
            Error::UnexpectedResponse { message, raw_text, .. } => {
                assert!(message.contains("findCollections"));
                assert_eq!(raw_text, "<html>gateway</html>");
            }
            other => panic!("unexpected error variant: {other:?}"),
        }
    }

    #[test]
    fn test_response_to_json_warnings_do_not_fail() {
        let commander = test_commander();
        let raw = RawApiResponse {
            status: 200,
            headers: HeaderMap::new(),
            text: r#"{"status":{"warnings":[{"message":"deprecated sort"}],"count":1}}"#.to_owned(),
        };
        let parsed = commander.response_to_json(&raw, None, true).unwrap();
        assert_eq!(parsed["status"]["count"], json!(1));
    }

    #[test]
    fn test_api_errors_take_precedence_over_warnings() {
        let commander = test_commander();
        let raw = RawApiResponse {
            status: 200,
            headers: HeaderMap::new(),
            text: r#"{
                "errors": [{"errorCode": "BAD_QUERY", "message": "cannot run this"}],
                "status": {"warnings": [{"message": "deprecated sort"}]}
            }"#
            .to_owned(),
        };
        let err = commander.response_to_json(&raw, None, true).unwrap_err();
        match err {
            Error::ApiResponse {
                message,
                error_descriptors,
                ..
            } => {
                assert!(message.contains("BAD_QUERY"));
                assert_eq!(error_descriptors.len(), 1);
            }
            other => panic!("unexpected error variant: {other:?}"),
        }
    }

    #[test]
    fn test_timeout_message_names_the_parameter() {
        let context = TimeoutContext::new(Some(150)).with_label("request_timeout_ms");
        let message = ApiCommander::timeout_message(&context);
        assert!(message.contains("150 ms"));
        assert!(message.contains("'request_timeout_ms'"));
    }

    #[test]
    fn test_raw_response_header_lookup() {
        let mut headers = HeaderMap::new();
        headers.insert("Location", HeaderValue::from_static("abc-123"));
        let raw = RawApiResponse {
            status: 201,
            headers,
            text: String::new(),
        };
        assert_eq!(raw.header("Location"), Some("abc-123"));
        assert_eq!(raw.header("location"), Some("abc-123"));
        assert_eq!(raw.header("Missing"), None);
    }
}
