//! The Data API facade: keyspace-scoped commands against one database.
//!
//! A [`Database`] wraps one commander rooted at
//! `{api_endpoint}/{api_path}/{version}/{keyspace}` and exposes the
//! keyspace-level commands (collection listing and lifecycle) plus a
//! general [`command`](Database::command) escape hatch for anything else
//! the JSON protocol accepts.

use std::fmt;
use std::sync::Arc;

use serde_json::{json, Value};
use tracing::info;

use astra_core::{ApiFamily, Error, Result};

use crate::auth::{StaticTokenProvider, TokenProvider};
use crate::caller::Caller;
use crate::commander::{ApiCommander, ApiRequest, HttpPool};
use crate::config::{
    Environment, FullTimeoutOptions, TimeoutOptions, DEFAULT_DATA_API_AUTH_HEADER,
    DEFAULT_KEYSPACE, EMBEDDING_HEADER_API_KEY, RERANKING_HEADER_API_KEY,
};
use crate::timeouts::{MultiCallTimeoutManager, TimeoutOverride};

#[derive(Clone)]
struct DatabaseConfig {
    api_endpoint: String,
    token_provider: Option<Arc<dyn TokenProvider>>,
    environment: Environment,
    keyspace: String,
    callers: Vec<Caller>,
    embedding_api_key: Option<String>,
    reranking_api_key: Option<String>,
    timeout_options: FullTimeoutOptions,
    handle_decimals_writes: bool,
    handle_decimals_reads: bool,
    pool: Option<Arc<HttpPool>>,
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("api_endpoint", &self.api_endpoint)
            .field("environment", &self.environment)
            .field("keyspace", &self.keyspace)
            .field("token_provider", &self.token_provider.as_ref().map(|_| "***"))
            .finish_non_exhaustive()
    }
}

impl DatabaseConfig {
    fn build_commander(&self, collection: Option<&str>) -> Result<ApiCommander> {
        let token = self.token_provider.as_ref().and_then(|provider| provider.token());
        let mut builder = ApiCommander::builder(&self.api_endpoint)
            .path_segment(self.environment.api_path())
            .path_segment(self.environment.api_version())
            .path_segment(&self.keyspace)
            .family(ApiFamily::DataApi)
            .optional_header(DEFAULT_DATA_API_AUTH_HEADER, token)
            .optional_header(EMBEDDING_HEADER_API_KEY, self.embedding_api_key.clone())
            .optional_header(RERANKING_HEADER_API_KEY, self.reranking_api_key.clone())
            .handle_decimals(self.handle_decimals_writes, self.handle_decimals_reads);
        if let Some(collection) = collection {
            builder = builder.path_segment(collection);
        }
        for caller in &self.callers {
            builder = builder.caller(caller.clone());
        }
        if let Some(pool) = &self.pool {
            builder = builder.pool(pool.clone());
        }
        builder.build()
    }
}

/// Builder for [`Database`].
#[derive(Debug)]
pub struct DatabaseBuilder {
    config: DatabaseConfig,
}

impl DatabaseBuilder {
    fn new(api_endpoint: impl Into<String>) -> Self {
        Self {
            config: DatabaseConfig {
                api_endpoint: api_endpoint.into(),
                token_provider: None,
                environment: Environment::default(),
                keyspace: DEFAULT_KEYSPACE.to_owned(),
                callers: Vec::new(),
                embedding_api_key: None,
                reranking_api_key: None,
                timeout_options: FullTimeoutOptions::default(),
                handle_decimals_writes: false,
                handle_decimals_reads: false,
                pool: None,
            },
        }
    }

    /// Authenticates with a fixed token string.
    pub fn token(self, token: impl Into<String>) -> Self {
        self.token_provider(Arc::new(StaticTokenProvider::new(token.into())))
    }

    /// Authenticates through a custom token source.
    pub fn token_provider(mut self, provider: Arc<dyn TokenProvider>) -> Self {
        self.config.token_provider = Some(provider);
        self
    }

    /// Targets a non-default deployment flavor.
    pub fn environment(mut self, environment: Environment) -> Self {
        self.config.environment = environment;
        self
    }

    /// Scopes to a keyspace other than the default.
    pub fn keyspace(mut self, keyspace: impl Into<String>) -> Self {
        self.config.keyspace = keyspace.into();
        self
    }

    /// Registers a caller identity for the composed `User-Agent`.
    pub fn caller(mut self, caller: Caller) -> Self {
        self.config.callers.push(caller);
        self
    }

    /// Sends an embedding-provider API key with every request.
    pub fn embedding_api_key(mut self, key: impl Into<String>) -> Self {
        self.config.embedding_api_key = Some(key.into());
        self
    }

    /// Sends a reranking-provider API key with every request.
    pub fn reranking_api_key(mut self, key: impl Into<String>) -> Self {
        self.config.reranking_api_key = Some(key.into());
        self
    }

    /// Applies timeout overrides on top of the defaults.
    pub fn timeout_options(mut self, overrides: &TimeoutOptions) -> Self {
        self.config.timeout_options = self.config.timeout_options.with_override(overrides);
        self
    }

    /// Enables the decimal-aware codec for payloads, responses, or both.
    pub fn handle_decimals(mut self, writes: bool, reads: bool) -> Self {
        self.config.handle_decimals_writes = writes;
        self.config.handle_decimals_reads = reads;
        self
    }

    /// Injects an HTTP pool (defaults to the process-wide one).
    pub fn pool(mut self, pool: Arc<HttpPool>) -> Self {
        self.config.pool = Some(pool);
        self
    }

    /// Validates the settings and assembles the facade.
    pub fn build(self) -> Result<Database> {
        let commander = self.config.build_commander(None)?;
        Ok(Database {
            config: self.config,
            commander,
        })
    }
}

/// A keyspace-scoped handle on one database's Data API.
#[derive(Debug, Clone)]
pub struct Database {
    config: DatabaseConfig,
    commander: ApiCommander,
}

impl Database {
    /// Starts building a handle on the database at `api_endpoint`.
    pub fn builder(api_endpoint: impl Into<String>) -> DatabaseBuilder {
        DatabaseBuilder::new(api_endpoint)
    }

    /// The database's API endpoint.
    pub fn api_endpoint(&self) -> &str {
        &self.config.api_endpoint
    }

    /// The keyspace this handle is scoped to.
    pub fn keyspace(&self) -> &str {
        &self.config.keyspace
    }

    /// A handle on the same database scoped to another keyspace.
    pub fn use_keyspace(&self, keyspace: impl Into<String>) -> Result<Database> {
        let mut config = self.config.clone();
        config.keyspace = keyspace.into();
        let commander = config.build_commander(None)?;
        Ok(Database { config, commander })
    }

    /// Derives a commander addressed to one collection
    /// (`.../{keyspace}/{collection}`), for callers issuing their own
    /// collection-level commands.
    pub fn collection_commander(&self, collection: &str) -> Result<ApiCommander> {
        self.config.build_commander(Some(collection))
    }

    /// Runs one JSON command against the keyspace, returning the full
    /// parsed response (a reported `errors` array is raised).
    pub async fn command(&self, payload: &Value, overrides: TimeoutOverride) -> Result<Value> {
        self.run_command(
            payload,
            overrides,
            self.config.timeout_options.general_method_timeout_ms,
            "general_method_timeout_ms",
        )
        .await
    }

    /// Lists the names of the keyspace's collections.
    pub async fn list_collection_names(&self, overrides: TimeoutOverride) -> Result<Vec<String>> {
        let payload = json!({"findCollections": {}});
        let response = self
            .run_command(
                &payload,
                overrides,
                self.config.timeout_options.collection_admin_timeout_ms,
                "collection_admin_timeout_ms",
            )
            .await?;
        response
            .get("status")
            .and_then(|status| status.get("collections"))
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_owned)
                    .collect()
            })
            .ok_or_else(|| Error::UnexpectedResponse {
                family: ApiFamily::DataApi,
                message: "no 'status.collections' in the findCollections response".to_owned(),
                raw_text: response.to_string(),
            })
    }

    /// Creates a collection, optionally with a definition (vector settings,
    /// indexing rules and so on).
    pub async fn create_collection(
        &self,
        name: &str,
        definition: Option<&Value>,
        overrides: TimeoutOverride,
    ) -> Result<()> {
        let mut body = json!({"name": name});
        if let Some(definition) = definition {
            body["options"] = definition.clone();
        }
        let payload = json!({"createCollection": body});
        self.run_command(
            &payload,
            overrides,
            self.config.timeout_options.collection_admin_timeout_ms,
            "collection_admin_timeout_ms",
        )
        .await?;
        info!(keyspace = %self.config.keyspace, collection = name, "collection created");
        Ok(())
    }

    /// Drops a collection (succeeds whether or not it existed).
    pub async fn drop_collection(&self, name: &str, overrides: TimeoutOverride) -> Result<()> {
        let payload = json!({"deleteCollection": {"name": name}});
        self.run_command(
            &payload,
            overrides,
            self.config.timeout_options.collection_admin_timeout_ms,
            "collection_admin_timeout_ms",
        )
        .await?;
        info!(keyspace = %self.config.keyspace, collection = name, "collection dropped");
        Ok(())
    }

    async fn run_command(
        &self,
        payload: &Value,
        overrides: TimeoutOverride,
        method_default_ms: u64,
        method_default_label: &'static str,
    ) -> Result<Value> {
        let (method_ms, method_label) =
            overrides.resolve_method(method_default_ms, method_default_label);
        let (request_ms, request_label) = overrides.resolve_request(&self.config.timeout_options);
        let manager =
            MultiCallTimeoutManager::new(Some(method_ms), ApiFamily::DataApi).with_label(method_label);
        let context = manager.remaining_timeout(Some(request_ms), request_label)?;
        self.commander
            .async_request(&ApiRequest::post(payload).with_timeout(context))
            .await
    }
}
