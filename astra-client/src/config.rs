//! Client configuration: environments, defaults, and layered timeout options.

use std::collections::HashSet;
use std::time::Duration;

/// Default per-HTTP-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;
/// Default timeout for general (single-command) method calls.
pub const DEFAULT_GENERAL_METHOD_TIMEOUT_MS: u64 = 30_000;
/// Default timeout for collection-admin operations.
pub const DEFAULT_COLLECTION_ADMIN_TIMEOUT_MS: u64 = 60_000;
/// Default timeout for table-admin operations.
pub const DEFAULT_TABLE_ADMIN_TIMEOUT_MS: u64 = 30_000;
/// Default timeout for database lifecycle operations (create + poll).
pub const DEFAULT_DATABASE_ADMIN_TIMEOUT_MS: u64 = 600_000;
/// Default timeout for keyspace lifecycle operations.
pub const DEFAULT_KEYSPACE_ADMIN_TIMEOUT_MS: u64 = 30_000;

/// The keyspace used when none is specified.
pub const DEFAULT_KEYSPACE: &str = "default_keyspace";

/// Header carrying the token on Data API requests.
pub const DEFAULT_DATA_API_AUTH_HEADER: &str = "Token";
/// Header carrying the token on DevOps API requests.
pub const DEFAULT_DEV_OPS_AUTH_HEADER: &str = "Authorization";
/// Scheme prefix for the DevOps API auth header value.
pub const DEFAULT_DEV_OPS_AUTH_PREFIX: &str = "Bearer ";

/// Header carrying an embedding-provider API key.
pub const EMBEDDING_HEADER_API_KEY: &str = "X-Embedding-Api-Key";
/// Header carrying an embedding-provider access id (AWS-style).
pub const EMBEDDING_HEADER_AWS_ACCESS_ID: &str = "X-Embedding-Access-Id";
/// Header carrying an embedding-provider secret id (AWS-style).
pub const EMBEDDING_HEADER_AWS_SECRET_ID: &str = "X-Embedding-Secret-Id";
/// Header carrying a reranking-provider API key.
pub const RERANKING_HEADER_API_KEY: &str = "X-Rerank-Api-Key";

/// How often to poll the DevOps API while a database is being provisioned.
pub const DATABASE_POLL_INTERVAL: Duration = Duration::from_secs(15);
/// How often to poll the DevOps API while a keyspace change is applied.
pub const KEYSPACE_POLL_INTERVAL: Duration = Duration::from_secs(2);
/// Page size used when listing databases.
pub const DEFAULT_DATABASES_PAGE_SIZE: usize = 50;

/// Header names whose values must never appear verbatim in logs.
///
/// Every commander redacts these in addition to any caller-supplied names.
pub fn default_redacted_header_names() -> HashSet<String> {
    [
        DEFAULT_DATA_API_AUTH_HEADER,
        DEFAULT_DEV_OPS_AUTH_HEADER,
        EMBEDDING_HEADER_API_KEY,
        EMBEDDING_HEADER_AWS_ACCESS_ID,
        EMBEDDING_HEADER_AWS_SECRET_ID,
        RERANKING_HEADER_API_KEY,
    ]
    .iter()
    .map(|name| name.to_string())
    .collect()
}

/// The deployment flavor a client targets.
///
/// The managed environments (`Prod`, `Dev`, `Test`) carry both API surfaces;
/// self-hosted flavors expose only the Data API and have no control plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Environment {
    /// The managed production environment.
    #[default]
    Prod,
    /// The managed development environment.
    Dev,
    /// The managed test environment.
    Test,
    /// A self-hosted DSE deployment.
    Dse,
    /// A self-hosted HCD deployment.
    Hcd,
    /// A self-hosted Cassandra deployment.
    Cassandra,
    /// Any other self-hosted Data API deployment.
    Other,
}

impl Environment {
    /// The path prefix under which the Data API is served.
    pub fn api_path(&self) -> &'static str {
        match self {
            Environment::Prod | Environment::Dev | Environment::Test => "api/json",
            _ => "",
        }
    }

    /// The Data API version path segment.
    pub fn api_version(&self) -> &'static str {
        "v1"
    }

    /// The DevOps API base URL, where a control plane exists.
    pub fn dev_ops_url(&self) -> Option<&'static str> {
        match self {
            Environment::Prod => Some("https://api.astra.datastax.com"),
            Environment::Dev => Some("https://api.dev.cloud.datastax.com"),
            Environment::Test => Some("https://api.test.cloud.datastax.com"),
            _ => None,
        }
    }

    /// The DevOps API version path segment.
    pub fn dev_ops_api_version(&self) -> &'static str {
        "v2"
    }

    /// Whether this environment has a control plane at all.
    pub fn supports_dev_ops_api(&self) -> bool {
        self.dev_ops_url().is_some()
    }
}

/// A partial, overridable record of timeout settings.
///
/// Each field is independently "unset" (`None`, meaning: inherit from the
/// record this is applied onto) or "set" (`Some(ms)`, where an explicit
/// zero is a real value meaning "no deadline").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimeoutOptions {
    /// Deadline for one HTTP request.
    pub request_timeout_ms: Option<u64>,
    /// Overall budget for general single-command methods.
    pub general_method_timeout_ms: Option<u64>,
    /// Overall budget for collection-admin operations.
    pub collection_admin_timeout_ms: Option<u64>,
    /// Overall budget for table-admin operations.
    pub table_admin_timeout_ms: Option<u64>,
    /// Overall budget for database lifecycle operations.
    pub database_admin_timeout_ms: Option<u64>,
    /// Overall budget for keyspace lifecycle operations.
    pub keyspace_admin_timeout_ms: Option<u64>,
}

/// A fully-resolved record of timeout settings: no field is ever unset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FullTimeoutOptions {
    /// Deadline for one HTTP request.
    pub request_timeout_ms: u64,
    /// Overall budget for general single-command methods.
    pub general_method_timeout_ms: u64,
    /// Overall budget for collection-admin operations.
    pub collection_admin_timeout_ms: u64,
    /// Overall budget for table-admin operations.
    pub table_admin_timeout_ms: u64,
    /// Overall budget for database lifecycle operations.
    pub database_admin_timeout_ms: u64,
    /// Overall budget for keyspace lifecycle operations.
    pub keyspace_admin_timeout_ms: u64,
}

impl Default for FullTimeoutOptions {
    fn default() -> Self {
        Self {
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            general_method_timeout_ms: DEFAULT_GENERAL_METHOD_TIMEOUT_MS,
            collection_admin_timeout_ms: DEFAULT_COLLECTION_ADMIN_TIMEOUT_MS,
            table_admin_timeout_ms: DEFAULT_TABLE_ADMIN_TIMEOUT_MS,
            database_admin_timeout_ms: DEFAULT_DATABASE_ADMIN_TIMEOUT_MS,
            keyspace_admin_timeout_ms: DEFAULT_KEYSPACE_ADMIN_TIMEOUT_MS,
        }
    }
}

impl FullTimeoutOptions {
    /// Applies a partial record onto this one.
    ///
    /// The result is again fully resolved: every field is the override's
    /// value where set, this record's value otherwise.
    pub fn with_override(&self, overrides: &TimeoutOptions) -> FullTimeoutOptions {
        FullTimeoutOptions {
            request_timeout_ms: overrides.request_timeout_ms.unwrap_or(self.request_timeout_ms),
            general_method_timeout_ms: overrides
                .general_method_timeout_ms
                .unwrap_or(self.general_method_timeout_ms),
            collection_admin_timeout_ms: overrides
                .collection_admin_timeout_ms
                .unwrap_or(self.collection_admin_timeout_ms),
            table_admin_timeout_ms: overrides
                .table_admin_timeout_ms
                .unwrap_or(self.table_admin_timeout_ms),
            database_admin_timeout_ms: overrides
                .database_admin_timeout_ms
                .unwrap_or(self.database_admin_timeout_ms),
            keyspace_admin_timeout_ms: overrides
                .keyspace_admin_timeout_ms
                .unwrap_or(self.keyspace_admin_timeout_ms),
        }
    }
}
