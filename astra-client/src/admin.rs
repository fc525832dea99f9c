//! Control-plane facades: database and keyspace lifecycle over the DevOps API.
//!
//! [`AstraDbAdmin`] is the account-level entry point (list, create, drop
//! databases); [`AstraDbDatabaseAdmin`] is scoped to one database and manages
//! its keyspaces. Lifecycle operations are asynchronous on the server side,
//! so the mutating methods optionally poll the database status until the
//! requested change has fully landed, under one overall timeout budget.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tracing::{debug, info};

use astra_core::{ApiFamily, Error, Result};

use crate::auth::{dev_ops_auth_value, StaticTokenProvider, TokenProvider};
use crate::caller::Caller;
use crate::commander::{ApiCommander, ApiRequest, HttpMethod, HttpPool};
use crate::config::{
    Environment, FullTimeoutOptions, TimeoutOptions, DATABASE_POLL_INTERVAL,
    DEFAULT_DATABASES_PAGE_SIZE, DEFAULT_DEV_OPS_AUTH_HEADER, KEYSPACE_POLL_INTERVAL,
};
use crate::timeouts::{MultiCallTimeoutManager, TimeoutOverride};

/// Database status: fully provisioned and serving.
pub const STATUS_ACTIVE: &str = "ACTIVE";
/// Database status: creation requested, not yet provisioning.
pub const STATUS_PENDING: &str = "PENDING";
/// Database status: provisioning in progress.
pub const STATUS_INITIALIZING: &str = "INITIALIZING";
/// Database status: a keyspace change is being applied.
pub const STATUS_MAINTENANCE: &str = "MAINTENANCE";
/// Database status: teardown in progress.
pub const STATUS_TERMINATING: &str = "TERMINATING";
/// Database status: fully torn down.
pub const STATUS_TERMINATED: &str = "TERMINATED";
/// Database status: the lifecycle operation failed server-side.
pub const STATUS_ERROR: &str = "ERROR";

const HTTP_CREATED: u16 = 201;
const HTTP_ACCEPTED: u16 = 202;

/// Settings for a new database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateDatabaseOptions {
    /// Human-readable database name.
    pub name: String,
    /// Cloud provider code (`AWS`, `GCP`, `AZURE`).
    pub cloud_provider: String,
    /// Provider region (e.g. `us-east-2`).
    pub region: String,
    /// The initial keyspace (the platform default when unset).
    pub keyspace: Option<String>,
}

impl CreateDatabaseOptions {
    /// Describes a new database by name, provider and region.
    pub fn new(
        name: impl Into<String>,
        cloud_provider: impl Into<String>,
        region: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            cloud_provider: cloud_provider.into(),
            region: region.into(),
            keyspace: None,
        }
    }

    /// Chooses the initial keyspace.
    pub fn keyspace(mut self, keyspace: impl Into<String>) -> Self {
        self.keyspace = Some(keyspace.into());
        self
    }

    fn to_payload(&self) -> Value {
        let mut payload = json!({
            "name": self.name,
            "tier": "serverless",
            "cloudProvider": self.cloud_provider,
            "region": self.region,
            "capacityUnits": 1,
            "dbType": "vector",
        });
        if let Some(keyspace) = &self.keyspace {
            payload["keyspace"] = json!(keyspace);
        }
        payload
    }
}

/// Builder for [`AstraDbAdmin`].
pub struct AstraDbAdminBuilder {
    token_provider: Option<Arc<dyn TokenProvider>>,
    environment: Environment,
    dev_ops_url: Option<String>,
    callers: Vec<Caller>,
    timeout_options: FullTimeoutOptions,
    pool: Option<Arc<HttpPool>>,
    database_poll_interval: Duration,
    keyspace_poll_interval: Duration,
}

impl fmt::Debug for AstraDbAdminBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AstraDbAdminBuilder")
            .field("token_provider", &self.token_provider.as_ref().map(|_| "***"))
            .field("environment", &self.environment)
            .field("dev_ops_url", &self.dev_ops_url)
            .finish_non_exhaustive()
    }
}

impl AstraDbAdminBuilder {
    fn new() -> Self {
        Self {
            token_provider: None,
            environment: Environment::default(),
            dev_ops_url: None,
            callers: Vec::new(),
            timeout_options: FullTimeoutOptions::default(),
            pool: None,
            database_poll_interval: DATABASE_POLL_INTERVAL,
            keyspace_poll_interval: KEYSPACE_POLL_INTERVAL,
        }
    }

    /// Authenticates with a fixed token string.
    pub fn token(self, token: impl Into<String>) -> Self {
        self.token_provider(Arc::new(StaticTokenProvider::new(token.into())))
    }

    /// Authenticates through a custom token source.
    pub fn token_provider(mut self, provider: Arc<dyn TokenProvider>) -> Self {
        self.token_provider = Some(provider);
        self
    }

    /// Targets a managed environment other than production.
    pub fn environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    /// Overrides the DevOps API base URL (useful against a local stand-in).
    pub fn dev_ops_url(mut self, url: impl Into<String>) -> Self {
        self.dev_ops_url = Some(url.into());
        self
    }

    /// Registers a caller identity for the composed `User-Agent`.
    pub fn caller(mut self, caller: Caller) -> Self {
        self.callers.push(caller);
        self
    }

    /// Applies timeout overrides on top of the defaults.
    pub fn timeout_options(mut self, overrides: &TimeoutOptions) -> Self {
        self.timeout_options = self.timeout_options.with_override(overrides);
        self
    }

    /// Injects an HTTP pool (defaults to the process-wide one).
    pub fn pool(mut self, pool: Arc<HttpPool>) -> Self {
        self.pool = Some(pool);
        self
    }

    /// Changes how often database lifecycle polling re-checks the status.
    pub fn database_poll_interval(mut self, interval: Duration) -> Self {
        self.database_poll_interval = interval;
        self
    }

    /// Changes how often keyspace lifecycle polling re-checks the status.
    pub fn keyspace_poll_interval(mut self, interval: Duration) -> Self {
        self.keyspace_poll_interval = interval;
        self
    }

    /// Validates the settings and assembles the admin facade.
    pub fn build(self) -> Result<AstraDbAdmin> {
        let base_url = match &self.dev_ops_url {
            Some(url) => url.clone(),
            None => self
                .environment
                .dev_ops_url()
                .ok_or_else(|| {
                    Error::Configuration(format!(
                        "environment {:?} has no DevOps API",
                        self.environment,
                    ))
                })?
                .to_owned(),
        };
        let token = self.token_provider.as_ref().and_then(|provider| provider.token());

        let mut builder = ApiCommander::builder(base_url)
            .path_segment(self.environment.dev_ops_api_version())
            .family(ApiFamily::DevOpsApi)
            .optional_header(
                DEFAULT_DEV_OPS_AUTH_HEADER,
                token.as_deref().map(dev_ops_auth_value),
            );
        for caller in self.callers {
            builder = builder.caller(caller);
        }
        if let Some(pool) = self.pool {
            builder = builder.pool(pool);
        }

        Ok(AstraDbAdmin {
            commander: builder.build()?,
            timeout_options: self.timeout_options,
            database_poll_interval: self.database_poll_interval,
            keyspace_poll_interval: self.keyspace_poll_interval,
        })
    }
}

/// Account-level entry point for database lifecycle operations.
#[derive(Debug, Clone)]
pub struct AstraDbAdmin {
    commander: ApiCommander,
    timeout_options: FullTimeoutOptions,
    database_poll_interval: Duration,
    keyspace_poll_interval: Duration,
}

impl AstraDbAdmin {
    /// Starts building an admin facade.
    pub fn builder() -> AstraDbAdminBuilder {
        AstraDbAdminBuilder::new()
    }

    /// Scopes down to keyspace administration for one database.
    pub fn database_admin(&self, database_id: impl Into<String>) -> AstraDbDatabaseAdmin {
        AstraDbDatabaseAdmin {
            admin: self.clone(),
            database_id: database_id.into(),
        }
    }

    /// Lists all databases visible to the token, following pagination.
    pub async fn list_databases(&self, overrides: TimeoutOverride) -> Result<Vec<Value>> {
        let (method_ms, method_label) = overrides.resolve_method(
            self.timeout_options.database_admin_timeout_ms,
            "database_admin_timeout_ms",
        );
        let (request_ms, request_label) = overrides.resolve_request(&self.timeout_options);
        let manager =
            MultiCallTimeoutManager::new(Some(method_ms), ApiFamily::DevOpsApi).with_label(method_label);

        let mut databases: Vec<Value> = Vec::new();
        let mut starting_after: Option<String> = None;
        loop {
            let context = manager.remaining_timeout(Some(request_ms), request_label)?;
            let mut params = vec![("limit", DEFAULT_DATABASES_PAGE_SIZE.to_string())];
            if let Some(after) = &starting_after {
                params.push(("starting_after", after.clone()));
            }
            let page = self
                .commander
                .async_request(
                    &ApiRequest::get()
                        .with_additional_path("databases")
                        .with_params(&params)
                        .with_timeout(context),
                )
                .await?;
            let page = match page {
                Value::Array(items) => items,
                other => {
                    return Err(Error::UnexpectedResponse {
                        family: ApiFamily::DevOpsApi,
                        message: "the database listing is not a JSON array".to_owned(),
                        raw_text: other.to_string(),
                    });
                }
            };

            let page_len = page.len();
            starting_after = page
                .last()
                .and_then(|entry| entry.get("id"))
                .and_then(Value::as_str)
                .map(str::to_owned);
            databases.extend(page);
            if page_len < DEFAULT_DATABASES_PAGE_SIZE || starting_after.is_none() {
                return Ok(databases);
            }
        }
    }

    /// Fetches the full info record of one database.
    pub async fn database_info(&self, database_id: &str, overrides: TimeoutOverride) -> Result<Value> {
        let (request_ms, request_label) = overrides.resolve_request(&self.timeout_options);
        self.fetch_database_info(
            database_id,
            &MultiCallTimeoutManager::new(None, ApiFamily::DevOpsApi),
            request_ms,
            request_label,
        )
        .await
    }

    /// Creates a database, returning its id.
    ///
    /// With `wait_until_active`, polls the DevOps API until the new database
    /// reaches `ACTIVE` (failing on `ERROR`), all under the database-admin
    /// timeout budget. Without it, returns as soon as creation is accepted.
    pub async fn create_database(
        &self,
        options: &CreateDatabaseOptions,
        wait_until_active: bool,
        overrides: TimeoutOverride,
    ) -> Result<String> {
        let (method_ms, method_label) = overrides.resolve_method(
            self.timeout_options.database_admin_timeout_ms,
            "database_admin_timeout_ms",
        );
        let (request_ms, request_label) = overrides.resolve_request(&self.timeout_options);
        let manager =
            MultiCallTimeoutManager::new(Some(method_ms), ApiFamily::DevOpsApi).with_label(method_label);

        let payload = options.to_payload();
        let context = manager.remaining_timeout(Some(request_ms), request_label)?;
        let raw = self
            .commander
            .async_raw_request(
                &ApiRequest::post(&payload)
                    .with_additional_path("databases")
                    .with_timeout(context),
            )
            .await?;
        if raw.status != HTTP_CREATED {
            return Err(Error::UnexpectedResponse {
                family: ApiFamily::DevOpsApi,
                message: format!(
                    "database creation returned HTTP {} instead of {HTTP_CREATED}",
                    raw.status,
                ),
                raw_text: raw.text,
            });
        }
        let database_id = raw
            .header("Location")
            .map(str::to_owned)
            .ok_or_else(|| Error::UnexpectedResponse {
                family: ApiFamily::DevOpsApi,
                message: "database creation response carries no Location header".to_owned(),
                raw_text: raw.text.clone(),
            })?;
        info!(database_id, name = %options.name, "database creation accepted");

        if wait_until_active {
            self.poll_database_status(
                &database_id,
                &manager,
                request_ms,
                request_label,
                self.database_poll_interval,
                &[STATUS_PENDING, STATUS_INITIALIZING],
                STATUS_ACTIVE,
            )
            .await?;
        }
        Ok(database_id)
    }

    /// Drops a database.
    ///
    /// With `wait_until_terminated`, polls until the database reports
    /// `TERMINATED` (a 404 on the info endpoint counts as gone too).
    pub async fn drop_database(
        &self,
        database_id: &str,
        wait_until_terminated: bool,
        overrides: TimeoutOverride,
    ) -> Result<()> {
        let (method_ms, method_label) = overrides.resolve_method(
            self.timeout_options.database_admin_timeout_ms,
            "database_admin_timeout_ms",
        );
        let (request_ms, request_label) = overrides.resolve_request(&self.timeout_options);
        let manager =
            MultiCallTimeoutManager::new(Some(method_ms), ApiFamily::DevOpsApi).with_label(method_label);

        let context = manager.remaining_timeout(Some(request_ms), request_label)?;
        let terminate_path = format!("databases/{database_id}/terminate");
        let raw = self
            .commander
            .async_raw_request(
                &ApiRequest::default()
                    .with_additional_path(&terminate_path)
                    .with_timeout(context),
            )
            .await?;
        if raw.status != HTTP_ACCEPTED {
            return Err(Error::UnexpectedResponse {
                family: ApiFamily::DevOpsApi,
                message: format!(
                    "database termination returned HTTP {} instead of {HTTP_ACCEPTED}",
                    raw.status,
                ),
                raw_text: raw.text,
            });
        }
        info!(database_id, "database termination accepted");

        if wait_until_terminated {
            loop {
                tokio::time::sleep(self.database_poll_interval).await;
                let info = match self
                    .fetch_database_info(database_id, &manager, request_ms, request_label)
                    .await
                {
                    Ok(info) => info,
                    // once torn down, the info endpoint stops resolving the id
                    Err(Error::Http { status: 404, .. }) => return Ok(()),
                    Err(other) => return Err(other),
                };
                match database_status(&info) {
                    Some(STATUS_TERMINATED) => return Ok(()),
                    Some(STATUS_ERROR) => {
                        return Err(Error::UnexpectedResponse {
                            family: ApiFamily::DevOpsApi,
                            message: format!("database '{database_id}' entered ERROR while terminating"),
                            raw_text: info.to_string(),
                        });
                    }
                    status => {
                        debug!(database_id, ?status, "database still terminating");
                    }
                }
            }
        }
        Ok(())
    }

    async fn fetch_database_info(
        &self,
        database_id: &str,
        manager: &MultiCallTimeoutManager,
        request_ms: u64,
        request_label: &'static str,
    ) -> Result<Value> {
        let context = manager.remaining_timeout(Some(request_ms), request_label)?;
        let info_path = format!("databases/{database_id}");
        self.commander
            .async_request(
                &ApiRequest::get()
                    .with_additional_path(&info_path)
                    .with_timeout(context),
            )
            .await
    }

    /// Polls one database until it leaves `transient_statuses` for
    /// `target_status`, failing on `ERROR` or an unknown status.
    #[allow(clippy::too_many_arguments)]
    async fn poll_database_status(
        &self,
        database_id: &str,
        manager: &MultiCallTimeoutManager,
        request_ms: u64,
        request_label: &'static str,
        poll_interval: Duration,
        transient_statuses: &[&str],
        target_status: &str,
    ) -> Result<()> {
        loop {
            let info = self
                .fetch_database_info(database_id, manager, request_ms, request_label)
                .await?;
            let status = database_status(&info);
            match status {
                Some(status) if status == target_status => {
                    info!(database_id, status, "database reached the requested status");
                    return Ok(());
                }
                Some(status) if transient_statuses.contains(&status) => {
                    debug!(database_id, status, "database not ready yet, polling again");
                }
                other => {
                    return Err(Error::UnexpectedResponse {
                        family: ApiFamily::DevOpsApi,
                        message: format!(
                            "database '{database_id}' reported status {:?} while waiting for {target_status}",
                            other,
                        ),
                        raw_text: info.to_string(),
                    });
                }
            }
            // budget check happens on the next info fetch
            tokio::time::sleep(poll_interval).await;
        }
    }
}

/// Keyspace administration scoped to one database.
#[derive(Debug, Clone)]
pub struct AstraDbDatabaseAdmin {
    admin: AstraDbAdmin,
    database_id: String,
}

impl AstraDbDatabaseAdmin {
    /// The database this facade is scoped to.
    pub fn database_id(&self) -> &str {
        &self.database_id
    }

    /// Lists the database's keyspaces.
    pub async fn list_keyspaces(&self, overrides: TimeoutOverride) -> Result<Vec<String>> {
        let info = self.admin.database_info(&self.database_id, overrides).await?;
        database_keyspaces(&info).ok_or_else(|| Error::UnexpectedResponse {
            family: ApiFamily::DevOpsApi,
            message: format!("no keyspace listing in the info record of '{}'", self.database_id),
            raw_text: info.to_string(),
        })
    }

    /// Creates a keyspace.
    ///
    /// With `wait_until_active`, polls until the database leaves
    /// `MAINTENANCE` and the new keyspace appears in the listing.
    pub async fn create_keyspace(
        &self,
        keyspace: &str,
        wait_until_active: bool,
        overrides: TimeoutOverride,
    ) -> Result<()> {
        let manager = self.keyspace_manager(&overrides);
        let (request_ms, request_label) = overrides.resolve_request(&self.admin.timeout_options);

        let context = manager.remaining_timeout(Some(request_ms), request_label)?;
        let raw = self
            .admin
            .commander
            .async_raw_request(
                &ApiRequest::default()
                    .with_additional_path(&self.keyspace_path(keyspace))
                    .with_timeout(context),
            )
            .await?;
        if raw.status != HTTP_CREATED {
            return Err(Error::UnexpectedResponse {
                family: ApiFamily::DevOpsApi,
                message: format!(
                    "keyspace creation returned HTTP {} instead of {HTTP_CREATED}",
                    raw.status,
                ),
                raw_text: raw.text,
            });
        }
        info!(database_id = %self.database_id, keyspace, "keyspace creation accepted");

        if wait_until_active {
            self.wait_for_keyspace(keyspace, true, &manager, request_ms, request_label)
                .await?;
        }
        Ok(())
    }

    /// Drops a keyspace.
    ///
    /// With `wait_until_active`, polls until the database leaves
    /// `MAINTENANCE` and the keyspace is gone from the listing.
    pub async fn drop_keyspace(
        &self,
        keyspace: &str,
        wait_until_active: bool,
        overrides: TimeoutOverride,
    ) -> Result<()> {
        let manager = self.keyspace_manager(&overrides);
        let (request_ms, request_label) = overrides.resolve_request(&self.admin.timeout_options);

        let context = manager.remaining_timeout(Some(request_ms), request_label)?;
        let raw = self
            .admin
            .commander
            .async_raw_request(
                &ApiRequest::default()
                    .with_method(HttpMethod::Delete)
                    .with_additional_path(&self.keyspace_path(keyspace))
                    .with_timeout(context),
            )
            .await?;
        if raw.status != HTTP_ACCEPTED {
            return Err(Error::UnexpectedResponse {
                family: ApiFamily::DevOpsApi,
                message: format!(
                    "keyspace deletion returned HTTP {} instead of {HTTP_ACCEPTED}",
                    raw.status,
                ),
                raw_text: raw.text,
            });
        }
        info!(database_id = %self.database_id, keyspace, "keyspace deletion accepted");

        if wait_until_active {
            self.wait_for_keyspace(keyspace, false, &manager, request_ms, request_label)
                .await?;
        }
        Ok(())
    }

    fn keyspace_manager(&self, overrides: &TimeoutOverride) -> MultiCallTimeoutManager {
        let (method_ms, method_label) = overrides.resolve_method(
            self.admin.timeout_options.keyspace_admin_timeout_ms,
            "keyspace_admin_timeout_ms",
        );
        MultiCallTimeoutManager::new(Some(method_ms), ApiFamily::DevOpsApi).with_label(method_label)
    }

    fn keyspace_path(&self, keyspace: &str) -> String {
        format!("databases/{}/keyspaces/{keyspace}", self.database_id)
    }

    /// Polls until the database is `ACTIVE` again and the keyspace listing
    /// does (or does not) contain `keyspace`.
    async fn wait_for_keyspace(
        &self,
        keyspace: &str,
        expect_present: bool,
        manager: &MultiCallTimeoutManager,
        request_ms: u64,
        request_label: &'static str,
    ) -> Result<()> {
        loop {
            tokio::time::sleep(self.admin.keyspace_poll_interval).await;
            let info = self
                .admin
                .fetch_database_info(&self.database_id, manager, request_ms, request_label)
                .await?;
            match database_status(&info) {
                Some(STATUS_ACTIVE) => {
                    let listed = database_keyspaces(&info)
                        .map(|keyspaces| keyspaces.iter().any(|k| k == keyspace))
                        .unwrap_or(false);
                    if listed == expect_present {
                        return Ok(());
                    }
                    return Err(Error::UnexpectedResponse {
                        family: ApiFamily::DevOpsApi,
                        message: format!(
                            "database '{}' is ACTIVE but keyspace '{keyspace}' is {}",
                            self.database_id,
                            if expect_present { "not listed" } else { "still listed" },
                        ),
                        raw_text: info.to_string(),
                    });
                }
                Some(STATUS_MAINTENANCE) => {
                    debug!(
                        database_id = %self.database_id,
                        keyspace,
                        "keyspace change still being applied"
                    );
                }
                other => {
                    return Err(Error::UnexpectedResponse {
                        family: ApiFamily::DevOpsApi,
                        message: format!(
                            "database '{}' reported status {:?} during a keyspace change",
                            self.database_id, other,
                        ),
                        raw_text: info.to_string(),
                    });
                }
            }
        }
    }
}

/// Reads the `status` field of a database info record.
fn database_status(info: &Value) -> Option<&str> {
    info.get("status").and_then(Value::as_str)
}

/// Reads the keyspace listing of a database info record.
fn database_keyspaces(info: &Value) -> Option<Vec<String>> {
    info.get("info")
        .and_then(|details| details.get("keyspaces"))
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_owned)
                .collect()
        })
}
