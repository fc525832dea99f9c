//! Caller identity and `User-Agent` composition.
//!
//! Applications built on top of this client can register themselves as
//! callers; their identities are folded into a single `User-Agent` line,
//! always terminated by this crate's own name and version.

/// One `(name, version)` pair identifying a caller of the API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    name: String,
    version: Option<String>,
}

impl Caller {
    /// Creates a caller identity with a version.
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: Some(version.into()),
        }
    }

    /// Creates a caller identity without a version.
    pub fn unversioned(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: None,
        }
    }

    /// Returns the caller name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Renders this caller as a `User-Agent` fragment (`name/version` or
    /// just `name`).
    pub fn user_agent_fragment(&self) -> String {
        match &self.version {
            Some(version) => format!("{}/{}", self.name, version),
            None => self.name.clone(),
        }
    }
}

/// This client's own identity, appended to every composed `User-Agent`.
pub fn client_caller() -> Caller {
    Caller::new(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}

/// Folds caller identities into one `User-Agent` header value.
///
/// Callers appear in registration order, the client's own identity last.
pub fn compose_user_agent(callers: &[Caller]) -> String {
    callers
        .iter()
        .chain(std::iter::once(&client_caller()))
        .map(Caller::user_agent_fragment)
        .collect::<Vec<_>>()
        .join(" ")
}
