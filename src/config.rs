//! # Configuration
//!
//! Per-base flags, and resolution of the credentials and endpoint a store
//! transport needs. Resolution order for credentials is explicit
//! arguments, then the environment, then failure.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::base::SchemaBase;
use crate::error::{BaseError, BaseResult};
use crate::schema::Schema;
use crate::store::Store;

/// Environment variable holding the project key
pub const PROJECT_KEY_ENV: &str = "DETA_PROJECT_KEY";

/// Default store host
pub const DEFAULT_HOST: &str = "database.deta.sh";

/// Per-base configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseConfig {
    /// Validate records, queries and updates before calling the store
    /// (default: true)
    #[serde(default = "default_validation")]
    pub validation: bool,
}

fn default_validation() -> bool {
    true
}

impl Default for BaseConfig {
    fn default() -> Self {
        Self {
            validation: default_validation(),
        }
    }
}

impl BaseConfig {
    /// Config with every local check disabled
    pub fn unvalidated() -> Self {
        Self { validation: false }
    }

    pub fn from_json(json: &str) -> BaseResult<Self> {
        serde_json::from_str(json).map_err(|e| BaseError::config(e.to_string()))
    }
}

/// How the store authenticates a key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    /// `<project id>_<secret>` project key
    ProjectKey,
    /// Access token scoped to an explicit project id
    AuthToken,
}

/// Resolved store credentials
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    key: String,
    kind: KeyKind,
    project_id: String,
}

impl Credentials {
    /// Resolve credentials.
    ///
    /// With both a project key and an auth token, the token authenticates
    /// and the key is used as the project id. Otherwise the project key
    /// (or the `DETA_PROJECT_KEY` value from `env`) authenticates and the
    /// project id is the part before its first `_`. Blank values count as
    /// absent.
    pub fn resolve<F>(project_key: Option<&str>, auth_token: Option<&str>, env: F) -> BaseResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let key = non_blank(project_key);
        let token = non_blank(auth_token);

        if let (Some(key), Some(token)) = (key, token) {
            return Ok(Self {
                key: token.to_string(),
                kind: KeyKind::AuthToken,
                project_id: key.to_string(),
            });
        }

        let api_key = match key {
            Some(key) => key.to_string(),
            None => env(PROJECT_KEY_ENV)
                .as_deref()
                .and_then(|v| non_blank(Some(v)))
                .map(str::to_string)
                .ok_or_else(|| BaseError::config("Project key is not defined"))?,
        };
        let project_id = api_key
            .split('_')
            .next()
            .unwrap_or_default()
            .to_string();

        Ok(Self {
            key: api_key,
            kind: KeyKind::ProjectKey,
            project_id,
        })
    }

    /// Resolve against the process environment
    pub fn from_env(project_key: Option<&str>, auth_token: Option<&str>) -> BaseResult<Self> {
        Self::resolve(project_key, auth_token, |name| std::env::var(name).ok())
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn kind(&self) -> KeyKind {
        self.kind
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// Header name and value a transport sends with every request
    pub fn auth_header(&self) -> (&'static str, &str) {
        match self.kind {
            KeyKind::ProjectKey => ("X-API-Key", &self.key),
            KeyKind::AuthToken => ("Authorization", &self.key),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("key", &"<redacted>")
            .field("kind", &self.kind)
            .field("project_id", &self.project_id)
            .finish()
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// A project: credentials plus the host serving its bases
#[derive(Debug, Clone)]
pub struct Project {
    credentials: Credentials,
    host: String,
}

impl Project {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            host: DEFAULT_HOST.to_string(),
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Trimmed base name; blank names are rejected
    pub fn base_name(name: &str) -> BaseResult<String> {
        match name.trim() {
            "" => Err(BaseError::config("Base name is not defined")),
            trimmed => Ok(trimmed.to_string()),
        }
    }

    /// Endpoint of a base, for HTTP transports
    pub fn base_url(&self, name: &str) -> BaseResult<String> {
        let name = Self::base_name(name)?;
        Ok(format!(
            "https://{}/v1/{}/{}",
            self.host,
            self.credentials.project_id(),
            name
        ))
    }

    /// Open a typed base named `name` over `store`
    pub fn open<T, S: Store>(
        &self,
        name: &str,
        store: S,
        schema: Schema,
        config: BaseConfig,
    ) -> BaseResult<SchemaBase<T, S>> {
        let name = Self::base_name(name)?;
        SchemaBase::named(name, store, schema, config)
    }
}
