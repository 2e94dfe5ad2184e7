//! # Suite Configuration
//!
//! Settings for a run, layered lowest to highest:
//!
//! 1. built-in defaults (public restful-booker instance, schemas compiled into
//!    the binary)
//! 2. `booker.toml` (or the file passed with `--config`)
//! 3. `BOOKER_*` environment variables
//! 4. command-line flags
//!
//! `schema_dir` points every schema at a directory on disk; `[schemas]` entries
//! override single documents. Their paths may contain `{{variable}}`
//! placeholders, resolved from the `[variables]` table and the built-in
//! `schema_dir` variable.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::auth::AuthCredentials;
use crate::error::{Result, SuiteError};
use crate::schema::SchemaName;

pub const DEFAULT_CONFIG_FILE: &str = "booker.toml";
pub const DEFAULT_BASE_URL: &str = "https://restful-booker.herokuapp.com";

pub const ENV_BASE_URL: &str = "BOOKER_BASE_URL";
pub const ENV_USERNAME: &str = "BOOKER_USERNAME";
pub const ENV_PASSWORD: &str = "BOOKER_PASSWORD";
pub const ENV_SCHEMA_DIR: &str = "BOOKER_SCHEMA_DIR";

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SuiteConfig {
    pub base_url: String,
    pub request_timeout_ms: u64,
    pub step_timeout_ms: u64,
    pub credentials: AuthCredentials,
    /// Directory holding all five schema documents; bundled copies when unset.
    pub schema_dir: Option<String>,
    /// Per-schema overrides keyed by resource name,
    /// e.g. `"getbookingjsonschema.json" = "{{contracts}}/get.json"`.
    pub schemas: BTreeMap<String, String>,
    pub variables: BTreeMap<String, String>,
    /// Fixed seed for the data builders; random when unset.
    pub seed: Option<u64>,
    /// An id the API never handed out, for the not-found boundary check.
    pub unknown_booking_id: u64,
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_ms: 30_000,
            step_timeout_ms: 60_000,
            credentials: AuthCredentials::default(),
            schema_dir: None,
            schemas: BTreeMap::new(),
            variables: BTreeMap::new(),
            seed: None,
            unknown_booking_id: 999_999_999,
        }
    }
}

impl SuiteConfig {
    /// Read `path`, or `booker.toml` from the working directory when present,
    /// or fall back to defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, required) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
        };

        if !required && !path.exists() {
            tracing::debug!("no {DEFAULT_CONFIG_FILE} found, using defaults");
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(&path).map_err(|source| SuiteError::Io {
            path: path.clone(),
            source,
        })?;
        let config = toml::from_str(&raw).map_err(|source| SuiteError::ConfigParse {
            path: path.clone(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "loaded config file");
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(value) = lookup(ENV_BASE_URL) {
            self.base_url = value;
        }
        if let Some(value) = lookup(ENV_USERNAME) {
            self.credentials.username = value;
        }
        if let Some(value) = lookup(ENV_PASSWORD) {
            self.credentials.password = value;
        }
        if let Some(value) = lookup(ENV_SCHEMA_DIR) {
            self.schema_dir = Some(value);
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            return Err(SuiteError::Config("base_url cannot be empty".into()));
        }
        if self.request_timeout_ms == 0 || self.step_timeout_ms == 0 {
            return Err(SuiteError::Config("timeouts must be greater than zero".into()));
        }
        if self.credentials.username.trim().is_empty() {
            return Err(SuiteError::Config("credentials.username cannot be empty".into()));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn step_timeout(&self) -> Duration {
        Duration::from_millis(self.step_timeout_ms)
    }

    /// Built-in variables, overridden by the `[variables]` table.
    pub fn variable_map(&self) -> HashMap<String, String> {
        let mut variables = HashMap::new();
        if let Some(schema_dir) = &self.schema_dir {
            variables.insert("schema_dir".to_string(), schema_dir.clone());
        }
        for (key, value) in &self.variables {
            if !key.is_empty() {
                variables.insert(key.clone(), value.clone());
            }
        }
        variables
    }

    /// Resolve the on-disk path of every schema that does not use its bundled
    /// document.
    pub fn schema_paths(&self) -> Result<BTreeMap<SchemaName, PathBuf>> {
        for key in self.schemas.keys() {
            if SchemaName::from_resource_name(key).is_none() {
                return Err(SuiteError::Config(format!("unknown schema resource `{key}`")));
            }
        }

        let variables = self.variable_map();
        let schema_dir = self
            .schema_dir
            .as_ref()
            .map(|dir| PathBuf::from(interpolate(dir, &variables)));

        let mut paths = BTreeMap::new();
        for name in SchemaName::ALL {
            let path = match self.schemas.get(name.resource_name()) {
                Some(raw) => {
                    let resolved = interpolate(raw, &variables);
                    if resolved.contains("{{") {
                        return Err(SuiteError::Config(format!(
                            "unresolved placeholder in schema path `{raw}`"
                        )));
                    }
                    PathBuf::from(resolved)
                }
                None => match &schema_dir {
                    Some(dir) => dir.join(name.resource_name()),
                    None => continue,
                },
            };
            paths.insert(name, path);
        }
        Ok(paths)
    }
}

/// Interpolate `{{key}}` placeholders in `text`. Unknown placeholders are left
/// untouched.
pub fn interpolate(text: &str, variables: &HashMap<String, String>) -> String {
    let mut result = text.to_string();
    for (key, value) in variables {
        result = result.replace(&format!("{{{{{key}}}}}"), value);
    }
    result
}
