//! # Response Schemas
//!
//! Named JSON-schema documents for the booking API responses. The documents
//! under `resources/schemas/` are compiled into the binary; an explicit
//! `{schema -> path}` mapping replaces any of them with a file on disk. Every
//! document is compiled once at suite setup.

use std::collections::BTreeMap;
use std::fmt::{self, Display};
use std::fs;
use std::path::{Path, PathBuf};

use jsonschema::Validator;
use serde_json::Value;

use crate::error::{Result, SuiteError};
use crate::testing::{Failure, FailureKind};

/// Validator errors listed in one failure message before truncating.
const MAX_REPORTED_ERRORS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SchemaName {
    CreateBooking,
    GetBooking,
    UpdateBooking,
    UpdatePartialBooking,
    CreateToken,
}

impl SchemaName {
    pub const ALL: [SchemaName; 5] = [
        SchemaName::CreateBooking,
        SchemaName::GetBooking,
        SchemaName::UpdateBooking,
        SchemaName::UpdatePartialBooking,
        SchemaName::CreateToken,
    ];

    pub fn resource_name(self) -> &'static str {
        match self {
            SchemaName::CreateBooking => "createbookingjsonschema.json",
            SchemaName::GetBooking => "getbookingjsonschema.json",
            SchemaName::UpdateBooking => "updatebookingjsonschema.json",
            SchemaName::UpdatePartialBooking => "updatepartialbookingjsonschema.json",
            SchemaName::CreateToken => "createtokenjsonschema.json",
        }
    }

    pub fn from_resource_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|schema| schema.resource_name() == name)
    }

    fn bundled_document(self) -> &'static str {
        match self {
            SchemaName::CreateBooking => {
                include_str!("../../resources/schemas/createbookingjsonschema.json")
            }
            SchemaName::GetBooking => include_str!("../../resources/schemas/getbookingjsonschema.json"),
            SchemaName::UpdateBooking => {
                include_str!("../../resources/schemas/updatebookingjsonschema.json")
            }
            SchemaName::UpdatePartialBooking => {
                include_str!("../../resources/schemas/updatepartialbookingjsonschema.json")
            }
            SchemaName::CreateToken => include_str!("../../resources/schemas/createtokenjsonschema.json"),
        }
    }
}

impl Display for SchemaName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.resource_name())
    }
}

/// Compiled validators for every [`SchemaName`].
pub struct SchemaStore {
    validators: BTreeMap<SchemaName, Validator>,
}

impl SchemaStore {
    /// Compile every schema, reading the ones mapped in `overrides` from disk
    /// and using the bundled document for the rest.
    pub fn load(overrides: &BTreeMap<SchemaName, PathBuf>) -> Result<Self> {
        let mut documents = BTreeMap::new();
        for name in SchemaName::ALL {
            let document = match overrides.get(&name) {
                Some(path) => read_document(name, path)?,
                None => parse_document(name, name.bundled_document(), "bundled document")?,
            };
            documents.insert(name, document);
        }
        Self::from_documents(documents)
    }

    #[cfg(test)]
    pub fn bundled() -> Result<Self> {
        Self::load(&BTreeMap::new())
    }

    pub fn from_documents(documents: BTreeMap<SchemaName, Value>) -> Result<Self> {
        let mut validators = BTreeMap::new();
        for (name, document) in documents {
            let validator = jsonschema::validator_for(&document).map_err(|e| SuiteError::Schema {
                name: name.to_string(),
                message: format!("invalid schema: {e}"),
            })?;
            tracing::debug!(schema = %name, "compiled schema");
            validators.insert(name, validator);
        }
        Ok(Self { validators })
    }

    /// Check `instance` against the named schema. A non-conforming body is a
    /// [`FailureKind::SchemaMismatch`].
    pub fn validate(&self, name: SchemaName, instance: &Value) -> std::result::Result<(), Failure> {
        let validator = self
            .validators
            .get(&name)
            .ok_or_else(|| Failure::setup(format!("schema `{name}` is not loaded")))?;

        let errors: Vec<String> = validator
            .iter_errors(instance)
            .map(|error| error.to_string())
            .collect();
        if errors.is_empty() {
            return Ok(());
        }

        let mut message = format!("response does not match `{name}`: ");
        message.push_str(
            &errors
                .iter()
                .take(MAX_REPORTED_ERRORS)
                .cloned()
                .collect::<Vec<_>>()
                .join("; "),
        );
        if errors.len() > MAX_REPORTED_ERRORS {
            message.push_str(&format!(" (+{} more)", errors.len() - MAX_REPORTED_ERRORS));
        }
        Err(Failure::new(FailureKind::SchemaMismatch, message))
    }
}

fn read_document(name: SchemaName, path: &Path) -> Result<Value> {
    let raw = fs::read_to_string(path).map_err(|source| SuiteError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_document(name, &raw, &format!("`{}`", path.display()))
}

fn parse_document(name: SchemaName, raw: &str, origin: &str) -> Result<Value> {
    serde_json::from_str(raw).map_err(|e| SuiteError::Schema {
        name: name.to_string(),
        message: format!("{origin} is not valid JSON: {e}"),
    })
}
