//! Error types for field operations

use std::fmt;

use thiserror::Error;

use crate::kind::FieldKind;

/// Result type for field operations
pub type Result<T> = std::result::Result<T, FieldsError>;

/// Why a delete request was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteRefusal {
    /// No field of that kind is stored under the record id.
    NotFound,
    /// The field is a built-in default field.
    DefaultField,
}

impl fmt::Display for DeleteRefusal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeleteRefusal::NotFound => write!(f, "field not found"),
            DeleteRefusal::DefaultField => write!(f, "default fields cannot be deleted"),
        }
    }
}

/// Errors that can occur in field operations
#[derive(Debug, Error)]
pub enum FieldsError {
    /// A required creation argument is missing or empty
    #[error("can't find property {property}")]
    InvalidArgument { property: String },

    /// Another field of the same kind already uses the meta key
    #[error("a {kind} field with the meta key '{meta_key}' already exists, choose a different name")]
    DuplicateMetaKey { kind: FieldKind, meta_key: String },

    /// The field is protected or missing
    #[error("{kind} field {record_id} cannot be deleted: {reason}")]
    CannotDelete {
        kind: FieldKind,
        record_id: u64,
        reason: DeleteRefusal,
    },

    /// The caller may not manage fields
    #[error("caller is not allowed to manage {kind} fields")]
    Unauthorized { kind: FieldKind },

    /// Field not found by record id
    #[error("{kind} field not found: {record_id}")]
    FieldNotFound { kind: FieldKind, record_id: u64 },

    /// A collaborator store rejected an operation
    #[error("store error: {message}")]
    Store { message: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    /// Field type configuration could not be extracted
    #[error("configuration error: {0}")]
    Config(#[from] Box<figment::Error>),
}

impl FieldsError {
    pub(crate) fn missing(property: &str) -> Self {
        FieldsError::InvalidArgument {
            property: property.to_string(),
        }
    }
}

impl From<figment::Error> for FieldsError {
    fn from(error: figment::Error) -> Self {
        FieldsError::Config(Box::new(error))
    }
}
