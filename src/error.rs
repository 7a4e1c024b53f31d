//! Error types for the dynamic codec
//!
//! Every failure kind is a distinct variant so callers can tell "your data is
//! incomplete" from "your schema name is wrong" from "the bytes are garbage"
//! without string matching.

use thiserror::Error;

/// Errors that can occur while building a registry or converting messages
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Descriptor set bytes did not parse, or the set could not be resolved
    /// into a consistent registry. Construction-time only; no registry is
    /// created when this is returned.
    #[error("malformed descriptor: {0}")]
    MalformedDescriptor(String),

    /// A requested fully-qualified type name is absent from the registry
    #[error("unknown schema name: {0}")]
    UnknownSchema(String),

    /// Wire bytes do not parse as an instance of the requested type, or the
    /// decode exceeded its configured byte ceiling
    #[error("malformed protocol buffer: {0}")]
    MalformedMessage(String),

    /// Encode-time validation failure: a field marked `required` by the
    /// descriptor was not set, directly or inside a nested message
    #[error("required field missing: {type_name}.{field}")]
    RequiredFieldMissing {
        /// Fully-qualified name of the message type with the missing field
        type_name: String,
        /// Name of the missing field
        field: String,
    },

    /// Encode-time validation failure: a supplied value does not match the
    /// semantic kind the descriptor declares for its field
    #[error("type mismatch for {type_name}.{field}: expected {expected}, found {found}")]
    TypeMismatch {
        /// Fully-qualified name of the message type being encoded
        type_name: String,
        /// Name of the offending field
        field: String,
        /// Value shape the field's semantic kind accepts
        expected: &'static str,
        /// Value shape that was actually supplied
        found: &'static str,
    },
}

impl Error {
    /// Whether this error is the distinguishable required-field outcome,
    /// which host bindings typically map to a non-exceptional result
    pub fn is_required_field_missing(&self) -> bool {
        matches!(self, Error::RequiredFieldMissing { .. })
    }
}

/// Result type alias for codec operations
pub type Result<T> = core::result::Result<T, Error>;
