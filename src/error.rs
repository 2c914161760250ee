use std::path::PathBuf;
use thiserror::Error;

use crate::model::RefKind;

/// The main error type for OME-XML model operations.
#[derive(Debug, Error)]
pub enum OmeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse XML from {path}: {message}")]
    XmlParse { path: PathBuf, message: String },

    #[error("Failed to write XML: {0}")]
    Write(#[from] std::fmt::Error),

    #[error("Failed to encode JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{element} missing required {attribute} property")]
    MissingRequiredAttribute {
        element: &'static str,
        attribute: &'static str,
    },

    #[error("{element} has invalid {attribute}='{value}'; expected {expected}")]
    InvalidAttribute {
        element: &'static str,
        attribute: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("{child} node list size {count} != 1 in {parent}")]
    CardinalityViolation {
        parent: &'static str,
        child: String,
        count: usize,
    },

    #[error("duplicate ID '{id}': already registered to {existing}, cannot register {incoming}")]
    DuplicateId {
        id: String,
        existing: &'static str,
        incoming: &'static str,
    },

    #[error("{element} '{existing}' cannot be updated with a different ID '{found}'")]
    IdChanged {
        element: &'static str,
        existing: String,
        found: String,
    },

    #[error("{owner} has dangling {kind} to missing ID '{id}'")]
    DanglingReference {
        owner: String,
        kind: RefKind,
        id: String,
    },

    #[error("{kind} '{id}' resolved to {found}, expected {expected}")]
    ReferenceTypeMismatch {
        kind: RefKind,
        id: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("{owner} cannot handle reference of type {kind}")]
    UnsupportedReferenceKind { owner: &'static str, kind: RefKind },

    #[error("expecting node name of {expected} got {found}")]
    TagNameMismatch {
        expected: &'static str,
        found: String,
    },

    #[error("Check failed: {warning_count} warning(s) in strict mode")]
    CheckFailed { warning_count: usize },

    #[error("Unsupported output format: {0}")]
    UnsupportedFormat(String),
}
