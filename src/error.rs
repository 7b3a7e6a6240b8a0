//! Domain errors raised while reading CapiTainS corpora.
//!
//! Orchestration code (CLI, writer, git) works with `anyhow`; everything that
//! inspects a document reports one of these variants so callers can decide
//! whether to skip the offending file or abort.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} is not a UTF-8 text document", path.display())]
    NotText { path: PathBuf },

    #[error("Malformed XML: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error("Invalid CTS URN `{0}`")]
    Urn(String),

    #[error("Expected <{expected}> root element, found <{found}>")]
    UnexpectedRoot {
        expected: &'static str,
        found: String,
    },

    #[error("Missing `{attribute}` attribute on <{element}>")]
    MissingAttribute {
        element: &'static str,
        attribute: &'static str,
    },

    #[error("No CTS citation scheme (refsDecl/cRefPattern) declared")]
    MissingCitation,

    #[error("Invalid citation pattern `{0}`")]
    InvalidCitation(String),

    #[error("Unsupported XPath expression `{expr}`: {reason}")]
    XPath { expr: String, reason: &'static str },

    #[error("Unknown namespace prefix `{0}`")]
    UnknownPrefix(String),

    #[error("No {field} metadata available for {urn}")]
    MissingMetadata { field: &'static str, urn: String },
}

pub type Result<T> = std::result::Result<T, ConvertError>;
