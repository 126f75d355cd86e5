//! Error types for link annotation, persistence, and navigation.
//!
//! Ambiguity is not an error.
//! A sequence that does not map to the graph is described by a [`crate::MappingResult`], a traversal that stops at an unresolved branch ends in a [`crate::NavigatorState`], and an unpaired read pair is classified by [`crate::PairedAnnotationResult`].
//! The variants here are reserved for missing data, invalid input, and inconsistencies between the graph and the links.

use std::io;

use thiserror::Error;

//-----------------------------------------------------------------------------

/// Errors returned by the library.
#[derive(Debug, Error)]
pub enum LinkError {
    /// A k-mer or a node is not in the graph or in the link database.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A path given by the caller is not a sequence of edges in the graph.
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// The links and the graph describe incompatible structures.
    ///
    /// This indicates corrupted or mismatched inputs and should not be retried.
    #[error("Mismatched graph and links: {0}")]
    LinkMismatch(String),

    /// An I/O error while reading or writing a file.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A persisted file could not be parsed.
    #[error("Invalid file format: {0}")]
    InvalidFormat(String),

    /// An error from the SQLite backend.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// An invalid argument, such as an unsupported k-mer length.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type used throughout the library.
pub type Result<T> = std::result::Result<T, LinkError>;

//-----------------------------------------------------------------------------
