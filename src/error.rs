//! Error types for normalforge.
//!
//! This module defines all error types used throughout the library.
//!
//! Errors fall into three groups:
//!
//! - **No-op outcomes** ([`MeshError::NoOp`]): a propagation or classification
//!   step matched nothing. Recoverable by retrying with another strategy.
//! - **Invariant violations** ([`MeshError::LoopCountMismatch`],
//!   [`MeshError::SnapshotNotFound`], [`MeshError::TagNotFound`]): the current
//!   step aborts without touching mesh state.
//! - **Input and I/O errors**: malformed meshes, unreadable files, bad parameters.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using [`MeshError`].
pub type Result<T> = std::result::Result<T, MeshError>;

/// Errors that can occur during mesh operations.
#[derive(Error, Debug)]
pub enum MeshError {
    /// The mesh has no faces.
    #[error("mesh has no faces")]
    EmptyMesh,

    /// A face references an invalid vertex index.
    #[error("face {face} references invalid vertex index {vertex}")]
    InvalidVertexIndex {
        /// The face index.
        face: usize,
        /// The invalid vertex index.
        vertex: usize,
    },

    /// A face has fewer than three corners or repeats a vertex.
    #[error("face {face} is degenerate (fewer than 3 corners or duplicate vertices)")]
    DegenerateFace {
        /// The face index.
        face: usize,
    },

    /// A step matched zero elements.
    #[error("{step} matched no elements")]
    NoOp {
        /// The step that had no effect.
        step: &'static str,
    },

    /// Normals were measured on a surface with a different loop count than
    /// the surface being written.
    #[error("loop count mismatch: normals computed for {expected} loops, mesh has {found}")]
    LoopCountMismatch {
        /// Loop count of the measured surface.
        expected: usize,
        /// Loop count of the target surface.
        found: usize,
    },

    /// No snapshot is associated with the object.
    #[error("no snapshot stored for object '{object}'")]
    SnapshotNotFound {
        /// The object identity.
        object: String,
    },

    /// A provenance tag token is not live or its slot has vanished.
    #[error("provenance tag {token} is not live")]
    TagNotFound {
        /// Name of the tag token.
        token: String,
    },

    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Error loading mesh from file.
    #[error("failed to load mesh from {path}: {message}")]
    LoadError {
        /// The file path.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// Error saving mesh to file.
    #[error("failed to save mesh to {path}: {message}")]
    SaveError {
        /// The file path.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// Unsupported file format.
    #[error("unsupported file format: {extension}")]
    UnsupportedFormat {
        /// The file extension.
        extension: String,
    },

    /// Invalid parameter value.
    #[error("invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// The invalid value (as string).
        value: String,
        /// Reason the value is invalid.
        reason: &'static str,
    },

    /// The external geometry generator reported a failure.
    #[error("geometry generator failed: {message}")]
    Generator {
        /// Error message from the generator.
        message: String,
    },

    /// A workflow configuration could not be parsed.
    #[error("invalid configuration: {message}")]
    Config {
        /// Parser message.
        message: String,
    },
}

impl MeshError {
    /// Create an invalid parameter error.
    pub fn invalid_param<T: std::fmt::Display>(
        name: &'static str,
        value: T,
        reason: &'static str,
    ) -> Self {
        MeshError::InvalidParameter {
            name,
            value: value.to_string(),
            reason,
        }
    }

    /// Whether this error only reports that a step had no effect.
    pub fn is_noop(&self) -> bool {
        matches!(self, MeshError::NoOp { .. })
    }
}
