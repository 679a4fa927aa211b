//! Error types for nightfog.

use thiserror::Error;

/// The main error type for nightfog's GPU-independent operations.
#[derive(Error, Debug)]
pub enum NightfogError {
    /// A patch or lookup named a slot the template does not declare.
    #[error("shader template '{template}' has no slot '{slot}'")]
    UnknownSlot { template: String, slot: String },

    /// The same slot was patched more than once in a single assembly.
    #[error("slot '{0}' patched more than once")]
    DuplicatePatch(String),

    /// The template source itself is malformed.
    #[error("shader template '{template}' is malformed: {message}")]
    MalformedTemplate { template: String, message: String },

    /// WGSL failed to parse or validate.
    #[error("shader '{label}' failed validation: {message}")]
    ShaderValidation { label: String, message: String },

    /// A program with the given id is already registered.
    #[error("shader program '{0}' already registered")]
    ProgramExists(String),

    /// A program with the given id was not found.
    #[error("shader program '{0}' not found")]
    ProgramNotFound(String),

    /// A uniform name is not declared by the program.
    #[error("uniform '{0}' is not declared")]
    UnknownUniform(String),

    /// A uniform value does not match the declared type.
    #[error("uniform '{name}' expects {expected}, got {actual}")]
    UniformTypeMismatch {
        name: String,
        expected: &'static str,
        actual: &'static str,
    },

    /// Configuration value out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// A specialized Result type for nightfog operations.
pub type Result<T> = std::result::Result<T, NightfogError>;
