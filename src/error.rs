//! Error types for spamsieve.
//!
//! All fallible operations return [`Result`], whose error side is the
//! [`SpamSieveError`] enum. Errors that compromise the shared dataset (loading,
//! splitting, vectorizing) are fatal for a run; errors raised by a single model
//! are caught by the evaluator and recorded as a per-model failure instead.
//!
//! # Examples
//!
//! ```
//! use spamsieve::error::{Result, SpamSieveError};
//!
//! fn example_operation() -> Result<()> {
//!     Err(SpamSieveError::invalid_argument("test_size must be in (0, 1)"))
//! }
//!
//! match example_operation() {
//!     Ok(_) => println!("Success"),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

use std::io;

use thiserror::Error;

/// The main error type for spamsieve operations.
#[derive(Error, Debug)]
pub enum SpamSieveError {
    /// I/O errors (file operations, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// CSV reading/writing errors
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A required dataset or table could not be found or read
    #[error("Missing input: {0}")]
    MissingInput(String),

    /// Dataset-level errors (unparseable labels, missing columns, ...)
    #[error("Dataset error: {0}")]
    Dataset(String),

    /// Train/test split errors
    #[error("Split error: {0}")]
    Split(String),

    /// Vectorization errors (empty corpus, empty vocabulary, ...)
    #[error("Vectorize error: {0}")]
    Vectorize(String),

    /// Errors raised by an individual model during fit or scoring
    #[error("Model error: {0}")]
    Model(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic error for other cases
    #[error("Error: {0}")]
    Other(String),
}

/// Result type alias for operations that may fail with SpamSieveError.
pub type Result<T> = std::result::Result<T, SpamSieveError>;

impl SpamSieveError {
    /// Create a new missing input error.
    pub fn missing_input<S: Into<String>>(msg: S) -> Self {
        SpamSieveError::MissingInput(msg.into())
    }

    /// Create a new dataset error.
    pub fn dataset<S: Into<String>>(msg: S) -> Self {
        SpamSieveError::Dataset(msg.into())
    }

    /// Create a new split error.
    pub fn split<S: Into<String>>(msg: S) -> Self {
        SpamSieveError::Split(msg.into())
    }

    /// Create a new vectorize error.
    pub fn vectorize<S: Into<String>>(msg: S) -> Self {
        SpamSieveError::Vectorize(msg.into())
    }

    /// Create a new model error.
    pub fn model<S: Into<String>>(msg: S) -> Self {
        SpamSieveError::Model(msg.into())
    }

    /// Create a new invalid config error.
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        SpamSieveError::Config(msg.into())
    }

    /// Create a new analysis error.
    pub fn analysis<S: Into<String>>(msg: S) -> Self {
        SpamSieveError::Other(format!("Analysis error: {}", msg.into()))
    }

    /// Create a new invalid argument error.
    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        SpamSieveError::Other(format!("Invalid argument: {}", msg.into()))
    }

    /// Create a new generic error.
    pub fn other<S: Into<String>>(msg: S) -> Self {
        SpamSieveError::Other(msg.into())
    }
}
