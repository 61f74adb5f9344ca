//! # Error Handling
//!
//! Provides the unified `AppError` enum used by every pipeline stage.

use derive_more::{Display, From};
use std::path::PathBuf;

/// The pipeline error enum.
///
/// `Display` output is what the CLI prints on failure, so compiler
/// diagnostics are rendered without any prefix.
#[derive(Debug, Display, From)]
pub enum AppError {
    /// Wrapper for standard IO errors that are not tied to an emitted file.
    #[display("IO Error: {_0}")]
    Io(std::io::Error),

    /// Discovery found no definition files under the root.
    #[from(ignore)]
    #[display("No .proto files found under {}", _0.display())]
    NoInput(PathBuf),

    /// `protoc` could not be spawned or exited with a failure status.
    /// Carries the compiler's own diagnostic text.
    #[from(ignore)]
    #[display("{_0}")]
    CompilerInvocation(String),

    /// Writing a generated file (or its parent directory) failed.
    #[from(ignore)]
    #[display("Failed to write {}: {source}", path.display())]
    Emission {
        /// Target path of the failed write.
        path: PathBuf,
        /// Underlying IO failure.
        source: std::io::Error,
    },

    /// The descriptor set emitted by the compiler was missing or malformed.
    #[from(ignore)]
    #[display("Descriptor Error: {_0}")]
    Descriptor(String),

    /// Two services collapse onto the same router field name.
    #[from(ignore)]
    #[display("Duplicate service name: {_0}")]
    DuplicateService(String),

    /// Generic errors.
    #[display("General Error: {_0}")]
    General(String),
}

/// Manual implementation of the standard Error trait.
impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Io(e) => Some(e),
            AppError::Emission { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl AppError {
    /// Builds an `Emission` error for `path`.
    pub fn emission(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        AppError::Emission {
            path: path.into(),
            source,
        }
    }
}

/// Helper type alias for Result using AppError.
pub type AppResult<T> = Result<T, AppError>;
