//! Typesetting error types.

/// Failure to compile a figure or probe a remote image.
#[derive(Debug, thiserror::Error)]
pub enum TypesetError {
    /// The language is not handled by this typesetter.
    #[error("unsupported language: {0}")]
    Unsupported(String),
    /// The external compiler could not be started.
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    /// The external compiler exited with an error.
    #[error("{program} exited with {status}: {stderr}")]
    Compile {
        program: String,
        status: std::process::ExitStatus,
        stderr: String,
    },
    /// Request failed or returned an error status.
    #[error("HTTP error: {0}")]
    Http(String),
    /// I/O error while exchanging data.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Blocking task was cancelled or panicked.
    #[error("background task failed: {0}")]
    Task(String),
}
