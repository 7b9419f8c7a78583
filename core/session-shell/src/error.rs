use session_core::SessionError;

#[derive(Debug, thiserror::Error)]
pub enum ShellError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("I/O error: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to render report: {0}")]
    Report(#[from] serde_json::Error),
}
