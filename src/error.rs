use serde::Serialize;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

// Errors returned to Rust callers and, through `Serialize`, to the frontend.
// The presentation controller itself never produces one: a failed share only
// ever travels inside `ActivityOutcome::error`.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid arguments: {0}")]
    InvalidArgs(String),
    #[error("Failed to interact with native sharing API: {0}")]
    NativeApi(String),
    #[error("Temporary file operation failed: {0}")]
    TempFile(String),
    #[error("Sharing is not supported: {0}")]
    Unsupported(String),
    #[error("An activity sheet is already open for window `{0}`")]
    Busy(String),
    #[error("Custom action `{0}` failed: {1}")]
    ActionFailed(String, String),
    #[cfg(feature = "plugin")]
    #[error("Tauri API error: {0}")]
    Tauri(#[from] tauri::Error),
}

impl Serialize for Error {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.to_string().as_ref())
    }
}
