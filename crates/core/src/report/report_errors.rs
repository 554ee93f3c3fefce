use thiserror::Error;

/// Failures while producing an exported report.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    /// The image snapshot could not be decoded.
    #[error("Unreadable snapshot: {0}")]
    UnreadableSnapshot(String),

    /// The finished document could not be encoded or written.
    #[error("Failed to write report: {0}")]
    WriteFailed(String),
}
