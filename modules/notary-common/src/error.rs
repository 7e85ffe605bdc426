use thiserror::Error;

#[derive(Error, Debug)]
pub enum NotaryError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Artifact error ({path}): {message}")]
    Artifact { path: String, message: String },

    #[error("Address resolution failed for {failed} of {total} identities")]
    Resolution { failed: usize, total: usize },
}
