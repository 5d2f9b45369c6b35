use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
pub enum MediaError {
    #[error("failed to read staged file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid image id '{0}'")]
    InvalidId(String),

    #[error("image store request failed: {0}")]
    Store(#[from] object_store::Error),

    #[error("image store misconfigured: {0}")]
    Config(String),
}

#[derive(thiserror::Error, Debug)]
pub enum StageError {
    #[error("file exceeds the {limit} byte limit")]
    TooLarge { limit: u64 },

    #[error("failed to read upload body: {0}")]
    Body(String),

    #[error("failed to stage upload: {0}")]
    Io(#[from] std::io::Error),
}
