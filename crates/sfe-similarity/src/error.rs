use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum SimilarityError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("read error: {0}")]
    Read(#[from] std::io::Error),

    #[error("malformed embedding row on line {line}: {message}")]
    MalformedRow { line: usize, message: String },

    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("cannot sample hyperplanes for dimension {dim}: {message}")]
    Sampling { dim: usize, message: String },

    #[error("relation id {0} is not in the corpus dictionary")]
    UnknownRelation(u32),
}

pub type Result<T> = std::result::Result<T, SimilarityError>;

pub(crate) fn io_at(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> SimilarityError {
    let path = path.into();
    move |source| SimilarityError::Io { path, source }
}
