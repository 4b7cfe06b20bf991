use std::path::PathBuf;
use thiserror::Error;

/// reasons a status query can fail, both recovered as an empty summary
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("not a git repository: {}", .0.display())]
    NotARepository(PathBuf),
    #[error("git status failed in {}: {reason}", path.display())]
    QueryFailed { path: PathBuf, reason: String },
}

impl QueryError {
    pub fn failed(path: &std::path::Path, reason: impl Into<String>) -> Self {
        Self::QueryFailed {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }
}
