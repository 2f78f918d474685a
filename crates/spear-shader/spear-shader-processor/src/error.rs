use std::path::PathBuf;

use thiserror::Error;

use crate::preprocess::PreprocessError;

#[derive(Debug, Error)]
pub enum ShaderError {
    #[error(transparent)]
    Preprocess(#[from] PreprocessError),

    #[error("{file}:{line}: {message}")]
    Parse { file: String, line: usize, message: String },

    #[error("{file}: invalid permutation declaration `{declaration}`")]
    Permutation { file: String, declaration: String },

    #[error("{what} `{name}` is declared with different definitions")]
    Conflict { what: &'static str, name: String },

    #[error("failed to access {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to compress shader data")]
    Compress(#[source] std::io::Error),

    #[error("translation of {path:?} failed: {message}")]
    Translate { path: PathBuf, message: String },
}

impl ShaderError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
