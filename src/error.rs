//! Error taxonomy shared by every stage of the pipeline.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    /// Missing or mutually inconsistent inputs; raised before any compilation.
    #[error("configuration error: {0}")]
    Config(String),

    /// The declared resource tree is not a valid resource set.
    #[error("invalid resource set: {0}")]
    Validation(String),

    /// One compilation unit failed in the compiler backend.
    #[error("failed to compile {}: {message}", path.display())]
    Compile { path: PathBuf, message: String },

    #[error("data binding error in {}: {message}", path.display())]
    DataBinding { path: PathBuf, message: String },

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("malformed json: {0}")]
    Json(#[from] serde_json::Error),

    /// The archive does not hold what its header claims.
    #[error("cannot deserialize {}: {message}", path.display())]
    Deserialize { path: PathBuf, message: String },

    #[error("worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

impl Error {
    pub fn compile(path: &Path, message: impl Into<String>) -> Self {
        Error::Compile {
            path: path.to_path_buf(),
            message: message.into(),
        }
    }

    pub fn data_binding(path: &Path, message: impl Into<String>) -> Self {
        Error::DataBinding {
            path: path.to_path_buf(),
            message: message.into(),
        }
    }

    pub fn deserialize(path: &Path, message: impl Into<String>) -> Self {
        Error::Deserialize {
            path: path.to_path_buf(),
            message: message.into(),
        }
    }
}

/// Attach the offending path to an `io::Error`.
pub trait IoContext<T> {
    fn at(self, path: &Path) -> Result<T>;
}

impl<T> IoContext<T> for io::Result<T> {
    fn at(self, path: &Path) -> Result<T> {
        self.map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}
