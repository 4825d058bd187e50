//! Process-scoped scratch directory and worker pool.
//!
//! Both live and die together: dropping the scope joins the pool's idle
//! workers and removes the scratch tree, whichever way the action exits.

use std::fs;
use std::path::{Path, PathBuf};

use rayon::{ThreadPool, ThreadPoolBuilder};
use tempfile::TempDir;
use tracing::debug;

use crate::error::{IoContext, Result};

pub const DEFAULT_WORKERS: usize = 15;

pub struct BuildScope {
    // Field order matters: the pool drops before the directory it writes into.
    pool: ThreadPool,
    scratch: TempDir,
}

impl BuildScope {
    pub fn new(workers: usize) -> Result<Self> {
        let scratch = tempfile::Builder::new()
            .prefix("android_resources_tmp")
            .tempdir()
            .at(&std::env::temp_dir())?;
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers.max(1))
            .thread_name(|i| format!("rescompile-worker-{i}"))
            .build()?;
        debug!(scratch = %scratch.path().display(), workers, "build scope opened");
        Ok(Self { pool, scratch })
    }

    pub fn path(&self) -> &Path {
        self.scratch.path()
    }

    pub fn pool(&self) -> &ThreadPool {
        &self.pool
    }

    /// Create (if needed) and return a named directory inside the scratch tree.
    pub fn subdir(&self, name: &str) -> Result<PathBuf> {
        let dir = self.scratch.path().join(name);
        fs::create_dir_all(&dir).at(&dir)?;
        Ok(dir)
    }
}
