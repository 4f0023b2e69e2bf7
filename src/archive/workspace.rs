use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::core::{FaturaError, Result};

/// Temporary extraction directory owned by a single run.
///
/// The directory is removed exactly once: by [`close`](Self::close), or on
/// drop when the run ends early.
#[derive(Debug)]
pub struct ScratchWorkspace {
    path: PathBuf,
    released: bool,
}

impl ScratchWorkspace {
    /// Create the workspace at `path`, clearing leftovers of an earlier run.
    pub fn create(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if path.exists() {
            warn!(dir = %path.display(), "removing stale scratch workspace");
            fs::remove_dir_all(&path).map_err(|e| {
                FaturaError::Workspace(format!("cannot clear {}: {e}", path.display()))
            })?;
        }
        fs::create_dir_all(&path).map_err(|e| {
            FaturaError::Workspace(format!("cannot create {}: {e}", path.display()))
        })?;
        debug!(dir = %path.display(), "scratch workspace created");

        Ok(Self {
            path,
            released: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the workspace now and report failure to the caller.
    pub fn close(mut self) -> Result<()> {
        self.release().map_err(Into::into)
    }

    fn release(&mut self) -> io::Result<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;
        match fs::remove_dir_all(&self.path) {
            Ok(()) => {
                info!(dir = %self.path.display(), "scratch workspace removed");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}

impl Drop for ScratchWorkspace {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            warn!(dir = %self.path.display(), error = %e, "could not remove scratch workspace");
        }
    }
}
