//! Scratch workspace management for conversions.
//!
//! A [`ScratchSpace`] owns a root directory; each conversion attempt
//! allocates its own uniquely named [`ScratchWorkspace`] beneath it. The
//! workspace is removed by [`ScratchWorkspace::release`], or best-effort on
//! drop if the owner bailed out early.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// Prefix for every workspace directory name.
const WORKSPACE_PREFIX: &str = "temp_";

/// Allocator for per-conversion scratch directories.
#[derive(Debug, Clone)]
pub struct ScratchSpace {
    root: PathBuf,
}

impl ScratchSpace {
    /// Create an allocator rooted at `root`. The root is created lazily on
    /// the first [`allocate`](Self::allocate).
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The directory under which workspaces are created.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create a fresh, uniquely named workspace directory (parents included).
    pub fn allocate(&self) -> hc_core::Result<ScratchWorkspace> {
        std::fs::create_dir_all(&self.root)?;

        let dir = tempfile::Builder::new()
            .prefix(WORKSPACE_PREFIX)
            .tempdir_in(&self.root)?;

        tracing::debug!("Allocated scratch workspace {}", dir.path().display());
        Ok(ScratchWorkspace { dir })
    }
}

/// A scratch directory exclusively owned by one conversion attempt.
///
/// # Example
///
/// ```no_run
/// use hc_av::ScratchSpace;
///
/// let scratch = ScratchSpace::new(std::env::temp_dir().join("hlscache"));
/// let ws = scratch.allocate().unwrap();
/// let source = ws.file("clip.mp4");
/// // ... download into `source`, transcode into ws.path() ...
/// ws.release().unwrap();
/// ```
#[derive(Debug)]
pub struct ScratchWorkspace {
    dir: TempDir,
}

impl ScratchWorkspace {
    /// Path to the workspace directory.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Path for a named file inside the workspace.
    pub fn file(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Recursively remove the workspace.
    ///
    /// A workspace that is already gone counts as released.
    ///
    /// # Errors
    ///
    /// Returns [`hc_core::Error::CleanupFailed`] for any I/O error other
    /// than "not found".
    pub fn release(self) -> hc_core::Result<()> {
        let path = self.dir.path().to_path_buf();
        match self.dir.close() {
            Ok(()) => {
                tracing::debug!("Released scratch workspace {}", path.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(hc_core::Error::CleanupFailed { path, source }),
        }
    }
}
