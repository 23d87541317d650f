//! Native module discovery and the process-wide engine slot.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use once_cell::sync::OnceCell;
use tracing::debug;

use crate::error::{Error, Result};
use crate::reader::Engine;

#[cfg(windows)]
const MODULE_NAME: &str = "7z.dll";
#[cfg(not(windows))]
const MODULE_NAME: &str = "7z.so";

/// Stem used for the PATH fallback search.
const MODULE_STEM: &str = "7z";

static ENGINE: OnceCell<Arc<dyn Engine>> = OnceCell::new();

/// Locates the native codec module at its conventional install locations:
/// an executable-adjacent `codecs/` subfolder, the executable directory
/// itself, then the platform vendor folders, then `PATH`.
///
/// Discovery failure is a hard error; nothing at this layer retries or
/// degrades to a subset of formats.
pub fn discover_module() -> Result<PathBuf> {
    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(Path::to_path_buf));

    let mut candidates = Vec::new();
    if let Some(dir) = exe_dir {
        candidates.push(dir.join("codecs").join(MODULE_NAME));
        candidates.push(dir.join(MODULE_NAME));
    }
    for vendor in vendor_dirs() {
        candidates.push(vendor.join(MODULE_NAME));
    }

    for candidate in &candidates {
        if candidate.is_file() {
            debug!(path = %candidate.display(), "codec module found");
            return Ok(candidate.clone());
        }
    }

    if let Ok(found) = which::which(MODULE_STEM) {
        debug!(path = %found.display(), "codec module found on PATH");
        return Ok(found);
    }

    Err(Error::ModuleNotFound {
        searched: candidates.len() + 1,
    })
}

#[cfg(windows)]
fn vendor_dirs() -> Vec<PathBuf> {
    std::env::var_os("ProgramFiles")
        .map(|p| PathBuf::from(p).join("7-Zip"))
        .into_iter()
        .collect()
}

#[cfg(not(windows))]
fn vendor_dirs() -> Vec<PathBuf> {
    ["/usr/lib/p7zip", "/usr/lib/7zip", "/usr/local/lib/p7zip"]
        .iter()
        .map(PathBuf::from)
        .collect()
}

/// Installs the process-wide engine. The first call wins; returns `false`
/// if an engine was already installed.
pub fn set_engine(engine: Arc<dyn Engine>) -> bool {
    ENGINE.set(engine).is_ok()
}

/// Returns the process-wide engine, or `NotInitialized` if `set_engine`
/// was never called.
pub fn global_engine() -> Result<Arc<dyn Engine>> {
    ENGINE.get().cloned().ok_or(Error::NotInitialized)
}
