//! Layout of the working directories inside a save directory.
//!
//! ```text
//! <saves>/
//!   world@1000.json     save files
//!   clade/
//!     config.ini        settings, created from the bundled template
//!     .cache/           one census record per save
//!     export/           split batch images
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::Result;

pub const CLADE_DIR: &str = "clade";
pub const CACHE_DIR: &str = ".cache";
pub const EXPORT_DIR: &str = "export";
pub const CONFIG_FILE: &str = "config.ini";

/// Settings template written on first run.
pub const DEFAULT_CONFIG: &str = include_str!("../../config.ini");

/// A directory of simulation saves.
#[derive(Debug, Clone)]
pub struct SaveDirectory {
    root: PathBuf,
}

impl SaveDirectory {
    /// Open an existing save directory.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("save directory {} does not exist", root.display()),
            )
            .into());
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `clade/`, created on demand.
    pub fn clade_dir(&self) -> Result<PathBuf> {
        self.seek(Path::new(CLADE_DIR))
    }

    /// `clade/.cache/`, created on demand.
    pub fn cache_dir(&self) -> Result<PathBuf> {
        self.seek(&Path::new(CLADE_DIR).join(CACHE_DIR))
    }

    /// `clade/export/`, created on demand.
    pub fn export_dir(&self) -> Result<PathBuf> {
        self.seek(&Path::new(CLADE_DIR).join(EXPORT_DIR))
    }

    /// Path of `clade/config.ini`, writing the default template first if it
    /// is missing. The flag tells whether the file was just created.
    pub fn config_status(&self) -> Result<(PathBuf, bool)> {
        let path = self.clade_dir()?.join(CONFIG_FILE);
        if path.exists() {
            return Ok((path, false));
        }
        fs::write(&path, DEFAULT_CONFIG)?;
        info!(path = %path.display(), "created default configuration");
        Ok((path, true))
    }

    pub fn config_path(&self) -> Result<PathBuf> {
        Ok(self.config_status()?.0)
    }

    /// Delete every cached census record.
    pub fn clear_cache(&self) -> Result<()> {
        clear(&self.cache_dir()?)
    }

    fn seek(&self, local: &Path) -> Result<PathBuf> {
        let path = self.root.join(local);
        fs::create_dir_all(&path)?;
        Ok(path)
    }
}

/// Remove the contents of `dir`, keeping the directory itself.
pub fn clear(dir: &Path) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            fs::remove_dir_all(&path)?;
        } else {
            fs::remove_file(&path)?;
        }
    }
    Ok(())
}
