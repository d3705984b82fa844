//! Application directories on the system.

use std::path::{Path, PathBuf};

const APP_DIR: &str = "live_detect";

#[derive(Debug, Clone, Copy)]
pub enum FsAccess {
    Cache,
}

impl FsAccess {
    /// Base path for the directory type with the application subdirectory appended.
    fn get_path(&self) -> anyhow::Result<PathBuf> {
        let base_path = match self {
            FsAccess::Cache => dirs::cache_dir(),
        };

        let mut path = base_path.ok_or_else(|| {
            anyhow::anyhow!("Unsupported operating system. Supported OS: Linux, MacOS, Windows.")
        })?;
        path.push(APP_DIR);
        Ok(path)
    }

    /// Application directory with `subs` appended, created if missing.
    ///
    /// Examples:
    /// `~/.cache/live_detect/trt_engines`.
    pub fn path_with_subs(&self, subs: &[&str]) -> anyhow::Result<PathBuf> {
        let mut d = self.get_path()?;
        subs.iter().for_each(|sub| d.push(sub));
        create_directory(&d)?;
        Ok(d)
    }
}

fn create_directory(path: &Path) -> anyhow::Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}
