//! Command implementations.

use std::path::{Path, PathBuf};

use anyhow::Result;
use plinth_pipeline::{BuildContext, Mode};

use crate::config::ConfigFile;

pub mod build;
pub mod dev;
pub mod init;

/// Loaded configuration plus the build context derived from it.
pub struct Settings {
    pub config: ConfigFile,
    pub context: BuildContext,
}

impl Settings {
    pub fn load(mode: Mode, config_path: Option<&Path>) -> Result<Self> {
        let config = ConfigFile::load(config_path)?;
        let base = config_path
            .and_then(Path::parent)
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let context = config.context(mode, &base)?;
        Ok(Self { config, context })
    }
}
