//! Trait definitions and shared types for the bundler.

use std::path::{Path, PathBuf};

use oxc_sourcemap::SourceMap;

/// Options controlling how a bundle is produced.
#[derive(Debug, Clone)]
pub struct BundleOptions {
    /// Downleveling target, e.g. "es2015" or "chrome80"
    pub target: String,

    /// Emit a source map referencing the original module sources
    pub source_maps: bool,

    /// Keep comments in the emitted code
    pub keep_comments: bool,

    /// Minify each module
    pub minify: bool,
}

impl Default for BundleOptions {
    fn default() -> Self {
        Self {
            target: "es2015".to_string(),
            source_maps: false,
            keep_comments: false,
            minify: true,
        }
    }
}

impl BundleOptions {
    /// Options for development builds: source maps and comments kept.
    pub fn development(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            source_maps: true,
            keep_comments: true,
            minify: true,
        }
    }

    /// Options for production builds.
    pub fn production(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            ..Self::default()
        }
    }
}

/// A finished bundle.
#[derive(Debug)]
pub struct Bundle {
    /// Executable bundle code, without a source map reference
    pub code: String,

    /// Module paths in id order (the entry is first)
    pub modules: Vec<PathBuf>,

    /// Concatenated source map, when requested
    pub map: Option<SourceMap>,
}

impl Bundle {
    /// Final file contents, with the source map inlined as a data URL when present.
    pub fn into_output(self) -> String {
        match self.map {
            Some(map) => {
                let mut code = self.code;
                if !code.ends_with('\n') {
                    code.push('\n');
                }
                code.push_str("//# sourceMappingURL=");
                code.push_str(&map.to_data_url());
                code.push('\n');
                code
            }
            None => self.code,
        }
    }
}

/// Errors that can occur while bundling.
#[derive(Debug, thiserror::Error)]
pub enum BundleError {
    #[error("Failed to read {path}: {message}")]
    Read { path: String, message: String },

    #[error("Parse error in {path}: {message}")]
    Parse { path: String, message: String },

    #[error("Transform error in {path}: {message}")]
    Transform { path: String, message: String },

    #[error("Cannot resolve '{specifier}' from {importer}")]
    Unresolved { specifier: String, importer: String },

    #[error("Invalid package manifest {path}: {message}")]
    Package { path: String, message: String },
}

/// Trait for module specifier resolution.
pub trait Resolver: Send + Sync {
    /// Resolve `specifier` as written inside `importer` to a file on disk.
    fn resolve(&self, specifier: &str, importer: &Path) -> Result<PathBuf, BundleError>;
}
