//! Node-style module resolution.

use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::helpers;
use crate::traits::{BundleError, Resolver};

/// Extensions tried, in order, when a specifier has none.
const EXTENSIONS: &[&str] = &["js", "mjs", "cjs", "json"];

/// Resolves relative specifiers against the importer and bare specifiers
/// through ancestor `node_modules` directories. Transformer helpers fall back
/// to the copies bundled with the crate.
#[derive(Debug, Default, Clone)]
pub struct NodeResolver;

impl NodeResolver {
    /// Create a new resolver.
    pub fn new() -> Self {
        Self
    }

    fn resolve_file_or_dir(&self, candidate: &Path) -> Option<PathBuf> {
        if candidate.is_file() {
            return Some(candidate.to_path_buf());
        }

        for ext in EXTENSIONS {
            let mut with_ext = candidate.as_os_str().to_owned();
            with_ext.push(".");
            with_ext.push(ext);
            let with_ext = PathBuf::from(with_ext);
            if with_ext.is_file() {
                return Some(with_ext);
            }
        }

        if candidate.is_dir() {
            let index = candidate.join("index.js");
            if index.is_file() {
                return Some(index);
            }
        }

        None
    }

    fn resolve_package(&self, package_dir: &Path) -> Result<Option<PathBuf>, BundleError> {
        let manifest_path = package_dir.join("package.json");

        if manifest_path.is_file() {
            let content = fs::read_to_string(&manifest_path).map_err(|e| BundleError::Read {
                path: manifest_path.display().to_string(),
                message: e.to_string(),
            })?;
            let manifest: serde_json::Value =
                serde_json::from_str(&content).map_err(|e| BundleError::Package {
                    path: manifest_path.display().to_string(),
                    message: e.to_string(),
                })?;

            // A string "browser" field replaces "main"; object forms are ignored.
            let main = manifest
                .get("browser")
                .and_then(|v| v.as_str())
                .or_else(|| manifest.get("main").and_then(|v| v.as_str()));

            if let Some(main) = main {
                if let Some(found) = self.resolve_file_or_dir(&package_dir.join(main)) {
                    return Ok(Some(found));
                }
            }
        }

        Ok(self.resolve_file_or_dir(&package_dir.join("index")))
    }
}

impl Resolver for NodeResolver {
    fn resolve(&self, specifier: &str, importer: &Path) -> Result<PathBuf, BundleError> {
        let unresolved = || BundleError::Unresolved {
            specifier: specifier.to_string(),
            importer: importer.display().to_string(),
        };

        if helpers::is_embedded(importer) {
            return helpers::resolve(specifier, importer).ok_or_else(unresolved);
        }

        let base = importer.parent().unwrap_or(Path::new(""));

        if is_relative(specifier) || Path::new(specifier).is_absolute() {
            return self
                .resolve_file_or_dir(&normalize(&base.join(specifier)))
                .ok_or_else(unresolved);
        }

        let (package, subpath) = split_package(specifier);

        for dir in base.ancestors() {
            let package_dir = dir.join("node_modules").join(package);
            if !package_dir.is_dir() {
                continue;
            }

            let found = match subpath {
                Some(sub) => self.resolve_file_or_dir(&package_dir.join(sub)),
                None => self.resolve_package(&package_dir)?,
            };

            if let Some(found) = found {
                return Ok(found);
            }
        }

        helpers::resolve(specifier, importer).ok_or_else(unresolved)
    }
}

/// Lexically drop `.` and fold `..` so one file always gets one path.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}

fn is_relative(specifier: &str) -> bool {
    specifier == "." || specifier == ".." || specifier.starts_with("./") || specifier.starts_with("../")
}

/// Split "pkg/sub/path" or "@scope/pkg/sub" into package name and subpath.
fn split_package(specifier: &str) -> (&str, Option<&str>) {
    let boundary = if specifier.starts_with('@') {
        specifier
            .match_indices('/')
            .nth(1)
            .map(|(i, _)| i)
    } else {
        specifier.find('/')
    };

    match boundary {
        Some(i) => (&specifier[..i], Some(&specifier[i + 1..])),
        None => (specifier, None),
    }
}
