//! Glob pattern sets with `!`-prefixed excludes.

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Component, Path, PathBuf};

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use walkdir::WalkDir;

use crate::report::PipelineError;

const GLOB_META: &[char] = &['*', '?', '[', '{'];

/// Compiled include/exclude globs, relative to a root directory.
#[derive(Clone)]
pub struct PatternSet {
    root: PathBuf,
    patterns: Vec<String>,
    include: GlobSet,
    exclude: GlobSet,
    bases: Vec<PathBuf>,
}

impl fmt::Debug for PatternSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PatternSet")
            .field("root", &self.root)
            .field("patterns", &self.patterns)
            .finish_non_exhaustive()
    }
}

impl PatternSet {
    /// Compile `patterns` relative to `root`. Patterns starting with `!` exclude.
    pub fn new<S: AsRef<str>>(root: impl Into<PathBuf>, patterns: &[S]) -> Result<Self, PipelineError> {
        let mut include = GlobSetBuilder::new();
        let mut exclude = GlobSetBuilder::new();
        let mut bases = Vec::new();
        let mut originals = Vec::with_capacity(patterns.len());

        for pattern in patterns {
            let pattern = pattern.as_ref();
            originals.push(pattern.to_string());

            let (negated, glob_text) = match pattern.strip_prefix('!') {
                Some(rest) => (true, rest),
                None => (false, pattern),
            };

            let glob = GlobBuilder::new(glob_text)
                .literal_separator(true)
                .build()
                .map_err(|e| PipelineError::Pattern {
                    pattern: pattern.to_string(),
                    message: e.to_string(),
                })?;

            if negated {
                exclude.add(glob);
            } else {
                include.add(glob);
                let base = static_base(glob_text);
                if !bases.contains(&base) {
                    bases.push(base);
                }
            }
        }

        let build = |builder: GlobSetBuilder| {
            builder.build().map_err(|e| PipelineError::Pattern {
                pattern: originals.join(", "),
                message: e.to_string(),
            })
        };

        Ok(Self {
            root: root.into(),
            include: build(include)?,
            exclude: build(exclude)?,
            patterns: originals.clone(),
            bases,
        })
    }

    /// The patterns as written.
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// Root the patterns are relative to.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory beneath which the first include pattern starts matching.
    pub fn base(&self) -> PathBuf {
        match self.bases.first() {
            Some(base) => self.root.join(base),
            None => self.root.clone(),
        }
    }

    /// Whether `path` (absolute under the root, or root-relative) matches.
    pub fn is_match(&self, path: &Path) -> bool {
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        if relative.is_absolute() {
            return false;
        }
        let relative = to_slash(relative);
        self.include.is_match(&relative) && !self.exclude.is_match(&relative)
    }

    /// Every matching file, sorted.
    pub fn files(&self) -> Vec<PathBuf> {
        let mut found = BTreeSet::new();

        for base in &self.bases {
            let dir = self.root.join(base);
            if !dir.exists() {
                continue;
            }

            for entry in WalkDir::new(&dir)
                .follow_links(true)
                .into_iter()
                .filter_map(|e| e.ok())
            {
                let path = entry.path();
                if path.is_file() && self.is_match(path) {
                    found.insert(path.to_path_buf());
                }
            }
        }

        found.into_iter().collect()
    }
}

/// Leading path components that contain no glob syntax.
fn static_base(pattern: &str) -> PathBuf {
    let mut base = PathBuf::new();
    let components: Vec<&str> = pattern.split('/').collect();

    for (i, component) in components.iter().enumerate() {
        if component.contains(GLOB_META) {
            break;
        }
        // A fully literal pattern names a file; its base is the parent.
        if i == components.len() - 1 {
            break;
        }
        base.push(component);
    }

    base
}

fn to_slash(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn excludes_negated_patterns() {
        let set = PatternSet::new("/site/src", &["scripts/**/*.js", "!scripts/**/_*.js"]).unwrap();

        assert!(set.is_match(Path::new("/site/src/scripts/main/main.js")));
        assert!(set.is_match(Path::new("scripts/app.js")));
        assert!(!set.is_match(Path::new("/site/src/scripts/main/_util.js")));
        assert!(!set.is_match(Path::new("/site/src/styles/main/main.scss")));
    }

    #[test]
    fn single_star_stays_in_one_directory() {
        let set = PatternSet::new("/src", &["pages/*.hbs"]).unwrap();

        assert!(set.is_match(Path::new("/src/pages/index.hbs")));
        assert!(!set.is_match(Path::new("/src/pages/nested/about.hbs")));
    }

    #[test]
    fn computes_static_base() {
        assert_eq!(static_base("assets/fonts/**"), PathBuf::from("assets/fonts"));
        assert_eq!(static_base("styles/**/*.scss"), PathBuf::from("styles"));
        assert_eq!(static_base("pages/index.hbs"), PathBuf::from("pages"));
    }

    #[test]
    fn lists_matching_files_sorted() {
        let temp = tempdir().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("assets/img/icons")).unwrap();
        fs::write(root.join("assets/img/logo.png"), b"png").unwrap();
        fs::write(root.join("assets/img/icons/a.svg"), b"svg").unwrap();

        let set = PatternSet::new(root, &["assets/img/**"]).unwrap();
        let files = set.files();

        assert_eq!(
            files,
            vec![
                root.join("assets/img/icons/a.svg"),
                root.join("assets/img/logo.png")
            ]
        );
        assert_eq!(set.base(), root.join("assets/img"));
    }

    #[test]
    fn missing_directories_match_nothing() {
        let temp = tempdir().unwrap();
        let set = PatternSet::new(temp.path(), &["pages/*.hbs"]).unwrap();

        assert!(set.files().is_empty());
    }

    #[test]
    fn rejects_invalid_globs() {
        let err = PatternSet::new("/src", &["styles/[.scss"]).unwrap_err();

        assert!(matches!(err, PipelineError::Pattern { .. }));
    }
}
