//! Route table: where each asset category is read from, written to and watched.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::patterns::PatternSet;
use crate::report::PipelineError;

/// Logical asset categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    Pages,
    Components,
    Styles,
    Scripts,
    Data,
    Fonts,
    Images,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::Pages,
        Category::Components,
        Category::Styles,
        Category::Scripts,
        Category::Data,
        Category::Fonts,
        Category::Images,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Category::Pages => "pages",
            Category::Components => "components",
            Category::Styles => "styles",
            Category::Scripts => "scripts",
            Category::Data => "data",
            Category::Fonts => "fonts",
            Category::Images => "images",
        }
    }

    /// Directory of this category beneath the source root.
    pub fn source_subdir(self) -> &'static str {
        match self {
            Category::Pages => "pages",
            Category::Components => "components",
            Category::Styles => "styles",
            Category::Scripts => "scripts",
            Category::Data => "data",
            Category::Fonts => "assets/fonts",
            Category::Images => "assets/img",
        }
    }

    fn source_patterns(self) -> &'static [&'static str] {
        match self {
            Category::Pages => &["pages/*.hbs"],
            Category::Components => &["components/**/*.hbs"],
            Category::Styles => &["styles/**/*.scss", "!styles/**/_*.scss"],
            Category::Scripts => &["scripts/**/*.js", "!scripts/**/_*.js"],
            Category::Data => &["data/**/*.{json,yaml,yml}"],
            Category::Fonts => &["assets/fonts/**"],
            Category::Images => &["assets/img/**"],
        }
    }

    /// Output directory beneath the build root, for categories that publish.
    fn build_subdir(self) -> Option<&'static str> {
        match self {
            Category::Pages => Some(""),
            Category::Styles => Some("css"),
            Category::Scripts => Some("js"),
            Category::Fonts => Some("assets/fonts"),
            Category::Images => Some("assets/img"),
            Category::Components | Category::Data => None,
        }
    }

    /// Patterns whose changes should rebuild this category. Partials and
    /// inputs consumed by another category are folded into the consumer.
    fn watch_patterns(self) -> Option<&'static [&'static str]> {
        match self {
            Category::Pages => Some(&[
                "pages/*.hbs",
                "components/**/*.hbs",
                "data/**/*.{json,yaml,yml}",
            ]),
            Category::Styles => Some(&["styles/**/*.scss", "components/**/*.scss"]),
            Category::Scripts => Some(&["scripts/**/*.js"]),
            Category::Fonts => Some(&["assets/fonts/**"]),
            Category::Images => Some(&["assets/img/**"]),
            Category::Components | Category::Data => None,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Immutable path configuration, built once at startup.
#[derive(Debug, Clone)]
pub struct RouteTable {
    source_root: PathBuf,
    build_root: PathBuf,
    source: BTreeMap<Category, PatternSet>,
    build: BTreeMap<Category, PathBuf>,
    watch: BTreeMap<Category, PatternSet>,
}

impl RouteTable {
    /// Build the table for a source root and a build root.
    ///
    /// Relative roots are resolved against the current directory. The source
    /// root is canonicalized when it exists so watcher paths compare equal.
    pub fn new(
        source_root: impl AsRef<Path>,
        build_root: impl AsRef<Path>,
    ) -> Result<Self, PipelineError> {
        let source_root = absolute(source_root.as_ref());
        let source_root = source_root.canonicalize().unwrap_or(source_root);
        let build_root = absolute(build_root.as_ref());

        let mut source = BTreeMap::new();
        let mut build = BTreeMap::new();
        let mut watch = BTreeMap::new();

        for category in Category::ALL {
            source.insert(
                category,
                PatternSet::new(&source_root, category.source_patterns())?,
            );
            if let Some(subdir) = category.build_subdir() {
                let dir = if subdir.is_empty() {
                    build_root.clone()
                } else {
                    build_root.join(subdir)
                };
                build.insert(category, dir);
            }
            if let Some(patterns) = category.watch_patterns() {
                watch.insert(category, PatternSet::new(&source_root, patterns)?);
            }
        }

        Ok(Self {
            source_root,
            build_root,
            source,
            build,
            watch,
        })
    }

    pub fn source_root(&self) -> &Path {
        &self.source_root
    }

    pub fn build_root(&self) -> &Path {
        &self.build_root
    }

    /// Source patterns of a category.
    pub fn source(&self, category: Category) -> &PatternSet {
        &self.source[&category]
    }

    /// Output directory of a publishing category.
    pub fn build_dir(&self, category: Category) -> Option<&Path> {
        self.build.get(&category).map(|p| p.as_path())
    }

    /// Watch patterns of a category that supports rebuilds.
    pub fn watch(&self, category: Category) -> Option<&PatternSet> {
        self.watch.get(&category)
    }

    /// Absolute source directory of a category.
    pub fn category_dir(&self, category: Category) -> PathBuf {
        self.source_root.join(category.source_subdir())
    }
}

fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> RouteTable {
        RouteTable::new("/site/src", "/site/build").unwrap()
    }

    #[test]
    fn every_published_category_has_a_build_dir() {
        let routes = table();

        for category in Category::ALL {
            let consumed_elsewhere = matches!(category, Category::Components | Category::Data);
            assert_eq!(
                routes.build_dir(category).is_some(),
                !consumed_elsewhere,
                "{category}"
            );
        }
    }

    #[test]
    fn watch_patterns_cover_source_patterns() {
        let routes = table();

        for category in Category::ALL {
            let Some(watch) = routes.watch(category) else {
                continue;
            };
            for pattern in routes.source(category).patterns() {
                if pattern.starts_with('!') {
                    continue;
                }
                assert!(
                    watch.patterns().contains(pattern),
                    "{category} does not watch {pattern}"
                );
            }
        }
    }

    #[test]
    fn lays_out_build_directories() {
        let routes = table();

        assert_eq!(routes.build_dir(Category::Pages), Some(Path::new("/site/build")));
        assert_eq!(routes.build_dir(Category::Styles), Some(Path::new("/site/build/css")));
        assert_eq!(routes.build_dir(Category::Scripts), Some(Path::new("/site/build/js")));
        assert_eq!(
            routes.build_dir(Category::Fonts),
            Some(Path::new("/site/build/assets/fonts"))
        );
        assert_eq!(
            routes.build_dir(Category::Images),
            Some(Path::new("/site/build/assets/img"))
        );
    }

    #[test]
    fn style_partials_are_watched_but_not_built() {
        let routes = table();
        let partial = Path::new("/site/src/styles/main/_vars.scss");
        let component_style = Path::new("/site/src/components/header/header.scss");

        assert!(!routes.source(Category::Styles).is_match(partial));
        assert!(routes.watch(Category::Styles).unwrap().is_match(partial));
        assert!(routes.watch(Category::Styles).unwrap().is_match(component_style));
    }
}
