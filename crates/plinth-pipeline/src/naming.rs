//! Published names for stylesheets and script bundles.
//!
//! One published file per source directory: `styles/main/main.scss` is
//! published as `main`. Declared names override the directory name.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::report::TaskError;

/// Declared mapping from published asset name to source directory.
#[derive(Debug, Clone)]
pub struct AssetNames {
    root: PathBuf,
    declared: BTreeMap<String, PathBuf>,
}

impl AssetNames {
    /// `root` is the category source directory; declared directories are relative to it.
    pub fn new(root: impl Into<PathBuf>, declared: BTreeMap<String, PathBuf>) -> Self {
        Self {
            root: root.into(),
            declared,
        }
    }

    /// Published name for an entry file.
    pub fn name_for(&self, entry: &Path) -> String {
        let dir = entry.parent().unwrap_or(Path::new(""));
        let relative = dir.strip_prefix(&self.root).unwrap_or(dir);

        if let Some((name, _)) = self.declared.iter().find(|(_, d)| d.as_path() == relative) {
            return name.clone();
        }

        match relative.file_name() {
            Some(dir_name) => dir_name.to_string_lossy().into_owned(),
            // Entry directly in the category root.
            None => entry
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default(),
        }
    }

    /// Name every entry. Entries are taken in order; an entry whose name is
    /// already taken gets a conflict error instead.
    pub fn assign(&self, entries: &[PathBuf]) -> Vec<(PathBuf, Result<String, TaskError>)> {
        let mut owners: BTreeMap<String, &Path> = BTreeMap::new();

        entries
            .iter()
            .map(|entry| {
                let name = self.name_for(entry);
                let result = match owners.get(&name) {
                    Some(owner) => Err(TaskError::NameConflict {
                        path: entry.display().to_string(),
                        name,
                        owner: owner.display().to_string(),
                    }),
                    None => {
                        owners.insert(name.clone(), entry);
                        Ok(name)
                    }
                };
                (entry.clone(), result)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn names(declared: &[(&str, &str)]) -> AssetNames {
        AssetNames::new(
            "/src/styles",
            declared
                .iter()
                .map(|(n, d)| (n.to_string(), PathBuf::from(d)))
                .collect(),
        )
    }

    #[test]
    fn names_after_containing_directory() {
        let names = names(&[]);

        assert_eq!(names.name_for(Path::new("/src/styles/main/main.scss")), "main");
        assert_eq!(names.name_for(Path::new("/src/styles/blog/index.scss")), "blog");
        assert_eq!(names.name_for(Path::new("/src/styles/pages/home/home.scss")), "home");
    }

    #[test]
    fn root_entries_use_their_stem() {
        let names = names(&[]);

        assert_eq!(names.name_for(Path::new("/src/styles/print.scss")), "print");
    }

    #[test]
    fn declared_names_win() {
        let names = names(&[("site", "main")]);

        assert_eq!(names.name_for(Path::new("/src/styles/main/main.scss")), "site");
        assert_eq!(names.name_for(Path::new("/src/styles/blog/blog.scss")), "blog");
    }

    #[test]
    fn second_entry_in_a_directory_conflicts() {
        let names = names(&[]);
        let assigned = names.assign(&[
            PathBuf::from("/src/styles/main/a.scss"),
            PathBuf::from("/src/styles/main/b.scss"),
        ]);

        assert_eq!(assigned[0].1.as_ref().unwrap(), "main");
        assert!(matches!(
            assigned[1].1,
            Err(TaskError::NameConflict { ref name, .. }) if name == "main"
        ));
    }
}
