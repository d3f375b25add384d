//! Module graph walking and bundle assembly.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};

use oxc_sourcemap::{ConcatSourceMapBuilder, SourceMap};

use crate::emit::{emit_module, EmittedModule};
use crate::helpers;
use crate::resolve::NodeResolver;
use crate::traits::{Bundle, BundleError, BundleOptions, Resolver};

/// Module loader placed in front of every bundle. Each module is a
/// `[factory, dependency-map]` pair keyed by numeric id; the entry is id 0.
const PRELUDE: &str = "(function(modules,entry){var cache={};function load(id){var hit=cache[id];if(hit)return hit.exports;var module=cache[id]={exports:{}};var def=modules[id];def[0].call(module.exports,function(name){var dep=def[1][name];if(dep===undefined)throw new Error(\"Cannot find module '\"+name+\"'\");return load(dep)},module,module.exports);return module.exports}load(entry)})({";

struct ModuleRecord {
    path: PathBuf,
    emitted: EmittedModule,
    dependencies: BTreeMap<String, usize>,
}

/// Bundles an entry script and everything it requires into one file.
pub struct Bundler<R: Resolver = NodeResolver> {
    options: BundleOptions,
    resolver: R,
}

impl Bundler<NodeResolver> {
    /// Create a bundler with Node-style resolution.
    pub fn new(options: BundleOptions) -> Self {
        Self::with_resolver(options, NodeResolver::new())
    }
}

impl<R: Resolver> Bundler<R> {
    /// Create a bundler with a custom resolver.
    pub fn with_resolver(options: BundleOptions, resolver: R) -> Self {
        Self { options, resolver }
    }

    /// Bundle `entry` and its transitive dependencies.
    pub fn bundle(&self, entry: &Path) -> Result<Bundle, BundleError> {
        let mut ids: HashMap<PathBuf, usize> = HashMap::new();
        let mut queue: VecDeque<PathBuf> = VecDeque::new();
        let mut records: Vec<Option<ModuleRecord>> = Vec::new();

        ids.insert(entry.to_path_buf(), 0);
        records.push(None);
        queue.push_back(entry.to_path_buf());

        while let Some(path) = queue.pop_front() {
            let source = match helpers::source(&path) {
                Some(source) => source.to_string(),
                None => fs::read_to_string(&path).map_err(|e| BundleError::Read {
                    path: path.display().to_string(),
                    message: e.to_string(),
                })?,
            };

            let emitted = emit_module(&path, &source, &self.options)?;

            let mut dependencies = BTreeMap::new();
            for specifier in &emitted.dependencies {
                let resolved = self.resolver.resolve(specifier, &path)?;
                let id = match ids.get(&resolved) {
                    Some(id) => *id,
                    None => {
                        let id = records.len();
                        ids.insert(resolved.clone(), id);
                        records.push(None);
                        queue.push_back(resolved);
                        id
                    }
                };
                dependencies.insert(specifier.clone(), id);
            }

            tracing::debug!(
                "Compiled {} ({} dependencies)",
                path.display(),
                dependencies.len()
            );

            let id = ids[&path];
            records[id] = Some(ModuleRecord {
                path,
                emitted,
                dependencies,
            });
        }

        let records: Vec<ModuleRecord> = records.into_iter().flatten().collect();
        Ok(self.assemble(records))
    }

    fn assemble(&self, records: Vec<ModuleRecord>) -> Bundle {
        let mut code = String::from(PRELUDE);
        code.push('\n');
        let mut line = 1u32;
        let mut maps: Vec<(SourceMap, u32)> = Vec::new();
        let mut modules = Vec::with_capacity(records.len());

        for (id, record) in records.into_iter().enumerate() {
            let header = format!("{}:[function(require,module,exports){{\n", id);
            code.push_str(&header);
            line += 1;

            if let Some(map) = record.emitted.map {
                maps.push((map, line));
            }

            let mut body = record.emitted.code;
            if !body.ends_with('\n') {
                body.push('\n');
            }
            line += body.matches('\n').count() as u32;
            code.push_str(&body);

            let deps = serde_json::to_string(&record.dependencies).unwrap_or_else(|_| "{}".into());
            code.push_str(&format!("}},{}],\n", deps));
            line += 1;

            modules.push(record.path);
        }

        code.push_str("},0);\n");

        let map = if self.options.source_maps && !maps.is_empty() {
            let refs: Vec<(&SourceMap, u32)> = maps.iter().map(|(m, l)| (m, *l)).collect();
            Some(ConcatSourceMapBuilder::from_sourcemaps(&refs).into_sourcemap())
        } else {
            None
        };

        Bundle { code, modules, map }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn bundles_entry_with_private_dependency() {
        let temp = tempdir().unwrap();
        let dir = temp.path().join("scripts/main");
        write(
            &dir.join("_util.js"),
            "export function greet(name) { return `hello ${name}`; }\n",
        );
        write(
            &dir.join("main.js"),
            "import { greet } from './_util';\nconsole.log(greet('plinth'));\n",
        );

        let bundle = Bundler::new(BundleOptions::default())
            .bundle(&dir.join("main.js"))
            .unwrap();

        assert_eq!(bundle.modules.len(), 2);
        assert_eq!(bundle.modules[0], dir.join("main.js"));
        assert!(bundle.code.starts_with("(function(modules,entry)"));
        assert!(bundle.code.contains("\"./_util\":1"));
        assert!(bundle.map.is_none());
    }

    #[test]
    fn shared_dependencies_are_included_once() {
        let temp = tempdir().unwrap();
        let dir = temp.path().join("scripts/app");
        write(&dir.join("_shared.js"), "module.exports = 1;\n");
        write(&dir.join("_a.js"), "module.exports = require('./_shared') + 1;\n");
        write(
            &dir.join("app.js"),
            "var a = require('./_a');\nvar s = require('./_shared');\nconsole.log(a + s);\n",
        );

        let bundle = Bundler::new(BundleOptions::default())
            .bundle(&dir.join("app.js"))
            .unwrap();

        assert_eq!(bundle.modules.len(), 3);
    }

    #[test]
    fn circular_imports_terminate() {
        let temp = tempdir().unwrap();
        write(&temp.path().join("a.js"), "require('./b');\n");
        write(&temp.path().join("b.js"), "require('./a');\n");

        let bundle = Bundler::new(BundleOptions::default())
            .bundle(&temp.path().join("a.js"))
            .unwrap();

        assert_eq!(bundle.modules.len(), 2);
    }

    #[test]
    fn development_bundles_inline_a_source_map() {
        let temp = tempdir().unwrap();
        write(&temp.path().join("main.js"), "console.log('dev');\n");

        let bundle = Bundler::new(BundleOptions::development("es2015"))
            .bundle(&temp.path().join("main.js"))
            .unwrap();

        assert!(bundle.map.is_some());
        let output = bundle.into_output();
        assert!(output.contains("//# sourceMappingURL=data:application/json;"));
    }

    #[test]
    fn async_functions_bundle_without_node_modules() {
        let temp = tempdir().unwrap();
        write(
            &temp.path().join("main.js"),
            "async function f() { await 1; }\nf();\n",
        );

        let bundle = Bundler::new(BundleOptions::production("es2015"))
            .bundle(&temp.path().join("main.js"))
            .unwrap();

        assert!(bundle.modules.iter().any(|m| m.ends_with("asyncToGenerator.js")));
        assert!(bundle.modules.iter().skip(1).all(|m| helpers::is_embedded(m)));
        assert!(!bundle.code.contains("async function"));
    }

    #[test]
    fn object_spread_bundles_without_node_modules() {
        let temp = tempdir().unwrap();
        write(
            &temp.path().join("main.js"),
            "const a = { x: 1 };\nconsole.log({ ...a, y: 2 });\n",
        );

        let bundle = Bundler::new(BundleOptions::production("es2015"))
            .bundle(&temp.path().join("main.js"))
            .unwrap();

        for helper in ["objectSpread2.js", "defineProperty.js", "toPropertyKey.js", "toPrimitive.js"] {
            assert!(
                bundle.modules.iter().any(|m| m.ends_with(helper)),
                "missing {}",
                helper
            );
        }
        assert!(!bundle.code.contains("..."));
    }

    #[test]
    fn fails_on_unresolved_import() {
        let temp = tempdir().unwrap();
        write(&temp.path().join("main.js"), "import './nope';\n");

        let err = Bundler::new(BundleOptions::default())
            .bundle(&temp.path().join("main.js"))
            .unwrap_err();

        assert!(matches!(err, BundleError::Unresolved { .. }));
    }
}
