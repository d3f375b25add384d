//! Stylesheet task: SCSS compile, prefixing, minification and inline maps.

use std::path::{Path, PathBuf};

use base64::Engine;
use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use lightningcss::targets::{Browsers, Targets};
use parcel_sourcemap::SourceMap;
use rayon::prelude::*;

use crate::context::{BuildContext, OutputChange};
use crate::naming::AssetNames;
use crate::report::{FileOutcome, PipelineError, TaskError};
use crate::routes::Category;
use crate::tasks::write_output;

/// Resolve browserslist queries into lightningcss targets.
pub fn browser_targets(queries: &[String]) -> Result<Targets, PipelineError> {
    let browsers = Browsers::from_browserslist(queries).map_err(|e| PipelineError::Browsers {
        query: queries.join(", "),
        message: e.to_string(),
    })?;

    Ok(Targets {
        browsers,
        ..Targets::default()
    })
}

/// Compiles one entry stylesheet into publishable CSS.
pub struct StyleCompiler {
    load_paths: Vec<PathBuf>,
    targets: Targets,
    minify: bool,
    source_maps: bool,
}

impl StyleCompiler {
    pub fn new(ctx: &BuildContext) -> Result<Self, PipelineError> {
        let routes = &ctx.routes;
        Ok(Self {
            load_paths: vec![
                routes.source_root().to_path_buf(),
                routes.category_dir(Category::Styles),
                routes.category_dir(Category::Components),
            ],
            targets: browser_targets(&ctx.options.browsers)?,
            minify: ctx.options.minify,
            source_maps: ctx.mode.is_development(),
        })
    }

    pub fn compile(&self, entry: &Path) -> Result<String, TaskError> {
        let compile_error = |message: String| TaskError::Compile {
            path: entry.display().to_string(),
            message,
        };

        let mut options = grass::Options::default().style(grass::OutputStyle::Expanded);
        if let Some(dir) = entry.parent() {
            options = options.load_path(dir);
        }
        for path in &self.load_paths {
            options = options.load_path(path);
        }

        let css = grass::from_path(entry, &options).map_err(|e| compile_error(e.to_string()))?;

        let filename = entry.display().to_string();
        let mut sheet = StyleSheet::parse(
            &css,
            ParserOptions {
                filename: filename.clone(),
                ..ParserOptions::default()
            },
        )
        .map_err(|e| compile_error(e.to_string()))?;

        // Runs even without minification; this is where prefixes get added.
        sheet
            .minify(MinifyOptions {
                targets: self.targets,
                ..MinifyOptions::default()
            })
            .map_err(|e| compile_error(e.to_string()))?;

        let mut map = if self.source_maps {
            let mut map = SourceMap::new("/");
            map.add_source(&filename);
            map.set_source_content(0, &css)
                .map_err(|e| compile_error(e.to_string()))?;
            Some(map)
        } else {
            None
        };

        let output = sheet
            .to_css(PrinterOptions {
                minify: self.minify,
                targets: self.targets,
                source_map: map.as_mut(),
                ..PrinterOptions::default()
            })
            .map_err(|e| compile_error(e.to_string()))?;

        let mut code = output.code;
        if let Some(mut map) = map {
            let json = map.to_json(None).map_err(|e| compile_error(e.to_string()))?;
            code.push_str(&inline_map_comment(&json));
        }
        Ok(code)
    }
}

fn inline_map_comment(json: &str) -> String {
    let encoded = base64::engine::general_purpose::STANDARD.encode(json);
    format!("\n/*# sourceMappingURL=data:application/json;charset=utf-8;base64,{encoded} */\n")
}

/// Compile every entry stylesheet into `css/<name>.css`.
pub fn run(ctx: &BuildContext) -> Vec<FileOutcome> {
    let routes = &ctx.routes;
    let entries = routes.source(Category::Styles).files();
    if entries.is_empty() {
        return Vec::new();
    }

    let compiler = match StyleCompiler::new(ctx) {
        Ok(compiler) => compiler,
        Err(error) => {
            tracing::error!("{}", error);
            return entries
                .into_iter()
                .map(|entry| {
                    let message = error.to_string();
                    FileOutcome::failed(
                        entry.clone(),
                        TaskError::Compile {
                            path: entry.display().to_string(),
                            message,
                        },
                    )
                })
                .collect();
        }
    };

    let Some(out_dir) = routes.build_dir(Category::Styles) else {
        return Vec::new();
    };
    let names = AssetNames::new(
        routes.category_dir(Category::Styles),
        ctx.options.style_names.clone(),
    );

    let outcomes: Vec<FileOutcome> = names
        .assign(&entries)
        .into_par_iter()
        .map(|(entry, name)| {
            let result = name.and_then(|name| {
                let css = compiler.compile(&entry)?;
                write_output(&out_dir.join(format!("{name}.css")), css.as_bytes())
            });
            FileOutcome {
                source: entry,
                result,
            }
        })
        .collect();

    let paths: Vec<String> = outcomes
        .iter()
        .filter_map(|o| o.result.as_ref().ok())
        .filter_map(|p| p.strip_prefix(routes.build_root()).ok())
        .map(|p| format!("/{}", p.to_string_lossy().replace('\\', "/")))
        .collect();
    if !paths.is_empty() {
        ctx.notify(OutputChange::Styles { paths });
    }

    outcomes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{Mode, PipelineOptions};
    use crate::routes::RouteTable;
    use std::fs;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn context(dir: &TempDir, mode: Mode) -> BuildContext {
        let routes = RouteTable::new(dir.path().join("src"), dir.path().join("build")).unwrap();
        BuildContext::new(routes, mode, PipelineOptions::default())
    }

    #[test]
    fn compiles_entry_with_partial() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src");
        write(&src, "styles/main/_vars.scss", "$brand: #ff0000;");
        write(
            &src,
            "styles/main/main.scss",
            "@import 'vars';\n.title { color: $brand; }\n",
        );

        let compiler = StyleCompiler::new(&context(&dir, Mode::Production)).unwrap();
        let css = compiler.compile(&src.join("styles/main/main.scss")).unwrap();

        assert!(css.contains(".title{color:red}"), "{css}");
        assert!(!css.contains("sourceMappingURL"));
    }

    #[test]
    fn adds_vendor_prefixes_for_old_browsers() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src");
        write(&src, "styles/app/app.scss", ".box { user-select: none; }");

        let routes = RouteTable::new(&src, dir.path().join("build")).unwrap();
        let options = PipelineOptions {
            browsers: vec!["safari 12".to_string()],
            ..PipelineOptions::default()
        };
        let ctx = BuildContext::new(routes, Mode::Production, options);
        let css = StyleCompiler::new(&ctx)
            .unwrap()
            .compile(&src.join("styles/app/app.scss"))
            .unwrap();

        assert!(css.contains("-webkit-user-select:none"), "{css}");
    }

    #[test]
    fn development_inlines_source_map() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src");
        write(&src, "styles/main/main.scss", "a { color: blue; }");

        let compiler = StyleCompiler::new(&context(&dir, Mode::Development)).unwrap();
        let css = compiler.compile(&src.join("styles/main/main.scss")).unwrap();

        let (_, encoded) = css
            .split_once("/*# sourceMappingURL=data:application/json;charset=utf-8;base64,")
            .unwrap();
        let json = base64::engine::general_purpose::STANDARD
            .decode(encoded.trim_end().trim_end_matches("*/").trim_end())
            .unwrap();
        let json = String::from_utf8(json).unwrap();
        assert!(json.contains("sourcesContent"));
        assert!(json.contains("color: blue"));
    }

    #[test]
    fn compile_error_is_recorded_and_others_still_build() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src");
        write(&src, "styles/broken/broken.scss", ".a { color: $missing; }");
        write(&src, "styles/main/main.scss", "a { color: blue; }");

        let outcomes = run(&context(&dir, Mode::Production));

        assert_eq!(outcomes.len(), 2);
        let failed: Vec<_> = outcomes.iter().filter(|o| o.result.is_err()).collect();
        assert_eq!(failed.len(), 1);
        assert!(failed[0].source.ends_with("styles/broken/broken.scss"));
        assert!(dir.path().join("build/css/main.css").exists());
        assert!(!dir.path().join("build/css/broken.css").exists());
    }

    #[test]
    fn invalid_browserslist_query_is_rejected() {
        let err = browser_targets(&["not a real query at all".to_string()]).unwrap_err();
        assert!(matches!(err, PipelineError::Browsers { .. }));
    }
}
