//! Handlebars rendering for pages.
//!
//! Components are registered as partials before any page renders. Data
//! files become top-level keys of the shared page context.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use handlebars::{handlebars_helper, Handlebars};
use pulldown_cmark::{html, Options, Parser};
use serde_json::Value;

use crate::context::BuildContext;
use crate::report::{FileOutcome, TaskError};
use crate::routes::Category;

handlebars_helper!(markdown: |text: str| render_markdown(text));

/// Render Markdown to HTML. Use with triple braces: `{{{markdown body}}}`.
pub fn render_markdown(text: &str) -> String {
    let parser = Parser::new_ext(text, Options::all());
    let mut out = String::with_capacity(text.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}

/// Handlebars registry with components and page data loaded.
pub struct TemplateEngine {
    registry: Handlebars<'static>,
    data: Value,
}

impl TemplateEngine {
    /// Load components and data files for a build.
    ///
    /// Broken components or data files do not stop the load. They come back
    /// as failed outcomes so the pages report can carry them.
    pub fn load(ctx: &BuildContext) -> (Self, Vec<FileOutcome>) {
        let mut registry = Handlebars::new();
        registry.register_helper("markdown", Box::new(markdown));

        let mut failures = Vec::new();

        let components_dir = ctx.routes.category_dir(Category::Components);
        let components = ctx.routes.source(Category::Components).files();
        for (name, path) in partial_names(&components_dir, &components) {
            let result = fs::read_to_string(&path)
                .map_err(|e| TaskError::read(&path, e))
                .and_then(|source| {
                    registry
                        .register_partial(&name, source)
                        .map_err(|e| TaskError::Render {
                            path: path.display().to_string(),
                            message: e.to_string(),
                        })
                });
            match result {
                Ok(()) => tracing::debug!("Registered partial {}", name),
                Err(error) => failures.push(FileOutcome::failed(&path, error)),
            }
        }

        let mut data = ctx.options.data.clone();
        for path in ctx.routes.source(Category::Data).files() {
            match load_data_file(&path) {
                Ok((key, value)) => {
                    data.insert(key, value);
                }
                Err(error) => failures.push(FileOutcome::failed(&path, error)),
            }
        }
        data.insert("mode".to_string(), Value::String(ctx.mode.to_string()));

        let engine = Self {
            registry,
            data: Value::Object(data),
        };
        (engine, failures)
    }

    /// Page context shared by every page.
    pub fn data(&self) -> &Value {
        &self.data
    }

    pub fn has_partial(&self, name: &str) -> bool {
        self.registry.get_template(name).is_some()
    }

    /// Render one page file.
    pub fn render_file(&self, path: &Path) -> Result<String, TaskError> {
        let source = fs::read_to_string(path).map_err(|e| TaskError::read(path, e))?;
        self.registry
            .render_template(&source, &self.data)
            .map_err(|e| TaskError::Render {
                path: path.display().to_string(),
                message: e.to_string(),
            })
    }
}

/// Partial names for component files: the path below the components
/// directory without extension, plus the bare stem when no other component
/// shares it.
fn partial_names(components_dir: &Path, files: &[PathBuf]) -> Vec<(String, PathBuf)> {
    let mut stems: HashMap<String, usize> = HashMap::new();
    for path in files {
        if let Some(stem) = path.file_stem() {
            *stems.entry(stem.to_string_lossy().into_owned()).or_default() += 1;
        }
    }

    let mut names = Vec::new();
    for path in files {
        let relative = path.strip_prefix(components_dir).unwrap_or(path);
        let full = relative
            .with_extension("")
            .to_string_lossy()
            .replace('\\', "/");

        if let Some(stem) = path.file_stem().map(|s| s.to_string_lossy().into_owned()) {
            if stems.get(&stem) == Some(&1) && stem != full {
                names.push((stem, path.clone()));
            }
        }
        names.push((full, path.clone()));
    }
    names
}

/// Parse a JSON or YAML data file. The key is the file stem.
fn load_data_file(path: &Path) -> Result<(String, Value), TaskError> {
    let content = fs::read_to_string(path).map_err(|e| TaskError::read(path, e))?;
    let key = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let parse_error = |message: String| TaskError::Compile {
        path: path.display().to_string(),
        message,
    };

    let value = match path.extension().and_then(|e| e.to_str()) {
        Some("yaml" | "yml") => {
            serde_yaml::from_str::<Value>(&content).map_err(|e| parse_error(e.to_string()))?
        }
        _ => serde_json::from_str::<Value>(&content).map_err(|e| parse_error(e.to_string()))?,
    };

    Ok((key, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{Mode, PipelineOptions};
    use crate::routes::RouteTable;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn context(dir: &TempDir, mode: Mode, options: PipelineOptions) -> BuildContext {
        let routes = RouteTable::new(dir.path().join("src"), dir.path().join("build")).unwrap();
        BuildContext::new(routes, mode, options)
    }

    #[test]
    fn registers_components_by_path_and_unique_stem() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src");
        write(&src, "components/header/header.hbs", "<header>hi</header>");
        write(&src, "components/cards/item.hbs", "<li>a</li>");
        write(&src, "components/lists/item.hbs", "<li>b</li>");

        let (engine, failures) = TemplateEngine::load(&context(&dir, Mode::Production, Default::default()));

        assert!(failures.is_empty());
        assert!(engine.has_partial("header/header"));
        assert!(engine.has_partial("header"));
        assert!(engine.has_partial("cards/item"));
        assert!(engine.has_partial("lists/item"));
        assert!(!engine.has_partial("item"));
    }

    #[test]
    fn renders_partials_and_data() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src");
        write(&src, "components/header/header.hbs", "<h1>{{site.title}}</h1>");
        write(&src, "data/site.json", r#"{"title": "Plinth"}"#);
        write(&src, "data/nav.yaml", "- home\n- about\n");
        write(
            &src,
            "pages/index.hbs",
            "{{> header}}{{#each nav}}[{{this}}]{{/each}} {{mode}} {{owner}}",
        );

        let mut options = PipelineOptions::default();
        options
            .data
            .insert("owner".to_string(), Value::String("me".to_string()));
        let (engine, _) = TemplateEngine::load(&context(&dir, Mode::Development, options));

        let html = engine.render_file(&src.join("pages/index.hbs")).unwrap();
        assert_eq!(html, "<h1>Plinth</h1>[home][about] development me");
    }

    #[test]
    fn data_files_override_configured_data() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src");
        write(&src, "data/site.json", r#"{"title": "From file"}"#);

        let mut options = PipelineOptions::default();
        options
            .data
            .insert("site".to_string(), serde_json::json!({"title": "From config"}));
        let (engine, _) = TemplateEngine::load(&context(&dir, Mode::Production, options));

        assert_eq!(engine.data()["site"]["title"], "From file");
        assert_eq!(engine.data()["mode"], "production");
    }

    #[test]
    fn missing_partial_is_a_render_error() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src");
        write(&src, "pages/broken.hbs", "{{> footer}}");

        let (engine, _) = TemplateEngine::load(&context(&dir, Mode::Production, Default::default()));
        let err = engine.render_file(&src.join("pages/broken.hbs")).unwrap_err();

        assert!(matches!(err, TaskError::Render { .. }));
    }

    #[test]
    fn broken_data_file_is_reported() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src");
        write(&src, "data/bad.json", "{ nope");

        let (_, failures) = TemplateEngine::load(&context(&dir, Mode::Production, Default::default()));

        assert_eq!(failures.len(), 1);
        assert!(failures[0].source.ends_with("data/bad.json"));
    }

    #[test]
    fn markdown_helper_renders_html() {
        assert_eq!(render_markdown("# Title"), "<h1>Title</h1>\n");
    }
}
