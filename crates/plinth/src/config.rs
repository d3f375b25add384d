//! Optional `plinth.toml` configuration.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use plinth_pipeline::{BuildContext, Mode, PipelineOptions, RouteTable};
use plinth_server::DevServerConfig;
use serde::Deserialize;

/// Configuration file structure.
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub build: BuildSettings,
    #[serde(default)]
    pub styles: StylesConfig,
    #[serde(default)]
    pub scripts: ScriptsConfig,
    #[serde(default)]
    pub bundles: BundlesConfig,
    #[serde(default)]
    pub data: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "default_source")]
    pub source: PathBuf,
    #[serde(default = "default_build")]
    pub build: PathBuf,
}

#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub open: bool,
}

#[derive(Debug, Deserialize)]
pub struct BuildSettings {
    #[serde(default = "default_minify")]
    pub minify: bool,
}

#[derive(Debug, Deserialize)]
pub struct StylesConfig {
    /// Browserslist queries for prefixing
    #[serde(default = "default_browsers")]
    pub browsers: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct ScriptsConfig {
    /// Downleveling target
    #[serde(default = "default_target")]
    pub target: String,
}

/// Declared asset names: published name -> directory under the category root.
#[derive(Debug, Deserialize, Default)]
pub struct BundlesConfig {
    #[serde(default)]
    pub styles: BTreeMap<String, PathBuf>,
    #[serde(default)]
    pub scripts: BTreeMap<String, PathBuf>,
}

fn default_source() -> PathBuf {
    PathBuf::from("src")
}
fn default_build() -> PathBuf {
    PathBuf::from("build")
}
fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    3000
}
fn default_minify() -> bool {
    true
}
fn default_browsers() -> Vec<String> {
    vec!["defaults".to_string()]
}
fn default_target() -> String {
    "es2015".to_string()
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            source: default_source(),
            build: default_build(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            open: false,
        }
    }
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self {
            minify: default_minify(),
        }
    }
}

impl Default for StylesConfig {
    fn default() -> Self {
        Self {
            browsers: default_browsers(),
        }
    }
}

impl Default for ScriptsConfig {
    fn default() -> Self {
        Self {
            target: default_target(),
        }
    }
}

impl ConfigFile {
    /// Read the file at `path`, or the defaults when no path was given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: ConfigFile = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        tracing::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Build context for the given mode. Paths are resolved against the
    /// config file's directory when there is one.
    pub fn context(&self, mode: Mode, base: &Path) -> Result<BuildContext> {
        let routes = RouteTable::new(base.join(&self.paths.source), base.join(&self.paths.build))
            .context("Invalid route table")?;

        let options = PipelineOptions {
            browsers: self.styles.browsers.clone(),
            script_target: self.scripts.target.clone(),
            minify: self.build.minify,
            data: self.data.clone(),
            style_names: self.bundles.styles.clone(),
            script_names: self.bundles.scripts.clone(),
        };

        // Surface a bad browserslist query before any task runs.
        plinth_pipeline::styles::browser_targets(&options.browsers)?;

        Ok(BuildContext::new(routes, mode, options))
    }

    /// Dev server settings, with command line overrides applied.
    pub fn server(&self, root: &Path, port: Option<u16>, open: bool) -> DevServerConfig {
        DevServerConfig {
            root: root.to_path_buf(),
            host: self.server.host.clone(),
            port: port.unwrap_or(self.server.port),
            open: open || self.server.open,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[test]
    fn defaults_without_a_file() {
        let config = ConfigFile::load(None).unwrap();

        assert_eq!(config.paths.source, PathBuf::from("src"));
        assert_eq!(config.paths.build, PathBuf::from("build"));
        assert_eq!(config.server.port, 3000);
        assert!(!config.server.open);
        assert_eq!(config.scripts.target, "es2015");
    }

    #[test]
    fn parses_every_section() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("plinth.toml");
        fs::write(
            &path,
            r#"
[paths]
source = "site"
build = "public"

[server]
port = 8080

[build]
minify = false

[styles]
browsers = ["last 2 versions"]

[scripts]
target = "es2017"

[bundles.styles]
site = "main"

[data]
firstName = "Ada"
"#,
        )
        .unwrap();

        let config = ConfigFile::load(Some(&path)).unwrap();

        assert_eq!(config.paths.source, PathBuf::from("site"));
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "127.0.0.1");
        assert!(!config.build.minify);
        assert_eq!(config.styles.browsers, vec!["last 2 versions".to_string()]);
        assert_eq!(config.bundles.styles["site"], PathBuf::from("main"));
        assert_eq!(config.data["firstName"], "Ada");
    }

    #[test]
    fn rejects_malformed_file() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("plinth.toml");
        fs::write(&path, "[paths\nsource = 1").unwrap();

        assert!(ConfigFile::load(Some(&path)).is_err());
    }

    #[test]
    fn command_line_overrides_server_settings() {
        let config = ConfigFile::default();
        let server = config.server(Path::new("build"), Some(4000), true);

        assert_eq!(server.port, 4000);
        assert!(server.open);
    }

    #[test]
    fn context_resolves_paths_against_base() {
        let temp = tempdir().unwrap();
        let ctx = ConfigFile::default()
            .context(Mode::Production, temp.path())
            .unwrap();

        assert!(ctx.routes.build_root().ends_with("build"));
        assert_eq!(ctx.mode, Mode::Production);
    }
}
