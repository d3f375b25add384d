//! Build mode, options and the context threaded into every task.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;

use crate::routes::RouteTable;

/// Development or production build. Decided once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Development,
    Production,
}

impl Mode {
    pub fn from_dev_flag(dev: bool) -> Self {
        if dev {
            Mode::Development
        } else {
            Mode::Production
        }
    }

    pub fn is_development(self) -> bool {
        self == Mode::Development
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Development => "development",
            Mode::Production => "production",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Change pushed to live-reload clients after a task writes output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutputChange {
    /// Reload the whole page
    Reload,

    /// Swap these stylesheets (URL paths under the build root) in place
    Styles { paths: Vec<String> },
}

/// Receiver of output change notifications, i.e. the dev server.
pub trait ReloadSink: Send + Sync {
    fn notify(&self, change: OutputChange);
}

/// Tunables that are not paths.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Browserslist queries used for CSS prefixing
    pub browsers: Vec<String>,

    /// Downleveling target for scripts
    pub script_target: String,

    /// Minify styles and scripts
    pub minify: bool,

    /// Static template data, merged under the data files
    pub data: serde_json::Map<String, serde_json::Value>,

    /// Declared stylesheet names: published name -> directory under styles/
    pub style_names: BTreeMap<String, PathBuf>,

    /// Declared bundle names: published name -> directory under scripts/
    pub script_names: BTreeMap<String, PathBuf>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            browsers: vec!["defaults".to_string()],
            script_target: "es2015".to_string(),
            minify: true,
            data: serde_json::Map::new(),
            style_names: BTreeMap::new(),
            script_names: BTreeMap::new(),
        }
    }
}

/// Everything a task needs. Cheap to clone.
#[derive(Clone)]
pub struct BuildContext {
    pub routes: Arc<RouteTable>,
    pub mode: Mode,
    pub options: Arc<PipelineOptions>,
    reload: Option<Arc<dyn ReloadSink>>,
}

impl fmt::Debug for BuildContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildContext")
            .field("routes", &self.routes)
            .field("mode", &self.mode)
            .field("options", &self.options)
            .field("reload", &self.reload.is_some())
            .finish()
    }
}

impl BuildContext {
    pub fn new(routes: RouteTable, mode: Mode, options: PipelineOptions) -> Self {
        Self {
            routes: Arc::new(routes),
            mode,
            options: Arc::new(options),
            reload: None,
        }
    }

    /// Attach a live-reload sink. Ignored outside development mode.
    pub fn with_reload(mut self, sink: Arc<dyn ReloadSink>) -> Self {
        if self.mode.is_development() {
            self.reload = Some(sink);
        }
        self
    }

    pub fn notify(&self, change: OutputChange) {
        if let Some(sink) = &self.reload {
            sink.notify(change);
        }
    }
}
