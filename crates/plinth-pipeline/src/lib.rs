//! Asset pipeline for plinth sites.
//!
//! Compiles Handlebars pages, SCSS stylesheets and bundled scripts, and copies
//! fonts and images, from a source tree into a build directory.

pub mod builder;
pub mod clean;
pub mod context;
pub mod copy;
pub mod entry;
pub mod naming;
pub mod pages;
pub mod patterns;
pub mod report;
pub mod routes;
pub mod runner;
pub mod scripts;
pub mod styles;
pub mod tasks;
pub mod templates;

pub use builder::SiteBuilder;
pub use context::{BuildContext, Mode, OutputChange, PipelineOptions, ReloadSink};
pub use entry::{plan_services, Service};
pub use naming::AssetNames;
pub use patterns::PatternSet;
pub use report::{BatchReport, BuildSummary, FileOutcome, PipelineError, TaskError};
pub use routes::{Category, RouteTable};
pub use runner::{TaskRunner, Trigger};
pub use tasks::{run_task, TaskKind};
pub use templates::TemplateEngine;
