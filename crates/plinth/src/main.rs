//! Plinth CLI - static site asset pipeline.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use plinth_pipeline::{Mode, TaskKind};
use tracing_subscriber::{fmt, EnvFilter};

mod commands;
mod config;

#[derive(Parser)]
#[command(name = "plinth")]
#[command(about = "Build Handlebars pages, SCSS, scripts and assets into a static site")]
#[command(version)]
pub struct Cli {
    /// Task to run
    #[arg(value_enum, default_value_t = TaskName::Default)]
    task: TaskName,

    /// Development mode: source maps, watching and live reload
    #[arg(long)]
    dev: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Path to a plinth.toml config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Dev server port (overrides the config file)
    #[arg(short, long)]
    port: Option<u16>,

    /// Open a browser when the dev server starts
    #[arg(long)]
    open: bool,

    /// Overwrite existing files (init only)
    #[arg(short, long)]
    yes: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum TaskName {
    /// Build, then watch and serve in development mode
    #[value(alias = "tasks")]
    Default,
    /// Clean, then run every transform task
    Build,
    /// Delete the build directory
    Clean,
    /// Render Handlebars pages
    #[value(alias = "hbs")]
    Pages,
    /// Compile stylesheets
    #[value(alias = "scss")]
    Styles,
    /// Bundle scripts
    #[value(aliases = ["javascript", "js"])]
    Scripts,
    /// Copy fonts
    Fonts,
    /// Copy images
    #[value(alias = "img")]
    Images,
    /// Watch sources and re-run tasks, without a server
    Watch,
    /// Scaffold a starter source tree
    Init,
}

impl TaskName {
    fn transform(self) -> Option<TaskKind> {
        match self {
            TaskName::Pages => Some(TaskKind::Pages),
            TaskName::Styles => Some(TaskKind::Styles),
            TaskName::Scripts => Some(TaskKind::Scripts),
            TaskName::Fonts => Some(TaskKind::Fonts),
            TaskName::Images => Some(TaskKind::Images),
            _ => None,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    fmt().with_env_filter(filter).with_target(false).init();

    let mode = Mode::from_dev_flag(cli.dev);

    if cli.task == TaskName::Init {
        return commands::init::run(cli.yes).await;
    }

    let settings = commands::Settings::load(mode, cli.config.as_deref())?;

    match (cli.task, cli.task.transform()) {
        (_, Some(kind)) => commands::build::run_single(settings, kind).await?,
        (TaskName::Build, _) => commands::build::run(settings).await?,
        (TaskName::Clean, _) => commands::build::clean(settings).await?,
        (TaskName::Watch, _) => commands::dev::watch_only(settings).await?,
        _ => commands::dev::run(settings, cli.port, cli.open).await?,
    }

    Ok(())
}
