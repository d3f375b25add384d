//! Script task: one bundle per entry script.

use plinth_bundler::{BundleOptions, Bundler};
use rayon::prelude::*;

use crate::context::{BuildContext, OutputChange};
use crate::naming::AssetNames;
use crate::report::{FileOutcome, TaskError};
use crate::routes::Category;
use crate::tasks::write_output;

/// Bundler options for the current mode.
pub fn bundle_options(ctx: &BuildContext) -> BundleOptions {
    let target = ctx.options.script_target.clone();
    let mut options = if ctx.mode.is_development() {
        BundleOptions::development(target)
    } else {
        BundleOptions::production(target)
    };
    options.minify = ctx.options.minify;
    options
}

/// Bundle every public entry script into `js/<name>.js`.
pub fn run(ctx: &BuildContext) -> Vec<FileOutcome> {
    let routes = &ctx.routes;
    let entries = routes.source(Category::Scripts).files();
    let Some(out_dir) = routes.build_dir(Category::Scripts) else {
        return Vec::new();
    };
    if entries.is_empty() {
        return Vec::new();
    }

    let bundler = Bundler::new(bundle_options(ctx));
    let names = AssetNames::new(
        routes.category_dir(Category::Scripts),
        ctx.options.script_names.clone(),
    );

    let outcomes: Vec<FileOutcome> = names
        .assign(&entries)
        .into_par_iter()
        .map(|(entry, name)| {
            let result = name.and_then(|name| {
                let bundle = bundler.bundle(&entry).map_err(|source| TaskError::Bundle {
                    path: entry.display().to_string(),
                    source,
                })?;
                tracing::debug!("Bundled {} module(s) into {}", bundle.modules.len(), name);
                write_output(&out_dir.join(format!("{name}.js")), bundle.into_output().as_bytes())
            });
            FileOutcome {
                source: entry,
                result,
            }
        })
        .collect();

    if outcomes.iter().any(|o| o.result.is_ok()) {
        ctx.notify(OutputChange::Reload);
    }
    outcomes
}
