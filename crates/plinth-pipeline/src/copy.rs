//! Fonts and images: byte-for-byte copies that keep their relative path.

use std::fs;
use std::path::Path;

use rayon::prelude::*;

use crate::context::{BuildContext, OutputChange};
use crate::report::{FileOutcome, TaskError};
use crate::routes::Category;
use crate::tasks::write_output;

/// Copy every file of `category` below its build directory.
pub fn run(ctx: &BuildContext, category: Category) -> Vec<FileOutcome> {
    let routes = &ctx.routes;
    let Some(out_dir) = routes.build_dir(category) else {
        return Vec::new();
    };
    let patterns = routes.source(category);
    let base = patterns.base();

    let outcomes: Vec<FileOutcome> = patterns
        .files()
        .into_par_iter()
        .map(|file| {
            let relative = file.strip_prefix(&base).unwrap_or(&file);
            let result = copy_file(&file, &out_dir.join(relative));
            FileOutcome {
                source: file,
                result,
            }
        })
        .collect();

    if outcomes.iter().any(|o| o.result.is_ok()) {
        ctx.notify(OutputChange::Reload);
    }
    outcomes
}

fn copy_file(from: &Path, to: &Path) -> Result<std::path::PathBuf, TaskError> {
    let bytes = fs::read(from).map_err(|e| TaskError::read(from, e))?;
    write_output(to, &bytes)
}
