//! Page task: render `pages/*.hbs` into `<build>/<stem>.html`.

use rayon::prelude::*;

use crate::context::{BuildContext, OutputChange};
use crate::report::FileOutcome;
use crate::routes::Category;
use crate::tasks::write_output;
use crate::templates::TemplateEngine;

pub fn run(ctx: &BuildContext) -> Vec<FileOutcome> {
    let routes = &ctx.routes;
    let Some(out_dir) = routes.build_dir(Category::Pages) else {
        return Vec::new();
    };
    let pages = routes.source(Category::Pages).files();

    let (engine, mut outcomes) = TemplateEngine::load(ctx);

    let rendered: Vec<FileOutcome> = pages
        .into_par_iter()
        .map(|page| {
            let result = engine.render_file(&page).and_then(|html| {
                let stem = page.file_stem().unwrap_or_default().to_string_lossy();
                let output = out_dir.join(format!("{stem}.html"));
                write_output(&output, html.as_bytes())
            });
            FileOutcome {
                source: page,
                result,
            }
        })
        .collect();

    if rendered.iter().any(|o| o.result.is_ok()) {
        ctx.notify(OutputChange::Reload);
    }

    outcomes.extend(rendered);
    outcomes
}
