//! Clean task: remove the whole build root.

use std::fs;
use std::io::ErrorKind;

use crate::report::PipelineError;
use crate::routes::RouteTable;

/// Delete the build root. An absent directory counts as clean.
///
/// Refuses to delete a build root that is, or contains, the source root.
pub fn clean(routes: &RouteTable) -> Result<(), PipelineError> {
    let build_root = routes.build_root();

    let resolved = build_root
        .canonicalize()
        .unwrap_or_else(|_| build_root.to_path_buf());
    if routes.source_root().starts_with(&resolved) {
        return Err(PipelineError::UnsafeClean(build_root.display().to_string()));
    }

    match fs::remove_dir_all(build_root) {
        Ok(()) => {
            tracing::debug!("Removed {}", build_root.display());
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(PipelineError::Clean {
            path: build_root.display().to_string(),
            message: e.to_string(),
        }),
    }
}
