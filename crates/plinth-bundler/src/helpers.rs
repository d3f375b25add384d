//! Runtime helpers imported by downleveled code.
//!
//! The transformer rewrites syntax such as `async` functions and object
//! spread into calls to `@oxc-project/runtime/helpers/<name>`. When no such
//! package is installed, the resolver falls back to the copies below, which
//! are served from a virtual directory and never touch the filesystem.

use std::path::{Path, PathBuf};

/// Package the transformer imports helpers from.
pub const RUNTIME_PACKAGE: &str = "@oxc-project/runtime";

/// Directory prefix of virtual helper paths.
const VIRTUAL_DIR: &str = "<plinth-runtime>/helpers";

static HELPERS: &[(&str, &str)] = &[
    ("OverloadYield", include_str!("helpers/OverloadYield.js")),
    ("assertClassBrand", include_str!("helpers/assertClassBrand.js")),
    ("asyncGeneratorDelegate", include_str!("helpers/asyncGeneratorDelegate.js")),
    ("asyncIterator", include_str!("helpers/asyncIterator.js")),
    ("asyncToGenerator", include_str!("helpers/asyncToGenerator.js")),
    ("awaitAsyncGenerator", include_str!("helpers/awaitAsyncGenerator.js")),
    ("checkInRHS", include_str!("helpers/checkInRHS.js")),
    ("checkPrivateRedeclaration", include_str!("helpers/checkPrivateRedeclaration.js")),
    ("classPrivateFieldGet2", include_str!("helpers/classPrivateFieldGet2.js")),
    ("classPrivateFieldInitSpec", include_str!("helpers/classPrivateFieldInitSpec.js")),
    ("classPrivateFieldLooseBase", include_str!("helpers/classPrivateFieldLooseBase.js")),
    ("classPrivateFieldLooseKey", include_str!("helpers/classPrivateFieldLooseKey.js")),
    ("classPrivateFieldSet2", include_str!("helpers/classPrivateFieldSet2.js")),
    ("classPrivateMethodInitSpec", include_str!("helpers/classPrivateMethodInitSpec.js")),
    ("defineProperty", include_str!("helpers/defineProperty.js")),
    ("extends", include_str!("helpers/extends.js")),
    ("objectDestructuringEmpty", include_str!("helpers/objectDestructuringEmpty.js")),
    ("objectSpread2", include_str!("helpers/objectSpread2.js")),
    ("objectWithoutProperties", include_str!("helpers/objectWithoutProperties.js")),
    ("readOnlyError", include_str!("helpers/readOnlyError.js")),
    ("superPropGet", include_str!("helpers/superPropGet.js")),
    ("superPropSet", include_str!("helpers/superPropSet.js")),
    ("toPrimitive", include_str!("helpers/toPrimitive.js")),
    ("toPropertyKey", include_str!("helpers/toPropertyKey.js")),
    ("toSetter", include_str!("helpers/toSetter.js")),
    ("wrapAsyncGenerator", include_str!("helpers/wrapAsyncGenerator.js")),
    ("writeOnlyError", include_str!("helpers/writeOnlyError.js")),
];

fn lookup(name: &str) -> Option<&'static str> {
    let name = name.strip_suffix(".js").unwrap_or(name);
    HELPERS
        .iter()
        .find(|(helper, _)| *helper == name)
        .map(|(_, source)| *source)
}

fn virtual_path(name: &str) -> PathBuf {
    let name = name.strip_suffix(".js").unwrap_or(name);
    PathBuf::from(format!("{}/{}.js", VIRTUAL_DIR, name))
}

/// Whether `path` names a bundled helper rather than a file on disk.
pub fn is_embedded(path: &Path) -> bool {
    path.starts_with(VIRTUAL_DIR)
}

/// Resolve `specifier` to a bundled helper.
///
/// Bare `@oxc-project/runtime/helpers/<name>` specifiers resolve from any
/// importer; `./<name>` resolves only between helpers.
pub fn resolve(specifier: &str, importer: &Path) -> Option<PathBuf> {
    let name = match specifier.strip_prefix(RUNTIME_PACKAGE) {
        Some(rest) => rest.strip_prefix("/helpers/")?,
        None if is_embedded(importer) => specifier.strip_prefix("./")?,
        None => return None,
    };

    lookup(name).map(|_| virtual_path(name))
}

/// Source of a virtual helper path.
pub fn source(path: &Path) -> Option<&'static str> {
    if !is_embedded(path) {
        return None;
    }
    path.file_name()
        .and_then(|name| name.to_str())
        .and_then(lookup)
}
