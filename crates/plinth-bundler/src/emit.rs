//! Per-module compilation: downlevel, rewrite to CommonJS, minify and print.

use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;

use oxc_allocator::Allocator;
use oxc_codegen::{Codegen, CodegenOptions};
use oxc_minifier::{CompressOptions, MangleOptions, Minifier, MinifierOptions};
use oxc_parser::Parser;
use oxc_semantic::SemanticBuilder;
use oxc_sourcemap::{SourceMap, SourceMapBuilder};
use oxc_span::SourceType;
use oxc_transformer::{ESTarget, TransformOptions, Transformer};

use crate::esm::to_commonjs;
use crate::traits::{BundleError, BundleOptions};

/// A single compiled module, ready to be wrapped into a bundle.
#[derive(Debug)]
pub struct EmittedModule {
    /// Module body (CommonJS, possibly minified)
    pub code: String,

    /// Map from `code` back to the original source file
    pub map: Option<SourceMap>,

    /// Requested specifiers, in first-seen order
    pub dependencies: Vec<String>,
}

/// Compile one module.
///
/// The source is downleveled first, so helper imports injected by the
/// transformer are rewritten and bundled like any other import.
pub fn emit_module(
    path: &Path,
    source: &str,
    options: &BundleOptions,
) -> Result<EmittedModule, BundleError> {
    let display = path.display().to_string();

    if path.extension().is_some_and(|ext| ext == "json") {
        return emit_json(&display, source);
    }

    let source_type = SourceType::from_path(path).unwrap_or_else(|_| SourceType::mjs());

    // Stage 1: downlevel the original source.
    let (downleveled, source_map) = {
        let allocator = Allocator::default();
        let ret = Parser::new(&allocator, source, source_type).parse();
        if !ret.errors.is_empty() {
            return Err(parse_error(&display, &ret.errors));
        }

        let mut program = ret.program;
        let scoping = SemanticBuilder::new().build(&program).semantic.into_scoping();

        let transform_options =
            TransformOptions::from_target(&options.target).map_err(|e| BundleError::Transform {
                path: display.clone(),
                message: e.to_string(),
            })?;

        let ret = Transformer::new(&allocator, path, &transform_options)
            .build_with_scoping(scoping, &mut program);
        if !ret.errors.is_empty() {
            return Err(BundleError::Transform {
                path: display.clone(),
                message: join_errors(&ret.errors),
            });
        }

        let printed = Codegen::new()
            .with_options(CodegenOptions {
                source_map_path: options.source_maps.then(|| path.to_path_buf()),
                ..CodegenOptions::default()
            })
            .build(&program);

        (printed.code, printed.map)
    };

    // Stage 2: module syntax to CommonJS.
    let cjs = to_commonjs(&display, &downleveled, SourceType::mjs())?;

    // Stage 3: minify and print.
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, &cjs.code, SourceType::mjs()).parse();
    if !ret.errors.is_empty() {
        return Err(parse_error(&display, &ret.errors));
    }
    let mut program = ret.program;

    let scoping = if options.minify {
        Minifier::new(MinifierOptions {
            mangle: Some(MangleOptions::default()),
            compress: Some(CompressOptions {
                target: compress_target(&options.target),
                ..CompressOptions::default()
            }),
        })
        .build(&allocator, &mut program)
        .scoping
    } else {
        None
    };

    let base = if options.minify {
        CodegenOptions::minify()
    } else {
        CodegenOptions::default()
    };

    let printed = Codegen::new()
        .with_options(CodegenOptions {
            comments: options.keep_comments,
            source_map_path: options.source_maps.then(|| path.to_path_buf()),
            ..base
        })
        .with_scoping(scoping)
        .build(&program);

    let map = match (printed.map, source_map) {
        (Some(outer), Some(inner)) => Some(compose(&outer, &inner)),
        _ => None,
    };

    Ok(EmittedModule {
        code: printed.code,
        map,
        dependencies: cjs.dependencies,
    })
}

/// Syntax level the compressor may emit. Engine targets such as `chrome80`
/// have no ES year, so they get the oldest level the transformer produces.
fn compress_target(target: &str) -> ESTarget {
    target
        .split(',')
        .map(str::trim)
        .find_map(|t| ESTarget::from_str(&t.to_ascii_lowercase()).ok())
        .unwrap_or(ESTarget::ES2015)
}

fn emit_json(path: &str, source: &str) -> Result<EmittedModule, BundleError> {
    let value: serde_json::Value =
        serde_json::from_str(source).map_err(|e| BundleError::Parse {
            path: path.to_string(),
            message: e.to_string(),
        })?;

    Ok(EmittedModule {
        code: format!("module.exports = {};\n", value),
        map: None,
        dependencies: Vec::new(),
    })
}

/// Chain two source maps: `outer` maps output to an intermediate text,
/// `inner` maps that intermediate text to the original file.
fn compose(outer: &SourceMap, inner: &SourceMap) -> SourceMap {
    let lookup = inner.generate_lookup_table();
    let mut builder = SourceMapBuilder::default();
    let mut source_ids: HashMap<u32, u32> = HashMap::new();

    for token in outer.get_tokens() {
        let Some(original) =
            inner.lookup_token(&lookup, token.get_src_line(), token.get_src_col())
        else {
            continue;
        };
        let Some(src_id) = original.get_source_id() else {
            continue;
        };

        let new_id = *source_ids.entry(src_id).or_insert_with(|| {
            builder.add_source_and_content(
                inner.get_source(src_id).unwrap_or_default(),
                inner.get_source_content(src_id).unwrap_or_default(),
            )
        });

        let name_id = original
            .get_name_id()
            .and_then(|id| inner.get_name(id))
            .map(|name| builder.add_name(name));

        builder.add_token(
            token.get_dst_line(),
            token.get_dst_col(),
            original.get_src_line(),
            original.get_src_col(),
            Some(new_id),
            name_id,
        );
    }

    builder.into_sourcemap()
}

fn parse_error<E: std::fmt::Display>(path: &str, errors: &[E]) -> BundleError {
    BundleError::Parse {
        path: path.to_string(),
        message: join_errors(errors),
    }
}

fn join_errors<E: std::fmt::Display>(errors: &[E]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn downlevels_modern_syntax() {
        let emitted = emit_module(
            Path::new("main.js"),
            "const value = window.config ?? 1;\nconsole.log(value);\n",
            &BundleOptions::production("es2015"),
        )
        .unwrap();

        assert!(!emitted.code.contains("??"));
        assert!(emitted.code.contains("console.log"));
        assert!(emitted.map.is_none());
    }

    #[test]
    fn minified_output_stays_within_target() {
        let emitted = emit_module(
            Path::new("main.js"),
            "const value = window.config ?? 1;\nconst o = window.a?.b;\nconsole.log(value, o);\n",
            &BundleOptions::production("es2015"),
        )
        .unwrap();

        assert!(!emitted.code.contains("??"));
        assert!(!emitted.code.contains("?."));
    }

    #[test]
    fn compress_target_follows_build_target() {
        assert_eq!(compress_target("es2019"), ESTarget::ES2019);
        assert_eq!(compress_target("ES2020"), ESTarget::ES2020);
        assert_eq!(compress_target("chrome80"), ESTarget::ES2015);
        assert_eq!(compress_target("chrome80,es2017"), ESTarget::ES2017);
    }

    #[test]
    fn rewrites_imports_after_downleveling() {
        let emitted = emit_module(
            Path::new("main.js"),
            "import { greet } from './_util.js';\ngreet('there');\n",
            &BundleOptions::production("es2015"),
        )
        .unwrap();

        assert_eq!(emitted.dependencies, vec!["./_util.js".to_string()]);
        assert!(emitted.code.contains("require"));
        assert!(!emitted.code.contains("import"));
    }

    #[test]
    fn maps_back_to_original_source() {
        let emitted = emit_module(
            Path::new("src/scripts/main/main.js"),
            "const message = 'hello';\nconsole.log(message);\n",
            &BundleOptions::development("es2015"),
        )
        .unwrap();

        let map = emitted.map.expect("development builds carry a map");
        let json = map.to_json_string();
        assert!(json.contains("main.js"));
        assert!(json.contains("const message = 'hello';"));
    }

    #[test]
    fn wraps_json_modules() {
        let emitted = emit_module(
            Path::new("data.json"),
            r#"{ "name": "plinth" }"#,
            &BundleOptions::default(),
        )
        .unwrap();

        assert_eq!(emitted.code, "module.exports = {\"name\":\"plinth\"};\n");
    }

    #[test]
    fn reports_syntax_errors() {
        let err = emit_module(
            Path::new("broken.js"),
            "function (",
            &BundleOptions::default(),
        )
        .unwrap_err();

        assert!(matches!(err, BundleError::Parse { .. }));
    }
}
