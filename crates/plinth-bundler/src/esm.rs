//! Rewriting ES module syntax into CommonJS for the bundle runtime.
//!
//! Every replacement keeps the number of line breaks of the text it replaces,
//! so line numbers of the rewritten module match the input. Exported bindings
//! are assigned once at the end of the module, so they are not live.

use oxc_allocator::Allocator;
use oxc_ast::ast::{
    Argument, CallExpression, Declaration, ExportDefaultDeclarationKind, Expression,
    ImportDeclarationSpecifier, Statement,
};
use oxc_ast_visit::{walk, Visit};
use oxc_parser::Parser;
use oxc_span::{GetSpan, SourceType};

use crate::traits::BundleError;

/// A module whose import/export syntax has been replaced by `require` and `exports`.
#[derive(Debug, Clone, PartialEq)]
pub struct CommonJsModule {
    /// Rewritten code
    pub code: String,

    /// Requested specifiers, in first-seen order
    pub dependencies: Vec<String>,
}

struct Edit {
    start: usize,
    end: usize,
    replacement: String,
}

/// Rewrite `source` from ES module syntax to CommonJS.
///
/// Sources already written as CommonJS pass through unchanged, but their
/// `require("...")` calls are still collected as dependencies.
pub fn to_commonjs(
    path: &str,
    source: &str,
    source_type: SourceType,
) -> Result<CommonJsModule, BundleError> {
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, source, source_type).parse();

    if !ret.errors.is_empty() {
        let message = ret
            .errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ");
        return Err(BundleError::Parse {
            path: path.to_string(),
            message,
        });
    }

    let mut edits: Vec<Edit> = Vec::new();
    let mut trailer: Vec<String> = Vec::new();
    let mut dependencies: Vec<String> = Vec::new();
    let mut has_exports = false;
    let mut next_binding = 0usize;

    let mut fresh_binding = || {
        let name = format!("__plinth_m{}", next_binding);
        next_binding += 1;
        name
    };

    for stmt in &ret.program.body {
        match stmt {
            Statement::ImportDeclaration(decl) => {
                let (start, end) = (decl.span.start as usize, decl.span.end as usize);

                if decl.import_kind.is_type() {
                    edits.push(blank(source, start, end));
                    continue;
                }

                let specifier = decl.source.value.to_string();
                push_unique(&mut dependencies, &specifier);

                let replacement = match &decl.specifiers {
                    Some(specifiers) if !specifiers.is_empty() => {
                        let binding = fresh_binding();
                        let mut out = format!("var {} = require({});", binding, quote(&specifier));

                        for spec in specifiers {
                            match spec {
                                ImportDeclarationSpecifier::ImportDefaultSpecifier(s) => {
                                    out.push_str(&format!(
                                        " var {} = {};",
                                        s.local.name,
                                        default_of(&binding)
                                    ));
                                }
                                ImportDeclarationSpecifier::ImportNamespaceSpecifier(s) => {
                                    out.push_str(&format!(" var {} = {};", s.local.name, binding));
                                }
                                ImportDeclarationSpecifier::ImportSpecifier(s) => {
                                    if s.import_kind.is_type() {
                                        continue;
                                    }
                                    let imported = s.imported.name();
                                    let value = if imported.as_str() == "default" {
                                        default_of(&binding)
                                    } else {
                                        format!("{}[{}]", binding, quote(&imported))
                                    };
                                    out.push_str(&format!(" var {} = {};", s.local.name, value));
                                }
                            }
                        }
                        out
                    }
                    _ => format!("require({});", quote(&specifier)),
                };

                edits.push(replace(source, start, end, replacement));
            }

            Statement::ExportNamedDeclaration(decl) => {
                let (start, end) = (decl.span.start as usize, decl.span.end as usize);

                if decl.export_kind.is_type() {
                    edits.push(blank(source, start, end));
                    continue;
                }
                has_exports = true;

                if let Some(declaration) = &decl.declaration {
                    // Keep the declaration, drop the `export` keyword.
                    let decl_start = declaration.span().start as usize;
                    edits.push(replace(source, start, decl_start, String::new()));

                    for name in declared_names(declaration) {
                        trailer.push(format!("exports[{}] = {};", quote(&name), name));
                    }
                } else if let Some(from) = &decl.source {
                    let specifier = from.value.to_string();
                    push_unique(&mut dependencies, &specifier);

                    let binding = fresh_binding();
                    let mut out = format!("var {} = require({});", binding, quote(&specifier));
                    for spec in &decl.specifiers {
                        let local = spec.local.name();
                        let value = if local.as_str() == "default" {
                            default_of(&binding)
                        } else {
                            format!("{}[{}]", binding, quote(&local))
                        };
                        out.push_str(&format!(" exports[{}] = {};", quote(&spec.exported.name()), value));
                    }
                    edits.push(replace(source, start, end, out));
                } else {
                    for spec in &decl.specifiers {
                        trailer.push(format!(
                            "exports[{}] = {};",
                            quote(&spec.exported.name()),
                            spec.local.name()
                        ));
                    }
                    edits.push(blank(source, start, end));
                }
            }

            Statement::ExportDefaultDeclaration(decl) => {
                has_exports = true;
                let start = decl.span.start as usize;
                let decl_start = decl.declaration.span().start as usize;

                let named = match &decl.declaration {
                    ExportDefaultDeclarationKind::FunctionDeclaration(f) => {
                        f.id.as_ref().map(|id| id.name.to_string())
                    }
                    ExportDefaultDeclarationKind::ClassDeclaration(c) => {
                        c.id.as_ref().map(|id| id.name.to_string())
                    }
                    _ => None,
                };

                match named {
                    Some(name) => {
                        edits.push(replace(source, start, decl_start, String::new()));
                        trailer.push(format!("exports[\"default\"] = {};", name));
                    }
                    None => {
                        edits.push(replace(
                            source,
                            start,
                            decl_start,
                            "exports[\"default\"] = ".to_string(),
                        ));
                    }
                }
            }

            Statement::ExportAllDeclaration(decl) => {
                has_exports = true;
                let (start, end) = (decl.span.start as usize, decl.span.end as usize);
                let specifier = decl.source.value.to_string();
                push_unique(&mut dependencies, &specifier);

                let replacement = match &decl.exported {
                    Some(name) => format!(
                        "exports[{}] = require({});",
                        quote(&name.name()),
                        quote(&specifier)
                    ),
                    None => format!(
                        "(function (s) {{ for (var k in s) if (k !== \"default\" && !(k in exports)) exports[k] = s[k]; }})(require({}));",
                        quote(&specifier)
                    ),
                };
                edits.push(replace(source, start, end, replacement));
            }

            _ => {}
        }
    }

    let mut requires = RequireCollector::default();
    requires.visit_program(&ret.program);
    for specifier in &requires.specifiers {
        push_unique(&mut dependencies, specifier);
    }

    let mut code = apply_edits(source, edits);

    if has_exports {
        trailer.push("Object.defineProperty(exports, \"__esModule\", { value: true });".to_string());
    }
    if !trailer.is_empty() {
        if !code.ends_with('\n') {
            code.push('\n');
        }
        code.push_str(&trailer.join("\n"));
        code.push('\n');
    }

    Ok(CommonJsModule { code, dependencies })
}

/// Collects `require("literal")` calls. Other call shapes are left alone,
/// the runtime resolves them or fails at load time.
#[derive(Default)]
struct RequireCollector {
    specifiers: Vec<String>,
}

impl<'a> Visit<'a> for RequireCollector {
    fn visit_call_expression(&mut self, call: &CallExpression<'a>) {
        if let Expression::Identifier(callee) = &call.callee {
            if callee.name.as_str() == "require" && call.arguments.len() == 1 {
                if let Argument::StringLiteral(lit) = &call.arguments[0] {
                    push_unique(&mut self.specifiers, lit.value.as_str());
                }
            }
        }
        walk::walk_call_expression(self, call);
    }
}

fn declared_names(declaration: &Declaration<'_>) -> Vec<String> {
    match declaration {
        Declaration::VariableDeclaration(var) => var
            .declarations
            .iter()
            .flat_map(|d| d.id.get_binding_identifiers())
            .map(|id| id.name.to_string())
            .collect(),
        Declaration::FunctionDeclaration(f) => {
            f.id.iter().map(|id| id.name.to_string()).collect()
        }
        Declaration::ClassDeclaration(c) => c.id.iter().map(|id| id.name.to_string()).collect(),
        _ => Vec::new(),
    }
}

/// Interop read of a default export: ES modules expose `default`, CommonJS
/// modules are their own default.
fn default_of(binding: &str) -> String {
    format!(
        "({b} && {b}.__esModule ? {b}[\"default\"] : {b})",
        b = binding
    )
}

fn quote(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| format!("\"{}\"", s))
}

fn push_unique(list: &mut Vec<String>, value: &str) {
    if !list.iter().any(|v| v == value) {
        list.push(value.to_string());
    }
}

fn blank(source: &str, start: usize, end: usize) -> Edit {
    replace(source, start, end, String::new())
}

fn replace(source: &str, start: usize, end: usize, mut replacement: String) -> Edit {
    let newlines = source[start..end].matches('\n').count();
    for _ in 0..newlines {
        replacement.push('\n');
    }
    Edit {
        start,
        end,
        replacement,
    }
}

fn apply_edits(source: &str, mut edits: Vec<Edit>) -> String {
    edits.sort_by_key(|e| e.start);

    let mut out = String::with_capacity(source.len());
    let mut cursor = 0;
    for edit in edits {
        out.push_str(&source[cursor..edit.start]);
        out.push_str(&edit.replacement);
        cursor = edit.end;
    }
    out.push_str(&source[cursor..]);
    out
}
