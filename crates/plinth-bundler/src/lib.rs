//! Script bundler for plinth.
//!
//! Resolves an entry script's module graph, downlevels each module with oxc,
//! rewrites ES module syntax to CommonJS and concatenates the result behind a
//! small module loader.

pub mod bundler;
pub mod emit;
pub mod esm;
pub mod helpers;
pub mod resolve;
pub mod traits;

pub use bundler::Bundler;
pub use emit::{emit_module, EmittedModule};
pub use esm::{to_commonjs, CommonJsModule};
pub use resolve::NodeResolver;
pub use traits::{Bundle, BundleError, BundleOptions, Resolver};
