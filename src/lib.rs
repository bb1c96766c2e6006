//! Gno to Go precompiler.
//!
//! Parses `.gno` files, enforces the import whitelist, rewrites gno
//! namespaces into the Go module layout, emits position-preserving Go
//! source and translates Go toolchain errors back to gno positions.

pub mod build;
pub mod config;
pub mod core;
pub mod diagnostics;
pub mod emit;
pub mod package;
pub mod parser;
pub mod policy;
pub mod precompile;
pub mod rewrite;
pub mod source;

pub use crate::core::{AggregateError, Diagnostic, DiagnosticList, PrecompileError, Result};
pub use build::GoToolchain;
pub use config::Config;
pub use emit::GeneratedFile;
pub use package::PackageDriver;
pub use precompile::{Precompiled, Precompiler};
pub use source::{generated_name_and_tags, FileKind, MemPackage, SourceFile};
