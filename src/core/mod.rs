pub mod error;
pub mod types;

pub use error::{AggregateError, PrecompileError, Result};
pub use types::{quote, Diagnostic, DiagnosticList, Position};
