#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

pub mod definition;
pub mod engine;
mod error;
pub mod graph;
pub mod registry;
pub mod state;
pub mod trigger;

#[doc(hidden)]
pub mod prelude;

pub use error::{CompileError, CompileResult, Diagnostic, Diagnostics};

/// Tracing target for compiler operations.
pub const TRACING_TARGET: &str = "pipeflow_compiler";
