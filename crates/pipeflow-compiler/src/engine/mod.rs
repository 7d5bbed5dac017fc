//! Pipeline compilation engine.
//!
//! This module turns a validated pipeline graph into its deployable form:
//! - [`PipelineCompiler`]: runs analysis, state synthesis and linking
//! - [`CompilerConfig`]: retry tiers and default item paths
//! - [`CompiledPipeline`]: the workflow, trigger rules and diagnostics

mod compiler;
mod config;
mod linker;
mod synthesizer;

pub use compiler::{CompiledPipeline, CompiledTrigger, PipelineCompiler};
pub use config::{
    ALL_ERRORS, CompilerConfig, CompilerConfigBuilder, DEFAULT_EXTERNAL_ITEMS_PATH,
    DEFAULT_ITEMS_PATH, MAX_CONCURRENCY, TRANSIENT_ERRORS,
};
