//! Prelude module for convenient imports.
//!
//! This module re-exports commonly used types for ergonomic imports:
//!
//! ```rust
//! use pipeflow_compiler::prelude::*;
//! ```

pub use crate::definition::{
    Edge, FlowControl, Node, NodeId, NodeRole, PipelineGraph, PipelineSettings, RuleKind,
};
pub use crate::engine::{CompiledPipeline, CompiledTrigger, CompilerConfig, PipelineCompiler};
pub use crate::error::{CompileError, CompileResult, Diagnostic};
pub use crate::registry::{ChainRegistry, CompileContext, HandleRegistry, TemplateRegistry};
pub use crate::state::{CompiledWorkflow, WorkflowState};
pub use crate::trigger::EventPattern;
