//! Read-only collaborator registries.
//!
//! Compute handles, processor chains and trigger templates are resolved by
//! external collaborators before a compile starts. The registries hold those
//! results in memory and are threaded into the compiler through a
//! [`CompileContext`]; nothing is cached between compiles.

mod chain;
mod handle;
mod template;

pub use chain::ChainRegistry;
pub use handle::{ComputeHandle, HandleRegistry};
pub use template::TemplateRegistry;

/// Collaborator inputs for one compile.
#[derive(Debug, Clone, Default)]
pub struct CompileContext {
    /// Node ID to compute handle table.
    pub handles: HandleRegistry,
    /// Map node ID to processor chain table.
    pub chains: ChainRegistry,
    /// Rule kind to trigger template table.
    pub templates: TemplateRegistry,
}

impl CompileContext {
    /// Creates an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the compute handle table.
    pub fn with_handles(mut self, handles: HandleRegistry) -> Self {
        self.handles = handles;
        self
    }

    /// Sets the processor chain table.
    pub fn with_chains(mut self, chains: ChainRegistry) -> Self {
        self.chains = chains;
        self
    }

    /// Sets the trigger template table.
    pub fn with_templates(mut self, templates: TemplateRegistry) -> Self {
        self.templates = templates;
        self
    }
}
