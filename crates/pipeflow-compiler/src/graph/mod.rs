//! Graph analysis and state naming.
//!
//! This module provides the read-only view the compiler works on:
//! - [`GraphAnalyzer`]: validates a [`PipelineGraph`] and folds processor
//!   chains into their owning Map nodes
//! - [`Analysis`]: ordered adjacency of the folded top-level view, plus the
//!   first and last compute nodes on the default path
//! - [`StateNames`]: node ID to workflow state name assignment
//!
//! [`PipelineGraph`]: crate::definition::PipelineGraph

mod analysis;
mod naming;

pub use analysis::{Analysis, ComputeBounds, GraphAnalyzer, Link};
pub use naming::{MAX_STATE_NAME_LEN, StateNames};
