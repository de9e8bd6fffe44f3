//! Staged frame synthesis: run planning, the inter-stage queue, and the orchestrator.

pub mod generator;
pub mod plan;
pub mod queue;
pub mod stages;
