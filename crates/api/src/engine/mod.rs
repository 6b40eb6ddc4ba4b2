//! The turn engine: orchestration of generation calls around the session
//! store, plus the detached image pipeline.

pub mod image_pipeline;
pub mod orchestrator;
