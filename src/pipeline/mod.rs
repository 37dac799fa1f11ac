// src/pipeline/mod.rs

pub mod orchestrator;

pub use orchestrator::{run, PipelineOutput, QualityReport};
