mod config;
mod runner;
mod trace;

pub use config::{init_default_config, FetchSettings, PipelineConfig, RunOverrides};
pub use runner::{MappingPipeline, RunSummary};
