pub mod autofill;
pub mod config;
pub mod fetch;
pub mod mapping;
pub mod merge;
pub mod pipeline;
pub mod progress;
pub mod publish;
pub mod reconcile;
pub mod region;
pub mod snapshot;
pub mod textutil;
pub mod workers;
