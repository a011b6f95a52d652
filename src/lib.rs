pub mod config;
pub mod pipeline;
pub mod process;
pub mod progress;
pub mod report;
