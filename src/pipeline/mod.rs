mod config;
mod decoder;
pub mod ini;
mod input;
mod rundir;
mod runner;
mod scorer;

pub use config::{AnalysisOptions, AnalysisRequest, KBest, OutputTarget, DEFAULT_TABLE_WIDTH};
pub use input::read_line_at;
pub use rundir::RunDir;
pub use runner::{AnalysisOutcome, ErrAnalysis};
