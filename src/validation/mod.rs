pub mod engine;
pub mod report;
pub mod types;

pub use engine::run_validation;
pub use report::{build_report, AnalysisReport, Finding};
pub use types::*;
