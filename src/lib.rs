//! ClearBill — medical bill review engine.
//!
//! A bill's raw extracted text is structured into line items through an
//! injected LLM client, validated against known billing codes and price
//! benchmarks, and turned into a savings report plus a dispute letter.
//! Bills, line items, analyses and dispute documents live in a local
//! SQLite record store.

pub mod config;
pub mod db;
pub mod models;
pub mod pipeline;
pub mod registry;
pub mod validation;

pub use config::AnalysisConfig;
pub use pipeline::processor::BillProcessor;
pub use validation::engine::run_validation;
pub use validation::report::build_report;

use tracing_subscriber::EnvFilter;

/// Initialize tracing for binaries embedding this library.
/// `RUST_LOG` overrides the default filter.
pub fn init_tracing(default_filter: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();
}
