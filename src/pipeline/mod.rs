pub mod letter;
pub mod llm;
pub mod parser;
pub mod processor;
pub mod prompt;
pub mod structurer;
pub mod types;

pub use letter::LetterGenerator;
pub use llm::{MockLlmClient, OllamaClient};
pub use processor::BillProcessor;
pub use structurer::BillStructurer;
pub use types::{BillExtraction, Extraction, LlmClient};

use thiserror::Error;
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::enums::BillStatus;

/// Errors raised while turning raw bill text into structured data.
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("Cannot connect to Ollama at {0}")]
    Connection(String),

    #[error("Ollama returned status {status}: {body}")]
    Api { status: u16, body: String },

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("JSON parsing failed: {0}")]
    JsonParsing(String),

    #[error("Extraction produced no line items")]
    EmptyLineItems,
}

/// Errors raised while driving a bill through the analysis pipeline.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error("Bill not found: {0}")]
    BillNotFound(Uuid),

    #[error("Invalid status transition: {from:?} -> {to:?}")]
    InvalidTransition { from: BillStatus, to: BillStatus },

    #[error("Bill has already been processed (status: {0:?})")]
    AlreadyProcessed(BillStatus),

    #[error("No analysis found for bill: {0}")]
    AnalysisNotFound(Uuid),

    #[error(transparent)]
    Letter(#[from] ExtractionError),

    #[error("Serialization error: {0}")]
    Serialization(String),
}
