use uuid::Uuid;

use super::parser::parse_extraction_response;
use super::prompt::{build_extraction_prompt, EXTRACTION_SYSTEM_PROMPT};
use super::types::{fallback_extraction, Extraction, LlmClient};

/// Turns raw bill text into a structured extraction via the LLM.
///
/// Extraction never fails outright: when the model is unreachable or
/// its output is unusable, a tagged fallback extraction is returned so
/// the bill can still move through the pipeline.
pub struct BillStructurer {
    llm: Box<dyn LlmClient + Send + Sync>,
}

impl BillStructurer {
    pub fn new(llm: Box<dyn LlmClient + Send + Sync>) -> Self {
        Self { llm }
    }

    pub fn extract(&self, bill_id: &Uuid, raw_text: &str) -> Extraction {
        let prompt = build_extraction_prompt(raw_text);

        let response = match self.llm.generate(&prompt, EXTRACTION_SYSTEM_PROMPT) {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(bill_id = %bill_id, error = %e, "LLM extraction failed, using fallback");
                return Extraction::Fallback(fallback_extraction());
            }
        };

        match parse_extraction_response(&response) {
            Ok(extraction) => {
                tracing::info!(
                    bill_id = %bill_id,
                    line_items = extraction.line_items.len(),
                    "Bill extraction complete"
                );
                Extraction::Genuine(extraction)
            }
            Err(e) => {
                tracing::warn!(bill_id = %bill_id, error = %e, "Unusable extraction response, using fallback");
                Extraction::Fallback(fallback_extraction())
            }
        }
    }
}
