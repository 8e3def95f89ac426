use rusqlite::Connection;
use uuid::Uuid;

use crate::db::repository::{get_bill, get_flagged_line_items, get_latest_analysis,
    insert_dispute_document};

use super::prompt::{build_letter_prompt, LETTER_SYSTEM_PROMPT};
use super::types::LlmClient;
use super::PipelineError;

/// A generated dispute letter with its stored document id.
#[derive(Debug, Clone)]
pub struct DisputeLetter {
    pub document_id: Uuid,
    pub content: String,
}

/// Generates dispute letters for analyzed bills.
pub struct LetterGenerator {
    llm: Box<dyn LlmClient + Send + Sync>,
}

impl LetterGenerator {
    pub fn new(llm: Box<dyn LlmClient + Send + Sync>) -> Self {
        Self { llm }
    }

    /// Draft a dispute letter from a bill's latest analysis and persist it.
    /// Requires the bill to have been analyzed; unlike extraction there
    /// is no fallback here, an unreachable model is an error.
    pub fn generate_dispute_letter(
        &self,
        conn: &Connection,
        bill_id: &Uuid,
    ) -> Result<DisputeLetter, PipelineError> {
        let bill = get_bill(conn, bill_id)?.ok_or(PipelineError::BillNotFound(*bill_id))?;
        let analysis = get_latest_analysis(conn, bill_id)?
            .ok_or(PipelineError::AnalysisNotFound(*bill_id))?;
        let flagged = get_flagged_line_items(conn, bill_id)?;

        let prompt = build_letter_prompt(&bill, &analysis.report, &flagged)
            .map_err(|e| PipelineError::Serialization(e.to_string()))?;
        let content = self.llm.generate(&prompt, LETTER_SYSTEM_PROMPT)?;

        let document_id = insert_dispute_document(conn, bill_id, &content)?;
        tracing::info!(bill_id = %bill_id, document_id = %document_id, "Dispute letter generated");

        Ok(DisputeLetter {
            document_id,
            content,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::{get_dispute_documents, insert_analysis, insert_bill};
    use crate::db::sqlite::open_memory_database;
    use crate::models::Bill;
    use crate::pipeline::llm::MockLlmClient;
    use crate::validation::report::build_report;
    use crate::validation::types::ValidationResult;
    use crate::AnalysisConfig;

    fn analyzed_bill(conn: &Connection) -> Bill {
        let bill = Bill::new("statement.pdf");
        insert_bill(conn, &bill).unwrap();
        let report = build_report(&ValidationResult::default(), &AnalysisConfig::default());
        insert_analysis(conn, &bill.id, &report).unwrap();
        bill
    }

    #[test]
    fn letter_is_generated_and_stored() {
        let conn = open_memory_database().unwrap();
        let bill = analyzed_bill(&conn);

        let generator = LetterGenerator::new(Box::new(MockLlmClient::new(
            "Dear Billing Department, I dispute the following charges.",
        )));
        let letter = generator.generate_dispute_letter(&conn, &bill.id).unwrap();
        assert!(letter.content.starts_with("Dear Billing Department"));

        let documents = get_dispute_documents(&conn, &bill.id).unwrap();
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].id, letter.document_id);
        assert_eq!(documents[0].content, letter.content);
    }

    #[test]
    fn missing_analysis_is_an_error() {
        let conn = open_memory_database().unwrap();
        let bill = Bill::new("statement.pdf");
        insert_bill(&conn, &bill).unwrap();

        let generator = LetterGenerator::new(Box::new(MockLlmClient::new("letter")));
        let result = generator.generate_dispute_letter(&conn, &bill.id);
        assert!(matches!(result, Err(PipelineError::AnalysisNotFound(_))));
    }

    #[test]
    fn missing_bill_is_an_error() {
        let conn = open_memory_database().unwrap();
        let generator = LetterGenerator::new(Box::new(MockLlmClient::new("letter")));
        let result = generator.generate_dispute_letter(&conn, &Uuid::new_v4());
        assert!(matches!(result, Err(PipelineError::BillNotFound(_))));
    }

    #[test]
    fn unreachable_model_propagates() {
        let conn = open_memory_database().unwrap();
        let bill = analyzed_bill(&conn);

        let generator = LetterGenerator::new(Box::new(MockLlmClient::failing("down")));
        let result = generator.generate_dispute_letter(&conn, &bill.id);
        assert!(matches!(result, Err(PipelineError::Letter(_))));
    }
}
