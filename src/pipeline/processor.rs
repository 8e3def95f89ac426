use chrono::NaiveDate;
use rusqlite::Connection;
use uuid::Uuid;

use crate::config::AnalysisConfig;
use crate::db::repository::{
    annotate_flag, get_bill, insert_analysis, insert_bill, insert_line_items, update_bill,
    update_bill_status,
};
use crate::models::enums::BillStatus;
use crate::models::{Bill, LineItem};
use crate::registry::benchmarks::{round2, BenchmarkRegistry};
use crate::registry::codes::CodeRegistry;
use crate::registry::RegistryError;
use crate::validation::engine::run_validation;
use crate::validation::report::{build_report, AnalysisReport};
use crate::validation::types::{bundled_equivalence_groups, EquivalenceGroup};

use super::structurer::BillStructurer;
use super::types::LlmClient;
use super::PipelineError;

/// Drives a bill from raw text to a stored analysis:
/// extract, persist line items, validate, annotate, report.
pub struct BillProcessor {
    structurer: BillStructurer,
    codes: CodeRegistry,
    benchmarks: BenchmarkRegistry,
    equivalence_groups: Vec<EquivalenceGroup>,
    config: AnalysisConfig,
}

impl BillProcessor {
    pub fn new(
        structurer: BillStructurer,
        codes: CodeRegistry,
        benchmarks: BenchmarkRegistry,
        equivalence_groups: Vec<EquivalenceGroup>,
        config: AnalysisConfig,
    ) -> Self {
        Self {
            structurer,
            codes,
            benchmarks,
            equivalence_groups,
            config,
        }
    }

    /// Build a processor over the reference data compiled into the binary.
    pub fn with_bundled_registries(
        llm: Box<dyn LlmClient + Send + Sync>,
        config: AnalysisConfig,
    ) -> Result<Self, RegistryError> {
        Ok(Self::new(
            BillStructurer::new(llm),
            CodeRegistry::bundled()?,
            BenchmarkRegistry::bundled()?,
            bundled_equivalence_groups()?,
            config,
        ))
    }

    /// Record a newly uploaded bill in `uploaded` status.
    pub fn register_upload(
        &self,
        conn: &Connection,
        source_file: &str,
    ) -> Result<Bill, PipelineError> {
        let bill = Bill::new(source_file);
        insert_bill(conn, &bill)?;
        tracing::info!(bill_id = %bill.id, source_file, "Bill registered");
        Ok(bill)
    }

    /// Run the full analysis pipeline over a registered bill.
    ///
    /// Only bills in `uploaded` status are accepted; re-analysis of a
    /// processed bill is refused without touching its state. Any stage
    /// failure marks the bill `error` and propagates.
    pub fn process_bill(
        &self,
        conn: &Connection,
        bill_id: &Uuid,
        raw_text: &str,
    ) -> Result<AnalysisReport, PipelineError> {
        let bill = get_bill(conn, bill_id)?.ok_or(PipelineError::BillNotFound(*bill_id))?;
        if bill.status != BillStatus::Uploaded {
            return Err(PipelineError::AlreadyProcessed(bill.status));
        }

        match self.run_stages(conn, bill, raw_text) {
            Ok(report) => Ok(report),
            Err(e) => {
                tracing::error!(bill_id = %bill_id, error = %e, "Pipeline failed");
                // Best effort: the original failure is what matters
                let _ = update_bill_status(conn, bill_id, &BillStatus::Error);
                Err(e)
            }
        }
    }

    fn run_stages(
        &self,
        conn: &Connection,
        mut bill: Bill,
        raw_text: &str,
    ) -> Result<AnalysisReport, PipelineError> {
        let extraction = self.structurer.extract(&bill.id, raw_text);
        if extraction.is_fallback() {
            tracing::warn!(bill_id = %bill.id, "Proceeding with fallback extraction");
        }
        let extracted = extraction.into_inner();

        let items: Vec<LineItem> = extracted
            .line_items
            .iter()
            .map(|raw| raw.to_line_item(bill.id))
            .collect();
        insert_line_items(conn, &items)?;

        self.transition(&mut bill, BillStatus::Extracted)?;
        update_bill_status(conn, &bill.id, &bill.status)?;
        tracing::info!(bill_id = %bill.id, line_items = items.len(), "Extraction stored");

        let validation = run_validation(
            &items,
            &self.codes,
            &self.benchmarks,
            &self.equivalence_groups,
            &self.config,
        );
        for annotation in &validation.annotations {
            annotate_flag(
                conn,
                &bill.id,
                &annotation.code,
                &annotation.flag_type,
                &annotation.severity,
                &annotation.explanation,
            )?;
        }

        let report = build_report(&validation, &self.config);
        insert_analysis(conn, &bill.id, &report)?;
        tracing::info!(
            bill_id = %bill.id,
            total_flags = report.total_flags,
            potential_savings = report.potential_savings,
            "Analysis stored"
        );

        bill.patient_name = extracted.patient_info.name.clone();
        bill.provider_name = extracted.provider.name.clone();
        bill.account_number = extracted.patient_info.account_number.clone();
        bill.service_date = extracted
            .service_date
            .as_deref()
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok());
        bill.total_charges = extracted
            .summary
            .total_charges
            .unwrap_or_else(|| round2(items.iter().map(|i| i.charge_amount).sum()));

        self.transition(&mut bill, BillStatus::Analyzed)?;
        update_bill(conn, &bill)?;
        tracing::info!(bill_id = %bill.id, "Bill analyzed");

        Ok(report)
    }

    fn transition(&self, bill: &mut Bill, to: BillStatus) -> Result<(), PipelineError> {
        if !bill.status.can_transition_to(&to) {
            return Err(PipelineError::InvalidTransition {
                from: bill.status.clone(),
                to,
            });
        }
        bill.status = to;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::{get_flagged_line_items, get_latest_analysis, get_line_items};
    use crate::db::sqlite::open_memory_database;
    use crate::models::enums::{FlagSeverity, FlagType};
    use crate::pipeline::llm::MockLlmClient;

    fn processor(response: &str) -> BillProcessor {
        BillProcessor::with_bundled_registries(
            Box::new(MockLlmClient::new(response)),
            AnalysisConfig::default(),
        )
        .unwrap()
    }

    const CT_SCAN_RESPONSE: &str = r#"{
        "patient_info": {"name": "Jane Doe", "dob": null, "account_number": "ACCT-7781"},
        "provider": {"name": "General Hospital", "address": null},
        "service_date": "2025-11-03",
        "line_items": [
            {"description": "CT abdomen/pelvis with contrast", "code": "74177",
             "code_type": "CPT", "quantity": 1, "total_charge": 400.0},
            {"description": "CT abdomen/pelvis without contrast", "code": "74176",
             "code_type": "CPT", "quantity": 1, "total_charge": 400.0}
        ],
        "summary": {"total_charges": 800.0, "insurance_paid": null, "patient_responsibility": null}
    }"#;

    #[test]
    fn end_to_end_equivalent_ct_scans() {
        let conn = open_memory_database().unwrap();
        let processor = processor(CT_SCAN_RESPONSE);
        let bill = processor.register_upload(&conn, "er_visit.pdf").unwrap();

        let report = processor.process_bill(&conn, &bill.id, "raw text").unwrap();

        assert_eq!(report.total_flags, 1);
        assert_eq!(report.validation.flags[0].flag_type, FlagType::Duplicate);
        assert_eq!(report.validation.flags[0].potential_savings, Some(400.0));
        assert!(report.summary.contains("1 duplicates"));

        let stored = get_bill(&conn, &bill.id).unwrap().unwrap();
        assert_eq!(stored.status, BillStatus::Analyzed);
        assert_eq!(stored.patient_name.as_deref(), Some("Jane Doe"));
        assert_eq!(stored.total_charges, 800.0);

        let analysis = get_latest_analysis(&conn, &bill.id).unwrap().unwrap();
        assert_eq!(analysis.total_flags, 1);

        let items = get_line_items(&conn, &bill.id).unwrap();
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn fallback_extraction_still_analyzes() {
        let conn = open_memory_database().unwrap();
        let processor = processor("garbage, not json");
        let bill = processor.register_upload(&conn, "blurry_scan.pdf").unwrap();

        let report = processor.process_bill(&conn, &bill.id, "raw text").unwrap();
        assert_eq!(report.total_flags, 0);

        let stored = get_bill(&conn, &bill.id).unwrap().unwrap();
        assert_eq!(stored.status, BillStatus::Analyzed);
        assert_eq!(stored.total_charges, 100.0);

        let items = get_line_items(&conn, &bill.id).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].description, "Medical Services");
        assert_eq!(items[0].code.as_deref(), Some("99213"));
    }

    #[test]
    fn reprocessing_is_refused_without_state_change() {
        let conn = open_memory_database().unwrap();
        let processor = processor(CT_SCAN_RESPONSE);
        let bill = processor.register_upload(&conn, "er_visit.pdf").unwrap();
        processor.process_bill(&conn, &bill.id, "raw text").unwrap();

        let result = processor.process_bill(&conn, &bill.id, "raw text");
        assert!(matches!(
            result,
            Err(PipelineError::AlreadyProcessed(BillStatus::Analyzed))
        ));

        // refusal did not flip the bill to error
        let stored = get_bill(&conn, &bill.id).unwrap().unwrap();
        assert_eq!(stored.status, BillStatus::Analyzed);
    }

    #[test]
    fn missing_bill_is_an_error() {
        let conn = open_memory_database().unwrap();
        let processor = processor(CT_SCAN_RESPONSE);
        let result = processor.process_bill(&conn, &Uuid::new_v4(), "raw text");
        assert!(matches!(result, Err(PipelineError::BillNotFound(_))));
    }

    #[test]
    fn overcharge_annotation_written_back() {
        const OVERCHARGE_RESPONSE: &str = r#"{
            "line_items": [
                {"description": "Office visit", "code": "99213", "code_type": "CPT",
                 "quantity": 1, "total_charge": 300.0}
            ]
        }"#;
        let conn = open_memory_database().unwrap();
        let processor = processor(OVERCHARGE_RESPONSE);
        let bill = processor.register_upload(&conn, "visit.pdf").unwrap();

        let report = processor.process_bill(&conn, &bill.id, "raw text").unwrap();
        assert_eq!(report.potential_savings, 208.0);

        let flagged = get_flagged_line_items(&conn, &bill.id).unwrap();
        assert_eq!(flagged.len(), 1);
        assert_eq!(flagged[0].flag_type, Some(FlagType::Overcharge));
        assert_eq!(flagged[0].flag_severity, Some(FlagSeverity::High));
        assert_eq!(
            flagged[0].flag_explanation.as_deref(),
            Some("226% above benchmark")
        );
    }
}
