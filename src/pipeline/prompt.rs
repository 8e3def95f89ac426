use crate::models::{Bill, LineItem};
use crate::validation::report::AnalysisReport;

/// System prompt for bill extraction.
pub const EXTRACTION_SYSTEM_PROMPT: &str = r#"You are a medical billing data extraction assistant. You read raw text from medical bills and itemized statements and return their contents as structured JSON. You respond with JSON only, no prose before or after."#;

/// Build the extraction prompt for a bill's raw text.
pub fn build_extraction_prompt(raw_text: &str) -> String {
    format!(
        r#"Extract ALL billing information from this medical bill text.

Return a single JSON object with this exact structure:
{{
  "patient_info": {{"name": null, "dob": null, "account_number": null}},
  "provider": {{"name": null, "address": null}},
  "service_date": "YYYY-MM-DD or null",
  "line_items": [
    {{
      "description": "service description",
      "code": "billing code or null",
      "code_type": "CPT, REV, or NDC",
      "quantity": 1,
      "unit_price": 0.0,
      "total_charge": 0.0
    }}
  ],
  "summary": {{"total_charges": null, "insurance_paid": null, "patient_responsibility": null}}
}}

Rules:
- Include EVERY line item that appears on the bill, even repeated ones.
- Keep billing codes exactly as printed, including modifier suffixes like "-25".
- CPT codes are 5 digits. Revenue (REV) codes are 3-4 digits. NDC codes identify drugs.
- Use null for anything not present in the text. Never invent values.
- Amounts are plain numbers without currency symbols.

Bill text:
{raw_text}"#
    )
}

/// System prompt for dispute letter generation.
pub const LETTER_SYSTEM_PROMPT: &str = r#"You are an assistant that writes formal dispute letters to medical billing departments on behalf of patients. You write clear, polite, factual business letters in plain text. You never invent charges or amounts that are not in the data you are given."#;

/// Build the dispute letter prompt from a bill, its analysis, and the
/// flagged line items.
pub fn build_letter_prompt(
    bill: &Bill,
    report: &AnalysisReport,
    flagged_items: &[LineItem],
) -> Result<String, serde_json::Error> {
    let findings = serde_json::to_string_pretty(&report.detailed_findings)?;
    let items = serde_json::to_string_pretty(flagged_items)?;

    Ok(format!(
        r#"Write a formal dispute letter to the billing department.

Bill details:
- Provider: {provider}
- Patient: {patient}
- Account number: {account}
- Service date: {service_date}
- Total charges: ${total:.2}

Disputed findings:
{findings}

Flagged line items:
{items}

Total potential savings identified: ${savings:.2}

The letter must:
- Be addressed to the provider's billing department.
- Reference the account number and service date.
- List each disputed charge with the reason it is disputed.
- Request an itemized statement and a review within 30 days.
- Close politely with a placeholder for the patient's signature.
- Be plain text, no markdown."#,
        provider = bill.provider_name.as_deref().unwrap_or("Medical Provider"),
        patient = bill.patient_name.as_deref().unwrap_or("Patient"),
        account = bill.account_number.as_deref().unwrap_or("Unknown"),
        service_date = bill
            .service_date
            .map(|d| d.to_string())
            .unwrap_or_else(|| "Unknown".to_string()),
        total = bill.total_charges,
        savings = report.potential_savings,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extraction_prompt_embeds_bill_text() {
        let prompt = build_extraction_prompt("99213 Office visit $300.00");
        assert!(prompt.contains("99213 Office visit $300.00"));
        assert!(prompt.contains("line_items"));
    }

    #[test]
    fn letter_prompt_carries_bill_context() {
        let mut bill = Bill::new("statement.pdf");
        bill.provider_name = Some("General Hospital".into());
        bill.account_number = Some("ACCT-7781".into());
        bill.total_charges = 800.0;

        let report = crate::validation::report::build_report(
            &crate::validation::types::ValidationResult::default(),
            &crate::AnalysisConfig::default(),
        );
        let prompt = build_letter_prompt(&bill, &report, &[]).unwrap();
        assert!(prompt.contains("General Hospital"));
        assert!(prompt.contains("ACCT-7781"));
        assert!(prompt.contains("$800.00"));
        assert!(prompt.contains("30 days"));
    }
}
