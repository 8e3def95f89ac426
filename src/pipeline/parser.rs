use serde::Deserialize;

use super::types::{BillExtraction, BillSummary, ExtractedLineItem, PatientInfo, ProviderInfo};
use super::ExtractionError;

/// Parse the model's response into a structured extraction.
///
/// The response may be bare JSON or JSON wrapped in a Markdown code
/// fence. Individual line items that fail to deserialize are skipped;
/// an extraction with no usable line items is an error.
pub fn parse_extraction_response(response: &str) -> Result<BillExtraction, ExtractionError> {
    let json_str = extract_json(response)?;

    #[derive(Deserialize)]
    struct RawResponse {
        patient_info: Option<serde_json::Value>,
        provider: Option<serde_json::Value>,
        service_date: Option<String>,
        line_items: Option<Vec<serde_json::Value>>,
        summary: Option<serde_json::Value>,
    }

    let raw: RawResponse = serde_json::from_str(&json_str)
        .map_err(|e| ExtractionError::JsonParsing(e.to_string()))?;

    let line_items: Vec<ExtractedLineItem> = parse_array_lenient(raw.line_items.as_deref());
    if line_items.is_empty() {
        return Err(ExtractionError::EmptyLineItems);
    }

    Ok(BillExtraction {
        patient_info: raw
            .patient_info
            .and_then(|v| serde_json::from_value::<PatientInfo>(v).ok())
            .unwrap_or_default(),
        provider: raw
            .provider
            .and_then(|v| serde_json::from_value::<ProviderInfo>(v).ok())
            .unwrap_or_default(),
        service_date: raw.service_date,
        line_items,
        summary: raw
            .summary
            .and_then(|v| serde_json::from_value::<BillSummary>(v).ok())
            .unwrap_or_default(),
    })
}

/// Find the JSON payload in the response, unwrapping a ```json fence
/// when present.
fn extract_json(response: &str) -> Result<String, ExtractionError> {
    let trimmed = response.trim();

    if let Some(fence_start) = trimmed.find("```json") {
        let content_start = fence_start + 7;
        let content_end = trimmed[content_start..]
            .find("```")
            .ok_or_else(|| ExtractionError::MalformedResponse("Unclosed JSON block".into()))?;
        return Ok(trimmed[content_start..content_start + content_end]
            .trim()
            .to_string());
    }

    // Bare JSON: take from the first '{' to the last '}'
    let start = trimmed
        .find('{')
        .ok_or_else(|| ExtractionError::MalformedResponse("No JSON object found".into()))?;
    let end = trimmed
        .rfind('}')
        .ok_or_else(|| ExtractionError::MalformedResponse("No JSON object found".into()))?;
    if end < start {
        return Err(ExtractionError::MalformedResponse(
            "No JSON object found".into(),
        ));
    }
    Ok(trimmed[start..=end].to_string())
}

/// Parse an array leniently, skipping items that fail to deserialize.
fn parse_array_lenient<T: for<'de> Deserialize<'de>>(
    items: Option<&[serde_json::Value]>,
) -> Vec<T> {
    match items {
        None => vec![],
        Some(arr) => arr
            .iter()
            .filter_map(|v| serde_json::from_value(v.clone()).ok())
            .collect(),
    }
}
