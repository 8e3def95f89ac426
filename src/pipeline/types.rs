use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ExtractionError;
use crate::models::enums::CodeType;
use crate::models::LineItem;

/// A synchronous text-generation backend. Implemented by the Ollama
/// client in production and by mocks in tests.
pub trait LlmClient {
    fn generate(&self, prompt: &str, system: &str) -> Result<String, ExtractionError>;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PatientInfo {
    pub name: Option<String>,
    pub dob: Option<String>,
    pub account_number: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderInfo {
    pub name: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BillSummary {
    pub total_charges: Option<f64>,
    pub insurance_paid: Option<f64>,
    pub patient_responsibility: Option<f64>,
}

/// One billed service as the model reported it, before normalization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractedLineItem {
    pub description: Option<String>,
    pub code: Option<String>,
    pub code_type: Option<String>,
    pub quantity: Option<u32>,
    pub unit_price: Option<f64>,
    pub total_charge: Option<f64>,
}

impl ExtractedLineItem {
    /// Normalize into a persistable line item. Missing fields get
    /// conservative defaults rather than failing the whole bill.
    pub fn to_line_item(&self, bill_id: Uuid) -> LineItem {
        let description = self
            .description
            .clone()
            .unwrap_or_else(|| "Unknown".to_string());
        let mut item = LineItem::new(bill_id, &description, self.code.as_deref());
        item.code_type = self
            .code_type
            .as_deref()
            .and_then(|t| CodeType::from_str(t).ok());
        item.quantity = self.quantity.unwrap_or(1);
        // Charges are never negative; a credit line from the model
        // stores as zero
        item.charge_amount = self
            .total_charge
            .or(self.unit_price)
            .unwrap_or(0.0)
            .max(0.0);
        item
    }
}

/// The complete structured form of one bill.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BillExtraction {
    #[serde(default)]
    pub patient_info: PatientInfo,
    #[serde(default)]
    pub provider: ProviderInfo,
    pub service_date: Option<String>,
    #[serde(default)]
    pub line_items: Vec<ExtractedLineItem>,
    #[serde(default)]
    pub summary: BillSummary,
}

/// How an extraction was obtained. Fallback extractions are synthetic
/// placeholders produced when the model output could not be used.
#[derive(Debug, Clone)]
pub enum Extraction {
    Genuine(BillExtraction),
    Fallback(BillExtraction),
}

impl Extraction {
    pub fn is_fallback(&self) -> bool {
        matches!(self, Extraction::Fallback(_))
    }

    pub fn into_inner(self) -> BillExtraction {
        match self {
            Extraction::Genuine(e) | Extraction::Fallback(e) => e,
        }
    }
}

/// A minimal placeholder extraction so a bill can still move through
/// the pipeline when the model output is unusable.
pub fn fallback_extraction() -> BillExtraction {
    BillExtraction {
        patient_info: PatientInfo {
            name: Some("Patient".to_string()),
            dob: None,
            account_number: None,
        },
        provider: ProviderInfo {
            name: Some("Medical Provider".to_string()),
            address: None,
        },
        service_date: Some(chrono::Local::now().format("%Y-%m-%d").to_string()),
        line_items: vec![ExtractedLineItem {
            description: Some("Medical Services".to_string()),
            code: Some("99213".to_string()),
            code_type: Some("CPT".to_string()),
            quantity: Some(1),
            unit_price: Some(100.0),
            total_charge: Some(100.0),
        }],
        summary: BillSummary {
            total_charges: Some(100.0),
            insurance_paid: None,
            patient_responsibility: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracted_item_defaults_applied() {
        let raw = ExtractedLineItem::default();
        let item = raw.to_line_item(Uuid::new_v4());
        assert_eq!(item.description, "Unknown");
        assert_eq!(item.quantity, 1);
        assert_eq!(item.charge_amount, 0.0);
        assert!(item.code.is_none());
        assert!(item.code_type.is_none());
    }

    #[test]
    fn unit_price_used_when_total_missing() {
        let raw = ExtractedLineItem {
            description: Some("X-ray".into()),
            unit_price: Some(42.0),
            ..ExtractedLineItem::default()
        };
        let item = raw.to_line_item(Uuid::new_v4());
        assert_eq!(item.charge_amount, 42.0);
    }

    #[test]
    fn negative_charge_clamped_to_zero() {
        let raw = ExtractedLineItem {
            description: Some("Adjustment".into()),
            total_charge: Some(-45.0),
            ..ExtractedLineItem::default()
        };
        let item = raw.to_line_item(Uuid::new_v4());
        assert_eq!(item.charge_amount, 0.0);
    }

    #[test]
    fn unrecognized_code_type_dropped() {
        let raw = ExtractedLineItem {
            code: Some("J1100".into()),
            code_type: Some("HCPCS".into()),
            ..ExtractedLineItem::default()
        };
        let item = raw.to_line_item(Uuid::new_v4());
        assert_eq!(item.code.as_deref(), Some("J1100"));
        assert!(item.code_type.is_none());
    }

    #[test]
    fn fallback_has_one_placeholder_item() {
        let extraction = fallback_extraction();
        assert_eq!(extraction.line_items.len(), 1);
        let item = &extraction.line_items[0];
        assert_eq!(item.description.as_deref(), Some("Medical Services"));
        assert_eq!(item.code.as_deref(), Some("99213"));
        assert_eq!(item.total_charge, Some(100.0));
    }
}
