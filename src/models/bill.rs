use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::BillStatus;

/// A single uploaded medical bill. Created on upload; the pipeline mutates
/// status and the summary fields as stages complete.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bill {
    pub id: Uuid,
    pub source_file: String,
    pub status: BillStatus,
    pub patient_name: Option<String>,
    pub provider_name: Option<String>,
    pub service_date: Option<NaiveDate>,
    pub account_number: Option<String>,
    pub total_charges: f64,
    pub uploaded_at: NaiveDateTime,
}

impl Bill {
    /// Fresh bill record in `uploaded` status.
    pub fn new(source_file: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            source_file: source_file.to_string(),
            status: BillStatus::Uploaded,
            patient_name: None,
            provider_name: None,
            service_date: None,
            account_number: None,
            total_charges: 0.0,
            uploaded_at: chrono::Local::now().naive_local(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_bill_starts_uploaded() {
        let bill = Bill::new("scan_0042.pdf");
        assert_eq!(bill.status, BillStatus::Uploaded);
        assert_eq!(bill.source_file, "scan_0042.pdf");
        assert_eq!(bill.total_charges, 0.0);
        assert!(bill.patient_name.is_none());
    }
}
