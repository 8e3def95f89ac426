use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{CodeType, FlagSeverity, FlagType};

/// One billed charge on a bill. Immutable after extraction except for the
/// flag fields, which the validation pass writes back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItem {
    pub id: Uuid,
    pub bill_id: Uuid,
    pub description: String,
    pub code: Option<String>,
    pub code_type: Option<CodeType>,
    pub quantity: u32,
    pub charge_amount: f64,
    pub flag_type: Option<FlagType>,
    pub flag_severity: Option<FlagSeverity>,
    pub flag_explanation: Option<String>,
}

impl LineItem {
    pub fn new(bill_id: Uuid, description: &str, code: Option<&str>) -> Self {
        Self {
            id: Uuid::new_v4(),
            bill_id,
            description: description.to_string(),
            code: code.map(|c| c.to_string()),
            code_type: None,
            quantity: 1,
            charge_amount: 0.0,
            flag_type: None,
            flag_severity: None,
            flag_explanation: None,
        }
    }

    /// Procedure code with any trailing modifier suffix stripped
    /// ("74177-26" -> "74177"). Used for duplicate grouping.
    pub fn base_code(&self) -> Option<&str> {
        self.code
            .as_deref()
            .map(|c| c.split('-').next().unwrap_or(c))
    }
}
