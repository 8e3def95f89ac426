use serde::{Deserialize, Serialize};

use crate::models::enums::{FlagSeverity, FlagType};
use crate::registry::RegistryError;

const EQUIVALENCE_TABLE: &str = include_str!("../../resources/reference/equivalence_groups.json");

/// A single issue raised during validation, in check order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Flag {
    pub flag_type: FlagType,
    pub severity: FlagSeverity,
    pub code: String,
    pub message: String,
    pub potential_savings: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuplicateFinding {
    pub code: String,
    pub description: String,
    pub occurrences: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverchargeFinding {
    pub code: String,
    pub description: String,
    pub charged: f64,
    pub benchmark: f64,
    pub percent_over: i64,
    pub potential_savings: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvalidCodeFinding {
    pub code: String,
    pub code_type: String,
    pub message: String,
}

/// A flag destined to be written back onto the matching line items.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlagAnnotation {
    pub code: String,
    pub flag_type: FlagType,
    pub severity: FlagSeverity,
    pub explanation: String,
}

/// The complete outcome of one validation pass over a bill's line items.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationResult {
    pub flags: Vec<Flag>,
    pub duplicates: Vec<DuplicateFinding>,
    pub overcharges: Vec<OverchargeFinding>,
    pub invalid_codes: Vec<InvalidCodeFinding>,
    pub annotations: Vec<FlagAnnotation>,
    pub total_issues: usize,
}

/// Codes that describe the same service under different billing codes.
/// Billing more than one member of a group in a single encounter is a
/// duplicate even though the codes differ.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EquivalenceGroup {
    pub codes: Vec<String>,
    pub label: String,
}

impl EquivalenceGroup {
    pub fn contains(&self, base_code: &str) -> bool {
        self.codes.iter().any(|c| c == base_code)
    }
}

/// Load the equivalence groups compiled into the binary.
pub fn bundled_equivalence_groups() -> Result<Vec<EquivalenceGroup>, RegistryError> {
    serde_json::from_str(EQUIVALENCE_TABLE)
        .map_err(|e| RegistryError::Parse("equivalence_groups.json".into(), e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_groups_parse() {
        let groups = bundled_equivalence_groups().unwrap();
        assert!(!groups.is_empty());
        let ct_group = groups.iter().find(|g| g.contains("74177")).unwrap();
        assert!(ct_group.contains("74176"));
        assert!(!ct_group.contains("99213"));
    }

    #[test]
    fn default_result_is_empty() {
        let result = ValidationResult::default();
        assert!(result.flags.is_empty());
        assert_eq!(result.total_issues, 0);
    }
}
