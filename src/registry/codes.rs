use std::collections::HashMap;
use std::fs;
use std::path::Path;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::RegistryError;

const CPT_TABLE: &str = include_str!("../../resources/reference/cpt_codes.json");
const ICD10_TABLE: &str = include_str!("../../resources/reference/icd10_codes.json");

/// Which coding system a code claims to belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeKind {
    Cpt,
    Icd10,
}

/// Outcome of a single code lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeLookup {
    pub valid: bool,
    pub description: Option<String>,
    pub message: String,
}

impl CodeLookup {
    fn invalid(message: &str) -> Self {
        CodeLookup {
            valid: false,
            description: None,
            message: message.to_string(),
        }
    }
}

/// Lookup tables for CPT and ICD-10 codes with shape validation.
pub struct CodeRegistry {
    cpt: HashMap<String, String>,
    icd10: HashMap<String, String>,
    cpt_shape: Regex,
    icd10_shape: Regex,
}

impl CodeRegistry {
    /// Build the registry from the reference tables compiled into the binary.
    pub fn bundled() -> Result<Self, RegistryError> {
        let cpt: HashMap<String, String> = serde_json::from_str(CPT_TABLE)
            .map_err(|e| RegistryError::Parse("cpt_codes.json".into(), e.to_string()))?;
        let icd10: HashMap<String, String> = serde_json::from_str(ICD10_TABLE)
            .map_err(|e| RegistryError::Parse("icd10_codes.json".into(), e.to_string()))?;
        Self::from_tables(cpt, icd10)
    }

    /// Build the registry from tables in a directory, overriding the
    /// bundled reference data.
    pub fn load(dir: &Path) -> Result<Self, RegistryError> {
        let cpt = read_table(&dir.join("cpt_codes.json"))?;
        let icd10 = read_table(&dir.join("icd10_codes.json"))?;
        Self::from_tables(cpt, icd10)
    }

    pub fn from_tables(
        cpt: HashMap<String, String>,
        icd10: HashMap<String, String>,
    ) -> Result<Self, RegistryError> {
        let cpt_shape = Regex::new(r"^\d{5}$")
            .map_err(|e| RegistryError::Parse("cpt shape".into(), e.to_string()))?;
        let icd10_shape = Regex::new(r"^[A-Z]\d{2}")
            .map_err(|e| RegistryError::Parse("icd10 shape".into(), e.to_string()))?;
        Ok(CodeRegistry {
            cpt,
            icd10,
            cpt_shape,
            icd10_shape,
        })
    }

    /// Validate a code against its claimed coding system.
    pub fn lookup(&self, code: &str, kind: CodeKind) -> CodeLookup {
        let code = code.trim();
        if code.is_empty() {
            return CodeLookup::invalid("Code is required");
        }
        match kind {
            CodeKind::Cpt => {
                if !self.cpt_shape.is_match(code) {
                    return CodeLookup::invalid("CPT codes must be exactly 5 digits");
                }
                match self.cpt.get(code) {
                    Some(description) => CodeLookup {
                        valid: true,
                        description: Some(description.clone()),
                        message: "Valid CPT code".to_string(),
                    },
                    None => CodeLookup::invalid("Code not found in database"),
                }
            }
            CodeKind::Icd10 => {
                if !self.icd10_shape.is_match(code) {
                    return CodeLookup::invalid(
                        "ICD-10 codes must start with a letter followed by 2 digits",
                    );
                }
                match self.icd10.get(code) {
                    Some(description) => CodeLookup {
                        valid: true,
                        description: Some(description.clone()),
                        message: "Valid ICD-10 code".to_string(),
                    },
                    None => CodeLookup::invalid("Code not found in database"),
                }
            }
        }
    }

    /// Validate a code against a coding-system name as it appears on
    /// bills ("CPT", "ICD", "ICD-10").
    pub fn lookup_str(&self, code: &str, kind: &str) -> CodeLookup {
        match kind.to_uppercase().as_str() {
            "CPT" => self.lookup(code, CodeKind::Cpt),
            "ICD" | "ICD10" | "ICD-10" => self.lookup(code, CodeKind::Icd10),
            _ => CodeLookup::invalid("Unknown code type"),
        }
    }

    /// A code is a valid CPT code when it has CPT shape and appears in
    /// the reference table.
    pub fn is_valid_cpt(&self, code: &str) -> bool {
        self.cpt_shape.is_match(code) && self.cpt.contains_key(code)
    }

    /// Shape check only, without a table lookup.
    pub fn cpt_shape_ok(&self, code: &str) -> bool {
        self.cpt_shape.is_match(code)
    }

    pub fn cpt_description(&self, code: &str) -> Option<&str> {
        self.cpt.get(code).map(String::as_str)
    }
}

fn read_table(path: &Path) -> Result<HashMap<String, String>, RegistryError> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());
    let raw = fs::read_to_string(path).map_err(|e| RegistryError::Load(name.clone(), e.to_string()))?;
    serde_json::from_str(&raw).map_err(|e| RegistryError::Parse(name, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> CodeRegistry {
        CodeRegistry::bundled().unwrap()
    }

    #[test]
    fn valid_cpt_code_looks_up() {
        let result = registry().lookup("99213", CodeKind::Cpt);
        assert!(result.valid);
        assert!(result.description.is_some());
        assert_eq!(result.message, "Valid CPT code");
    }

    #[test]
    fn cpt_shape_enforced() {
        let result = registry().lookup("9921", CodeKind::Cpt);
        assert!(!result.valid);
        assert_eq!(result.message, "CPT codes must be exactly 5 digits");
    }

    #[test]
    fn unknown_cpt_code_rejected() {
        let result = registry().lookup("99999", CodeKind::Cpt);
        assert!(!result.valid);
        assert_eq!(result.message, "Code not found in database");
    }

    #[test]
    fn empty_code_rejected() {
        let result = registry().lookup("  ", CodeKind::Cpt);
        assert!(!result.valid);
        assert_eq!(result.message, "Code is required");
    }

    #[test]
    fn icd10_shape_enforced() {
        let result = registry().lookup("123", CodeKind::Icd10);
        assert!(!result.valid);
        assert_eq!(
            result.message,
            "ICD-10 codes must start with a letter followed by 2 digits"
        );
    }

    #[test]
    fn valid_icd10_code_looks_up() {
        let result = registry().lookup("E11.9", CodeKind::Icd10);
        assert!(result.valid);
        assert_eq!(result.message, "Valid ICD-10 code");
    }

    #[test]
    fn lookup_str_maps_names() {
        let registry = registry();
        assert!(registry.lookup_str("99213", "cpt").valid);
        assert!(registry.lookup_str("E11.9", "ICD-10").valid);
        let unknown = registry.lookup_str("99213", "HCPCS");
        assert!(!unknown.valid);
        assert_eq!(unknown.message, "Unknown code type");
    }

    #[test]
    fn is_valid_cpt_requires_shape_and_membership() {
        let registry = registry();
        assert!(registry.is_valid_cpt("99213"));
        assert!(!registry.is_valid_cpt("99999"));
        assert!(!registry.is_valid_cpt("0270"));
    }
}
