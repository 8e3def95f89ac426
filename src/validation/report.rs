use serde::{Deserialize, Serialize};

use crate::config::AnalysisConfig;
use crate::models::enums::{FlagSeverity, FlagType};
use crate::registry::benchmarks::round2;

use super::types::ValidationResult;

/// One actionable finding in the patient-facing report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    pub issue: String,
    pub impact: String,
    pub recommendation: String,
}

/// The patient-facing summary of a validation pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub summary: String,
    pub total_flags: usize,
    pub potential_savings: f64,
    pub detailed_findings: Vec<Finding>,
    pub recommendations: Vec<String>,
    pub severity: FlagSeverity,
    pub validation: ValidationResult,
}

/// Build a report from a validation result. Pure: the same result and
/// config always produce the same report.
pub fn build_report(validation: &ValidationResult, config: &AnalysisConfig) -> AnalysisReport {
    let total = validation.total_issues;

    let summary = if total > 0 {
        format!(
            "Found {} potential billing issues including {} duplicates and {} overcharges.",
            total,
            validation.duplicates.len(),
            validation.overcharges.len()
        )
    } else {
        "No significant billing issues detected.".to_string()
    };

    // Savings roll up from overcharge findings only. Duplicate savings
    // are advisory until the provider confirms which charge stands.
    let potential_savings = round2(
        validation
            .overcharges
            .iter()
            .map(|o| o.potential_savings)
            .sum(),
    );

    let detailed_findings = validation
        .flags
        .iter()
        .map(|flag| Finding {
            issue: flag.message.clone(),
            impact: match flag.potential_savings {
                Some(savings) => format!("Potential savings: ${savings:.2}"),
                None => "Review recommended".to_string(),
            },
            recommendation: recommendation_for(&flag.flag_type).to_string(),
        })
        .collect();

    let recommendations = if total > 0 {
        vec![
            "Review all flagged charges with billing department".to_string(),
            "Request itemized breakdown for duplicate charges".to_string(),
            "Compare charges against Medicare benchmarks".to_string(),
            "Consider filing formal dispute for overcharges".to_string(),
        ]
    } else {
        vec![
            "Bill appears accurate".to_string(),
            "Keep for your records".to_string(),
        ]
    };

    let severity = if total > config.high_severity_issue_count {
        FlagSeverity::High
    } else if total > 0 {
        FlagSeverity::Medium
    } else {
        FlagSeverity::Low
    };

    AnalysisReport {
        summary,
        total_flags: total,
        potential_savings,
        detailed_findings,
        recommendations,
        severity,
        validation: validation.clone(),
    }
}

fn recommendation_for(flag_type: &FlagType) -> &'static str {
    match flag_type {
        FlagType::Duplicate => "Request an itemized statement and dispute the repeated charge",
        FlagType::InvalidCode => "Ask the billing department to verify this procedure code",
        FlagType::Overcharge => "Contact the billing department to dispute this charge",
    }
}
