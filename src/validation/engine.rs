use crate::config::AnalysisConfig;
use crate::models::enums::{CodeType, FlagSeverity, FlagType};
use crate::models::LineItem;
use crate::registry::benchmarks::{round2, BenchmarkRegistry};
use crate::registry::codes::CodeRegistry;

use super::types::*;

// ---------------------------------------------------------------------------
// [1] EXACT DUPLICATE detection
// ---------------------------------------------------------------------------

/// Detect the same base code billed more than once in an encounter.
/// Modifier suffixes ("99213-25") are stripped before grouping, so a
/// modifier variant of an already-billed code still counts.
pub fn detect_exact_duplicates(line_items: &[LineItem]) -> Vec<(DuplicateFinding, Flag)> {
    let mut groups: Vec<(String, Vec<&LineItem>)> = Vec::new();

    for item in line_items {
        let Some(base) = item.base_code() else {
            continue;
        };
        let base = base.to_string();
        match groups.iter_mut().find(|(code, _)| *code == base) {
            Some((_, members)) => members.push(item),
            None => groups.push((base, vec![item])),
        }
    }

    let mut findings = Vec::new();
    for (code, members) in groups {
        if members.len() < 2 {
            continue;
        }

        let description = members[0].description.clone();
        let savings = round2(members[1..].iter().map(|i| i.charge_amount).sum());

        let finding = DuplicateFinding {
            code: code.clone(),
            description: description.clone(),
            occurrences: members.len(),
        };
        let flag = Flag {
            flag_type: FlagType::Duplicate,
            severity: FlagSeverity::High,
            code,
            message: format!(
                "Duplicate billing: {} ({}) billed {} times",
                finding.code,
                description,
                members.len()
            ),
            potential_savings: Some(savings),
        };
        findings.push((finding, flag));
    }
    findings
}

// ---------------------------------------------------------------------------
// [2] EQUIVALENT DUPLICATE detection
// ---------------------------------------------------------------------------

/// Detect distinct codes from the same equivalence group billed in one
/// encounter. Each group contributes at most one finding.
pub fn detect_equivalent_duplicates(
    line_items: &[LineItem],
    groups: &[EquivalenceGroup],
) -> Vec<(DuplicateFinding, Flag)> {
    let mut findings = Vec::new();

    for group in groups {
        let members: Vec<&LineItem> = line_items
            .iter()
            .filter(|i| i.base_code().is_some_and(|c| group.contains(c)))
            .collect();

        // Only a pair of DISTINCT codes is an equivalent duplicate;
        // repeats of one code are already caught by the exact check.
        let mut distinct: Vec<&str> = Vec::new();
        for member in &members {
            if let Some(code) = member.base_code() {
                if !distinct.contains(&code) {
                    distinct.push(code);
                }
            }
        }
        if distinct.len() < 2 {
            continue;
        }

        let savings = round2(members[1].charge_amount);
        let code = group.codes.join("/");

        let finding = DuplicateFinding {
            code: code.clone(),
            description: group.label.clone(),
            occurrences: members.len(),
        };
        let flag = Flag {
            flag_type: FlagType::Duplicate,
            severity: FlagSeverity::High,
            code,
            message: format!(
                "Duplicate billing: {} ({}) billed {} times",
                finding.code,
                group.label,
                members.len()
            ),
            potential_savings: Some(savings),
        };
        findings.push((finding, flag));
    }
    findings
}

// ---------------------------------------------------------------------------
// [3] INVALID CODE detection
// ---------------------------------------------------------------------------

/// Detect CPT-typed codes that have CPT shape but are not in the
/// reference table. The shape test runs on the code as printed, so
/// codes of other types, modifier-suffixed codes, and codes without
/// 5-digit shape are left alone rather than guessed at.
pub fn detect_invalid_codes(
    line_items: &[LineItem],
    codes: &CodeRegistry,
) -> Vec<(InvalidCodeFinding, Flag)> {
    let mut findings = Vec::new();

    for item in line_items {
        if item.code_type != Some(CodeType::Cpt) {
            continue;
        }
        let Some(code) = item.code.as_deref() else {
            continue;
        };
        if !codes.cpt_shape_ok(code) || codes.is_valid_cpt(code) {
            continue;
        }

        let lookup = codes.lookup(code, crate::registry::codes::CodeKind::Cpt);
        let finding = InvalidCodeFinding {
            code: code.to_string(),
            code_type: CodeType::Cpt.as_str().to_string(),
            message: lookup.message,
        };
        let flag = Flag {
            flag_type: FlagType::InvalidCode,
            severity: FlagSeverity::Medium,
            code: code.to_string(),
            message: format!("Invalid CPT code: {code}"),
            potential_savings: None,
        };
        findings.push((finding, flag));
    }
    findings
}

// ---------------------------------------------------------------------------
// [4] OVERCHARGE detection
// ---------------------------------------------------------------------------

/// Detect charges above the regionally adjusted benchmark threshold.
/// Scoped exactly like the validity check: CPT-typed items whose code
/// as printed is a valid 5-digit CPT code, with a positive charge.
pub fn detect_overcharges(
    line_items: &[LineItem],
    codes: &CodeRegistry,
    benchmarks: &BenchmarkRegistry,
    config: &AnalysisConfig,
) -> Vec<(OverchargeFinding, Flag, FlagAnnotation)> {
    let mut findings = Vec::new();

    for item in line_items {
        if item.code_type != Some(CodeType::Cpt) {
            continue;
        }
        let Some(code) = item.code.as_deref() else {
            continue;
        };
        if !codes.is_valid_cpt(code) || item.charge_amount <= 0.0 {
            continue;
        }

        let check = benchmarks.check_overcharge(
            code,
            item.charge_amount,
            config.region.as_deref(),
            config.overcharge_threshold,
        );
        if !check.is_overcharged {
            continue;
        }

        let (Some(benchmark), Some(percent_over), Some(savings)) =
            (check.benchmark, check.percent_over, check.potential_savings)
        else {
            continue;
        };

        let finding = OverchargeFinding {
            code: code.to_string(),
            description: item.description.clone(),
            charged: item.charge_amount,
            benchmark,
            percent_over,
            potential_savings: savings,
        };
        let flag = Flag {
            flag_type: FlagType::Overcharge,
            severity: FlagSeverity::High,
            code: code.to_string(),
            message: format!(
                "Overcharge: {} is {percent_over}% above benchmark (${benchmark:.2})",
                item.description
            ),
            potential_savings: Some(savings),
        };
        let annotation = FlagAnnotation {
            code: code.to_string(),
            flag_type: FlagType::Overcharge,
            severity: FlagSeverity::High,
            explanation: format!("{percent_over}% above benchmark"),
        };
        findings.push((finding, flag, annotation));
    }
    findings
}

// ---------------------------------------------------------------------------
// [5] Orchestration
// ---------------------------------------------------------------------------

/// Run every check over a bill's line items, in a fixed order so that
/// identical input always yields identical flags.
pub fn run_validation(
    line_items: &[LineItem],
    codes: &CodeRegistry,
    benchmarks: &BenchmarkRegistry,
    groups: &[EquivalenceGroup],
    config: &AnalysisConfig,
) -> ValidationResult {
    let mut result = ValidationResult::default();

    for (finding, flag) in detect_exact_duplicates(line_items) {
        result.duplicates.push(finding);
        result.flags.push(flag);
    }

    for (finding, flag) in detect_equivalent_duplicates(line_items, groups) {
        result.duplicates.push(finding);
        result.flags.push(flag);
    }

    for (finding, flag) in detect_invalid_codes(line_items, codes) {
        result.invalid_codes.push(finding);
        result.flags.push(flag);
    }

    // Only overcharge findings are written back onto line items; the
    // other checks stay report-level.
    for (finding, flag, annotation) in detect_overcharges(line_items, codes, benchmarks, config) {
        result.overcharges.push(finding);
        result.flags.push(flag);
        result.annotations.push(annotation);
    }

    result.total_issues = result.flags.len();

    tracing::debug!(
        duplicates = result.duplicates.len(),
        invalid_codes = result.invalid_codes.len(),
        overcharges = result.overcharges.len(),
        "Validation pass complete"
    );

    result
}
