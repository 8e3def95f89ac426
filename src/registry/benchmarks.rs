use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::RegistryError;

const BENCHMARK_TABLE: &str = include_str!("../../resources/reference/benchmark_prices.json");
const MULTIPLIER_TABLE: &str = include_str!("../../resources/reference/regional_multipliers.json");

/// National benchmark prices for a CPT code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkEntry {
    pub median: f64,
    pub min: f64,
    pub max: f64,
    pub description: String,
}

/// Benchmark prices adjusted for a region's cost multiplier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionalPrice {
    pub median: f64,
    pub min: f64,
    pub max: f64,
    pub description: String,
    pub region: String,
    pub multiplier: f64,
}

/// Outcome of comparing a charge against its benchmark.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverchargeCheck {
    pub is_overcharged: bool,
    pub charged: f64,
    pub benchmark: Option<f64>,
    pub percent_over: Option<i64>,
    pub potential_savings: Option<f64>,
    pub message: String,
}

/// Median price benchmarks with regional cost adjustment.
pub struct BenchmarkRegistry {
    prices: HashMap<String, BenchmarkEntry>,
    multipliers: HashMap<String, f64>,
}

impl BenchmarkRegistry {
    /// Build the registry from the reference tables compiled into the binary.
    pub fn bundled() -> Result<Self, RegistryError> {
        let prices: HashMap<String, BenchmarkEntry> = serde_json::from_str(BENCHMARK_TABLE)
            .map_err(|e| RegistryError::Parse("benchmark_prices.json".into(), e.to_string()))?;
        let multipliers: HashMap<String, f64> = serde_json::from_str(MULTIPLIER_TABLE)
            .map_err(|e| {
                RegistryError::Parse("regional_multipliers.json".into(), e.to_string())
            })?;
        Ok(BenchmarkRegistry {
            prices,
            multipliers,
        })
    }

    /// Build the registry from tables in a directory, overriding the
    /// bundled reference data.
    pub fn load(dir: &Path) -> Result<Self, RegistryError> {
        let prices = read_json(&dir.join("benchmark_prices.json"))?;
        let multipliers = read_json(&dir.join("regional_multipliers.json"))?;
        Ok(BenchmarkRegistry {
            prices,
            multipliers,
        })
    }

    pub fn entry(&self, code: &str) -> Option<&BenchmarkEntry> {
        self.prices.get(code)
    }

    /// Regional cost multiplier for a state code. Unknown or absent
    /// regions fall back to the national multiplier of 1.0.
    pub fn multiplier(&self, region: Option<&str>) -> f64 {
        region
            .and_then(|r| self.multipliers.get(r.trim().to_uppercase().as_str()))
            .copied()
            .unwrap_or(1.0)
    }

    /// Benchmark prices for a code with the regional multiplier applied.
    pub fn regional_price(&self, code: &str, region: Option<&str>) -> Option<RegionalPrice> {
        let entry = self.prices.get(code)?;
        let multiplier = self.multiplier(region);
        Some(RegionalPrice {
            median: round2(entry.median * multiplier),
            min: round2(entry.min * multiplier),
            max: round2(entry.max * multiplier),
            description: entry.description.clone(),
            region: region
                .map(|r| r.trim().to_uppercase())
                .unwrap_or_else(|| "US".to_string()),
            multiplier,
        })
    }

    /// Compare a charged amount against the regionally adjusted median.
    /// The charge is flagged when it exceeds median * threshold.
    pub fn check_overcharge(
        &self,
        code: &str,
        charged: f64,
        region: Option<&str>,
        threshold: f64,
    ) -> OverchargeCheck {
        let Some(price) = self.regional_price(code, region) else {
            return OverchargeCheck {
                is_overcharged: false,
                charged,
                benchmark: None,
                percent_over: None,
                potential_savings: None,
                message: "No benchmark data available for this code".to_string(),
            };
        };

        let median = price.median;
        let percent_over = (((charged / median) - 1.0) * 100.0).round() as i64;

        if charged > median * threshold {
            OverchargeCheck {
                is_overcharged: true,
                charged,
                benchmark: Some(median),
                percent_over: Some(percent_over),
                potential_savings: Some(round2(charged - median)),
                message: format!("Charge is {percent_over}% above median benchmark"),
            }
        } else {
            OverchargeCheck {
                is_overcharged: false,
                charged,
                benchmark: Some(median),
                percent_over: Some(percent_over),
                potential_savings: None,
                message: "Charge is within acceptable range".to_string(),
            }
        }
    }
}

/// Round to two decimal places, matching how currency values are stored.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, RegistryError> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());
    let raw = fs::read_to_string(path).map_err(|e| RegistryError::Load(name.clone(), e.to_string()))?;
    serde_json::from_str(&raw).map_err(|e| RegistryError::Parse(name, e.to_string()))
}
