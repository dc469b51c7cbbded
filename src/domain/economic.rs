use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReductionScenarios {
    pub very_conservative: f64,
    pub medium_conservative: f64,
    pub moderately_conservative: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EconomicImpactDefaults {
    pub annual_failed_hearings: u64,
    pub average_cost_per_hearing: f64,
    pub reduction_scenarios: ReductionScenarios,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EconomicImpactInputs {
    pub annual_failed_hearings: u64,
    pub average_cost_per_hearing: f64,
    pub reduction_percentage: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EconomicImpactResult {
    pub reduction_percentage: f64,
    pub avoided_cancellations: u64,
    pub estimated_annual_savings: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    pub name: String,
    #[serde(flatten)]
    pub result: EconomicImpactResult,
}

pub const DEFAULT_ANNUAL_FAILED_HEARINGS: u64 = 75_363;
pub const DEFAULT_AVERAGE_COST_PER_HEARING: f64 = 339.04;
pub const DEFAULT_REDUCTION_PERCENTAGE: f64 = 20.0;

impl Default for EconomicImpactInputs {
    fn default() -> Self {
        Self {
            annual_failed_hearings: DEFAULT_ANNUAL_FAILED_HEARINGS,
            average_cost_per_hearing: DEFAULT_AVERAGE_COST_PER_HEARING,
            reduction_percentage: DEFAULT_REDUCTION_PERCENTAGE,
        }
    }
}

impl EconomicImpactInputs {
    /// Server-provided counts and cost, with the medium-conservative reduction.
    pub fn from_defaults(defaults: &EconomicImpactDefaults) -> Self {
        Self {
            annual_failed_hearings: defaults.annual_failed_hearings,
            average_cost_per_hearing: defaults.average_cost_per_hearing,
            reduction_percentage: defaults.reduction_scenarios.medium_conservative,
        }
    }
}
