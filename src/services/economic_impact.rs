use thiserror::Error;

use crate::domain::economic::{
    EconomicImpactDefaults, EconomicImpactInputs, EconomicImpactResult, Scenario,
};

pub const PROJECTION_MAX_PERCENT: u32 = 30;
pub const PROJECTION_STEP_PERCENT: u32 = 2;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EconomicImpactError {
    #[error("reduction percentage must lie between 0 and 100, got {0}")]
    ReductionOutOfRange(f64),
    #[error("average cost per hearing must not be negative, got {0}")]
    NegativeCost(f64),
}

pub fn validate(inputs: &EconomicImpactInputs) -> Result<(), EconomicImpactError> {
    if !(0.0..=100.0).contains(&inputs.reduction_percentage) {
        return Err(EconomicImpactError::ReductionOutOfRange(
            inputs.reduction_percentage,
        ));
    }
    if !inputs.average_cost_per_hearing.is_finite() || inputs.average_cost_per_hearing < 0.0 {
        return Err(EconomicImpactError::NegativeCost(
            inputs.average_cost_per_hearing,
        ));
    }
    Ok(())
}

/// Avoided cancellations are rounded to whole hearings before pricing; savings are
/// rounded to cents.
fn project(failed: u64, cost: f64, reduction_percentage: f64) -> EconomicImpactResult {
    let avoided = (failed as f64 * reduction_percentage / 100.0).round();
    let savings = (avoided * cost * 100.0).round() / 100.0;
    EconomicImpactResult {
        reduction_percentage,
        avoided_cancellations: avoided as u64,
        estimated_annual_savings: savings,
    }
}

/// Named scenarios price the unrounded share of failed hearings; only the count shown is
/// rounded.
fn price_scenario(failed: u64, cost: f64, reduction_percentage: f64) -> EconomicImpactResult {
    let share = failed as f64 * reduction_percentage / 100.0;
    EconomicImpactResult {
        reduction_percentage,
        avoided_cancellations: share.round() as u64,
        estimated_annual_savings: (share * cost * 100.0).round() / 100.0,
    }
}

pub fn estimate(inputs: &EconomicImpactInputs) -> Result<EconomicImpactResult, EconomicImpactError> {
    validate(inputs)?;
    Ok(project(
        inputs.annual_failed_hearings,
        inputs.average_cost_per_hearing,
        inputs.reduction_percentage,
    ))
}

/// The three named reduction scenarios published by the backend, priced with the
/// current counts and cost.
pub fn scenarios(
    defaults: &EconomicImpactDefaults,
    inputs: &EconomicImpactInputs,
) -> Result<Vec<Scenario>, EconomicImpactError> {
    validate(inputs)?;
    let named = [
        ("Very conservative", defaults.reduction_scenarios.very_conservative),
        ("Medium conservative", defaults.reduction_scenarios.medium_conservative),
        (
            "Moderately conservative",
            defaults.reduction_scenarios.moderately_conservative,
        ),
    ];
    named
        .iter()
        .map(|(name, reduction)| {
            validate(&EconomicImpactInputs {
                reduction_percentage: *reduction,
                ..*inputs
            })?;
            Ok(Scenario {
                name: name.to_string(),
                result: price_scenario(
                    inputs.annual_failed_hearings,
                    inputs.average_cost_per_hearing,
                    *reduction,
                ),
            })
        })
        .collect()
}

/// Savings curve from 0 % to 30 % reduction in 2 % steps.
pub fn projection(inputs: &EconomicImpactInputs) -> Result<Vec<EconomicImpactResult>, EconomicImpactError> {
    validate(inputs)?;
    Ok((0..=PROJECTION_MAX_PERCENT)
        .step_by(PROJECTION_STEP_PERCENT as usize)
        .map(|percent| {
            project(
                inputs.annual_failed_hearings,
                inputs.average_cost_per_hearing,
                f64::from(percent),
            )
        })
        .collect())
}
