use std::path::Path;

use chrono::Utc;

use crate::commands::console::{CommandError, Console};
use crate::commands::report_format::format_economic_report;
use crate::domain::economic::{EconomicImpactDefaults, EconomicImpactInputs};
use crate::services::economic_impact::{estimate, projection, scenarios};
use crate::services::export::{
    EconomicImpactExport, ExportFormat, resolve_output_path, to_structured_document,
    write_export,
};

const EXPORT_PREFIX: &str = "economic-impact";

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct InputOverrides {
    pub failed: Option<u64>,
    pub cost: Option<f64>,
    pub reduction: Option<f64>,
}

/// Built-in or server defaults, with any value given on the command line taking precedence.
pub fn resolve_inputs(
    defaults: Option<&EconomicImpactDefaults>,
    overrides: InputOverrides,
) -> EconomicImpactInputs {
    let base = defaults
        .map(EconomicImpactInputs::from_defaults)
        .unwrap_or_default();
    EconomicImpactInputs {
        annual_failed_hearings: overrides.failed.unwrap_or(base.annual_failed_hearings),
        average_cost_per_hearing: overrides.cost.unwrap_or(base.average_cost_per_hearing),
        reduction_percentage: overrides.reduction.unwrap_or(base.reduction_percentage),
    }
}

pub async fn economic_impact_command(
    console: &Console,
    overrides: InputOverrides,
    server_defaults: bool,
    csv: Option<&str>,
    json: Option<&str>,
) -> Result<(), CommandError> {
    let defaults = if server_defaults {
        Some(console.client.get_economic_defaults().await?)
    } else {
        None
    };
    let inputs = resolve_inputs(defaults.as_ref(), overrides);

    let current = estimate(&inputs)?;
    let named = match &defaults {
        Some(defaults) => scenarios(defaults, &inputs)?,
        None => Vec::new(),
    };
    let curve = projection(&inputs)?;
    println!("{}", format_economic_report(&inputs, &current, &named, &curve));

    let now = Utc::now();
    let report = EconomicImpactExport::new(now, inputs, current, named);
    if let Some(output) = csv {
        let path = resolve_output_path(Path::new(output), EXPORT_PREFIX, now, ExportFormat::Csv);
        write_export(&path, &report.to_delimited_text()?)?;
        println!("Scenario table written to {}", path.display());
    }
    if let Some(output) = json {
        let path = resolve_output_path(Path::new(output), EXPORT_PREFIX, now, ExportFormat::Json);
        write_export(&path, &to_structured_document(&report)?)?;
        println!("Economic impact report written to {}", path.display());
    }
    Ok(())
}
