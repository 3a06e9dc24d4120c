use anyhow::Result;
use chrono::{DateTime, Utc};
use slipcast::forecast::{
    ForecastOptions, ForecastResult, ScenarioSpec, forecast, forecast_with_scenario,
};
use std::path::Path;

#[allow(clippy::too_many_arguments)]
pub fn run(
    dir: &Path,
    milestone: &str,
    delay_item: Option<String>,
    delay_days: Option<f64>,
    scope_days: Option<f64>,
    capacity: Option<f64>,
    as_of: DateTime<Utc>,
    json: bool,
) -> Result<()> {
    let snapshot = super::load_snapshot(dir)?;

    let scenario = match (delay_item, delay_days, scope_days, capacity) {
        (Some(item), Some(days), _, _) => Some(ScenarioSpec::DependencyDelay {
            work_item_id: item,
            delay_days: days,
        }),
        (_, _, Some(days), _) => Some(ScenarioSpec::ScopeChange {
            effort_delta_days: days,
        }),
        (_, _, _, Some(multiplier)) => Some(ScenarioSpec::CapacityChange { multiplier }),
        _ => None,
    };

    match scenario {
        Some(spec) => {
            let comparison = forecast_with_scenario(milestone, &snapshot, spec, as_of)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&comparison)?);
            } else {
                println!("Baseline:");
                print_result(&comparison.baseline);
                println!("\nScenario:");
                print_result(&comparison.scenario);
                println!(
                    "\nScenario moves P80 by {}d",
                    comparison.scenario.delta_p80_days - comparison.baseline.delta_p80_days
                );
            }
        }
        None => {
            let result = forecast(milestone, &snapshot, &ForecastOptions::baseline(as_of))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print_result(&result);
            }
        }
    }

    Ok(())
}

fn print_result(result: &ForecastResult) {
    println!(
        "  P50 {}  ({:+}d)",
        result.p50_date.format("%Y-%m-%d"),
        result.delta_p50_days
    );
    println!(
        "  P80 {}  ({:+}d)",
        result.p80_date.format("%Y-%m-%d"),
        result.delta_p80_days
    );
    println!("  Confidence: {:?}", result.confidence_level);
    println!(
        "  Dependencies: {} external, {} internal",
        result.external_dependencies, result.internal_dependencies
    );
    if !result.contribution_breakdown.is_empty() {
        println!("  Contributions:");
        for c in &result.contribution_breakdown {
            println!("    {:+7.1}d  {}", c.days, c.cause);
        }
    }
}
