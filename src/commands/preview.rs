use anyhow::Result;
use chrono::{DateTime, Utc};
use slipcast::forecast::forecast_mitigation_impact;
use std::path::Path;

pub fn run(
    dir: &Path,
    milestone: &str,
    risk: &str,
    reduction_days: f64,
    as_of: DateTime<Utc>,
    json: bool,
) -> Result<()> {
    let snapshot = super::load_snapshot(dir)?;
    let preview = forecast_mitigation_impact(milestone, &snapshot, risk, reduction_days, as_of)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&preview)?);
    } else {
        println!(
            "Current:         P80 {} ({:+}d)",
            preview.current.p80_date.format("%Y-%m-%d"),
            preview.current.delta_p80_days
        );
        println!(
            "With mitigation: P80 {} ({:+}d)",
            preview.with_mitigation.p80_date.format("%Y-%m-%d"),
            preview.with_mitigation.delta_p80_days
        );
        println!(
            "Mitigating '{}' by {}d buys {} day(s) on P80",
            risk, reduction_days, preview.improvement_days_p80
        );
    }

    Ok(())
}
