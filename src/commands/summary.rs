use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use slipcast::forecast::{Contribution, ForecastOptions, forecast, summarise};
use std::path::Path;

/// How many contributors the summary surfaces.
const TOP_N: usize = 3;

#[derive(Debug, Serialize)]
struct SummaryOutput {
    milestone_id: String,
    p50_date: DateTime<Utc>,
    p80_date: DateTime<Utc>,
    top_contributors: Vec<Contribution>,
}

pub fn run(dir: &Path, milestone: &str, as_of: DateTime<Utc>, json: bool) -> Result<()> {
    let snapshot = super::load_snapshot(dir)?;
    let result = forecast(milestone, &snapshot, &ForecastOptions::baseline(as_of))?;
    let top = summarise(&result, TOP_N);

    if json {
        let output = SummaryOutput {
            milestone_id: result.milestone_id.clone(),
            p50_date: result.p50_date,
            p80_date: result.p80_date,
            top_contributors: top,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("{}", result.explanation);
        for (i, c) in top.iter().enumerate() {
            println!("  {}. {} ({:+.1}d)", i + 1, c.cause, c.days);
        }
    }

    Ok(())
}
