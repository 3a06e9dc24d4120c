use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(name = "slip")]
#[command(about = "Slipcast - deterministic milestone forecasting and decision-risk rules")]
#[command(version)]
struct Cli {
    /// Path to the snapshot directory (default: .slipcast in current dir)
    #[arg(long, global = true)]
    dir: Option<PathBuf>,

    /// Output as JSON for machine consumption
    #[arg(long, global = true)]
    json: bool,

    /// Evaluation instant for forecasts (RFC 3339, default: now)
    #[arg(long, global = true)]
    as_of: Option<DateTime<Utc>>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Forecast a milestone's P50/P80 completion dates
    Forecast {
        /// Milestone ID
        milestone: String,

        /// Scenario: delay this work item (requires --delay-days)
        #[arg(long, requires = "delay_days")]
        delay_item: Option<String>,

        /// Scenario: days of delay for --delay-item
        #[arg(long, requires = "delay_item")]
        delay_days: Option<f64>,

        /// Scenario: add this much effort to scope (days)
        #[arg(long, conflicts_with_all = ["delay_item", "capacity"])]
        scope_days: Option<f64>,

        /// Scenario: capacity multiplier (0.8 = lose 20%)
        #[arg(long, conflicts_with_all = ["delay_item", "scope_days"])]
        capacity: Option<f64>,
    },

    /// Preview a mitigation: baseline vs a risk's impact reduced
    Preview {
        /// Milestone ID
        milestone: String,
        /// Risk ID
        risk: String,
        /// Expected impact reduction in days
        reduction_days: f64,
    },

    /// Top contributors to a milestone's slip
    Summary {
        /// Milestone ID
        milestone: String,
    },

    /// Process an event file and print the resulting commands
    Event {
        /// Path to an event JSON file, or '-' for stdin
        file: String,
    },

    /// Check the dependency graph for cycles and dangling references
    Check,

    /// Show the rule registry
    Rules,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let dir = cli.dir.unwrap_or_else(|| PathBuf::from(".slipcast"));
    let as_of = cli.as_of.unwrap_or_else(Utc::now);

    match cli.command {
        Commands::Forecast {
            milestone,
            delay_item,
            delay_days,
            scope_days,
            capacity,
        } => commands::forecast::run(
            &dir,
            &milestone,
            delay_item,
            delay_days,
            scope_days,
            capacity,
            as_of,
            cli.json,
        ),
        Commands::Preview {
            milestone,
            risk,
            reduction_days,
        } => commands::preview::run(&dir, &milestone, &risk, reduction_days, as_of, cli.json),
        Commands::Summary { milestone } => commands::summary::run(&dir, &milestone, as_of, cli.json),
        Commands::Event { file } => commands::event::run(&dir, &file, cli.json),
        Commands::Check => commands::check::run(&dir, cli.json),
        Commands::Rules => commands::rules::run(cli.json),
    }
}
