use crate::delay::{DelayModel, DelaySignal};
use crate::error::CoreError;
use crate::graph::DependencyGraph;
use crate::snapshot::{RiskStatus, StateSnapshot};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

/// Scope-change decisions land at 80% of their nominal effort: some of the
/// added effort is absorbed by re-planning rather than pushed onto the date.
const SCOPE_EFFORT_FACTOR: f64 = 0.8;
/// Probability-weighted buffer factor for open risks.
const OPEN_RISK_FACTOR: f64 = 0.5;
/// Reduced buffer factor for risks under active mitigation.
const MITIGATING_RISK_FACTOR: f64 = 0.3;
/// Base uncertainty buffer in days.
const UNCERTAINTY_BASE: f64 = 3.0;
/// Additional uncertainty days per open or mitigating risk.
const UNCERTAINTY_PER_RISK: f64 = 2.0;
/// Tolerance for the contribution-sum bookkeeping check.
const SUM_TOLERANCE: f64 = 0.5;

/// Forecast confidence. Always `Low` in v1; the field exists so calibrated
/// values can appear later without an API break.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Confidence {
    Low,
}

/// A local, temporary perturbation applied inside a single forecast call.
#[derive(Debug, Clone, PartialEq)]
pub enum ScenarioSpec {
    /// What if this work item slips by `delay_days`?
    DependencyDelay {
        work_item_id: String,
        delay_days: f64,
    },
    /// What if scope grows by `effort_delta_days` of effort?
    ScopeChange { effort_delta_days: f64 },
    /// What if capacity changes by this multiplier (0.8 = lose 20%)?
    CapacityChange { multiplier: f64 },
}

/// Hypothetical mitigation: shrink a risk's impact for one call only.
#[derive(Debug, Clone, PartialEq)]
pub struct MitigationSpec {
    pub risk_id: String,
    pub expected_impact_reduction_days: f64,
}

/// Options for one forecast invocation. `as_of` is the evaluation instant
/// (acceptance boundaries are checked against it); the engine never reads
/// the wall clock itself.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastOptions {
    pub as_of: DateTime<Utc>,
    pub scenario: Option<ScenarioSpec>,
    pub mitigation: Option<MitigationSpec>,
}

impl ForecastOptions {
    pub fn baseline(as_of: DateTime<Utc>) -> Self {
        ForecastOptions {
            as_of,
            scenario: None,
            mitigation: None,
        }
    }

    pub fn scenario(as_of: DateTime<Utc>, spec: ScenarioSpec) -> Self {
        ForecastOptions {
            as_of,
            scenario: Some(spec),
            mitigation: None,
        }
    }

    pub fn mitigation(as_of: DateTime<Utc>, spec: MitigationSpec) -> Self {
        ForecastOptions {
            as_of,
            scenario: None,
            mitigation: Some(spec),
        }
    }
}

/// One named component of the forecast slip.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Contribution {
    pub cause: String,
    pub days: f64,
}

/// The result of one forecast call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastResult {
    pub milestone_id: String,
    pub p50_date: DateTime<Utc>,
    pub p80_date: DateTime<Utc>,
    pub delta_p50_days: i64,
    pub delta_p80_days: i64,
    pub confidence_level: Confidence,
    /// Sorted by descending |days|; magnitudes sum to the P80 slip.
    pub contribution_breakdown: Vec<Contribution>,
    pub external_dependencies: usize,
    pub internal_dependencies: usize,
    pub explanation: String,
}

/// Baseline/scenario pair from `forecast_with_scenario`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioComparison {
    pub baseline: ForecastResult,
    pub scenario: ForecastResult,
}

/// Before/after pair from `forecast_mitigation_impact`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MitigationPreview {
    pub current: ForecastResult,
    pub with_mitigation: ForecastResult,
    pub improvement_days_p80: i64,
}

/// Forecast a milestone's P50/P80 completion dates with a causal breakdown.
///
/// Pure and idempotent: identical inputs produce identical results, and the
/// snapshot is never mutated. Baseline, what-if scenarios, and mitigation
/// preview all run through this one function; options only perturb inputs.
pub fn forecast(
    milestone_id: &str,
    snapshot: &StateSnapshot,
    options: &ForecastOptions,
) -> Result<ForecastResult, CoreError> {
    let milestone = snapshot
        .milestone(milestone_id)
        .ok_or_else(|| CoreError::not_found("milestone", milestone_id))?;

    validate_options(snapshot, options)?;

    // A dependency-delay scenario perturbs a short-lived copy of the
    // snapshot; the delay model reads the override as one more candidate
    // signal. Graph edges are untouched by the override.
    let perturbed = match &options.scenario {
        Some(ScenarioSpec::DependencyDelay {
            work_item_id,
            delay_days,
        }) => {
            let mut copy = snapshot.clone();
            copy.scenario_delays
                .insert(work_item_id.clone(), *delay_days);
            Some((copy, work_item_id.as_str(), *delay_days))
        }
        _ => None,
    };

    let graph = DependencyGraph::build(snapshot)?;
    let mut model = DelayModel::new(snapshot, &graph);

    let mut contributions: Vec<Contribution> = Vec::new();

    // Dependency delay: critical-path ripple, the max across tracked items.
    let mut tracked: Vec<&str> = milestone.work_items.iter().map(String::as_str).collect();
    tracked.sort_unstable();
    let mut dep_delay = 0.0_f64;
    let mut dominant_item: Option<&str> = None;
    for &item_id in &tracked {
        let delay = model.propagated_delay(item_id);
        if delay > dep_delay {
            dep_delay = delay;
            dominant_item = Some(item_id);
        }
    }
    if let Some(item_id) = dominant_item {
        // A snapshot that already carries scenario overrides labels the
        // critical item as such; ordinary snapshots label it as a dependency.
        let cause = if model.own_delay(item_id).signal == DelaySignal::ScenarioOverride {
            format!(
                "Scenario: {} delayed by {}d",
                snapshot.item_title(item_id),
                fmt_days(dep_delay)
            )
        } else {
            format!(
                "Dependency: {} ({}d remaining)",
                snapshot.item_title(item_id),
                fmt_days(dep_delay)
            )
        };
        contributions.push(Contribution {
            cause,
            days: dep_delay,
        });
    }

    // Perturbed pass: the same max-plus recurrence over the scenario copy.
    // The override can only raise the critical path; the increase is the
    // scenario's ripple, recorded as its own contribution so the breakdown
    // still sums to the total slip.
    if let Some((scenario_snapshot, target_id, delay_days)) = &perturbed {
        let mut scenario_model = DelayModel::new(scenario_snapshot, &graph);
        let mut perturbed_delay = 0.0_f64;
        for &item_id in &tracked {
            perturbed_delay = perturbed_delay.max(scenario_model.propagated_delay(item_id));
        }
        let ripple = perturbed_delay - dep_delay;
        if ripple > 0.0 {
            contributions.push(Contribution {
                cause: format!(
                    "Scenario: {} delayed by {}d",
                    snapshot.item_title(target_id),
                    fmt_days(*delay_days)
                ),
                days: ripple,
            });
            dep_delay = perturbed_delay;
        }
    }

    // Risk contributions, sorted-id order, priced by effective status.
    let mitigated_risk = options.mitigation.as_ref();
    let mut risk_delay = 0.0_f64;
    let mut pressure_risks = 0usize; // open or mitigating
    for risk in snapshot.risks_for_milestone(milestone_id) {
        let mut impact = risk.impact.impact_days;
        if let Some(spec) = mitigated_risk
            && spec.risk_id == risk.id
        {
            impact = (impact - spec.expected_impact_reduction_days).max(0.0);
        }
        let (days, label) = match risk.effective_status(options.as_of) {
            RiskStatus::Materialised => (impact, format!("Materialised risk: {}", risk.title)),
            RiskStatus::Open => {
                pressure_risks += 1;
                (
                    impact * risk.probability * OPEN_RISK_FACTOR,
                    format!("Open risk: {} (probability-weighted)", risk.title),
                )
            }
            RiskStatus::Mitigating => {
                pressure_risks += 1;
                (
                    impact * MITIGATING_RISK_FACTOR,
                    format!("Mitigating risk: {} (reduced buffer)", risk.title),
                )
            }
            RiskStatus::Accepted | RiskStatus::Closed => (0.0, String::new()),
        };
        if days > 0.0 {
            risk_delay += days;
            contributions.push(Contribution { cause: label, days });
        }
    }

    // Approved scope changes since the last baseline.
    let mut scope_delay = 0.0_f64;
    for decision in snapshot.approved_scope_changes(milestone_id) {
        let effort = decision.effort_delta_days.unwrap_or(0.0);
        let days = SCOPE_EFFORT_FACTOR * effort;
        if days > 0.0 {
            scope_delay += days;
            let label = decision
                .description
                .as_deref()
                .unwrap_or(decision.id.as_str());
            contributions.push(Contribution {
                cause: format!("Recent scope change: {}", label),
                days,
            });
        }
    }

    // Scope and capacity scenarios land as explicit additional
    // contributions; the dependency-delay scenario was already absorbed by
    // the perturbed pass above.
    let mut scenario_delay = 0.0_f64;
    if let Some(spec) = &options.scenario {
        match spec {
            ScenarioSpec::DependencyDelay { .. } => {}
            ScenarioSpec::ScopeChange { effort_delta_days } => {
                let days = SCOPE_EFFORT_FACTOR * effort_delta_days;
                if days > 0.0 {
                    scenario_delay = days;
                    contributions.push(Contribution {
                        cause: format!("Scenario: scope +{}d", fmt_days(*effort_delta_days)),
                        days,
                    });
                }
            }
            ScenarioSpec::CapacityChange { multiplier } => {
                let base = dep_delay + risk_delay + scope_delay;
                let days = base * (1.0 / multiplier - 1.0);
                if days != 0.0 {
                    scenario_delay = days;
                    contributions.push(Contribution {
                        cause: format!("Scenario: capacity x{}", fmt_days(*multiplier)),
                        days,
                    });
                }
            }
        }
    }

    let slip_p50 = dep_delay + risk_delay + scope_delay + scenario_delay;
    let uncertainty = UNCERTAINTY_BASE + UNCERTAINTY_PER_RISK * pressure_risks as f64;
    contributions.push(Contribution {
        cause: "Uncertainty buffer (P80)".to_string(),
        days: uncertainty,
    });

    let delta_p50_days = slip_p50.round() as i64;
    let delta_p80_days = (slip_p50 + uncertainty).round() as i64;
    let p50_date = milestone.target_date + Duration::days(delta_p50_days);
    let p80_date = p50_date + Duration::days(uncertainty.round() as i64);

    contributions.sort_by(|a, b| {
        b.days
            .abs()
            .partial_cmp(&a.days.abs())
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.cause.cmp(&b.cause))
    });

    let sum: f64 = contributions.iter().map(|c| c.days).sum();
    if (sum - (slip_p50 + uncertainty)).abs() > SUM_TOLERANCE {
        return Err(CoreError::InternalInvariant(format!(
            "contribution sum {} disagrees with P80 slip {}",
            sum,
            slip_p50 + uncertainty
        )));
    }

    let (external_dependencies, internal_dependencies) =
        dependency_counts(snapshot, &graph, &tracked);

    let explanation = explain(&milestone.name, delta_p50_days, p50_date, p80_date, &contributions);

    Ok(ForecastResult {
        milestone_id: milestone_id.to_string(),
        p50_date,
        p80_date,
        delta_p50_days,
        delta_p80_days,
        confidence_level: Confidence::Low,
        contribution_breakdown: contributions,
        external_dependencies,
        internal_dependencies,
        explanation,
    })
}

/// Run the same forecast twice, baseline and perturbed.
pub fn forecast_with_scenario(
    milestone_id: &str,
    snapshot: &StateSnapshot,
    spec: ScenarioSpec,
    as_of: DateTime<Utc>,
) -> Result<ScenarioComparison, CoreError> {
    let baseline = forecast(milestone_id, snapshot, &ForecastOptions::baseline(as_of))?;
    let scenario = forecast(
        milestone_id,
        snapshot,
        &ForecastOptions::scenario(as_of, spec),
    )?;
    Ok(ScenarioComparison { baseline, scenario })
}

/// Preview a mitigation: baseline vs. the named risk's impact reduced.
pub fn forecast_mitigation_impact(
    milestone_id: &str,
    snapshot: &StateSnapshot,
    risk_id: &str,
    expected_impact_reduction_days: f64,
    as_of: DateTime<Utc>,
) -> Result<MitigationPreview, CoreError> {
    let current = forecast(milestone_id, snapshot, &ForecastOptions::baseline(as_of))?;
    let with_mitigation = forecast(
        milestone_id,
        snapshot,
        &ForecastOptions::mitigation(
            as_of,
            MitigationSpec {
                risk_id: risk_id.to_string(),
                expected_impact_reduction_days,
            },
        ),
    )?;
    let improvement_days_p80 = current.delta_p80_days - with_mitigation.delta_p80_days;
    Ok(MitigationPreview {
        current,
        with_mitigation,
        improvement_days_p80,
    })
}

/// The top contributors of a forecast, largest first.
pub fn summarise(result: &ForecastResult, top_n: usize) -> Vec<Contribution> {
    result
        .contribution_breakdown
        .iter()
        .take(top_n)
        .cloned()
        .collect()
}

fn validate_options(snapshot: &StateSnapshot, options: &ForecastOptions) -> Result<(), CoreError> {
    if let Some(spec) = &options.scenario {
        match spec {
            ScenarioSpec::DependencyDelay {
                work_item_id,
                delay_days,
            } => {
                if *delay_days < 0.0 {
                    return Err(CoreError::InvalidInput(format!(
                        "scenario delay must be non-negative, got {}",
                        delay_days
                    )));
                }
                if snapshot.work_item(work_item_id).is_none() {
                    return Err(CoreError::not_found("work_item", work_item_id.clone()));
                }
            }
            ScenarioSpec::ScopeChange { effort_delta_days } => {
                if *effort_delta_days < 0.0 {
                    return Err(CoreError::InvalidInput(format!(
                        "scenario effort delta must be non-negative, got {}",
                        effort_delta_days
                    )));
                }
            }
            ScenarioSpec::CapacityChange { multiplier } => {
                if *multiplier <= 0.0 {
                    return Err(CoreError::InvalidInput(format!(
                        "capacity multiplier must be positive, got {}",
                        multiplier
                    )));
                }
            }
        }
    }
    if let Some(spec) = &options.mitigation {
        if spec.expected_impact_reduction_days < 0.0 {
            return Err(CoreError::InvalidInput(format!(
                "impact reduction must be non-negative, got {}",
                spec.expected_impact_reduction_days
            )));
        }
        if snapshot.risk(&spec.risk_id).is_none() {
            return Err(CoreError::not_found("risk", spec.risk_id.clone()));
        }
    }
    Ok(())
}

/// External vs internal upstream counts across the tracked items.
fn dependency_counts(
    snapshot: &StateSnapshot,
    graph: &DependencyGraph,
    tracked: &[&str],
) -> (usize, usize) {
    let mut external = 0;
    let mut internal = 0;
    let mut seen: std::collections::HashSet<&str> = std::collections::HashSet::new();
    for item_id in tracked {
        for up in graph.upstream(item_id) {
            if !seen.insert(up.as_str()) {
                continue;
            }
            match snapshot.work_item(up) {
                Some(item) if item.external_team_id.is_some() => external += 1,
                _ => internal += 1,
            }
        }
    }
    (external, internal)
}

fn explain(
    milestone_name: &str,
    delta_p50_days: i64,
    p50_date: DateTime<Utc>,
    p80_date: DateTime<Utc>,
    contributions: &[Contribution],
) -> String {
    let top = contributions
        .first()
        .map(|c| format!("{} (+{}d)", c.cause, fmt_days(c.days)))
        .unwrap_or_else(|| "no contributors".to_string());
    format!(
        "{} slips {}d: P50 {} / P80 {}. Top contributor: {}",
        milestone_name,
        delta_p50_days,
        p50_date.format("%Y-%m-%d"),
        p80_date.format("%Y-%m-%d"),
        top
    )
}

/// Format a day count without a trailing `.0`.
fn fmt_days(days: f64) -> String {
    if (days - days.round()).abs() < f64::EPSILON {
        format!("{}", days.round() as i64)
    } else {
        format!("{:.1}", days)
    }
}
