use crate::graph::DependencyGraph;
use crate::snapshot::{Dependency, StateSnapshot, WorkItem, WorkItemStatus};
use std::collections::HashMap;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Which signal produced the winning own-delay candidate for a work item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelaySignal {
    /// Scenario map override installed by a perturbed forecast
    ScenarioOverride,
    /// Explicit remaining_days on the item
    ProgressRemaining,
    /// (1 - completion_percentage) x estimated_days
    CompletionPercentage,
    /// expected_completion_date past the earliest dependent's implied start
    DateSlip,
    /// External-team slip history
    ExternalTeamHistory,
    /// Status-based heuristic when no structured signal applies
    StatusFallback,
    /// Nothing applicable; zero delay
    None,
}

/// A work item's own delay and the signal that dominated it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OwnDelay {
    pub days: f64,
    pub signal: DelaySignal,
}

impl OwnDelay {
    fn zero() -> Self {
        OwnDelay {
            days: 0.0,
            signal: DelaySignal::None,
        }
    }
}

/// Per-forecast delay estimator. Holds a call-local memo table for the
/// critical-path propagation; build one per forecast invocation and discard.
pub struct DelayModel<'a> {
    snapshot: &'a StateSnapshot,
    graph: &'a DependencyGraph,
    memo: HashMap<String, f64>,
}

impl<'a> DelayModel<'a> {
    pub fn new(snapshot: &'a StateSnapshot, graph: &'a DependencyGraph) -> Self {
        DelayModel {
            snapshot,
            graph,
            memo: HashMap::new(),
        }
    }

    /// The delay attributable to a single work item, before upstream ripple.
    ///
    /// Up to six candidate signals are evaluated and the maximum wins; the
    /// signals are alternative lenses on the same slip, never summed. The
    /// winner is then adjusted by the governing dependency edge (criticality
    /// multiplier, slack subtraction, delay probability).
    pub fn own_delay(&self, item_id: &str) -> OwnDelay {
        let Some(item) = self.snapshot.work_item(item_id) else {
            return OwnDelay::zero();
        };
        if item.status.is_done() {
            return OwnDelay::zero();
        }

        let mut candidates: Vec<(f64, DelaySignal)> = Vec::new();

        if let Some(days) = self.snapshot.scenario_delays.get(item_id)
            && *days > 0.0
        {
            candidates.push((*days, DelaySignal::ScenarioOverride));
        }

        let remaining = item.remaining_days.filter(|d| *d > 0.0);
        if let Some(days) = remaining {
            candidates.push((days, DelaySignal::ProgressRemaining));
        }

        let mut progress_scaled = None;
        if let (Some(pct), Some(est)) = (item.completion_percentage, item.estimated_days)
            && pct < 1.0
        {
            let days = (1.0 - pct) * est;
            progress_scaled = Some(days);
            candidates.push((days, DelaySignal::CompletionPercentage));
        }

        if let (Some(expected), Some(needed_by)) =
            (item.expected_completion_date, self.needed_by(item_id))
        {
            let slip = (expected - needed_by).num_seconds() as f64 / SECONDS_PER_DAY;
            candidates.push((slip.max(0.0), DelaySignal::DateSlip));
        }

        if let Some(team_id) = &item.external_team_id
            && let Some(history) = self.snapshot.team_history.get(team_id)
        {
            let remaining_work = remaining.unwrap_or(0.0).max(progress_scaled.unwrap_or(0.0));
            let base = item.estimated_days.unwrap_or(0.0).max(remaining_work);
            let days = base * (1.0 - history.reliability_score) * history.slip_probability;
            candidates.push((days, DelaySignal::ExternalTeamHistory));
        }

        let winner = candidates
            .into_iter()
            .fold(None::<(f64, DelaySignal)>, |best, c| match best {
                Some(b) if b.0 >= c.0 => Some(b),
                _ => Some(c),
            });

        let (raw, signal) = match winner {
            Some((days, signal)) => (days, signal),
            None => (status_fallback(item), DelaySignal::StatusFallback),
        };

        let adjusted = match self.governing_edge(item_id) {
            Some(edge) => {
                let scaled = raw * edge.criticality.multiplier();
                (scaled - edge.slack_days).max(0.0) * edge.probability_delay
            }
            None => raw,
        };

        if adjusted <= 0.0 {
            OwnDelay::zero()
        } else {
            OwnDelay {
                days: adjusted,
                signal,
            }
        }
    }

    /// Critical-path delay: `own_delay(x) + max(propagated_delay(upstream))`.
    ///
    /// Max-plus recurrence over the DAG, memoised for the lifetime of this
    /// model. Completed items short-circuit to zero without recursing.
    pub fn propagated_delay(&mut self, item_id: &str) -> f64 {
        if let Some(&cached) = self.memo.get(item_id) {
            return cached;
        }
        if let Some(item) = self.snapshot.work_item(item_id)
            && item.status.is_done()
        {
            self.memo.insert(item_id.to_string(), 0.0);
            return 0.0;
        }

        let upstream: Vec<String> = self.graph.upstream(item_id).to_vec();
        let mut upstream_max = 0.0_f64;
        for up in &upstream {
            upstream_max = upstream_max.max(self.propagated_delay(up));
        }

        let total = self.own_delay(item_id).days + upstream_max;
        self.memo.insert(item_id.to_string(), total);
        total
    }

    /// Earliest implied start among direct dependents: each dependent with
    /// both an expected completion date and an estimate implies a start of
    /// `expected - estimated_days`; the earliest such start is when this
    /// item's output is first needed.
    fn needed_by(&self, item_id: &str) -> Option<chrono::DateTime<chrono::Utc>> {
        self.graph
            .dependents(item_id)
            .iter()
            .filter_map(|dep_id| {
                let dep = self.snapshot.work_item(dep_id)?;
                let expected = dep.expected_completion_date?;
                let est = dep.estimated_days?;
                Some(expected - chrono::Duration::seconds((est * SECONDS_PER_DAY) as i64))
            })
            .min()
    }

    /// The explicit edge that governs delay adjustments for an item: the
    /// highest-criticality edge targeting it, ties broken by edge id.
    fn governing_edge(&self, item_id: &str) -> Option<&Dependency> {
        let mut edges: Vec<&Dependency> = self
            .snapshot
            .dependencies
            .values()
            .filter(|d| d.to_id == item_id)
            .collect();
        edges.sort_by(|a, b| {
            b.criticality
                .multiplier()
                .partial_cmp(&a.criticality.multiplier())
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        edges.into_iter().next()
    }
}

/// Delay heuristic when no structured signal applies.
fn status_fallback(item: &WorkItem) -> f64 {
    match item.status {
        WorkItemStatus::Blocked => item
            .remaining_days
            .or(item.estimated_days)
            .unwrap_or(0.0),
        WorkItemStatus::InProgress => item.estimated_days.unwrap_or(0.0) / 2.0,
        WorkItemStatus::NotStarted | WorkItemStatus::Completed => 0.0,
    }
}
