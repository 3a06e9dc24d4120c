use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Milestone status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MilestoneStatus {
    #[default]
    Pending,
    AtRisk,
    Achieved,
    Missed,
}

/// Work item status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WorkItemStatus {
    #[default]
    NotStarted,
    InProgress,
    Blocked,
    Completed,
}

impl WorkItemStatus {
    /// Whether this status means the item contributes no further delay of its own.
    pub fn is_done(&self) -> bool {
        matches!(self, WorkItemStatus::Completed)
    }
}

/// Criticality of a dependency edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Criticality {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl Criticality {
    /// Delay multiplier applied to candidates governed by an edge of this criticality.
    pub fn multiplier(&self) -> f64 {
        match self {
            Criticality::Low => 0.5,
            Criticality::Medium => 1.0,
            Criticality::High => 1.5,
            Criticality::Critical => 2.0,
        }
    }
}

/// Risk lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RiskStatus {
    #[default]
    Open,
    Materialised,
    Mitigating,
    Accepted,
    Closed,
}

impl RiskStatus {
    /// Closed is the only terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, RiskStatus::Closed)
    }
}

/// Decision type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionType {
    ChangeScope,
    AcceptRisk,
    MitigateRisk,
    Delay,
    Accelerate,
    Hire,
    Fire,
    AddResource,
    RemoveResource,
}

/// Decision status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DecisionStatus {
    #[default]
    Proposed,
    Approved,
    Rejected,
    Superseded,
}

/// Issue type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum IssueType {
    DependencyBlocked,
    ResourceConstraint,
    TechnicalBlocker,
    ExternalDependency,
    ScopeUnclear,
    #[default]
    Other,
}

/// Issue status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum IssueStatus {
    #[default]
    Open,
    InProgress,
    Resolved,
    Closed,
}

/// Priority, shared by issues and commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

/// Kind of acceptance boundary on an accepted risk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryKind {
    Date,
    Threshold,
    Event,
}

/// Boundary within which an accepted risk stays in quiet monitoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcceptanceBoundary {
    pub kind: BoundaryKind,
    /// Breach instant for date boundaries
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
    /// Breach level in slip days for threshold boundaries
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold_days: Option<f64>,
    /// Event type that fires the breach for event boundaries
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trigger_event: Option<String>,
}

/// A milestone: a target date tracking an ordered set of work items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Milestone {
    pub id: String,
    pub name: String,
    pub target_date: DateTime<Utc>,
    /// Work items this milestone tracks. Must be non-empty for the milestone
    /// to carry a meaningful forecast; an empty set forecasts zero slip.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub work_items: Vec<String>,
    #[serde(default)]
    pub status: MilestoneStatus,
}

/// A unit of work tracked by a milestone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkItem {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_days: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_days: Option<f64>,
    /// Remaining effort in days. When present, overrides `estimated_days`
    /// for delay purposes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_days: Option<f64>,
    /// Fraction complete in [0, 1]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion_percentage: Option<f64>,
    #[serde(default)]
    pub status: WorkItemStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub milestone_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_team_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_completion_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence_level: Option<f64>,
    /// Upstream work item ids this item cannot finish without.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
}

fn default_probability() -> f64 {
    1.0
}

/// An explicit finish-to-start dependency edge: `from_id` cannot finish
/// until `to_id` does.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dependency {
    pub id: String,
    pub from_id: String,
    pub to_id: String,
    #[serde(default)]
    pub criticality: Criticality,
    #[serde(default)]
    pub slack_days: f64,
    /// Probability the upstream item is late at all. Defaults to certain.
    #[serde(default = "default_probability")]
    pub probability_delay: f64,
    #[serde(default)]
    pub expected_delay_if_late: f64,
    /// Actor responsible for unblocking this edge
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
}

/// Impact record attached to a risk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RiskImpact {
    #[serde(default)]
    pub impact_days: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocked_item: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocking_item: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub p50_delay_days: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub p80_delay_days: Option<f64>,
}

/// A risk against a milestone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Risk {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub status: RiskStatus,
    /// Probability of materialising, in [0, 1]
    #[serde(default)]
    pub probability: f64,
    #[serde(default)]
    pub impact: RiskImpact,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub milestone_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub affected_items: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accepted_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accepted_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acceptance_boundary: Option<AcceptanceBoundary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_review_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suppress_escalation_until: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mitigation_started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mitigation_action: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mitigation_due_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution_note: Option<String>,
}

impl Risk {
    /// Whether an accepted risk's date boundary has passed at `as_of`.
    /// Threshold and event boundaries only breach via explicit events, never
    /// at read time.
    pub fn boundary_breached(&self, as_of: DateTime<Utc>) -> bool {
        if self.status != RiskStatus::Accepted {
            return false;
        }
        match &self.acceptance_boundary {
            Some(b) if b.kind == BoundaryKind::Date => {
                b.date.map(|d| d < as_of).unwrap_or(false)
            }
            _ => false,
        }
    }

    /// Status as the forecast prices it: a breached accepted risk reads as open.
    pub fn effective_status(&self, as_of: DateTime<Utc>) -> RiskStatus {
        if self.boundary_breached(as_of) {
            RiskStatus::Open
        } else {
            self.status
        }
    }
}

/// A recorded decision about the portfolio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub id: String,
    pub decision_type: DecisionType,
    #[serde(default)]
    pub status: DecisionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effort_delta_days: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub milestone_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acceptance_boundary: Option<AcceptanceBoundary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mitigation_action: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mitigation_due_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decided_at: Option<DateTime<Utc>>,
}

/// An operational issue raised against a dependency, work item, or risk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub id: String,
    pub issue_type: IssueType,
    #[serde(default)]
    pub status: IssueStatus,
    #[serde(default)]
    pub priority: Priority,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dependency_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub work_item_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub impact_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution_notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
}

/// An actor who owns work or dependencies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Actor {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

/// Historical slip record for an external team.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalTeamHistory {
    pub team_id: String,
    #[serde(default)]
    pub avg_slip_days: f64,
    /// Probability of slipping at all, in [0, 1]
    #[serde(default)]
    pub slip_probability: f64,
    /// 1.0 = always on time, in [0, 1]
    #[serde(default = "default_probability")]
    pub reliability_score: f64,
}

/// The immutable state bundle every call into the core reads from.
///
/// Both linkage directions (milestone -> items and item -> milestone) are
/// materialised by `reconcile()` at construction time and never mutated
/// afterwards, so the snapshot is trivially shareable across reader threads.
/// Scenarios clone the snapshot and set `scenario_delays` for the duration of
/// a single forecast call.
#[derive(Debug, Clone, Default)]
pub struct StateSnapshot {
    pub milestones: HashMap<String, Milestone>,
    pub work_items: HashMap<String, WorkItem>,
    pub dependencies: HashMap<String, Dependency>,
    pub risks: HashMap<String, Risk>,
    pub decisions: HashMap<String, Decision>,
    pub issues: HashMap<String, Issue>,
    pub actors: HashMap<String, Actor>,
    pub team_history: HashMap<String, ExternalTeamHistory>,
    /// Per-item delay overrides installed by a scenario. Empty outside a
    /// perturbed forecast call.
    pub scenario_delays: HashMap<String, f64>,
}

impl StateSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_milestone(&mut self, m: Milestone) {
        self.milestones.insert(m.id.clone(), m);
    }

    pub fn add_work_item(&mut self, w: WorkItem) {
        self.work_items.insert(w.id.clone(), w);
    }

    pub fn add_dependency(&mut self, d: Dependency) {
        self.dependencies.insert(d.id.clone(), d);
    }

    pub fn add_risk(&mut self, r: Risk) {
        self.risks.insert(r.id.clone(), r);
    }

    pub fn add_decision(&mut self, d: Decision) {
        self.decisions.insert(d.id.clone(), d);
    }

    pub fn add_issue(&mut self, i: Issue) {
        self.issues.insert(i.id.clone(), i);
    }

    pub fn add_actor(&mut self, a: Actor) {
        self.actors.insert(a.id.clone(), a);
    }

    pub fn add_team_history(&mut self, h: ExternalTeamHistory) {
        self.team_history.insert(h.team_id.clone(), h);
    }

    pub fn milestone(&self, id: &str) -> Option<&Milestone> {
        self.milestones.get(id)
    }

    pub fn work_item(&self, id: &str) -> Option<&WorkItem> {
        self.work_items.get(id)
    }

    pub fn dependency(&self, id: &str) -> Option<&Dependency> {
        self.dependencies.get(id)
    }

    pub fn risk(&self, id: &str) -> Option<&Risk> {
        self.risks.get(id)
    }

    pub fn decision(&self, id: &str) -> Option<&Decision> {
        self.decisions.get(id)
    }

    pub fn issue(&self, id: &str) -> Option<&Issue> {
        self.issues.get(id)
    }

    pub fn actor(&self, id: &str) -> Option<&Actor> {
        self.actors.get(id)
    }

    /// Title of a work item, falling back to its id when the item is unknown.
    pub fn item_title<'a>(&'a self, id: &'a str) -> &'a str {
        self.work_items.get(id).map(|w| w.title.as_str()).unwrap_or(id)
    }

    /// Materialise both linkage directions between milestones and work items.
    ///
    /// After this: every id in a milestone's `work_items` that resolves to a
    /// known item has that item's `milestone_id` back-pointer set, and every
    /// item claiming a milestone appears in that milestone's `work_items`.
    /// Called once at construction; the snapshot is read-only afterwards.
    pub fn reconcile(&mut self) {
        let mut memberships: Vec<(String, String)> = Vec::new();
        for m in self.milestones.values() {
            for item_id in &m.work_items {
                memberships.push((item_id.clone(), m.id.clone()));
            }
        }
        for (item_id, milestone_id) in memberships {
            if let Some(item) = self.work_items.get_mut(&item_id) {
                item.milestone_id = Some(milestone_id);
            }
        }

        let mut claims: Vec<(String, String)> = Vec::new();
        for item in self.work_items.values() {
            if let Some(mid) = &item.milestone_id {
                claims.push((mid.clone(), item.id.clone()));
            }
        }
        // Sorted so appended memberships land in the same order on every run.
        claims.sort();
        for (milestone_id, item_id) in claims {
            if let Some(m) = self.milestones.get_mut(&milestone_id)
                && !m.work_items.contains(&item_id)
            {
                m.work_items.push(item_id);
            }
        }
    }

    /// Risks attached to a milestone, in sorted-id order for determinism.
    pub fn risks_for_milestone(&self, milestone_id: &str) -> Vec<&Risk> {
        let mut out: Vec<&Risk> = self
            .risks
            .values()
            .filter(|r| r.milestone_id.as_deref() == Some(milestone_id))
            .collect();
        out.sort_by(|a, b| a.id.cmp(&b.id));
        out
    }

    /// Approved scope-change decisions for a milestone, in sorted-id order.
    pub fn approved_scope_changes(&self, milestone_id: &str) -> Vec<&Decision> {
        let mut out: Vec<&Decision> = self
            .decisions
            .values()
            .filter(|d| {
                d.decision_type == DecisionType::ChangeScope
                    && d.status == DecisionStatus::Approved
                    && d.milestone_id.as_deref() == Some(milestone_id)
            })
            .collect();
        out.sort_by(|a, b| a.id.cmp(&b.id));
        out
    }

    /// The open dependency_blocked issue for a dependency, if one exists.
    /// The snapshot invariant allows at most one.
    pub fn open_issue_for_dependency(&self, dependency_id: &str) -> Option<&Issue> {
        let mut matches: Vec<&Issue> = self
            .issues
            .values()
            .filter(|i| {
                i.issue_type == IssueType::DependencyBlocked
                    && i.status == IssueStatus::Open
                    && i.dependency_id.as_deref() == Some(dependency_id)
            })
            .collect();
        matches.sort_by(|a, b| a.id.cmp(&b.id));
        matches.into_iter().next()
    }

    /// All risks in sorted-id order. Rule traversals use this so command
    /// emission order is deterministic.
    pub fn risks_sorted(&self) -> Vec<&Risk> {
        let mut out: Vec<&Risk> = self.risks.values().collect();
        out.sort_by(|a, b| a.id.cmp(&b.id));
        out
    }
}
