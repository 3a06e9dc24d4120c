pub mod accept_risk;
pub mod blocked_item_recovered;
pub mod dependency_blocked;
pub mod mitigate_risk;
pub mod probe;
pub mod reserved;

use crate::command::Command;
use crate::error::CoreError;
use crate::event::{Event, EventType};
use crate::snapshot::StateSnapshot;
use serde::Serialize;

pub use probe::{ForecastDelta, ForecastProbe, HeuristicStubProbe};

/// One rule: a matching predicate and a command emitter over the same
/// `(event, snapshot)` input. Rules share no implementation; the engine's
/// only job is deterministic iteration.
pub trait Rule: Send + Sync {
    fn name(&self) -> &'static str;

    /// Event types this rule can match; registry metadata.
    fn event_types(&self) -> &[EventType];

    fn matches(&self, event: &Event, snapshot: &StateSnapshot) -> bool;

    /// Emit this rule's commands. Only called when `matches` returned true.
    /// Unknown targets are a no-op (zero commands, or one explanation);
    /// a payload missing the id the rule requires is `InvalidInput`.
    fn execute(&self, event: &Event, snapshot: &StateSnapshot)
    -> Result<Vec<Command>, CoreError>;
}

/// Registry metadata for one rule, in iteration order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleInfo {
    pub order: usize,
    pub name: &'static str,
    pub event_types: Vec<EventType>,
}

/// Deterministic, side-effect-free event processor.
///
/// The registry order is fixed at construction and is part of the contract:
/// rules fire in order, commands within a rule preserve emission order, and
/// the concatenation is the call's output. Identical inputs give
/// byte-identical output.
pub struct RuleEngine {
    rules: Vec<Box<dyn Rule>>,
}

impl RuleEngine {
    /// The v1 registry with the stub forecast probe.
    pub fn standard() -> Self {
        Self::with_probe(Box::new(HeuristicStubProbe))
    }

    /// The v1 registry with a caller-supplied forecast probe.
    pub fn with_probe(probe: Box<dyn ForecastProbe>) -> Self {
        let rules: Vec<Box<dyn Rule>> = vec![
            Box::new(dependency_blocked::DependencyBlockedRule::new(probe)),
            Box::new(blocked_item_recovered::BlockedItemRecoveredRule),
            Box::new(accept_risk::AcceptRiskApprovedRule),
            Box::new(mitigate_risk::MitigateRiskApprovedRule),
            Box::new(reserved::ReservedRule::new(
                "dependency_resolved",
                EventType::DependencyResolved,
            )),
            Box::new(reserved::ReservedRule::new(
                "issue_escalated",
                EventType::IssueEscalated,
            )),
            Box::new(reserved::ReservedRule::new(
                "risk_boundary_breached",
                EventType::RiskBoundaryBreached,
            )),
            Box::new(reserved::ReservedRule::new(
                "decision_rejected",
                EventType::DecisionRejected,
            )),
            Box::new(reserved::ReservedRule::new(
                "scope_changed",
                EventType::ScopeChanged,
            )),
            Box::new(reserved::ReservedRule::new(
                "forecast_requested",
                EventType::ForecastRequested,
            )),
        ];
        RuleEngine { rules }
    }

    /// Process one event against one snapshot.
    ///
    /// Every event gets an explicit outcome: a complete command list (possibly
    /// empty) or an error. No partial lists, no silent state changes; the
    /// snapshot is never written.
    pub fn process_event(
        &self,
        event: &Event,
        snapshot: &StateSnapshot,
    ) -> Result<Vec<Command>, CoreError> {
        let mut commands = Vec::new();
        for rule in &self.rules {
            if rule.matches(event, snapshot) {
                commands.extend(rule.execute(event, snapshot)?);
            }
        }
        Ok(commands)
    }

    /// Registry metadata in iteration order.
    pub fn registry(&self) -> Vec<RuleInfo> {
        self.rules
            .iter()
            .enumerate()
            .map(|(order, rule)| RuleInfo {
                order,
                name: rule.name(),
                event_types: rule.event_types().to_vec(),
            })
            .collect()
    }

    pub fn rules_loaded(&self) -> usize {
        self.rules.len()
    }
}
