pub mod command;
pub mod delay;
pub mod error;
pub mod event;
pub mod forecast;
pub mod graph;
pub mod parser;
pub mod rules;
pub mod snapshot;

pub use command::{Command, CommandBuilder, CommandFamily, CommandPayload, CommandType, EscalationMode};
pub use delay::{DelayModel, DelaySignal, OwnDelay};
pub use error::CoreError;
pub use event::{Event, EventFamily, EventPayload, EventType};
pub use forecast::{
    Confidence, Contribution, ForecastOptions, ForecastResult, MitigationPreview, MitigationSpec,
    ScenarioComparison, ScenarioSpec, forecast, forecast_mitigation_impact,
    forecast_with_scenario, summarise,
};
pub use graph::DependencyGraph;
pub use parser::{ParseError, Record, load_snapshot, save_snapshot};
pub use rules::{
    ForecastDelta, ForecastProbe, HeuristicStubProbe, Rule, RuleEngine, RuleInfo,
};
pub use snapshot::{
    AcceptanceBoundary, Actor, BoundaryKind, Criticality, Decision, DecisionStatus, DecisionType,
    Dependency, ExternalTeamHistory, Issue, IssueStatus, IssueType, Milestone, MilestoneStatus,
    Priority, Risk, RiskImpact, RiskStatus, StateSnapshot, WorkItem, WorkItemStatus,
};
