use crate::command::{Command, CommandBuilder, CommandPayload, CommandType};
use crate::error::CoreError;
use crate::event::{Event, EventType};
use crate::rules::{ForecastProbe, Rule};
use crate::snapshot::{IssueStatus, IssueType, Priority, RiskImpact, RiskStatus, StateSnapshot};
use chrono::Duration;

/// A blocked dependency becomes a tracked risk once the forecast says it
/// moves the P80 date by at least this many days. The threshold is inclusive.
const RISK_THRESHOLD_DAYS: f64 = 7.0;
/// Follow-up window for the dependency's owner.
const OWNER_FOLLOW_UP_DAYS: i64 = 7;

/// Rule 1: a dependency reported blocked or unavailable raises an issue,
/// asks the forecast how material the block is, and promotes it to a
/// materialised risk when the impact clears the threshold.
pub struct DependencyBlockedRule {
    probe: Box<dyn ForecastProbe>,
}

impl DependencyBlockedRule {
    pub fn new(probe: Box<dyn ForecastProbe>) -> Self {
        DependencyBlockedRule { probe }
    }
}

const MATCHED_EVENTS: &[EventType] = &[
    EventType::DependencyBlocked,
    EventType::DependencyUnavailable,
];

impl Rule for DependencyBlockedRule {
    fn name(&self) -> &'static str {
        "dependency_blocked"
    }

    fn event_types(&self) -> &[EventType] {
        MATCHED_EVENTS
    }

    fn matches(&self, event: &Event, _snapshot: &StateSnapshot) -> bool {
        MATCHED_EVENTS.contains(&event.event_type)
    }

    fn execute(
        &self,
        event: &Event,
        snapshot: &StateSnapshot,
    ) -> Result<Vec<Command>, CoreError> {
        let dependency_id = event.payload.dependency_id.as_deref().ok_or_else(|| {
            CoreError::InvalidInput(format!(
                "{:?} event {} carries no dependency_id",
                event.event_type, event.id
            ))
        })?;

        let mut builder = CommandBuilder::new(event, self.name());

        let Some(dependency) = snapshot.dependency(dependency_id) else {
            // Explicit no-op: say that the target does not exist.
            return Ok(vec![builder.build(
                CommandType::EmitExplanation,
                dependency_id,
                format!("dependency '{}' is not in the snapshot", dependency_id),
                CommandPayload {
                    explanation: Some(format!(
                        "No action taken: dependency '{}' was not found",
                        dependency_id
                    )),
                    ..CommandPayload::default()
                },
            )]);
        };

        let blocked_title = snapshot.item_title(&dependency.from_id).to_string();
        let blocking_title = snapshot.item_title(&dependency.to_id).to_string();
        let mut commands = Vec::new();

        let issue_id = format!("issue_dep_blocked_{}", dependency_id);
        let already_open = snapshot
            .issue(&issue_id)
            .map(|i| i.status == IssueStatus::Open)
            .unwrap_or(false)
            || snapshot.open_issue_for_dependency(dependency_id).is_some();
        if !already_open {
            commands.push(builder.build(
                CommandType::CreateIssue,
                issue_id,
                format!("dependency '{}' reported blocked", dependency_id),
                CommandPayload {
                    issue_type: Some(IssueType::DependencyBlocked),
                    dependency_id: Some(dependency_id.to_string()),
                    description: Some(format!(
                        "{} is blocked waiting on {}",
                        blocked_title, blocking_title
                    )),
                    ..CommandPayload::default()
                },
            ));
        }

        let delta = self.probe.dependency_impact(dependency_id, snapshot);
        if delta.delta_p80_days >= RISK_THRESHOLD_DAYS {
            let risk_id = format!("risk_dep_blocked_{}", dependency_id);
            let command_type = if snapshot.risk(&risk_id).is_some() {
                CommandType::UpdateRisk
            } else {
                CommandType::CreateRisk
            };
            let mut risk_command = builder.build(
                command_type,
                risk_id,
                format!(
                    "blocked dependency moves P80 by {}d (threshold {}d)",
                    delta.delta_p80_days, RISK_THRESHOLD_DAYS
                ),
                CommandPayload {
                    title: Some(format!("Blocked Dependency: {}", blocked_title)),
                    description: Some(format!(
                        "{} cannot finish while {} is blocked",
                        blocked_title, blocking_title
                    )),
                    risk_status: Some(RiskStatus::Materialised),
                    impact: Some(RiskImpact {
                        impact_days: delta.delta_p80_days,
                        blocked_item: Some(dependency.from_id.clone()),
                        blocking_item: Some(dependency.to_id.clone()),
                        p50_delay_days: Some(delta.delta_p50_days),
                        p80_delay_days: Some(delta.delta_p80_days),
                    }),
                    dependency_id: Some(dependency_id.to_string()),
                    ..CommandPayload::default()
                },
            );
            risk_command.priority = Some(Priority::High);
            commands.push(risk_command);
        }

        let owner_target = dependency
            .owner
            .clone()
            .unwrap_or_else(|| dependency_id.to_string());
        commands.push(builder.build(
            CommandType::SetNextDate,
            owner_target,
            format!(
                "follow up on blocked dependency '{}' within {} days",
                dependency_id, OWNER_FOLLOW_UP_DAYS
            ),
            CommandPayload {
                dependency_id: Some(dependency_id.to_string()),
                next_date: Some(event.timestamp + Duration::days(OWNER_FOLLOW_UP_DAYS)),
                ..CommandPayload::default()
            },
        ));

        Ok(commands)
    }
}
