use crate::command::{Command, CommandBuilder, CommandPayload, CommandType};
use crate::error::CoreError;
use crate::event::{Event, EventType};
use crate::rules::Rule;
use crate::snapshot::{Decision, DecisionType, RiskStatus, StateSnapshot};
use chrono::Duration;

/// Fallback follow-up window when the mitigation carries no due date.
const FOLLOW_UP_DAYS: i64 = 7;

/// Rule 5: an approved mitigate-risk decision moves the risk into
/// `mitigating`, schedules follow-up at the mitigation due date, and asks
/// downstream consumers to recompute the forecast when mitigation completes.
pub struct MitigateRiskApprovedRule;

const MATCHED_EVENTS: &[EventType] = &[EventType::DecisionApproved];

fn approved_decision<'a>(event: &Event, snapshot: &'a StateSnapshot) -> Option<&'a Decision> {
    event
        .payload
        .decision_id
        .as_deref()
        .and_then(|id| snapshot.decision(id))
}

impl Rule for MitigateRiskApprovedRule {
    fn name(&self) -> &'static str {
        "mitigate_risk_approved"
    }

    fn event_types(&self) -> &[EventType] {
        MATCHED_EVENTS
    }

    fn matches(&self, event: &Event, snapshot: &StateSnapshot) -> bool {
        event.event_type == EventType::DecisionApproved
            && approved_decision(event, snapshot)
                .map(|d| d.decision_type == DecisionType::MitigateRisk)
                .unwrap_or(false)
    }

    fn execute(
        &self,
        event: &Event,
        snapshot: &StateSnapshot,
    ) -> Result<Vec<Command>, CoreError> {
        let decision_id = event.payload.decision_id.as_deref().ok_or_else(|| {
            CoreError::InvalidInput(format!(
                "decision_approved event {} carries no decision_id",
                event.id
            ))
        })?;
        let Some(decision) = snapshot.decision(decision_id) else {
            return Ok(vec![]);
        };
        let risk_id = decision
            .risk_id
            .as_deref()
            .or(event.payload.risk_id.as_deref())
            .ok_or_else(|| {
                CoreError::InvalidInput(format!(
                    "mitigate_risk decision '{}' names no risk",
                    decision_id
                ))
            })?;

        let mut builder = CommandBuilder::new(event, self.name());

        let Some(risk) = snapshot.risk(risk_id) else {
            return Ok(vec![builder.build(
                CommandType::EmitExplanation,
                risk_id,
                format!("risk '{}' is not in the snapshot", risk_id),
                CommandPayload {
                    explanation: Some(format!(
                        "No action taken: mitigate_risk decision '{}' targets unknown risk '{}'",
                        decision_id, risk_id
                    )),
                    ..CommandPayload::default()
                },
            )]);
        };

        let due_date = decision.mitigation_due_date;
        let mut commands = Vec::new();
        commands.push(builder.build(
            CommandType::UpdateRisk,
            risk_id,
            format!("decision '{}' started mitigation", decision_id),
            CommandPayload {
                risk_status: Some(RiskStatus::Mitigating),
                mitigation_started_at: Some(event.timestamp),
                mitigation_action: decision.mitigation_action.clone(),
                mitigation_due_date: due_date,
                ..CommandPayload::default()
            },
        ));

        commands.push(builder.build(
            CommandType::SetNextDate,
            risk_id,
            format!("check mitigation progress on risk '{}'", risk_id),
            CommandPayload {
                next_date: Some(
                    due_date.unwrap_or(event.timestamp + Duration::days(FOLLOW_UP_DAYS)),
                ),
                risk_id: Some(risk_id.to_string()),
                ..CommandPayload::default()
            },
        ));

        let forecast_target = risk
            .milestone_id
            .clone()
            .unwrap_or_else(|| risk_id.to_string());
        commands.push(builder.build(
            CommandType::UpdateForecast,
            forecast_target,
            format!("mitigation of risk '{}' changes the outlook", risk_id),
            CommandPayload {
                trigger: Some("mitigation_completion".to_string()),
                risk_id: Some(risk_id.to_string()),
                ..CommandPayload::default()
            },
        ));

        Ok(commands)
    }
}
