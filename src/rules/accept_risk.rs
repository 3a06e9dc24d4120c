use crate::command::{Command, CommandBuilder, CommandPayload, CommandType, EscalationMode};
use crate::error::CoreError;
use crate::event::{Event, EventType};
use crate::rules::Rule;
use crate::snapshot::{Decision, DecisionType, RiskStatus, StateSnapshot};
use chrono::{DateTime, Duration, Utc};

/// Review window when the acceptance boundary is further out than a week,
/// or carries no date at all.
const REVIEW_WINDOW_DAYS: i64 = 7;

/// Rule 4: an approved accept-risk decision moves the risk into quiet
/// monitoring until its acceptance boundary, with a near-term review date.
pub struct AcceptRiskApprovedRule;

const MATCHED_EVENTS: &[EventType] = &[EventType::DecisionApproved];

fn approved_decision<'a>(event: &Event, snapshot: &'a StateSnapshot) -> Option<&'a Decision> {
    event
        .payload
        .decision_id
        .as_deref()
        .and_then(|id| snapshot.decision(id))
}

impl Rule for AcceptRiskApprovedRule {
    fn name(&self) -> &'static str {
        "accept_risk_approved"
    }

    fn event_types(&self) -> &[EventType] {
        MATCHED_EVENTS
    }

    fn matches(&self, event: &Event, snapshot: &StateSnapshot) -> bool {
        event.event_type == EventType::DecisionApproved
            && approved_decision(event, snapshot)
                .map(|d| d.decision_type == DecisionType::AcceptRisk)
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
        // matches() already resolved the decision; a vanished one is a no-op.
        let Some(decision) = snapshot.decision(decision_id) else {
            return Ok(vec![]);
        };
        let risk_id = decision
            .risk_id
            .as_deref()
            .or(event.payload.risk_id.as_deref())
            .ok_or_else(|| {
                CoreError::InvalidInput(format!(
                    "accept_risk decision '{}' names no risk",
                    decision_id
                ))
            })?;

        let mut builder = CommandBuilder::new(event, self.name());

        if snapshot.risk(risk_id).is_none() {
            return Ok(vec![builder.build(
                CommandType::EmitExplanation,
                risk_id,
                format!("risk '{}' is not in the snapshot", risk_id),
                CommandPayload {
                    explanation: Some(format!(
                        "No action taken: accept_risk decision '{}' targets unknown risk '{}'",
                        decision_id, risk_id
                    )),
                    ..CommandPayload::default()
                },
            )]);
        }

        let boundary = decision.acceptance_boundary.clone();
        let boundary_date: Option<DateTime<Utc>> = boundary.as_ref().and_then(|b| b.date);

        let mut commands = Vec::new();
        commands.push(builder.build(
            CommandType::UpdateRisk,
            risk_id,
            format!("decision '{}' accepted this risk", decision_id),
            CommandPayload {
                risk_status: Some(RiskStatus::Accepted),
                accepted_at: Some(event.timestamp),
                accepted_by: event.payload.actor_id.clone(),
                acceptance_boundary: boundary,
                escalation_mode: Some(EscalationMode::QuietMonitoring),
                ..CommandPayload::default()
            },
        ));

        let review_window = event.timestamp + Duration::days(REVIEW_WINDOW_DAYS);
        let next_review = match boundary_date {
            Some(date) => date.min(review_window),
            None => review_window,
        };
        commands.push(builder.build(
            CommandType::SetNextDate,
            risk_id,
            format!("review accepted risk '{}'", risk_id),
            CommandPayload {
                next_date: Some(next_review),
                suppress_escalation_until: boundary_date,
                risk_id: Some(risk_id.to_string()),
                ..CommandPayload::default()
            },
        ));

        Ok(commands)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::{AcceptanceBoundary, BoundaryKind, DecisionStatus, Risk, RiskImpact};
    use chrono::TimeZone;

    fn make_event(decision_id: &str) -> Event {
        let mut event = Event::new(
            "evt_accept",
            EventType::DecisionApproved,
            Utc.with_ymd_and_hms(2026, 1, 3, 0, 0, 0).unwrap(),
        );
        event.payload.decision_id = Some(decision_id.to_string());
        event.payload.actor_id = Some("actor_1".into());
        event
    }

    fn snapshot_with_decision(boundary_date: Option<DateTime<Utc>>) -> StateSnapshot {
        let mut snap = StateSnapshot::new();
        snap.add_decision(Decision {
            id: "d_accept".into(),
            decision_type: DecisionType::AcceptRisk,
            status: DecisionStatus::Approved,
            description: None,
            effort_delta_days: None,
            risk_id: Some("r1".into()),
            milestone_id: None,
            acceptance_boundary: Some(AcceptanceBoundary {
                kind: BoundaryKind::Date,
                date: boundary_date,
                threshold_days: None,
                trigger_event: None,
            }),
            mitigation_action: None,
            mitigation_due_date: None,
            decided_at: None,
        });
        snap.add_risk(Risk {
            id: "r1".into(),
            title: "Vendor slips".into(),
            status: RiskStatus::Open,
            probability: 0.5,
            impact: RiskImpact::default(),
            milestone_id: None,
            affected_items: vec![],
            accepted_at: None,
            accepted_by: None,
            acceptance_boundary: None,
            next_review_date: None,
            suppress_escalation_until: None,
            mitigation_started_at: None,
            mitigation_action: None,
            mitigation_due_date: None,
            resolution_note: None,
        });
        snap
    }

    #[test]
    fn test_matches_only_accept_risk_decisions() {
        let rule = AcceptRiskApprovedRule;
        let snap = snapshot_with_decision(None);
        assert!(rule.matches(&make_event("d_accept"), &snap));
        assert!(!rule.matches(&make_event("d_unknown"), &snap));

        let mut other = snap.clone();
        if let Some(d) = other.decisions.get_mut("d_accept") {
            d.decision_type = DecisionType::MitigateRisk;
        }
        assert!(!rule.matches(&make_event("d_accept"), &other));
    }

    #[test]
    fn test_accepts_risk_and_caps_review_at_one_week() {
        // Boundary is a month out; review lands at timestamp + 7d.
        let boundary = Utc.with_ymd_and_hms(2026, 2, 3, 0, 0, 0).unwrap();
        let snap = snapshot_with_decision(Some(boundary));
        let rule = AcceptRiskApprovedRule;

        let commands = rule.execute(&make_event("d_accept"), &snap).unwrap();
        assert_eq!(commands.len(), 2);

        let update = &commands[0];
        assert_eq!(update.command_type, CommandType::UpdateRisk);
        assert_eq!(update.payload.risk_status, Some(RiskStatus::Accepted));
        assert_eq!(
            update.payload.accepted_at,
            Some(Utc.with_ymd_and_hms(2026, 1, 3, 0, 0, 0).unwrap())
        );
        assert_eq!(update.payload.accepted_by.as_deref(), Some("actor_1"));
        assert_eq!(
            update.payload.escalation_mode,
            Some(EscalationMode::QuietMonitoring)
        );

        let next = &commands[1];
        assert_eq!(next.command_type, CommandType::SetNextDate);
        assert_eq!(
            next.payload.next_date,
            Some(Utc.with_ymd_and_hms(2026, 1, 10, 0, 0, 0).unwrap())
        );
        assert_eq!(next.payload.suppress_escalation_until, Some(boundary));
    }

    #[test]
    fn test_near_boundary_wins_over_review_window() {
        let boundary = Utc.with_ymd_and_hms(2026, 1, 6, 0, 0, 0).unwrap();
        let snap = snapshot_with_decision(Some(boundary));
        let rule = AcceptRiskApprovedRule;

        let commands = rule.execute(&make_event("d_accept"), &snap).unwrap();
        assert_eq!(commands[1].payload.next_date, Some(boundary));
    }

    #[test]
    fn test_boundary_without_date_falls_back_to_window() {
        let mut snap = snapshot_with_decision(None);
        if let Some(d) = snap.decisions.get_mut("d_accept") {
            d.acceptance_boundary = Some(AcceptanceBoundary {
                kind: BoundaryKind::Threshold,
                date: None,
                threshold_days: Some(10.0),
                trigger_event: None,
            });
        }
        let rule = AcceptRiskApprovedRule;
        let commands = rule.execute(&make_event("d_accept"), &snap).unwrap();
        assert_eq!(
            commands[1].payload.next_date,
            Some(Utc.with_ymd_and_hms(2026, 1, 10, 0, 0, 0).unwrap())
        );
        assert_eq!(commands[1].payload.suppress_escalation_until, None);
    }

    #[test]
    fn test_unknown_risk_is_an_explained_no_op() {
        let mut snap = snapshot_with_decision(None);
        snap.risks.clear();
        let rule = AcceptRiskApprovedRule;
        let commands = rule.execute(&make_event("d_accept"), &snap).unwrap();
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].command_type, CommandType::EmitExplanation);
    }
}
