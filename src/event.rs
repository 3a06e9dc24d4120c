use crate::snapshot::WorkItemStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The six event families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventFamily {
    Dependency,
    Issue,
    Risk,
    Decision,
    Change,
    Forecast,
}

/// Every discrete event the rule engine can process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    DependencyBlocked,
    DependencyUnavailable,
    DependencyDelayed,
    DependencyResolved,
    IssueCreated,
    IssueUpdated,
    IssueResolved,
    IssueEscalated,
    RiskIdentified,
    RiskMaterialised,
    RiskBoundaryBreached,
    RiskClosed,
    DecisionProposed,
    DecisionApproved,
    DecisionRejected,
    DecisionSuperseded,
    ScopeChanged,
    WorkItemStatusChanged,
    ForecastRequested,
}

impl EventType {
    pub fn family(&self) -> EventFamily {
        use EventType::*;
        match self {
            DependencyBlocked | DependencyUnavailable | DependencyDelayed
            | DependencyResolved => EventFamily::Dependency,
            IssueCreated | IssueUpdated | IssueResolved | IssueEscalated => EventFamily::Issue,
            RiskIdentified | RiskMaterialised | RiskBoundaryBreached | RiskClosed => {
                EventFamily::Risk
            }
            DecisionProposed | DecisionApproved | DecisionRejected | DecisionSuperseded => {
                EventFamily::Decision
            }
            ScopeChanged | WorkItemStatusChanged => EventFamily::Change,
            ForecastRequested => EventFamily::Forecast,
        }
    }
}

/// Sparse payload: only the ids relevant to the event's type are set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct EventPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dependency_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub work_item_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub milestone_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor_id: Option<String>,
    /// Status before a work-item transition
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_status: Option<WorkItemStatus>,
    /// Status after a work-item transition
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_status: Option<WorkItemStatus>,
}

/// An immutable event consumed by the rule engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub event_type: EventType,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub payload: EventPayload,
}

impl Event {
    pub fn new(id: impl Into<String>, event_type: EventType, timestamp: DateTime<Utc>) -> Self {
        Event {
            id: id.into(),
            event_type,
            timestamp,
            payload: EventPayload::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_every_family_is_covered() {
        let all = [
            EventType::DependencyBlocked,
            EventType::DependencyUnavailable,
            EventType::DependencyDelayed,
            EventType::DependencyResolved,
            EventType::IssueCreated,
            EventType::IssueUpdated,
            EventType::IssueResolved,
            EventType::IssueEscalated,
            EventType::RiskIdentified,
            EventType::RiskMaterialised,
            EventType::RiskBoundaryBreached,
            EventType::RiskClosed,
            EventType::DecisionProposed,
            EventType::DecisionApproved,
            EventType::DecisionRejected,
            EventType::DecisionSuperseded,
            EventType::ScopeChanged,
            EventType::WorkItemStatusChanged,
            EventType::ForecastRequested,
        ];
        assert_eq!(all.len(), 19);

        let dependency = all
            .iter()
            .filter(|t| t.family() == EventFamily::Dependency)
            .count();
        let change = all
            .iter()
            .filter(|t| t.family() == EventFamily::Change)
            .count();
        assert_eq!(dependency, 4);
        assert_eq!(change, 2);
    }

    #[test]
    fn test_event_json_round_trip_keeps_sparse_payload() {
        let mut event = Event::new(
            "evt_1",
            EventType::DependencyBlocked,
            Utc.with_ymd_and_hms(2026, 1, 3, 9, 0, 0).unwrap(),
        );
        event.payload.dependency_id = Some("dep_001".into());

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""event_type":"dependency_blocked""#));
        assert!(!json.contains("work_item_id"));

        let back: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }
}
