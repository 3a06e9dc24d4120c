use crate::event::Event;
use crate::snapshot::{AcceptanceBoundary, IssueType, Priority, RiskImpact, RiskStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The five command families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandFamily {
    Issue,
    Risk,
    Decision,
    Forecast,
    Control,
}

/// Every instruction a rule can emit. Execution is external; the core only
/// describes what should change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandType {
    CreateIssue,
    UpdateIssue,
    ResolveIssue,
    EscalateIssue,
    CreateRisk,
    UpdateRisk,
    SetRiskStatus,
    LinkRiskToMilestone,
    LinkDecisionToRisk,
    MarkDecisionEffective,
    UpdateForecast,
    RecomputeForecast,
    SetNextDate,
    AssignOwner,
    EmitExplanation,
}

impl CommandType {
    pub fn family(&self) -> CommandFamily {
        use CommandType::*;
        match self {
            CreateIssue | UpdateIssue | ResolveIssue | EscalateIssue => CommandFamily::Issue,
            CreateRisk | UpdateRisk | SetRiskStatus | LinkRiskToMilestone => CommandFamily::Risk,
            LinkDecisionToRisk | MarkDecisionEffective => CommandFamily::Decision,
            UpdateForecast | RecomputeForecast => CommandFamily::Forecast,
            SetNextDate | AssignOwner | EmitExplanation => CommandFamily::Control,
        }
    }
}

/// Escalation posture written onto an accepted risk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationMode {
    Active,
    QuietMonitoring,
}

/// Structured command payload. Only the fields relevant to the command's
/// type are set; everything else stays `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CommandPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue_type: Option<IssueType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk_status: Option<RiskStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub impact: Option<RiskImpact>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dependency_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub work_item_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub milestone_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accepted_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accepted_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acceptance_boundary: Option<AcceptanceBoundary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub escalation_mode: Option<EscalationMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mitigation_started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mitigation_action: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mitigation_due_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suppress_escalation_until: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trigger: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution_note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

/// An instruction emitted by a rule. The id is deterministic so executors
/// can be idempotent on replays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    pub command_id: String,
    pub command_type: CommandType,
    pub target_object_id: String,
    /// Human-readable justification; never empty.
    pub reason: String,
    pub rule_name: String,
    /// Equal to the triggering event's timestamp.
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub payload: CommandPayload,
}

/// Builds a rule's commands with deterministic ids
/// (`"<event_id>:<rule_name>:<ordinal>"`) and the event's timestamp.
pub struct CommandBuilder {
    event_id: String,
    rule_name: &'static str,
    timestamp: DateTime<Utc>,
    ordinal: usize,
}

impl CommandBuilder {
    pub fn new(event: &Event, rule_name: &'static str) -> Self {
        CommandBuilder {
            event_id: event.id.clone(),
            rule_name,
            timestamp: event.timestamp,
            ordinal: 0,
        }
    }

    pub fn build(
        &mut self,
        command_type: CommandType,
        target_object_id: impl Into<String>,
        reason: impl Into<String>,
        payload: CommandPayload,
    ) -> Command {
        let command_id = format!("{}:{}:{}", self.event_id, self.rule_name, self.ordinal);
        self.ordinal += 1;
        Command {
            command_id,
            command_type,
            target_object_id: target_object_id.into(),
            reason: reason.into(),
            rule_name: self.rule_name.to_string(),
            timestamp: self.timestamp,
            priority: None,
            payload,
        }
    }
}
