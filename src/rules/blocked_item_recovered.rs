use crate::command::{Command, CommandBuilder, CommandPayload, CommandType};
use crate::error::CoreError;
use crate::event::{Event, EventType};
use crate::rules::Rule;
use crate::snapshot::{Risk, RiskStatus, StateSnapshot, WorkItemStatus};

/// Auto-resolution: when a work item leaves `blocked`, every non-closed risk
/// that exists because of the block is closed.
///
/// Risks are matched by three keys, in order: the deterministic id
/// `risk_from_blocked_<item>`, the risk's `impact.blocked_item`, and
/// membership in `affected_items`. All three are scanned for compatibility
/// with older documents that only populate one of them.
pub struct BlockedItemRecoveredRule;

const MATCHED_EVENTS: &[EventType] = &[EventType::WorkItemStatusChanged];

fn risk_matches_item(risk: &Risk, item_id: &str) -> bool {
    risk.id == format!("risk_from_blocked_{}", item_id)
        || risk.impact.blocked_item.as_deref() == Some(item_id)
        || risk.affected_items.iter().any(|a| a == item_id)
}

impl Rule for BlockedItemRecoveredRule {
    fn name(&self) -> &'static str {
        "blocked_item_recovered"
    }

    fn event_types(&self) -> &[EventType] {
        MATCHED_EVENTS
    }

    fn matches(&self, event: &Event, _snapshot: &StateSnapshot) -> bool {
        event.event_type == EventType::WorkItemStatusChanged
            && event.payload.previous_status == Some(WorkItemStatus::Blocked)
            && event
                .payload
                .new_status
                .map(|s| s != WorkItemStatus::Blocked)
                .unwrap_or(false)
    }

    fn execute(
        &self,
        event: &Event,
        snapshot: &StateSnapshot,
    ) -> Result<Vec<Command>, CoreError> {
        let item_id = event.payload.work_item_id.as_deref().ok_or_else(|| {
            CoreError::InvalidInput(format!(
                "work_item_status_changed event {} carries no work_item_id",
                event.id
            ))
        })?;

        let item_title = snapshot.item_title(item_id).to_string();
        let mut builder = CommandBuilder::new(event, self.name());
        let mut commands = Vec::new();

        for risk in snapshot.risks_sorted() {
            if risk.status.is_terminal() || !risk_matches_item(risk, item_id) {
                continue;
            }
            commands.push(builder.build(
                CommandType::UpdateRisk,
                risk.id.clone(),
                format!("'{}' left blocked; the risk no longer applies", item_id),
                CommandPayload {
                    risk_status: Some(RiskStatus::Closed),
                    resolution_note: Some(format!("{} is no longer blocked", item_title)),
                    work_item_id: Some(item_id.to_string()),
                    ..CommandPayload::default()
                },
            ));
        }

        Ok(commands)
    }
}
