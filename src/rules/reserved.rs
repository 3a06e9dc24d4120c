use crate::command::Command;
use crate::error::CoreError;
use crate::event::{Event, EventType};
use crate::rules::Rule;
use crate::snapshot::StateSnapshot;

/// A declared-but-empty rule: it matches its event type and emits nothing.
///
/// Reserved slots keep the registry order stable while the behaviours behind
/// them are still being specified; matching with zero commands is an explicit
/// outcome, not a silent skip.
pub struct ReservedRule {
    name: &'static str,
    event_type: EventType,
}

impl ReservedRule {
    pub fn new(name: &'static str, event_type: EventType) -> Self {
        ReservedRule { name, event_type }
    }
}

impl Rule for ReservedRule {
    fn name(&self) -> &'static str {
        self.name
    }

    fn event_types(&self) -> &[EventType] {
        std::slice::from_ref(&self.event_type)
    }

    fn matches(&self, event: &Event, _snapshot: &StateSnapshot) -> bool {
        event.event_type == self.event_type
    }

    fn execute(
        &self,
        _event: &Event,
        _snapshot: &StateSnapshot,
    ) -> Result<Vec<Command>, CoreError> {
        Ok(vec![])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_reserved_rule_matches_its_event_and_emits_nothing() {
        let rule = ReservedRule::new("scope_changed", EventType::ScopeChanged);
        let snap = StateSnapshot::new();
        let event = Event::new(
            "evt_1",
            EventType::ScopeChanged,
            Utc.with_ymd_and_hms(2026, 1, 3, 0, 0, 0).unwrap(),
        );
        assert!(rule.matches(&event, &snap));
        assert!(rule.execute(&event, &snap).unwrap().is_empty());

        let other = Event::new(
            "evt_2",
            EventType::IssueCreated,
            Utc.with_ymd_and_hms(2026, 1, 3, 0, 0, 0).unwrap(),
        );
        assert!(!rule.matches(&other, &snap));
    }
}
