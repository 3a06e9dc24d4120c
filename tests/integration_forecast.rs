//! Integration tests for the forecast engine: the concrete portfolio
//! scenarios, the determinism and purity laws, and the boundary behaviours
//! that only show up with a fully-populated snapshot.

use chrono::{DateTime, TimeZone, Utc};
use slipcast::forecast::{
    ForecastOptions, ScenarioSpec, forecast, forecast_mitigation_impact, forecast_with_scenario,
};
use slipcast::snapshot::{
    AcceptanceBoundary, BoundaryKind, Decision, DecisionStatus, DecisionType, Milestone,
    MilestoneStatus, Risk, RiskImpact, RiskStatus, StateSnapshot, WorkItem, WorkItemStatus,
};

fn as_of() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 3, 0, 0, 0).unwrap()
}

fn target_date() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 2, 3, 0, 0, 0).unwrap()
}

fn make_item(id: &str, title: &str) -> WorkItem {
    WorkItem {
        id: id.to_string(),
        title: title.to_string(),
        estimated_days: None,
        actual_days: None,
        remaining_days: None,
        completion_percentage: None,
        status: WorkItemStatus::InProgress,
        milestone_id: None,
        external_team_id: None,
        expected_completion_date: None,
        confidence_level: None,
        depends_on: vec![],
    }
}

fn make_risk(id: &str, milestone: &str, status: RiskStatus, probability: f64, impact: f64) -> Risk {
    Risk {
        id: id.to_string(),
        title: format!("Risk {}", id),
        status,
        probability,
        impact: RiskImpact {
            impact_days: impact,
            ..RiskImpact::default()
        },
        milestone_id: Some(milestone.to_string()),
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
    }
}

/// The S1 snapshot: three 2d-remaining items, a materialised risk (3d), an
/// open risk (p=0.4, 5d), and one approved scope change (+3d effort).
fn baseline_snapshot() -> StateSnapshot {
    let mut snap = StateSnapshot::new();
    snap.add_milestone(Milestone {
        id: "m_launch".into(),
        name: "Launch".into(),
        target_date: target_date(),
        work_items: vec!["wi_1".into(), "wi_2".into(), "wi_3".into()],
        status: MilestoneStatus::Pending,
    });
    for id in ["wi_1", "wi_2", "wi_3"] {
        let mut item = make_item(id, id);
        item.remaining_days = Some(2.0);
        snap.add_work_item(item);
    }
    snap.add_risk(make_risk(
        "r_materialised",
        "m_launch",
        RiskStatus::Materialised,
        1.0,
        3.0,
    ));
    snap.add_risk(make_risk("r_open", "m_launch", RiskStatus::Open, 0.4, 5.0));
    snap.add_decision(Decision {
        id: "d_scope".into(),
        decision_type: DecisionType::ChangeScope,
        status: DecisionStatus::Approved,
        description: Some("Add export endpoint".into()),
        effort_delta_days: Some(3.0),
        risk_id: None,
        milestone_id: Some("m_launch".into()),
        acceptance_boundary: None,
        mitigation_action: None,
        mitigation_due_date: None,
        decided_at: Some(as_of()),
    });
    snap.reconcile();
    snap
}

// ===========================================================================
// S1 - Baseline forecast with materialised risk
// ===========================================================================

#[test]
fn test_s1_baseline_forecast_with_materialised_risk() {
    let snap = baseline_snapshot();
    let result = forecast("m_launch", &snap, &ForecastOptions::baseline(as_of())).unwrap();

    // dep 2 + risk (3 + 0.4*5*0.5) + scope 2.4 = 8.4 -> 8d P50
    assert_eq!(result.delta_p50_days, 8);
    assert_eq!(
        result.p50_date,
        Utc.with_ymd_and_hms(2026, 2, 11, 0, 0, 0).unwrap()
    );
    // uncertainty 3 + 2*1 open risk = 5 -> 13.4 -> 13d P80
    assert_eq!(result.delta_p80_days, 13);
    assert_eq!(
        result.p80_date,
        Utc.with_ymd_and_hms(2026, 2, 16, 0, 0, 0).unwrap()
    );
}

#[test]
fn test_s1_breakdown_sums_to_p80_slip_and_is_sorted() {
    let snap = baseline_snapshot();
    let result = forecast("m_launch", &snap, &ForecastOptions::baseline(as_of())).unwrap();

    let sum: f64 = result.contribution_breakdown.iter().map(|c| c.days).sum();
    assert!((sum - 13.4).abs() < 1e-9);
    assert!((sum - result.delta_p80_days as f64).abs() <= 0.5);

    let causes: Vec<&str> = result
        .contribution_breakdown
        .iter()
        .map(|c| c.cause.as_str())
        .collect();
    assert_eq!(
        causes,
        vec![
            "Uncertainty buffer (P80)",
            "Materialised risk: Risk r_materialised",
            "Recent scope change: Add export endpoint",
            "Dependency: wi_1 (2d remaining)",
            "Open risk: Risk r_open (probability-weighted)",
        ]
    );
}

#[test]
fn test_s1_p80_never_precedes_p50() {
    let snap = baseline_snapshot();
    let result = forecast("m_launch", &snap, &ForecastOptions::baseline(as_of())).unwrap();
    assert!(result.p80_date >= result.p50_date);
}

// ===========================================================================
// S2 - Dependency-delay scenario
// ===========================================================================

/// S1 plus an upstream chain: A feeds wi_1, one of the already-delayed
/// tracked items, so a perturbation of A ripples down the critical path.
fn scenario_snapshot() -> StateSnapshot {
    let mut snap = baseline_snapshot();
    let mut a = make_item("wi_a", "A");
    a.status = WorkItemStatus::NotStarted;
    snap.add_work_item(a);
    if let Some(item) = snap.work_items.get_mut("wi_1") {
        item.depends_on = vec!["wi_a".into()];
    }
    snap.reconcile();
    snap
}

#[test]
fn test_s2_dependency_delay_scenario_ripples_through_the_chain() {
    let snap = scenario_snapshot();
    let comparison = forecast_with_scenario(
        "m_launch",
        &snap,
        ScenarioSpec::DependencyDelay {
            work_item_id: "wi_a".into(),
            delay_days: 5.0,
        },
        as_of(),
    )
    .unwrap();

    // Baseline: A has no delay of its own, so wi_1 stays at 2d.
    assert_eq!(comparison.baseline.delta_p80_days, 13);
    // Perturbed: propagated(wi_1) = 2 + 5 = 7, lifting the P80 slip by 5.
    assert_eq!(comparison.scenario.delta_p80_days, 18);

    let scenario_entry = comparison
        .scenario
        .contribution_breakdown
        .iter()
        .find(|c| c.cause == "Scenario: A delayed by 5d")
        .expect("scenario contribution present");
    assert!((scenario_entry.days - 5.0).abs() < 1e-9);
    // Near the top of the sorted breakdown, tied with the uncertainty buffer.
    assert_eq!(
        comparison.scenario.contribution_breakdown[0].cause,
        "Scenario: A delayed by 5d"
    );
}

#[test]
fn test_scenario_on_a_dominated_branch_moves_nothing() {
    // The critical path is a max, not a sum: a perturbed chain that stays
    // below the dominant item leaves the milestone untouched.
    let mut snap = scenario_snapshot();
    if let Some(item) = snap.work_items.get_mut("wi_2") {
        item.remaining_days = Some(10.0);
    }
    let comparison = forecast_with_scenario(
        "m_launch",
        &snap,
        ScenarioSpec::DependencyDelay {
            work_item_id: "wi_a".into(),
            delay_days: 5.0,
        },
        as_of(),
    )
    .unwrap();
    // propagated(wi_1) rises to 7 but wi_2's 10d still dominates.
    assert_eq!(comparison.baseline, comparison.scenario);
    assert!(
        comparison
            .scenario
            .contribution_breakdown
            .iter()
            .all(|c| !c.cause.starts_with("Scenario:"))
    );
}

#[test]
fn test_zero_delay_scenario_is_a_no_op() {
    let snap = scenario_snapshot();
    let comparison = forecast_with_scenario(
        "m_launch",
        &snap,
        ScenarioSpec::DependencyDelay {
            work_item_id: "wi_a".into(),
            delay_days: 0.0,
        },
        as_of(),
    )
    .unwrap();
    assert_eq!(comparison.baseline, comparison.scenario);
}

// ===========================================================================
// S5 - Mitigation preview
// ===========================================================================

#[test]
fn test_s5_mitigation_preview_improvement() {
    let mut snap = StateSnapshot::new();
    snap.add_milestone(Milestone {
        id: "m1".into(),
        name: "M1".into(),
        target_date: target_date(),
        work_items: vec![],
        status: MilestoneStatus::Pending,
    });
    snap.add_risk(make_risk("r_big", "m1", RiskStatus::Materialised, 1.0, 6.0));

    let preview = forecast_mitigation_impact("m1", &snap, "r_big", 4.0, as_of()).unwrap();
    assert_eq!(
        preview.current.delta_p80_days - preview.with_mitigation.delta_p80_days,
        4
    );
    assert_eq!(preview.improvement_days_p80, 4);
    // The snapshot's own risk is untouched.
    assert_eq!(snap.risk("r_big").unwrap().impact.impact_days, 6.0);
}

#[test]
fn test_mitigation_floors_impact_at_zero() {
    let mut snap = StateSnapshot::new();
    snap.add_milestone(Milestone {
        id: "m1".into(),
        name: "M1".into(),
        target_date: target_date(),
        work_items: vec![],
        status: MilestoneStatus::Pending,
    });
    snap.add_risk(make_risk("r_small", "m1", RiskStatus::Materialised, 1.0, 2.0));

    let preview = forecast_mitigation_impact("m1", &snap, "r_small", 10.0, as_of()).unwrap();
    // 2d of impact cannot improve by more than 2d.
    assert_eq!(preview.improvement_days_p80, 2);
}

// ===========================================================================
// Laws: determinism, purity, acceptance round-trip
// ===========================================================================

#[test]
fn test_forecast_is_deterministic_and_does_not_mutate() {
    let snap = baseline_snapshot();
    let options = ForecastOptions::baseline(as_of());

    let first = forecast("m_launch", &snap, &options).unwrap();
    let second = forecast("m_launch", &snap, &options).unwrap();
    assert_eq!(first, second);

    let first_json = serde_json::to_string(&first).unwrap();
    let second_json = serde_json::to_string(&second).unwrap();
    assert_eq!(first_json, second_json);
}

#[test]
fn test_breached_acceptance_equals_never_accepted() {
    let open_snapshot = {
        let mut snap = StateSnapshot::new();
        snap.add_milestone(Milestone {
            id: "m1".into(),
            name: "M1".into(),
            target_date: target_date(),
            work_items: vec![],
            status: MilestoneStatus::Pending,
        });
        snap.add_risk(make_risk("r1", "m1", RiskStatus::Open, 0.6, 8.0));
        snap
    };
    let breached_snapshot = {
        let mut snap = StateSnapshot::new();
        snap.add_milestone(Milestone {
            id: "m1".into(),
            name: "M1".into(),
            target_date: target_date(),
            work_items: vec![],
            status: MilestoneStatus::Pending,
        });
        let mut risk = make_risk("r1", "m1", RiskStatus::Accepted, 0.6, 8.0);
        risk.acceptance_boundary = Some(AcceptanceBoundary {
            kind: BoundaryKind::Date,
            date: Some(Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()),
            threshold_days: None,
            trigger_event: None,
        });
        snap.add_risk(risk);
        snap
    };

    let open = forecast("m1", &open_snapshot, &ForecastOptions::baseline(as_of())).unwrap();
    let breached = forecast("m1", &breached_snapshot, &ForecastOptions::baseline(as_of())).unwrap();
    assert_eq!(open.delta_p50_days, breached.delta_p50_days);
    assert_eq!(open.delta_p80_days, breached.delta_p80_days);
}

// ===========================================================================
// Boundary behaviours
// ===========================================================================

#[test]
fn test_milestone_with_no_items_gets_base_buffer_only() {
    let mut snap = StateSnapshot::new();
    snap.add_milestone(Milestone {
        id: "m_empty".into(),
        name: "Empty".into(),
        target_date: target_date(),
        work_items: vec![],
        status: MilestoneStatus::Pending,
    });

    let result = forecast("m_empty", &snap, &ForecastOptions::baseline(as_of())).unwrap();
    assert_eq!(result.delta_p50_days, 0);
    assert_eq!(result.delta_p80_days, 3);
    assert_eq!(result.p50_date, target_date());
    assert_eq!(result.contribution_breakdown.len(), 1);
}

#[test]
fn test_all_completed_items_leave_risk_and_scope_contributions() {
    let mut snap = baseline_snapshot();
    for id in ["wi_1", "wi_2", "wi_3"] {
        if let Some(item) = snap.work_items.get_mut(id) {
            item.status = WorkItemStatus::Completed;
        }
    }

    let result = forecast("m_launch", &snap, &ForecastOptions::baseline(as_of())).unwrap();
    // dep 0, risk 4.0, scope 2.4 -> 6.4 -> 6d; uncertainty 5 -> 11.4 -> 11d
    assert_eq!(result.delta_p50_days, 6);
    assert_eq!(result.delta_p80_days, 11);
    assert!(
        result
            .contribution_breakdown
            .iter()
            .all(|c| !c.cause.starts_with("Dependency:"))
    );
}

#[test]
fn test_scope_scenario_and_capacity_scenario() {
    let snap = baseline_snapshot();

    let scope = forecast(
        "m_launch",
        &snap,
        &ForecastOptions::scenario(as_of(), ScenarioSpec::ScopeChange { effort_delta_days: 5.0 }),
    )
    .unwrap();
    // 8.4 + 0.8*5 = 12.4 -> 12
    assert_eq!(scope.delta_p50_days, 12);

    let capacity = forecast(
        "m_launch",
        &snap,
        &ForecastOptions::scenario(as_of(), ScenarioSpec::CapacityChange { multiplier: 0.5 }),
    )
    .unwrap();
    // halved capacity doubles the 8.4d slip -> 16.8 -> 17
    assert_eq!(capacity.delta_p50_days, 17);
}

#[test]
fn test_cyclic_graph_fails_with_invalid_graph() {
    let mut snap = baseline_snapshot();
    if let Some(item) = snap.work_items.get_mut("wi_1") {
        item.depends_on = vec!["wi_2".into()];
    }
    if let Some(item) = snap.work_items.get_mut("wi_2") {
        item.depends_on = vec!["wi_1".into()];
    }

    let err = forecast("m_launch", &snap, &ForecastOptions::baseline(as_of())).unwrap_err();
    assert!(matches!(err, slipcast::CoreError::InvalidGraph { .. }));
}
