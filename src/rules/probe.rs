use crate::forecast::Confidence;
use crate::snapshot::StateSnapshot;
use serde::Serialize;

/// Slip deltas a blocked dependency is expected to cause.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastDelta {
    pub delta_p50_days: f64,
    pub delta_p80_days: f64,
    pub confidence_level: Confidence,
    /// How the numbers were produced, e.g. `heuristic_stub`.
    pub method: &'static str,
}

/// The forecast invocation Rule 1 depends on.
///
/// The trait is the contract; the numbers are not. Swapping the stub for a
/// real forecast keeps the signature and may change every delta.
pub trait ForecastProbe: Send + Sync {
    fn dependency_impact(&self, dependency_id: &str, snapshot: &StateSnapshot) -> ForecastDelta;
}

/// v1 probe: fixed deltas, low confidence.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicStubProbe;

impl ForecastProbe for HeuristicStubProbe {
    fn dependency_impact(&self, _dependency_id: &str, _snapshot: &StateSnapshot) -> ForecastDelta {
        ForecastDelta {
            delta_p50_days: 7.0,
            delta_p80_days: 14.0,
            confidence_level: Confidence::Low,
            method: "heuristic_stub",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stub_is_deterministic() {
        let snap = StateSnapshot::new();
        let probe = HeuristicStubProbe;
        let a = probe.dependency_impact("dep_001", &snap);
        let b = probe.dependency_impact("dep_001", &snap);
        assert_eq!(a, b);
        assert_eq!(a.delta_p50_days, 7.0);
        assert_eq!(a.delta_p80_days, 14.0);
        assert_eq!(a.method, "heuristic_stub");
    }
}
