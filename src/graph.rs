use crate::error::CoreError;
use crate::snapshot::StateSnapshot;
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

/// The dependency DAG over work items, built once per snapshot.
///
/// Edges run upstream -> dependent, so the topological order lists every
/// item after the items it depends on. The order is stable: ties are broken
/// lexicographically by id.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    topo: Vec<String>,
    upstream: HashMap<String, Vec<String>>,
    dependents: HashMap<String, Vec<String>>,
}

impl DependencyGraph {
    /// Build the graph from the union of implicit `depends_on` references and
    /// explicit dependency edges. A cycle is a hard construction error naming
    /// the members of the offending strongly connected component.
    pub fn build(snapshot: &StateSnapshot) -> Result<Self, CoreError> {
        let mut ids: BTreeSet<&str> = snapshot.work_items.keys().map(String::as_str).collect();
        // Edge endpoints that are not work items in the snapshot still
        // participate as graph nodes so cycles through them are caught.
        for dep in snapshot.dependencies.values() {
            ids.insert(dep.from_id.as_str());
            ids.insert(dep.to_id.as_str());
        }
        for item in snapshot.work_items.values() {
            for up in &item.depends_on {
                ids.insert(up.as_str());
            }
        }

        // (dependent, upstream) pairs
        let mut edges: BTreeSet<(&str, &str)> = BTreeSet::new();
        for item in snapshot.work_items.values() {
            for up in &item.depends_on {
                edges.insert((item.id.as_str(), up.as_str()));
            }
        }
        for dep in snapshot.dependencies.values() {
            edges.insert((dep.from_id.as_str(), dep.to_id.as_str()));
        }

        let mut upstream: HashMap<String, Vec<String>> = HashMap::new();
        let mut dependents: HashMap<String, Vec<String>> = HashMap::new();
        for id in &ids {
            upstream.insert((*id).to_string(), Vec::new());
            dependents.insert((*id).to_string(), Vec::new());
        }
        for (dependent, up) in &edges {
            if let Some(v) = upstream.get_mut(*dependent) {
                v.push((*up).to_string());
            }
            if let Some(v) = dependents.get_mut(*up) {
                v.push((*dependent).to_string());
            }
        }
        // BTreeSet iteration already sorted the edge lists.

        let topo = stable_topo_order(&ids, &upstream, &dependents)?;
        if topo.len() < ids.len() {
            return Err(CoreError::InvalidGraph {
                cycle: find_cycle_members(&ids, &edges),
            });
        }

        Ok(DependencyGraph {
            topo,
            upstream,
            dependents,
        })
    }

    /// Topological order, dependencies before dependents, ties lexicographic.
    pub fn topo_order(&self) -> &[String] {
        &self.topo
    }

    /// Direct upstream dependencies of a node (what it cannot finish without).
    pub fn upstream(&self, id: &str) -> &[String] {
        self.upstream.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Direct dependents of a node (reverse index).
    pub fn dependents(&self, id: &str) -> &[String] {
        self.dependents.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every node transitively downstream of `id` (excluding `id` itself).
    /// Used to decide which milestones a perturbation of `id` can touch.
    pub fn downstream_closure(&self, id: &str) -> HashSet<String> {
        let mut seen: HashSet<String> = HashSet::new();
        let mut queue: VecDeque<&str> = VecDeque::new();
        queue.push_back(id);
        while let Some(current) = queue.pop_front() {
            for dep in self.dependents(current) {
                if seen.insert(dep.clone()) {
                    queue.push_back(dep.as_str());
                }
            }
        }
        seen
    }

    pub fn contains(&self, id: &str) -> bool {
        self.upstream.contains_key(id)
    }
}

/// Kahn's algorithm with a sorted frontier: pops the lexicographically
/// smallest ready node each step, which makes the order reproducible across
/// runs and platforms.
fn stable_topo_order(
    ids: &BTreeSet<&str>,
    upstream: &HashMap<String, Vec<String>>,
    dependents: &HashMap<String, Vec<String>>,
) -> Result<Vec<String>, CoreError> {
    let mut in_degree: HashMap<&str, usize> = HashMap::new();
    for id in ids {
        in_degree.insert(*id, upstream.get(*id).map(Vec::len).unwrap_or(0));
    }

    let mut frontier: BTreeSet<&str> = in_degree
        .iter()
        .filter(|(_, d)| **d == 0)
        .map(|(id, _)| *id)
        .collect();

    let mut order = Vec::with_capacity(ids.len());
    while let Some(&next) = frontier.iter().next() {
        frontier.remove(next);
        order.push(next.to_string());
        for dep in dependents.get(next).map(Vec::as_slice).unwrap_or(&[]) {
            let d = in_degree
                .get_mut(dep.as_str())
                .ok_or_else(|| CoreError::InternalInvariant(format!("unindexed node {}", dep)))?;
            *d -= 1;
            if *d == 0 {
                frontier.insert(dep.as_str());
            }
        }
    }
    Ok(order)
}

/// Extract the members of one cycle for the `InvalidGraph` diagnostic.
/// Uses petgraph's Tarjan SCC; the reported component is the one containing
/// the lexicographically smallest cyclic node, members sorted.
fn find_cycle_members(ids: &BTreeSet<&str>, edges: &BTreeSet<(&str, &str)>) -> Vec<String> {
    let mut graph: DiGraph<&str, ()> = DiGraph::new();
    let mut index: HashMap<&str, NodeIndex> = HashMap::new();
    for id in ids {
        index.insert(*id, graph.add_node(*id));
    }
    for (dependent, up) in edges {
        if let (Some(&a), Some(&b)) = (index.get(*up), index.get(*dependent)) {
            graph.add_edge(a, b, ());
        }
    }

    let mut cyclic: Vec<Vec<String>> = tarjan_scc(&graph)
        .into_iter()
        .filter(|scc| {
            scc.len() > 1
                || scc
                    .first()
                    .map(|&n| graph.find_edge(n, n).is_some())
                    .unwrap_or(false)
        })
        .map(|scc| {
            let mut members: Vec<String> =
                scc.into_iter().map(|n| graph[n].to_string()).collect();
            members.sort();
            members
        })
        .collect();
    cyclic.sort();
    cyclic.into_iter().next().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::{Criticality, Dependency, StateSnapshot, WorkItem};

    fn make_item(id: &str, depends_on: &[&str]) -> WorkItem {
        WorkItem {
            id: id.to_string(),
            title: format!("Item {}", id),
            estimated_days: None,
            actual_days: None,
            remaining_days: None,
            completion_percentage: None,
            status: Default::default(),
            milestone_id: None,
            external_team_id: None,
            expected_completion_date: None,
            confidence_level: None,
            depends_on: depends_on.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn make_edge(id: &str, from: &str, to: &str) -> Dependency {
        Dependency {
            id: id.to_string(),
            from_id: from.to_string(),
            to_id: to.to_string(),
            criticality: Criticality::Medium,
            slack_days: 0.0,
            probability_delay: 1.0,
            expected_delay_if_late: 0.0,
            owner: None,
        }
    }

    #[test]
    fn test_topo_order_puts_dependencies_first() {
        let mut snap = StateSnapshot::new();
        snap.add_work_item(make_item("c", &["b"]));
        snap.add_work_item(make_item("b", &["a"]));
        snap.add_work_item(make_item("a", &[]));

        let graph = DependencyGraph::build(&snap).unwrap();
        assert_eq!(graph.topo_order(), &["a", "b", "c"]);
    }

    #[test]
    fn test_topo_order_breaks_ties_lexicographically() {
        let mut snap = StateSnapshot::new();
        for id in ["zeta", "alpha", "mid"] {
            snap.add_work_item(make_item(id, &[]));
        }
        let graph = DependencyGraph::build(&snap).unwrap();
        assert_eq!(graph.topo_order(), &["alpha", "mid", "zeta"]);
    }

    #[test]
    fn test_explicit_edges_join_implicit_ones() {
        let mut snap = StateSnapshot::new();
        snap.add_work_item(make_item("w1", &[]));
        snap.add_work_item(make_item("w2", &[]));
        snap.add_dependency(make_edge("dep_001", "w2", "w1"));

        let graph = DependencyGraph::build(&snap).unwrap();
        assert_eq!(graph.upstream("w2"), &["w1"]);
        assert_eq!(graph.dependents("w1"), &["w2"]);
    }

    #[test]
    fn test_cycle_is_a_construction_error_naming_members() {
        let mut snap = StateSnapshot::new();
        snap.add_work_item(make_item("a", &["b"]));
        snap.add_work_item(make_item("b", &["a"]));
        snap.add_work_item(make_item("free", &[]));

        let err = DependencyGraph::build(&snap).unwrap_err();
        match err {
            CoreError::InvalidGraph { cycle } => {
                assert_eq!(cycle, vec!["a".to_string(), "b".to_string()]);
            }
            other => panic!("expected InvalidGraph, got {:?}", other),
        }
    }

    #[test]
    fn test_self_dependency_is_a_cycle() {
        let mut snap = StateSnapshot::new();
        snap.add_work_item(make_item("a", &["a"]));

        assert!(matches!(
            DependencyGraph::build(&snap),
            Err(CoreError::InvalidGraph { .. })
        ));
    }

    #[test]
    fn test_downstream_closure_is_transitive() {
        let mut snap = StateSnapshot::new();
        snap.add_work_item(make_item("a", &[]));
        snap.add_work_item(make_item("b", &["a"]));
        snap.add_work_item(make_item("c", &["b"]));
        snap.add_work_item(make_item("other", &[]));

        let graph = DependencyGraph::build(&snap).unwrap();
        let closure = graph.downstream_closure("a");
        assert!(closure.contains("b"));
        assert!(closure.contains("c"));
        assert!(!closure.contains("a"));
        assert!(!closure.contains("other"));
    }

    #[test]
    fn test_unknown_edge_endpoints_become_nodes() {
        let mut snap = StateSnapshot::new();
        snap.add_work_item(make_item("w1", &["ghost"]));

        let graph = DependencyGraph::build(&snap).unwrap();
        assert!(graph.contains("ghost"));
        assert_eq!(graph.upstream("w1"), &["ghost"]);
    }

    #[test]
    fn test_topo_visits_every_node_exactly_once() {
        let mut snap = StateSnapshot::new();
        snap.add_work_item(make_item("a", &[]));
        snap.add_work_item(make_item("b", &["a"]));
        snap.add_work_item(make_item("c", &["a", "b"]));
        snap.add_work_item(make_item("d", &["b", "c"]));

        let graph = DependencyGraph::build(&snap).unwrap();
        let order = graph.topo_order();
        assert_eq!(order.len(), 4);
        let unique: std::collections::HashSet<&String> = order.iter().collect();
        assert_eq!(unique.len(), 4);
    }
}
