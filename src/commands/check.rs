use anyhow::Result;
use serde::Serialize;
use slipcast::error::CoreError;
use slipcast::graph::DependencyGraph;
use std::path::Path;

#[derive(Debug, Serialize)]
struct CheckOutput {
    ok: bool,
    work_items: usize,
    dependencies: usize,
    cycle: Vec<String>,
    dangling_refs: Vec<DanglingRef>,
}

/// A reference to a work item that is not in the snapshot.
#[derive(Debug, Serialize)]
struct DanglingRef {
    from: String,
    to: String,
    relation: String,
}

pub fn run(dir: &Path, json: bool) -> Result<()> {
    let snapshot = super::load_snapshot(dir)?;

    let (ok, cycle) = match DependencyGraph::build(&snapshot) {
        Ok(_) => (true, vec![]),
        Err(CoreError::InvalidGraph { cycle }) => (false, cycle),
        Err(other) => return Err(other.into()),
    };

    let mut dangling = Vec::new();
    for item in snapshot.work_items.values() {
        for up in &item.depends_on {
            if snapshot.work_item(up).is_none() {
                dangling.push(DanglingRef {
                    from: item.id.clone(),
                    to: up.clone(),
                    relation: "depends_on".to_string(),
                });
            }
        }
    }
    for dep in snapshot.dependencies.values() {
        for (to, relation) in [(&dep.from_id, "from_id"), (&dep.to_id, "to_id")] {
            if snapshot.work_item(to).is_none() {
                dangling.push(DanglingRef {
                    from: dep.id.clone(),
                    to: to.clone(),
                    relation: relation.to_string(),
                });
            }
        }
    }
    dangling.sort_by(|a, b| (&a.from, &a.to).cmp(&(&b.from, &b.to)));

    if json {
        let output = CheckOutput {
            ok: ok && dangling.is_empty(),
            work_items: snapshot.work_items.len(),
            dependencies: snapshot.dependencies.len(),
            cycle,
            dangling_refs: dangling,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        if !ok {
            println!("Dependency cycle: {}", cycle.join(" -> "));
        }
        for d in &dangling {
            println!("Dangling {}: {} -> {}", d.relation, d.from, d.to);
        }
        if ok && dangling.is_empty() {
            println!(
                "OK: {} work item(s), {} dependency edge(s), no cycles.",
                snapshot.work_items.len(),
                snapshot.dependencies.len()
            );
        }
    }

    Ok(())
}
