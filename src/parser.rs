use crate::snapshot::{
    Actor, Decision, Dependency, ExternalTeamHistory, Issue, Milestone, Risk, StateSnapshot,
    WorkItem,
};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error on line {line}: {source}")]
    Json {
        line: usize,
        source: serde_json::Error,
    },
}

/// One line of a persisted snapshot document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[allow(clippy::large_enum_variant)]
pub enum Record {
    Milestone(Milestone),
    WorkItem(WorkItem),
    Dependency(Dependency),
    Risk(Risk),
    Decision(Decision),
    Issue(Issue),
    Actor(Actor),
    TeamHistory(ExternalTeamHistory),
}

/// Load a state snapshot from a JSONL file (one record per line).
///
/// Blank lines and `#` comments are skipped. Back-references between
/// milestones and work items are reconciled before the snapshot is returned.
pub fn load_snapshot<P: AsRef<Path>>(path: P) -> Result<StateSnapshot, ParseError> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let mut snapshot = StateSnapshot::new();

    for (line_num, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let record: Record = serde_json::from_str(trimmed).map_err(|e| ParseError::Json {
            line: line_num + 1,
            source: e,
        })?;
        match record {
            Record::Milestone(m) => snapshot.add_milestone(m),
            Record::WorkItem(w) => snapshot.add_work_item(w),
            Record::Dependency(d) => snapshot.add_dependency(d),
            Record::Risk(r) => snapshot.add_risk(r),
            Record::Decision(d) => snapshot.add_decision(d),
            Record::Issue(i) => snapshot.add_issue(i),
            Record::Actor(a) => snapshot.add_actor(a),
            Record::TeamHistory(h) => snapshot.add_team_history(h),
        }
    }

    snapshot.reconcile();
    Ok(snapshot)
}

/// Save a state snapshot to a JSONL file.
///
/// Records are written grouped by kind and sorted by id within each group,
/// so saving the same snapshot twice yields byte-identical files.
pub fn save_snapshot<P: AsRef<Path>>(snapshot: &StateSnapshot, path: P) -> Result<(), ParseError> {
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)?;

    let mut records: Vec<Record> = Vec::new();
    records.extend(snapshot.milestones.values().cloned().map(Record::Milestone));
    records.extend(snapshot.work_items.values().cloned().map(Record::WorkItem));
    records.extend(
        snapshot
            .dependencies
            .values()
            .cloned()
            .map(Record::Dependency),
    );
    records.extend(snapshot.risks.values().cloned().map(Record::Risk));
    records.extend(snapshot.decisions.values().cloned().map(Record::Decision));
    records.extend(snapshot.issues.values().cloned().map(Record::Issue));
    records.extend(snapshot.actors.values().cloned().map(Record::Actor));
    records.extend(
        snapshot
            .team_history
            .values()
            .cloned()
            .map(Record::TeamHistory),
    );
    records.sort_by(|a, b| record_sort_key(a).cmp(&record_sort_key(b)));

    for record in &records {
        let json =
            serde_json::to_string(record).map_err(|e| ParseError::Json { line: 0, source: e })?;
        writeln!(file, "{}", json)?;
    }

    Ok(())
}

fn record_sort_key(record: &Record) -> (u8, &str) {
    match record {
        Record::Milestone(m) => (0, m.id.as_str()),
        Record::WorkItem(w) => (1, w.id.as_str()),
        Record::Dependency(d) => (2, d.id.as_str()),
        Record::Risk(r) => (3, r.id.as_str()),
        Record::Decision(d) => (4, d.id.as_str()),
        Record::Issue(i) => (5, i.id.as_str()),
        Record::Actor(a) => (6, a.id.as_str()),
        Record::TeamHistory(h) => (7, h.team_id.as_str()),
    }
}
