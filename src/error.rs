use thiserror::Error;

/// Errors surfaced by the forecast and rule engines.
#[derive(Error, Debug)]
pub enum CoreError {
    /// A referenced entity is absent from the snapshot.
    #[error("{kind} '{id}' not found in snapshot")]
    NotFound { kind: &'static str, id: String },

    /// An event payload or scenario parameter is malformed or out of range.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The dependency graph contains a cycle; no partial forecast is produced.
    #[error("dependency cycle detected: {}", cycle.join(" -> "))]
    InvalidGraph { cycle: Vec<String> },

    /// A computed result disagrees with its own bookkeeping. Always a bug.
    #[error("internal invariant violated: {0}")]
    InternalInvariant(String),
}

impl CoreError {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        CoreError::NotFound {
            kind,
            id: id.into(),
        }
    }
}
