use crate::models::{ResolvedSelection, Stage};

#[derive(Debug, thiserror::Error)]
pub enum ExplorerError {
    #[error("flight data unavailable from {source_name}: {reason}")]
    DataUnavailable { source_name: String, reason: String },

    #[error("no flight data for {selection}")]
    EmptySelection { selection: ResolvedSelection },

    #[error("{value:?} is not a valid {stage} for this selection")]
    InvalidSelection { stage: Stage, value: String },
}

impl ExplorerError {
    pub fn unavailable(source_name: impl Into<String>, err: impl std::fmt::Display) -> Self {
        ExplorerError::DataUnavailable {
            source_name: source_name.into(),
            reason: err.to_string(),
        }
    }
}
