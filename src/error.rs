use crate::types::{PanelId, Rect, Stock};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PanelError {
    #[error("invalid dimension for '{label}': {reason}")]
    InvalidDimension { label: String, reason: String },

    #[error("'{label}' is {found}, expected {expected}")]
    IncompatibleMaterial {
        label: String,
        expected: Stock,
        found: Stock,
    },
}

impl PanelError {
    pub(crate) fn invalid(label: &str, reason: impl Into<String>) -> Self {
        PanelError::InvalidDimension {
            label: label.to_string(),
            reason: reason.into(),
        }
    }
}

/// Two panels cut from the same bought sheet claim the same material.
///
/// Generation never produces this; it exists to catch regressions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("panel {a} ({a_rect} @ {a_x},{a_y}) overlaps panel {b} ({b_rect} @ {b_x},{b_y}) on sheet {progenitor}")]
pub struct PanelOverlapError {
    pub progenitor: PanelId,
    pub a: PanelId,
    pub a_rect: Rect,
    pub a_x: u32,
    pub a_y: u32,
    pub b: PanelId,
    pub b_rect: Rect,
    pub b_x: u32,
    pub b_y: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SearchError {
    #[error(transparent)]
    Panel(#[from] PanelError),

    #[error("no cut pattern satisfies every want: {reason}")]
    NoSolution { reason: String, expanded: usize },

    #[error("search budget exhausted after {expanded} states without reaching a solution")]
    BudgetExceeded { expanded: usize },
}
