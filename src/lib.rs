pub mod error;
pub mod guillotine;
pub mod job;
pub mod panel;
pub mod solver;
pub mod state;
pub mod supplier;
pub mod types;

pub use error::{PanelError, PanelOverlapError, SearchError};
pub use panel::{Demand, Panel, PanelShape, Want};
pub use solver::{SearchBudget, SearchStatus, Solution, Solver};
pub use supplier::Supplier;
pub use types::{Axis, Length, Money, Rect, Stock};
