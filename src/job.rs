//! Job and report documents shared by the command line and the server.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{PanelError, SearchError};
use crate::panel::{AvailablePanel, Demand, PanelShape};
use crate::solver::{SearchBudget, SearchStats, SearchStatus, Solution, Solver};
use crate::supplier::Supplier;
use crate::types::{Axis, Length, Money, Rect, Stock, deserialize_u32_from_number};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Job {
    pub supplier: SupplierRecord,
    pub wants: Vec<WantRecord>,
    #[serde(default)]
    pub budget: BudgetRecord,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SupplierRecord {
    pub name: String,
    #[serde(default, deserialize_with = "deserialize_u32_from_number")]
    pub kerf: Length,
    #[serde(default)]
    pub cost_per_cut: Money,
    pub available_stock: Vec<AvailableRecord>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AvailableRecord {
    pub label: String,
    pub material: String,
    #[serde(deserialize_with = "deserialize_u32_from_number")]
    pub thickness: Length,
    #[serde(deserialize_with = "deserialize_u32_from_number")]
    pub length: Length,
    #[serde(deserialize_with = "deserialize_u32_from_number")]
    pub width: Length,
    pub cost: Money,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WantRecord {
    pub label: String,
    #[serde(deserialize_with = "deserialize_u32_from_number")]
    pub length: Length,
    #[serde(deserialize_with = "deserialize_u32_from_number")]
    pub width: Length,
    pub material: String,
    #[serde(deserialize_with = "deserialize_u32_from_number")]
    pub thickness: Length,
    #[serde(default = "default_quantity", deserialize_with = "deserialize_u32_from_number")]
    pub quantity: u32,
    #[serde(default)]
    pub flippable: bool,
}

fn default_quantity() -> u32 {
    1
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct BudgetRecord {
    pub max_expanded: Option<usize>,
    pub time_limit_ms: Option<u64>,
}

impl Job {
    pub fn supplier(&self) -> Result<Supplier, PanelError> {
        let available = self
            .supplier
            .available_stock
            .iter()
            .map(|a| {
                AvailablePanel::new(
                    a.label.clone(),
                    Stock::new(a.material.as_str(), a.thickness),
                    Rect::new(a.length, a.width),
                    a.cost,
                )
            })
            .collect::<Result<Vec<_>, _>>()?;
        Supplier::new(
            self.supplier.name.clone(),
            self.supplier.kerf,
            self.supplier.cost_per_cut,
            available,
        )
    }

    pub fn demands(&self) -> Result<Vec<Demand>, PanelError> {
        self.wants
            .iter()
            .map(|w| {
                Demand::builder(w.label.clone())
                    .length(w.length)
                    .width(w.width)
                    .material(w.material.clone())
                    .thickness(w.thickness)
                    .quantity(w.quantity)
                    .flippable(w.flippable)
                    .build()
            })
            .collect()
    }

    pub fn budget(&self) -> SearchBudget {
        let mut budget = SearchBudget::default();
        if let Some(max) = self.budget.max_expanded {
            budget = budget.with_max_expanded(max);
        }
        if let Some(ms) = self.budget.time_limit_ms {
            budget = budget.with_time_limit(Duration::from_millis(ms));
        }
        budget
    }

    pub fn solver(&self) -> Result<Solver, SearchError> {
        Ok(Solver::new(self.supplier()?, &self.demands()?)?.with_budget(self.budget()))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub status: SearchStatus,
    pub cost: Money,
    pub cuts: u32,
    pub sheet_count: usize,
    pub waste_percent: f64,
    pub bought: Vec<SheetReport>,
    pub finished: Vec<FinishedReport>,
    pub scrapped: Vec<OffcutReport>,
    pub stats: SearchStats,
}

#[derive(Debug, Clone, Serialize)]
pub struct SheetReport {
    pub sheet: u64,
    pub label: String,
    pub stock: Stock,
    pub rect: Rect,
    pub cost: Money,
}

#[derive(Debug, Clone, Serialize)]
pub struct FinishedReport {
    pub label: String,
    pub flipped: bool,
    pub sheet: u64,
    pub x: Length,
    pub y: Length,
    pub rect: Rect,
    /// Cuts from the whole sheet down to this panel, first cut first.
    pub cuts: Vec<(Axis, Length)>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OffcutReport {
    pub sheet: u64,
    pub x: Length,
    pub y: Length,
    pub rect: Rect,
}

impl From<&Solution> for Report {
    fn from(sol: &Solution) -> Self {
        Report {
            status: sol.status,
            cost: sol.cost(),
            cuts: sol.cuts(),
            sheet_count: sol.sheet_count(),
            waste_percent: sol.total_waste_percent(),
            bought: sol
                .bought()
                .iter()
                .map(|b| SheetReport {
                    sheet: b.id().get(),
                    label: b.available().label().to_string(),
                    stock: b.stock().clone(),
                    rect: b.rect(),
                    cost: b.cost(),
                })
                .collect(),
            finished: sol
                .finished()
                .iter()
                .map(|f| FinishedReport {
                    label: f.label().to_string(),
                    flipped: f.want().is_flipped(),
                    sheet: f.panel().progenitor().id().get(),
                    x: f.panel().x(),
                    y: f.panel().y(),
                    rect: f.rect(),
                    cuts: f.panel().cut_history(),
                })
                .collect(),
            scrapped: sol
                .state
                .scrapped()
                .iter()
                .map(|s| OffcutReport {
                    sheet: s.panel().progenitor().id().get(),
                    x: s.panel().x(),
                    y: s.panel().y(),
                    rect: s.rect(),
                })
                .collect(),
            stats: sol.stats.clone(),
        }
    }
}
