use std::sync::Arc;

use crate::error::PanelError;
use crate::panel::{AvailablePanel, BoughtPanel, PanelShape, Want};
use crate::types::{Length, Money, Stock};

/// A single supplier of sheet stock.
///
/// Suppliers that cut stock down to size charge `cost_per_cut` for each cut
/// and lose `kerf` of material to the saw.
#[derive(Debug, Clone)]
pub struct Supplier {
    name: String,
    kerf: Length,
    cost_per_cut: Money,
    available: Vec<Arc<AvailablePanel>>,
}

impl Supplier {
    pub fn new(
        name: impl Into<String>,
        kerf: Length,
        cost_per_cut: Money,
        available: Vec<AvailablePanel>,
    ) -> Result<Self, PanelError> {
        for panel in &available {
            if kerf >= panel.rect().minor() {
                return Err(PanelError::InvalidDimension {
                    label: panel.label().to_string(),
                    reason: format!("kerf {kerf} is not smaller than {}", panel.rect()),
                });
            }
        }
        Ok(Self {
            name: name.into(),
            kerf,
            cost_per_cut,
            available: available.into_iter().map(Arc::new).collect(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kerf(&self) -> Length {
        self.kerf
    }

    pub fn cost_per_cut(&self) -> Money {
        self.cost_per_cut
    }

    pub fn available(&self) -> &[Arc<AvailablePanel>] {
        &self.available
    }

    pub fn purchase_cost(&self, bought: &BoughtPanel) -> Money {
        bought.cost()
    }

    /// Catalog entries `want` can be cut from, in either orientation it accepts.
    pub fn hosts<'a>(
        &'a self,
        want: &'a Want,
    ) -> impl Iterator<Item = &'a Arc<AvailablePanel>> + 'a {
        self.available
            .iter()
            .filter(move |a| want.producible_from(&***a, self.kerf))
    }

    /// Cheapest price per unit area, in cents, for stock of this kind.
    pub fn cheapest_rate(&self, stock: &Stock) -> Option<f64> {
        self.available
            .iter()
            .filter(|a| a.stock() == stock)
            .map(|a| a.cost_per_area())
            .min_by(f64::total_cmp)
    }

    /// Cheapest whole sheet of this kind.
    pub fn cheapest_sheet(&self, stock: &Stock) -> Option<Money> {
        self.available
            .iter()
            .filter(|a| a.stock() == stock)
            .map(|a| a.cost())
            .min()
    }
}
