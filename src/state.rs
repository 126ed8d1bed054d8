//! Immutable search states and the transitions between them.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::error::PanelOverlapError;
use crate::guillotine::{Cut, cut};
use crate::panel::{
    AvailablePanel, BoughtPanel, CuttablePanel, FinishedPanel, Panel, PanelShape, ScrappedPanel,
    Want, check_overlaps, fitsin, smaller, wants_match,
};
use crate::supplier::Supplier;
use crate::types::{Axis, Length, Money, Rect, Stock};

/// What is on hand, what is done, and what is still wanted.
///
/// A transition always builds a new state; existing states are never touched.
#[derive(Debug, Clone)]
pub struct SearchState {
    unsatisfied: Vec<Want>,
    stock: Vec<Arc<CuttablePanel>>,
    finished: Vec<FinishedPanel>,
    scrapped: Vec<ScrappedPanel>,
    bought: Vec<Arc<BoughtPanel>>,
    cost: Money,
    cuts: u32,
}

/// Identifies states whose futures are the same: ids, labels and positions
/// are left out.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StateSignature {
    wants: Vec<(Rect, Stock, bool)>,
    stock: Vec<(Rect, Stock)>,
}

impl SearchState {
    pub fn initial(wants: Vec<Want>) -> Self {
        Self {
            unsatisfied: wants,
            stock: Vec::new(),
            finished: Vec::new(),
            scrapped: Vec::new(),
            bought: Vec::new(),
            cost: Money::ZERO,
            cuts: 0,
        }
    }

    pub fn unsatisfied(&self) -> &[Want] {
        &self.unsatisfied
    }

    pub fn stock(&self) -> &[Arc<CuttablePanel>] {
        &self.stock
    }

    pub fn finished(&self) -> &[FinishedPanel] {
        &self.finished
    }

    pub fn scrapped(&self) -> &[ScrappedPanel] {
        &self.scrapped
    }

    pub fn bought(&self) -> &[Arc<BoughtPanel>] {
        &self.bought
    }

    pub fn cost(&self) -> Money {
        self.cost
    }

    pub fn cuts(&self) -> u32 {
        self.cuts
    }

    pub fn is_terminal(&self) -> bool {
        self.unsatisfied.is_empty()
    }

    /// Every panel the state knows about, as the closed [`Panel`] sum.
    pub fn panels(&self) -> impl Iterator<Item = Panel> + '_ {
        let bought = self.bought.iter().cloned().map(Panel::Bought);
        let stock = self.stock.iter().cloned().map(Panel::Cuttable);
        let finished = self.finished.iter().cloned().map(Panel::Finished);
        let scrapped = self.scrapped.iter().cloned().map(Panel::Scrapped);
        let wants = self.unsatisfied.iter().cloned().map(Panel::from);
        bought.chain(stock).chain(finished).chain(scrapped).chain(wants)
    }

    /// Panels cut from the same sheet must not share material.
    pub fn check_overlaps(&self) -> Result<(), PanelOverlapError> {
        let cut: Vec<Panel> = self.panels().filter(|p| p.as_cut().is_some()).collect();
        check_overlaps(cut.iter().filter_map(|p| p.as_cut()).map(|p| &**p))
    }

    pub fn signature(&self) -> StateSignature {
        let mut wants: Vec<(Rect, Stock, bool)> = self
            .unsatisfied
            .iter()
            .map(|w| (w.rect(), w.stock().clone(), w.wanted().flippable()))
            .collect();
        wants.sort();
        let mut stock: Vec<(Rect, Stock)> = self
            .stock
            .iter()
            .map(|p| (p.rect(), p.stock().clone()))
            .collect();
        stock.sort();
        StateSignature { wants, stock }
    }

    /// Admissible estimate, in cents, of what remains to be spent.
    ///
    /// Per stock kind, the larger of two bounds. By area: wanted area not
    /// already covered by stock on hand, priced at the cheapest catalog rate.
    /// By count: every want needs its own panel and each panel beyond those on
    /// hand costs at least one cut or one sheet. Kerf is ignored.
    pub fn lower_bound(&self, supplier: &Supplier) -> f64 {
        let mut needs: HashMap<&Stock, (i128, i64)> = HashMap::new();
        for want in &self.unsatisfied {
            if let Want::Wanted(w) = want {
                let need = needs.entry(w.stock()).or_default();
                need.0 += w.rect().area() as i128;
                need.1 += 1;
            }
        }
        for panel in &self.stock {
            if let Some(need) = needs.get_mut(panel.stock()) {
                need.0 -= panel.rect().area() as i128;
                need.1 -= 1;
            }
        }
        needs
            .into_iter()
            .map(|(stock, (area, panels))| {
                let by_area =
                    supplier.cheapest_rate(stock).unwrap_or(0.0) * area.max(0) as f64;
                let per_panel = supplier
                    .cheapest_sheet(stock)
                    .map_or(supplier.cost_per_cut(), |sheet| {
                        sheet.min(supplier.cost_per_cut())
                    });
                let by_count = per_panel.cents() as f64 * panels.max(0) as f64;
                by_area.max(by_count)
            })
            .sum()
    }

    /// Buys one sheet of `available`. `kerf` decides which stock is still
    /// worth keeping afterwards.
    pub fn purchase(&self, available: &Arc<AvailablePanel>, kerf: Length) -> SearchState {
        let bought = BoughtPanel::purchase(available);
        let mut next = self.clone();
        next.cost += bought.cost();
        next.stock.push(Arc::new(bought.sheet()));
        next.bought.push(bought);
        next.sweep(kerf);
        next
    }

    /// Every state reachable by one finish, cut or purchase.
    pub fn successors(&self, supplier: &Supplier) -> Vec<SearchState> {
        let kerf = supplier.kerf();
        let mut next = Vec::new();

        for (si, panel) in self.stock.iter().enumerate() {
            let mut tried: HashSet<(Rect, &Stock, bool)> = HashSet::new();
            for want in &self.unsatisfied {
                if !tried.insert((want.rect(), want.stock(), want.wanted().flippable())) {
                    continue;
                }
                if wants_match(want, &**panel) {
                    next.extend(self.finish(si, want, kerf));
                    continue;
                }
                if !fitsin(want, &**panel) {
                    continue;
                }
                for axis in Axis::BOTH {
                    let at = want.rect().extent(axis);
                    if let Some(c) = cut(panel, axis, at, kerf, supplier.cost_per_cut()) {
                        next.extend(self.apply_cut(si, c, want, kerf));
                    }
                }
            }
        }

        next.extend(self.purchases(supplier));
        next
    }

    /// Purchase successors for wants that nothing on hand can produce, at
    /// most one per catalog entry.
    fn purchases(&self, supplier: &Supplier) -> Vec<SearchState> {
        let kerf = supplier.kerf();
        let mut chosen: Vec<&Arc<AvailablePanel>> = Vec::new();
        for want in &self.unsatisfied {
            if self.stock.iter().any(|p| want.producible_from(&**p, kerf)) {
                continue;
            }
            for available in supplier.hosts(want) {
                if !chosen.iter().any(|c| Arc::ptr_eq(c, available)) {
                    chosen.push(available);
                }
            }
        }
        chosen.into_iter().map(|a| self.purchase(a, kerf)).collect()
    }

    fn finish(&self, si: usize, want: &Want, kerf: Length) -> Option<SearchState> {
        let panel = &self.stock[si];
        let finished = self.bind_oriented(Arc::clone(panel), want)?;
        let mut next = self.clone();
        next.stock.remove(si);
        next.retire(want);
        next.finished.push(finished);
        next.sweep(kerf);
        Some(next)
    }

    fn apply_cut(&self, si: usize, c: Cut, want: &Want, kerf: Length) -> Option<SearchState> {
        let mut next = self.clone();
        next.stock.remove(si);
        next.cost += c.cost;
        next.cuts += 1;

        let piece = Arc::new(c.piece);
        if wants_match(want, &*piece) {
            next.finished.push(self.bind_oriented(piece, want)?);
            next.retire(want);
        } else {
            next.stock.push(piece);
        }
        next.stock.push(Arc::new(c.remainder));
        next.sweep(kerf);
        Some(next)
    }

    /// Binds `panel` to whichever entry of the want's pair has its exact
    /// orientation, preferring the entry this state actually holds.
    fn bind_oriented(&self, panel: Arc<CuttablePanel>, want: &Want) -> Option<FinishedPanel> {
        let entry = if panel.rect() == want.rect() {
            want.clone()
        } else {
            match self
                .unsatisfied
                .iter()
                .find(|w| w.retires(want) && w.rect() == panel.rect())
            {
                Some(w) => w.clone(),
                None => want.counterpart()?,
            }
        };
        FinishedPanel::bind(panel, entry).ok()
    }

    fn retire(&mut self, want: &Want) {
        self.unsatisfied.retain(|w| !w.retires(want));
    }

    /// Moves stock that can no longer produce any remaining want into scrap.
    fn sweep(&mut self, kerf: Length) {
        let unsatisfied = &self.unsatisfied;
        let (keep, scrap): (Vec<_>, Vec<_>) = self
            .stock
            .drain(..)
            .partition(|p| unsatisfied.iter().any(|w| w.producible_from(&**p, kerf)));
        self.stock = keep;
        self.stock.sort_by(|a, b| smaller(&**a, &**b));
        self.scrapped.extend(scrap.into_iter().map(ScrappedPanel::new));
    }
}
