//! Best-first (A*) search for the cheapest way to cut every want.

use std::cmp::Ordering;
use std::collections::hash_map::Entry;
use std::collections::{BinaryHeap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::time::{Duration, Instant};

use ordered_float::OrderedFloat;

use crate::error::SearchError;
use crate::panel::{BoughtPanel, Demand, FinishedPanel, PanelShape, Want};
use crate::state::{SearchState, StateSignature};
use crate::supplier::Supplier;
use crate::types::Money;

/// Slack for comparing float priorities against integer costs.
const PRIORITY_EPSILON: f64 = 1e-6;

/// Limits on how long a search may run. Checked once per pop.
#[derive(Debug, Clone)]
pub struct SearchBudget {
    /// Maximum number of states to expand.
    pub max_expanded: usize,
    pub time_limit: Option<Duration>,
    /// Set from another thread to stop the search early.
    pub cancel: Option<Arc<AtomicBool>>,
}

impl SearchBudget {
    pub const DEFAULT_MAX_EXPANDED: usize = 200_000;

    pub fn unlimited() -> Self {
        Self {
            max_expanded: usize::MAX,
            time_limit: None,
            cancel: None,
        }
    }

    pub fn with_max_expanded(mut self, max_expanded: usize) -> Self {
        self.max_expanded = max_expanded;
        self
    }

    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = Some(limit);
        self
    }

    pub fn with_cancel_flag(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    fn exhausted(&self, expanded: usize, started: Instant) -> bool {
        expanded >= self.max_expanded
            || self.time_limit.is_some_and(|limit| started.elapsed() >= limit)
            || self
                .cancel
                .as_ref()
                .is_some_and(|flag| flag.load(AtomicOrdering::Relaxed))
    }
}

impl Default for SearchBudget {
    fn default() -> Self {
        Self {
            max_expanded: Self::DEFAULT_MAX_EXPANDED,
            time_limit: None,
            cancel: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStatus {
    /// The frontier emptied; no cheaper pattern exists.
    Exhausted,
    /// Stopped early; a cheaper pattern may exist.
    BudgetExceeded,
}

#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct SearchStats {
    pub expanded: usize,
    pub generated: usize,
    pub pruned: usize,
    pub duplicates: usize,
    pub dead_ends: usize,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone)]
pub struct Solution {
    pub state: Arc<SearchState>,
    pub status: SearchStatus,
    pub stats: SearchStats,
}

impl Solution {
    pub fn cost(&self) -> Money {
        self.state.cost()
    }

    pub fn cuts(&self) -> u32 {
        self.state.cuts()
    }

    pub fn finished(&self) -> &[FinishedPanel] {
        self.state.finished()
    }

    pub fn bought(&self) -> &[Arc<BoughtPanel>] {
        self.state.bought()
    }

    pub fn is_exhaustive(&self) -> bool {
        self.status == SearchStatus::Exhausted
    }

    pub fn sheet_count(&self) -> usize {
        self.state.bought().len()
    }

    /// Share of the bought area that did not end up in a finished panel.
    pub fn total_waste_percent(&self) -> f64 {
        let bought: u64 = self.state.bought().iter().map(|b| b.rect().area()).sum();
        let used: u64 = self.state.finished().iter().map(|f| f.rect().area()).sum();
        if bought == 0 {
            return 0.0;
        }
        (bought - used) as f64 / bought as f64 * 100.0
    }
}

struct Node {
    priority: OrderedFloat<f64>,
    seq: u64,
    state: Arc<SearchState>,
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Node {}

impl PartialOrd for Node {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Node {
    // Reversed so the max-heap pops the lowest priority, oldest first.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .priority
            .cmp(&self.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

pub struct Solver {
    supplier: Supplier,
    wants: Vec<Want>,
    budget: SearchBudget,
}

impl Solver {
    pub fn new(supplier: Supplier, demands: &[Demand]) -> Result<Self, SearchError> {
        let mut wants = Vec::new();
        for d in demands {
            wants.extend(d.expand()?);
        }
        Ok(Self::from_wants(supplier, wants))
    }

    pub fn from_wants(supplier: Supplier, wants: Vec<Want>) -> Self {
        Self {
            supplier,
            wants,
            budget: SearchBudget::default(),
        }
    }

    pub fn with_budget(mut self, budget: SearchBudget) -> Self {
        self.budget = budget;
        self
    }

    pub fn supplier(&self) -> &Supplier {
        &self.supplier
    }

    pub fn wants(&self) -> &[Want] {
        &self.wants
    }

    pub fn solve(&self) -> Result<Solution, SearchError> {
        let started = Instant::now();
        let mut stats = SearchStats::default();
        tracing::info!(
            supplier = self.supplier.name(),
            wants = self.wants.len(),
            catalog = self.supplier.available().len(),
            "starting cut search"
        );

        self.check_feasible()?;

        let root = SearchState::initial(self.wants.clone());
        if root.is_terminal() {
            return Ok(Solution {
                state: Arc::new(root),
                status: SearchStatus::Exhausted,
                stats,
            });
        }

        let mut frontier = BinaryHeap::new();
        let mut seq = 0u64;
        for available in self.supplier.available() {
            let kerf = self.supplier.kerf();
            if self.wants.iter().any(|w| w.producible_from(&**available, kerf)) {
                let state = root.purchase(available, kerf);
                stats.generated += 1;
                frontier.push(self.node(state, &mut seq));
            }
        }

        // Best (cost, sheets, cuts) expanded so far for each signature.
        let mut closed: HashMap<StateSignature, (Money, usize, u32)> = HashMap::new();
        let mut best: Option<Arc<SearchState>> = None;
        let mut status = SearchStatus::Exhausted;

        while !frontier.is_empty() {
            if self.budget.exhausted(stats.expanded, started) {
                tracing::debug!(expanded = stats.expanded, "search budget exhausted");
                status = SearchStatus::BudgetExceeded;
                break;
            }
            let Some(node) = frontier.pop() else {
                break;
            };

            if beyond_bound(node.priority.0, best.as_deref()) {
                stats.pruned += 1;
                continue;
            }

            let state = node.state;
            if state.is_terminal() {
                if cfg!(debug_assertions)
                    && let Err(overlap) = state.check_overlaps()
                {
                    panic!("cut generation produced overlapping panels: {overlap}");
                }
                if best.as_deref().is_none_or(|b| is_better(&state, b)) {
                    tracing::debug!(
                        cost = %state.cost(),
                        sheets = state.bought().len(),
                        cuts = state.cuts(),
                        "new best cut pattern"
                    );
                    best = Some(state);
                }
                continue;
            }

            let rank = (state.cost(), state.bought().len(), state.cuts());
            match closed.entry(state.signature()) {
                Entry::Occupied(seen) if *seen.get() <= rank => {
                    stats.duplicates += 1;
                    continue;
                }
                Entry::Occupied(mut seen) => {
                    seen.insert(rank);
                }
                Entry::Vacant(slot) => {
                    slot.insert(rank);
                }
            }

            stats.expanded += 1;
            let successors = state.successors(&self.supplier);
            if successors.is_empty() {
                stats.dead_ends += 1;
                tracing::trace!(
                    unsatisfied = state.unsatisfied().len(),
                    stock = state.stock().len(),
                    "dead end"
                );
                continue;
            }
            for next in successors {
                stats.generated += 1;
                let node = self.node(next, &mut seq);
                if beyond_bound(node.priority.0, best.as_deref()) {
                    stats.pruned += 1;
                    continue;
                }
                frontier.push(node);
            }
        }

        stats.elapsed_ms = started.elapsed().as_millis() as u64;
        match best {
            Some(state) => {
                tracing::info!(
                    cost = %state.cost(),
                    sheets = state.bought().len(),
                    cuts = state.cuts(),
                    expanded = stats.expanded,
                    ?status,
                    "cut search finished"
                );
                Ok(Solution { state, status, stats })
            }
            None if status == SearchStatus::BudgetExceeded => {
                tracing::info!(expanded = stats.expanded, "cut search stopped without a solution");
                Err(SearchError::BudgetExceeded {
                    expanded: stats.expanded,
                })
            }
            None => {
                tracing::info!(
                    expanded = stats.expanded,
                    dead_ends = stats.dead_ends,
                    "cut search exhausted without a solution"
                );
                Err(SearchError::NoSolution {
                    reason: "every cut sequence dead-ends before all wants are met".to_string(),
                    expanded: stats.expanded,
                })
            }
        }
    }

    /// Every want must fit some catalog entry in an orientation it accepts.
    fn check_feasible(&self) -> Result<(), SearchError> {
        for want in &self.wants {
            let Want::Wanted(wanted) = want else {
                continue;
            };
            if self.supplier.hosts(want).next().is_none() {
                tracing::info!(want = wanted.label(), size = %wanted.rect(), "want fits no stock");
                return Err(SearchError::NoSolution {
                    reason: format!(
                        "'{}' ({} {}) fits no panel sold by {}",
                        wanted.label(),
                        wanted.rect(),
                        wanted.stock(),
                        self.supplier.name()
                    ),
                    expanded: 0,
                });
            }
        }
        Ok(())
    }

    fn node(&self, state: SearchState, seq: &mut u64) -> Node {
        let priority = state.cost().cents() as f64 + state.lower_bound(&self.supplier);
        *seq += 1;
        Node {
            priority: OrderedFloat(priority),
            seq: *seq,
            state: Arc::new(state),
        }
    }
}

fn beyond_bound(priority: f64, best: Option<&SearchState>) -> bool {
    best.is_some_and(|b| priority > b.cost().cents() as f64 + PRIORITY_EPSILON)
}

/// Cheaper wins; equal cost prefers fewer sheets, then fewer cuts.
fn is_better(candidate: &SearchState, best: &SearchState) -> bool {
    let rank = |s: &SearchState| (s.cost(), s.bought().len(), s.cuts());
    rank(candidate) < rank(best)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    use crate::panel::{AvailablePanel, CuttablePanel, check_overlaps};
    use crate::types::{Rect, Stock};

    fn birch() -> Stock {
        Stock::new("Baltic Birch", 2)
    }

    fn supplier(kerf: u32, cost_per_cut: u64, sheets: &[(u32, u32, u64)]) -> Supplier {
        let available = sheets
            .iter()
            .map(|&(l, w, cents)| {
                let rect = Rect::new(l, w);
                AvailablePanel::new(format!("{l}x{w}"), birch(), rect, Money::from_cents(cents))
                    .unwrap()
            })
            .collect();
        Supplier::new("test", kerf, Money::from_cents(cost_per_cut), available).unwrap()
    }

    fn solve(s: &Supplier, demands: &[Demand]) -> Solution {
        Solver::new(s.clone(), demands).unwrap().solve().unwrap()
    }

    fn demand(label: &str, l: u32, w: u32, qty: u32, flippable: bool) -> Demand {
        Demand::builder(label)
            .length(l)
            .width(w)
            .material("Baltic Birch")
            .thickness(2)
            .quantity(qty)
            .flippable(flippable)
            .build()
            .unwrap()
    }

    /// Validates a complete solution:
    /// 1. Every finished panel lies within its sheet
    /// 2. No two panels from the same sheet overlap
    /// 3. Every want was finished exactly once
    /// 4. The cost is the sum of sheet prices and cut charges
    fn assert_solution_valid(sol: &Solution, s: &Supplier, expected_pieces: usize) {
        assert!(sol.state.is_terminal());
        assert_eq!(
            sol.finished().len(),
            expected_pieces,
            "expected {} pieces finished, got {}",
            expected_pieces,
            sol.finished().len()
        );

        for f in sol.finished() {
            let p = f.panel();
            let sheet = p.progenitor().rect();
            assert!(
                p.x() + p.rect().length <= sheet.length && p.y() + p.rect().width <= sheet.width,
                "{} ({} @ ({},{})) exceeds sheet {}",
                f.label(),
                p.rect(),
                p.x(),
                p.y(),
                sheet
            );
            assert_eq!(p.rect(), f.want().rect());
        }

        let all: Vec<&CuttablePanel> = sol
            .finished()
            .iter()
            .map(|f| &**f.panel())
            .chain(sol.state.scrapped().iter().map(|s| &**s.panel()))
            .collect();
        check_overlaps(all).unwrap();

        let ids: HashSet<_> = sol.finished().iter().map(|f| f.want().wanted().id()).collect();
        assert_eq!(ids.len(), expected_pieces, "a want was finished twice");

        let expected_cost: Money = sol.bought().iter().map(|b| s.purchase_cost(b)).sum::<Money>()
            + s.cost_per_cut().times(sol.cuts() as u64);
        assert_eq!(sol.cost(), expected_cost);
    }

    #[test]
    fn test_single_piece() {
        let s = supplier(0, 100, &[(100, 100, 1000)]);
        let sol = solve(&s, &[demand("a", 50, 50, 1, true)]);
        assert_solution_valid(&sol, &s, 1);
        assert_eq!(sol.sheet_count(), 1);
        assert_eq!(sol.cuts(), 2);
        assert!(sol.is_exhaustive());
    }

    #[test]
    fn test_exact_fit_four_pieces() {
        let s = supplier(0, 100, &[(100, 100, 1000)]);
        let sol = solve(&s, &[demand("q", 50, 50, 4, false)]);
        assert_solution_valid(&sol, &s, 4);
        assert_eq!(sol.sheet_count(), 1);
        assert_eq!(sol.cuts(), 3);
        assert_eq!(sol.cost(), Money::from_cents(1300));
        assert!((sol.total_waste_percent() - 0.0).abs() < 0.01);
    }

    #[test]
    fn test_needs_two_sheets() {
        let s = supplier(0, 100, &[(100, 100, 1000)]);
        let sol = solve(&s, &[demand("big", 60, 60, 2, false)]);
        assert_solution_valid(&sol, &s, 2);
        assert_eq!(sol.sheet_count(), 2);
        assert_eq!(sol.cost(), Money::from_cents(2400));
    }

    #[test]
    fn test_kerf_reduces_capacity() {
        // Without kerf two 50x100 strips come from one sheet.
        let s = supplier(0, 100, &[(100, 100, 1000)]);
        let sol = solve(&s, &[demand("strip", 50, 100, 2, false)]);
        assert_solution_valid(&sol, &s, 2);
        assert_eq!(sol.sheet_count(), 1);

        // With a kerf of 5 the second strip is 45 wide; a second sheet is needed.
        let s = supplier(5, 100, &[(100, 100, 1000)]);
        let sol = solve(&s, &[demand("strip", 50, 100, 2, false)]);
        assert_solution_valid(&sol, &s, 2);
        assert_eq!(sol.sheet_count(), 2);
    }

    #[test]
    fn test_flip_lets_piece_fit() {
        let s = supplier(0, 100, &[(100, 50, 1000)]);
        let err = Solver::new(s.clone(), &[demand("tall", 50, 100, 1, false)]).unwrap().solve();
        assert!(matches!(err, Err(SearchError::NoSolution { .. })));

        let sol = solve(&s, &[demand("tall", 50, 100, 1, true)]);
        assert_solution_valid(&sol, &s, 1);
        assert!(sol.finished()[0].want().is_flipped());
        assert_eq!(sol.cuts(), 0);
    }

    #[test]
    fn test_prefers_cheaper_sheet() {
        let s = supplier(1, 150, &[(480, 480, 8400), (480, 240, 5100), (240, 240, 3600)]);
        let sol = solve(&s, &[demand("bottom", 96, 48, 1, false)]);
        assert_solution_valid(&sol, &s, 1);
        assert_eq!(sol.bought()[0].available().label(), "240x240");
        assert_eq!(sol.cost(), Money::from_cents(3900));
    }

    #[test]
    fn test_cuts_can_beat_a_second_sheet() {
        // Two 40x100 wants: one sheet plus a cut is cheaper than two sheets.
        let s = supplier(0, 100, &[(100, 100, 1000), (40, 100, 700)]);
        let sol = solve(&s, &[demand("w", 40, 100, 2, false)]);
        assert_solution_valid(&sol, &s, 2);
        assert_eq!(sol.cost(), Money::from_cents(1200));
    }

    #[test]
    fn test_tie_break_prefers_fewer_sheets() {
        // One 100x100 sheet + 1 cut costs the same as two exact 50x100 sheets.
        let s = supplier(0, 500, &[(100, 100, 1000), (50, 100, 750)]);
        let sol = solve(&s, &[demand("half", 50, 100, 2, false)]);
        assert_solution_valid(&sol, &s, 2);
        assert_eq!(sol.cost(), Money::from_cents(1500));
        assert_eq!(sol.sheet_count(), 1);
    }

    #[test]
    fn test_no_demands() {
        let s = supplier(0, 100, &[(100, 100, 1000)]);
        let sol = solve(&s, &[]);
        assert_solution_valid(&sol, &s, 0);
        assert_eq!(sol.cost(), Money::ZERO);
    }

    #[test]
    fn test_incompatible_material_has_no_solution() {
        let s = supplier(0, 100, &[(100, 100, 1000)]);
        let mdf = Demand::builder("mdf")
            .length(10)
            .width(10)
            .material("MDF")
            .thickness(2)
            .build()
            .unwrap();
        let err = Solver::new(s, &[mdf]).unwrap().solve().unwrap_err();
        assert!(matches!(err, SearchError::NoSolution { expanded: 0, .. }));
    }

    #[test]
    fn test_budget_exceeded_reports_best_so_far_or_error() {
        let s = supplier(1, 150, &[(480, 240, 5100)]);
        let demands = [demand("side", 92, 30, 2, true), demand("end", 44, 30, 2, true)];
        let err = Solver::new(s.clone(), &demands)
            .unwrap()
            .with_budget(SearchBudget::default().with_max_expanded(0))
            .solve();
        assert!(matches!(err, Err(SearchError::BudgetExceeded { expanded: 0 })));

        let cancel = Arc::new(AtomicBool::new(true));
        let err = Solver::new(s, &demands)
            .unwrap()
            .with_budget(SearchBudget::unlimited().with_cancel_flag(cancel))
            .solve();
        assert!(matches!(err, Err(SearchError::BudgetExceeded { .. })));
    }

    #[test]
    fn test_solution_cost_matches_optimum_for_strips() {
        // Three 30-wide strips across a 100-long sheet with kerf 2: two cuts.
        let s = supplier(2, 100, &[(100, 94, 2000)]);
        let sol = solve(&s, &[demand("strip", 100, 30, 3, false)]);
        assert_solution_valid(&sol, &s, 3);
        assert_eq!(sol.cuts(), 2);
        assert_eq!(sol.cost(), Money::from_cents(2200));
        assert!(sol.stats.expanded > 0);
    }

    #[test]
    fn test_kerf_sliver_forces_second_sheet() {
        // After either cut the 100x101 sheet's leftover is 1 wider than the
        // other piece, which equals the kerf, so a second sheet is needed.
        let s = supplier(1, 150, &[(100, 101, 1000)]);
        let demands = [demand("a", 100, 50, 1, false), demand("b", 100, 49, 1, false)];
        let sol = solve(&s, &demands);
        assert_solution_valid(&sol, &s, 2);
        assert_eq!(sol.sheet_count(), 2);
        assert_eq!(sol.cuts(), 2);
        assert_eq!(sol.cost(), Money::from_cents(2300));
        assert!(sol.is_exhaustive());
    }

    #[test]
    fn test_want_needing_a_kerf_sliver_has_no_solution() {
        let s = supplier(1, 150, &[(100, 101, 1000)]);
        let err = Solver::new(s, &[demand("shelf", 100, 100, 1, false)]).unwrap().solve();
        assert!(matches!(err, Err(SearchError::NoSolution { expanded: 0, .. })));
    }

    #[test]
    fn test_node_ordering_is_min_heap_fifo() {
        let state = Arc::new(SearchState::initial(Vec::new()));
        let mut heap = BinaryHeap::new();
        for (seq, p) in [(1, 5.0), (2, 1.0), (3, 1.0), (4, 3.0)] {
            heap.push(Node {
                priority: OrderedFloat(p),
                seq,
                state: Arc::clone(&state),
            });
        }
        let order: Vec<u64> = std::iter::from_fn(|| heap.pop().map(|n| n.seq)).collect();
        assert_eq!(order, vec![2, 3, 4, 1]);
    }
}
