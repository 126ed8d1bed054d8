//! The panel kinds a search moves through, and the predicates over them.
//!
//! A catalog [`AvailablePanel`] is bought ([`BoughtPanel`]), its sheet is cut
//! into [`CuttablePanel`] offcuts, and each offcut ends up either bound to a
//! [`Want`] as a [`FinishedPanel`] or discarded as a [`ScrappedPanel`].

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;

use crate::error::{PanelError, PanelOverlapError};
use crate::types::{Axis, Length, Money, PanelId, Rect, Stock};

/// Anything with a footprint and a stock kind.
pub trait PanelShape {
    fn rect(&self) -> Rect;
    fn stock(&self) -> &Stock;
}

/// Same material and same thickness, compared exactly.
pub fn compatible<A, B>(a: &A, b: &B) -> bool
where
    A: PanelShape + ?Sized,
    B: PanelShape + ?Sized,
{
    a.stock() == b.stock()
}

/// Whether `small` can be cut from `big` without rotating it.
pub fn fitsin<A, B>(small: &A, big: &B) -> bool
where
    A: PanelShape + ?Sized,
    B: PanelShape + ?Sized,
{
    small.rect().fits_in(&big.rect()) && compatible(small, big)
}

pub fn area<P: PanelShape + ?Sized>(panel: &P) -> u64 {
    panel.rect().area()
}

pub fn major<P: PanelShape + ?Sized>(panel: &P) -> Length {
    panel.rect().major()
}

pub fn minor<P: PanelShape + ?Sized>(panel: &P) -> Length {
    panel.rect().minor()
}

/// Orders panels by size: major side, then minor side. `smaller` says nothing
/// about whether one panel can be cut from the other.
pub fn smaller<A, B>(a: &A, b: &B) -> Ordering
where
    A: PanelShape + ?Sized,
    B: PanelShape + ?Sized,
{
    let (ra, rb) = (a.rect(), b.rect());
    ra.major()
        .cmp(&rb.major())
        .then(ra.minor().cmp(&rb.minor()))
        .then(ra.length.cmp(&rb.length))
}

/// A sheet the supplier sells. Supply is unlimited.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct AvailablePanel {
    label: String,
    stock: Stock,
    rect: Rect,
    cost: Money,
}

impl AvailablePanel {
    pub fn new(
        label: impl Into<String>,
        stock: Stock,
        rect: Rect,
        cost: Money,
    ) -> Result<Self, PanelError> {
        let label = label.into();
        validate(&label, &stock, rect)?;
        Ok(Self {
            label,
            stock,
            rect,
            cost,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn cost(&self) -> Money {
        self.cost
    }

    /// Price per unit of area, used as a lower bound on what covering area costs.
    pub fn cost_per_area(&self) -> f64 {
        self.cost.cents() as f64 / self.rect.area() as f64
    }
}

impl PanelShape for AvailablePanel {
    fn rect(&self) -> Rect {
        self.rect
    }

    fn stock(&self) -> &Stock {
        &self.stock
    }
}

/// One purchased sheet. Its id keeps it apart from every other sheet of the
/// same catalog entry.
#[derive(Debug, PartialEq, Eq, Hash, Serialize)]
pub struct BoughtPanel {
    id: PanelId,
    available: Arc<AvailablePanel>,
}

impl BoughtPanel {
    pub fn purchase(available: &Arc<AvailablePanel>) -> Arc<Self> {
        Arc::new(Self {
            id: PanelId::next(),
            available: Arc::clone(available),
        })
    }

    pub fn id(&self) -> PanelId {
        self.id
    }

    pub fn available(&self) -> &Arc<AvailablePanel> {
        &self.available
    }

    pub fn cost(&self) -> Money {
        self.available.cost
    }

    /// The whole sheet as a panel ready for its first cut.
    pub fn sheet(self: &Arc<Self>) -> CuttablePanel {
        CuttablePanel {
            id: PanelId::next(),
            x: 0,
            y: 0,
            rect: self.available.rect,
            stock: self.available.stock.clone(),
            progenitor: Arc::clone(self),
            cut_from: None,
        }
    }
}

impl PanelShape for BoughtPanel {
    fn rect(&self) -> Rect {
        self.available.rect
    }

    fn stock(&self) -> &Stock {
        &self.available.stock
    }
}

/// The cut that produced an offcut.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CutStep {
    pub parent: Arc<CuttablePanel>,
    pub axis: Axis,
    pub at: Length,
}

/// A rectangle of a bought sheet, positioned in that sheet's frame.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CuttablePanel {
    id: PanelId,
    x: Length,
    y: Length,
    rect: Rect,
    stock: Stock,
    progenitor: Arc<BoughtPanel>,
    cut_from: Option<CutStep>,
}

impl CuttablePanel {
    pub(crate) fn offcut(
        parent: &Arc<CuttablePanel>,
        x: Length,
        y: Length,
        rect: Rect,
        axis: Axis,
        at: Length,
    ) -> Self {
        Self {
            id: PanelId::next(),
            x,
            y,
            rect,
            stock: parent.stock.clone(),
            progenitor: Arc::clone(&parent.progenitor),
            cut_from: Some(CutStep {
                parent: Arc::clone(parent),
                axis,
                at,
            }),
        }
    }

    pub fn id(&self) -> PanelId {
        self.id
    }

    pub fn x(&self) -> Length {
        self.x
    }

    pub fn y(&self) -> Length {
        self.y
    }

    pub fn progenitor(&self) -> &Arc<BoughtPanel> {
        &self.progenitor
    }

    pub fn cut_from(&self) -> Option<&CutStep> {
        self.cut_from.as_ref()
    }

    /// The cuts from the bought sheet down to this panel, first cut first.
    pub fn cut_history(&self) -> Vec<(Axis, Length)> {
        let mut steps = Vec::new();
        let mut current = self.cut_from.as_ref();
        while let Some(step) = current {
            steps.push((step.axis, step.at));
            current = step.parent.cut_from.as_ref();
        }
        steps.reverse();
        steps
    }

    fn overlaps(&self, other: &CuttablePanel) -> bool {
        self.x < other.x + other.rect.length
            && other.x < self.x + self.rect.length
            && self.y < other.y + other.rect.width
            && other.y < self.y + self.rect.width
    }
}

impl PanelShape for CuttablePanel {
    fn rect(&self) -> Rect {
        self.rect
    }

    fn stock(&self) -> &Stock {
        &self.stock
    }
}

/// A panel somebody needs. Use [`Demand`] to ask for several at once.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct WantedPanel {
    id: PanelId,
    label: String,
    rect: Rect,
    stock: Stock,
    flippable: bool,
}

impl WantedPanel {
    pub fn new(label: impl Into<String>, rect: Rect, stock: Stock) -> Result<Self, PanelError> {
        let label = label.into();
        validate(&label, &stock, rect)?;
        Ok(Self {
            id: PanelId::next(),
            label,
            rect,
            stock,
            flippable: false,
        })
    }

    pub fn id(&self) -> PanelId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Whether a [`FlippedPanel`] counterpart was issued for this want.
    pub fn flippable(&self) -> bool {
        self.flippable
    }
}

impl PanelShape for WantedPanel {
    fn rect(&self) -> Rect {
        self.rect
    }

    fn stock(&self) -> &Stock {
        &self.stock
    }
}

/// A want that may be satisfied with length and width swapped.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct FlippedPanel {
    id: PanelId,
    wanted: Arc<WantedPanel>,
}

impl FlippedPanel {
    pub fn id(&self) -> PanelId {
        self.id
    }

    pub fn wanted(&self) -> &Arc<WantedPanel> {
        &self.wanted
    }
}

impl PanelShape for FlippedPanel {
    fn rect(&self) -> Rect {
        self.wanted.rect.flipped()
    }

    fn stock(&self) -> &Stock {
        &self.wanted.stock
    }
}

/// One entry in a state's set of unsatisfied wants.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Want {
    Wanted(Arc<WantedPanel>),
    Flipped(Arc<FlippedPanel>),
}

impl Want {
    pub fn wanted(&self) -> &Arc<WantedPanel> {
        match self {
            Want::Wanted(w) => w,
            Want::Flipped(f) => &f.wanted,
        }
    }

    pub fn label(&self) -> &str {
        &self.wanted().label
    }

    pub fn id(&self) -> PanelId {
        match self {
            Want::Wanted(w) => w.id,
            Want::Flipped(f) => f.id,
        }
    }

    pub fn is_flipped(&self) -> bool {
        matches!(self, Want::Flipped(_))
    }

    /// True for an entry and its counterpart; finishing one retires both.
    pub fn retires(&self, other: &Want) -> bool {
        self.wanted().id == other.wanted().id
    }

    /// The counterpart entry, if this want was issued in both orientations.
    pub fn counterpart(&self) -> Option<Want> {
        match self {
            Want::Wanted(w) if w.flippable => Some(Want::Flipped(Arc::new(FlippedPanel {
                id: PanelId::next(),
                wanted: Arc::clone(w),
            }))),
            Want::Wanted(_) => None,
            Want::Flipped(f) => Some(Want::Wanted(Arc::clone(&f.wanted))),
        }
    }

    /// Whether `big` can still be turned into this want with kerfed cuts at
    /// the want's extents, in either orientation the want accepts.
    ///
    /// Along each axis the leftover must be zero or wider than the kerf; a
    /// sliver no wider than the kerf cannot be cut off.
    pub fn producible_from<P: PanelShape + ?Sized>(&self, big: &P, kerf: Length) -> bool {
        if !compatible(self, big) {
            return false;
        }
        let have = big.rect();
        let cuttable = |want: Rect| {
            want.fits_in(&have)
                && Axis::BOTH.into_iter().all(|axis| {
                    let leftover = have.extent(axis) - want.extent(axis);
                    leftover == 0 || leftover > kerf
                })
        };
        let rect = self.rect();
        cuttable(rect) || (self.wanted().flippable && cuttable(rect.flipped()))
    }
}

impl PanelShape for Want {
    fn rect(&self) -> Rect {
        match self {
            Want::Wanted(w) => w.rect(),
            Want::Flipped(f) => f.rect(),
        }
    }

    fn stock(&self) -> &Stock {
        match self {
            Want::Wanted(w) => w.stock(),
            Want::Flipped(f) => f.stock(),
        }
    }
}

/// The want plus, unless it is square, a [`FlippedPanel`] accepting the
/// swapped orientation.
pub fn or_flipped(mut wanted: WantedPanel) -> Vec<Want> {
    if wanted.rect.length == wanted.rect.width {
        return vec![Want::Wanted(Arc::new(wanted))];
    }
    wanted.flippable = true;
    let wanted = Arc::new(wanted);
    let flipped = FlippedPanel {
        id: PanelId::next(),
        wanted: Arc::clone(&wanted),
    };
    vec![Want::Wanted(wanted), Want::Flipped(Arc::new(flipped))]
}

/// Whether `candidate` can be bound to `want` without further cutting.
///
/// A want issued with a flipped counterpart also accepts the swapped
/// dimensions.
pub fn wants_match<P: PanelShape + ?Sized>(want: &Want, candidate: &P) -> bool {
    if !compatible(want, candidate) {
        return false;
    }
    let have = candidate.rect();
    have == want.rect() || (want.wanted().flippable && have == want.rect().flipped())
}

/// Several identical wants, with named optional fields.
///
/// Defaults: `quantity` 1, `flippable` false. `quantity` must lie in
/// `1..=Demand::MAX_QUANTITY`.
#[derive(Debug, Clone)]
pub struct Demand {
    pub label: String,
    pub rect: Rect,
    pub stock: Stock,
    pub quantity: u32,
    pub flippable: bool,
}

impl Demand {
    /// Each unit becomes its own want before the search starts, so the
    /// count is bounded up front.
    pub const MAX_QUANTITY: u32 = 10_000;

    pub fn builder(label: impl Into<String>) -> DemandBuilder {
        DemandBuilder {
            label: label.into(),
            length: 0,
            width: 0,
            material: None,
            thickness: 0,
            quantity: 1,
            flippable: false,
        }
    }

    /// One entry per unit of quantity, each with its own id, and the flipped
    /// counterparts where flipping is allowed.
    pub fn expand(&self) -> Result<Vec<Want>, PanelError> {
        check_quantity(&self.label, self.quantity)?;
        let mut wants = Vec::new();
        for _ in 0..self.quantity {
            let wanted = WantedPanel::new(self.label.clone(), self.rect, self.stock.clone())?;
            if self.flippable {
                wants.extend(or_flipped(wanted));
            } else {
                wants.push(Want::Wanted(Arc::new(wanted)));
            }
        }
        Ok(wants)
    }
}

#[derive(Debug, Clone)]
pub struct DemandBuilder {
    label: String,
    length: Length,
    width: Length,
    material: Option<String>,
    thickness: Length,
    quantity: u32,
    flippable: bool,
}

impl DemandBuilder {
    pub fn length(mut self, length: Length) -> Self {
        self.length = length;
        self
    }

    pub fn width(mut self, width: Length) -> Self {
        self.width = width;
        self
    }

    pub fn material(mut self, material: impl Into<String>) -> Self {
        self.material = Some(material.into());
        self
    }

    pub fn thickness(mut self, thickness: Length) -> Self {
        self.thickness = thickness;
        self
    }

    pub fn quantity(mut self, quantity: u32) -> Self {
        self.quantity = quantity;
        self
    }

    pub fn flippable(mut self, flippable: bool) -> Self {
        self.flippable = flippable;
        self
    }

    pub fn build(self) -> Result<Demand, PanelError> {
        let material = self
            .material
            .ok_or_else(|| PanelError::invalid(&self.label, "material is required"))?;
        let demand = Demand {
            rect: Rect::new(self.length, self.width),
            stock: Stock::new(material, self.thickness),
            quantity: self.quantity,
            flippable: self.flippable,
            label: self.label,
        };
        validate(&demand.label, &demand.stock, demand.rect)?;
        check_quantity(&demand.label, demand.quantity)?;
        Ok(demand)
    }
}

fn check_quantity(label: &str, quantity: u32) -> Result<(), PanelError> {
    if quantity == 0 {
        return Err(PanelError::invalid(label, "quantity must be non-zero"));
    }
    if quantity > Demand::MAX_QUANTITY {
        return Err(PanelError::invalid(
            label,
            format!("quantity {quantity} exceeds {}", Demand::MAX_QUANTITY),
        ));
    }
    Ok(())
}

/// A cut panel bound to the want it satisfies.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FinishedPanel {
    panel: Arc<CuttablePanel>,
    want: Want,
}

impl FinishedPanel {
    /// Binds `panel` to `want`. The panel must have the want's exact
    /// orientation.
    pub fn bind(panel: Arc<CuttablePanel>, want: Want) -> Result<Self, PanelError> {
        if !compatible(&*panel, &want) {
            return Err(PanelError::IncompatibleMaterial {
                label: want.label().to_string(),
                expected: want.stock().clone(),
                found: panel.stock.clone(),
            });
        }
        if panel.rect != want.rect() {
            return Err(PanelError::invalid(
                want.label(),
                format!("panel {} is {}, want is {}", panel.id, panel.rect, want.rect()),
            ));
        }
        Ok(Self { panel, want })
    }

    pub fn panel(&self) -> &Arc<CuttablePanel> {
        &self.panel
    }

    pub fn want(&self) -> &Want {
        &self.want
    }

    pub fn label(&self) -> &str {
        self.want.label()
    }
}

impl PanelShape for FinishedPanel {
    fn rect(&self) -> Rect {
        self.panel.rect
    }

    fn stock(&self) -> &Stock {
        &self.panel.stock
    }
}

/// An offcut too small for any remaining want.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScrappedPanel {
    panel: Arc<CuttablePanel>,
}

impl ScrappedPanel {
    pub fn new(panel: Arc<CuttablePanel>) -> Self {
        Self { panel }
    }

    pub fn panel(&self) -> &Arc<CuttablePanel> {
        &self.panel
    }
}

impl PanelShape for ScrappedPanel {
    fn rect(&self) -> Rect {
        self.panel.rect
    }

    fn stock(&self) -> &Stock {
        &self.panel.stock
    }
}

/// Every kind of panel the search deals with.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Panel {
    Available(Arc<AvailablePanel>),
    Bought(Arc<BoughtPanel>),
    Cuttable(Arc<CuttablePanel>),
    Wanted(Arc<WantedPanel>),
    Flipped(Arc<FlippedPanel>),
    Finished(FinishedPanel),
    Scrapped(ScrappedPanel),
}

impl Panel {
    pub fn kind(&self) -> &'static str {
        match self {
            Panel::Available(_) => "available",
            Panel::Bought(_) => "bought",
            Panel::Cuttable(_) => "cuttable",
            Panel::Wanted(_) => "wanted",
            Panel::Flipped(_) => "flipped",
            Panel::Finished(_) => "finished",
            Panel::Scrapped(_) => "scrapped",
        }
    }

    /// Catalog entries are interchangeable and carry no id.
    pub fn id(&self) -> Option<PanelId> {
        match self {
            Panel::Available(_) => None,
            Panel::Bought(p) => Some(p.id),
            Panel::Cuttable(p) => Some(p.id),
            Panel::Wanted(p) => Some(p.id),
            Panel::Flipped(p) => Some(p.id),
            Panel::Finished(p) => Some(p.panel.id),
            Panel::Scrapped(p) => Some(p.panel.id),
        }
    }

    /// The cut panel behind this one, for kinds that occupy part of a sheet.
    pub fn as_cut(&self) -> Option<&Arc<CuttablePanel>> {
        match self {
            Panel::Cuttable(p) => Some(p),
            Panel::Finished(p) => Some(&p.panel),
            Panel::Scrapped(p) => Some(&p.panel),
            Panel::Available(_) | Panel::Bought(_) | Panel::Wanted(_) | Panel::Flipped(_) => None,
        }
    }
}

impl From<Want> for Panel {
    fn from(want: Want) -> Self {
        match want {
            Want::Wanted(w) => Panel::Wanted(w),
            Want::Flipped(f) => Panel::Flipped(f),
        }
    }
}

impl PanelShape for Panel {
    fn rect(&self) -> Rect {
        match self {
            Panel::Available(p) => p.rect(),
            Panel::Bought(p) => p.rect(),
            Panel::Cuttable(p) => p.rect(),
            Panel::Wanted(p) => p.rect(),
            Panel::Flipped(p) => p.rect(),
            Panel::Finished(p) => p.rect(),
            Panel::Scrapped(p) => p.rect(),
        }
    }

    fn stock(&self) -> &Stock {
        match self {
            Panel::Available(p) => p.stock(),
            Panel::Bought(p) => p.stock(),
            Panel::Cuttable(p) => p.stock(),
            Panel::Wanted(p) => p.stock(),
            Panel::Flipped(p) => p.stock(),
            Panel::Finished(p) => p.stock(),
            Panel::Scrapped(p) => p.stock(),
        }
    }
}

impl std::fmt::Display for Panel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.kind())?;
        if let Some(id) = self.id() {
            write!(f, " {id}")?;
        }
        write!(f, " {} {}", self.rect(), self.stock())
    }
}

/// The bought sheet a panel was cut from. Kinds without cut lineage are
/// their own progenitor.
pub fn progenitor(panel: &Panel) -> Panel {
    match panel {
        Panel::Cuttable(p) => Panel::Bought(Arc::clone(&p.progenitor)),
        Panel::Finished(p) => Panel::Bought(Arc::clone(&p.panel.progenitor)),
        Panel::Scrapped(p) => Panel::Bought(Arc::clone(&p.panel.progenitor)),
        Panel::Available(_) | Panel::Bought(_) | Panel::Wanted(_) | Panel::Flipped(_) => {
            panel.clone()
        }
    }
}

/// Checks that panels cut from the same sheet are pairwise disjoint.
///
/// Quadratic per sheet; meant for tests and debug assertions.
pub fn check_overlaps<'a, I>(panels: I) -> Result<(), PanelOverlapError>
where
    I: IntoIterator<Item = &'a CuttablePanel>,
{
    let mut by_sheet: HashMap<PanelId, Vec<&CuttablePanel>> = HashMap::new();
    for p in panels {
        by_sheet.entry(p.progenitor.id).or_default().push(p);
    }
    for (sheet, group) in by_sheet {
        for i in 0..group.len() {
            for j in (i + 1)..group.len() {
                let (a, b) = (group[i], group[j]);
                if a.overlaps(b) {
                    return Err(PanelOverlapError {
                        progenitor: sheet,
                        a: a.id,
                        a_rect: a.rect,
                        a_x: a.x,
                        a_y: a.y,
                        b: b.id,
                        b_rect: b.rect,
                        b_x: b.x,
                        b_y: b.y,
                    });
                }
            }
        }
    }
    Ok(())
}

fn validate(label: &str, stock: &Stock, rect: Rect) -> Result<(), PanelError> {
    if rect.is_degenerate() {
        return Err(PanelError::invalid(label, format!("{rect} has a zero side")));
    }
    if stock.thickness == 0 {
        return Err(PanelError::invalid(label, "thickness must be non-zero"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn birch() -> Stock {
        Stock::new("Baltic Birch", 2)
    }

    fn sheet(length: Length, width: Length) -> Arc<CuttablePanel> {
        let rect = Rect::new(length, width);
        let available =
            Arc::new(AvailablePanel::new("sheet", birch(), rect, Money::from_cents(5100)).unwrap());
        Arc::new(BoughtPanel::purchase(&available).sheet())
    }

    fn placed(
        parent: &Arc<CuttablePanel>,
        x: Length,
        y: Length,
        length: Length,
        width: Length,
    ) -> CuttablePanel {
        CuttablePanel::offcut(parent, x, y, Rect::new(length, width), Axis::Length, length)
    }

    fn want(length: Length, width: Length) -> WantedPanel {
        WantedPanel::new("w", Rect::new(length, width), birch()).unwrap()
    }

    #[test]
    fn test_compatible_is_exact() {
        let a = want(10, 10);
        let b = WantedPanel::new("b", Rect::new(10, 10), Stock::new("Baltic Birch", 3)).unwrap();
        let c = WantedPanel::new("c", Rect::new(10, 10), Stock::new("MDF", 2)).unwrap();
        assert!(compatible(&a, &want(1, 1)));
        assert!(!compatible(&a, &b));
        assert!(!compatible(&a, &c));
    }

    #[test]
    fn test_fitsin() {
        let big = sheet(480, 240);
        assert!(fitsin(&want(96, 48), &*big));
        assert!(fitsin(&want(480, 240), &*big));
        assert!(!fitsin(&want(240, 480), &*big));
        let mdf = WantedPanel::new("m", Rect::new(10, 10), Stock::new("MDF", 2)).unwrap();
        assert!(!fitsin(&mdf, &*big));
    }

    #[test]
    fn test_area_major_minor() {
        let w = want(92, 30);
        assert_eq!(area(&w), 2760);
        assert_eq!(major(&w), 92);
        assert_eq!(minor(&w), 30);
    }

    #[test]
    fn test_smaller_orders_by_major_then_minor() {
        assert_eq!(smaller(&want(10, 3), &want(4, 10)), Ordering::Less);
        assert_eq!(smaller(&want(9, 9), &want(3, 10)), Ordering::Less);
        assert_eq!(smaller(&want(12, 6), &want(12, 6)), Ordering::Equal);
    }

    #[test]
    fn test_progenitor() {
        let root = sheet(100, 50);
        let piece = Arc::new(placed(&root, 0, 0, 40, 50));
        let p = progenitor(&Panel::Cuttable(Arc::clone(&piece)));
        assert_eq!(p, Panel::Bought(Arc::clone(root.progenitor())));

        let w = Panel::Wanted(Arc::new(want(5, 5)));
        assert_eq!(progenitor(&w), w);
    }

    #[test]
    fn test_or_flipped_skips_square() {
        assert_eq!(or_flipped(want(5, 5)).len(), 1);
        let pair = or_flipped(want(12, 6));
        assert_eq!(pair.len(), 2);
        assert!(pair[0].retires(&pair[1]));
        assert_eq!(pair[1].rect(), Rect::new(6, 12));
    }

    #[test]
    fn test_wants_match_flip() {
        let root = sheet(12, 6);
        let upright = Arc::new(placed(&root, 0, 0, 6, 12));

        let fixed = Want::Wanted(Arc::new(want(12, 6)));
        assert!(!wants_match(&fixed, &*upright));
        assert!(wants_match(&fixed, &*root));

        let pair = or_flipped(want(12, 6));
        assert!(wants_match(&pair[0], &*upright));
        assert!(wants_match(&pair[1], &*upright));
        assert!(wants_match(&pair[1], &*root));
    }

    #[test]
    fn test_bind_rejects_mismatch() {
        let root = sheet(12, 6);
        let w = Want::Wanted(Arc::new(want(12, 6)));
        assert!(FinishedPanel::bind(Arc::clone(&root), w).is_ok());

        let mdf = Want::Wanted(Arc::new(
            WantedPanel::new("m", Rect::new(12, 6), Stock::new("MDF", 2)).unwrap(),
        ));
        assert!(matches!(
            FinishedPanel::bind(Arc::clone(&root), mdf),
            Err(PanelError::IncompatibleMaterial { .. })
        ));

        let wrong = Want::Wanted(Arc::new(want(6, 12)));
        assert!(matches!(
            FinishedPanel::bind(root, wrong),
            Err(PanelError::InvalidDimension { .. })
        ));
    }

    #[test]
    fn test_demand_expands_quantity() {
        let d = Demand::builder("side")
            .length(92)
            .width(30)
            .material("Baltic Birch")
            .thickness(2)
            .quantity(2)
            .flippable(true)
            .build()
            .unwrap();
        let wants = d.expand().unwrap();
        assert_eq!(wants.len(), 4);
        assert!(!wants[0].retires(&wants[2]));
        assert!(wants[0].retires(&wants[1]));
    }

    #[test]
    fn test_demand_quantity_is_bounded() {
        let side = || {
            Demand::builder("side")
                .length(92)
                .width(30)
                .material("Baltic Birch")
                .thickness(2)
        };
        assert!(side().quantity(0).build().is_err());
        assert!(side().quantity(Demand::MAX_QUANTITY).build().is_ok());
        assert!(matches!(
            side().quantity(4_000_000_000).build(),
            Err(PanelError::InvalidDimension { .. })
        ));

        let mut d = side().build().unwrap();
        d.quantity = Demand::MAX_QUANTITY + 1;
        assert!(d.expand().is_err());
    }

    #[test]
    fn test_producible_leaves_room_for_kerf() {
        let offcut = sheet(100, 50);
        let w = |l, wd| Want::Wanted(Arc::new(want(l, wd)));
        assert!(w(100, 50).producible_from(&*offcut, 1));
        assert!(w(100, 48).producible_from(&*offcut, 1));
        // The 1 wide leftover would vanish into the kerf.
        assert!(!w(100, 49).producible_from(&*offcut, 1));
        assert!(w(100, 49).producible_from(&*offcut, 0));
        assert!(!w(99, 49).producible_from(&*offcut, 1));
        assert!(!w(50, 100).producible_from(&*offcut, 0));

        let pair = or_flipped(want(50, 100));
        assert!(pair[0].producible_from(&*offcut, 1));
        let mdf = Want::Wanted(Arc::new(
            WantedPanel::new("m", Rect::new(10, 10), Stock::new("MDF", 2)).unwrap(),
        ));
        assert!(!mdf.producible_from(&*offcut, 0));
    }

    #[test]
    fn test_invalid_dimensions_rejected() {
        assert!(WantedPanel::new("w", Rect::new(0, 5), birch()).is_err());
        assert!(WantedPanel::new("w", Rect::new(5, 5), Stock::new("Baltic Birch", 0)).is_err());
        assert!(Demand::builder("no material").length(5).width(5).thickness(2).build().is_err());
    }

    #[test]
    fn test_check_overlaps_detects_overlap() {
        let root = sheet(100, 100);
        let a = placed(&root, 0, 0, 50, 50);
        let b = placed(&root, 50, 0, 50, 50);
        let c = placed(&root, 25, 25, 50, 50);
        assert!(check_overlaps([&a, &b]).is_ok());
        let err = check_overlaps([&a, &b, &c]).unwrap_err();
        assert_eq!(err.progenitor, root.progenitor().id());
    }

    #[test]
    fn test_different_sheets_never_overlap() {
        let a = sheet(100, 100);
        let b = sheet(100, 100);
        assert!(check_overlaps([&*a, &*b]).is_ok());
    }

    #[test]
    fn test_cut_history() {
        let root = sheet(100, 100);
        let strip = Arc::new(CuttablePanel::offcut(
            &root,
            0,
            0,
            Rect::new(40, 100),
            Axis::Length,
            40,
        ));
        let piece = CuttablePanel::offcut(&strip, 0, 0, Rect::new(40, 30), Axis::Width, 30);
        assert_eq!(piece.cut_history(), vec![(Axis::Length, 40), (Axis::Width, 30)]);
        assert_eq!(piece.progenitor().id(), root.progenitor().id());
    }
}
