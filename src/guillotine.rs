use std::sync::Arc;

use crate::panel::{CuttablePanel, PanelShape};
use crate::types::{Axis, Length, Money, Rect};

/// The two offcuts of one kerfed, edge-to-edge cut.
#[derive(Debug, Clone)]
pub struct Cut {
    /// Extent `at` along the cut axis, at the parent's origin.
    pub piece: CuttablePanel,
    /// What is left beyond the kerf strip.
    pub remainder: CuttablePanel,
    pub cost: Money,
}

/// Cuts `panel` at distance `at` from its origin along `axis`.
///
/// Returns `None` unless both sides of the kerf keep a non-zero extent.
pub fn cut(
    panel: &Arc<CuttablePanel>,
    axis: Axis,
    at: Length,
    kerf: Length,
    cost_per_cut: Money,
) -> Option<Cut> {
    let rect = panel.rect();
    let extent = rect.extent(axis);
    if at == 0 || at >= extent {
        return None;
    }
    let consumed = at.checked_add(kerf)?;
    if consumed >= extent {
        return None;
    }
    let rest = extent - consumed;

    let (piece_rect, remainder_rect, rx, ry) = match axis {
        Axis::Length => (
            rect_with(rect.width, at, axis),
            rect_with(rect.width, rest, axis),
            panel.x() + consumed,
            panel.y(),
        ),
        Axis::Width => (
            rect_with(rect.length, at, axis),
            rect_with(rect.length, rest, axis),
            panel.x(),
            panel.y() + consumed,
        ),
    };

    Some(Cut {
        piece: CuttablePanel::offcut(panel, panel.x(), panel.y(), piece_rect, axis, at),
        remainder: CuttablePanel::offcut(panel, rx, ry, remainder_rect, axis, at),
        cost: cost_per_cut,
    })
}

fn rect_with(cross: Length, along: Length, axis: Axis) -> Rect {
    match axis {
        Axis::Length => Rect::new(along, cross),
        Axis::Width => Rect::new(cross, along),
    }
}
