use std::iter::Sum;
use std::ops::{Add, AddAssign};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A length in the caller's base unit (millimetres, 1/8 inch, ...).
///
/// Every extent, origin coordinate, thickness and kerf uses the same unit so
/// that cuts and matches stay exact.
pub type Length = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Rect {
    #[serde(deserialize_with = "deserialize_u32_from_number")]
    pub length: Length,
    #[serde(deserialize_with = "deserialize_u32_from_number")]
    pub width: Length,
}

impl Rect {
    pub fn new(length: Length, width: Length) -> Self {
        Self { length, width }
    }

    pub fn area(&self) -> u64 {
        self.length as u64 * self.width as u64
    }

    pub fn flipped(&self) -> Self {
        Self {
            length: self.width,
            width: self.length,
        }
    }

    pub fn fits_in(&self, other: &Rect) -> bool {
        self.length <= other.length && self.width <= other.width
    }

    pub fn major(&self) -> Length {
        self.length.max(self.width)
    }

    pub fn minor(&self) -> Length {
        self.length.min(self.width)
    }

    pub fn extent(&self, axis: Axis) -> Length {
        match axis {
            Axis::Length => self.length,
            Axis::Width => self.width,
        }
    }

    pub fn is_degenerate(&self) -> bool {
        self.length == 0 || self.width == 0
    }
}

impl std::fmt::Display for Rect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.length, self.width)
    }
}

/// The direction a saw travels across a panel is perpendicular to the axis
/// named here: a `Length` cut shortens the panel's length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    Length,
    Width,
}

impl Axis {
    pub const BOTH: [Axis; 2] = [Axis::Length, Axis::Width];

    pub fn other(self) -> Self {
        match self {
            Axis::Length => Axis::Width,
            Axis::Width => Axis::Length,
        }
    }
}

impl std::fmt::Display for Axis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Axis::Length => f.write_str("length"),
            Axis::Width => f.write_str("width"),
        }
    }
}

/// Material and thickness. Two panels are compatible iff their stock is equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Stock {
    pub material: Arc<str>,
    #[serde(deserialize_with = "deserialize_u32_from_number")]
    pub thickness: Length,
}

impl Stock {
    pub fn new(material: impl Into<Arc<str>>, thickness: Length) -> Self {
        Self {
            material: material.into(),
            thickness,
        }
    }
}

impl std::fmt::Display for Stock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.thickness, self.material)
    }
}

static NEXT_PANEL_ID: AtomicU64 = AtomicU64::new(0);

/// Distinguishes panels that are otherwise structurally identical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct PanelId(u64);

impl PanelId {
    /// Ids only need to be distinct within one run, so a relaxed counter is enough.
    pub fn next() -> Self {
        Self(NEXT_PANEL_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for PanelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An amount of money in cents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Money(u64);

impl Money {
    pub const ZERO: Money = Money(0);

    /// Largest amount accepted from outside: ten billion dollars.
    pub const MAX_DOLLARS: f64 = 1e10;

    pub fn from_cents(cents: u64) -> Self {
        Self(cents)
    }

    /// Rounds to the nearest cent. Negative, non-finite and amounts above
    /// [`Money::MAX_DOLLARS`] are `None`.
    pub fn from_dollars(dollars: f64) -> Option<Self> {
        if !dollars.is_finite() || !(0.0..=Self::MAX_DOLLARS).contains(&dollars) {
            return None;
        }
        Some(Self((dollars * 100.0).round() as u64))
    }

    pub fn cents(self) -> u64 {
        self.0
    }

    pub fn as_dollars(self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Saturates at `u64::MAX` cents, like addition.
    pub fn times(self, n: u64) -> Self {
        Self(self.0.saturating_mul(n))
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        self.0 = self.0.saturating_add(rhs.0);
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, Add::add)
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "${}.{:02}", self.0 / 100, self.0 % 100)
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_dollars())
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let dollars = f64::deserialize(deserializer)?;
        Money::from_dollars(dollars).ok_or_else(|| {
            serde::de::Error::custom(format!(
                "invalid amount {dollars}, expected a number from 0 to {}",
                Money::MAX_DOLLARS
            ))
        })
    }
}

/// Accepts `12` as well as `12.0` for length fields; JSON produced by other
/// tools often writes integral floats.
pub fn deserialize_u32_from_number<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let n = f64::deserialize(deserializer)?;
    if n.fract() != 0.0 || n < 0.0 || n > u32::MAX as f64 {
        return Err(serde::de::Error::custom(format!(
            "expected a non-negative whole number, got {n}"
        )));
    }
    Ok(n as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_major_minor() {
        let r = Rect::new(30, 60);
        assert_eq!(r.major(), 60);
        assert_eq!(r.minor(), 30);
        assert_eq!(r.flipped(), Rect::new(60, 30));
        assert_eq!(r.extent(Axis::Length), 30);
        assert_eq!(r.extent(Axis::Width), 60);
    }

    #[test]
    fn test_axis_other() {
        assert_eq!(Axis::Length.other(), Axis::Width);
        assert_eq!(Axis::Width.other(), Axis::Length);
    }

    #[test]
    fn test_money_dollars() {
        let m = Money::from_dollars(51.0).unwrap() + Money::from_dollars(1.5).unwrap();
        assert_eq!(m.cents(), 5250);
        assert_eq!(m.to_string(), "$52.50");
        assert!(Money::from_dollars(-1.0).is_none());
        assert!(Money::from_dollars(f64::NAN).is_none());
    }

    #[test]
    fn test_money_rejects_huge_amounts() {
        assert!(Money::from_dollars(1e30).is_none());
        assert!(Money::from_dollars(Money::MAX_DOLLARS).is_some());
        assert!(serde_json::from_str::<Money>("1e30").is_err());
        assert_eq!(serde_json::from_str::<Money>("84.0").unwrap(), Money::from_cents(8400));
    }

    #[test]
    fn test_money_arithmetic_saturates() {
        let max = Money::from_cents(u64::MAX);
        assert_eq!(max + Money::from_cents(1), max);
        let mut m = max;
        m += Money::from_cents(150);
        assert_eq!(m, max);
        assert_eq!(Money::from_cents(u64::MAX / 2).times(3), max);
        let total: Money = [max, max].into_iter().sum();
        assert_eq!(total, max);
    }

    #[test]
    fn test_rect_orders_by_length_then_width() {
        let mut rects = vec![Rect::new(2, 1), Rect::new(1, 5), Rect::new(2, 0)];
        rects.sort();
        assert_eq!(rects, vec![Rect::new(1, 5), Rect::new(2, 0), Rect::new(2, 1)]);
    }

    #[test]
    fn test_panel_ids_are_distinct() {
        let a = PanelId::next();
        let b = PanelId::next();
        assert_ne!(a, b);
        assert!(b > a);
    }

    #[test]
    fn test_deserialize_length_from_float() {
        let r: Rect = serde_json::from_str(r#"{"length": 480.0, "width": 240}"#).unwrap();
        assert_eq!(r, Rect::new(480, 240));
        assert!(serde_json::from_str::<Rect>(r#"{"length": 1.5, "width": 2}"#).is_err());
    }
}
