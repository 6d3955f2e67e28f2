//! Axis-aligned bounding boxes in world units.

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};
use std::fmt;


/// Bounding box `(x0, y0, x1, y1)` with `x0 <= x1` and `y0 <= y1`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl BBox {
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self {
            x0: x0.min(x1),
            y0: y0.min(y1),
            x1: x1.max(x0),
            y1: y1.max(y0),
        }
    }

    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f64 {
        self.y1 - self.y0
    }

    /// Half-open membership test, `x0 <= x < x1` and `y0 <= y < y1`.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        (self.x0..self.x1).contains(&x) && (self.y0..self.y1).contains(&y)
    }

    /// Closed membership test, `x0 <= x <= x1` and `y0 <= y <= y1`.
    pub fn contains_closed(&self, x: f64, y: f64) -> bool {
        (self.x0..=self.x1).contains(&x) && (self.y0..=self.y1).contains(&y)
    }

    pub fn translated(&self, offset: &Vector2<f64>) -> Self {
        Self {
            x0: self.x0 + offset.x,
            y0: self.y0 + offset.y,
            x1: self.x1 + offset.x,
            y1: self.y1 + offset.y,
        }
    }

    /// Smallest box containing both `self` and `other`.
    pub fn union(&self, other: &BBox) -> Self {
        Self {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }

    /// Union over any number of boxes. There is no box enclosing nothing,
    /// so an empty input gives `None`.
    pub fn union_all<I>(boxes: I) -> Option<BBox>
    where
        I: IntoIterator<Item = BBox>,
    {
        boxes.into_iter().reduce(|acc, b| acc.union(&b))
    }
}

impl fmt::Display for BBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({:.6}, {:.6}, {:.6}, {:.6})",
            self.x0, self.y0, self.x1, self.y1
        )
    }
}
