use anyhow::{bail, Result};

use crate::bbox::BBox;
use crate::mask::Mask;


/// A raster mask placed in world space.
///
/// The mask spans `(0, 0)` to `(width / scale, height / scale)`, where
/// `scale` is the number of pixels per world unit. The bounding box is
/// derived from the mask on construction and never set independently.
#[derive(Debug, Clone, PartialEq)]
pub struct MaskGeometry {
    mask: Mask,
    scale: f64,
    bbox: BBox,
}

impl MaskGeometry {
    pub fn new(mask: Mask, scale: f64) -> Result<Self> {
        if !(scale.is_finite() && scale > 0.0) {
            bail!("scale must be a positive number of pixels per unit, got {}", scale);
        }
        let bbox = Self::compute_bbox(&mask, scale);
        Ok(Self { mask, scale, bbox })
    }

    fn compute_bbox(mask: &Mask, scale: f64) -> BBox {
        BBox::new(
            0.0,
            0.0,
            mask.width() as f64 / scale,
            mask.height() as f64 / scale,
        )
    }

    pub fn bbox(&self) -> BBox {
        self.bbox
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn mask(&self) -> &Mask {
        &self.mask
    }

    /// Whether the pixel under `(x, y)` is occupied.
    ///
    /// Points outside the half-open bounding box are rejected without
    /// touching the mask. Mask row 0 is the top edge of the box.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        if !self.bbox.contains(x, y) {
            return false;
        }
        let col = (x * self.scale).floor() as usize;
        let pixel_y = (y * self.scale).floor() as usize;
        // rounding just below the upper edge can land one pixel past the raster
        let Some(row) = (self.mask.height() - 1).checked_sub(pixel_y) else {
            return false;
        };
        self.mask.opacity(row, col).is_some_and(|a| a > 0.0)
    }

    /// Closed bounding-box test only; the mask is not consulted.
    pub fn contains_closed(&self, x: f64, y: f64) -> bool {
        self.bbox.contains_closed(x, y)
    }
}
