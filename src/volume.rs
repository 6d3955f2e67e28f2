//! Mask-backed volumes and the query interface shared with composites.
//!
//! Every region of the geometry, whether a single [`Volume`] or a
//! [`MotherVolume`](crate::containment::MotherVolume) holding a tree of
//! them, implements [`Geometry`]. Point queries never fail: outside any
//! volume they return `false`, an empty sequence or [`OUTSIDE`].

use anyhow::{Context, Result};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

use crate::bbox::BBox;
use crate::geom::MaskGeometry;
use crate::mask::{ImageFile, MaskSource};
use crate::material::Material;

/// Default scale, in pixels per world unit.
pub const DEFAULT_S2PX: f64 = 1e3;

/// `(mean excitation potential, electron density)` reported where there is
/// no material. The potential is tiny but non-zero so that logarithms of it
/// stay finite.
pub const OUTSIDE: (f64, f64) = (1e-30, 0.0);


/// Mask source and world-space bounding box of one volume, for renderers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageDescriptor {
    pub source: String,
    pub bbox: BBox,
}

/// Point queries shared by single volumes and composites.
pub trait Geometry: Send + Sync + fmt::Debug {
    /// Bounding box in the local frame, `None` if the region is empty.
    fn bbox(&self) -> Option<BBox>;

    /// The leaf volume occupying `(x, y)`, if any.
    fn resolve(&self, x: f64, y: f64) -> Option<&Volume>;

    fn is_inside(&self, x: f64, y: f64) -> bool {
        self.resolve(x, y).is_some()
    }

    /// Closed bounding-box test, without mask lookups.
    fn is_in_bbox(&self, x: f64, y: f64) -> bool {
        self.bbox().is_some_and(|bbox| bbox.contains_closed(x, y))
    }

    /// Mean excitation potential and electron density at `(x, y)`, or
    /// [`OUTSIDE`] if no volume occupies the point.
    fn excitation_and_density(&self, x: f64, y: f64) -> (f64, f64) {
        match self.resolve(x, y) {
            Some(volume) => (
                volume.material.mean_excitation_potential(),
                volume.material.electron_density(),
            ),
            None => OUTSIDE,
        }
    }

    fn neutron_mean_free_path(&self, x: f64, y: f64, energy: f64) -> Vec<f64> {
        self.resolve(x, y)
            .map_or_else(Vec::new, |volume| volume.material.neutron_mean_free_path(energy))
    }

    fn gamma_mean_free_path(&self, x: f64, y: f64, energy: f64) -> Vec<f64> {
        self.resolve(x, y)
            .map_or_else(Vec::new, |volume| volume.material.gamma_mean_free_path(energy))
    }

    fn image_descriptors(&self) -> Vec<ImageDescriptor>;

    fn names(&self) -> Vec<String>;
}

/// A single region: a mask geometry filled with one material.
#[derive(Debug, Clone)]
pub struct Volume {
    name: String,
    source: String,
    geometry: MaskGeometry,
    material: Arc<dyn Material>,
}

impl Volume {
    /// Decodes `source` and places it at the origin with `scale` pixels per
    /// world unit.
    pub fn new(
        source: &dyn MaskSource,
        name: impl Into<String>,
        material: Arc<dyn Material>,
        scale: f64,
    ) -> Result<Self> {
        let name = name.into();
        let reference = source.reference();
        let mask = source
            .decode()
            .with_context(|| format!("failed to load mask for volume '{}'", name))?;
        if mask.occupied() == 0 {
            log::warn!("mask '{}' of volume '{}' has no occupied pixels", reference, name);
        }
        let geometry = MaskGeometry::new(mask, scale)
            .with_context(|| format!("invalid geometry for volume '{}'", name))?;
        log::debug!("volume '{}' spans {}", name, geometry.bbox());

        Ok(Self {
            name,
            source: reference,
            geometry,
            material,
        })
    }

    /// Builds a volume from an image file.
    pub fn from_file(
        path: impl AsRef<std::path::Path>,
        name: impl Into<String>,
        material: Arc<dyn Material>,
        scale: f64,
    ) -> Result<Self> {
        Self::new(&ImageFile::new(path), name, material, scale)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn geometry(&self) -> &MaskGeometry {
        &self.geometry
    }

    pub fn material(&self) -> &Arc<dyn Material> {
        &self.material
    }
}

impl Geometry for Volume {
    fn bbox(&self) -> Option<BBox> {
        Some(self.geometry.bbox())
    }

    fn resolve(&self, x: f64, y: f64) -> Option<&Volume> {
        self.geometry.contains(x, y).then_some(self)
    }

    fn is_inside(&self, x: f64, y: f64) -> bool {
        self.geometry.contains(x, y)
    }

    fn is_in_bbox(&self, x: f64, y: f64) -> bool {
        self.geometry.contains_closed(x, y)
    }

    fn image_descriptors(&self) -> Vec<ImageDescriptor> {
        vec![ImageDescriptor {
            source: self.source.clone(),
            bbox: self.geometry.bbox(),
        }]
    }

    fn names(&self) -> Vec<String> {
        vec![self.name.clone()]
    }
}
