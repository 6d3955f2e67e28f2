//! Material lookup in 2D radiation-transport geometries built from raster
//! masks.
//!
//! A [`Volume`] is an image mask filled with one [`Material`]. A
//! [`MotherVolume`] arranges volumes, and other mother volumes, at offsets;
//! where children overlap the one added last wins. Given a world-space point,
//! any [`Geometry`] resolves the occupying volume and reports the quantities a
//! particle transport routine needs: mean excitation potential, electron
//! density and mean free paths for neutrons and gammas.

pub mod bbox;
pub mod containment;
pub mod dosimetry;
pub mod geom;
pub mod mask;
pub mod material;
pub mod output;
pub mod scene;
pub mod settings;
pub mod survey;
pub mod units;
pub mod volume;

pub use bbox::BBox;
pub use containment::MotherVolume;
pub use dosimetry::quality_factor;
pub use material::{Material, TabulatedMaterial};
pub use volume::{Geometry, ImageDescriptor, Volume, OUTSIDE};
