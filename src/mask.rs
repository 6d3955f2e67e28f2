//! Raster opacity masks and the sources they are decoded from.
//!
//! A mask is a 2D array of non-negative opacities with shape
//! `(height, width)`, row 0 being the top row of the source image. A pixel
//! with opacity greater than zero is occupied.
//!
//! Decoding is done once, when a volume is built. Sources:
//! - [`ImageFile`]: any image format understood by the `image` crate, using
//!   the alpha channel of its RGBA conversion
//! - [`InMemory`]: an already decoded mask with a descriptive label

use anyhow::{bail, Context, Result};
use ndarray::Array2;
use std::path::{Path, PathBuf};


/// Decoded per-pixel opacity.
#[derive(Debug, Clone, PartialEq)]
pub struct Mask {
    opacity: Array2<f32>,
}

impl Mask {
    /// Wraps an opacity array of shape `(height, width)`.
    pub fn new(opacity: Array2<f32>) -> Result<Self> {
        let (height, width) = opacity.dim();
        if height == 0 || width == 0 {
            bail!("mask has no pixels ({}x{})", width, height);
        }
        if let Some(bad) = opacity.iter().find(|v| !(**v >= 0.0)) {
            bail!("mask opacity must be non-negative, found {}", bad);
        }
        Ok(Self { opacity })
    }

    pub fn width(&self) -> usize {
        self.opacity.ncols()
    }

    pub fn height(&self) -> usize {
        self.opacity.nrows()
    }

    /// Opacity at `(row, col)`, or `None` outside the raster.
    pub fn opacity(&self, row: usize, col: usize) -> Option<f32> {
        self.opacity.get((row, col)).copied()
    }

    /// Number of occupied pixels.
    pub fn occupied(&self) -> usize {
        self.opacity.iter().filter(|v| **v > 0.0).count()
    }

    pub fn as_array(&self) -> &Array2<f32> {
        &self.opacity
    }
}

/// Something that can produce a [`Mask`].
pub trait MaskSource {
    /// Identifier reported in image descriptors, e.g. a file path.
    fn reference(&self) -> String;

    fn decode(&self) -> Result<Mask>;
}

/// Mask stored as an image file on disk.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageFile {
    path: PathBuf,
}

impl ImageFile {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl MaskSource for ImageFile {
    fn reference(&self) -> String {
        self.path.display().to_string()
    }

    fn decode(&self) -> Result<Mask> {
        let image = image::open(&self.path)
            .with_context(|| format!("failed to decode mask image '{}'", self.path.display()))?
            .to_rgba8();
        let (width, height) = image.dimensions();
        log::debug!(
            "decoded mask '{}' ({}x{})",
            self.path.display(),
            width,
            height
        );

        let opacity = Array2::from_shape_fn((height as usize, width as usize), |(row, col)| {
            f32::from(image.get_pixel(col as u32, row as u32).0[3]) / 255.0
        });

        Mask::new(opacity).with_context(|| format!("invalid mask image '{}'", self.path.display()))
    }
}

/// Mask that is already decoded.
#[derive(Debug, Clone, PartialEq)]
pub struct InMemory {
    label: String,
    mask: Mask,
}

impl InMemory {
    pub fn new(label: impl Into<String>, mask: Mask) -> Self {
        Self {
            label: label.into(),
            mask,
        }
    }
}

impl MaskSource for InMemory {
    fn reference(&self) -> String {
        self.label.clone()
    }

    fn decode(&self) -> Result<Mask> {
        Ok(self.mask.clone())
    }
}
