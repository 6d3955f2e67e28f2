//! Survey of a loaded scene.
//!
//! A survey evaluates the geometry at a list of probe points and samples it
//! on a regular grid over the root bounding box. The grid is sampled in
//! parallel; the geometry is read-only once loaded, so every worker queries
//! the same tree.
//!
//! Outputs written by [`Survey::writeup`]:
//! - `volume_map`: index into the volume name list per cell, `-1` for none
//! - `density_map`: electron density per cell
//! - `probes.json`: the probe reports
//! - `descriptors.json`: mask sources and world-space boxes of all volumes

use std::collections::HashMap;
use std::time::Instant;

use anyhow::{Context, Result};
use chrono::Utc;
use indicatif::{ProgressBar, ProgressStyle};
use ndarray::Array2;
use rayon::prelude::*;
use serde::Serialize;

use crate::bbox::BBox;
use crate::containment::MotherVolume;
use crate::dosimetry::quality_factor;
use crate::output;
use crate::scene::load_scene;
use crate::settings::Settings;
use crate::units::KEV_PER_UM;
use crate::volume::{Geometry, ImageDescriptor};


/// Physics quantities at one probe point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProbeReport {
    pub point: [f64; 2],
    pub volume: Option<String>,
    pub mean_excitation_potential: f64,
    pub electron_density: f64,
    pub neutron_mfp: Vec<f64>,
    pub gamma_mfp: Vec<f64>,
}

/// Everything a survey computes.
#[derive(Debug, Clone, PartialEq)]
pub struct SurveyResult {
    pub names: Vec<String>,
    pub bbox: Option<BBox>,
    pub probes: Vec<ProbeReport>,
    /// Index into `names` per cell, `-1` where no volume resolves. Row 0 is
    /// the top of the box.
    pub volume_map: Array2<i64>,
    pub density_map: Array2<f64>,
    /// `(LET in keV/um, quality factor)` pairs.
    pub quality_factors: Vec<(f64, f64)>,
}

impl SurveyResult {
    pub fn new_empty() -> Self {
        Self {
            names: Vec::new(),
            bbox: None,
            probes: Vec::new(),
            volume_map: Array2::zeros((0, 0)),
            density_map: Array2::zeros((0, 0)),
            quality_factors: Vec::new(),
        }
    }

    pub fn print(&self) {
        match self.bbox {
            Some(bbox) => println!("Bounding box: {}", bbox),
            None => println!("Bounding box: none (no volumes)"),
        }
        println!("Volumes: {:?}", self.names);
        for probe in &self.probes {
            println!(
                "  ({:.6}, {:.6}): {:<12} I = {:.4e} J, n_e = {:.4e} /m^3, neutron mfp = {:?}, gamma mfp = {:?}",
                probe.point[0],
                probe.point[1],
                probe.volume.as_deref().unwrap_or("-"),
                probe.mean_excitation_potential,
                probe.electron_density,
                probe.neutron_mfp,
                probe.gamma_mfp,
            );
        }
        for (let_, q) in &self.quality_factors {
            println!("  LET {:>10.3} keV/um -> Q = {:.4}", let_, q);
        }
    }
}

#[derive(Serialize)]
struct DescriptorFile<'a> {
    generated: String,
    names: &'a [String],
    bbox: Option<BBox>,
    descriptors: Vec<ImageDescriptor>,
}

/// A loaded geometry together with the settings to survey it with.
#[derive(Debug)]
pub struct Survey {
    pub root: MotherVolume,
    pub settings: Settings,
    pub result: SurveyResult,
}

impl Survey {
    pub fn new(root: MotherVolume, settings: Settings) -> Self {
        Self {
            root,
            settings,
            result: SurveyResult::new_empty(),
        }
    }

    /// Loads the scene named in `settings`.
    pub fn from_settings(settings: Settings) -> Result<Self> {
        let root = load_scene(&settings.scene, settings.scale)?;
        Ok(Self::new(root, settings))
    }

    pub fn run(&mut self) {
        let start = Instant::now();
        log::info!("surveying {} volumes", self.root.names().len());

        self.result.names = self.root.names();
        self.result.bbox = self.root.bbox();
        self.result.probes = self.probe_all();
        self.result.quality_factors = self
            .settings
            .let_values
            .iter()
            .map(|&l| (l, quality_factor(l * KEV_PER_UM)))
            .collect();

        match self.result.bbox {
            Some(bbox) => {
                let (volume_map, density_map) = self.sample(&bbox);
                self.result.volume_map = volume_map;
                self.result.density_map = density_map;
            }
            None => log::warn!("scene has no volumes, skipping maps"),
        }

        log::info!("survey took {:.2?}", start.elapsed());
    }

    fn probe_all(&self) -> Vec<ProbeReport> {
        let energy = self.settings.energy;
        self.settings
            .probes
            .iter()
            .map(|&[x, y]| {
                let (potential, density) = self.root.excitation_and_density(x, y);
                ProbeReport {
                    point: [x, y],
                    volume: self.root.resolve(x, y).map(|v| v.name().to_string()),
                    mean_excitation_potential: potential,
                    electron_density: density,
                    neutron_mfp: self.root.neutron_mean_free_path(x, y, energy),
                    gamma_mfp: self.root.gamma_mean_free_path(x, y, energy),
                }
            })
            .collect()
    }

    /// Samples cell centres of an `nx x ny` grid over `bbox`.
    fn sample(&self, bbox: &BBox) -> (Array2<i64>, Array2<f64>) {
        let (nx, ny) = (self.settings.map.nx, self.settings.map.ny);
        let dx = bbox.width() / nx as f64;
        let dy = bbox.height() / ny as f64;

        // duplicate names share the index of their first occurrence
        let mut index: HashMap<&str, i64> = HashMap::new();
        for (i, name) in self.result.names.iter().enumerate() {
            index.entry(name.as_str()).or_insert(i as i64);
        }

        let pb = ProgressBar::new(ny as u64);
        if let Ok(style) = ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] {bar:40.green/blue} {pos:>5}/{len:5} {msg} ETA: {eta_precise}",
        ) {
            pb.set_style(style.progress_chars("█▇▆▅▄▃▂▁"));
        }
        pb.set_message("rows".to_string());

        let rows: Vec<Vec<(i64, f64)>> = (0..ny)
            .into_par_iter()
            .map(|row| {
                let y = bbox.y1 - (row as f64 + 0.5) * dy;
                let cells = (0..nx)
                    .map(|col| {
                        let x = bbox.x0 + (col as f64 + 0.5) * dx;
                        match self.root.resolve(x, y) {
                            Some(volume) => (
                                index.get(volume.name()).copied().unwrap_or(-1),
                                volume.material().electron_density(),
                            ),
                            None => (-1, 0.0),
                        }
                    })
                    .collect();
                pb.inc(1);
                cells
            })
            .collect();
        pb.finish_and_clear();

        let volume_map = Array2::from_shape_fn((ny, nx), |(r, c)| rows[r][c].0);
        let density_map = Array2::from_shape_fn((ny, nx), |(r, c)| rows[r][c].1);
        (volume_map, density_map)
    }

    /// Writes the maps, probe reports and image descriptors to the output
    /// directory.
    pub fn writeup(&self) -> Result<()> {
        let dir = &self.settings.directory;

        output::write_grid(&dir.join("volume_map"), &self.result.volume_map)?;
        output::write_grid(&dir.join("density_map"), &self.result.density_map)?;
        output::write_json(&dir.join("probes.json"), &self.result.probes)?;

        let descriptors = DescriptorFile {
            generated: Utc::now().to_rfc3339(),
            names: &self.result.names,
            bbox: self.result.bbox,
            descriptors: self.root.image_descriptors(),
        };
        output::write_json(&dir.join("descriptors.json"), &descriptors)
            .context("failed to write image descriptors")?;

        log::info!("results written to {}", dir.display());
        Ok(())
    }
}
