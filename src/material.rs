//! Materials supply the physics quantities a transport routine needs once
//! the geometry has decided which volume a point is in.
//!
//! The geometry only depends on the [`Material`] trait. [`TabulatedMaterial`]
//! is a concrete implementation backed by per-channel mean free path tables,
//! which is what scene files declare.

use anyhow::{bail, Result};
use itertools::Itertools;
use ndarray::{Array1, Array2, Axis};
use serde::Deserialize;
use std::fmt;


/// Physics interface consumed by volumes.
///
/// Mean free path queries return one value per interaction channel the
/// material reports, possibly none.
pub trait Material: Send + Sync + fmt::Debug {
    fn mean_excitation_potential(&self) -> f64;
    fn electron_density(&self) -> f64;
    fn neutron_mean_free_path(&self, energy: f64) -> Vec<f64>;
    fn gamma_mean_free_path(&self, energy: f64) -> Vec<f64>;
}

/// Mean free paths sampled on an energy grid, one row per channel.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawPathTable")]
pub struct PathTable {
    energies: Array1<f64>,
    paths: Array2<f64>, // (channel, energy)
}

#[derive(Deserialize)]
struct RawPathTable {
    energies: Vec<f64>,
    paths: Vec<Vec<f64>>,
}

impl TryFrom<RawPathTable> for PathTable {
    type Error = anyhow::Error;

    fn try_from(raw: RawPathTable) -> Result<Self> {
        PathTable::new(raw.energies, raw.paths)
    }
}

impl PathTable {
    pub fn new(energies: Vec<f64>, paths: Vec<Vec<f64>>) -> Result<Self> {
        if energies.is_empty() {
            bail!("mean free path table needs at least one energy");
        }
        if let Some((a, b)) = energies.iter().tuple_windows().find(|(a, b)| !(a < b)) {
            bail!(
                "table energies must be strictly increasing, got {} followed by {}",
                a,
                b
            );
        }
        let num_energies = energies.len();
        if let Some((i, row)) = paths
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != num_energies)
        {
            bail!(
                "channel {} has {} values but there are {} energies",
                i,
                row.len(),
                num_energies
            );
        }

        let num_channels = paths.len();
        let flat: Vec<f64> = paths.into_iter().flatten().collect();
        let paths = Array2::from_shape_vec((num_channels, num_energies), flat)?;

        Ok(Self {
            energies: Array1::from(energies),
            paths,
        })
    }

    pub fn num_channels(&self) -> usize {
        self.paths.len_of(Axis(0))
    }

    /// Linear interpolation in energy for every channel, clamped to the
    /// first and last grid points.
    pub fn lookup(&self, energy: f64) -> Vec<f64> {
        let n = self.energies.len();
        let upper = self
            .energies
            .as_slice()
            .map_or(0, |e| e.partition_point(|&x| x <= energy));

        if upper == 0 {
            return self.paths.column(0).to_vec();
        }
        if upper >= n {
            return self.paths.column(n - 1).to_vec();
        }

        let (e0, e1) = (self.energies[upper - 1], self.energies[upper]);
        let t = (energy - e0) / (e1 - e0);
        self.paths
            .outer_iter()
            .map(|row| row[upper - 1] + t * (row[upper] - row[upper - 1]))
            .collect()
    }
}

/// Material with constant stopping parameters and tabulated mean free paths.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TabulatedMaterial {
    name: String,
    /// Mean excitation potential in J.
    mean_excitation_potential: f64,
    /// Electrons per m^3.
    electron_density: f64,
    #[serde(default)]
    neutron: Option<PathTable>,
    #[serde(default)]
    gamma: Option<PathTable>,
}

impl TabulatedMaterial {
    pub fn new(
        name: impl Into<String>,
        mean_excitation_potential: f64,
        electron_density: f64,
    ) -> Self {
        Self {
            name: name.into(),
            mean_excitation_potential,
            electron_density,
            neutron: None,
            gamma: None,
        }
    }

    pub fn with_neutron_table(mut self, table: PathTable) -> Self {
        self.neutron = Some(table);
        self
    }

    pub fn with_gamma_table(mut self, table: PathTable) -> Self {
        self.gamma = Some(table);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Material for TabulatedMaterial {
    fn mean_excitation_potential(&self) -> f64 {
        self.mean_excitation_potential
    }

    fn electron_density(&self) -> f64 {
        self.electron_density
    }

    fn neutron_mean_free_path(&self, energy: f64) -> Vec<f64> {
        self.neutron
            .as_ref()
            .map_or_else(Vec::new, |table| table.lookup(energy))
    }

    fn gamma_mean_free_path(&self, energy: f64) -> Vec<f64> {
        self.gamma
            .as_ref()
            .map_or_else(Vec::new, |table| table.lookup(energy))
    }
}
