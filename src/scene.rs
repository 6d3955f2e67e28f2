//! Scene files describing a geometry tree.
//!
//! A scene is a TOML document with a list of materials and a root mother
//! volume:
//!
//! ```toml
//! [[materials]]
//! name = "water"
//! mean_excitation_potential = 1.2e-17
//! electron_density = 3.34e29
//!
//! [[root.children]]
//! kind = "volume"
//! name = "tank"
//! mask = "tank.png"
//! material = "water"
//! offset = [0.0, 0.0]
//!
//! [[root.children]]
//! kind = "mother"
//! offset = [0.1, 0.05]
//!
//! [[root.children.children]]
//! kind = "volume"
//! name = "probe"
//! mask = "probe.png"
//! material = "water"
//! scale = 2000.0
//! ```
//!
//! Children are added in the order they are listed, so later entries
//! occlude earlier ones. Relative mask paths are resolved against the
//! directory containing the scene file.

use anyhow::{anyhow, bail, Context, Result};
use nalgebra::Vector2;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::containment::MotherVolume;
use crate::material::{Material, TabulatedMaterial};
use crate::volume::{Geometry, Volume};


/// Top level of a scene file.
#[derive(Debug, Clone, Deserialize)]
pub struct SceneSpec {
    #[serde(default)]
    pub materials: Vec<TabulatedMaterial>,
    #[serde(default)]
    pub root: MotherSpec,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MotherSpec {
    #[serde(default)]
    pub children: Vec<ChildSpec>,
}

/// A child entry and its offset in the parent frame.
#[derive(Debug, Clone, Deserialize)]
pub struct ChildSpec {
    #[serde(default)]
    pub offset: [f64; 2],
    #[serde(flatten)]
    pub node: NodeSpec,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum NodeSpec {
    Volume {
        name: String,
        mask: PathBuf,
        material: String,
        scale: Option<f64>,
    },
    Mother {
        #[serde(default)]
        children: Vec<ChildSpec>,
    },
}

impl SceneSpec {
    /// Builds the geometry tree. `base_dir` anchors relative mask paths and
    /// `default_scale` applies to volumes without their own scale.
    pub fn build(&self, base_dir: &Path, default_scale: f64) -> Result<MotherVolume> {
        let mut materials: HashMap<&str, Arc<dyn Material>> = HashMap::new();
        for material in &self.materials {
            if materials
                .insert(material.name(), Arc::new(material.clone()))
                .is_some()
            {
                bail!("material '{}' is defined more than once", material.name());
            }
        }

        let builder = Builder {
            materials,
            base_dir,
            default_scale,
        };
        builder.mother(&self.root.children)
    }
}

struct Builder<'a> {
    materials: HashMap<&'a str, Arc<dyn Material>>,
    base_dir: &'a Path,
    default_scale: f64,
}

impl Builder<'_> {
    fn mother(&self, children: &[ChildSpec]) -> Result<MotherVolume> {
        let mut mother = MotherVolume::new();
        for child in children {
            let offset = Vector2::new(child.offset[0], child.offset[1]);
            mother.add_boxed(self.node(&child.node)?, offset);
        }
        Ok(mother)
    }

    fn node(&self, node: &NodeSpec) -> Result<Box<dyn Geometry>> {
        match node {
            NodeSpec::Volume {
                name,
                mask,
                material,
                scale,
            } => {
                let material = self.materials.get(material.as_str()).ok_or_else(|| {
                    anyhow!("volume '{}' uses unknown material '{}'", name, material)
                })?;
                let path = if mask.is_absolute() {
                    mask.clone()
                } else {
                    self.base_dir.join(mask)
                };
                let volume = Volume::from_file(
                    path,
                    name.as_str(),
                    Arc::clone(material),
                    scale.unwrap_or(self.default_scale),
                )?;
                Ok(Box::new(volume))
            }
            NodeSpec::Mother { children } => Ok(Box::new(self.mother(children)?)),
        }
    }
}

/// Reads and builds the scene at `path`.
pub fn load_scene(path: impl AsRef<Path>, default_scale: f64) -> Result<MotherVolume> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read scene file '{}'", path.display()))?;
    let spec: SceneSpec = toml::from_str(&text)
        .with_context(|| format!("failed to parse scene file '{}'", path.display()))?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));

    let root = spec
        .build(base_dir, default_scale)
        .with_context(|| format!("failed to build scene '{}'", path.display()))?;
    log::info!(
        "loaded scene '{}' with {} volumes",
        path.display(),
        root.names().len()
    );
    Ok(root)
}
