use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use std::env;
use std::fmt;
use std::path::PathBuf;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let settings = load_default_config().unwrap();
        assert_eq!(settings.scale, 1000.0);
        assert!(settings.scene.is_absolute());
        assert!(settings.scene.ends_with("config/demo/scene.toml"));
        assert_eq!(settings.map, MapSettings { nx: 200, ny: 120 });
        assert!(!settings.probes.is_empty());
    }

    #[test]
    fn validation_rejects_bad_values() {
        let mut settings = load_default_config().unwrap();
        settings.scale = 0.0;
        assert!(validate_config(&settings).is_err());

        let mut settings = load_default_config().unwrap();
        settings.map.nx = 0;
        assert!(validate_config(&settings).is_err());

        let mut settings = load_default_config().unwrap();
        settings.energy = -1.0;
        assert!(validate_config(&settings).is_err());
    }

    #[test]
    fn parse_points() {
        assert_eq!(parse_point("0.5,-2").unwrap(), [0.5, -2.0]);
        assert_eq!(parse_point(" 1 , 2 ").unwrap(), [1.0, 2.0]);
        assert!(parse_point("1").is_err());
        assert!(parse_point("1,2,3").is_err());
        assert!(parse_point("a,2").is_err());
    }

    #[test]
    fn cli_overrides() {
        let mut settings = load_default_config().unwrap();
        let args = CliArgs::parse_from([
            "radgeom",
            "--scale",
            "250",
            "--probe",
            "1,2",
            "3,4",
            "--map",
            "10",
            "20",
        ]);
        apply_cli_args(&mut settings, args);
        assert_eq!(settings.scale, 250.0);
        assert_eq!(settings.probes, vec![[1.0, 2.0], [3.0, 4.0]]);
        assert_eq!(settings.map, MapSettings { nx: 10, ny: 20 });
    }

    #[test]
    fn environment_overrides_nested_and_list_fields() {
        let vars: config::Map<String, String> = [
            ("RADGEOM_ENERGY", "2.5"),
            ("RADGEOM_MAP__NX", "32"),
            ("RADGEOM_LET_VALUES", "5 50 500"),
            ("RADGEOM_ROOT_DIR", "/elsewhere"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let root = retrieve_project_root().unwrap();
        let settings: Settings = Config::builder()
            .add_source(File::from(root.join("config/default.toml")))
            .add_source(environment().source(Some(vars)))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(settings.energy, 2.5);
        assert_eq!(settings.map, MapSettings { nx: 32, ny: 120 });
        assert_eq!(settings.let_values, vec![5.0, 50.0, 500.0]);
    }

    #[test]
    fn display_lists_let_values() {
        let settings = load_default_config().unwrap();
        let text = settings.to_string();
        assert!(text.contains("LET values: [1.0, 10.0, 50.0, 400.0] keV/um"));
        assert!(text.contains("Map: 200 x 120"));
    }
}

/// Sampling resolution of the survey maps.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
pub struct MapSettings {
    pub nx: usize,
    pub ny: usize,
}

/// Runtime configuration for the application.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Settings {
    pub scene: PathBuf,
    #[serde(default = "default_scale")]
    pub scale: f64,
    pub energy: f64,
    pub directory: PathBuf,
    pub map: MapSettings,
    #[serde(default)]
    pub probes: Vec<[f64; 2]>,
    #[serde(default)]
    pub let_values: Vec<f64>,
}

fn default_scale() -> f64 {
    crate::volume::DEFAULT_S2PX
}

pub fn load_default_config() -> Result<Settings> {
    let root = retrieve_project_root()?;
    let default_config_file = root.join("config/default.toml");

    let settings: Config = Config::builder()
        .add_source(File::from(default_config_file).required(true))
        .build()
        .context("failed to load configuration")?;

    let mut config: Settings = settings
        .try_deserialize()
        .context("failed to deserialize configuration")?;
    anchor_scene(&mut config, &root);

    validate_config(&config)?;

    Ok(config)
}

/// Loads `config/local.toml` (or `config/default.toml` if there is no local
/// file), then applies `RADGEOM_*` environment variables and finally the
/// command line.
pub fn load_config() -> Result<Settings> {
    let root = retrieve_project_root()?;

    let default_config_file = root.join("config/default.toml");
    let local_config = root.join("config/local.toml");

    let config_file = if local_config.exists() {
        log::info!("using local configuration: {:?}", local_config);
        local_config
    } else {
        log::info!("using default configuration: {:?}", default_config_file);
        default_config_file
    };

    let settings: Config = Config::builder()
        .add_source(File::from(config_file).required(true))
        .add_source(environment())
        .build()
        .context("failed to load configuration")?;

    let mut config: Settings = settings
        .try_deserialize()
        .context("failed to deserialize configuration")?;
    anchor_scene(&mut config, &root);

    apply_cli_args(&mut config, CliArgs::parse());

    validate_config(&config)?;

    log::debug!("{:#?}", config);

    Ok(config)
}

/// `RADGEOM_*` variables. Nested keys use `__` (`RADGEOM_MAP__NX`) and
/// `RADGEOM_LET_VALUES` takes a space-separated list. Probes are set in the
/// file or on the command line.
fn environment() -> Environment {
    Environment::with_prefix("radgeom")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
        .list_separator(" ")
        .with_list_parse_key("let_values")
}

/// Scene paths in configuration files are relative to the project root.
fn anchor_scene(config: &mut Settings, root: &std::path::Path) {
    if config.scene.is_relative() {
        config.scene = root.join(&config.scene);
    }
}

fn apply_cli_args(config: &mut Settings, args: CliArgs) {
    if let Some(scene) = args.scene {
        config.scene = scene;
    }
    if let Some(scale) = args.scale {
        config.scale = scale;
    }
    if let Some(energy) = args.energy {
        config.energy = energy;
    }
    if let Some(dir) = args.dir {
        config.directory = dir;
    }
    if let Some(map) = args.map {
        // clap enforces exactly two values
        config.map = MapSettings {
            nx: map[0],
            ny: map[1],
        };
    }
    if let Some(probes) = args.probe {
        config.probes = probes;
    }
    if let Some(let_values) = args.let_values {
        config.let_values = let_values;
    }
}

/// Retrieve the project root directory.
/// This function tries to find the project root directory in different ways:
/// 1. If the CARGO_MANIFEST_DIR environment variable is set, use it.
/// 2. If the RADGEOM_ROOT_DIR environment variable is set, use it.
/// 3. If the "config" subdirectory is found in the executable directory or any of its parents, use it.
fn retrieve_project_root() -> Result<PathBuf> {
    if let Ok(manifest_dir) = env::var("CARGO_MANIFEST_DIR") {
        // When running through cargo (e.g. cargo run, cargo test)
        return Ok(PathBuf::from(manifest_dir));
    }
    if let Ok(path) = env::var("RADGEOM_ROOT_DIR") {
        return Ok(PathBuf::from(path));
    }

    let exe_path = env::current_exe().context("failed to get current executable path")?;
    exe_path
        .ancestors()
        .skip(1)
        .find(|dir| dir.join("config").is_dir())
        .map(|dir| dir.to_path_buf())
        .ok_or_else(|| anyhow!("could not find project root directory"))
}

fn validate_config(config: &Settings) -> Result<()> {
    if !(config.scale > 0.0) {
        bail!("scale must be greater than 0, got {}", config.scale);
    }
    if !(config.energy > 0.0) {
        bail!("energy must be greater than 0, got {}", config.energy);
    }
    if config.map.nx == 0 || config.map.ny == 0 {
        bail!(
            "map resolution must be at least 1x1, got {}x{}",
            config.map.nx,
            config.map.ny
        );
    }
    Ok(())
}

#[derive(Parser, Debug)]
#[command(version, about = "radgeom - material lookup in nested raster-mask geometries")]
pub struct CliArgs {
    /// Path to the scene file describing materials and volumes.
    #[arg(short, long)]
    scene: Option<PathBuf>,

    /// Default scale in pixels per world unit, for volumes without their own.
    #[arg(long)]
    scale: Option<f64>,

    /// Energy at which mean free paths are reported, in the unit of the scene tables.
    #[arg(short, long)]
    energy: Option<f64>,

    /// Output directory.
    #[arg(short, long)]
    dir: Option<PathBuf>,

    /// Resolution of the sampled maps, as the number of cells along x and y.
    #[arg(long, num_args = 2, value_delimiter = ' ')]
    map: Option<Vec<usize>>,

    /// Points to report on, separated by spaces.
    /// Format: x1,y1 x2,y2 ...
    #[arg(short, long, value_parser = parse_point, num_args = 1.., value_delimiter = ' ')]
    probe: Option<Vec<[f64; 2]>>,

    /// Linear energy transfer values in keV/um to convert to quality factors.
    #[arg(long = "let", num_args = 1.., value_delimiter = ' ')]
    let_values: Option<Vec<f64>>,
}

/// Parse a point in the format "x,y"
fn parse_point(s: &str) -> Result<[f64; 2], String> {
    let coords: Vec<&str> = s.split(',').collect();
    if coords.len() != 2 {
        return Err(format!("Invalid point format: '{}'. Expected 'x,y'", s));
    }

    let x = coords[0]
        .trim()
        .parse::<f64>()
        .map_err(|_| format!("Failed to parse x coordinate: {}", coords[0]))?;
    let y = coords[1]
        .trim()
        .parse::<f64>()
        .map_err(|_| format!("Failed to parse y coordinate: {}", coords[1]))?;

    Ok([x, y])
}

impl fmt::Display for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Settings:
  - Scene: {}
  - Scale: {:.6} px/unit
  - Energy: {:.6}
  - Output Directory: {}
  - Map: {} x {}
  - Probes: {:?}
  - LET values: {:?} keV/um
  ",
            self.scene.display(),
            self.scale,
            self.energy,
            self.directory.display(),
            self.map.nx,
            self.map.ny,
            self.probes,
            self.let_values,
        )
    }
}
