use std::fmt::Display;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use itertools::Itertools;
use ndarray::Array2;
use serde::Serialize;


fn create(path: &Path) -> Result<BufWriter<File>> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory '{}'", parent.display()))?;
    }
    let file = File::create(path)
        .with_context(|| format!("failed to create output file '{}'", path.display()))?;
    Ok(BufWriter::new(file))
}

/// Write a 2D array, one row per line with values separated by spaces.
pub fn write_grid<T: Display>(path: &Path, grid: &Array2<T>) -> Result<()> {
    let mut writer = create(path)?;

    for row in grid.outer_iter() {
        writeln!(writer, "{}", row.iter().join(" "))?;
    }
    writer.flush()?;

    Ok(())
}

/// Write any serializable value as pretty-printed JSON.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let mut writer = create(path)?;
    serde_json::to_writer_pretty(&mut writer, value)
        .with_context(|| format!("failed to serialize '{}'", path.display()))?;
    writeln!(writer)?;
    writer.flush()?;

    Ok(())
}
