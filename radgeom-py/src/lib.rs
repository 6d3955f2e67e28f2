use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use radgeom::{self, scene, units::KEV_PER_UM, Geometry, MotherVolume};

/// A geometry tree loaded from a scene file.
#[pyclass]
struct Scene {
    root: MotherVolume,
}

#[pymethods]
impl Scene {
    /// Load a scene file. `scale` applies to volumes without their own.
    #[new]
    #[pyo3(signature = (path, scale = radgeom::volume::DEFAULT_S2PX))]
    fn py_new(path: &str, scale: f64) -> PyResult<Self> {
        let root = scene::load_scene(path, scale)
            .map_err(|e| PyValueError::new_err(format!("{:#}", e)))?;
        Ok(Self { root })
    }

    fn is_inside(&self, x: f64, y: f64) -> bool {
        self.root.is_inside(x, y)
    }

    fn is_in_bbox(&self, x: f64, y: f64) -> bool {
        self.root.is_in_bbox(x, y)
    }

    /// Name of the volume at the point, or None.
    fn volume_at(&self, x: f64, y: f64) -> Option<String> {
        self.root.resolve(x, y).map(|v| v.name().to_string())
    }

    fn excitation_and_density(&self, x: f64, y: f64) -> (f64, f64) {
        self.root.excitation_and_density(x, y)
    }

    fn neutron_mfp(&self, x: f64, y: f64, energy: f64) -> Vec<f64> {
        self.root.neutron_mean_free_path(x, y, energy)
    }

    fn gamma_mfp(&self, x: f64, y: f64, energy: f64) -> Vec<f64> {
        self.root.gamma_mean_free_path(x, y, energy)
    }

    fn names(&self) -> Vec<String> {
        self.root.names()
    }

    /// `(x0, y0, x1, y1)`, or None for an empty scene.
    #[getter]
    fn bbox(&self) -> Option<(f64, f64, f64, f64)> {
        self.root.bbox().map(|b| (b.x0, b.y0, b.x1, b.y1))
    }

    /// `[(mask source, (x0, y0, x1, y1)), ...]` in insertion order.
    fn image_info(&self) -> Vec<(String, (f64, f64, f64, f64))> {
        self.root
            .image_descriptors()
            .into_iter()
            .map(|d| (d.source, (d.bbox.x0, d.bbox.y0, d.bbox.x1, d.bbox.y1)))
            .collect()
    }
}

/// Quality factor for a linear energy transfer in J/m.
#[pyfunction]
fn quality_factor(let_: f64) -> f64 {
    radgeom::quality_factor(let_)
}

/// Python extension module.
#[pymodule]
fn _radgeom_py(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<Scene>()?;
    m.add_function(wrap_pyfunction!(quality_factor, m)?)?;
    m.add("KEV_PER_UM", KEV_PER_UM)?;
    Ok(())
}
