//! Unit conversion factors and physical constants.
//!
//! All quantities are SI. A length given in centimetres is written as
//! `2.5 * CM`, an energy in keV as `30.0 * KEV`, and so on. Physical
//! constants follow CODATA 2018.

pub use std::f64::consts::PI;

// lengths
pub const UM: f64 = 1e-6;
pub const MM: f64 = 1e-3;
pub const CM: f64 = 1e-2;
pub const M: f64 = 1.0;
pub const KM: f64 = 1e3;

// areas and volumes
pub const CM2: f64 = 1e-4;
pub const CM3: f64 = 1e-6;
pub const M3: f64 = 1.0;

// masses
pub const G: f64 = 1e-3;
pub const KG: f64 = 1.0;

/// Elementary charge in coulomb.
pub const Q_E: f64 = 1.602_176_634e-19;
/// Atomic mass unit in kg.
pub const AMU: f64 = 1.660_539_066_60e-27;
/// Electron rest mass in kg.
pub const M_E: f64 = 9.109_383_701_5e-31;
/// Muon rest mass in kg.
pub const M_MUON: f64 = 1.883_531_627e-28;
/// Speed of light in vacuum in m/s.
pub const C_LIGHT: f64 = 299_792_458.0;
/// Vacuum permittivity in F/m.
pub const EPSILON_0: f64 = 8.854_187_812_8e-12;
/// Avogadro constant in 1/mol.
pub const N_A: f64 = 6.022_140_76e23;

// energies
pub const EV: f64 = Q_E;
pub const KEV: f64 = Q_E * 1e3;
pub const MEV: f64 = Q_E * 1e6;

pub const DEG: f64 = 2.0 * PI / 360.0;

/// Cross-section unit, 1e-28 m^2.
pub const BARN: f64 = 1e-28;

/// Reference rate for normalising linear energy transfer, 1 keV/um.
pub const KEV_PER_UM: f64 = KEV / UM;

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn energy_units_scale_by_thousands() {
        assert_relative_eq!(MEV / KEV, 1e3, max_relative = 1e-12);
        assert_relative_eq!(KEV / EV, 1e3, max_relative = 1e-12);
    }

    #[test]
    fn full_turn_is_360_degrees() {
        assert_relative_eq!(360.0 * DEG, 2.0 * PI);
    }

    #[test]
    fn reference_rate() {
        assert_relative_eq!(KEV_PER_UM, 1.602_176_634e-10, max_relative = 1e-12);
    }
}
