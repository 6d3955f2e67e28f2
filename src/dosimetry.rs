//! Dosimetric conversions.

use crate::units::KEV_PER_UM;


/// Quality factor for a linear energy transfer `let_` given in J/m.
///
/// The LET is normalised to keV/um before the piecewise approximation is
/// applied. The steps at 10 and 100 keV/um are part of the approximation.
pub fn quality_factor(let_: f64) -> f64 {
    let l = let_ / KEV_PER_UM;
    if l < 10.0 {
        1.0
    } else if l < 100.0 {
        0.32 * l - 2.2
    } else {
        300.0 / l.sqrt()
    }
}
