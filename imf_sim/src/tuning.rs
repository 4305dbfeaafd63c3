//! Piecewise-affine tuning tables, all keyed on viscosity.
//!
//! These are pedagogical calibration data. Each table is a list of
//! `(viscosity, value)` knots; lookups interpolate linearly between knots and
//! hold the end values outside the covered range.

pub type Knots = &'static [(f64, f64)];

pub const SURFACE_MULTIPLIER: Knots = &[(0.3, 0.35), (1.0, 1.0), (2.0, 2.5)];
pub const SURFACE_THERMAL_THRESHOLD: Knots = &[(0.3, 0.12), (1.0, 0.35), (2.0, 0.75)];
pub const ESCAPE_MULTIPLIER: Knots = &[(0.3, 0.45), (1.0, 1.6), (2.0, 4.0)];
pub const BULK_THERMAL_THRESHOLD: Knots = &[(0.3, 0.30), (1.0, 0.55), (2.0, 0.90)];
/// Low-viscosity materials heat three times faster.
pub const HEATING_RATE_FACTOR: Knots = &[(0.3, 3.0), (2.0, 1.0)];

pub fn piecewise_affine(knots: &[(f64, f64)], x: f64) -> f64 {
    let (first, last) = match (knots.first(), knots.last()) {
        (Some(f), Some(l)) => (*f, *l),
        _ => return 0.0,
    };
    if x.is_nan() || x <= first.0 {
        return first.1;
    }
    if x >= last.0 {
        return last.1;
    }
    for w in knots.windows(2) {
        let (x0, y0) = w[0];
        let (x1, y1) = w[1];
        if x <= x1 {
            let t = (x - x0) / (x1 - x0);
            return y0 + (y1 - y0) * t;
        }
    }
    last.1
}
