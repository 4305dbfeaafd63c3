//! Material parameter sets.
//!
//! A scenario is a single [`ScenarioParameters`] value; there is exactly one
//! physics path and the materials only differ in the numbers fed into it.
//! Playground mode maps a scalar IMF strength onto the same struct.

use crate::error::{invalid, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const MIN_PARTICLES: usize = 1;
pub const MAX_PARTICLES: usize = 500;

/// Viscosity of the weak-IMF endpoint (imf strength 0).
pub const VISCOSITY_WEAK: f64 = 0.3;
/// Viscosity of the strong-IMF endpoint (imf strength 1).
pub const VISCOSITY_STRONG: f64 = 2.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioParameters {
    pub name: String,
    /// Dispersion well depth ε
    pub epsilon: f64,
    /// Length scale σ (px)
    pub sigma: f64,
    /// IMF-strength proxy driving every tuning table
    pub viscosity: f64,
    pub hb_strength: f64,
    pub dipole_strength: f64,
    pub coh_lj: f64,
    pub coh_hb: f64,
    pub coh_dp: f64,
    pub particle_count: usize,
    /// Thermal bath temperature
    pub kt: f64,
    /// User heat multiplier
    pub heat_intensity: f64,
    pub heat_accel: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Material {
    Hexane,
    Ethanol,
    Water,
    Honey,
}

impl Material {
    pub const ALL: [Material; 4] = [
        Material::Hexane,
        Material::Ethanol,
        Material::Water,
        Material::Honey,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Material::Hexane => "hexane",
            Material::Ethanol => "ethanol",
            Material::Water => "water",
            Material::Honey => "honey",
        }
    }

    pub fn parse(name: &str) -> Option<Material> {
        Material::ALL
            .iter()
            .copied()
            .find(|m| m.name().eq_ignore_ascii_case(name.trim()))
    }

    pub fn parameters(self) -> ScenarioParameters {
        let (epsilon, viscosity, hb, dipole, coh_lj, coh_hb, coh_dp, kt, heat_accel) = match self {
            Material::Hexane => (0.08, 0.3, 0.0, 0.0, 15.0, 0.0, 0.0, 6.0, 260.0),
            Material::Ethanol => (0.35, 1.0, 2.5, 60.0, 25.0, 2.0, 1.0, 5.0, 220.0),
            Material::Water => (0.5, 1.1, 5.0, 120.0, 30.0, 3.0, 1.2, 5.0, 200.0),
            Material::Honey => (1.0, 2.0, 8.0, 400.0, 40.0, 3.0, 1.5, 4.0, 150.0),
        };
        ScenarioParameters {
            name: self.name().to_string(),
            epsilon,
            sigma: 8.0,
            viscosity,
            hb_strength: hb,
            dipole_strength: dipole,
            coh_lj,
            coh_hb,
            coh_dp,
            particle_count: 300,
            kt,
            heat_intensity: 1.0,
            heat_accel,
        }
    }
}

impl fmt::Display for Material {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[inline]
fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

impl ScenarioParameters {
    /// Interpolate every numeric field between the hexane-like (0) and
    /// honey-like (1) endpoints.
    pub fn from_imf_strength(strength: f64) -> Self {
        let t = if strength.is_finite() { strength.clamp(0.0, 1.0) } else { 0.0 };
        let weak = Material::Hexane.parameters();
        let strong = Material::Honey.parameters();
        ScenarioParameters {
            name: format!("playground ({:.2})", t),
            epsilon: lerp(weak.epsilon, strong.epsilon, t),
            sigma: lerp(weak.sigma, strong.sigma, t),
            viscosity: lerp(weak.viscosity, strong.viscosity, t),
            hb_strength: lerp(weak.hb_strength, strong.hb_strength, t),
            dipole_strength: lerp(weak.dipole_strength, strong.dipole_strength, t),
            coh_lj: lerp(weak.coh_lj, strong.coh_lj, t),
            coh_hb: lerp(weak.coh_hb, strong.coh_hb, t),
            coh_dp: lerp(weak.coh_dp, strong.coh_dp, t),
            particle_count: weak.particle_count,
            kt: lerp(weak.kt, strong.kt, t),
            heat_intensity: lerp(weak.heat_intensity, strong.heat_intensity, t),
            heat_accel: lerp(weak.heat_accel, strong.heat_accel, t),
        }
    }

    /// Position of this material on the weak..strong IMF axis, in [0, 1].
    pub fn imf_strength(&self) -> f64 {
        ((self.viscosity - VISCOSITY_WEAK) / (VISCOSITY_STRONG - VISCOSITY_WEAK)).clamp(0.0, 1.0)
    }

    pub fn with_particle_count(mut self, n: usize) -> Self {
        self.particle_count = n;
        self
    }

    /// Reject parameter sets the engine cannot run. `max_sigma` is the largest
    /// σ the spatial grid of the target container supports.
    pub fn validate(&self, max_sigma: f64) -> Result<()> {
        let finite = [
            ("epsilon", self.epsilon),
            ("sigma", self.sigma),
            ("viscosity", self.viscosity),
            ("hb_strength", self.hb_strength),
            ("dipole_strength", self.dipole_strength),
            ("coh_lj", self.coh_lj),
            ("coh_hb", self.coh_hb),
            ("coh_dp", self.coh_dp),
            ("kt", self.kt),
            ("heat_intensity", self.heat_intensity),
            ("heat_accel", self.heat_accel),
        ];
        for (field, value) in finite {
            if !value.is_finite() {
                return invalid(format!("{} must be finite, got {}", field, value));
            }
        }

        if self.epsilon <= 0.0 {
            return invalid("epsilon must be positive");
        }
        if self.sigma <= 0.0 {
            return invalid("sigma must be positive");
        }
        if self.sigma > max_sigma {
            return invalid(format!(
                "sigma {} exceeds the grid limit {:.3}",
                self.sigma, max_sigma
            ));
        }
        if self.viscosity <= 0.0 {
            return invalid("viscosity must be positive");
        }
        for (field, value) in [
            ("hb_strength", self.hb_strength),
            ("dipole_strength", self.dipole_strength),
            ("coh_lj", self.coh_lj),
            ("coh_hb", self.coh_hb),
            ("coh_dp", self.coh_dp),
            ("kt", self.kt),
            ("heat_accel", self.heat_accel),
        ] {
            if value < 0.0 {
                return invalid(format!("{} must not be negative", field));
            }
        }
        if !(0.0..=5.0).contains(&self.heat_intensity) {
            return invalid("heat_intensity must lie in [0, 5]");
        }
        if !(MIN_PARTICLES..=MAX_PARTICLES).contains(&self.particle_count) {
            return invalid(format!(
                "particle_count must lie in [{}, {}], got {}",
                MIN_PARTICLES, MAX_PARTICLES, self.particle_count
            ));
        }
        Ok(())
    }
}

impl Default for ScenarioParameters {
    fn default() -> Self {
        Material::Water.parameters()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PhysicsError;
    use approx::assert_relative_eq;

    #[test]
    fn test_presets_are_valid() {
        for m in Material::ALL {
            assert!(m.parameters().validate(8.5).is_ok(), "{} rejected", m);
        }
    }

    #[test]
    fn test_playground_endpoints_match_presets() {
        let weak = ScenarioParameters::from_imf_strength(0.0);
        let strong = ScenarioParameters::from_imf_strength(1.0);
        let hexane = Material::Hexane.parameters();
        let honey = Material::Honey.parameters();

        assert_relative_eq!(weak.epsilon, hexane.epsilon);
        assert_relative_eq!(weak.viscosity, hexane.viscosity);
        assert_relative_eq!(strong.dipole_strength, honey.dipole_strength);
        assert_relative_eq!(strong.heat_accel, honey.heat_accel);
        assert_relative_eq!(weak.imf_strength(), 0.0);
        assert_relative_eq!(strong.imf_strength(), 1.0);
    }

    #[test]
    fn test_playground_is_monotone_and_clamped() {
        let a = ScenarioParameters::from_imf_strength(0.25);
        let b = ScenarioParameters::from_imf_strength(0.75);
        assert!(a.viscosity < b.viscosity);
        assert!(a.hb_strength < b.hb_strength);
        assert_relative_eq!(a.imf_strength(), 0.25, epsilon = 1e-12);

        let over = ScenarioParameters::from_imf_strength(7.0);
        assert_relative_eq!(over.viscosity, VISCOSITY_STRONG);
        let nan = ScenarioParameters::from_imf_strength(f64::NAN);
        assert_relative_eq!(nan.viscosity, VISCOSITY_WEAK);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let base = Material::Hexane.parameters();

        let mut p = base.clone();
        p.particle_count = 0;
        assert!(matches!(p.validate(8.5), Err(PhysicsError::InvalidConfiguration(_))));

        let mut p = base.clone();
        p.particle_count = 501;
        assert!(p.validate(8.5).is_err());

        let mut p = base.clone();
        p.epsilon = f64::INFINITY;
        assert!(p.validate(8.5).is_err());

        let mut p = base.clone();
        p.hb_strength = -1.0;
        assert!(p.validate(8.5).is_err());

        let mut p = base.clone();
        p.sigma = 20.0;
        assert!(p.validate(8.5).is_err());

        let mut p = base;
        p.heat_intensity = 6.0;
        assert!(p.validate(8.5).is_err());
    }

    #[test]
    fn test_material_parse() {
        assert_eq!(Material::parse(" Honey "), Some(Material::Honey));
        assert_eq!(Material::parse("glycerol"), None);
    }
}
