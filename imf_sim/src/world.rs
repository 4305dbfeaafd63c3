use crate::error::{invalid, Result};
use crate::particle::PARTICLE_RADIUS;
use serde::{Deserialize, Serialize};

pub const GRAVITY_ACCEL: f64 = 120.0;
/// Fraction of the container height occupied by the heating strip.
pub const HEAT_STRIP_FRACTION: f64 = 0.05;

fn default_true() -> bool {
    true
}

/// Fixed container geometry plus the two user toggles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Container {
    pub width: f64,
    pub height: f64,
    #[serde(default = "default_true")]
    pub gravity_on: bool,
    #[serde(default = "default_true")]
    pub heating_on: bool,
}

impl Default for Container {
    fn default() -> Self {
        Container {
            width: 480.0,
            height: 320.0,
            gravity_on: true,
            heating_on: true,
        }
    }
}

impl Container {
    pub fn new(width: f64, height: f64) -> Self {
        Container { width, height, ..Default::default() }
    }

    pub fn gravity(&self) -> f64 {
        if self.gravity_on {
            GRAVITY_ACCEL
        } else {
            0.0
        }
    }

    /// y coordinate where the heating strip begins.
    pub fn heat_strip_top(&self) -> f64 {
        self.height * (1.0 - HEAT_STRIP_FRACTION)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.width.is_finite() || !self.height.is_finite() {
            return invalid("container dimensions must be finite");
        }
        let min = 8.0 * PARTICLE_RADIUS;
        if self.width < min || self.height < min {
            return invalid(format!("container must be at least {} px on each side", min));
        }
        Ok(())
    }
}
