//! mortar-models
//!
//! Drag-coefficient policies for finned mortar bombs.
//!
//! Two interchangeable policies:
//!   - **Mach-based**: a three-regime curve of Mach number (subsonic rise,
//!     transonic hump, supersonic decay), scaled by caliber.
//!   - **Projectile-specific**: the round's declared Cd times an empirical
//!     factor of 1.8 that compensates for the plain circular cross-section.
//!
//! Mach uses a fixed 340 m/s speed of sound; the atmosphere only enters the
//! force through density.
//!
//! Exports:
//!   - `mach_drag_coefficient(speed, caliber_mm)`
//!   - `projectile_drag_coefficient(base_cd)`
//!   - `cross_section_area(caliber_mm)`
//!   - `DragPolicy`

use std::f64::consts::PI;

/// Speed of sound used for the Mach number [m/s]
pub const SPEED_OF_SOUND: f64 = 340.0;
/// Speeds above this are treated as this [m/s]
const MAX_SPEED: f64 = 2000.0;
/// Empirical multiplier on the declared Cd of a round.
///
/// Tuned against firing tables rather than derived; keep as is.
pub const PROJECTILE_CD_CALIBRATION: f64 = 1.8;

/// Mach number at the fixed speed of sound, speed capped at 2000 m/s.
#[inline]
pub fn mach(speed_mps: f64) -> f64 {
    speed_mps.min(MAX_SPEED) / SPEED_OF_SOUND
}

/// Velocity-dependent Cd, clamped to at most 1.0.
pub fn mach_drag_coefficient(speed_mps: f64, caliber_mm: f64) -> f64 {
    let m = mach(speed_mps);
    let cd = if m < 0.8 {
        0.2 + 0.1 * m * m
    } else if m < 1.2 {
        0.4 + 0.2 * (m - 0.8) * (m - 0.8)
    } else {
        0.15 + 0.05 / (m * m)
    };
    let caliber_m = caliber_mm / 1000.0;
    (cd * (1.0 + 0.1 * caliber_m.log10())).min(1.0)
}

/// Declared Cd of the round with the empirical correction applied.
#[inline]
pub fn projectile_drag_coefficient(base_cd: f64) -> f64 {
    base_cd * PROJECTILE_CD_CALIBRATION
}

/// Reference area [m^2] for a caliber given in mm.
#[inline]
pub fn cross_section_area(caliber_mm: f64) -> f64 {
    PI * (caliber_mm / 2000.0).powi(2)
}

/// Which Cd model the simulator uses.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DragPolicy {
    /// Three-regime Mach curve; needs speed and caliber.
    #[default]
    MachBased,
    /// Declared Cd × 1.8; ignores speed.
    ProjectileSpecific,
}

impl DragPolicy {
    /// Cd for the current air-relative speed.
    pub fn coefficient(self, speed_mps: f64, caliber_mm: f64, base_cd: f64) -> f64 {
        match self {
            DragPolicy::MachBased => mach_drag_coefficient(speed_mps, caliber_mm),
            DragPolicy::ProjectileSpecific => projectile_drag_coefficient(base_cd),
        }
    }
}

/* -------------------------------- tests -------------------------------- */

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn regimes_at_one_meter_caliber() {
        // log10(1.0) = 0, so the caliber factor drops out
        assert_relative_eq!(mach_drag_coefficient(0.0, 1000.0), 0.2);
        assert_relative_eq!(mach_drag_coefficient(170.0, 1000.0), 0.2 + 0.1 * 0.25);
        assert_relative_eq!(mach_drag_coefficient(340.0, 1000.0), 0.4 + 0.2 * 0.2 * 0.2, epsilon = 1e-12);
        assert_relative_eq!(mach_drag_coefficient(680.0, 1000.0), 0.15 + 0.05 / 4.0);
    }

    #[test]
    fn transonic_hump() {
        let sub = mach_drag_coefficient(0.79 * SPEED_OF_SOUND, 82.0);
        let trans = mach_drag_coefficient(1.1 * SPEED_OF_SOUND, 82.0);
        let sup = mach_drag_coefficient(2.0 * SPEED_OF_SOUND, 82.0);
        assert!(trans > sub && trans > sup);
    }

    #[test]
    fn small_caliber_scales_down() {
        let factor = 1.0 + 0.1 * 0.082_f64.log10();
        assert_relative_eq!(mach_drag_coefficient(211.0, 82.0), (0.2 + 0.1 * (211.0_f64 / 340.0).powi(2)) * factor, epsilon = 1e-12);
        assert!(mach_drag_coefficient(211.0, 82.0) < mach_drag_coefficient(211.0, 120.0));
    }

    #[test]
    fn speed_is_capped_and_cd_is_clamped() {
        assert_relative_eq!(mach_drag_coefficient(5000.0, 82.0), mach_drag_coefficient(2000.0, 82.0));
        // only an absurd caliber pushes the scaled Cd past 1.0
        assert_eq!(mach_drag_coefficient(340.0, 1e20), 1.0);
    }

    #[test]
    fn projectile_policy_ignores_speed() {
        let p = DragPolicy::ProjectileSpecific;
        assert_relative_eq!(p.coefficient(50.0, 82.0, 0.45), 0.81, epsilon = 1e-12);
        assert_relative_eq!(p.coefficient(300.0, 82.0, 0.45), 0.81, epsilon = 1e-12);
        assert_eq!(DragPolicy::default(), DragPolicy::MachBased);
    }

    #[test]
    fn area_of_82mm() {
        assert_relative_eq!(cross_section_area(82.0), PI * 0.041 * 0.041, epsilon = 1e-15);
    }
}
