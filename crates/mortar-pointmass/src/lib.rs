//! mortar-pointmass
//!
//! Point-mass mortar trajectories and firing solutions.
//! - Semi-implicit Euler at a fixed 0.2 s step; drag acts against the
//!   air-relative velocity, density follows the shell's altitude.
//! - One recorded point every 20 steps, closed by the interpolated impact.
//! - Two elevation families (high and low angle) found by a damped search:
//!   a coarse pass from range-based brackets, then a refinement pass around
//!   the ammunition-corrected angle.
//!
//! Axes: x downrange, y up, z crossrange. A wind blowing from 90° pushes
//! straight downrange, one from 0° straight across.
//!
//! Nothing here fails with `Err`: out-of-band angles, unreachable targets and
//! runaway shells come back as [`SampleStatus`] values on the sample.
//!
//! Traces go through the `log` facade at debug level; install any logger to
//! see them.

mod sim;
mod solver;

use mortar_core::ConfigError;
pub use mortar_models::DragPolicy;
pub use sim::{
    dispersion_ellipse, estimate_impact_distance, simulate, simulate_engagement, ImpactPoint,
    SampleStatus, TrajectorySample,
};
pub use solver::{
    coarse_brackets, family_bounds, search_angle, solve, solve_default, AngleSearch, Brackets,
    Family, FiringSolution,
};

/* -------------------------------- options -------------------------------- */

/// Most integration steps a checked [`SimOptions`] may ask for.
pub const MAX_STEPS: usize = 750;
/// Shortest integration step a checked [`SimOptions`] accepts [s].
pub const MIN_DT: f64 = 0.01;
/// Most simulations a checked [`PassOptions`] may spend.
pub const MAX_PASS_ITERATIONS: usize = 50;

fn finite_within(field: &'static str, value: f64, min: f64, max: f64) -> Result<(), ConfigError> {
    if value.is_finite() && (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfLimits { field, value, min, max })
    }
}

fn finite_positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NonPositive { field, value })
    }
}

#[allow(clippy::cast_precision_loss)]
fn count_within(field: &'static str, value: usize, min: usize, max: usize) -> Result<(), ConfigError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfLimits { field, value: value as f64, min: min as f64, max: max as f64 })
    }
}

/// Simulator tunables. `Default` gives the field-tested values.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize), serde(default))]
pub struct SimOptions {
    /// Integration step [s]
    pub dt: f64,
    /// Flight-time cap [s]
    pub max_time: f64,
    /// Keep one trajectory point every this many steps
    pub decimation: usize,
    /// Horizontal escape bound, as a multiple of the launcher's max range
    pub range_margin: f64,
    /// Depth below the target plane at which a run is abandoned [m]
    pub floor_margin: f64,
    /// Factor on the latched apex before it is reported
    pub apex_calibration: f64,
    pub drag: DragPolicy,
    /// Lose `15 % * sin(elevation)` of muzzle velocity at launch
    pub steep_angle_velocity_loss: bool,
}

impl Default for SimOptions {
    fn default() -> Self {
        Self {
            dt: 0.2,
            max_time: 150.0,
            decimation: 20,
            range_margin: mortar_core::RANGE_MARGIN,
            floor_margin: 100.0,
            apex_calibration: 0.6,
            drag: DragPolicy::MachBased,
            steep_angle_velocity_loss: true,
        }
    }
}

impl SimOptions {
    /// Upper bound on integration steps (750 with the defaults).
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn max_steps(&self) -> usize {
        if self.dt.is_nan() || self.dt <= 0.0 || !self.max_time.is_finite() || self.max_time <= 0.0 {
            return 0;
        }
        (self.max_time / self.dt).ceil() as usize
    }

    /// Reject tunables that would stall or break a run.
    /// The step count is capped at [`MAX_STEPS`].
    pub fn checked(self) -> Result<Self, ConfigError> {
        finite_within("dt", self.dt, MIN_DT, 1.0)?;
        finite_positive("max_time", self.max_time)?;
        count_within("max_steps", self.max_steps(), 1, MAX_STEPS)?;
        count_within("decimation", self.decimation, 1, MAX_STEPS)?;
        finite_positive("range_margin", self.range_margin)?;
        finite_within("floor_margin", self.floor_margin, 0.0, f64::MAX)?;
        finite_positive("apex_calibration", self.apex_calibration)?;
        Ok(self)
    }
}

/// One pass of the damped angle search. Overrides must give every field.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PassOptions {
    /// Simulations allowed in this pass
    pub iterations: usize,
    /// Early exit once the impact estimate is this close [m]
    pub threshold_m: f64,
    /// Multiplier on the step when moving the angle
    pub boost: f64,
    /// Step shrink factor per iteration
    pub damping: f64,
    /// Give up once the step falls below this [deg]; 0 disables
    pub min_step_deg: f64,
    /// Cap each move by the secant estimate of the remaining correction
    pub secant_limited: bool,
}

impl PassOptions {
    /// Wide, fast pass from the range brackets. Early exit at 3x the 1 m accuracy.
    pub fn coarse() -> Self {
        Self {
            iterations: 3,
            threshold_m: 3.0,
            boost: 2.5,
            damping: 0.3,
            min_step_deg: 2.0,
            secant_limited: false,
        }
    }

    /// Narrow pass around the corrected angle.
    pub fn refine() -> Self {
        Self {
            iterations: 5,
            threshold_m: 10.0,
            boost: 1.0,
            damping: 0.7,
            min_step_deg: 0.0,
            secant_limited: true,
        }
    }

    pub fn checked(self) -> Result<Self, ConfigError> {
        count_within("iterations", self.iterations, 1, MAX_PASS_ITERATIONS)?;
        finite_positive("threshold_m", self.threshold_m)?;
        finite_positive("boost", self.boost)?;
        // strictly inside (0, 1) so the step shrinks every iteration
        if !(self.damping.is_finite() && self.damping > 0.0 && self.damping < 1.0) {
            return Err(ConfigError::OutOfLimits { field: "damping", value: self.damping, min: 0.0, max: 1.0 });
        }
        finite_within("min_step_deg", self.min_step_deg, 0.0, 90.0)?;
        Ok(self)
    }
}

/// Solver tunables, including the simulator's.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize), serde(default))]
pub struct SolverOptions {
    pub sim: SimOptions,
    pub coarse: PassOptions,
    pub refine: PassOptions,
    /// Elevation separating the low and high families [deg]
    pub split_angle_deg: f64,
    /// Width of the refinement bracket above the corrected angle [deg]
    pub refine_span_deg: f64,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            sim: SimOptions::default(),
            coarse: PassOptions::coarse(),
            refine: PassOptions::refine(),
            split_angle_deg: 45.0,
            refine_span_deg: 20.0,
        }
    }
}

impl SolverOptions {
    /// Validate every nested option set. Hosts should call this before
    /// handing options to [`solve`].
    pub fn checked(self) -> Result<Self, ConfigError> {
        self.sim.checked()?;
        self.coarse.checked()?;
        self.refine.checked()?;
        finite_within("split_angle_deg", self.split_angle_deg, 0.0, 90.0)?;
        finite_within("refine_span_deg", self.refine_span_deg, f64::MIN_POSITIVE, 90.0)?;
        Ok(self)
    }
}

/* ----------------------------------- tests ---------------------------------- */

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_step_budget() {
        assert_eq!(SimOptions::default().max_steps(), 750);
    }

    #[test]
    fn degenerate_step_budget() {
        let zero_dt = SimOptions { dt: 0.0, ..SimOptions::default() };
        assert_eq!(zero_dt.max_steps(), 0);
        let nan_dt = SimOptions { dt: f64::NAN, ..SimOptions::default() };
        assert_eq!(nan_dt.max_steps(), 0);
        let endless = SimOptions { max_time: f64::INFINITY, ..SimOptions::default() };
        assert_eq!(endless.max_steps(), 0);
    }

    #[test]
    fn pass_defaults() {
        let o = SolverOptions::default();
        assert_eq!(o.coarse.iterations, 3);
        assert_eq!(o.refine.iterations, 5);
        assert!(!o.coarse.secant_limited && o.refine.secant_limited);
        assert_eq!(o.sim.drag, DragPolicy::MachBased);
    }

    #[test]
    fn defaults_pass_validation() {
        let o = SolverOptions::default();
        assert_eq!(o.checked(), Ok(o));
    }

    #[test]
    fn runaway_options_are_rejected() {
        let tiny_dt = SolverOptions {
            sim: SimOptions { dt: 1e-9, ..SimOptions::default() },
            ..SolverOptions::default()
        };
        assert!(matches!(tiny_dt.checked(), Err(ConfigError::OutOfLimits { field: "dt", .. })));

        let long_flight = SimOptions { max_time: 1e6, ..SimOptions::default() };
        assert!(matches!(long_flight.checked(), Err(ConfigError::OutOfLimits { field: "max_steps", .. })));

        let no_decimation = SimOptions { decimation: 0, ..SimOptions::default() };
        assert!(matches!(no_decimation.checked(), Err(ConfigError::OutOfLimits { field: "decimation", .. })));

        let endless_pass = SolverOptions {
            refine: PassOptions { iterations: 1_000_000, ..PassOptions::refine() },
            ..SolverOptions::default()
        };
        assert!(matches!(endless_pass.checked(), Err(ConfigError::OutOfLimits { field: "iterations", .. })));

        for damping in [0.0, 1.0, f64::NAN] {
            let pass = PassOptions { damping, ..PassOptions::coarse() };
            assert!(pass.checked().is_err(), "damping {damping}");
        }

        let no_span = SolverOptions { refine_span_deg: 0.0, ..SolverOptions::default() };
        assert!(no_span.checked().is_err());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn partial_json_overrides() {
        let o: SolverOptions =
            serde_json::from_str(r#"{"split_angle_deg": 50.0, "sim": {"drag": "ProjectileSpecific"}}"#)
                .unwrap();
        assert_eq!(o.split_angle_deg, 50.0);
        assert_eq!(o.sim.drag, DragPolicy::ProjectileSpecific);
        assert_eq!(o.sim.dt, 0.2);
        assert_eq!(o.refine, PassOptions::refine());
    }
}
