//! Elevation search per family and the two-family firing solution.
//!
//! Each family gets two damped passes. The coarse pass starts from brackets
//! derived from where the target sits in the launcher's range band and moves
//! by a boosted, quickly shrinking step. The ammunition correction is applied
//! once to its result, then the refine pass walks a 20° bracket above the
//! corrected angle with secant-limited moves. The angle with the smallest
//! observed miss wins, and is flown one last time for the reported sample.

use log::{debug, warn};
use mortar_core::{Engagement, Launcher, Projectile, Weather};

use crate::sim::{estimate_impact_distance, simulate_engagement, SampleStatus, TrajectorySample};
use crate::{PassOptions, SimOptions, SolverOptions};

/// Elevation family.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Family {
    /// Above the split angle; range falls as elevation rises.
    High,
    /// Below the split angle; range grows with elevation.
    Low,
}

impl Family {
    fn raises_when_short(self) -> bool {
        matches!(self, Family::Low)
    }
}

/// Coarse-pass `(start, end)` angles per family [deg].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Brackets {
    pub high: (f64, f64),
    pub low: (f64, f64),
    /// `atan2(height_diff, distance)` folded into every bracket [deg]
    pub height_correction_deg: f64,
}

impl Brackets {
    pub fn for_family(&self, family: Family) -> (f64, f64) {
        match family {
            Family::High => self.high,
            Family::Low => self.low,
        }
    }
}

/// Starting brackets from the target's position in the range band.
///
/// With `n` the normalized distance (0 at min range, 1 at max range), the
/// high family starts at `maxEl*(1 − 0.3n)` and the low family ends at
/// `minEl*(1 + 0.2n)`, both families meeting at `maxEl*(0.7 − 0.3n)`.
pub fn coarse_brackets(launcher: &Launcher, distance_m: f64, height_diff_m: f64) -> Brackets {
    let span = launcher.max_range_m - launcher.min_range_m;
    let n = if span > 0.0 { (distance_m - launcher.min_range_m) / span } else { 0.0 };
    let hc = height_diff_m.atan2(distance_m).to_degrees();
    let max_el = launcher.max_elevation_deg;
    let min_el = launcher.min_elevation_deg;
    let middle = max_el * (0.7 - n * 0.3) + hc;

    Brackets {
        high: (max_el * (1.0 - n * 0.3) + hc, middle),
        low: (middle, min_el * (1.0 + n * 0.2) + hc),
        height_correction_deg: hc,
    }
}

/// Angle range a family may search, split at `split_angle_deg` clamped into
/// the launcher's band.
pub fn family_bounds(launcher: &Launcher, family: Family, split_angle_deg: f64) -> (f64, f64) {
    let split = launcher.clamp_elevation(split_angle_deg);
    match family {
        Family::High => (split, launcher.max_elevation_deg.max(split)),
        Family::Low => (launcher.min_elevation_deg.min(split), split),
    }
}

/// Best angle one search pass found.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AngleSearch {
    pub angle_deg: f64,
    /// Smallest `|estimate − distance|` seen [m]; infinite if no shot landed
    pub residual_m: f64,
    /// Residual went under the pass threshold
    pub converged: bool,
    /// Simulations run
    pub evaluations: usize,
}

fn clamp_into(angle: f64, (lo, hi): (f64, f64)) -> f64 {
    angle.max(lo).min(hi)
}

/// One damped search pass over `bounds`, starting at `bracket.0` with an
/// initial step of half the bracket width.
///
/// Shots that do not land reset the angle to the middle of `bounds`. The
/// returned angle is the best one observed, not the last one tried.
pub fn search_angle(
    e: &Engagement,
    family: Family,
    bracket: (f64, f64),
    bounds: (f64, f64),
    pass: &PassOptions,
    sim: &SimOptions,
) -> AngleSearch {
    let target = e.distance_m;
    let mut angle = clamp_into(bracket.0, bounds);
    let mut step = (bracket.1 - bracket.0).abs() / 2.0;
    let mut best = AngleSearch {
        angle_deg: angle,
        residual_m: f64::INFINITY,
        converged: false,
        evaluations: 0,
    };
    // last (angle, estimate) for the secant
    let mut previous: Option<(f64, f64)> = None;

    for _ in 0..pass.iterations {
        let sample = simulate_engagement(e, angle, sim);
        best.evaluations += 1;

        if let Some(estimate) = estimate_impact_distance(&sample, e.height_diff_m) {
            let residual = (estimate - target).abs();
            if residual < best.residual_m {
                best.residual_m = residual;
                best.angle_deg = angle;
            }
            if residual < pass.threshold_m {
                break;
            }

            let mut delta = step * pass.boost;
            if pass.secant_limited {
                if let Some((prev_angle, prev_estimate)) = previous {
                    if prev_angle != angle {
                        let slope = (estimate - prev_estimate) / (angle - prev_angle);
                        if slope != 0.0 && slope.is_finite() {
                            delta = delta.min(((estimate - target) / slope).abs());
                        }
                    }
                }
            }
            previous = Some((angle, estimate));

            let short = estimate < target;
            if short == family.raises_when_short() {
                angle += delta;
            } else {
                angle -= delta;
            }
        } else {
            angle = (bounds.0 + bounds.1) / 2.0;
            previous = None;
        }

        step *= pass.damping;
        angle = clamp_into(angle, bounds);
        if pass.min_step_deg > 0.0 && step < pass.min_step_deg {
            break;
        }
    }

    best.converged = best.residual_m < pass.threshold_m;
    best
}

/// Both firing solutions for one engagement.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FiringSolution {
    pub high: TrajectorySample,
    pub low: TrajectorySample,
    /// Refine-pass outcome; `None` when the target was rejected up front
    pub high_search: Option<AngleSearch>,
    pub low_search: Option<AngleSearch>,
}

impl FiringSolution {
    fn out_of_range() -> Self {
        Self {
            high: TrajectorySample::rejected(0.0, SampleStatus::TargetOutOfRange),
            low: TrajectorySample::rejected(0.0, SampleStatus::TargetOutOfRange),
            high_search: None,
            low_search: None,
        }
    }

    pub fn sample(&self, family: Family) -> &TrajectorySample {
        match family {
            Family::High => &self.high,
            Family::Low => &self.low,
        }
    }

    pub fn into_pair(self) -> (TrajectorySample, TrajectorySample) {
        (self.high, self.low)
    }
}

fn solve_family(
    e: &Engagement,
    family: Family,
    bracket: (f64, f64),
    opts: &SolverOptions,
) -> (TrajectorySample, AngleSearch) {
    let bounds = family_bounds(&e.launcher, family, opts.split_angle_deg);
    let coarse = search_angle(e, family, bracket, bounds, &opts.coarse, &opts.sim);

    let corrected = e.projectile.corrected_angle(coarse.angle_deg);
    if corrected != coarse.angle_deg {
        debug!(
            "{family:?}: {} correction {:.2}° -> {:.2}°",
            e.projectile.name, coarse.angle_deg, corrected
        );
    }

    // same family bounds as the coarse pass; the span only sizes the first step
    let refine_bracket = (corrected, corrected + opts.refine_span_deg);
    let refined = search_angle(e, family, refine_bracket, bounds, &opts.refine, &opts.sim);
    debug!(
        "{family:?}: refined {:.3}° (coarse {:.3}°), residual {:.2} m after {} shots",
        refined.angle_deg, coarse.angle_deg, refined.residual_m, refined.evaluations
    );
    if !refined.converged {
        warn!(
            "{family:?}: no convergence at {:.1} m, best residual {:.1} m",
            e.distance_m, refined.residual_m
        );
    }

    (simulate_engagement(e, refined.angle_deg, &opts.sim), refined)
}

/// High- and low-angle solutions for `e`.
///
/// Targets outside `[min_range, max_range * 1.2]` give two
/// `TargetOutOfRange` samples without simulating anything.
pub fn solve(e: &Engagement, opts: &SolverOptions) -> FiringSolution {
    let l = &e.launcher;
    let w = &e.weather;
    debug!(
        "solve: {:.1} m, height diff {:.1} m, {} with {}; {:.1} °C, {:.1} hPa, wind {:.1} m/s from {:.0}°",
        e.distance_m,
        e.height_diff_m,
        l.name,
        e.projectile.name,
        w.temperature_c,
        w.pressure_hpa,
        w.wind_speed_mps,
        w.wind_direction_deg
    );

    if !l.accepts_distance(e.distance_m) {
        debug!(
            "target at {:.1} m outside {:.0}..{:.0} m",
            e.distance_m,
            l.min_range_m,
            l.max_range_m * opts.sim.range_margin
        );
        return FiringSolution::out_of_range();
    }

    let brackets = coarse_brackets(l, e.distance_m, e.height_diff_m);
    debug!(
        "brackets: high {:.2}..{:.2}°, low {:.2}..{:.2}°, height correction {:.2}°",
        brackets.high.0,
        brackets.high.1,
        brackets.low.0,
        brackets.low.1,
        brackets.height_correction_deg
    );

    let (high, high_search) = solve_family(e, Family::High, brackets.high, opts);
    let (low, low_search) = solve_family(e, Family::Low, brackets.low, opts);
    debug!(
        "solution: high {:.2}° ({:?}, {:.1} s), low {:.2}° ({:?}, {:.1} s)",
        high.angle_deg,
        high.status,
        high.time_of_flight_s,
        low.angle_deg,
        low.status,
        low.time_of_flight_s
    );

    FiringSolution {
        high,
        low,
        high_search: Some(high_search),
        low_search: Some(low_search),
    }
}

/// [`solve`] with default options, returning `(high, low)`.
pub fn solve_default(
    launcher: &Launcher,
    projectile: &Projectile,
    distance_m: f64,
    height_diff_m: f64,
    weather: &Weather,
) -> (TrajectorySample, TrajectorySample) {
    let e = Engagement::new(distance_m, height_diff_m, launcher.clone(), projectile.clone(), *weather);
    solve(&e, &SolverOptions::default()).into_pair()
}
