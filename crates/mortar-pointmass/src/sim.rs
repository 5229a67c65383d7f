//! Single-shot flight simulation at a fixed elevation.

use mortar_core::{air_density, Engagement, Launcher, Projectile, Weather, G};
use mortar_models::cross_section_area;

use crate::SimOptions;

/// Drops below this are treated as a level step when interpolating the impact [m].
const LEVEL_STEP_EPS: f64 = 1e-9;

/// How a run ended, or why it never started.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SampleStatus {
    /// Crossed the target plane on the way down.
    Impact,
    /// Left the horizontal bounds or fell well below the target plane.
    OutOfBounds,
    /// Still flying when the time cap ran out.
    TimeLimit,
    /// Elevation outside the launcher's band; nothing was simulated.
    AngleOutOfBounds,
    /// Distance outside the launcher's reach; nothing was simulated.
    TargetOutOfRange,
}

#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ImpactPoint {
    pub x_m: f64,
    pub z_m: f64,
}

/// Outcome of one simulated shot.
///
/// The three trajectory vectors always have equal length. Impacts end on the
/// interpolated impact point at the target height.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TrajectorySample {
    pub angle_deg: f64,
    pub status: SampleStatus,
    pub time_of_flight_s: f64,
    /// Apex after calibration [m]
    pub max_height_m: f64,
    pub trajectory_x: Vec<f64>,
    pub trajectory_y: Vec<f64>,
    pub trajectory_z: Vec<f64>,
    pub impact: Option<ImpactPoint>,
    /// Horizontal miss distance from the target [m]; `None` without an impact
    pub impact_error_m: Option<f64>,
    pub ellipse_major_m: f64,
    pub ellipse_minor_m: f64,
}

impl TrajectorySample {
    /// Sample that was never flown.
    pub fn rejected(angle_deg: f64, status: SampleStatus) -> Self {
        Self {
            angle_deg,
            status,
            time_of_flight_s: 0.0,
            max_height_m: 0.0,
            trajectory_x: Vec::new(),
            trajectory_y: Vec::new(),
            trajectory_z: Vec::new(),
            impact: None,
            impact_error_m: None,
            ellipse_major_m: 0.0,
            ellipse_minor_m: 0.0,
        }
    }

    /// False only when the shot was rejected before simulation.
    pub fn is_valid(&self) -> bool {
        !matches!(self.status, SampleStatus::AngleOutOfBounds | SampleStatus::TargetOutOfRange)
    }

    pub fn len(&self) -> usize {
        self.trajectory_y.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trajectory_y.is_empty()
    }

    fn push(&mut self, x: f64, y: f64, z: f64) {
        self.trajectory_x.push(x);
        self.trajectory_y.push(y);
        self.trajectory_z.push(z);
    }
}

/// Dispersion ellipse `(major, minor)` [m] around the aim point.
///
/// Bigger with range; steep shots spread along the major axis, flat shots
/// along the minor one.
pub fn dispersion_ellipse(caliber_mm: f64, distance_m: f64, angle_deg: f64) -> (f64, f64) {
    let (major_frac, minor_frac) = if caliber_mm <= 82.0 { (0.01, 0.007) } else { (0.008, 0.005) };
    let a = angle_deg.to_radians();
    (
        distance_m * major_frac * (1.0 + 0.5 * a.sin()),
        distance_m * minor_frac * (1.0 + 0.5 * a.cos()),
    )
}

/// Fraction of a step, in `[0, 1]`, at which the height went from `last_y`
/// to `y` through `plane`. A level step splits at its midpoint.
fn crossing_ratio(last_y: f64, y: f64, plane: f64) -> f64 {
    let drop = last_y - y;
    if drop.abs() > LEVEL_STEP_EPS {
        ((last_y - plane) / drop).clamp(0.0, 1.0)
    } else {
        0.5
    }
}

/// Fly one shot at `angle_deg` and record it.
///
/// Each step: density at the current altitude, drag from the air-relative
/// speed, velocity update, then position from the new velocity. The apex is
/// latched on the first drop in altitude. After the latch the first step that
/// crosses `height_diff_m` from above is an impact, interpolated linearly
/// inside the step for position and time.
///
/// Terminates within [`SimOptions::max_steps`] steps.
pub fn simulate(
    launcher: &Launcher,
    projectile: &Projectile,
    distance_m: f64,
    height_diff_m: f64,
    weather: &Weather,
    angle_deg: f64,
    opts: &SimOptions,
) -> TrajectorySample {
    if !launcher.accepts_elevation(angle_deg) {
        return TrajectorySample::rejected(angle_deg, SampleStatus::AngleOutOfBounds);
    }

    let a = angle_deg.to_radians();
    let v0 = if opts.steep_angle_velocity_loss {
        launcher.muzzle_velocity_mps * (1.0 - 0.15 * a.sin())
    } else {
        launcher.muzzle_velocity_mps
    };

    let (mut x, mut y, mut z) = (0.0_f64, 0.0_f64, 0.0_f64);
    let (mut vx, mut vy, mut vz) = (v0 * a.cos(), v0 * a.sin(), 0.0_f64);

    let wind = weather.wind();
    let (wind_x, wind_z) = (wind.downrange(), wind.crossrange());

    let area = cross_section_area(launcher.caliber_mm);
    let mass = projectile.mass_kg;
    let dt = opts.dt;
    let decimation = opts.decimation.max(1);
    let horizontal_limit = launcher.max_range_m * opts.range_margin;
    let floor = height_diff_m - opts.floor_margin;

    let mut out = TrajectorySample::rejected(angle_deg, SampleStatus::TimeLimit);
    out.push(x, y, z);

    let mut time = 0.0;
    let mut last_y = 0.0;
    let mut apex = 0.0;
    let mut ascending = true;

    for step in 1..=opts.max_steps() {
        let rho = air_density(y, weather);
        let (rx, ry, rz) = (vx - wind_x, vy, vz - wind_z);
        let speed = (rx * rx + ry * ry + rz * rz).sqrt();
        let cd = opts.drag.coefficient(speed, launcher.caliber_mm, projectile.drag_coefficient);

        let (ax, ay, az) = if speed > 0.0 {
            let drag = 0.5 * rho * cd * area * speed * speed;
            let k = speed * mass;
            (-drag * rx / k, -G - drag * ry / k, -drag * rz / k)
        } else {
            (0.0, -G, 0.0)
        };

        vx += ax * dt;
        vy += ay * dt;
        vz += az * dt;

        let (prev_x, prev_z) = (x, z);
        x += vx * dt;
        y += vy * dt;
        z += vz * dt;
        time += dt;

        if ascending && y < last_y {
            apex = last_y;
            ascending = false;
        }

        if !ascending && y <= height_diff_m && last_y > height_diff_m {
            let ratio = crossing_ratio(last_y, y, height_diff_m);
            let ix = prev_x + (x - prev_x) * ratio;
            let iz = prev_z + (z - prev_z) * ratio;
            out.push(ix, height_diff_m, iz);
            time -= dt * (1.0 - ratio);
            out.impact = Some(ImpactPoint { x_m: ix, z_m: iz });
            out.impact_error_m = Some((ix - distance_m).hypot(iz));
            out.status = SampleStatus::Impact;
            break;
        }

        last_y = y;

        if step % decimation == 0 {
            out.push(x, y, z);
        }

        // floor only counts after the apex
        let fell_through = !ascending && y < floor;
        if x.abs() > horizontal_limit || z.abs() > horizontal_limit || fell_through {
            out.status = SampleStatus::OutOfBounds;
            break;
        }
    }

    if ascending {
        apex = last_y.max(0.0);
    }

    let (major, minor) = dispersion_ellipse(launcher.caliber_mm, distance_m, angle_deg);
    out.time_of_flight_s = time;
    out.max_height_m = apex * opts.apex_calibration;
    out.ellipse_major_m = major;
    out.ellipse_minor_m = minor;
    out
}

/// [`simulate`] with the engagement's own distance, height and weather.
pub fn simulate_engagement(e: &Engagement, angle_deg: f64, opts: &SimOptions) -> TrajectorySample {
    simulate(
        &e.launcher,
        &e.projectile,
        e.distance_m,
        e.height_diff_m,
        &e.weather,
        angle_deg,
        opts,
    )
}

/// Horizontal distance of the first recorded point at or below the target
/// plane that is not above its predecessor. `None` unless the shot impacted.
pub fn estimate_impact_distance(sample: &TrajectorySample, height_diff_m: f64) -> Option<f64> {
    if sample.status != SampleStatus::Impact {
        return None;
    }
    let ys = &sample.trajectory_y;
    (1..ys.len())
        .find(|&i| ys[i] <= height_diff_m && ys[i] <= ys[i - 1])
        .map(|i| sample.trajectory_x[i].hypot(sample.trajectory_z[i]))
        .filter(|d| d.is_finite())
}
