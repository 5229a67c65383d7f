//! Core mortar fire-control types
//!
//! Includes:
//! - Units & conversions (degrees / NATO mils)
//! - Atmosphere (air density with altitude)
//! - Weather & wind resolution
//! - Launcher, projectile and engagement value types
//! - Configuration errors
//!
//! Launcher/ammunition presets live in [`catalog`], map-side helpers
//! (flat-earth distance, azimuth, elevation sampling) in [`geo`].

pub mod catalog;
pub mod geo;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Gravity (m/s^2)
pub const G: f64 = 9.81;
/// Specific gas constant for dry air (J/(kg·K))
pub const R_DRY: f64 = 287.05;
/// Temperature lapse rate (K/m)
pub const LAPSE_RATE: f64 = -0.0065;

/// Range band factor: targets up to `max_range * RANGE_MARGIN` are still attempted.
pub const RANGE_MARGIN: f64 = 1.2;

/// Calibers this close share ammunition (81 mm tubes fire 82 mm rounds) [mm]
pub const CALIBER_TOLERANCE_MM: f64 = 1.0;

const MIN_TEMPERATURE_K: f64 = 200.0;
const MIN_PRESSURE_HPA: f64 = 100.0;
const MIN_DENSITY: f64 = 0.1;

/// -------------------------
/// Units & Conversions
/// -------------------------

/// NATO mils in a full circle.
const MILS_PER_TURN: f64 = 6400.0;

pub fn deg_to_mil(deg: f64) -> f64 { deg * MILS_PER_TURN / 360.0 }
pub fn mil_to_deg(mil: f64) -> f64 { mil * 360.0 / MILS_PER_TURN }

pub fn celsius_to_kelvin(c: f64) -> f64 { c + 273.15 }
pub fn hpa_to_pa(hpa: f64) -> f64 { hpa * 100.0 }

/// Wrap an angle in degrees into `[0, 360)`.
pub fn normalize_degrees(deg: f64) -> f64 {
    let wrapped = deg.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs
    if wrapped >= 360.0 { 0.0 } else { wrapped }
}

/// -------------------------
/// Errors
/// -------------------------

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{field} must be positive and finite, got {value}")]
    NonPositive { field: &'static str, value: f64 },

    #[error("{field} must lie in [{min}, {max}], got {value}")]
    OutOfLimits { field: &'static str, value: f64, min: f64, max: f64 },

    #[error("range band is inverted: min {min} m > max {max} m")]
    InvertedRange { min: f64, max: f64 },

    #[error("elevation band is inverted: min {min}° > max {max}°")]
    InvertedElevation { min: f64, max: f64 },

    #[error("projectile {projectile} ({projectile_caliber} mm) does not fit launcher {launcher} ({launcher_caliber} mm)")]
    IncompatibleProjectile {
        projectile: String,
        projectile_caliber: f64,
        launcher: String,
        launcher_caliber: f64,
    },
}

fn positive(field: &'static str, value: f64) -> Result<f64, ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(ConfigError::NonPositive { field, value })
    }
}

fn within(field: &'static str, value: f64, min: f64, max: f64) -> Result<f64, ConfigError> {
    if value.is_finite() && (min..=max).contains(&value) {
        Ok(value)
    } else {
        Err(ConfigError::OutOfLimits { field, value, min, max })
    }
}

/// -------------------------
/// Weather & Atmosphere
/// -------------------------

/// Weather for one solve. Wind direction is kept in `[0, 360)`, also when
/// read from JSON.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawWeather")]
pub struct Weather {
    pub temperature_c: f64,
    pub pressure_hpa: f64,
    /// Carried for display; the density model ignores it.
    pub humidity_pct: f64,
    pub wind_speed_mps: f64,
    pub wind_direction_deg: f64,
}

impl Weather {
    pub fn new(
        temperature_c: f64,
        pressure_hpa: f64,
        humidity_pct: f64,
        wind_speed_mps: f64,
        wind_direction_deg: f64,
    ) -> Self {
        Self {
            temperature_c,
            pressure_hpa,
            humidity_pct,
            wind_speed_mps,
            wind_direction_deg: normalize_degrees(wind_direction_deg),
        }
    }

    /// Same as [`Weather::new`] but rejects values outside the field limits
    /// (−70…+70 °C, 800…1100 hPa, 0…100 %, 0…100 m/s).
    pub fn checked(
        temperature_c: f64,
        pressure_hpa: f64,
        humidity_pct: f64,
        wind_speed_mps: f64,
        wind_direction_deg: f64,
    ) -> Result<Self, ConfigError> {
        within("temperature_c", temperature_c, -70.0, 70.0)?;
        within("pressure_hpa", pressure_hpa, 800.0, 1100.0)?;
        within("humidity_pct", humidity_pct, 0.0, 100.0)?;
        within("wind_speed_mps", wind_speed_mps, 0.0, 100.0)?;
        if !wind_direction_deg.is_finite() {
            return Err(ConfigError::OutOfLimits {
                field: "wind_direction_deg",
                value: wind_direction_deg,
                min: 0.0,
                max: 360.0,
            });
        }
        Ok(Self::new(temperature_c, pressure_hpa, humidity_pct, wind_speed_mps, wind_direction_deg))
    }

    /// Calm day at sea-level pressure, 0 °C: the field default.
    pub fn calm() -> Self {
        Self::new(0.0, 1013.25, 50.0, 0.0, 0.0)
    }

    pub fn wind(&self) -> Wind {
        Wind::new(self.wind_speed_mps, self.wind_direction_deg)
    }
}

impl Default for Weather {
    fn default() -> Self { Self::calm() }
}

#[derive(Deserialize)]
struct RawWeather {
    temperature_c: f64,
    pressure_hpa: f64,
    humidity_pct: f64,
    wind_speed_mps: f64,
    wind_direction_deg: f64,
}

impl From<RawWeather> for Weather {
    fn from(r: RawWeather) -> Self {
        Self::new(r.temperature_c, r.pressure_hpa, r.humidity_pct, r.wind_speed_mps, r.wind_direction_deg)
    }
}

/// Compute air density [kg/m³] at `height_m` above the launcher.
///
/// Linear lapse from the surface temperature (floored at 200 K), barometric
/// pressure decay (floored at 100 hPa), ideal gas. Result floored at 0.1 kg/m³.
pub fn air_density(height_m: f64, weather: &Weather) -> f64 {
    let t0 = celsius_to_kelvin(weather.temperature_c);
    let t_h = (t0 + LAPSE_RATE * height_m).max(MIN_TEMPERATURE_K);
    let p_h = (weather.pressure_hpa * (-G * height_m / (R_DRY * t_h)).exp()).max(MIN_PRESSURE_HPA);

    (hpa_to_pa(p_h) / (R_DRY * t_h)).max(MIN_DENSITY)
}

/// Horizontal wind resolved against the firing line.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Wind {
    pub speed_mps: f64,
    pub direction_deg: f64,
}

impl Wind {
    pub fn new(speed_mps: f64, direction_deg: f64) -> Self {
        Self { speed_mps, direction_deg: normalize_degrees(direction_deg) }
    }

    /// Downrange component [m/s]
    pub fn downrange(&self) -> f64 {
        self.speed_mps * self.direction_deg.to_radians().sin()
    }

    /// Crossrange component [m/s]
    pub fn crossrange(&self) -> f64 {
        self.speed_mps * self.direction_deg.to_radians().cos()
    }
}

/// -------------------------
/// Launcher
/// -------------------------

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Launcher {
    pub name: String,
    pub caliber_mm: f64,
    pub muzzle_velocity_mps: f64,
    pub min_range_m: f64,
    pub max_range_m: f64,
    pub min_elevation_deg: f64,
    pub max_elevation_deg: f64,
    pub barrel_length_mm: f64,
}

impl Launcher {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: impl Into<String>,
        caliber_mm: f64,
        muzzle_velocity_mps: f64,
        min_range_m: f64,
        max_range_m: f64,
        min_elevation_deg: f64,
        max_elevation_deg: f64,
        barrel_length_mm: f64,
    ) -> Self {
        Self {
            name: name.into(),
            caliber_mm,
            muzzle_velocity_mps,
            min_range_m,
            max_range_m,
            min_elevation_deg,
            max_elevation_deg,
            barrel_length_mm,
        }
    }

    /// Validate a launcher built by hand (e.g. from host input).
    pub fn checked(self) -> Result<Self, ConfigError> {
        positive("caliber_mm", self.caliber_mm)?;
        positive("muzzle_velocity_mps", self.muzzle_velocity_mps)?;
        positive("max_range_m", self.max_range_m)?;
        within("min_range_m", self.min_range_m, 0.0, f64::MAX)?;
        if self.min_range_m > self.max_range_m {
            return Err(ConfigError::InvertedRange { min: self.min_range_m, max: self.max_range_m });
        }
        within("min_elevation_deg", self.min_elevation_deg, 0.0, 90.0)?;
        within("max_elevation_deg", self.max_elevation_deg, 0.0, 90.0)?;
        if self.min_elevation_deg > self.max_elevation_deg {
            return Err(ConfigError::InvertedElevation {
                min: self.min_elevation_deg,
                max: self.max_elevation_deg,
            });
        }
        Ok(self)
    }

    /// Distances the engine will attempt: `[min_range, max_range * 1.2]`.
    pub fn accepts_distance(&self, distance_m: f64) -> bool {
        distance_m >= self.min_range_m && distance_m <= self.max_range_m * RANGE_MARGIN
    }

    pub fn accepts_elevation(&self, angle_deg: f64) -> bool {
        angle_deg >= self.min_elevation_deg && angle_deg <= self.max_elevation_deg
    }

    pub fn clamp_elevation(&self, angle_deg: f64) -> f64 {
        // never panics, even with min > max
        angle_deg.max(self.min_elevation_deg).min(self.max_elevation_deg)
    }

    pub fn fits(&self, projectile: &Projectile) -> bool {
        same_caliber_family(self.caliber_mm, projectile.caliber_mm)
    }
}

pub fn same_caliber_family(a_mm: f64, b_mm: f64) -> bool {
    (a_mm - b_mm).abs() <= CALIBER_TOLERANCE_MM
}

/// -------------------------
/// Projectile
/// -------------------------

/// Ammunition kind, carrying the fixed elevation correction for its family.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AmmoKind {
    Fragmentation,
    HighExplosive,
}

impl AmmoKind {
    /// Elevation added once to any computed firing angle [deg].
    pub fn angle_correction_deg(self) -> f64 {
        match self {
            AmmoKind::Fragmentation => 0.0,
            AmmoKind::HighExplosive => 0.7,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Projectile {
    pub name: String,
    pub kind: AmmoKind,
    /// Caliber family this round belongs to [mm]
    pub caliber_mm: f64,
    pub mass_kg: f64,
    pub drag_coefficient: f64,
    pub explosive_mass_kg: f64,
    pub fragmentation_radius_m: f64,
    pub fragment_count: u32,
}

impl Projectile {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: impl Into<String>,
        kind: AmmoKind,
        caliber_mm: f64,
        mass_kg: f64,
        drag_coefficient: f64,
        explosive_mass_kg: f64,
        fragmentation_radius_m: f64,
        fragment_count: u32,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            caliber_mm,
            mass_kg,
            drag_coefficient,
            explosive_mass_kg,
            fragmentation_radius_m,
            fragment_count,
        }
    }

    pub fn checked(self) -> Result<Self, ConfigError> {
        positive("caliber_mm", self.caliber_mm)?;
        positive("mass_kg", self.mass_kg)?;
        positive("drag_coefficient", self.drag_coefficient)?;
        within("explosive_mass_kg", self.explosive_mass_kg, 0.0, self.mass_kg)?;
        within("fragmentation_radius_m", self.fragmentation_radius_m, 0.0, f64::MAX)?;
        Ok(self)
    }

    pub fn angle_correction_deg(&self) -> f64 {
        self.kind.angle_correction_deg()
    }

    /// `base_deg` plus this round's correction. Apply once per solve.
    pub fn corrected_angle(&self, base_deg: f64) -> f64 {
        base_deg + self.angle_correction_deg()
    }
}

/// -------------------------
/// Engagement
/// -------------------------

/// Everything one solve needs. Passed by value; the engine never mutates it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Engagement {
    pub distance_m: f64,
    /// Target height minus launcher height [m]
    pub height_diff_m: f64,
    pub launcher: Launcher,
    pub projectile: Projectile,
    pub weather: Weather,
}

impl Engagement {
    pub fn new(
        distance_m: f64,
        height_diff_m: f64,
        launcher: Launcher,
        projectile: Projectile,
        weather: Weather,
    ) -> Self {
        Self { distance_m, height_diff_m, launcher, projectile, weather }
    }

    /// Validate every part and the launcher/projectile pairing.
    ///
    /// Distance is only checked for sanity here; the range band itself is a
    /// solve-time outcome, not a configuration error.
    pub fn checked(self) -> Result<Self, ConfigError> {
        within("distance_m", self.distance_m, 0.0, f64::MAX)?;
        if !self.height_diff_m.is_finite() {
            return Err(ConfigError::OutOfLimits {
                field: "height_diff_m",
                value: self.height_diff_m,
                min: f64::MIN,
                max: f64::MAX,
            });
        }
        let launcher = self.launcher.checked()?;
        let projectile = self.projectile.checked()?;
        let weather = Weather::checked(
            self.weather.temperature_c,
            self.weather.pressure_hpa,
            self.weather.humidity_pct,
            self.weather.wind_speed_mps,
            self.weather.wind_direction_deg,
        )?;
        if !launcher.fits(&projectile) {
            return Err(ConfigError::IncompatibleProjectile {
                projectile: projectile.name.clone(),
                projectile_caliber: projectile.caliber_mm,
                launcher: launcher.name.clone(),
                launcher_caliber: launcher.caliber_mm,
            });
        }
        Ok(Self {
            distance_m: self.distance_m,
            height_diff_m: self.height_diff_m,
            launcher,
            projectile,
            weather,
        })
    }
}

/* ----------------------------------- tests ---------------------------------- */
