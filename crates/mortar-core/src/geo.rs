//! Map-side helpers that feed an [`Engagement`].
//!
//! Flat-earth distance, bearing, and terrain elevation sampling. The ballistic
//! solver never sees coordinates; callers turn two map points into a distance
//! and a height difference here.

use serde::{Deserialize, Serialize};

use crate::{normalize_degrees, ConfigError, Engagement, Launcher, Projectile, Weather};

/// Meters per degree of latitude used by the flat-earth approximation.
pub const METERS_PER_DEGREE: f64 = 111_000.0;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// Equirectangular distance [m]; longitude scaled at the mean latitude.
pub fn flat_distance(from: GeoPoint, to: GeoPoint) -> f64 {
    let mean_lat = ((from.lat + to.lat) / 2.0).to_radians();
    let dx = (to.lon - from.lon) * METERS_PER_DEGREE * mean_lat.cos();
    let dy = (to.lat - from.lat) * METERS_PER_DEGREE;
    dx.hypot(dy)
}

/// Initial great-circle bearing from `from` to `to`, degrees in `[0, 360)`.
pub fn azimuth(from: GeoPoint, to: GeoPoint) -> f64 {
    let d_lon = (to.lon - from.lon).to_radians();
    let lat1 = from.lat.to_radians();
    let lat2 = to.lat.to_radians();
    let y = d_lon.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * d_lon.cos();
    normalize_degrees(y.atan2(x).to_degrees())
}

/// Bearing nudged into the wind: `speed * sin(wind − bearing) * 0.5` degrees.
pub fn wind_corrected_azimuth(from: GeoPoint, to: GeoPoint, weather: &Weather) -> f64 {
    let base = azimuth(from, to);
    if weather.wind_speed_mps <= 0.0 {
        return base;
    }
    let relative = normalize_degrees(weather.wind_direction_deg - base);
    let correction = weather.wind_speed_mps * relative.to_radians().sin() * 0.5;
    normalize_degrees(base + correction)
}

/// Terrain height lookup [m].
pub trait ElevationSource {
    fn elevation(&self, lat: f64, lon: f64) -> f64;
}

/// Flat ground everywhere.
#[derive(Clone, Copy, Debug, Default)]
pub struct FlatGround;

impl ElevationSource for FlatGround {
    fn elevation(&self, _lat: f64, _lon: f64) -> f64 { 0.0 }
}

impl<F> ElevationSource for F
where
    F: Fn(f64, f64) -> f64,
{
    fn elevation(&self, lat: f64, lon: f64) -> f64 { self(lat, lon) }
}

/// Geographic box a raster covers.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub lat_min: f64,
    pub lat_max: f64,
    pub lon_min: f64,
    pub lon_max: f64,
}

impl BoundingBox {
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        (self.lat_min..=self.lat_max).contains(&lat) && (self.lon_min..=self.lon_max).contains(&lon)
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self { lat_min: 30.4, lat_max: 30.6, lon_min: 47.7, lon_max: 47.9 }
    }
}

/// Bilinear sampler over a row-major grid of raw raster values.
///
/// Row 0 sits at `lat_min`, column 0 at `lon_min`. Raw values are scaled by
/// `meters_per_unit` and clamped to `[min_m, max_m]`; points outside the box
/// read as 0.
#[derive(Clone, Debug, PartialEq)]
pub struct GridElevation {
    width: usize,
    height: usize,
    values: Vec<f64>,
    pub bounds: BoundingBox,
    pub meters_per_unit: f64,
    pub min_m: f64,
    pub max_m: f64,
}

impl GridElevation {
    #[allow(clippy::cast_precision_loss)]
    pub fn new(width: usize, height: usize, values: Vec<f64>) -> Result<Self, ConfigError> {
        let cells = width.checked_mul(height).filter(|&n| n > 0);
        if cells != Some(values.len()) {
            let expected = width as f64 * height as f64;
            return Err(ConfigError::OutOfLimits {
                field: "grid values",
                value: values.len() as f64,
                min: expected,
                max: expected,
            });
        }
        Ok(Self {
            width,
            height,
            values,
            bounds: BoundingBox::default(),
            meters_per_unit: 0.3,
            min_m: 0.0,
            max_m: 100.0,
        })
    }

    pub fn with_bounds(mut self, bounds: BoundingBox) -> Self {
        self.bounds = bounds;
        self
    }

    pub fn with_scale(mut self, meters_per_unit: f64, min_m: f64, max_m: f64) -> Self {
        self.meters_per_unit = meters_per_unit;
        self.min_m = min_m;
        self.max_m = max_m;
        self
    }

    fn at(&self, col: usize, row: usize) -> f64 {
        self.values[row * self.width + col]
    }
}

impl ElevationSource for GridElevation {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    fn elevation(&self, lat: f64, lon: f64) -> f64 {
        let b = &self.bounds;
        if !b.contains(lat, lon) {
            return 0.0;
        }

        let xd = (lon - b.lon_min) / (b.lon_max - b.lon_min) * (self.width - 1) as f64;
        let yd = (lat - b.lat_min) / (b.lat_max - b.lat_min) * (self.height - 1) as f64;

        let x0 = xd.floor() as usize;
        let y0 = yd.floor() as usize;
        let x1 = (x0 + 1).min(self.width - 1);
        let y1 = (y0 + 1).min(self.height - 1);
        let wx = xd - x0 as f64;
        let wy = yd - y0 as f64;

        let h0 = self.at(x0, y0) * (1.0 - wx) + self.at(x1, y0) * wx;
        let h1 = self.at(x0, y1) * (1.0 - wx) + self.at(x1, y1) * wx;
        let raw = h0 * (1.0 - wy) + h1 * wy;

        (raw * self.meters_per_unit).clamp(self.min_m, self.max_m)
    }
}

impl Engagement {
    /// Build an engagement from two map points and a terrain source.
    pub fn between<E: ElevationSource + ?Sized>(
        launcher_pos: GeoPoint,
        target_pos: GeoPoint,
        terrain: &E,
        launcher: Launcher,
        projectile: Projectile,
        weather: Weather,
    ) -> Self {
        let distance_m = flat_distance(launcher_pos, target_pos);
        let height_diff_m = terrain.elevation(target_pos.lat, target_pos.lon)
            - terrain.elevation(launcher_pos.lat, launcher_pos.lon);
        Engagement::new(distance_m, height_diff_m, launcher, projectile, weather)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog;
    use approx::assert_abs_diff_eq;

    #[test]
    fn distance_along_a_meridian() {
        let a = GeoPoint::new(30.50, 47.80);
        let b = GeoPoint::new(30.51, 47.80);
        assert_abs_diff_eq!(flat_distance(a, b), 1110.0, epsilon = 1e-6);
        assert_abs_diff_eq!(azimuth(a, b), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn east_is_ninety() {
        let a = GeoPoint::new(30.5, 47.80);
        let b = GeoPoint::new(30.5, 47.81);
        assert_abs_diff_eq!(azimuth(a, b), 90.0, epsilon = 0.01);
        // west wraps to 270, not -90
        assert_abs_diff_eq!(azimuth(b, a), 270.0, epsilon = 0.01);
        let expected = 0.01 * METERS_PER_DEGREE * 30.5_f64.to_radians().cos();
        assert_abs_diff_eq!(flat_distance(a, b), expected, epsilon = 1e-6);
    }

    #[test]
    fn crosswind_nudges_bearing() {
        let a = GeoPoint::new(30.50, 47.80);
        let b = GeoPoint::new(30.51, 47.80);
        let calm = Weather::calm();
        assert_abs_diff_eq!(wind_corrected_azimuth(a, b, &calm), 0.0, epsilon = 1e-9);

        let east_wind = Weather::new(0.0, 1013.25, 50.0, 4.0, 90.0);
        assert_abs_diff_eq!(wind_corrected_azimuth(a, b, &east_wind), 2.0, epsilon = 1e-9);

        let west_wind = Weather::new(0.0, 1013.25, 50.0, 4.0, 270.0);
        assert_abs_diff_eq!(wind_corrected_azimuth(a, b, &west_wind), 358.0, epsilon = 1e-9);
    }

    fn ramp() -> GridElevation {
        // 3x2 grid, rising eastwards
        GridElevation::new(3, 2, vec![0.0, 100.0, 200.0, 0.0, 100.0, 200.0]).unwrap()
    }

    #[test]
    fn bilinear_sampling() {
        let g = ramp();
        assert_abs_diff_eq!(g.elevation(30.4, 47.7), 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(g.elevation(30.5, 47.75), 15.0, epsilon = 1e-9);
        assert_abs_diff_eq!(g.elevation(30.5, 47.8), 30.0, epsilon = 1e-9);
        // 200 * 0.3 = 60 m at the east edge
        assert_abs_diff_eq!(g.elevation(30.6, 47.9), 60.0, epsilon = 1e-9);
    }

    #[test]
    fn outside_box_and_clamping() {
        let g = ramp();
        assert_eq!(g.elevation(29.0, 47.8), 0.0);
        assert_eq!(g.elevation(30.5, 48.0), 0.0);

        let g = ramp().with_scale(1.0, 0.0, 150.0);
        assert_abs_diff_eq!(g.elevation(30.6, 47.9), 150.0, epsilon = 1e-9);
    }

    #[test]
    fn grid_shape_is_checked() {
        assert!(GridElevation::new(2, 2, vec![0.0; 3]).is_err());
        assert!(GridElevation::new(0, 0, vec![]).is_err());
        assert!(GridElevation::new(usize::MAX, 2, vec![]).is_err());
        assert!(GridElevation::new(2, usize::MAX, vec![0.0; 4]).is_err());
    }

    #[test]
    fn engagement_from_map_points() {
        let g = ramp();
        let mortar = GeoPoint::new(30.5, 47.7);
        let target = GeoPoint::new(30.5, 47.8);
        let e = Engagement::between(
            mortar,
            target,
            &g,
            catalog::launcher_2b14(),
            catalog::projectile_o832du(),
            Weather::calm(),
        );
        assert_abs_diff_eq!(e.height_diff_m, 30.0, epsilon = 1e-9);
        assert_abs_diff_eq!(e.distance_m, flat_distance(mortar, target), epsilon = 1e-12);

        let flat = Engagement::between(
            mortar,
            target,
            &|_: f64, _: f64| 12.0,
            catalog::launcher_2b14(),
            catalog::projectile_o832du(),
            Weather::calm(),
        );
        assert_eq!(flat.height_diff_m, 0.0);
    }
}
