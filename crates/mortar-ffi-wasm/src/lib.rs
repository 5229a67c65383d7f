// crates/mortar-ffi-wasm/src/lib.rs
//
// WASM bindings: firing solutions and presets for the map UI.
//
// The JSON layer (`solve_input`, `solve_json`) is plain Rust so it can be
// tested off-wasm; the `*_js` exports only convert at the JsValue edge.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use serde_wasm_bindgen as swb;
use wasm_bindgen::prelude::*;

// --- our crates ---
use mortar_core::{catalog, deg_to_mil, Engagement, Launcher, Projectile, Weather};
use mortar_pointmass::{solve, SampleStatus, SolverOptions, TrajectorySample};

// Better panic messages in browser console
#[wasm_bindgen(start)]
pub fn wasm_start() {
    console_error_panic_hook::set_once();
}

/* --------------------------- Shared DTOs (JS) --------------------------- */

/// A preset name, or a full definition.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Pick<T> {
    Preset(String),
    Custom(T),
}

impl Pick<Launcher> {
    fn resolve(self) -> Result<Launcher> {
        match self {
            Pick::Preset(name) => {
                catalog::launcher_by_name(&name).ok_or_else(|| anyhow!("unknown launcher preset {name:?}"))
            }
            Pick::Custom(l) => Ok(l),
        }
    }
}

impl Pick<Projectile> {
    fn resolve(self) -> Result<Projectile> {
        match self {
            Pick::Preset(name) => {
                catalog::projectile_by_name(&name).ok_or_else(|| anyhow!("unknown projectile preset {name:?}"))
            }
            Pick::Custom(p) => Ok(p),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct JsSolveInput {
    pub distance_m: f64,
    /// Target minus launcher elevation
    #[serde(default)]
    pub height_diff_m: f64,
    pub launcher: Pick<Launcher>,
    /// Defaults to the launcher's fragmentation round
    #[serde(default)]
    pub projectile: Option<Pick<Projectile>>,
    /// Defaults to calm standard conditions
    #[serde(default)]
    pub weather: Weather,
    #[serde(default)]
    pub options: SolverOptions,
}

#[derive(Debug, Clone, Serialize)]
pub struct JsSample {
    pub valid: bool,
    pub status: SampleStatus,
    pub angle_deg: f64,
    pub angle_mil: f64,
    pub time_of_flight_s: f64,
    pub max_height_m: f64,
    pub impact_error_m: Option<f64>,
    pub ellipse_major_m: f64,
    pub ellipse_minor_m: f64,
    pub trajectory_x: Vec<f64>,
    pub trajectory_y: Vec<f64>,
    pub trajectory_z: Vec<f64>,
}

impl From<TrajectorySample> for JsSample {
    fn from(s: TrajectorySample) -> Self {
        Self {
            valid: s.is_valid(),
            status: s.status,
            angle_deg: s.angle_deg,
            angle_mil: deg_to_mil(s.angle_deg),
            time_of_flight_s: s.time_of_flight_s,
            max_height_m: s.max_height_m,
            impact_error_m: s.impact_error_m,
            ellipse_major_m: s.ellipse_major_m,
            ellipse_minor_m: s.ellipse_minor_m,
            trajectory_x: s.trajectory_x,
            trajectory_y: s.trajectory_y,
            trajectory_z: s.trajectory_z,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct JsSolveResult {
    pub launcher: String,
    pub projectile: String,
    pub high: JsSample,
    pub low: JsSample,
}

/* ------------------------------ JSON layer ------------------------------ */

/// Resolve presets, validate, and solve.
pub fn solve_input(input: JsSolveInput) -> Result<JsSolveResult> {
    let launcher = input.launcher.resolve()?;
    let projectile = match input.projectile {
        Some(p) => p.resolve()?,
        None => catalog::default_projectile(&launcher)
            .ok_or_else(|| anyhow!("no preset round for a {} mm launcher", launcher.caliber_mm))?,
    };

    let engagement = Engagement::new(
        input.distance_m,
        input.height_diff_m,
        launcher,
        projectile,
        input.weather,
    )
    .checked()
    .context("invalid engagement")?;
    let options = input.options.checked().context("invalid solver options")?;

    let sol = solve(&engagement, &options);
    Ok(JsSolveResult {
        launcher: engagement.launcher.name,
        projectile: engagement.projectile.name,
        high: sol.high.into(),
        low: sol.low.into(),
    })
}

/// [`solve_input`] from and to JSON text.
pub fn solve_json(input: &str) -> Result<String> {
    let inp: JsSolveInput = serde_json::from_str(input).context("malformed solve input")?;
    let out = solve_input(inp)?;
    Ok(serde_json::to_string(&out)?)
}

/* ------------------------------- JS exports ------------------------------ */

fn to_js(e: &anyhow::Error) -> JsValue {
    JsValue::from_str(&format!("{e:#}"))
}

#[wasm_bindgen]
pub fn solve_js(input: JsValue) -> Result<JsValue, JsValue> {
    let inp: JsSolveInput = swb::from_value(input)?;
    let out = solve_input(inp).map_err(|e| to_js(&e))?;
    swb::to_value(&out).map_err(Into::into)
}

#[wasm_bindgen]
pub fn launcher_presets_js() -> Result<JsValue, JsValue> {
    swb::to_value(&catalog::launchers()).map_err(Into::into)
}

/// Rounds that fit a tube of `caliber_mm`.
#[wasm_bindgen]
pub fn projectile_presets_js(caliber_mm: f64) -> Result<JsValue, JsValue> {
    swb::to_value(&catalog::projectiles_for_caliber(caliber_mm)).map_err(Into::into)
}

/* ----------------------------------- tests ---------------------------------- */

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use serde_json::{json, Value};

    fn run(v: &Value) -> Result<Value> {
        Ok(serde_json::from_str(&solve_json(&v.to_string())?)?)
    }

    #[test]
    fn presets_by_name() {
        let out = run(&json!({ "distance_m": 2000.0, "launcher": "2B14 Podnos (82mm)" })).unwrap();
        assert_eq!(out["projectile"], "O-832DU");
        for family in ["high", "low"] {
            assert_eq!(out[family]["valid"], true);
            assert_eq!(out[family]["status"], "Impact");
            let deg = out[family]["angle_deg"].as_f64().unwrap();
            let mil = out[family]["angle_mil"].as_f64().unwrap();
            assert_relative_eq!(mil, deg * 6400.0 / 360.0, epsilon = 1e-9);
        }
        assert!(out["high"]["angle_deg"].as_f64().unwrap() > 45.0);
    }

    #[test]
    fn custom_launcher_and_options() {
        let launcher = serde_json::to_value(catalog::launcher_2b14()).unwrap();
        let out = run(&json!({
            "distance_m": 1500.0,
            "height_diff_m": -20.0,
            "launcher": launcher,
            "projectile": "OF-832",
            "weather": { "temperature_c": 15.0, "pressure_hpa": 1005.0, "humidity_pct": 40.0,
                         "wind_speed_mps": 3.0, "wind_direction_deg": 200.0 },
            "options": { "split_angle_deg": 50.0 }
        }))
        .unwrap();
        assert_eq!(out["projectile"], "OF-832");
        assert!(out["high"]["angle_deg"].as_f64().unwrap() >= 50.0);
        assert!(out["low"]["angle_deg"].as_f64().unwrap() <= 50.0);
    }

    #[test]
    fn out_of_range_is_data_not_error() {
        let out = run(&json!({ "distance_m": 6000.0, "launcher": "2B14 Podnos (82mm)" })).unwrap();
        assert_eq!(out["high"]["valid"], false);
        assert_eq!(out["low"]["status"], "TargetOutOfRange");
        assert_eq!(out["low"]["trajectory_y"], json!([]));
    }

    #[test]
    fn bad_input_is_an_error() {
        let unknown = run(&json!({ "distance_m": 2000.0, "launcher": "Nope" }));
        assert!(unknown.unwrap_err().to_string().contains("unknown launcher preset"));

        let mismatch = run(&json!({
            "distance_m": 2000.0,
            "launcher": "2B11 Sani (120mm)",
            "projectile": "O-832DU"
        }));
        assert!(mismatch.is_err());

        let storm = run(&json!({
            "distance_m": 2000.0,
            "launcher": "2B14 Podnos (82mm)",
            "weather": { "temperature_c": 0.0, "pressure_hpa": 1013.25, "humidity_pct": 50.0,
                         "wind_speed_mps": 150.0, "wind_direction_deg": 0.0 }
        }));
        assert!(storm.is_err());

        assert!(solve_json("{ not json").is_err());
    }

    #[test]
    fn runaway_options_are_an_error() {
        let tiny_dt = run(&json!({
            "distance_m": 2000.0,
            "launcher": "2B14 Podnos (82mm)",
            "options": { "sim": { "dt": 1e-9 } }
        }));
        let msg = format!("{:#}", tiny_dt.unwrap_err());
        assert!(msg.contains("invalid solver options"), "{msg}");
        assert!(msg.contains("dt"), "{msg}");

        let endless = run(&json!({
            "distance_m": 2000.0,
            "launcher": "2B14 Podnos (82mm)",
            "options": { "refine": { "iterations": 100000, "threshold_m": 10.0, "boost": 1.0,
                                     "damping": 0.7, "min_step_deg": 0.0, "secant_limited": true } }
        }));
        assert!(endless.is_err());
    }
}
