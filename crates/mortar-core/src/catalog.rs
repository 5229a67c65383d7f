//! Preset launchers and ammunition.
//!
//! The engine never looks these up; they are conveniences for hosts and tests.

use crate::{same_caliber_family, AmmoKind, Launcher, Projectile};

pub fn launcher_2b14() -> Launcher {
    Launcher::new("2B14 Podnos (82mm)", 82.0, 211.0, 50.0, 4000.0, 1.0, 89.0, 1220.0)
}

pub fn launcher_m252() -> Launcher {
    Launcher::new("M252 (81mm)", 81.0, 200.0, 70.0, 5935.0, 1.0, 89.0, 1310.0)
}

pub fn launcher_2b11() -> Launcher {
    Launcher::new("2B11 Sani (120mm)", 120.0, 272.0, 100.0, 7100.0, 1.0, 89.0, 1862.0)
}

pub fn launchers() -> Vec<Launcher> {
    vec![launcher_2b14(), launcher_m252(), launcher_2b11()]
}

/* ------------------------------ 82 mm family ------------------------------ */

pub fn projectile_o832du() -> Projectile {
    Projectile::new("O-832DU", AmmoKind::Fragmentation, 82.0, 3.1, 0.45, 0.4, 15.0, 1500)
}

pub fn projectile_of832() -> Projectile {
    Projectile::new("OF-832", AmmoKind::HighExplosive, 82.0, 3.1, 0.45, 0.9, 18.0, 2000)
}

/* ------------------------------ 120 mm family ----------------------------- */

pub fn projectile_o843a() -> Projectile {
    Projectile::new("O-843A", AmmoKind::Fragmentation, 120.0, 16.5, 0.48, 1.4, 25.0, 2500)
}

pub fn projectile_of843b() -> Projectile {
    Projectile::new("OF-843B", AmmoKind::HighExplosive, 120.0, 16.5, 0.48, 1.9, 30.0, 3000)
}

pub fn projectiles() -> Vec<Projectile> {
    vec![projectile_o832du(), projectile_of832(), projectile_o843a(), projectile_of843b()]
}

/// Presets that fit `launcher`'s caliber family.
pub fn projectiles_for(launcher: &Launcher) -> Vec<Projectile> {
    projectiles_for_caliber(launcher.caliber_mm)
}

pub fn projectiles_for_caliber(caliber_mm: f64) -> Vec<Projectile> {
    projectiles().into_iter().filter(|p| same_caliber_family(caliber_mm, p.caliber_mm)).collect()
}

pub fn launcher_by_name(name: &str) -> Option<Launcher> {
    launchers().into_iter().find(|l| l.name == name)
}

pub fn projectile_by_name(name: &str) -> Option<Projectile> {
    projectiles().into_iter().find(|p| p.name == name)
}

/// The fragmentation round for `launcher`, if its family has one.
pub fn default_projectile(launcher: &Launcher) -> Option<Projectile> {
    projectile_of_kind(launcher, AmmoKind::Fragmentation)
}

pub fn projectile_of_kind(launcher: &Launcher, kind: AmmoKind) -> Option<Projectile> {
    projectiles_for(launcher).into_iter().find(|p| p.kind == kind)
}

/// Pick the round for `new_launcher` when the crew changes tubes.
///
/// Keeps `current` if it still fits; otherwise returns the same kind of round
/// from the new caliber family (HE stays HE).
pub fn swap_launcher(current: &Projectile, new_launcher: &Launcher) -> Option<Projectile> {
    if new_launcher.fits(current) {
        return Some(current.clone());
    }
    projectile_of_kind(new_launcher, current.kind)
}
