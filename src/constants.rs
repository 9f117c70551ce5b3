//! Scale table. All scene geometry is denominated in Earth radii; the raw
//! figures are statute miles.

pub const EARTH_RADIUS_MI: f32 = 3960.0;
pub const SUN_RADIUS_MI: f32 = 432_450.0;
pub const MOON_RADIUS_MI: f32 = 1080.0;

pub const EARTH_TO_SUN_MI: f32 = 93_000_000.0;
pub const MOON_TO_EARTH_MI: f32 = 239_000.0;
pub const LIGHT_SPEED_MI_S: f32 = 186_282.0;

pub struct Radii {
  pub earth: f32,
  pub sun: f32,
  pub moon: f32,
}

pub struct Distances {
  pub e2s: f32,
  pub m2e: f32,
}

pub struct Scale {
  pub rad: Radii,
  pub dist: Distances,
  pub lightspeed: f32,
}

pub const SCALE: Scale = Scale {
  rad: Radii {
    earth: 1.0,
    sun: SUN_RADIUS_MI / EARTH_RADIUS_MI,
    moon: MOON_RADIUS_MI / EARTH_RADIUS_MI,
  },
  dist: Distances {
    e2s: EARTH_TO_SUN_MI / EARTH_RADIUS_MI,
    m2e: MOON_TO_EARTH_MI / EARTH_RADIUS_MI,
  },
  lightspeed: LIGHT_SPEED_MI_S / EARTH_RADIUS_MI,
};

#[must_use]
pub fn au_to_units(au: f32) -> f32 {
  au * SCALE.dist.e2s
}

/// Distance from the sun in AU and radius relative to Earth's.
pub struct OuterBody {
  pub name: &'static str,
  pub dist_au: f32,
  pub radius: f32,
}

pub const OUTER_BODIES: [OuterBody; 8] = [
  OuterBody { name: "Mercury", dist_au: 0.39, radius: 0.383 },
  OuterBody { name: "Venus", dist_au: 0.723, radius: 0.949 },
  OuterBody { name: "Mars", dist_au: 1.524, radius: 0.532 },
  OuterBody { name: "Jupiter", dist_au: 5.203, radius: 11.21 },
  OuterBody { name: "Saturn", dist_au: 9.659, radius: 9.45 },
  OuterBody { name: "Uranus", dist_au: 19.539, radius: 4.01 },
  OuterBody { name: "Neptune", dist_au: 30.06, radius: 3.88 },
  OuterBody { name: "Pluto", dist_au: 39.53, radius: 0.186 },
];
