pub mod body;
pub mod camera;
pub mod constants;
pub mod geometry;
pub mod mat4;
pub mod quat;
pub mod render;
pub mod resources;
pub mod scene;
pub mod state;
pub mod vec3;

/// Tolerance shared across the math modules.
pub const EPSILON: f32 = 1e-6;

pub struct SimParams {
  pub tick_interval_ms: u64,
  pub delta_t: f32,
  pub mesh_divisions: u32,
  pub outer_planets: bool,
  pub max_ticks: u64, // headless only, 0 = run until ctrl-c
}

impl Default for SimParams {
  fn default() -> Self {
    Self {
      tick_interval_ms: 100,
      delta_t: 0.1,
      mesh_divisions: 20,
      outer_planets: false,
      max_ticks: 0,
    }
  }
}

pub struct CameraParams {
  pub speed: f32,
  pub rotational_speed: f32,
}

impl Default for CameraParams {
  fn default() -> Self {
    Self {
      speed: 10.0,
      rotational_speed: 0.5,
    }
  }
}
