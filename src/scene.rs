//! The simulation state: one camera, the body list, and the intents posted
//! by input handling. Everything is owned here and advanced synchronously by
//! `tick`; no other code mutates it between ticks.

use crate::body::{BodyInfo, BodyKind, OrbitingBody};
use crate::camera::Camera;
use crate::constants::{self, SCALE};
use crate::vec3;
use crate::SimParams;

pub struct Scene {
  pub camera: Camera,
  pub bodies: Vec<OrbitingBody>,
  pub paused: bool,
  pub tracked: Option<usize>,
  pub tracking: bool,
  pub wireframe: bool,
}

impl Scene {
  #[must_use]
  pub fn new(params: &SimParams) -> Self {
    let div = params.mesh_divisions;
    let mut earth = OrbitingBody::new(
      BodyInfo { name: "Earth".into(), kind: BodyKind::Planet },
      [0.0, 0.0, SCALE.dist.e2s],
      0.1,
      SCALE.rad.earth,
      0.4,
      div,
    );
    earth.intrinsic = 0.5;
    let moon = OrbitingBody::new(
      BodyInfo { name: "Moon".into(), kind: BodyKind::Moon },
      [SCALE.dist.m2e, 0.0, SCALE.dist.e2s],
      0.3,
      SCALE.rad.moon,
      0.0,
      div,
    );
    let mut sun = OrbitingBody::new(
      BodyInfo { name: "Sun".into(), kind: BodyKind::Star },
      [0.0, 0.0, 0.0],
      0.01,
      SCALE.rad.sun,
      0.0,
      div,
    );
    sun.intrinsic = 2.5;

    let mut bodies = vec![earth, moon, sun];
    if params.outer_planets {
      for outer in &constants::OUTER_BODIES {
        bodies.push(OrbitingBody::new(
          BodyInfo { name: outer.name.into(), kind: BodyKind::Planet },
          [0.0, 0.0, constants::au_to_units(outer.dist_au)],
          0.05,
          outer.radius,
          0.0,
          div,
        ));
      }
      log::info!("scene populated with {} outer bodies", constants::OUTER_BODIES.len());
    }

    let camera = Camera::new([0.0, 0.0, SCALE.dist.e2s + 20.0]);
    Self {
      camera,
      bodies,
      paused: false,
      tracked: None,
      tracking: false,
      wireframe: false,
    }
  }

  /// One simulation step. Camera always advances; body spin respects the
  /// pause flag.
  pub fn tick(&mut self, delta: f32) {
    let target = if self.tracking {
      self.tracked.map(|i| self.bodies[i].pos)
    } else {
      None
    };
    if self.camera.update(delta, target) {
      self.tracking = false;
      if let Some(i) = self.tracked {
        log::info!("camera locked onto {}", self.bodies[i].info.name);
      }
    }
    if !self.paused {
      for body in &mut self.bodies {
        body.update(delta);
      }
    }
  }

  /// Arms a tracking transition toward the currently selected body.
  pub fn request_track(&mut self) {
    if self.tracked.is_some() && !self.camera.is_transitioning() {
      self.tracking = true;
    }
  }

  /// Selects the next body in the list, wrapping around.
  pub fn cycle_target(&mut self) {
    let next = match self.tracked {
      None => 0,
      Some(i) => (i + 1) % self.bodies.len(),
    };
    self.tracked = Some(next);
    log::info!("target: {}", self.bodies[next].info.name);
  }

  /// The scene's light source, i.e. wherever the star sits.
  #[must_use]
  pub fn light_pos(&self) -> vec3::Vec3 {
    self
      .bodies
      .iter()
      .find(|b| b.info.kind == BodyKind::Star)
      .map_or(vec3::ZERO, |b| b.pos)
  }

  /// Camera distance to the sun converted back to miles.
  #[must_use]
  pub fn distance_to_sun_mi(&self) -> f32 {
    let mut to = vec3::ZERO;
    vec3::subtract(&mut to, self.light_pos(), self.camera.pos);
    vec3::len(to) * constants::EARTH_RADIUS_MI
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn small_params() -> SimParams {
    SimParams { mesh_divisions: 4, ..SimParams::default() }
  }

  #[test]
  fn scene_holds_sun_earth_moon() {
    let scene = Scene::new(&small_params());
    assert_eq!(scene.bodies.len(), 3);
    let names: Vec<&str> = scene.bodies.iter().map(|b| b.info.name.as_str()).collect();
    assert_eq!(names, ["Earth", "Moon", "Sun"]);
    assert_eq!(scene.bodies[2].info.kind, BodyKind::Star);
    assert!(scene.bodies[2].radius > 100.0);
  }

  #[test]
  fn outer_planets_extend_the_list() {
    let params = SimParams { outer_planets: true, ..small_params() };
    let scene = Scene::new(&params);
    assert_eq!(scene.bodies.len(), 3 + 8);
    assert!(scene.bodies.iter().any(|b| b.info.name == "Jupiter"));
  }

  #[test]
  fn pause_freezes_spin_but_not_camera() {
    let mut scene = Scene::new(&small_params());
    scene.paused = true;
    scene.camera.velocity = [0.0, 0.0, -1.0];
    let theta_before = scene.bodies[0].theta;
    let z_before = scene.camera.pos[2];
    scene.tick(0.1);
    assert_eq!(scene.bodies[0].theta, theta_before);
    assert!(scene.camera.pos[2] < z_before);
  }

  #[test]
  fn ticking_accumulates_spin() {
    let mut scene = Scene::new(&small_params());
    for _ in 0..5 {
      scene.tick(0.1);
    }
    let earth = &scene.bodies[0];
    assert!((earth.theta - earth.omega * 0.5).abs() < 1e-6);
  }

  #[test]
  fn track_request_requires_a_selection() {
    let mut scene = Scene::new(&small_params());
    scene.request_track();
    assert!(!scene.tracking);
    scene.cycle_target();
    scene.request_track();
    assert!(scene.tracking);
  }

  #[test]
  fn tracking_completes_and_clears_the_flag() {
    let mut scene = Scene::new(&small_params());
    scene.cycle_target(); // Earth
    scene.request_track();
    for _ in 0..30 {
      scene.tick(0.1);
    }
    assert!(!scene.tracking);
    assert!(!scene.camera.is_transitioning());

    // the camera now faces the tracked body
    let target = scene.bodies[0].pos;
    let mut to = vec3::ZERO;
    vec3::subtract(&mut to, target, scene.camera.pos);
    let offset = to;
    vec3::normalize(&mut to, offset);
    let view = vec3::negate(scene.camera.dir);
    assert!(vec3::dot(view, to) > 0.999);
  }

  #[test]
  fn cycle_wraps_around() {
    let mut scene = Scene::new(&small_params());
    for _ in 0..scene.bodies.len() {
      scene.cycle_target();
    }
    assert_eq!(scene.tracked, Some(0));
  }

  #[test]
  fn sun_distance_matches_camera_start() {
    let scene = Scene::new(&small_params());
    let expected = (SCALE.dist.e2s + 20.0) * constants::EARTH_RADIUS_MI;
    let got = scene.distance_to_sun_mi();
    assert!((got - expected).abs() / expected < 1e-5);
  }
}
