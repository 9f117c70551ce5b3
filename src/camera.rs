//! Free-fly camera with an optional slerp transition toward a tracked body.
//!
//! Orientation lives in a column-major rotation matrix whose basis columns
//! are right, up and dir; the view direction is `-dir`. The basis vectors
//! are re-derived from the matrix after every change rather than integrated
//! on their own, which keeps them orthonormal over long runs.

use crate::mat4::{self, Mat4};
use crate::quat::{self, Quat};
use crate::vec3::{self, Vec3};

struct SlerpState {
  start: Quat,
  end: Quat,
  t: f32,
}

pub struct Camera {
  pub pos: Vec3,
  pub velocity: Vec3,
  pub right: Vec3,
  pub up: Vec3,
  pub dir: Vec3,
  pub omega_x: f32,
  pub omega_y: f32,
  rot_mat: Mat4,
  aspect: f32,
  fov_y: f32,
  max_z: f32,
  p_mat: Mat4,
  slerp: SlerpState,
}

impl Camera {
  #[must_use]
  pub fn new(pos: Vec3) -> Self {
    let fov_y = 0.90;
    let aspect = 1.0;
    let max_z = f32::INFINITY;
    let mut p_mat = mat4::identity();
    mat4::perspective(&mut p_mat, fov_y, aspect, 1.0, max_z);
    Self {
      pos,
      velocity: vec3::ZERO,
      right: [1.0, 0.0, 0.0],
      up: [0.0, 1.0, 0.0],
      dir: [0.0, 0.0, 1.0],
      omega_x: 0.0,
      omega_y: 0.0,
      rot_mat: mat4::identity(),
      aspect,
      fov_y,
      max_z,
      p_mat,
      slerp: SlerpState { start: quat::identity(), end: quat::identity(), t: 0.0 },
    }
  }

  #[must_use]
  pub fn rotation_matrix(&self) -> Mat4 {
    self.rot_mat
  }

  #[must_use]
  pub fn is_transitioning(&self) -> bool {
    self.slerp.t > 0.0
  }

  fn set_dirs(&mut self) {
    let m = &self.rot_mat;
    self.right = [m[0], m[1], m[2]];
    self.up = [m[4], m[5], m[6]];
    self.dir = [m[8], m[9], m[10]];
  }

  fn write_basis(&mut self) {
    let m = &mut self.rot_mat;
    m[0] = self.right[0];
    m[1] = self.right[1];
    m[2] = self.right[2];
    m[4] = self.up[0];
    m[5] = self.up[1];
    m[6] = self.up[2];
    m[8] = self.dir[0];
    m[9] = self.dir[1];
    m[10] = self.dir[2];
  }

  /// Arms the slerp transition toward `target`. The basis z column points
  /// away from the view direction, so the target direction lands in the
  /// matrix negated.
  fn begin_track(&mut self, target: Vec3) {
    let mut to = vec3::ZERO;
    vec3::subtract(&mut to, target, self.pos);
    let offset = to;
    vec3::normalize(&mut to, offset);
    let to = vec3::negate(to);

    let mut right = vec3::ZERO;
    vec3::cross(&mut right, [0.0, 1.0, 0.0], to);
    let r = right;
    vec3::normalize(&mut right, r);
    let mut up = vec3::ZERO;
    vec3::cross(&mut up, to, right);
    let u = up;
    vec3::normalize(&mut up, u);

    #[rustfmt::skip]
    let basis: Mat4 = [
      right[0], right[1], right[2], 0.0,
      up[0],    up[1],    up[2],    0.0,
      to[0],    to[1],    to[2],    0.0,
      0.0,      0.0,      0.0,      1.0,
    ];
    let mut qend = quat::identity();
    quat::from_mat3(&mut qend, mat4::to_mat3(basis));
    let mut qstart = quat::identity();
    quat::from_mat3(&mut qstart, mat4::to_mat3(self.rot_mat));
    // a small positive t marks the transition as armed rather than idle
    self.slerp = SlerpState { start: qstart, end: qend, t: 0.001 };
    log::debug!("tracking armed, to {to:?} dir {:?}", self.dir);
  }

  /// Advances one tick. `target` carries the tracked body's position while a
  /// track is requested or in flight. Returns true on the tick the
  /// transition completes.
  pub fn update(&mut self, delta: f32, target: Option<Vec3>) -> bool {
    if self.omega_x != 0.0 || self.omega_y != 0.0 {
      let a = self.rot_mat;
      mat4::rotate_y(&mut self.rot_mat, a, self.omega_y * delta);
      let a = self.rot_mat;
      mat4::rotate_x(&mut self.rot_mat, a, self.omega_x * delta);
      self.set_dirs();
      log::debug!(
        "cam {:?} vel {:?} dir {:?} right {:?} up {:?}",
        self.pos,
        self.velocity,
        self.dir,
        self.right,
        self.up
      );
    }

    if let Some(target) = target {
      if self.slerp.t == 0.0 {
        self.begin_track(target);
      }
    }

    let mut completed = false;
    if self.slerp.t > 0.0 {
      self.slerp.t = (self.slerp.t + delta).min(1.0);
      let mut q = quat::identity();
      quat::slerp(&mut q, self.slerp.start, self.slerp.end, self.slerp.t);
      mat4::from_quat(&mut self.rot_mat, q);
      self.set_dirs();
      log::debug!("tracking t={}", self.slerp.t);
      if self.slerp.t >= 1.0 {
        self.slerp.t = 0.0;
        completed = true;
        if let Some(target) = target {
          let mut to = vec3::ZERO;
          vec3::subtract(&mut to, target, self.pos);
          let offset = to;
          vec3::normalize(&mut to, offset);
          log::debug!("tracking settled, to {to:?} view {:?}", vec3::negate(self.dir));
        }
      }
    }

    let p = self.pos;
    vec3::add(&mut self.pos, p, self.velocity);
    completed
  }

  /// Level the horizon without changing the heading.
  pub fn recenter(&mut self) {
    let mut right = vec3::ZERO;
    vec3::cross(&mut right, [0.0, 1.0, 0.0], self.dir);
    if vec3::len(right) < crate::EPSILON {
      // looking straight along world up, nothing to level against
      return;
    }
    let r = right;
    vec3::normalize(&mut right, r);
    self.right = right;
    let mut up = vec3::ZERO;
    vec3::cross(&mut up, self.dir, right);
    self.up = up;
    self.write_basis();
  }

  /// Projection * view for the scene pass. The projection matrix is rebuilt
  /// only when the aspect ratio changed.
  #[must_use]
  pub fn view_projection(&mut self, aspect: f32) -> Mat4 {
    self.refresh_projection(aspect);
    let mut mat = mat4::identity();
    mat4::translate(&mut mat, mat4::IDENTITY, self.pos);
    let a = mat;
    mat4::multiply(&mut mat, a, self.rot_mat);
    let a = mat;
    // translation * rotation is rigid, always invertible
    let inverted = mat4::invert(&mut mat, a);
    debug_assert!(inverted);
    let view = mat;
    let mut out = mat4::identity();
    mat4::multiply(&mut out, self.p_mat, view);
    out
  }

  /// Projection * rotation-only inverse, scaled out to the far surround;
  /// keeps the skybox glued to the horizon regardless of position.
  #[must_use]
  pub fn sky_matrix(&mut self, aspect: f32, surround_scale: f32) -> Mat4 {
    self.refresh_projection(aspect);
    let mut m = self.rot_mat;
    let a = m;
    let inverted = mat4::invert(&mut m, a);
    debug_assert!(inverted);
    let mut sc = mat4::identity();
    mat4::scale(&mut sc, mat4::IDENTITY, [surround_scale, surround_scale, surround_scale]);
    let mut out = mat4::identity();
    mat4::multiply(&mut out, sc, m);
    let a = out;
    mat4::multiply(&mut out, self.p_mat, a);
    out
  }

  fn refresh_projection(&mut self, aspect: f32) {
    if self.aspect != aspect {
      mat4::perspective(&mut self.p_mat, self.fov_y, aspect, 1.0, self.max_z);
      self.aspect = aspect;
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn assert_vec_near(a: Vec3, b: Vec3) {
    for i in 0..3 {
      assert!((a[i] - b[i]).abs() < 1e-4, "component {i}: {a:?} != {b:?}");
    }
  }

  fn basis_is_orthonormal(cam: &Camera) {
    assert!((vec3::len(cam.right) - 1.0).abs() < 1e-4);
    assert!((vec3::len(cam.up) - 1.0).abs() < 1e-4);
    assert!((vec3::len(cam.dir) - 1.0).abs() < 1e-4);
    assert!(vec3::dot(cam.right, cam.up).abs() < 1e-4);
    assert!(vec3::dot(cam.up, cam.dir).abs() < 1e-4);
    assert!(vec3::dot(cam.dir, cam.right).abs() < 1e-4);
  }

  #[test]
  fn position_integrates_velocity() {
    let mut cam = Camera::new([0.0, 0.0, 10.0]);
    cam.velocity = [1.0, -2.0, 0.5];
    cam.update(0.1, None);
    cam.update(0.1, None);
    assert_vec_near(cam.pos, [2.0, -4.0, 11.0]);
  }

  #[test]
  fn yaw_then_pitch_is_not_pitch_then_yaw() {
    let mut a = Camera::new([0.0; 3]);
    a.omega_y = 0.6;
    a.update(1.0, None);
    a.omega_y = 0.0;
    a.omega_x = 0.3;
    a.update(1.0, None);

    // same angles, opposite order
    let mut b = Camera::new([0.0; 3]);
    b.omega_x = 0.3;
    b.update(1.0, None);
    b.omega_x = 0.0;
    b.omega_y = 0.6;
    b.update(1.0, None);

    let diff: f32 = a
      .dir
      .iter()
      .zip(b.dir.iter())
      .map(|(x, y)| (x - y).abs())
      .sum();
    assert!(diff > 1e-3, "orders agreed unexpectedly: {:?} vs {:?}", a.dir, b.dir);
  }

  #[test]
  fn rotation_keeps_basis_orthonormal() {
    let mut cam = Camera::new([0.0; 3]);
    cam.omega_x = 0.21;
    cam.omega_y = -0.4;
    for _ in 0..200 {
      cam.update(0.1, None);
    }
    basis_is_orthonormal(&cam);
  }

  #[test]
  fn tracking_turns_view_onto_target() {
    let mut cam = Camera::new([0.0, 0.0, 100.0]);
    let target = [50.0, 20.0, 0.0];
    let mut done = false;
    for _ in 0..20 {
      if cam.update(0.1, Some(target)) {
        done = true;
        break;
      }
    }
    assert!(done, "transition never completed");
    assert!(!cam.is_transitioning());

    let mut to = vec3::ZERO;
    vec3::subtract(&mut to, target, cam.pos);
    let offset = to;
    vec3::normalize(&mut to, offset);
    let view = vec3::negate(cam.dir);
    assert!(vec3::dot(view, to) > 0.9999, "view {view:?} vs {to:?}");
    basis_is_orthonormal(&cam);
  }

  #[test]
  fn tracking_arms_once_then_progresses() {
    let mut cam = Camera::new([0.0, 0.0, 100.0]);
    assert!(!cam.is_transitioning());
    cam.update(0.1, Some([0.0, 0.0, -50.0]));
    assert!(cam.is_transitioning());
    let before = cam.slerp.t;
    cam.update(0.1, Some([0.0, 0.0, -50.0]));
    assert!(cam.slerp.t > before);
  }

  #[test]
  fn recenter_levels_horizon_and_keeps_heading() {
    let mut cam = Camera::new([0.0; 3]);
    cam.omega_y = 0.8;
    cam.omega_x = 0.5;
    cam.update(1.0, None);
    cam.omega_y = 0.0;
    cam.omega_x = 0.0;
    let heading = cam.dir;
    cam.recenter();
    assert_vec_near(cam.dir, heading);
    assert!(cam.up[1] > 0.0);
    // level horizon: right has no vertical component
    assert!(cam.right[1].abs() < 1e-4);
    basis_is_orthonormal(&cam);
  }

  #[test]
  fn projection_cache_tracks_aspect() {
    let mut cam = Camera::new([0.0; 3]);
    let wide = cam.view_projection(2.0);
    let wide_again = cam.view_projection(2.0);
    assert_eq!(wide, wide_again);
    let narrow = cam.view_projection(1.0);
    assert!(wide[0] != narrow[0]);
  }

  #[test]
  fn view_projection_centers_points_on_the_view_axis() {
    // camera at +z looking down -z: a point between camera and origin lands
    // on the view axis in front of the camera
    let mut cam = Camera::new([0.0, 0.0, 10.0]);
    let vp = cam.view_projection(1.0);
    let p = [0.0f32, 0.0, 5.0, 1.0];
    let clip_x = vp[0] * p[0] + vp[4] * p[1] + vp[8] * p[2] + vp[12] * p[3];
    let clip_y = vp[1] * p[0] + vp[5] * p[1] + vp[9] * p[2] + vp[13] * p[3];
    let clip_w = vp[3] * p[0] + vp[7] * p[1] + vp[11] * p[2] + vp[15] * p[3];
    assert!(clip_x.abs() < 1e-4);
    assert!(clip_y.abs() < 1e-4);
    assert!(clip_w > 0.0);
  }
}
