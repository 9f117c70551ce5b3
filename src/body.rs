//! Orbiting bodies: spin state plus the mesh and metadata the renderer
//! consumes.

use crate::geometry::{gen_unit_sphere_mesh, NormalMode, TriMesh};
use crate::mat4::{self, Mat4};
use crate::quat;
use crate::vec3::Vec3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
  Star,
  Planet,
  Moon,
}

#[derive(Debug, Clone)]
pub struct BodyInfo {
  pub name: String,
  pub kind: BodyKind,
}

pub struct OrbitingBody {
  pub pos: Vec3,
  pub vel: Vec3,
  pub radius: f32,
  pub axial_tilt: f32,
  /// Spin axis, tilted off world up in the xz = 0 plane.
  pub spin_axis: Vec3,
  pub theta: f32,
  pub omega: f32,
  pub intrinsic: f32,
  pub mesh: TriMesh,
  pub info: BodyInfo,
}

impl OrbitingBody {
  #[must_use]
  pub fn new(
    info: BodyInfo,
    pos: Vec3,
    omega: f32,
    radius: f32,
    axial_tilt: f32,
    divisions: u32,
  ) -> Self {
    Self {
      pos,
      vel: [0.0, 0.0, 0.0],
      radius,
      axial_tilt,
      spin_axis: [axial_tilt.sin(), axial_tilt.cos(), 0.0],
      theta: 0.0,
      omega,
      intrinsic: 0.0,
      mesh: gen_unit_sphere_mesh(divisions, divisions, NormalMode::None),
      info,
    }
  }

  pub fn update(&mut self, delta: f32) {
    self.theta += self.omega * delta;
  }

  /// Model matrix rebuilt from scratch every call: spin about the tilted
  /// axis, scale to radius, translate into place.
  #[must_use]
  pub fn model_matrix(&self) -> Mat4 {
    let mut q = quat::identity();
    quat::set_axis_angle(&mut q, self.spin_axis, self.theta);
    let mut model = mat4::identity();
    mat4::from_quat(&mut model, q);
    let rotation = model;
    mat4::scale(&mut model, rotation, [self.radius, self.radius, self.radius]);
    let mut tm = mat4::identity();
    mat4::translate(&mut tm, mat4::IDENTITY, self.pos);
    let mut out = mat4::identity();
    mat4::multiply(&mut out, tm, model);
    out
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn test_body() -> OrbitingBody {
    OrbitingBody::new(
      BodyInfo { name: "Earth".into(), kind: BodyKind::Planet },
      [0.0, 0.0, 40.0],
      0.1,
      1.0,
      0.4,
      4,
    )
  }

  #[test]
  fn update_is_additive_on_theta() {
    let mut split = test_body();
    split.update(0.1);
    split.update(0.25);
    let mut joined = test_body();
    joined.update(0.35);
    assert!((split.theta - joined.theta).abs() < 1e-6);
  }

  #[test]
  fn spin_axis_is_unit_and_tilted() {
    let body = test_body();
    let [x, y, z] = body.spin_axis;
    assert!((x * x + y * y + z * z - 1.0).abs() < 1e-6);
    assert!((x - 0.4f32.sin()).abs() < 1e-6);
    assert_eq!(z, 0.0);
  }

  #[test]
  fn matrix_places_center_at_pos() {
    let mut body = test_body();
    body.update(1.7);
    let m = body.model_matrix();
    assert_eq!(&m[12..15], &body.pos[..]);
  }

  #[test]
  fn matrix_scales_by_radius() {
    let mut body = test_body();
    body.radius = 3.0;
    body.update(0.9);
    let m = body.model_matrix();
    // basis columns keep length = radius under rotation
    for col in 0..3 {
      let c = &m[col * 4..col * 4 + 3];
      let len = (c[0] * c[0] + c[1] * c[1] + c[2] * c[2]).sqrt();
      assert!((len - 3.0).abs() < 1e-4);
    }
  }

  #[test]
  fn spin_leaves_axis_fixed() {
    let mut body = test_body();
    body.update(2.3);
    let m = body.model_matrix();
    let a = body.spin_axis;
    // rotate the axis through the rotation+scale block
    let rotated = [
      m[0] * a[0] + m[4] * a[1] + m[8] * a[2],
      m[1] * a[0] + m[5] * a[1] + m[9] * a[2],
      m[2] * a[0] + m[6] * a[1] + m[10] * a[2],
    ];
    for i in 0..3 {
      assert!((rotated[i] - a[i] * body.radius).abs() < 1e-5);
    }
  }

  #[test]
  fn zero_rotation_matrix_is_scale_translate() {
    let body = test_body();
    let m = body.model_matrix();
    assert!((m[0] - 1.0).abs() < 1e-6);
    assert!((m[5] - 1.0).abs() < 1e-6);
    assert!((m[10] - 1.0).abs() < 1e-6);
    assert!(m[1].abs() < 1e-6 && m[4].abs() < 1e-6);
  }
}
