//! Unit quaternions as `[f32; 4]`, stored x, y, z, w.

use crate::mat4::Mat3;
use crate::vec3::{self, Vec3};
use crate::EPSILON;

pub type Quat = [f32; 4];

#[must_use]
pub fn identity() -> Quat {
  [0.0, 0.0, 0.0, 1.0]
}

/// `axis` must be normalized.
pub fn set_axis_angle(out: &mut Quat, axis: Vec3, rad: f32) {
  let half = rad * 0.5;
  let s = half.sin();
  out[0] = s * axis[0];
  out[1] = s * axis[1];
  out[2] = s * axis[2];
  out[3] = half.cos();
}

/// Recovers the rotation axis, returning the angle. Near-zero rotations get
/// an arbitrary valid axis.
pub fn get_axis_angle(out_axis: &mut Vec3, q: Quat) -> f32 {
  let rad = q[3].clamp(-1.0, 1.0).acos() * 2.0;
  let s = (rad / 2.0).sin();
  if s > EPSILON {
    out_axis[0] = q[0] / s;
    out_axis[1] = q[1] / s;
    out_axis[2] = q[2] / s;
  } else {
    out_axis[0] = 1.0;
    out_axis[1] = 0.0;
    out_axis[2] = 0.0;
  }
  rad
}

pub fn multiply(out: &mut Quat, a: Quat, b: Quat) {
  let [ax, ay, az, aw] = a;
  let [bx, by, bz, bw] = b;
  out[0] = ax * bw + aw * bx + ay * bz - az * by;
  out[1] = ay * bw + aw * by + az * bx - ax * bz;
  out[2] = az * bw + aw * bz + ax * by - ay * bx;
  out[3] = aw * bw - ax * bx - ay * by - az * bz;
}

pub fn conjugate(out: &mut Quat, a: Quat) {
  out[0] = -a[0];
  out[1] = -a[1];
  out[2] = -a[2];
  out[3] = a[3];
}

pub fn normalize(out: &mut Quat, a: Quat) {
  let len = (a[0] * a[0] + a[1] * a[1] + a[2] * a[2] + a[3] * a[3]).sqrt();
  let ilen = 1.0 / len;
  out[0] = a[0] * ilen;
  out[1] = a[1] * ilen;
  out[2] = a[2] * ilen;
  out[3] = a[3] * ilen;
}

/// Shortest-path spherical interpolation, falling back to linear blending
/// when the operands are nearly coincident.
pub fn slerp(out: &mut Quat, a: Quat, b: Quat, t: f32) {
  let [ax, ay, az, aw] = a;
  let [mut bx, mut by, mut bz, mut bw] = b;

  let mut cosom = ax * bx + ay * by + az * bz + aw * bw;
  if cosom < 0.0 {
    cosom = -cosom;
    bx = -bx;
    by = -by;
    bz = -bz;
    bw = -bw;
  }

  let (scale0, scale1) = if 1.0 - cosom > EPSILON {
    let omega = cosom.acos();
    let sinom = omega.sin();
    (((1.0 - t) * omega).sin() / sinom, (t * omega).sin() / sinom)
  } else {
    (1.0 - t, t)
  };

  out[0] = scale0 * ax + scale1 * bx;
  out[1] = scale0 * ay + scale1 * by;
  out[2] = scale0 * az + scale1 * bz;
  out[3] = scale0 * aw + scale1 * bw;
}

/// Shoemake's trace-based extraction. `m` must be a pure rotation.
pub fn from_mat3(out: &mut Quat, m: Mat3) {
  let trace = m[0] + m[4] + m[8];
  if trace > 0.0 {
    let mut root = (trace + 1.0).sqrt(); // 2w
    out[3] = 0.5 * root;
    root = 0.5 / root;
    out[0] = (m[5] - m[7]) * root;
    out[1] = (m[6] - m[2]) * root;
    out[2] = (m[1] - m[3]) * root;
  } else {
    let mut i = 0;
    if m[4] > m[0] {
      i = 1;
    }
    if m[8] > m[i * 3 + i] {
      i = 2;
    }
    let j = (i + 1) % 3;
    let k = (i + 2) % 3;
    let mut root = (m[i * 3 + i] - m[j * 3 + j] - m[k * 3 + k] + 1.0).sqrt();
    out[i] = 0.5 * root;
    root = 0.5 / root;
    out[3] = (m[j * 3 + k] - m[k * 3 + j]) * root;
    out[j] = (m[j * 3 + i] + m[i * 3 + j]) * root;
    out[k] = (m[k * 3 + i] + m[i * 3 + k]) * root;
  }
}

/// Rotation carrying unit vector `a` onto unit vector `b`. Opposed inputs get
/// a half-turn about an axis orthogonal to `a`; coincident inputs yield the
/// identity.
pub fn rotation_to(out: &mut Quat, a: Vec3, b: Vec3) {
  let d = vec3::dot(a, b);
  let mut tmp = vec3::ZERO;
  if d < -0.999999 {
    vec3::cross(&mut tmp, vec3::X_UNIT, a);
    if vec3::len(tmp) < EPSILON {
      vec3::cross(&mut tmp, vec3::Y_UNIT, a);
    }
    let tmp_in = tmp;
    vec3::normalize(&mut tmp, tmp_in);
    set_axis_angle(out, tmp, std::f32::consts::PI);
  } else if d > 0.999999 {
    *out = identity();
  } else {
    vec3::cross(&mut tmp, a, b);
    let q = [tmp[0], tmp[1], tmp[2], 1.0 + d];
    normalize(out, q);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::mat4;

  fn assert_quat_near(a: Quat, b: Quat) {
    for i in 0..4 {
      assert!((a[i] - b[i]).abs() < 1e-5, "component {i}: {} != {}", a[i], b[i]);
    }
  }

  fn rotate_vec(q: Quat, v: Vec3) -> Vec3 {
    // q * v * q^-1 via the vector quaternion
    let mut qv = identity();
    multiply(&mut qv, q, [v[0], v[1], v[2], 0.0]);
    let mut qc = identity();
    conjugate(&mut qc, q);
    let mut r = identity();
    multiply(&mut r, qv, qc);
    [r[0], r[1], r[2]]
  }

  #[test]
  fn identity_is_no_rotation() {
    let v = [0.3, -0.2, 0.9];
    let r = rotate_vec(identity(), v);
    for i in 0..3 {
      assert!((r[i] - v[i]).abs() < 1e-6);
    }
  }

  #[test]
  fn axis_angle_round_trip() {
    let mut q = identity();
    set_axis_angle(&mut q, [0.0, 0.0, 1.0], 1.3);
    let mut axis = vec3::ZERO;
    let rad = get_axis_angle(&mut axis, q);
    assert!((rad - 1.3).abs() < 1e-5);
    assert!((axis[2] - 1.0).abs() < 1e-5);
  }

  #[test]
  fn slerp_identical_endpoints_is_constant() {
    let mut a = identity();
    set_axis_angle(&mut a, [0.0, 1.0, 0.0], 0.7);
    for t in [0.0, 0.25, 0.5, 0.9, 1.0] {
      let mut out = identity();
      slerp(&mut out, a, a, t);
      assert_quat_near(out, a);
    }
  }

  #[test]
  fn slerp_hits_both_endpoints() {
    let mut a = identity();
    set_axis_angle(&mut a, [1.0, 0.0, 0.0], 0.4);
    let mut b = identity();
    set_axis_angle(&mut b, [0.0, 1.0, 0.0], 1.9);
    let mut out = identity();
    slerp(&mut out, a, b, 0.0);
    assert_quat_near(out, a);
    slerp(&mut out, a, b, 1.0);
    assert_quat_near(out, b);
  }

  #[test]
  fn slerp_takes_the_short_path() {
    let mut a = identity();
    set_axis_angle(&mut a, [0.0, 1.0, 0.0], 0.2);
    let mut b = identity();
    set_axis_angle(&mut b, [0.0, 1.0, 0.0], 1.2);
    let neg_b = [-b[0], -b[1], -b[2], -b[3]]; // same rotation, opposite sign
    let mut out = identity();
    slerp(&mut out, a, neg_b, 0.5);
    let mut expected = identity();
    set_axis_angle(&mut expected, [0.0, 1.0, 0.0], 0.7);
    assert_quat_near(out, expected);
  }

  #[test]
  fn slerp_midpoint_has_unit_length() {
    let mut a = identity();
    set_axis_angle(&mut a, [1.0, 0.0, 0.0], 0.9);
    let mut b = identity();
    set_axis_angle(&mut b, [0.0, 0.0, 1.0], 2.1);
    let mut out = identity();
    slerp(&mut out, a, b, 0.37);
    let len = (out[0] * out[0] + out[1] * out[1] + out[2] * out[2] + out[3] * out[3]).sqrt();
    assert!((len - 1.0).abs() < 1e-5);
  }

  #[test]
  fn from_mat3_round_trips_through_mat4() {
    for (axis, rad) in [
      ([0.0, 1.0, 0.0], 0.6),
      ([1.0, 0.0, 0.0], 2.9), // trace <= 0 branch
      ([0.0, 0.0, 1.0], 3.1),
    ] {
      let mut q = identity();
      set_axis_angle(&mut q, axis, rad);
      let mut m = mat4::identity();
      mat4::from_quat(&mut m, q);
      let mut back = identity();
      from_mat3(&mut back, mat4::to_mat3(m));
      // q and -q encode the same rotation
      if back[3] * q[3] + back[0] * q[0] + back[1] * q[1] + back[2] * q[2] < 0.0 {
        for c in &mut back {
          *c = -*c;
        }
      }
      assert_quat_near(back, q);
    }
  }

  #[test]
  fn rotation_to_carries_a_onto_b() {
    let mut q = identity();
    rotation_to(&mut q, [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]);
    let r = rotate_vec(q, [1.0, 0.0, 0.0]);
    assert!((r[0]).abs() < 1e-5 && (r[1] - 1.0).abs() < 1e-5 && r[2].abs() < 1e-5);
  }

  #[test]
  fn rotation_to_opposed_inputs() {
    let mut q = identity();
    rotation_to(&mut q, [1.0, 0.0, 0.0], [-1.0, 0.0, 0.0]);
    let r = rotate_vec(q, [1.0, 0.0, 0.0]);
    assert!((r[0] + 1.0).abs() < 1e-5);

    // opposed along y, where the world-x cross is non-degenerate
    rotation_to(&mut q, [0.0, 1.0, 0.0], [0.0, -1.0, 0.0]);
    let r = rotate_vec(q, [0.0, 1.0, 0.0]);
    assert!((r[1] + 1.0).abs() < 1e-5);
  }

  #[test]
  fn rotation_to_coincident_inputs_is_identity() {
    let mut q = [9.0; 4];
    rotation_to(&mut q, [0.0, 0.0, 1.0], [0.0, 0.0, 1.0]);
    assert_eq!(q, identity());
  }
}
