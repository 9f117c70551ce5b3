//! Triangle meshes and the procedural unit sphere.

use crate::vec3;
use std::f32::consts::PI;

/// Four parallel buffers, ready for vertex/index upload. Built once by the
/// generator and never mutated afterwards.
pub struct TriMesh {
  pub vertices: Vec<f32>,    // 3 per vertex
  pub tri_indices: Vec<u16>, // 3 per triangle
  pub tex_coords: Vec<f32>,  // 2 per vertex
  pub norms: Vec<f32>,       // 3 per triangle, or empty
}

impl TriMesh {
  #[must_use]
  pub fn vertex_count(&self) -> usize {
    self.vertices.len() / 3
  }

  #[must_use]
  pub fn triangle_count(&self) -> usize {
    self.tri_indices.len() / 3
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormalMode {
  None,
  Face,
}

/// Unit-radius UV sphere; scaling to a body's radius happens in its model
/// matrix.
///
/// Each of the `lat` interior rings holds `2 * long + 2` vertices spanning
/// the closed azimuth range [0, 2pi], so every ring's last vertex coincides
/// with its first and carries the wrapped texture coordinate. Vertex count is
/// `2 + lat * (2 * long + 2)`; callers must keep that within u16 index range,
/// the generator does not check.
#[must_use]
pub fn gen_unit_sphere_mesh(lat: u32, long: u32, normals: NormalMode) -> TriMesh {
  let ring_verts = (long * 2 + 2) as usize;
  let theta_inc = PI / (lat + 1) as f32;
  let phi_inc = (2.0 * PI) / (ring_verts - 1) as f32;

  let mut vertices: Vec<f32> = vec![0.0, 1.0, 0.0]; // north pole
  for i in 1..=lat {
    let theta = theta_inc * i as f32;
    for j in 0..ring_verts {
      let phi = phi_inc * j as f32;
      vertices.push(phi.cos() * theta.sin());
      vertices.push(theta.cos());
      vertices.push(phi.sin() * theta.sin());
    }
  }
  vertices.push(0.0);
  vertices.push(-1.0);
  vertices.push(0.0); // south pole
  let sp_idx = vertices.len() / 3 - 1;
  log::trace!("sphere lat={lat} long={long}: {} vertices", sp_idx + 1);

  let mut tri_idxs: Vec<u16> = Vec::with_capacity((ring_verts - 1) * (lat as usize) * 6);
  for i in 0..ring_verts - 1 {
    tri_idxs.extend_from_slice(&[0, (i + 1) as u16, (i + 2) as u16]);
  }
  for band in 0..lat.saturating_sub(1) as usize {
    let k = 1 + band * ring_verts;
    for j in 0..ring_verts - 1 {
      let m = (k + j) as u16;
      let below = m + ring_verts as u16;
      tri_idxs.extend_from_slice(&[m, below, below + 1]);
      tri_idxs.extend_from_slice(&[m, below + 1, m + 1]);
    }
  }
  let k = sp_idx - ring_verts;
  for i in 0..ring_verts - 1 {
    tri_idxs.extend_from_slice(&[(k + i) as u16, sp_idx as u16, (k + i + 1) as u16]);
  }

  let mut tex_coords: Vec<f32> = Vec::with_capacity((sp_idx + 1) * 2);
  for v in vertices.chunks_exact(3) {
    let (x, y, z) = (v[0], v[1], v[2]);
    let mut u = z.atan2(x) / (2.0 * PI);
    if u < 0.0 {
      u += 1.0;
    }
    tex_coords.push(u);
    tex_coords.push(0.5 - y.clamp(-1.0, 1.0).asin() / PI);
  }
  // seam fix-up: each ring's final vertex duplicates its first and must wrap
  // to u = 1.0
  for ring in 1..=lat as usize {
    tex_coords[(ring * ring_verts) * 2] = 1.0;
  }

  let norms = match normals {
    NormalMode::None => Vec::new(),
    NormalMode::Face => face_normals(&vertices, &tri_idxs),
  };

  TriMesh {
    vertices,
    tri_indices: tri_idxs,
    tex_coords,
    norms,
  }
}

fn face_normals(vertices: &[f32], tri_idxs: &[u16]) -> Vec<f32> {
  let mut norms = Vec::with_capacity(tri_idxs.len());
  let vert = |i: u16| -> vec3::Vec3 {
    let at = i as usize * 3;
    [vertices[at], vertices[at + 1], vertices[at + 2]]
  };
  for tri in tri_idxs.chunks_exact(3) {
    let (p1, p2, p3) = (vert(tri[0]), vert(tri[1]), vert(tri[2]));
    let mut e1 = vec3::ZERO;
    vec3::subtract(&mut e1, p2, p1);
    let mut e2 = vec3::ZERO;
    vec3::subtract(&mut e2, p3, p2);
    let mut n = vec3::ZERO;
    vec3::cross(&mut n, e1, e2);
    let unnormalized = n;
    vec3::normalize(&mut n, unnormalized);
    norms.extend_from_slice(&n);
  }
  norms
}

/// 36 corner positions of a unit cube, drawn unindexed by the sky pass.
#[rustfmt::skip]
pub const SKYBOX_VERTICES: [f32; 108] = [
  -1.0,  1.0, -1.0,
  -1.0, -1.0, -1.0,
   1.0, -1.0, -1.0,
   1.0, -1.0, -1.0,
   1.0,  1.0, -1.0,
  -1.0,  1.0, -1.0,

  -1.0, -1.0,  1.0,
  -1.0, -1.0, -1.0,
  -1.0,  1.0, -1.0,
  -1.0,  1.0, -1.0,
  -1.0,  1.0,  1.0,
  -1.0, -1.0,  1.0,

   1.0, -1.0, -1.0,
   1.0, -1.0,  1.0,
   1.0,  1.0,  1.0,
   1.0,  1.0,  1.0,
   1.0,  1.0, -1.0,
   1.0, -1.0, -1.0,

  -1.0, -1.0,  1.0,
  -1.0,  1.0,  1.0,
   1.0,  1.0,  1.0,
   1.0,  1.0,  1.0,
   1.0, -1.0,  1.0,
  -1.0, -1.0,  1.0,

  -1.0,  1.0, -1.0,
   1.0,  1.0, -1.0,
   1.0,  1.0,  1.0,
   1.0,  1.0,  1.0,
  -1.0,  1.0,  1.0,
  -1.0,  1.0, -1.0,

  -1.0, -1.0, -1.0,
  -1.0, -1.0,  1.0,
   1.0, -1.0, -1.0,
   1.0, -1.0, -1.0,
  -1.0, -1.0,  1.0,
   1.0, -1.0,  1.0,
];

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn minimal_sphere_vertex_layout() {
    let mesh = gen_unit_sphere_mesh(1, 1, NormalMode::None);
    // north pole + one ring of 2*1+2 + south pole
    assert_eq!(mesh.vertex_count(), 6);
    assert_eq!(mesh.tex_coords.len(), 12);

    // poles sit on the y axis
    assert_eq!(&mesh.vertices[0..3], &[0.0, 1.0, 0.0]);
    assert_eq!(&mesh.vertices[15..18], &[0.0, -1.0, 0.0]);

    // ring first/last vertices coincide spatially
    let first = &mesh.vertices[3..6];
    let last = &mesh.vertices[12..15];
    for i in 0..3 {
      assert!((first[i] - last[i]).abs() < 1e-5);
    }
  }

  #[test]
  fn every_vertex_lies_on_the_unit_sphere() {
    let mesh = gen_unit_sphere_mesh(5, 7, NormalMode::None);
    for v in mesh.vertices.chunks_exact(3) {
      let r = (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();
      assert!((r - 1.0).abs() < 1e-5);
    }
  }

  #[test]
  fn v_coordinate_stays_in_unit_range() {
    let mesh = gen_unit_sphere_mesh(1, 1, NormalMode::None);
    for uv in mesh.tex_coords.chunks_exact(2) {
      assert!((0.0..=1.0).contains(&uv[1]), "v out of range: {}", uv[1]);
    }
    // v grows from north pole to south pole
    assert_eq!(mesh.tex_coords[1], 0.0);
    assert_eq!(mesh.tex_coords[11], 1.0);
  }

  #[test]
  fn seam_vertices_wrap_to_u_one() {
    let mesh = gen_unit_sphere_mesh(3, 4, NormalMode::None);
    let ring_verts = 2 * 4 + 2;
    for ring in 1..=3 {
      let last = ring * ring_verts;
      assert_eq!(mesh.tex_coords[last * 2], 1.0, "ring {ring}");
      // the matching ring start stays at u = 0
      let first = 1 + (ring - 1) * ring_verts;
      assert_eq!(mesh.tex_coords[first * 2], 0.0, "ring {ring}");
    }
  }

  #[test]
  fn indices_stay_in_bounds() {
    for (lat, long) in [(1, 1), (3, 4), (20, 20)] {
      let mesh = gen_unit_sphere_mesh(lat, long, NormalMode::None);
      let count = mesh.vertex_count() as u16;
      assert!(!mesh.tri_indices.is_empty());
      assert_eq!(mesh.tri_indices.len() % 3, 0);
      for &i in &mesh.tri_indices {
        assert!(i < count, "index {i} out of {count}");
      }
    }
  }

  #[test]
  fn triangle_count_covers_fans_and_bands() {
    let (lat, long) = (3usize, 4usize);
    let mesh = gen_unit_sphere_mesh(lat as u32, long as u32, NormalMode::None);
    let steps = 2 * long + 1; // azimuthal quads per band
    let expected = 2 * steps + (lat - 1) * steps * 2;
    assert_eq!(mesh.triangle_count(), expected);
  }

  #[test]
  fn face_normals_are_unit_and_one_per_triangle() {
    let mesh = gen_unit_sphere_mesh(4, 4, NormalMode::Face);
    assert_eq!(mesh.norms.len(), mesh.triangle_count() * 3);
    for n in mesh.norms.chunks_exact(3) {
      let len = (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt();
      assert!((len - 1.0).abs() < 1e-4);
    }
  }

  #[test]
  fn no_normals_when_disabled() {
    let mesh = gen_unit_sphere_mesh(4, 4, NormalMode::None);
    assert!(mesh.norms.is_empty());
  }
}
