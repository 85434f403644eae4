//! Triangle mesh geometry.
//!
//! A mesh owns vertex positions and index triples, plus the per-face and
//! per-vertex normals derived from them. Normals are computed once at
//! construction (and after `translate`/`scale`), so a mesh handed to a
//! [`Scene`](crate::Scene) is read-only for the whole render.

use qpath_math::{normalize_or, Aabb, Vec3};
use thiserror::Error;

use crate::material::MaterialId;

/// Fallback for vertices with no adjacent faces (or faces that cancel out).
const DEGENERATE_VERTEX_NORMAL: Vec3 = Vec3::splat(0.577_350_26);

/// Errors raised while building a mesh.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MeshError {
    #[error("triangle {triangle} references vertex {index}, but the mesh has {vertex_count} vertices")]
    IndexOutOfRange {
        triangle: usize,
        index: u32,
        vertex_count: usize,
    },
}

/// A triangle mesh with precomputed normals.
#[derive(Clone, Debug)]
pub struct Mesh {
    positions: Vec<Vec3>,
    triangles: Vec<[u32; 3]>,
    face_normals: Vec<Vec3>,
    vertex_normals: Vec<Vec3>,
    bounds: Aabb,
    material: MaterialId,
}

impl Mesh {
    /// Create a mesh from positions and triangle index triples.
    ///
    /// Fails if any index points past the end of `positions`.
    pub fn new(positions: Vec<Vec3>, triangles: Vec<[u32; 3]>) -> Result<Self, MeshError> {
        for (triangle, tri) in triangles.iter().enumerate() {
            for &index in tri {
                if index as usize >= positions.len() {
                    return Err(MeshError::IndexOutOfRange {
                        triangle,
                        index,
                        vertex_count: positions.len(),
                    });
                }
            }
        }

        let mut mesh = Self {
            positions,
            triangles,
            face_normals: Vec::new(),
            vertex_normals: Vec::new(),
            bounds: Aabb::EMPTY,
            material: MaterialId::default(),
        };
        mesh.recompute();

        let degenerate = mesh
            .triangles
            .iter()
            .filter(|tri| {
                let [p0, p1, p2] = mesh.corners(tri);
                (p1 - p0).cross(p2 - p0).length_squared() == 0.0
            })
            .count();
        if degenerate > 0 {
            log::debug!("Mesh has {} zero-area triangles out of {}", degenerate, mesh.triangles.len());
        }

        Ok(mesh)
    }

    /// Set the material used by every triangle of the mesh.
    pub fn with_material(mut self, material: MaterialId) -> Self {
        self.material = material;
        self
    }

    /// Move every vertex by `offset`.
    pub fn translate(&mut self, offset: Vec3) {
        for p in &mut self.positions {
            *p += offset;
        }
        self.bounds = Aabb::enclosing(self.positions.iter().copied());
    }

    /// Scale every vertex component-wise about the origin.
    pub fn scale(&mut self, factors: Vec3) {
        for p in &mut self.positions {
            *p *= factors;
        }
        // Non-uniform scaling changes normal directions
        self.recompute();
    }

    fn recompute(&mut self) {
        self.bounds = Aabb::enclosing(self.positions.iter().copied());
        self.compute_face_normals();
        self.compute_vertex_normals();
    }

    fn compute_face_normals(&mut self) {
        self.face_normals = self
            .triangles
            .iter()
            .map(|tri| {
                let [p0, p1, p2] = self.corners(tri);
                normalize_or((p1 - p0).cross(p2 - p0), Vec3::Z)
            })
            .collect();
    }

    /// Area-weighted average of the adjacent face normals.
    ///
    /// The unnormalized cross product of a triangle's edges has a length of
    /// twice its area, so summing those weights each face by its area.
    fn compute_vertex_normals(&mut self) {
        let mut sums = vec![Vec3::ZERO; self.positions.len()];

        for tri in &self.triangles {
            let [p0, p1, p2] = self.corners(tri);
            let weighted = (p1 - p0).cross(p2 - p0);
            for &i in tri {
                sums[i as usize] += weighted;
            }
        }

        self.vertex_normals = sums
            .into_iter()
            .map(|n| normalize_or(n, DEGENERATE_VERTEX_NORMAL))
            .collect();
    }

    #[inline]
    fn corners(&self, tri: &[u32; 3]) -> [Vec3; 3] {
        [
            self.positions[tri[0] as usize],
            self.positions[tri[1] as usize],
            self.positions[tri[2] as usize],
        ]
    }

    /// Vertex positions.
    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    /// Triangle index triples.
    pub fn triangles(&self) -> &[[u32; 3]] {
        &self.triangles
    }

    /// Unit normal of every face.
    pub fn face_normals(&self) -> &[Vec3] {
        &self.face_normals
    }

    /// Unit normal of every vertex.
    pub fn vertex_normals(&self) -> &[Vec3] {
        &self.vertex_normals
    }

    /// Bounds of all vertices.
    pub fn bounds(&self) -> Aabb {
        self.bounds
    }

    pub fn material(&self) -> MaterialId {
        self.material
    }

    /// Get the number of triangles in the mesh.
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Get the number of vertices in the mesh.
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// The three corner positions of triangle `index`.
    #[inline]
    pub fn triangle_vertices(&self, index: u32) -> [Vec3; 3] {
        self.corners(&self.triangles[index as usize])
    }

    /// Bounds of triangle `index`.
    pub fn triangle_bounds(&self, index: u32) -> Aabb {
        Aabb::enclosing(self.triangle_vertices(index))
    }

    /// Barycentric blend of the vertex normals of triangle `index`,
    /// renormalized. Falls back to the face normal if the blend vanishes.
    pub fn interpolated_normal(&self, index: u32, barycentric: Vec3) -> Vec3 {
        let tri = self.triangles[index as usize];
        let n = self.vertex_normals[tri[0] as usize] * barycentric.x
            + self.vertex_normals[tri[1] as usize] * barycentric.y
            + self.vertex_normals[tri[2] as usize] * barycentric.z;
        normalize_or(n, self.face_normals[index as usize])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad() -> Mesh {
        let positions = vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        ];
        Mesh::new(positions, vec![[0, 1, 2], [0, 2, 3]]).unwrap()
    }

    #[test]
    fn test_mesh_creation() {
        let mesh = quad();
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.triangle_count(), 2);
        assert_eq!(mesh.face_normals().len(), 2);
        assert_eq!(mesh.vertex_normals().len(), 4);
    }

    #[test]
    fn test_mesh_rejects_bad_indices() {
        let positions = vec![Vec3::ZERO, Vec3::X, Vec3::Y];
        let err = Mesh::new(positions, vec![[0, 1, 3]]).unwrap_err();
        assert_eq!(
            err,
            MeshError::IndexOutOfRange {
                triangle: 0,
                index: 3,
                vertex_count: 3
            }
        );
    }

    #[test]
    fn test_face_normals_ccw() {
        let mesh = quad();
        for n in mesh.face_normals() {
            assert!((*n - Vec3::Z).length() < 1e-6);
        }
        for n in mesh.vertex_normals() {
            assert!((*n - Vec3::Z).length() < 1e-6);
        }
    }

    #[test]
    fn test_vertex_normals_are_area_weighted() {
        // Shared vertex 0 between a large face in the XY plane (normal +Z)
        // and a small face in the XZ plane (normal -Y).
        let positions = vec![
            Vec3::ZERO,
            Vec3::new(4.0, 0.0, 0.0),
            Vec3::new(0.0, 4.0, 0.0),
            Vec3::new(0.0, 0.0, 1.0),
            Vec3::new(1.0, 0.0, 0.0),
        ];
        let mesh = Mesh::new(positions, vec![[0, 1, 2], [0, 4, 3]]).unwrap();
        let n0 = mesh.vertex_normals()[0];

        // Area 8 vs area 0.5: the big face dominates
        assert!(n0.z > 0.99);
        assert!(n0.y < 0.0);
        assert!((n0.length() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_degenerate_normals_fall_back() {
        let positions = vec![Vec3::ZERO, Vec3::X, Vec3::new(2.0, 0.0, 0.0), Vec3::Y];
        // Collinear triangle; vertex 3 is unused
        let mesh = Mesh::new(positions, vec![[0, 1, 2]]).unwrap();

        assert_eq!(mesh.face_normals()[0], Vec3::Z);
        let unused = mesh.vertex_normals()[3];
        assert!((unused.length() - 1.0).abs() < 1e-5);
        assert!((unused - Vec3::ONE.normalize()).length() < 1e-5);
    }

    #[test]
    fn test_interpolated_normal() {
        let mesh = quad();
        let n = mesh.interpolated_normal(0, Vec3::new(0.2, 0.3, 0.5));
        assert!((n - Vec3::Z).length() < 1e-6);
    }

    #[test]
    fn test_translate_and_scale() {
        let mut mesh = quad();
        mesh.scale(Vec3::new(2.0, 3.0, 1.0));
        mesh.translate(Vec3::new(0.0, 0.0, -5.0));

        let bounds = mesh.bounds();
        assert_eq!(bounds.min, Vec3::new(0.0, 0.0, -5.0));
        assert_eq!(bounds.max, Vec3::new(2.0, 3.0, -5.0));
        assert_eq!(mesh.triangle_vertices(0)[2], Vec3::new(2.0, 3.0, -5.0));
        assert!((mesh.face_normals()[0] - Vec3::Z).length() < 1e-6);
    }

    #[test]
    fn test_triangle_bounds() {
        let mesh = quad();
        let b = mesh.triangle_bounds(1);
        assert_eq!(b.min, Vec3::ZERO);
        assert_eq!(b.max, Vec3::new(1.0, 1.0, 0.0));
    }
}
