//! Vertex normals for the displaced surface.
//!
//! Area-weighted: each triangle adds its unnormalized face normal (length is
//! twice its area) to its three corners, then every vertex is normalized.

use glam::Vec3;

use crate::error::{KelvinletError, Result};

/// Check that `indices` describes whole triangles over `vertex_count` vertices.
pub fn validate_indices(indices: &[u32], vertex_count: usize) -> Result<()> {
    if indices.len() % 3 != 0 {
        return Err(KelvinletError::IndexCount(indices.len()));
    }
    if let Some(&index) = indices.iter().find(|&&i| i as usize >= vertex_count) {
        return Err(KelvinletError::IndexOutOfRange {
            index,
            vertex_count,
        });
    }
    Ok(())
}

/// Recompute area-weighted vertex normals into `normals`.
///
/// `indices` must already be validated against `positions`. Vertices touched
/// by no triangle, or only by degenerate ones, get `Vec3::ZERO`.
pub fn compute_vertex_normals(positions: &[Vec3], indices: &[u32], normals: &mut Vec<Vec3>) {
    normals.clear();
    normals.resize(positions.len(), Vec3::ZERO);

    for tri in indices.chunks_exact(3) {
        let (a, b, c) = (tri[0] as usize, tri[1] as usize, tri[2] as usize);
        let face = (positions[b] - positions[a]).cross(positions[c] - positions[a]);
        normals[a] += face;
        normals[b] += face;
        normals[c] += face;
    }

    for n in normals.iter_mut() {
        *n = n.normalize_or_zero();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad() -> (Vec<Vec3>, Vec<u32>) {
        let positions = vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 1.0),
            Vec3::new(0.0, 0.0, 1.0),
        ];
        // Counter-clockwise seen from +Y
        let indices = vec![0, 2, 1, 0, 3, 2];
        (positions, indices)
    }

    #[test]
    fn test_flat_quad_points_up() {
        let (positions, indices) = quad();
        let mut normals = Vec::new();
        compute_vertex_normals(&positions, &indices, &mut normals);
        assert_eq!(normals.len(), 4);
        for n in normals {
            assert!((n - Vec3::Y).length() < 1e-6, "{n:?}");
        }
    }

    #[test]
    fn test_larger_face_dominates() {
        // Two triangles sharing vertex 0: a large one facing +Y, a small one facing +Z
        let positions = vec![
            Vec3::ZERO,
            Vec3::new(0.0, 0.0, 4.0),
            Vec3::new(4.0, 0.0, 0.0),
            Vec3::new(0.1, 0.0, 0.0),
            Vec3::new(0.0, 0.1, 0.0),
        ];
        let indices = vec![0, 1, 2, 0, 3, 4];
        let mut normals = Vec::new();
        compute_vertex_normals(&positions, &indices, &mut normals);
        assert!(normals[0].y > 0.99);
        assert!(normals[0].z > 0.0);
        assert!((normals[3] - Vec3::Z).length() < 1e-6);
    }

    #[test]
    fn test_unreferenced_vertex_is_zero() {
        let (mut positions, indices) = quad();
        positions.push(Vec3::splat(5.0));
        let mut normals = vec![Vec3::ONE; 2];
        compute_vertex_normals(&positions, &indices, &mut normals);
        assert_eq!(normals.len(), 5);
        assert_eq!(normals[4], Vec3::ZERO);
    }

    #[test]
    fn test_validate_indices() {
        assert!(validate_indices(&[0, 1, 2], 3).is_ok());
        assert!(validate_indices(&[], 0).is_ok());
        assert!(matches!(
            validate_indices(&[0, 1], 3),
            Err(KelvinletError::IndexCount(2))
        ));
        assert!(matches!(
            validate_indices(&[0, 1, 3], 3),
            Err(KelvinletError::IndexOutOfRange {
                index: 3,
                vertex_count: 3
            })
        ));
    }
}
