//! Polygon triangulation
//!
//! Converts a simple polygon's ordered boundary into a vertex/index pair
//! describing its triangulated interior. The triangulation itself is
//! delegated to `spade`'s constrained Delaunay implementation; this module
//! only constrains the boundary, filters out faces that fall outside the
//! polygon, and flattens the result into a linear index buffer.

use crate::render::vulkan::Vertex2;
use spade::{ConstrainedDelaunayTriangulation, InsertionError, Point2, Triangulation};
use std::collections::HashMap;
use thiserror::Error;

/// Triangulation errors
#[derive(Error, Debug)]
pub enum GeometryError {
    /// Fewer than three boundary points were supplied
    #[error("polygon needs at least 3 points, got {0}")]
    DegeneratePolygon(usize),

    /// A boundary point could not be inserted (NaN/infinite coordinate)
    #[error("invalid polygon vertex: {0}")]
    InvalidVertex(#[from] InsertionError),
}

/// Triangulate the interior of a simple polygon.
///
/// `points` is the ordered boundary (either winding). Returns the polygon's
/// vertices and a flat index buffer, three indices per triangle. Triangle
/// quality is whatever the Delaunay criterion produces; the only guarantee
/// is that the union of the triangles covers exactly the polygon interior.
pub fn triangulate_polygon(points: &[[f32; 2]]) -> Result<(Vec<Vertex2>, Vec<u32>), GeometryError> {
    if points.len() < 3 {
        return Err(GeometryError::DegeneratePolygon(points.len()));
    }

    let mut cdt: ConstrainedDelaunayTriangulation<Point2<f64>> =
        ConstrainedDelaunayTriangulation::new();

    // Insert the boundary and remember which triangulation vertex maps to
    // which input point. Duplicate points collapse to the same handle.
    let mut handles = Vec::with_capacity(points.len());
    let mut index_of = HashMap::new();
    for (i, p) in points.iter().enumerate() {
        let handle = cdt.insert(Point2::new(f64::from(p[0]), f64::from(p[1])))?;
        index_of.entry(handle.index()).or_insert(i as u32);
        handles.push(handle);
    }

    // Constrain each boundary edge so the polygon outline survives the
    // Delaunay flips.
    for i in 0..handles.len() {
        let a = handles[i];
        let b = handles[(i + 1) % handles.len()];
        if a != b {
            cdt.add_constraint(a, b);
        }
    }

    // The triangulation covers the convex hull; keep only faces whose
    // centroid lies inside the polygon (even-odd rule) so concave regions
    // and notches are excluded.
    let mut indices = Vec::new();
    for face in cdt.inner_faces() {
        let positions = face.positions();
        let cx = (positions[0].x + positions[1].x + positions[2].x) / 3.0;
        let cy = (positions[0].y + positions[1].y + positions[2].y) / 3.0;
        if !point_in_polygon(cx, cy, points) {
            continue;
        }
        for vertex in face.vertices() {
            indices.push(index_of[&vertex.fix().index()]);
        }
    }

    let vertices = points
        .iter()
        .map(|p| Vertex2 { position: *p })
        .collect();

    Ok((vertices, indices))
}

/// Even-odd point-in-polygon test
fn point_in_polygon(px: f64, py: f64, polygon: &[[f32; 2]]) -> bool {
    let mut inside = false;
    let mut j = polygon.len() - 1;
    for i in 0..polygon.len() {
        let (xi, yi) = (f64::from(polygon[i][0]), f64::from(polygon[i][1]));
        let (xj, yj) = (f64::from(polygon[j][0]), f64::from(polygon[j][1]));
        if (yi > py) != (yj > py) && px < (xj - xi) * (py - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }
    inside
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn triangulated_area(vertices: &[Vertex2], indices: &[u32]) -> f32 {
        indices
            .chunks_exact(3)
            .map(|tri| {
                let a = vertices[tri[0] as usize].position;
                let b = vertices[tri[1] as usize].position;
                let c = vertices[tri[2] as usize].position;
                ((b[0] - a[0]) * (c[1] - a[1]) - (c[0] - a[0]) * (b[1] - a[1])).abs() / 2.0
            })
            .sum()
    }

    #[test]
    fn triangle_yields_single_triangle() {
        let points = [[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]];
        let (vertices, indices) = triangulate_polygon(&points).unwrap();
        assert_eq!(vertices.len(), 3);
        assert_eq!(indices.len(), 3);
        assert_relative_eq!(triangulated_area(&vertices, &indices), 0.5, epsilon = 1e-6);
    }

    #[test]
    fn square_yields_two_triangles() {
        let points = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];
        let (vertices, indices) = triangulate_polygon(&points).unwrap();
        assert_eq!(indices.len(), 6);
        assert_relative_eq!(triangulated_area(&vertices, &indices), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn concave_polygon_excludes_notch() {
        // L-shape: a 2x2 square with the top-right 1x1 quadrant removed.
        let points = [
            [0.0, 0.0],
            [2.0, 0.0],
            [2.0, 1.0],
            [1.0, 1.0],
            [1.0, 2.0],
            [0.0, 2.0],
        ];
        let (vertices, indices) = triangulate_polygon(&points).unwrap();
        assert_relative_eq!(triangulated_area(&vertices, &indices), 3.0, epsilon = 1e-6);
    }

    #[test]
    fn winding_direction_does_not_matter() {
        let ccw = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];
        let cw: Vec<[f32; 2]> = ccw.iter().rev().copied().collect();
        let (v1, i1) = triangulate_polygon(&ccw).unwrap();
        let (v2, i2) = triangulate_polygon(&cw).unwrap();
        assert_relative_eq!(
            triangulated_area(&v1, &i1),
            triangulated_area(&v2, &i2),
            epsilon = 1e-6
        );
    }

    #[test]
    fn too_few_points_is_an_error() {
        let points = [[0.0, 0.0], [1.0, 0.0]];
        assert!(matches!(
            triangulate_polygon(&points),
            Err(GeometryError::DegeneratePolygon(2))
        ));
    }
}
