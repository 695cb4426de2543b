//! Tag-less bevel region classification.
//!
//! Infers which faces are newly generated bevel geometry purely from face
//! areas and adjacency, for meshes whose bevel was created without a
//! provenance tag.
//!
//! # Algorithm
//!
//! 1. Compute every face area; fewer than two faces cannot be classified.
//! 2. Take the median area (lower-middle element for even counts).
//! 3. `cutoff = median * ratio`.
//! 4. Split faces into `small` (area < cutoff) and `large`. Either side empty
//!    means the mesh has no area contrast.
//! 5. Seed a frontier with every small face adjacent to a large face.
//! 6. Flood-fill across small faces; every face reached is bevel geometry.
//! 7. Original faces are the large faces plus small faces never reached.
//!
//! The result is a monotonic set union, so it does not depend on the order
//! in which the frontier is processed.

use std::collections::BTreeSet;

use tracing::debug;

use crate::error::{MeshError, Result};
use crate::mesh::{FaceId, MeshIndex, PolyMesh, SelectMode};

/// Options for [`classify_bevel_faces`].
#[derive(Debug, Clone)]
pub struct ClassifyOptions {
    /// Faces with area below `ratio * median` are bevel candidates. In `(0, 1]`.
    pub ratio: f64,
}

impl Default for ClassifyOptions {
    fn default() -> Self {
        Self { ratio: 0.5 }
    }
}

impl ClassifyOptions {
    /// Create options with the specified ratio.
    pub fn with_ratio(mut self, ratio: f64) -> Self {
        self.ratio = ratio;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.ratio > 0.0 && self.ratio <= 1.0 {
            Ok(())
        } else {
            Err(MeshError::invalid_param(
                "ratio",
                self.ratio,
                "must be within (0, 1]",
            ))
        }
    }
}

/// Outcome of a classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification<I: MeshIndex = u32> {
    /// Number of faces confirmed as bevel geometry.
    pub bevel_count: usize,
    /// Faces confirmed as bevel geometry.
    pub bevel_faces: BTreeSet<FaceId<I>>,
    /// Faces treated as original surface.
    pub original_faces: BTreeSet<FaceId<I>>,
}

impl<I: MeshIndex> Classification<I> {
    /// The "nothing classified" outcome.
    pub fn empty() -> Self {
        Self {
            bevel_count: 0,
            bevel_faces: BTreeSet::new(),
            original_faces: BTreeSet::new(),
        }
    }

    /// Whether any bevel face was found.
    pub fn is_empty(&self) -> bool {
        self.bevel_count == 0
    }
}

/// Median of the areas: the lower-middle element for even counts.
fn median_area(areas: &[f64]) -> f64 {
    let mut sorted = areas.to_vec();
    sorted.sort_by(f64::total_cmp);
    sorted[(sorted.len() - 1) / 2]
}

/// Classify faces into bevel geometry and original surface.
///
/// Returns [`Classification::empty`] when the mesh cannot be classified
/// (fewer than two faces, non-positive median, or no area contrast).
///
/// # Errors
///
/// [`MeshError::InvalidParameter`] if the ratio is outside `(0, 1]`.
pub fn classify_bevel_faces<I: MeshIndex>(
    mesh: &PolyMesh<I>,
    options: &ClassifyOptions,
) -> Result<Classification<I>> {
    options.validate()?;

    let n = mesh.num_faces();
    if n < 2 {
        debug!(faces = n, "too few faces to classify");
        return Ok(Classification::empty());
    }

    let areas: Vec<f64> = mesh.face_ids().map(|f| mesh.face_area(f)).collect();
    let median = median_area(&areas);
    if median <= 0.0 {
        debug!(median, "non-positive median area");
        return Ok(Classification::empty());
    }

    let cutoff = median * options.ratio;
    let small: Vec<bool> = areas.iter().map(|&a| a < cutoff).collect();
    let small_count = small.iter().filter(|&&s| s).count();
    debug!(median, cutoff, small = small_count, large = n - small_count, "partitioned faces by area");

    if small_count == 0 || small_count == n {
        return Ok(Classification::empty());
    }

    let adjacency = mesh.adjacency();

    let mut frontier: Vec<FaceId<I>> = mesh
        .face_ids()
        .filter(|f| small[f.index()])
        .filter(|f| {
            adjacency
                .face_neighbors(*f)
                .iter()
                .any(|nb| !small[nb.index()])
        })
        .collect();
    debug!(seeds = frontier.len(), "seeded bevel frontier");

    let mut confirmed = vec![false; n];
    while let Some(current) = frontier.pop() {
        if confirmed[current.index()] {
            continue;
        }
        confirmed[current.index()] = true;
        for &nb in adjacency.face_neighbors(current) {
            if small[nb.index()] && !confirmed[nb.index()] {
                frontier.push(nb);
            }
        }
    }

    let mut result = Classification::empty();
    for f in mesh.face_ids() {
        if confirmed[f.index()] {
            result.bevel_faces.insert(f);
        } else {
            result.original_faces.insert(f);
        }
    }
    result.bevel_count = result.bevel_faces.len();

    debug!(
        bevel = result.bevel_count,
        original = result.original_faces.len(),
        "classified bevel faces"
    );
    Ok(result)
}

/// Select exactly the given faces, in face-select mode. Returns the count selected.
pub fn select_faces<I: MeshIndex>(mesh: &mut PolyMesh<I>, faces: &BTreeSet<FaceId<I>>) -> usize {
    mesh.clear_selection();
    mesh.set_select_mode(SelectMode::Face);

    let mut selected = 0;
    for &f in faces {
        if f.index() < mesh.num_faces() {
            mesh.select_face(f, true);
            selected += 1;
        }
    }
    selected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::build_from_polygons;
    use nalgebra::Point3;

    /// A row of unit-height quads with the given widths, left to right.
    fn row(widths: &[f64]) -> PolyMesh {
        let mut x = 0.0;
        let mut vertices = vec![Point3::new(0.0, 0.0, 0.0), Point3::new(0.0, 1.0, 0.0)];
        for w in widths {
            x += w;
            vertices.push(Point3::new(x, 0.0, 0.0));
            vertices.push(Point3::new(x, 1.0, 0.0));
        }
        let faces: Vec<Vec<usize>> = (0..widths.len())
            .map(|i| vec![2 * i, 2 * i + 2, 2 * i + 3, 2 * i + 1])
            .collect();
        build_from_polygons(&vertices, &faces).unwrap()
    }

    /// Corners of `corners` turned by `turns` quarter turns about the z axis,
    /// as indices into `vertices` (shared points are reused).
    fn turned(vertices: &mut Vec<Point3<f64>>, corners: &[(f64, f64)], turns: usize) -> Vec<usize> {
        corners
            .iter()
            .map(|&(mut x, mut y)| {
                for _ in 0..turns {
                    (x, y) = (-y, x);
                }
                let p = Point3::new(x, y, 0.0);
                vertices.iter().position(|q| *q == p).unwrap_or_else(|| {
                    vertices.push(p);
                    vertices.len() - 1
                })
            })
            .collect()
    }

    /// A 2x2 panel (face 0) framed by a 0.05 wide bevel ring (faces 1..=8),
    /// inside twelve large outer faces reaching out to +-3.
    fn ringed_panel() -> PolyMesh {
        let mut vertices = Vec::new();
        let mut faces = vec![turned(
            &mut vertices,
            &[(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)],
            0,
        )];
        for turns in 0..4 {
            let side = [(-1.0, 1.0), (1.0, 1.0), (1.0, 1.05), (-1.0, 1.05)];
            let corner = [(1.0, 1.0), (1.05, 1.0), (1.05, 1.05), (1.0, 1.05)];
            faces.push(turned(&mut vertices, &side, turns));
            faces.push(turned(&mut vertices, &corner, turns));
        }
        for turns in 0..4 {
            let left = [(-1.05, 1.05), (-1.0, 1.05), (-1.0, 3.0), (-3.0, 3.0)];
            let middle = [(-1.0, 1.05), (1.0, 1.05), (1.0, 3.0), (-1.0, 3.0)];
            let right = [(1.0, 1.05), (1.05, 1.05), (3.0, 3.0), (1.0, 3.0)];
            for piece in [&left, &middle, &right] {
                faces.push(turned(&mut vertices, piece, turns));
            }
        }
        build_from_polygons(&vertices, &faces).unwrap()
    }

    fn ids(raw: &[usize]) -> BTreeSet<FaceId> {
        raw.iter().map(|&i| FaceId::new(i)).collect()
    }

    #[test]
    fn test_median_lower_middle() {
        assert_eq!(median_area(&[4.0, 1.0, 3.0, 2.0]), 2.0);
        assert_eq!(median_area(&[5.0, 1.0, 3.0]), 3.0);
    }

    #[test]
    fn test_alternating_strip() {
        // L S L S L S L S L
        let mesh = row(&[1.0, 0.1, 1.0, 0.1, 1.0, 0.1, 1.0, 0.1, 1.0]);
        let result = classify_bevel_faces(&mesh, &ClassifyOptions::default()).unwrap();

        assert_eq!(result.bevel_count, 4);
        assert_eq!(result.bevel_faces, ids(&[1, 3, 5, 7]));
        assert_eq!(result.original_faces, ids(&[0, 2, 4, 6, 8]));
    }

    #[test]
    fn test_flood_fill_crosses_small_chain() {
        // L L L S S S L L L: the middle small face only touches small faces.
        let mesh = row(&[1.0, 1.0, 1.0, 0.1, 0.1, 0.1, 1.0, 1.0, 1.0]);
        let result = classify_bevel_faces(&mesh, &ClassifyOptions::default()).unwrap();
        assert_eq!(result.bevel_faces, ids(&[3, 4, 5]));
    }

    #[test]
    fn test_isolated_pocket_stays_original() {
        // Small faces in a separate component never touch a large face.
        let mut mesh = row(&[1.0, 0.1, 1.0, 1.0, 1.0]);
        let base = mesh.num_vertices();
        for p in [
            Point3::new(10.0, 0.0, 0.0),
            Point3::new(10.1, 0.0, 0.0),
            Point3::new(10.1, 0.1, 0.0),
            Point3::new(10.0, 0.1, 0.0),
        ] {
            mesh.add_vertex(p);
        }
        let corners: Vec<_> = (base..base + 4).map(crate::mesh::VertexId::new).collect();
        mesh.add_face(&corners).unwrap();

        let result = classify_bevel_faces(&mesh, &ClassifyOptions::default()).unwrap();
        assert_eq!(result.bevel_faces, ids(&[1]));
        assert!(result.original_faces.contains(&FaceId::new(5)));
    }

    #[test]
    fn test_ring_around_panel() {
        let mesh = ringed_panel();
        assert_eq!(mesh.num_faces(), 21);
        assert_eq!(mesh.num_vertices(), 28);

        let result = classify_bevel_faces(&mesh, &ClassifyOptions::default()).unwrap();
        assert_eq!(result.bevel_count, 8);
        assert_eq!(result.bevel_faces, ids(&[1, 2, 3, 4, 5, 6, 7, 8]));
        assert!(result.original_faces.contains(&FaceId::new(0)));
        assert_eq!(result.original_faces.len(), 13);
    }

    #[test]
    fn test_no_contrast_aborts() {
        let mesh = row(&[1.0, 1.0, 1.0]);
        let result = classify_bevel_faces(&mesh, &ClassifyOptions::default()).unwrap();
        assert!(result.is_empty());
        assert!(result.original_faces.is_empty());
    }

    #[test]
    fn test_single_face_aborts() {
        let mesh = row(&[1.0]);
        let result = classify_bevel_faces(&mesh, &ClassifyOptions::default()).unwrap();
        assert_eq!(result, Classification::empty());
    }

    #[test]
    fn test_invalid_ratio() {
        let mesh = row(&[1.0, 0.1]);
        assert!(classify_bevel_faces(&mesh, &ClassifyOptions::default().with_ratio(0.0)).is_err());
        assert!(classify_bevel_faces(&mesh, &ClassifyOptions::default().with_ratio(1.5)).is_err());
    }

    #[test]
    fn test_select_faces() {
        let mut mesh = row(&[1.0, 0.1, 1.0]);
        assert_eq!(select_faces(&mut mesh, &ids(&[0, 2])), 2);
        let selected: Vec<_> = mesh.selected_faces().collect();
        assert_eq!(selected, vec![FaceId::new(0), FaceId::new(2)]);
    }
}
