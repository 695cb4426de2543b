//! Custom normal synthesis.
//!
//! Two ways to fill the per-loop custom normal layer:
//!
//! - [`copy_from_faces`]: each loop of a selected face takes that face's flat
//!   normal. Unselected faces are left untouched.
//! - [`weighted_normals`]: face normals are blended into per-vertex directions
//!   with area or corner-angle weights, then written to every loop.
//!
//! Weighted synthesis is split into a measuring step
//! ([`compute_weighted_normals`]) and a writing step ([`write_loop_normals`]).
//! The writer refuses a target whose loop count differs from the measured
//! surface, since loop correspondence would be lost.
//!
//! # Example
//!
//! ```
//! use normalforge::prelude::*;
//! use normalforge::algo::normals::{weighted_normals, WeightMode, WeightedNormalOptions};
//! use nalgebra::Point3;
//!
//! let vertices = vec![
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(1.0, 1.0, 0.0),
//!     Point3::new(0.0, 1.0, 0.0),
//! ];
//! let mut mesh: PolyMesh = build_from_polygons(&vertices, &[vec![0, 1, 2, 3]]).unwrap();
//!
//! let options = WeightedNormalOptions::new(WeightMode::Area);
//! assert_eq!(weighted_normals(&mut mesh, &options).unwrap(), 4);
//! ```

use nalgebra::Vector3;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{MeshError, Result};
use crate::mesh::{FaceId, LoopId, MeshIndex, PolyMesh};

/// How face normals are weighted when accumulated at a vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeightMode {
    /// Weight by face area.
    #[default]
    Area,
    /// Weight by the corner angle at the vertex.
    Angle,
    /// Weight by face area; kept separate for callers that distinguish it.
    Combined,
}

/// Options for weighted normal synthesis.
#[derive(Debug, Clone)]
pub struct WeightedNormalOptions {
    /// Weighting scheme.
    pub mode: WeightMode,

    /// Only selected faces contribute, and only their loops are written.
    pub selected_only: bool,

    /// Whether to compute per-face data in parallel (default: true).
    pub parallel: bool,
}

impl Default for WeightedNormalOptions {
    fn default() -> Self {
        Self {
            mode: WeightMode::default(),
            selected_only: false,
            parallel: true,
        }
    }
}

impl WeightedNormalOptions {
    /// Create options with the given mode.
    pub fn new(mode: WeightMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    /// Restrict synthesis to the current face selection.
    pub fn selected_only(mut self, selected_only: bool) -> Self {
        self.selected_only = selected_only;
        self
    }

    /// Set whether to use parallel execution.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Create options for single-threaded execution.
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }
}

/// Per-loop normals measured on one surface. `None` leaves a loop untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct LoopNormals {
    normals: Vec<Option<Vector3<f64>>>,
}

impl LoopNormals {
    /// Number of loops on the measured surface.
    pub fn len(&self) -> usize {
        self.normals.len()
    }

    /// Whether the measured surface had no loops.
    pub fn is_empty(&self) -> bool {
        self.normals.is_empty()
    }

    /// Normal destined for a loop, if any.
    pub fn get<I: MeshIndex>(&self, l: LoopId<I>) -> Option<Vector3<f64>> {
        self.normals.get(l.index()).copied().flatten()
    }

    /// Iterate over all entries in loop order.
    pub fn iter(&self) -> impl Iterator<Item = Option<&Vector3<f64>>> + '_ {
        self.normals.iter().map(Option::as_ref)
    }
}

/// Set each loop of every selected face to the face's flat normal.
///
/// Returns the number of loops written.
pub fn copy_from_faces<I: MeshIndex>(mesh: &mut PolyMesh<I>) -> usize {
    let selected: Vec<FaceId<I>> = mesh.selected_faces().collect();
    let mut written = 0;
    for f in selected {
        let normal = mesh.face_normal(f);
        for l in mesh.face_loops(f) {
            mesh.loop_at_mut(l).custom_normal = Some(normal);
            written += 1;
        }
    }
    debug!(loops = written, "copied face normals to loops");
    written
}

/// Measure weighted vertex normals and map them onto loops.
pub fn compute_weighted_normals<I: MeshIndex>(
    mesh: &PolyMesh<I>,
    options: &WeightedNormalOptions,
) -> LoopNormals {
    let face_data = |i: usize| {
        let f = FaceId::<I>::new(i);
        (mesh.face_normal(f), mesh.face_area(f))
    };
    let per_face: Vec<(Vector3<f64>, f64)> = if options.parallel {
        (0..mesh.num_faces()).into_par_iter().map(face_data).collect()
    } else {
        (0..mesh.num_faces()).map(face_data).collect()
    };

    let contributes = |f: FaceId<I>| !options.selected_only || mesh.face(f).select;

    let mut accum = vec![Vector3::<f64>::zeros(); mesh.num_vertices()];
    for f in mesh.face_ids().filter(|&f| contributes(f)) {
        let (normal, area) = per_face[f.index()];
        for l in mesh.face_loops(f) {
            let weight = match options.mode {
                WeightMode::Area | WeightMode::Combined => area,
                WeightMode::Angle => mesh.corner_angle(l),
            };
            accum[mesh.loop_at(l).vertex.index()] += normal * weight;
        }
    }

    let vertex_normals: Vec<Option<Vector3<f64>>> = accum
        .iter()
        .map(|n| n.try_normalize(f64::EPSILON))
        .collect();

    let original = mesh.loop_normals();
    let mut normals = vec![None; mesh.num_loops()];
    for f in mesh.face_ids().filter(|&f| contributes(f)) {
        for l in mesh.face_loops(f) {
            let v = mesh.loop_at(l).vertex;
            normals[l.index()] = Some(vertex_normals[v.index()].unwrap_or(original[l.index()]));
        }
    }

    debug!(mode = ?options.mode, loops = normals.len(), "computed weighted normals");
    LoopNormals { normals }
}

/// Write measured normals into the target's custom normal layer.
///
/// Returns the number of loops written.
///
/// # Errors
///
/// [`MeshError::LoopCountMismatch`] if the target's loop count differs from
/// the measured surface. The target is left untouched.
pub fn write_loop_normals<I: MeshIndex>(
    target: &mut PolyMesh<I>,
    normals: &LoopNormals,
) -> Result<usize> {
    if normals.len() != target.num_loops() {
        return Err(MeshError::LoopCountMismatch {
            expected: normals.len(),
            found: target.num_loops(),
        });
    }

    let mut written = 0;
    for (corner, normal) in target.loops.iter_mut().zip(&normals.normals) {
        if let Some(n) = normal {
            corner.custom_normal = Some(*n);
            written += 1;
        }
    }
    Ok(written)
}

/// Measure and write weighted normals on the same mesh.
pub fn weighted_normals<I: MeshIndex>(
    mesh: &mut PolyMesh<I>,
    options: &WeightedNormalOptions,
) -> Result<usize> {
    let normals = compute_weighted_normals(mesh, options);
    write_loop_normals(mesh, &normals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{build_from_polygons, build_from_quads};
    use approx::assert_relative_eq;
    use nalgebra::Point3;

    fn unit_cube() -> PolyMesh {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(0.0, 0.0, 1.0),
            Point3::new(1.0, 0.0, 1.0),
            Point3::new(1.0, 1.0, 1.0),
            Point3::new(0.0, 1.0, 1.0),
        ];
        let faces = [
            [0, 3, 2, 1], // -z
            [4, 5, 6, 7], // +z
            [0, 1, 5, 4], // -y
            [2, 3, 7, 6], // +y
            [0, 4, 7, 3], // -x
            [1, 2, 6, 5], // +x
        ];
        build_from_quads(&vertices, &faces).unwrap()
    }

    #[test]
    fn test_planar_quad_area() {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
            Point3::new(2.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        let mut mesh: PolyMesh = build_from_polygons(&vertices, &[vec![0, 1, 2, 3]]).unwrap();

        let written = weighted_normals(&mut mesh, &WeightedNormalOptions::new(WeightMode::Area))
            .unwrap();
        assert_eq!(written, 4);
        for l in mesh.loop_ids() {
            let n = mesh.loop_at(l).custom_normal.unwrap();
            assert_relative_eq!(n, Vector3::z(), epsilon = 1e-12);
        }
    }

    #[test]
    fn test_cube_angle_weights_average() {
        let mut mesh = unit_cube();
        assert_eq!(mesh.num_loops(), 24);

        let options = WeightedNormalOptions::new(WeightMode::Angle).sequential();
        weighted_normals(&mut mesh, &options).unwrap();

        let center = Point3::new(0.5, 0.5, 0.5);
        for l in mesh.loop_ids() {
            let corner = mesh.loop_at(l);
            let n = corner.custom_normal.unwrap();
            let outward = (mesh.position(corner.vertex) - center).normalize();
            assert_relative_eq!(n.norm(), 1.0, epsilon = 1e-12);
            assert_relative_eq!(n, outward, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let mesh = unit_cube();
        for mode in [WeightMode::Area, WeightMode::Angle, WeightMode::Combined] {
            let par = compute_weighted_normals(&mesh, &WeightedNormalOptions::new(mode));
            let seq = compute_weighted_normals(&mesh, &WeightedNormalOptions::new(mode).sequential());
            assert_eq!(par, seq);
        }
    }

    #[test]
    fn test_loop_count_mismatch() {
        let source = unit_cube();
        let normals = compute_weighted_normals(&source, &WeightedNormalOptions::default());

        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        let mut target: PolyMesh = build_from_polygons(&vertices, &[vec![0, 1, 2]]).unwrap();

        let err = write_loop_normals(&mut target, &normals).unwrap_err();
        assert!(matches!(
            err,
            MeshError::LoopCountMismatch {
                expected: 24,
                found: 3
            }
        ));
        assert!(!target.has_custom_normals());
    }

    #[test]
    fn test_copy_from_selected_faces() {
        let mut mesh = unit_cube();
        mesh.select_face(FaceId::new(1), true);

        assert_eq!(copy_from_faces(&mut mesh), 4);
        for l in mesh.face_loops(FaceId::new(1)) {
            assert_eq!(mesh.loop_at(l).custom_normal, Some(Vector3::z()));
        }
        for l in mesh.face_loops(FaceId::new(0)) {
            assert_eq!(mesh.loop_at(l).custom_normal, None);
        }
    }

    #[test]
    fn test_selected_only_leaves_other_loops() {
        let mut mesh = unit_cube();
        mesh.select_face(FaceId::new(1), true);

        let options = WeightedNormalOptions::new(WeightMode::Area).selected_only(true);
        assert_eq!(weighted_normals(&mut mesh, &options).unwrap(), 4);

        // Only the top face contributed, so its loops point straight up.
        for l in mesh.face_loops(FaceId::new(1)) {
            let n = mesh.loop_at(l).custom_normal.unwrap();
            assert_relative_eq!(n, Vector3::z(), epsilon = 1e-12);
        }
        assert_eq!(mesh.loop_at(LoopId::new(0)).custom_normal, None);
    }

    #[test]
    fn test_isolated_vertex_is_ignored() {
        let mut mesh = unit_cube();
        mesh.add_vertex(Point3::new(5.0, 5.0, 5.0));
        let normals = compute_weighted_normals(&mesh, &WeightedNormalOptions::default());
        assert_eq!(normals.len(), 24);
        assert!(normals.iter().all(|n| n.is_some()));
    }

    #[test]
    fn test_cancelled_accumulator_keeps_original_normal() {
        // The same triangle wound both ways: face normals cancel at every vertex.
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        let mut mesh: PolyMesh =
            build_from_polygons(&vertices, &[vec![0, 1, 2], vec![0, 2, 1]]).unwrap();
        let kept = Vector3::new(0.0, 0.6, 0.8);
        mesh.loop_at_mut(LoopId::new(3)).custom_normal = Some(kept);

        let normals = compute_weighted_normals(&mesh, &WeightedNormalOptions::new(WeightMode::Area));
        let at = |l: usize| normals.get(LoopId::<u32>::new(l));

        for l in 0..3 {
            assert_eq!(at(l), Some(Vector3::z()));
        }
        assert_eq!(at(3), Some(kept));
        assert_eq!(at(4), Some(-Vector3::z()));
        assert_eq!(at(5), Some(-Vector3::z()));
    }
}
