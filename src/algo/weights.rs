//! Bevel-weight propagation.
//!
//! Derives the per-edge `bevel_weight` attribute from existing markup or from
//! dihedral-angle analysis. Every strategy writes exactly `1.0` to the edges it
//! matches and returns how many edges it touched; a count of zero is a no-op
//! the caller may turn into [`MeshError::NoOp`].
//!
//! # Strategies
//!
//! - [`from_sharp`]: weight every sharp edge
//! - [`from_seam`]: weight every seam edge
//! - [`from_angle`]: weight edges whose adjacent faces meet at more than a
//!   threshold angle, plus every boundary edge; also marks them sharp
//! - [`seams_from_weight`]: derived step marking weighted edges as seams
//!
//! # Example
//!
//! ```
//! use normalforge::prelude::*;
//! use normalforge::algo::weights::{from_angle, DEFAULT_SHARP_ANGLE};
//! use nalgebra::Point3;
//!
//! let vertices = vec![
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(0.0, 1.0, 0.0),
//!     Point3::new(0.0, 0.0, 1.0),
//! ];
//! let faces = vec![vec![0, 2, 1], vec![0, 1, 3], vec![1, 2, 3], vec![2, 0, 3]];
//! let mut mesh: PolyMesh = build_from_polygons(&vertices, &faces).unwrap();
//!
//! // Every tetrahedron edge is steeper than 30 degrees.
//! assert_eq!(from_angle(&mut mesh, DEFAULT_SHARP_ANGLE).unwrap(), 6);
//! ```

use std::f64::consts::PI;

use tracing::debug;

use crate::error::{MeshError, Result};
use crate::mesh::{MeshIndex, PolyMesh};

/// Default dihedral threshold: 30 degrees.
pub const DEFAULT_SHARP_ANGLE: f64 = 0.523599;

/// Where bevel weights come from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WeightSource {
    /// Edges flagged sharp.
    Sharp,
    /// Edges flagged as seams.
    Seam,
    /// Dihedral angle above a threshold (radians). Clears prior weights first.
    Angle(f64),
    /// Keep existing weights; fall back to the angle test if none exist.
    Existing {
        /// Threshold used when the mesh carries no weights.
        fallback_angle: f64,
    },
}

impl WeightSource {
    /// Short name used in logs and no-op reports.
    pub fn step_name(&self) -> &'static str {
        match self {
            WeightSource::Sharp => "from_sharp",
            WeightSource::Seam => "from_seam",
            WeightSource::Angle(_) => "from_angle",
            WeightSource::Existing { .. } => "existing_weights",
        }
    }
}

/// Weight every edge flagged sharp. Returns the number of edges weighted.
pub fn from_sharp<I: MeshIndex>(mesh: &mut PolyMesh<I>) -> usize {
    let mut count = 0;
    for edge in mesh.edges.iter_mut().filter(|e| e.sharp) {
        edge.bevel_weight = 1.0;
        count += 1;
    }
    debug!(count, "weighted sharp edges");
    count
}

/// Weight every edge flagged as a seam. Returns the number of edges weighted.
pub fn from_seam<I: MeshIndex>(mesh: &mut PolyMesh<I>) -> usize {
    let mut count = 0;
    for edge in mesh.edges.iter_mut().filter(|e| e.seam) {
        edge.bevel_weight = 1.0;
        count += 1;
    }
    debug!(count, "weighted seam edges");
    count
}

/// Weight edges by dihedral angle.
///
/// A two-face edge is weighted when the angle between its face normals
/// exceeds `threshold`. Boundary edges (one face) are always weighted. Edges
/// with no faces or more than two are skipped. Every weighted edge is also
/// marked sharp.
///
/// Faces with a degenerate (zero) normal never produce a dihedral match.
///
/// # Errors
///
/// [`MeshError::InvalidParameter`] if `threshold` lies outside `[0, π]`.
pub fn from_angle<I: MeshIndex>(mesh: &mut PolyMesh<I>, threshold: f64) -> Result<usize> {
    if !(0.0..=PI).contains(&threshold) {
        return Err(MeshError::invalid_param(
            "threshold",
            threshold,
            "must be within [0, pi] radians",
        ));
    }

    let adjacency = mesh.adjacency();
    let face_normals: Vec<_> = mesh.face_ids().map(|f| mesh.face_normal(f)).collect();

    let mut count = 0;
    let mut boundary = 0;
    for e in mesh.edge_ids().collect::<Vec<_>>() {
        let hit = match adjacency.edge_faces(e) {
            [_] => {
                boundary += 1;
                true
            }
            [a, b] => {
                let (na, nb) = (face_normals[a.index()], face_normals[b.index()]);
                if na.norm_squared() == 0.0 || nb.norm_squared() == 0.0 {
                    false
                } else {
                    na.dot(&nb).clamp(-1.0, 1.0).acos() > threshold
                }
            }
            _ => false,
        };

        if hit {
            let edge = mesh.edge_mut(e);
            edge.bevel_weight = 1.0;
            edge.sharp = true;
            count += 1;
        }
    }

    debug!(count, boundary, threshold, "weighted edges by angle");
    Ok(count)
}

/// Mark every weighted edge (weight > 0) as a seam. Returns the number of edges marked.
pub fn seams_from_weight<I: MeshIndex>(mesh: &mut PolyMesh<I>) -> usize {
    let mut count = 0;
    for edge in mesh.edges.iter_mut().filter(|e| e.is_weighted()) {
        edge.seam = true;
        count += 1;
    }
    debug!(count, "marked seams from bevel weight");
    count
}

/// Reset every bevel weight to zero.
pub fn clear_weights<I: MeshIndex>(mesh: &mut PolyMesh<I>) {
    mesh.edges.iter_mut().for_each(|e| e.bevel_weight = 0.0);
}

/// Apply a [`WeightSource`]. Returns the number of weighted edges it produced.
pub fn propagate<I: MeshIndex>(mesh: &mut PolyMesh<I>, source: WeightSource) -> Result<usize> {
    match source {
        WeightSource::Sharp => Ok(from_sharp(mesh)),
        WeightSource::Seam => Ok(from_seam(mesh)),
        WeightSource::Angle(threshold) => {
            clear_weights(mesh);
            from_angle(mesh, threshold)
        }
        WeightSource::Existing { fallback_angle } => match mesh.count_weighted() {
            0 => {
                debug!("no existing bevel weights, falling back to angle detection");
                from_angle(mesh, fallback_angle)
            }
            n => Ok(n),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{build_from_polygons, EdgeId, VertexId};
    use nalgebra::Point3;

    /// Two unit quads hinged along x = 1, the second tilted by `angle`.
    fn hinge(angle: f64) -> PolyMesh {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(1.0 + angle.cos(), 0.0, angle.sin()),
            Point3::new(1.0 + angle.cos(), 1.0, angle.sin()),
        ];
        let faces = vec![vec![0, 1, 2, 3], vec![1, 4, 5, 2]];
        build_from_polygons(&vertices, &faces).unwrap()
    }

    fn hinge_edge(mesh: &PolyMesh) -> EdgeId {
        mesh.find_edge(VertexId::new(1), VertexId::new(2)).unwrap()
    }

    #[test]
    fn test_from_sharp() {
        let mut mesh = hinge(0.0);
        assert_eq!(from_sharp(&mut mesh), 0);

        let e = hinge_edge(&mesh);
        mesh.edge_mut(e).sharp = true;
        assert_eq!(from_sharp(&mut mesh), 1);
        assert_eq!(mesh.edge(e).bevel_weight, 1.0);
        assert_eq!(mesh.count_weighted(), 1);
    }

    #[test]
    fn test_from_seam() {
        let mut mesh = hinge(0.0);
        let e = EdgeId::new(0);
        mesh.edge_mut(e).seam = true;
        assert_eq!(from_seam(&mut mesh), 1);
        assert!(mesh.edge(e).is_weighted());
    }

    #[test]
    fn test_from_angle_respects_threshold() {
        // Folded 60 degrees: shared edge weighted at a 30 degree threshold.
        let mut mesh = hinge(PI / 3.0);
        let count = from_angle(&mut mesh, DEFAULT_SHARP_ANGLE).unwrap();
        assert_eq!(count, 7);
        let e = hinge_edge(&mesh);
        assert!(mesh.edge(e).sharp);
        assert_eq!(mesh.edge(e).bevel_weight, 1.0);

        // Folded 20 degrees: only the six boundary edges.
        let mut mesh = hinge(PI / 9.0);
        assert_eq!(from_angle(&mut mesh, DEFAULT_SHARP_ANGLE).unwrap(), 6);
        let e = hinge_edge(&mesh);
        assert!(!mesh.edge(e).sharp);
        assert_eq!(mesh.edge(e).bevel_weight, 0.0);
    }

    #[test]
    fn test_from_angle_rejects_out_of_range() {
        let mut mesh = hinge(0.0);
        assert!(matches!(
            from_angle(&mut mesh, -0.1),
            Err(MeshError::InvalidParameter { .. })
        ));
        assert!(from_angle(&mut mesh, 4.0).is_err());
    }

    #[test]
    fn test_seams_follow_partial_weights() {
        let mut mesh = hinge(0.0);
        mesh.edge_mut(EdgeId::new(2)).bevel_weight = 0.25;
        assert_eq!(seams_from_weight(&mut mesh), 1);
        assert!(mesh.edge(EdgeId::new(2)).seam);
    }

    #[test]
    fn test_angle_source_clears_prior_weights() {
        let mut mesh = hinge(0.0);
        let e = hinge_edge(&mesh);
        mesh.edge_mut(e).bevel_weight = 1.0;

        let count = propagate(&mut mesh, WeightSource::Angle(DEFAULT_SHARP_ANGLE)).unwrap();
        assert_eq!(count, 6);
        assert_eq!(mesh.edge(e).bevel_weight, 0.0);
    }

    #[test]
    fn test_existing_source_falls_back() {
        let mut mesh = hinge(0.0);
        let source = WeightSource::Existing {
            fallback_angle: DEFAULT_SHARP_ANGLE,
        };
        assert_eq!(propagate(&mut mesh, source).unwrap(), 6);

        // Now weights exist and are kept as-is.
        let e = hinge_edge(&mesh);
        mesh.edge_mut(e).bevel_weight = 0.5;
        assert_eq!(propagate(&mut mesh, source).unwrap(), 7);
        assert_eq!(mesh.edge(e).bevel_weight, 0.5);
    }
}
