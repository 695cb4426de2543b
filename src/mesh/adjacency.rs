//! Derived edge/face adjacency.
//!
//! [`Adjacency`] is a snapshot of incidence relations computed from a mesh's
//! loop table. It is never stored on the mesh; rebuild it after any topology
//! change.

use std::collections::BTreeSet;

use hashbrown::HashMap;

use super::index::{EdgeId, FaceId, MeshIndex};
use super::polymesh::PolyMesh;

/// Edge-to-face and face-to-face incidence for one mesh state.
#[derive(Debug, Clone)]
pub struct Adjacency<I: MeshIndex = u32> {
    /// Faces incident to each edge, indexed by edge.
    edge_faces: Vec<Vec<FaceId<I>>>,
    /// Faces sharing at least one edge with each face, indexed by face.
    face_neighbors: Vec<BTreeSet<FaceId<I>>>,
}

impl<I: MeshIndex> Adjacency<I> {
    /// Build adjacency for the mesh's current topology.
    pub fn build(mesh: &PolyMesh<I>) -> Self {
        let mut edge_faces: Vec<Vec<FaceId<I>>> = vec![Vec::new(); mesh.num_edges()];
        for corner in &mesh.loops {
            let faces = &mut edge_faces[corner.edge.index()];
            if faces.last() != Some(&corner.face) {
                faces.push(corner.face);
            }
        }

        let mut face_neighbors: Vec<BTreeSet<FaceId<I>>> =
            vec![BTreeSet::new(); mesh.num_faces()];
        for faces in &edge_faces {
            for &a in faces {
                for &b in faces {
                    if a != b {
                        face_neighbors[a.index()].insert(b);
                    }
                }
            }
        }

        Self {
            edge_faces,
            face_neighbors,
        }
    }

    /// Faces incident to an edge.
    pub fn edge_faces(&self, e: EdgeId<I>) -> &[FaceId<I>] {
        &self.edge_faces[e.index()]
    }

    /// Faces that share an edge with `f`, in ascending order.
    pub fn face_neighbors(&self, f: FaceId<I>) -> &BTreeSet<FaceId<I>> {
        &self.face_neighbors[f.index()]
    }

    /// Number of edges with exactly one incident face.
    pub fn boundary_edge_count(&self) -> usize {
        self.edge_faces.iter().filter(|f| f.len() == 1).count()
    }

    /// Number of edges with more than two incident faces.
    pub fn non_manifold_edge_count(&self) -> usize {
        self.edge_faces.iter().filter(|f| f.len() > 2).count()
    }

    /// Histogram of incident-face counts: `valence -> number of edges`.
    pub fn edge_valence_histogram(&self) -> HashMap<usize, usize> {
        let mut histogram = HashMap::new();
        for faces in &self.edge_faces {
            *histogram.entry(faces.len()).or_insert(0) += 1;
        }
        histogram
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::build_from_polygons;
    use nalgebra::Point3;

    #[test]
    fn test_strip_adjacency() {
        // Three quads in a row: 0 - 1 - 2
        let vertices: Vec<Point3<f64>> = (0..4)
            .flat_map(|i| {
                [
                    Point3::new(i as f64, 0.0, 0.0),
                    Point3::new(i as f64, 1.0, 0.0),
                ]
            })
            .collect();
        let faces = vec![vec![0, 2, 3, 1], vec![2, 4, 5, 3], vec![4, 6, 7, 5]];
        let mesh: PolyMesh = build_from_polygons(&vertices, &faces).unwrap();
        let adj = mesh.adjacency();

        let middle: Vec<_> = adj.face_neighbors(FaceId::new(1)).iter().copied().collect();
        assert_eq!(middle, vec![FaceId::new(0), FaceId::new(2)]);
        assert_eq!(adj.face_neighbors(FaceId::new(0)).len(), 1);

        assert_eq!(adj.boundary_edge_count(), 8);
        assert_eq!(adj.non_manifold_edge_count(), 0);
        assert_eq!(adj.edge_valence_histogram().get(&2), Some(&2));
    }

    #[test]
    fn test_matches_adjacent_faces() {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(0.0, 0.0, 1.0),
        ];
        let faces = vec![vec![0, 2, 1], vec![0, 1, 3], vec![1, 2, 3], vec![2, 0, 3]];
        let mesh: PolyMesh = build_from_polygons(&vertices, &faces).unwrap();
        let adj = mesh.adjacency();

        for e in mesh.edge_ids() {
            assert_eq!(adj.edge_faces(e), mesh.adjacent_faces(e).as_slice());
        }
    }
}
