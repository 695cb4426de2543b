//! Mesh construction utilities.
//!
//! This module builds [`PolyMesh`] values from face-vertex lists as found in
//! mesh file formats, and converts them back. Vertex order and loop order are
//! preserved exactly: face `i` owns loops in the order its vertex list is given.

use std::collections::BTreeSet;

use hashbrown::HashMap;
use nalgebra::Point3;
use tracing::debug;

use super::index::{EdgeId, FaceId, LoopId, MeshIndex, VertexId};
use super::polymesh::{Edge, Face, Loop, PolyMesh};
use crate::error::{MeshError, Result};

type EdgeLookup<I> = HashMap<(usize, usize), EdgeId<I>>;

/// Build a polygon mesh from vertices and faces of any arity (≥ 3).
///
/// Edges are deduplicated as undirected vertex pairs and numbered in the order
/// they are first met.
///
/// # Example
/// ```
/// use normalforge::mesh::{build_from_polygons, PolyMesh};
/// use nalgebra::Point3;
///
/// let vertices = vec![
///     Point3::new(0.0, 0.0, 0.0),
///     Point3::new(1.0, 0.0, 0.0),
///     Point3::new(1.0, 1.0, 0.0),
///     Point3::new(0.0, 1.0, 0.0),
///     Point3::new(2.0, 0.5, 0.0),
/// ];
/// let faces = vec![vec![0, 1, 2, 3], vec![1, 4, 2]];
///
/// let mesh: PolyMesh = build_from_polygons(&vertices, &faces).unwrap();
/// assert_eq!(mesh.num_faces(), 2);
/// assert_eq!(mesh.num_loops(), 7);
/// assert_eq!(mesh.num_edges(), 6);
/// ```
pub fn build_from_polygons<I: MeshIndex>(
    vertices: &[Point3<f64>],
    faces: &[Vec<usize>],
) -> Result<PolyMesh<I>> {
    if faces.is_empty() {
        return Err(MeshError::EmptyMesh);
    }

    for (fi, face) in faces.iter().enumerate() {
        validate_face(fi, face, vertices.len())?;
    }

    // Loops outnumber every other element; the edge count is bounded by it.
    let loop_count: usize = faces.iter().map(Vec::len).sum();
    if I::checked_from_usize(loop_count.max(vertices.len())).is_none() {
        return Err(MeshError::invalid_param(
            "element count",
            loop_count.max(vertices.len()),
            "exceeds the mesh index width",
        ));
    }

    let mut mesh = PolyMesh::with_capacity(vertices.len(), faces.len());
    let vertex_ids: Vec<VertexId<I>> = vertices.iter().map(|&p| mesh.add_vertex(p)).collect();

    let mut lookup: EdgeLookup<I> = HashMap::new();
    for face in faces {
        let corners: Vec<VertexId<I>> = face.iter().map(|&vi| vertex_ids[vi]).collect();
        push_face(&mut mesh, &corners, &mut lookup);
    }

    Ok(mesh)
}

/// Build a mesh from triangle faces.
pub fn build_from_triangles<I: MeshIndex>(
    vertices: &[Point3<f64>],
    faces: &[[usize; 3]],
) -> Result<PolyMesh<I>> {
    let polygons: Vec<Vec<usize>> = faces.iter().map(|f| f.to_vec()).collect();
    build_from_polygons(vertices, &polygons)
}

/// Build a mesh from quad faces (counter-clockwise winding).
pub fn build_from_quads<I: MeshIndex>(
    vertices: &[Point3<f64>],
    faces: &[[usize; 4]],
) -> Result<PolyMesh<I>> {
    let polygons: Vec<Vec<usize>> = faces.iter().map(|f| f.to_vec()).collect();
    build_from_polygons(vertices, &polygons)
}

/// Convert a mesh back to a face-vertex representation.
///
/// Returns (vertices, faces) with faces in loop order.
pub fn to_face_vertex<I: MeshIndex>(mesh: &PolyMesh<I>) -> (Vec<Point3<f64>>, Vec<Vec<usize>>) {
    let vertices: Vec<Point3<f64>> = mesh.vertex_ids().map(|v| *mesh.position(v)).collect();

    let faces: Vec<Vec<usize>> = mesh
        .face_ids()
        .map(|f| mesh.face_vertices(f).map(|v| v.index()).collect())
        .collect();

    (vertices, faces)
}

fn validate_face(fi: usize, face: &[usize], num_vertices: usize) -> Result<()> {
    if face.len() < 3 {
        return Err(MeshError::DegenerateFace { face: fi });
    }
    for &vi in face {
        if vi >= num_vertices {
            return Err(MeshError::InvalidVertexIndex { face: fi, vertex: vi });
        }
    }
    for (i, a) in face.iter().enumerate() {
        if face[i + 1..].contains(a) {
            return Err(MeshError::DegenerateFace { face: fi });
        }
    }
    Ok(())
}

fn edge_key<I: MeshIndex>(a: VertexId<I>, b: VertexId<I>) -> (usize, usize) {
    let (a, b) = (a.index(), b.index());
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Append a face, creating any edges it needs.
fn push_face<I: MeshIndex>(
    mesh: &mut PolyMesh<I>,
    corners: &[VertexId<I>],
    lookup: &mut EdgeLookup<I>,
) -> FaceId<I> {
    let face_id = FaceId::new(mesh.faces.len());
    let loop_start = LoopId::new(mesh.loops.len());

    for (i, &v) in corners.iter().enumerate() {
        let next = corners[(i + 1) % corners.len()];
        let edge = *lookup.entry(edge_key(v, next)).or_insert_with(|| {
            mesh.edges.push(Edge::new(v, next));
            EdgeId::new(mesh.edges.len() - 1)
        });
        mesh.loops.push(Loop {
            vertex: v,
            edge,
            face: face_id,
            custom_normal: None,
        });
    }

    mesh.faces.push(Face {
        loop_start,
        loop_total: corners.len(),
        material_index: 0,
        smooth: false,
        select: false,
    });

    face_id
}

impl<I: MeshIndex> PolyMesh<I> {
    /// Append a polygon over existing vertices, reusing existing edges.
    ///
    /// New faces go after all existing ones and use material slot 0.
    pub fn add_face(&mut self, corners: &[VertexId<I>]) -> Result<FaceId<I>> {
        let raw: Vec<usize> = corners.iter().map(|v| v.index()).collect();
        validate_face(self.faces.len(), &raw, self.vertices.len())?;

        let mut lookup: EdgeLookup<I> = self
            .edges()
            .map(|(id, e)| (edge_key(e.vertices[0], e.vertices[1]), id))
            .collect();
        Ok(push_face(self, corners, &mut lookup))
    }

    /// Fan-triangulate the given faces, returning how many were split.
    ///
    /// Triangles in `targets` are left alone. A split face keeps its
    /// id for its first triangle; the remaining triangles are appended after
    /// all existing faces, so every face id stays valid. Loops of the split
    /// corners keep their custom normals and edges keep their attributes.
    /// Loop ids after the first split face shift.
    pub fn triangulate_faces(&mut self, targets: &[FaceId<I>]) -> usize {
        let split: BTreeSet<FaceId<I>> = targets
            .iter()
            .copied()
            .filter(|&f| self.face(f).loop_total > 3)
            .collect();
        if split.is_empty() {
            return 0;
        }

        let mut lookup: EdgeLookup<I> = self
            .edges()
            .map(|(id, e)| (edge_key(e.vertices[0], e.vertices[1]), id))
            .collect();
        let faces = std::mem::take(&mut self.faces);
        let loops = std::mem::take(&mut self.loops);

        let mut deferred: Vec<(Face<I>, [Loop<I>; 3])> = Vec::new();
        for (fi, face) in faces.iter().enumerate() {
            let start = face.loop_start.index();
            let corners = &loops[start..start + face.loop_total];
            if !split.contains(&FaceId::new(fi)) {
                push_copy(self, face, corners, &mut lookup);
                continue;
            }
            push_copy(self, face, &corners[..3], &mut lookup);
            for pair in corners[2..].windows(2) {
                deferred.push((face.clone(), [corners[0].clone(), pair[0].clone(), pair[1].clone()]));
            }
        }
        for (face, corners) in &deferred {
            push_copy(self, face, corners, &mut lookup);
        }

        debug!(faces = split.len(), triangles_added = deferred.len(), "fan-triangulated faces");
        split.len()
    }
}

/// Append a copy of `face` over `corners`, keeping face and loop attributes.
fn push_copy<I: MeshIndex>(
    mesh: &mut PolyMesh<I>,
    face: &Face<I>,
    corners: &[Loop<I>],
    lookup: &mut EdgeLookup<I>,
) {
    let vertices: Vec<VertexId<I>> = corners.iter().map(|l| l.vertex).collect();
    let id = push_face(mesh, &vertices, lookup);

    let copy = &mut mesh.faces[id.index()];
    copy.material_index = face.material_index;
    copy.smooth = face.smooth;
    copy.select = face.select;
    let start = copy.loop_start.index();
    for (k, corner) in corners.iter().enumerate() {
        mesh.loops[start + k].custom_normal = corner.custom_normal;
    }
}
