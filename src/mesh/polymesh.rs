//! Indexed polygon mesh with per-element attributes.
//!
//! [`PolyMesh`] stores vertices, undirected edges, polygon faces and loops
//! (face corners). Each face owns a contiguous run of loops in winding order,
//! and each loop records the edge leading to the next corner.
//!
//! # Attributes
//!
//! - Edges carry `sharp`, `seam` and a float `bevel_weight`.
//! - Faces carry a `material_index`, a `smooth` shading flag and selection.
//! - Loops carry an optional custom normal.
//!
//! Face adjacency is never stored. [`PolyMesh::adjacent_faces`] and
//! [`PolyMesh::adjacency`] derive it from the loop table on every call, so
//! queries always reflect the current topology.

use nalgebra::{Point3, Vector3};

use super::adjacency::Adjacency;
use super::index::{EdgeId, FaceId, LoopId, MeshIndex, VertexId};

/// A vertex in the mesh.
#[derive(Debug, Clone, PartialEq)]
pub struct Vertex {
    /// The 3D position of this vertex.
    pub position: Point3<f64>,

    /// Selection state.
    pub select: bool,
}

impl Vertex {
    /// Create a new vertex at the given position.
    pub fn new(position: Point3<f64>) -> Self {
        Self {
            position,
            select: false,
        }
    }

    /// Create a new vertex from coordinates.
    pub fn from_coords(x: f64, y: f64, z: f64) -> Self {
        Self::new(Point3::new(x, y, z))
    }
}

/// An undirected edge between two vertices.
#[derive(Debug, Clone, PartialEq)]
pub struct Edge<I: MeshIndex = u32> {
    /// The two endpoints, in first-seen order.
    pub vertices: [VertexId<I>; 2],

    /// Sharp shading flag.
    pub sharp: bool,

    /// UV seam flag.
    pub seam: bool,

    /// Bevel weight in `[0, 1]`. Propagators only ever write 0.0 or 1.0;
    /// readers treat any value `> 0.0` as weighted.
    pub bevel_weight: f64,

    /// Selection state.
    pub select: bool,
}

impl<I: MeshIndex> Edge<I> {
    /// Create an unflagged edge.
    pub fn new(v0: VertexId<I>, v1: VertexId<I>) -> Self {
        Self {
            vertices: [v0, v1],
            sharp: false,
            seam: false,
            bevel_weight: 0.0,
            select: false,
        }
    }

    /// Whether the edge carries a bevel weight.
    #[inline]
    pub fn is_weighted(&self) -> bool {
        self.bevel_weight > 0.0
    }
}

/// A polygon face.
#[derive(Debug, Clone, PartialEq)]
pub struct Face<I: MeshIndex = u32> {
    /// First loop of this face.
    pub loop_start: LoopId<I>,

    /// Number of loops (corners).
    pub loop_total: usize,

    /// Material slot index.
    pub material_index: usize,

    /// Smooth shading flag.
    pub smooth: bool,

    /// Selection state.
    pub select: bool,
}

/// A face corner: one (face, vertex) incidence.
#[derive(Debug, Clone, PartialEq)]
pub struct Loop<I: MeshIndex = u32> {
    /// The corner vertex.
    pub vertex: VertexId<I>,

    /// The edge from this corner to the next one in winding order.
    pub edge: EdgeId<I>,

    /// The owning face.
    pub face: FaceId<I>,

    /// Custom split normal, once written.
    pub custom_normal: Option<Vector3<f64>>,
}

/// A named material slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterialSlot {
    /// Slot name.
    pub name: String,
}

impl MaterialSlot {
    /// Create a slot with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Element granularity used by the selection surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectMode {
    /// Vertex selection.
    #[default]
    Vertex,
    /// Edge selection.
    Edge,
    /// Face selection.
    Face,
}

/// A polygon mesh with edge, face and loop attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct PolyMesh<I: MeshIndex = u32> {
    pub(crate) vertices: Vec<Vertex>,
    pub(crate) edges: Vec<Edge<I>>,
    pub(crate) faces: Vec<Face<I>>,
    pub(crate) loops: Vec<Loop<I>>,
    pub(crate) materials: Vec<MaterialSlot>,
    pub(crate) select_mode: SelectMode,
}

impl<I: MeshIndex> Default for PolyMesh<I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: MeshIndex> PolyMesh<I> {
    /// Create a new empty mesh.
    pub fn new() -> Self {
        Self {
            vertices: Vec::new(),
            edges: Vec::new(),
            faces: Vec::new(),
            loops: Vec::new(),
            materials: Vec::new(),
            select_mode: SelectMode::default(),
        }
    }

    /// Create a mesh with pre-allocated capacity.
    pub fn with_capacity(num_vertices: usize, num_faces: usize) -> Self {
        // Quad-dominant estimate: 4 loops per face, ~2 edges per face.
        Self {
            vertices: Vec::with_capacity(num_vertices),
            edges: Vec::with_capacity(num_faces * 2),
            faces: Vec::with_capacity(num_faces),
            loops: Vec::with_capacity(num_faces * 4),
            materials: Vec::new(),
            select_mode: SelectMode::default(),
        }
    }

    // ==================== Accessors ====================

    /// Get the number of vertices.
    #[inline]
    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    /// Get the number of edges.
    #[inline]
    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    /// Get the number of faces.
    #[inline]
    pub fn num_faces(&self) -> usize {
        self.faces.len()
    }

    /// Get the number of loops.
    #[inline]
    pub fn num_loops(&self) -> usize {
        self.loops.len()
    }

    /// Get a vertex by ID.
    #[inline]
    pub fn vertex(&self, id: VertexId<I>) -> &Vertex {
        &self.vertices[id.index()]
    }

    /// Get a mutable vertex by ID.
    #[inline]
    pub fn vertex_mut(&mut self, id: VertexId<I>) -> &mut Vertex {
        &mut self.vertices[id.index()]
    }

    /// Get an edge by ID.
    #[inline]
    pub fn edge(&self, id: EdgeId<I>) -> &Edge<I> {
        &self.edges[id.index()]
    }

    /// Get a mutable edge by ID.
    #[inline]
    pub fn edge_mut(&mut self, id: EdgeId<I>) -> &mut Edge<I> {
        &mut self.edges[id.index()]
    }

    /// Get a face by ID.
    #[inline]
    pub fn face(&self, id: FaceId<I>) -> &Face<I> {
        &self.faces[id.index()]
    }

    /// Get a mutable face by ID.
    #[inline]
    pub fn face_mut(&mut self, id: FaceId<I>) -> &mut Face<I> {
        &mut self.faces[id.index()]
    }

    /// Get a loop by ID.
    #[inline]
    pub fn loop_at(&self, id: LoopId<I>) -> &Loop<I> {
        &self.loops[id.index()]
    }

    /// Get a mutable loop by ID.
    #[inline]
    pub fn loop_at_mut(&mut self, id: LoopId<I>) -> &mut Loop<I> {
        &mut self.loops[id.index()]
    }

    /// Get the position of a vertex.
    #[inline]
    pub fn position(&self, v: VertexId<I>) -> &Point3<f64> {
        &self.vertex(v).position
    }

    /// Set the position of a vertex.
    #[inline]
    pub fn set_position(&mut self, v: VertexId<I>, pos: Point3<f64>) {
        self.vertex_mut(v).position = pos;
    }

    // ==================== Iteration ====================

    /// Iterate over all vertex IDs.
    pub fn vertex_ids(&self) -> impl Iterator<Item = VertexId<I>> + '_ {
        (0..self.vertices.len()).map(VertexId::new)
    }

    /// Iterate over all vertices with their IDs.
    pub fn vertices(&self) -> impl Iterator<Item = (VertexId<I>, &Vertex)> + '_ {
        self.vertices
            .iter()
            .enumerate()
            .map(|(i, v)| (VertexId::new(i), v))
    }

    /// Iterate over all edge IDs.
    pub fn edge_ids(&self) -> impl Iterator<Item = EdgeId<I>> + '_ {
        (0..self.edges.len()).map(EdgeId::new)
    }

    /// Iterate over all edges with their IDs.
    pub fn edges(&self) -> impl Iterator<Item = (EdgeId<I>, &Edge<I>)> + '_ {
        self.edges
            .iter()
            .enumerate()
            .map(|(i, e)| (EdgeId::new(i), e))
    }

    /// Iterate over all face IDs.
    pub fn face_ids(&self) -> impl Iterator<Item = FaceId<I>> + '_ {
        (0..self.faces.len()).map(FaceId::new)
    }

    /// Iterate over all faces with their IDs.
    pub fn faces(&self) -> impl Iterator<Item = (FaceId<I>, &Face<I>)> + '_ {
        self.faces
            .iter()
            .enumerate()
            .map(|(i, f)| (FaceId::new(i), f))
    }

    /// Iterate over all loop IDs.
    pub fn loop_ids(&self) -> impl Iterator<Item = LoopId<I>> + '_ {
        (0..self.loops.len()).map(LoopId::new)
    }

    /// Iterate over the loops of a face in winding order.
    pub fn face_loops(&self, f: FaceId<I>) -> impl Iterator<Item = LoopId<I>> {
        let face = self.face(f);
        let start = face.loop_start.index();
        (start..start + face.loop_total).map(LoopId::new)
    }

    /// Iterate over the vertices of a face in winding order.
    pub fn face_vertices(&self, f: FaceId<I>) -> impl Iterator<Item = VertexId<I>> + '_ {
        self.face_loops(f).map(move |l| self.loop_at(l).vertex)
    }

    /// Get the positions of a face's corners.
    pub fn face_positions(&self, f: FaceId<I>) -> Vec<Point3<f64>> {
        self.face_vertices(f).map(|v| *self.position(v)).collect()
    }

    /// The previous loop around the owning face.
    pub fn loop_prev(&self, l: LoopId<I>) -> LoopId<I> {
        let face = self.face(self.loop_at(l).face);
        let start = face.loop_start.index();
        let offset = l.index() - start;
        LoopId::new(start + (offset + face.loop_total - 1) % face.loop_total)
    }

    /// The next loop around the owning face.
    pub fn loop_next(&self, l: LoopId<I>) -> LoopId<I> {
        let face = self.face(self.loop_at(l).face);
        let start = face.loop_start.index();
        let offset = l.index() - start;
        LoopId::new(start + (offset + 1) % face.loop_total)
    }

    // ==================== Topology Queries ====================

    /// Faces incident to an edge.
    ///
    /// Derived from the loop table on each call; 0, 1, 2 or (non-manifold)
    /// more faces, in ascending face order.
    pub fn adjacent_faces(&self, e: EdgeId<I>) -> Vec<FaceId<I>> {
        let mut faces: Vec<FaceId<I>> = self
            .loops
            .iter()
            .filter(|l| l.edge == e)
            .map(|l| l.face)
            .collect();
        faces.dedup();
        faces
    }

    /// Build the derived edge/face adjacency for the current topology.
    pub fn adjacency(&self) -> Adjacency<I> {
        Adjacency::build(self)
    }

    /// Find the edge joining two vertices, if any.
    pub fn find_edge(&self, a: VertexId<I>, b: VertexId<I>) -> Option<EdgeId<I>> {
        self.edges()
            .find(|(_, e)| e.vertices == [a, b] || e.vertices == [b, a])
            .map(|(id, _)| id)
    }

    // ==================== Geometry ====================

    /// Newell vector area: direction is the face normal, length twice the area.
    fn face_vector_area(&self, f: FaceId<I>) -> Vector3<f64> {
        let positions = self.face_positions(f);
        let n = positions.len();
        let mut sum = Vector3::zeros();
        for i in 0..n {
            let a = positions[i].coords;
            let b = positions[(i + 1) % n].coords;
            sum += a.cross(&b);
        }
        sum
    }

    /// Compute the area of a face. Degenerate faces have area 0.
    pub fn face_area(&self, f: FaceId<I>) -> f64 {
        0.5 * self.face_vector_area(f).norm()
    }

    /// Compute the unit normal of a face. Degenerate faces yield the zero vector.
    pub fn face_normal(&self, f: FaceId<I>) -> Vector3<f64> {
        self.face_vector_area(f)
            .try_normalize(f64::EPSILON)
            .unwrap_or_else(Vector3::zeros)
    }

    /// Compute the centroid of a face's corners.
    pub fn face_centroid(&self, f: FaceId<I>) -> Point3<f64> {
        let positions = self.face_positions(f);
        let sum = positions
            .iter()
            .fold(Vector3::zeros(), |acc, p| acc + p.coords);
        Point3::from(sum / positions.len() as f64)
    }

    /// Interior angle at a corner, between the edges to the previous and next corner.
    pub fn corner_angle(&self, l: LoopId<I>) -> f64 {
        let curr = *self.position(self.loop_at(l).vertex);
        let prev = *self.position(self.loop_at(self.loop_prev(l)).vertex);
        let next = *self.position(self.loop_at(self.loop_next(l)).vertex);

        let (Some(a), Some(b)) = (
            (prev - curr).try_normalize(f64::EPSILON),
            (next - curr).try_normalize(f64::EPSILON),
        ) else {
            return 0.0;
        };
        a.dot(&b).clamp(-1.0, 1.0).acos()
    }

    /// Area-weighted vertex normals for all vertices.
    ///
    /// Vertices without incident faces get the zero vector.
    pub fn vertex_normals(&self) -> Vec<Vector3<f64>> {
        let mut normals = vec![Vector3::zeros(); self.vertices.len()];
        for f in self.face_ids() {
            let area_normal = self.face_vector_area(f);
            for v in self.face_vertices(f) {
                normals[v.index()] += area_normal;
            }
        }
        for n in &mut normals {
            *n = n.try_normalize(f64::EPSILON).unwrap_or_else(Vector3::zeros);
        }
        normals
    }

    /// The effective normal of every loop.
    ///
    /// A custom normal wins; otherwise smooth faces use the vertex normal and
    /// flat faces use the face normal.
    pub fn loop_normals(&self) -> Vec<Vector3<f64>> {
        let vertex_normals = self.vertex_normals();
        let mut out = Vec::with_capacity(self.loops.len());
        for (f, face) in self.faces() {
            let face_normal = self.face_normal(f);
            for l in self.face_loops(f) {
                let corner = self.loop_at(l);
                let normal = match corner.custom_normal {
                    Some(n) => n,
                    None if face.smooth => vertex_normals[corner.vertex.index()],
                    None => face_normal,
                };
                out.push(normal);
            }
        }
        out
    }

    /// Compute the bounding box of the mesh.
    pub fn bounding_box(&self) -> Option<(Point3<f64>, Point3<f64>)> {
        let first = self.vertices.first()?;
        let mut min = first.position;
        let mut max = first.position;

        for v in &self.vertices {
            for i in 0..3 {
                min[i] = min[i].min(v.position[i]);
                max[i] = max[i].max(v.position[i]);
            }
        }

        Some((min, max))
    }

    /// Compute the total surface area of the mesh.
    pub fn surface_area(&self) -> f64 {
        self.face_ids().map(|f| self.face_area(f)).sum()
    }

    // ==================== Edge Statistics ====================

    /// Number of edges flagged sharp.
    pub fn count_sharp(&self) -> usize {
        self.edges.iter().filter(|e| e.sharp).count()
    }

    /// Number of edges flagged as seams.
    pub fn count_seams(&self) -> usize {
        self.edges.iter().filter(|e| e.seam).count()
    }

    /// Number of edges with a bevel weight above zero.
    pub fn count_weighted(&self) -> usize {
        self.edges.iter().filter(|e| e.is_weighted()).count()
    }

    // ==================== Selection ====================

    /// Current selection granularity.
    pub fn select_mode(&self) -> SelectMode {
        self.select_mode
    }

    /// Change the selection granularity.
    pub fn set_select_mode(&mut self, mode: SelectMode) {
        self.select_mode = mode;
    }

    /// Deselect every vertex, edge and face.
    pub fn clear_selection(&mut self) {
        self.vertices.iter_mut().for_each(|v| v.select = false);
        self.edges.iter_mut().for_each(|e| e.select = false);
        self.faces.iter_mut().for_each(|f| f.select = false);
    }

    /// Set a face's selection. Selecting also flags its vertices and edges.
    pub fn select_face(&mut self, f: FaceId<I>, select: bool) {
        self.face_mut(f).select = select;
        if !select {
            return;
        }
        let start = self.face(f).loop_start.index();
        let total = self.face(f).loop_total;
        for i in start..start + total {
            let (v, e) = (self.loops[i].vertex, self.loops[i].edge);
            self.vertices[v.index()].select = true;
            self.edges[e.index()].select = true;
        }
    }

    /// Iterate over selected faces.
    pub fn selected_faces(&self) -> impl Iterator<Item = FaceId<I>> + '_ {
        self.faces()
            .filter(|(_, face)| face.select)
            .map(|(id, _)| id)
    }

    // ==================== Materials ====================

    /// The material slots, in index order.
    pub fn material_slots(&self) -> &[MaterialSlot] {
        &self.materials
    }

    /// Append a material slot and return its index.
    pub fn push_material(&mut self, slot: MaterialSlot) -> usize {
        self.materials.push(slot);
        self.materials.len() - 1
    }

    /// Remove a material slot. Face indices are not renumbered.
    pub fn remove_material(&mut self, index: usize) -> Option<MaterialSlot> {
        (index < self.materials.len()).then(|| self.materials.remove(index))
    }

    /// Index of the first slot with the given name.
    pub fn find_material(&self, name: &str) -> Option<usize> {
        self.materials.iter().position(|m| m.name == name)
    }

    // ==================== Shading ====================

    /// Mark every face smooth-shaded.
    pub fn set_smooth_shading(&mut self) {
        self.faces.iter_mut().for_each(|f| f.smooth = true);
    }

    /// Whether any loop carries a custom normal.
    pub fn has_custom_normals(&self) -> bool {
        self.loops.iter().any(|l| l.custom_normal.is_some())
    }

    /// Drop every custom normal.
    pub fn clear_custom_normals(&mut self) {
        self.loops.iter_mut().for_each(|l| l.custom_normal = None);
    }

    // ==================== Construction ====================

    /// Add a new vertex and return its ID.
    pub fn add_vertex(&mut self, position: Point3<f64>) -> VertexId<I> {
        let id = VertexId::new(self.vertices.len());
        self.vertices.push(Vertex::new(position));
        id
    }

    // ==================== Validation ====================

    /// Check that loops, faces and edges reference each other consistently.
    pub fn is_valid(&self) -> bool {
        let mut expected_start = 0;
        for (fid, face) in self.faces() {
            if face.loop_start.index() != expected_start || face.loop_total < 3 {
                return false;
            }
            expected_start += face.loop_total;

            for l in self.face_loops(fid) {
                let corner = self.loop_at(l);
                if corner.face != fid || corner.vertex.index() >= self.vertices.len() {
                    return false;
                }
                let Some(edge) = self.edges.get(corner.edge.index()) else {
                    return false;
                };
                let next = self.loop_at(self.loop_next(l)).vertex;
                if edge.vertices != [corner.vertex, next] && edge.vertices != [next, corner.vertex]
                {
                    return false;
                }
            }
        }
        expected_start == self.loops.len()
    }
}
