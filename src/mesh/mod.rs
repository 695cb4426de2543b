//! Core mesh data structures.
//!
//! This module provides the polygon mesh representation used by every
//! algorithm in the crate.
//!
//! # Overview
//!
//! The primary type is [`PolyMesh`], an indexed polygon mesh with contiguous
//! per-face loops. Edges carry the `sharp`, `seam` and `bevel_weight`
//! attributes; faces carry a transient `material_index`; loops carry custom
//! normals.
//!
//! # Index Types
//!
//! Mesh elements are identified by type-safe index wrappers:
//! - [`VertexId`] - Identifies a vertex
//! - [`EdgeId`] - Identifies an undirected edge
//! - [`FaceId`] - Identifies a face
//! - [`LoopId`] - Identifies a face corner
//!
//! These indices are generic over the underlying integer type ([`MeshIndex`] trait),
//! allowing you to choose `u16`, `u32`, or `u64` based on mesh size.
//!
//! # Construction
//!
//! ```
//! use normalforge::mesh::{PolyMesh, build_from_polygons};
//! use nalgebra::Point3;
//!
//! let vertices = vec![
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(1.0, 1.0, 0.0),
//!     Point3::new(0.0, 1.0, 0.0),
//! ];
//! let faces = vec![vec![0, 1, 2, 3]];
//!
//! let mesh: PolyMesh = build_from_polygons(&vertices, &faces).unwrap();
//! assert_eq!(mesh.num_loops(), 4);
//! ```

mod adjacency;
mod builder;
mod index;
mod polymesh;

pub use adjacency::Adjacency;
pub use builder::{build_from_polygons, build_from_quads, build_from_triangles, to_face_vertex};
pub use index::{EdgeId, FaceId, LoopId, MeshIndex, VertexId};
pub use polymesh::{Edge, Face, Loop, MaterialSlot, PolyMesh, SelectMode, Vertex};
