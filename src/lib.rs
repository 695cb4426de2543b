//! # Normalforge
//!
//! Bevel provenance and custom normal synthesis for polygon meshes.
//!
//! Normalforge prepares a mesh for an external bevel generator and cleans up
//! after it. It derives per-edge bevel weights, tags the faces the generator
//! creates, tells original faces apart from bevel faces (by tag, or by area
//! when no tag is available), and writes custom loop normals on the original
//! surface so it keeps shading flat next to rounded bevels. Every run can be
//! undone from a snapshot.
//!
//! ## Features
//!
//! - **Polygon mesh**: contiguous per-face loops with type-safe indices
//! - **Weight propagation**: from sharp edges, seams or dihedral angle
//! - **Provenance tagging**: scoped material-slot tags with index-safe cleanup
//! - **Region classification**: area flood fill for tag-less meshes
//! - **Normal synthesis**: face-copy and area/angle weighted normals
//! - **File formats**: OBJ and PLY, keeping edge attributes and loop normals
//!
//! ## Quick Start
//!
//! ```no_run
//! use normalforge::prelude::*;
//!
//! let mesh: PolyMesh = normalforge::io::load("beveled.ply").unwrap();
//! let mut object = MeshObject::new("Part", mesh);
//!
//! let mut session = Session::new();
//! let report = session
//!     .run_from_geometry(&mut object, &ClassifyOptions::default(), &WorkflowOptions::default())
//!     .unwrap();
//! println!("{} bevel faces, {} loops written", report.bevel_faces, report.normals_written);
//!
//! normalforge::io::save(&object.mesh, "shaded.obj").unwrap();
//! ```
//!
//! ## Building Meshes Programmatically
//!
//! ```
//! use normalforge::prelude::*;
//! use nalgebra::Point3;
//!
//! let vertices = vec![
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(1.0, 1.0, 0.0),
//!     Point3::new(0.0, 1.0, 0.0),
//!     Point3::new(2.0, 0.0, 0.0),
//!     Point3::new(2.0, 1.0, 0.0),
//! ];
//! let faces = vec![vec![0, 1, 2, 3], vec![1, 4, 5, 2]];
//!
//! let mut mesh: PolyMesh = build_from_polygons(&vertices, &faces).unwrap();
//! assert_eq!(mesh.num_edges(), 7);
//!
//! // A flat strip: only the six boundary edges get weighted.
//! let weighted = propagate(&mut mesh, WeightSource::Angle(DEFAULT_SHARP_ANGLE)).unwrap();
//! assert_eq!(weighted, 6);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod algo;
pub mod config;
pub mod error;
pub mod io;
pub mod mesh;
pub mod snapshot;
pub mod workflow;

/// Prelude module for convenient imports.
///
/// ```
/// use normalforge::prelude::*;
/// ```
pub mod prelude {
    pub use crate::algo::classify::{classify_bevel_faces, Classification, ClassifyOptions};
    pub use crate::algo::normals::{WeightMode, WeightedNormalOptions};
    pub use crate::algo::weights::{propagate, WeightSource, DEFAULT_SHARP_ANGLE};
    pub use crate::config::WorkflowConfig;
    pub use crate::error::{MeshError, Result};
    pub use crate::mesh::{
        build_from_polygons, build_from_quads, build_from_triangles, to_face_vertex, Edge,
        EdgeId, Face, FaceId, Loop, LoopId, MeshIndex, PolyMesh, Vertex, VertexId,
    };
    pub use crate::snapshot::{ObjectId, SnapshotStore};
    pub use crate::workflow::{
        BevelParams, GeneratorRequest, GeometryGenerator, MeshObject, NormalMode, Session,
        WorkflowOptions, WorkflowReport,
    };
}

// Re-export nalgebra types for convenience
pub use nalgebra;
