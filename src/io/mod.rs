//! Mesh file I/O.
//!
//! # Supported Formats
//!
//! | Format | Extension | Load | Save | Carries |
//! |--------|-----------|------|------|---------|
//! | Wavefront OBJ | `.obj` | ✓ | ✓ | polygons, smooth groups, custom loop normals |
//! | PLY | `.ply` | ✓ | ✓ | polygons, material index, smooth flag, edge sharp/seam/bevel weight |
//!
//! Vertex order and loop order are preserved in both directions.
//!
//! # Usage
//!
//! ```no_run
//! use normalforge::io::{load, save};
//! use normalforge::mesh::PolyMesh;
//!
//! let mesh: PolyMesh = load("model.ply").unwrap();
//! save(&mesh, "output.obj").unwrap();
//! ```

pub mod obj;
pub mod ply;

use std::path::Path;

use crate::error::{MeshError, Result};
use crate::mesh::{MeshIndex, PolyMesh};

/// Supported mesh file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Wavefront OBJ format.
    Obj,
    /// PLY (Stanford polygon) format.
    Ply,
}

impl Format {
    /// Detect format from file extension.
    pub fn from_extension(ext: &str) -> Option<Format> {
        match ext.to_lowercase().as_str() {
            "obj" => Some(Format::Obj),
            "ply" => Some(Format::Ply),
            _ => None,
        }
    }

    /// Detect format from file path.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Option<Format> {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(Format::from_extension)
    }
}

fn detect(path: &Path) -> Result<Format> {
    Format::from_path(path).ok_or_else(|| MeshError::UnsupportedFormat {
        extension: path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("(none)")
            .to_string(),
    })
}

/// Load a mesh from a file, choosing the format by extension.
pub fn load<P: AsRef<Path>, I: MeshIndex>(path: P) -> Result<PolyMesh<I>> {
    let path = path.as_ref();
    match detect(path)? {
        Format::Obj => obj::load(path),
        Format::Ply => ply::load(path),
    }
}

/// Save a mesh to a file, choosing the format by extension.
pub fn save<P: AsRef<Path>, I: MeshIndex>(mesh: &PolyMesh<I>, path: P) -> Result<()> {
    let path = path.as_ref();
    match detect(path)? {
        Format::Obj => obj::save(mesh, path),
        Format::Ply => ply::save(mesh, path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_detection() {
        assert_eq!(Format::from_path("a/b/mesh.PLY"), Some(Format::Ply));
        assert_eq!(Format::from_path("mesh.obj"), Some(Format::Obj));
        assert_eq!(Format::from_path("mesh.stl"), None);
        assert_eq!(Format::from_path("mesh"), None);
    }

    #[test]
    fn test_unsupported_extension() {
        let err = load::<_, u32>("mesh.fbx").unwrap_err();
        assert!(matches!(err, MeshError::UnsupportedFormat { extension } if extension == "fbx"));
    }
}
