//! PLY (Stanford polygon) format support.
//!
//! Faces are kept as polygons. Besides the usual `vertex` and `face`
//! elements, the attributes the workflows depend on are carried through:
//!
//! - face properties `material_index` and `smooth`
//! - an optional `edge` element with `vertex1`, `vertex2`, `sharp`, `seam`
//!   and `bevel_weight`
//!
//! Custom loop normals have no PLY representation; use OBJ for those.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use nalgebra::Point3;
use ply_rs::parser::Parser;
use ply_rs::ply::{DefaultElement, Property};
use tracing::debug;

use crate::error::{MeshError, Result};
use crate::mesh::{build_from_polygons, to_face_vertex, FaceId, MeshIndex, PolyMesh, VertexId};

/// Load a mesh from a PLY file.
///
/// # Example
///
/// ```no_run
/// use normalforge::io::ply;
/// use normalforge::mesh::PolyMesh;
///
/// let mesh: PolyMesh = ply::load("model.ply").unwrap();
/// ```
pub fn load<P: AsRef<Path>, I: MeshIndex>(path: P) -> Result<PolyMesh<I>> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let load_error = |message: &str| MeshError::LoadError {
        path: path.to_path_buf(),
        message: message.to_string(),
    };

    let parser = Parser::<DefaultElement>::new();
    let ply = parser
        .read_ply(&mut reader)
        .map_err(|e| load_error(&e.to_string()))?;

    let vertex_element = ply
        .payload
        .get("vertex")
        .ok_or_else(|| load_error("PLY file has no vertex element"))?;

    let mut vertices: Vec<Point3<f64>> = Vec::with_capacity(vertex_element.len());
    for vertex in vertex_element {
        let x = get_float_property(vertex, "x").ok_or_else(|| load_error("vertex missing x coordinate"))?;
        let y = get_float_property(vertex, "y").ok_or_else(|| load_error("vertex missing y coordinate"))?;
        let z = get_float_property(vertex, "z").ok_or_else(|| load_error("vertex missing z coordinate"))?;
        vertices.push(Point3::new(x, y, z));
    }

    let face_element = ply
        .payload
        .get("face")
        .ok_or_else(|| load_error("PLY file has no face element"))?;

    let mut faces: Vec<Vec<usize>> = Vec::with_capacity(face_element.len());
    for face in face_element {
        let indices = get_list_property(face, "vertex_indices")
            .or_else(|| get_list_property(face, "vertex_index"))
            .ok_or_else(|| load_error("face missing vertex_indices property"))?;
        faces.push(indices);
    }

    if faces.is_empty() {
        return Err(load_error("PLY file contains no faces"));
    }

    let mut mesh: PolyMesh<I> = build_from_polygons(&vertices, &faces)?;

    for (i, face) in face_element.iter().enumerate() {
        let f = FaceId::new(i);
        if let Some(material) = get_index_property(face, "material_index") {
            mesh.face_mut(f).material_index = material;
        }
        if let Some(smooth) = get_flag_property(face, "smooth") {
            mesh.face_mut(f).smooth = smooth;
        }
    }

    if let Some(edge_element) = ply.payload.get("edge") {
        for edge in edge_element {
            let a = get_index_property(edge, "vertex1")
                .ok_or_else(|| load_error("edge missing vertex1"))?;
            let b = get_index_property(edge, "vertex2")
                .ok_or_else(|| load_error("edge missing vertex2"))?;
            let e = mesh
                .find_edge(VertexId::new(a), VertexId::new(b))
                .ok_or_else(|| load_error(&format!("edge ({a}, {b}) is not part of any face")))?;

            let target = mesh.edge_mut(e);
            if let Some(sharp) = get_flag_property(edge, "sharp") {
                target.sharp = sharp;
            }
            if let Some(seam) = get_flag_property(edge, "seam") {
                target.seam = seam;
            }
            if let Some(weight) = get_float_property(edge, "bevel_weight") {
                target.bevel_weight = weight;
            }
        }
        debug!(edges = edge_element.len(), "read PLY edge attributes");
    }

    Ok(mesh)
}

fn get_float_property(element: &DefaultElement, name: &str) -> Option<f64> {
    match element.get(name)? {
        Property::Float(v) => Some(*v as f64),
        Property::Double(v) => Some(*v),
        Property::Int(v) => Some(*v as f64),
        Property::UInt(v) => Some(*v as f64),
        Property::Short(v) => Some(*v as f64),
        Property::UShort(v) => Some(*v as f64),
        Property::Char(v) => Some(*v as f64),
        Property::UChar(v) => Some(*v as f64),
        _ => None,
    }
}

fn get_index_property(element: &DefaultElement, name: &str) -> Option<usize> {
    match element.get(name)? {
        Property::Int(v) => usize::try_from(*v).ok(),
        Property::UInt(v) => Some(*v as usize),
        Property::Short(v) => usize::try_from(*v).ok(),
        Property::UShort(v) => Some(*v as usize),
        Property::Char(v) => usize::try_from(*v).ok(),
        Property::UChar(v) => Some(*v as usize),
        _ => None,
    }
}

fn get_flag_property(element: &DefaultElement, name: &str) -> Option<bool> {
    get_float_property(element, name).map(|v| v != 0.0)
}

fn get_list_property(element: &DefaultElement, name: &str) -> Option<Vec<usize>> {
    match element.get(name)? {
        Property::ListInt(v) => Some(v.iter().map(|&x| x as usize).collect()),
        Property::ListUInt(v) => Some(v.iter().map(|&x| x as usize).collect()),
        Property::ListShort(v) => Some(v.iter().map(|&x| x as usize).collect()),
        Property::ListUShort(v) => Some(v.iter().map(|&x| x as usize).collect()),
        Property::ListChar(v) => Some(v.iter().map(|&x| x as usize).collect()),
        Property::ListUChar(v) => Some(v.iter().map(|&x| x as usize).collect()),
        _ => None,
    }
}

/// Save a mesh to a PLY file (ASCII format), including edge attributes.
///
/// # Example
///
/// ```no_run
/// use normalforge::io::ply;
/// use normalforge::mesh::PolyMesh;
///
/// let mesh: PolyMesh = PolyMesh::new();
/// ply::save(&mesh, "output.ply").unwrap();
/// ```
pub fn save<P: AsRef<Path>, I: MeshIndex>(mesh: &PolyMesh<I>, path: P) -> Result<()> {
    let path = path.as_ref();
    let (vertices, faces) = to_face_vertex(mesh);

    // The corner count is declared as a uchar list length.
    if let Some(widest) = faces.iter().map(Vec::len).find(|&n| n > u8::MAX as usize) {
        return Err(MeshError::SaveError {
            path: path.to_path_buf(),
            message: format!("face with {widest} corners exceeds the PLY list limit of 255"),
        });
    }

    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    writeln!(writer, "ply")?;
    writeln!(writer, "format ascii 1.0")?;
    writeln!(writer, "comment Generated by normalforge")?;
    writeln!(writer, "element vertex {}", vertices.len())?;
    writeln!(writer, "property double x")?;
    writeln!(writer, "property double y")?;
    writeln!(writer, "property double z")?;
    writeln!(writer, "element face {}", faces.len())?;
    writeln!(writer, "property list uchar int vertex_indices")?;
    writeln!(writer, "property int material_index")?;
    writeln!(writer, "property uchar smooth")?;
    writeln!(writer, "element edge {}", mesh.num_edges())?;
    writeln!(writer, "property int vertex1")?;
    writeln!(writer, "property int vertex2")?;
    writeln!(writer, "property uchar sharp")?;
    writeln!(writer, "property uchar seam")?;
    writeln!(writer, "property double bevel_weight")?;
    writeln!(writer, "end_header")?;

    for v in &vertices {
        writeln!(writer, "{} {} {}", v.x, v.y, v.z)?;
    }

    for ((_, face), corners) in mesh.faces().zip(&faces) {
        write!(writer, "{}", corners.len())?;
        for c in corners {
            write!(writer, " {c}")?;
        }
        writeln!(writer, " {} {}", face.material_index, u8::from(face.smooth))?;
    }

    for (_, edge) in mesh.edges() {
        writeln!(
            writer,
            "{} {} {} {} {}",
            edge.vertices[0].index(),
            edge.vertices[1].index(),
            u8::from(edge.sharp),
            u8::from(edge.seam),
            edge.bevel_weight
        )?;
    }

    writer.flush().map_err(|e| MeshError::SaveError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}
