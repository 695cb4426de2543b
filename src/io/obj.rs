//! Wavefront OBJ format support.
//!
//! Reads and writes `v`, `vn`, `f` and `s` records. Polygons are kept as
//! polygons. Face tokens may be `v`, `v/vt`, `v//vn` or `v/vt/vn`, with
//! negative indices counted back from the latest record. A `vn` referenced
//! by a face corner becomes that loop's custom normal.
//!
//! On save, loops carrying a custom normal are written as `v//vn`.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use nalgebra::{Point3, Vector3};

use crate::error::{MeshError, Result};
use crate::mesh::{build_from_polygons, FaceId, MeshIndex, PolyMesh};

/// One parsed face: vertex index and optional normal index per corner.
struct ObjFace {
    corners: Vec<(usize, Option<usize>)>,
    smooth: bool,
}

/// Resolve a 1-based or negative OBJ index against `count` records.
fn resolve_index(token: &str, count: usize) -> Option<usize> {
    let raw: i64 = token.parse().ok()?;
    if raw > 0 {
        let index = usize::try_from(raw - 1).ok()?;
        (index < count).then_some(index)
    } else if raw < 0 {
        count.checked_sub(usize::try_from(-raw).ok()?)
    } else {
        None
    }
}

fn parse_vector(parts: &[&str]) -> Option<[f64; 3]> {
    if parts.len() < 3 {
        return None;
    }
    Some([
        parts[0].parse().ok()?,
        parts[1].parse().ok()?,
        parts[2].parse().ok()?,
    ])
}

/// Load a mesh from an OBJ file.
///
/// # Example
///
/// ```no_run
/// use normalforge::io::obj;
/// use normalforge::mesh::PolyMesh;
///
/// let mesh: PolyMesh = obj::load("model.obj").unwrap();
/// ```
pub fn load<P: AsRef<Path>, I: MeshIndex>(path: P) -> Result<PolyMesh<I>> {
    let path = path.as_ref();
    let reader = BufReader::new(File::open(path)?);
    let load_error = |line: usize, message: &str| MeshError::LoadError {
        path: path.to_path_buf(),
        message: format!("line {line}: {message}"),
    };

    let mut vertices: Vec<Point3<f64>> = Vec::new();
    let mut normals: Vec<Vector3<f64>> = Vec::new();
    let mut faces: Vec<ObjFace> = Vec::new();
    let mut smooth = false;

    for (number, line) in reader.lines().enumerate() {
        let line = line?;
        let number = number + 1;
        let mut parts = line.split_whitespace();
        let Some(keyword) = parts.next() else {
            continue;
        };
        let rest: Vec<&str> = parts.collect();

        match keyword {
            "v" => {
                let [x, y, z] =
                    parse_vector(&rest).ok_or_else(|| load_error(number, "malformed vertex"))?;
                vertices.push(Point3::new(x, y, z));
            }
            "vn" => {
                let [x, y, z] =
                    parse_vector(&rest).ok_or_else(|| load_error(number, "malformed normal"))?;
                normals.push(Vector3::new(x, y, z));
            }
            "s" => {
                smooth = !matches!(rest.first().copied(), None | Some("off") | Some("0"));
            }
            "f" => {
                let mut corners = Vec::with_capacity(rest.len());
                for token in &rest {
                    let mut fields = token.split('/');
                    let v = fields
                        .next()
                        .and_then(|t| resolve_index(t, vertices.len()))
                        .ok_or_else(|| load_error(number, "invalid vertex reference"))?;
                    let _texcoord = fields.next();
                    let n = match fields.next() {
                        Some(t) if !t.is_empty() => Some(
                            resolve_index(t, normals.len())
                                .ok_or_else(|| load_error(number, "invalid normal reference"))?,
                        ),
                        _ => None,
                    };
                    corners.push((v, n));
                }
                faces.push(ObjFace { corners, smooth });
            }
            _ => {}
        }
    }

    if faces.is_empty() {
        return Err(MeshError::LoadError {
            path: path.to_path_buf(),
            message: "OBJ file contains no faces".to_string(),
        });
    }

    let polygons: Vec<Vec<usize>> = faces
        .iter()
        .map(|f| f.corners.iter().map(|&(v, _)| v).collect())
        .collect();
    let mut mesh: PolyMesh<I> = build_from_polygons(&vertices, &polygons)?;

    for (i, face) in faces.iter().enumerate() {
        let f = FaceId::new(i);
        mesh.face_mut(f).smooth = face.smooth;
        let loops: Vec<_> = mesh.face_loops(f).collect();
        for (l, &(_, n)) in loops.into_iter().zip(&face.corners) {
            mesh.loop_at_mut(l).custom_normal = n.map(|n| normals[n]);
        }
    }

    Ok(mesh)
}

/// Save a mesh to an OBJ file.
///
/// # Example
///
/// ```no_run
/// use normalforge::io::obj;
/// use normalforge::mesh::PolyMesh;
///
/// let mesh: PolyMesh = PolyMesh::new();
/// obj::save(&mesh, "output.obj").unwrap();
/// ```
pub fn save<P: AsRef<Path>, I: MeshIndex>(mesh: &PolyMesh<I>, path: P) -> Result<()> {
    let path = path.as_ref();
    let mut writer = BufWriter::new(File::create(path)?);

    writeln!(writer, "# Generated by normalforge")?;
    for (_, vertex) in mesh.vertices() {
        let p = vertex.position;
        writeln!(writer, "v {} {} {}", p.x, p.y, p.z)?;
    }

    // One vn per loop with a custom normal, in loop order.
    let mut normal_index = vec![None; mesh.num_loops()];
    let mut written = 0;
    for l in mesh.loop_ids() {
        if let Some(n) = mesh.loop_at(l).custom_normal {
            writeln!(writer, "vn {} {} {}", n.x, n.y, n.z)?;
            written += 1;
            normal_index[l.index()] = Some(written);
        }
    }

    let mut smooth = None;
    for (f, face) in mesh.faces() {
        if smooth != Some(face.smooth) {
            writeln!(writer, "s {}", if face.smooth { "1" } else { "off" })?;
            smooth = Some(face.smooth);
        }
        write!(writer, "f")?;
        for l in mesh.face_loops(f) {
            let v = mesh.loop_at(l).vertex.index() + 1;
            match normal_index[l.index()] {
                Some(n) => write!(writer, " {v}//{n}")?,
                None => write!(writer, " {v}")?,
            }
        }
        writeln!(writer)?;
    }

    writer.flush().map_err(|e| MeshError::SaveError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}
