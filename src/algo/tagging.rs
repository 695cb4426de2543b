//! Provenance tagging through a borrowed material slot.
//!
//! Before an external generator runs, [`begin`] appends a uniquely named
//! material slot. The generator paints every face it creates with that slot,
//! so afterwards [`select_untagged`] recovers the original surface without a
//! classification pass. [`end`] removes the slot again and renumbers face
//! material indices so faces after the removed slot keep their material.
//!
//! Slot indices can shift between `begin` and `end` when other code inserts or
//! removes slots, so the slot is always re-resolved by its token name via
//! [`resolve`] rather than cached.
//!
//! `begin`/`end` must be paired on every path. The workflow layer enforces
//! this with [`TagGuard`](crate::workflow::TagGuard).

use std::collections::BTreeSet;
use std::fmt;

use tracing::debug;

use crate::error::{MeshError, Result};
use crate::mesh::{FaceId, MaterialSlot, MeshIndex, PolyMesh, SelectMode};

/// A process-unique provenance tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TagToken(u64);

impl TagToken {
    /// The raw counter value.
    pub fn id(self) -> u64 {
        self.0
    }

    /// Name of the material slot bound to this token.
    pub fn slot_name(self) -> String {
        format!("_nf_tag_{:08x}", self.0)
    }

    /// Name of the neutral slots inserted for this token to cover face
    /// material indices that have no slot.
    pub fn pad_slot_name(self) -> String {
        format!("_nf_pad_{:08x}", self.0)
    }
}

impl fmt::Display for TagToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.slot_name())
    }
}

/// Hands out fresh tag tokens for the lifetime of one workflow runtime.
#[derive(Debug, Default)]
pub struct TagAllocator {
    next: u64,
    live: BTreeSet<TagToken>,
}

impl TagAllocator {
    /// Create an allocator with no live tokens.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a token never handed out before by this allocator.
    pub fn allocate(&mut self) -> TagToken {
        let token = TagToken(self.next);
        self.next += 1;
        self.live.insert(token);
        token
    }

    /// Release a live token.
    pub fn release(&mut self, token: TagToken) -> Result<()> {
        if self.live.remove(&token) {
            Ok(())
        } else {
            Err(MeshError::TagNotFound {
                token: token.slot_name(),
            })
        }
    }

    /// Whether the token is currently live.
    pub fn is_live(&self, token: TagToken) -> bool {
        self.live.contains(&token)
    }

    /// Number of live tokens.
    pub fn live_count(&self) -> usize {
        self.live.len()
    }
}

/// What [`begin`] set up on a mesh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedRegion {
    /// Slot index at the time of `begin`. Re-resolve before later use.
    pub slot_index: usize,
    /// The token bound to the slot.
    pub token: TagToken,
    /// Neutral slots `begin` appended ahead of the tag, which `end` removes.
    pub padded: usize,
}

/// Append a fresh tag slot to the mesh.
///
/// Faces may carry material indices with no slot behind them (a mesh loaded
/// from a file keeps indices but not slot names). Neutral slots are appended
/// first until every index in use, and slot 0, has a slot, so the tag never
/// aliases an existing face index.
pub fn begin<I: MeshIndex>(allocator: &mut TagAllocator, mesh: &mut PolyMesh<I>) -> TaggedRegion {
    let token = allocator.allocate();

    let highest = mesh.faces().map(|(_, f)| f.material_index).max().unwrap_or(0);
    let padded = (highest + 1).saturating_sub(mesh.material_slots().len());
    for _ in 0..padded {
        mesh.push_material(MaterialSlot::new(token.pad_slot_name()));
    }
    let slot_index = mesh.push_material(MaterialSlot::new(token.slot_name()));

    debug!(%token, slot_index, padded, "began provenance tag");
    TaggedRegion {
        slot_index,
        token,
        padded,
    }
}

/// Current slot index of a token, if its slot is still present.
pub fn resolve<I: MeshIndex>(mesh: &PolyMesh<I>, token: TagToken) -> Option<usize> {
    mesh.find_material(&token.slot_name())
}

/// Select every face not painted with `slot_index`, in face-select mode.
///
/// Clears all prior selection first. Returns the number of faces selected.
pub fn select_untagged<I: MeshIndex>(mesh: &mut PolyMesh<I>, slot_index: usize) -> usize {
    mesh.clear_selection();
    mesh.set_select_mode(SelectMode::Face);

    let untagged: Vec<FaceId<I>> = mesh
        .faces()
        .filter(|(_, face)| face.material_index != slot_index)
        .map(|(id, _)| id)
        .collect();
    for &f in &untagged {
        mesh.select_face(f, true);
    }
    untagged.len()
}

/// Faces painted with `slot_index`.
pub fn tagged_faces<I: MeshIndex>(mesh: &PolyMesh<I>, slot_index: usize) -> Vec<FaceId<I>> {
    mesh.faces()
        .filter(|(_, face)| face.material_index == slot_index)
        .map(|(id, _)| id)
        .collect()
}

/// Remove a slot, moving its faces to slot 0 and shifting later indices down.
fn remove_slot<I: MeshIndex>(mesh: &mut PolyMesh<I>, index: usize) {
    for face in &mut mesh.faces {
        if face.material_index == index {
            face.material_index = 0;
        } else if face.material_index > index {
            face.material_index -= 1;
        }
    }
    mesh.remove_material(index);
}

/// Drop the neutral slots `begin` appended.
///
/// They stand in for indices faces already used, so faces inside the padded
/// block keep their index. Faces on slots added after the block shift down.
fn remove_padding<I: MeshIndex>(mesh: &mut PolyMesh<I>, token: TagToken) -> usize {
    let name = token.pad_slot_name();
    let pads: Vec<usize> = mesh
        .material_slots()
        .iter()
        .enumerate()
        .filter(|(_, m)| m.name == name)
        .map(|(i, _)| i)
        .collect();
    let Some(&last) = pads.last() else {
        return 0;
    };

    for face in &mut mesh.faces {
        if face.material_index > last {
            face.material_index -= pads.len();
        }
    }
    for &index in pads.iter().rev() {
        mesh.remove_material(index);
    }
    pads.len()
}

/// Remove the tag slot (and any neutral slots `begin` appended) and release the token.
///
/// # Errors
///
/// [`MeshError::TagNotFound`] if the token is not live, or if its slot was
/// removed by someone else. In the latter case the remaining cleanup still runs.
pub fn end<I: MeshIndex>(
    allocator: &mut TagAllocator,
    mesh: &mut PolyMesh<I>,
    region: &TaggedRegion,
) -> Result<()> {
    allocator.release(region.token)?;

    let tag_slot = resolve(mesh, region.token);
    if let Some(index) = tag_slot {
        remove_slot(mesh, index);
    }

    let unpadded = if region.padded > 0 {
        remove_padding(mesh, region.token)
    } else {
        0
    };

    debug!(
        token = %region.token,
        removed = tag_slot.is_some(),
        unpadded,
        "ended provenance tag"
    );
    match tag_slot {
        Some(_) => Ok(()),
        None => Err(MeshError::TagNotFound {
            token: region.token.slot_name(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::build_from_polygons;
    use nalgebra::Point3;

    fn strip(n: usize) -> PolyMesh {
        let vertices: Vec<Point3<f64>> = (0..=n)
            .flat_map(|i| {
                [
                    Point3::new(i as f64, 0.0, 0.0),
                    Point3::new(i as f64, 1.0, 0.0),
                ]
            })
            .collect();
        let faces: Vec<Vec<usize>> = (0..n)
            .map(|i| vec![2 * i, 2 * i + 2, 2 * i + 3, 2 * i + 1])
            .collect();
        build_from_polygons(&vertices, &faces).unwrap()
    }

    #[test]
    fn test_tokens_are_fresh() {
        let mut allocator = TagAllocator::new();
        let a = allocator.allocate();
        let b = allocator.allocate();
        assert_ne!(a, b);
        assert_ne!(a.slot_name(), b.slot_name());
        assert_eq!(allocator.live_count(), 2);

        allocator.release(a).unwrap();
        let c = allocator.allocate();
        assert_ne!(a, c);
        assert!(allocator.release(a).is_err());
    }

    #[test]
    fn test_begin_inserts_default_slot() {
        let mut allocator = TagAllocator::new();
        let mut mesh = strip(2);

        let region = begin(&mut allocator, &mut mesh);
        assert_eq!(region.padded, 1);
        assert_eq!(region.slot_index, 1);
        assert_eq!(mesh.material_slots().len(), 2);

        end(&mut allocator, &mut mesh, &region).unwrap();
        assert!(mesh.material_slots().is_empty());
        assert!(mesh.faces().all(|(_, f)| f.material_index == 0));
    }

    #[test]
    fn test_end_renumbers_after_shift() {
        let mut allocator = TagAllocator::new();
        let mut mesh = strip(4);
        mesh.push_material(MaterialSlot::new("paint"));
        mesh.push_material(MaterialSlot::new("metal"));
        mesh.face_mut(FaceId::new(1)).material_index = 1;

        let region = begin(&mut allocator, &mut mesh);
        assert_eq!(region.padded, 0);
        assert_eq!(region.slot_index, 2);

        // Another slot lands after the tag; a face uses it.
        let late = mesh.push_material(MaterialSlot::new("late"));
        mesh.face_mut(FaceId::new(3)).material_index = late;
        // Generator output.
        mesh.face_mut(FaceId::new(2)).material_index = region.slot_index;

        end(&mut allocator, &mut mesh, &region).unwrap();

        let names: Vec<_> = mesh.material_slots().iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, ["paint", "metal", "late"]);
        assert_eq!(mesh.face(FaceId::new(1)).material_index, 1);
        assert_eq!(mesh.face(FaceId::new(2)).material_index, 0);
        assert_eq!(mesh.face(FaceId::new(3)).material_index, 2);
    }

    #[test]
    fn test_resolve_tracks_slot_moves() {
        let mut allocator = TagAllocator::new();
        let mut mesh = strip(1);
        mesh.push_material(MaterialSlot::new("a"));
        mesh.push_material(MaterialSlot::new("b"));
        let region = begin(&mut allocator, &mut mesh);
        assert_eq!(resolve(&mesh, region.token), Some(2));

        mesh.remove_material(0);
        assert_eq!(resolve(&mesh, region.token), Some(1));
    }

    #[test]
    fn test_select_untagged() {
        let mut allocator = TagAllocator::new();
        let mut mesh = strip(3);
        let region = begin(&mut allocator, &mut mesh);
        mesh.face_mut(FaceId::new(0)).material_index = region.slot_index;

        assert_eq!(select_untagged(&mut mesh, region.slot_index), 2);
        assert_eq!(mesh.select_mode(), SelectMode::Face);
        assert!(!mesh.face(FaceId::new(0)).select);
        assert_eq!(
            tagged_faces(&mesh, region.slot_index),
            vec![FaceId::new(0)]
        );
    }

    #[test]
    fn test_end_with_vanished_slot_still_cleans_up() {
        let mut allocator = TagAllocator::new();
        let mut mesh = strip(1);
        let region = begin(&mut allocator, &mut mesh);
        mesh.remove_material(region.slot_index);

        assert!(matches!(
            end(&mut allocator, &mut mesh, &region),
            Err(MeshError::TagNotFound { .. })
        ));
        assert!(mesh.material_slots().is_empty());
        assert_eq!(allocator.live_count(), 0);
    }

    #[test]
    fn test_slotless_indices_survive_round_trip() {
        // As loaded from a file: indices 0..3 in use, no slots.
        let mut allocator = TagAllocator::new();
        let mut mesh = strip(3);
        for i in 0..3 {
            mesh.face_mut(FaceId::new(i)).material_index = i;
        }

        let region = begin(&mut allocator, &mut mesh);
        assert_eq!(region.padded, 3);
        assert_eq!(region.slot_index, 3);
        assert_eq!(select_untagged(&mut mesh, region.slot_index), 3);

        end(&mut allocator, &mut mesh, &region).unwrap();
        let after: Vec<_> = mesh.faces().map(|(_, f)| f.material_index).collect();
        assert_eq!(after, [0, 1, 2]);
        assert!(mesh.material_slots().is_empty());
    }

    #[test]
    fn test_padding_only_covers_missing_slots() {
        let mut allocator = TagAllocator::new();
        let mut mesh = strip(3);
        mesh.push_material(MaterialSlot::new("paint"));
        mesh.face_mut(FaceId::new(2)).material_index = 2;

        let region = begin(&mut allocator, &mut mesh);
        assert_eq!(region.padded, 2);
        mesh.face_mut(FaceId::new(0)).material_index = region.slot_index;
        let late = mesh.push_material(MaterialSlot::new("late"));
        mesh.face_mut(FaceId::new(1)).material_index = late;

        end(&mut allocator, &mut mesh, &region).unwrap();
        let names: Vec<_> = mesh.material_slots().iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, ["paint", "late"]);
        let after: Vec<_> = mesh.faces().map(|(_, f)| f.material_index).collect();
        assert_eq!(after, [0, 1, 2]);
    }
}
