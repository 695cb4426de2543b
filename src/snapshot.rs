//! Single-slot mesh backups.
//!
//! A [`SnapshotStore`] keeps at most one deep copy of a mesh per object.
//! Creating a snapshot for an object that already has one replaces the old
//! copy. Restoring is consuming: the snapshot moves back into the object and
//! the association is cleared, so a second restore needs a new `create`.
//!
//! # Example
//!
//! ```
//! use normalforge::prelude::*;
//! use normalforge::snapshot::{ObjectId, SnapshotStore};
//! use nalgebra::Point3;
//!
//! let vertices = vec![
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(0.0, 1.0, 0.0),
//! ];
//! let mut mesh: PolyMesh = build_from_polygons(&vertices, &[vec![0, 1, 2]]).unwrap();
//! let id = ObjectId::new("Cube");
//!
//! let mut store = SnapshotStore::new();
//! store.create(&id, &mesh);
//! mesh.set_position(VertexId::new(0), Point3::new(5.0, 5.0, 5.0));
//!
//! store.restore(&id, &mut mesh).unwrap();
//! assert_eq!(*mesh.position(VertexId::new(0)), Point3::new(0.0, 0.0, 0.0));
//! assert!(!store.exists(&id));
//! ```

use std::collections::BTreeMap;
use std::fmt;

use tracing::debug;

use crate::error::{MeshError, Result};
use crate::mesh::{MeshIndex, PolyMesh};

/// Identity of a host object (its name).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(String);

impl ObjectId {
    /// Create an id from an object name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The object name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ObjectId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// A deep copy of a mesh.
#[derive(Debug, Clone)]
pub struct MeshSnapshot<I: MeshIndex = u32> {
    mesh: PolyMesh<I>,
    sequence: u64,
}

impl<I: MeshIndex> MeshSnapshot<I> {
    /// The stored mesh.
    pub fn mesh(&self) -> &PolyMesh<I> {
        &self.mesh
    }

    /// Creation order within the owning store.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }
}

/// One live snapshot per object.
#[derive(Debug)]
pub struct SnapshotStore<I: MeshIndex = u32> {
    snapshots: BTreeMap<ObjectId, MeshSnapshot<I>>,
    next_sequence: u64,
}

impl<I: MeshIndex> Default for SnapshotStore<I> {
    fn default() -> Self {
        Self {
            snapshots: BTreeMap::new(),
            next_sequence: 0,
        }
    }
}

impl<I: MeshIndex> SnapshotStore<I> {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Back up `mesh` for `id`, replacing any snapshot already held for it.
    pub fn create(&mut self, id: &ObjectId, mesh: &PolyMesh<I>) {
        let sequence = self.next_sequence;
        self.next_sequence += 1;

        let previous = self.snapshots.insert(
            id.clone(),
            MeshSnapshot {
                mesh: mesh.clone(),
                sequence,
            },
        );
        debug!(
            object = %id,
            sequence,
            replaced = previous.is_some(),
            "created snapshot"
        );
    }

    /// Replace `mesh` with the stored copy and forget the snapshot.
    ///
    /// # Errors
    ///
    /// [`MeshError::SnapshotNotFound`] if nothing is stored for `id`. `mesh`
    /// is left untouched.
    pub fn restore(&mut self, id: &ObjectId, mesh: &mut PolyMesh<I>) -> Result<()> {
        let snapshot = self
            .snapshots
            .remove(id)
            .ok_or_else(|| MeshError::SnapshotNotFound {
                object: id.to_string(),
            })?;
        *mesh = snapshot.mesh;
        debug!(object = %id, sequence = snapshot.sequence, "restored snapshot");
        Ok(())
    }

    /// Whether a snapshot is held for `id`.
    pub fn exists(&self, id: &ObjectId) -> bool {
        self.snapshots.contains_key(id)
    }

    /// The snapshot held for `id`, if any.
    pub fn get(&self, id: &ObjectId) -> Option<&MeshSnapshot<I>> {
        self.snapshots.get(id)
    }

    /// Drop the snapshot for `id`. Returns whether one existed.
    pub fn discard(&mut self, id: &ObjectId) -> bool {
        self.snapshots.remove(id).is_some()
    }

    /// Objects that currently have a snapshot, in name order.
    pub fn ids(&self) -> impl Iterator<Item = &ObjectId> + '_ {
        self.snapshots.keys()
    }

    /// Number of held snapshots.
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Whether the store holds nothing.
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{build_from_polygons, EdgeId, VertexId};
    use nalgebra::Point3;

    fn quad() -> PolyMesh {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        build_from_polygons(&vertices, &[vec![0, 1, 2, 3]]).unwrap()
    }

    #[test]
    fn test_restore_is_exact_and_consuming() {
        let id = ObjectId::new("Plane");
        let mut mesh = quad();
        let original = mesh.clone();

        let mut store = SnapshotStore::new();
        store.create(&id, &mesh);
        assert!(store.exists(&id));

        mesh.set_position(VertexId::new(2), Point3::new(3.0, 3.0, 3.0));
        mesh.edge_mut(EdgeId::new(0)).bevel_weight = 1.0;
        mesh.set_smooth_shading();

        store.restore(&id, &mut mesh).unwrap();
        assert_eq!(mesh, original);
        assert!(!store.exists(&id));

        assert!(matches!(
            store.restore(&id, &mut mesh),
            Err(MeshError::SnapshotNotFound { .. })
        ));
    }

    #[test]
    fn test_create_overwrites() {
        let id = ObjectId::new("Plane");
        let mut mesh = quad();
        let mut store = SnapshotStore::new();

        store.create(&id, &mesh);
        mesh.edge_mut(EdgeId::new(1)).sharp = true;
        store.create(&id, &mesh);

        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&id).unwrap().sequence(), 1);
        assert!(store.get(&id).unwrap().mesh().edge(EdgeId::new(1)).sharp);
    }

    #[test]
    fn test_missing_restore_leaves_mesh() {
        let mut mesh = quad();
        let before = mesh.clone();
        let mut store = SnapshotStore::new();
        assert!(store.restore(&ObjectId::new("Ghost"), &mut mesh).is_err());
        assert_eq!(mesh, before);
    }

    #[test]
    fn test_discard_and_ids() {
        let mesh = quad();
        let mut store = SnapshotStore::new();
        store.create(&ObjectId::new("b"), &mesh);
        store.create(&ObjectId::new("a"), &mesh);

        let ids: Vec<_> = store.ids().map(ObjectId::as_str).collect();
        assert_eq!(ids, ["a", "b"]);

        assert!(store.discard(&ObjectId::new("a")));
        assert!(!store.discard(&ObjectId::new("a")));
        assert_eq!(store.len(), 1);
    }
}
