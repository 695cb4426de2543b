//! End-to-end bevel and normal workflows.
//!
//! A [`Session`] owns the runtime state shared by workflow runs: the tag
//! allocator and the snapshot store. Two workflows are provided:
//!
//! - [`Session::run_bevel_workflow`]: propagate weights, back up, tag, hand
//!   the mesh to an external [`GeometryGenerator`], select the untagged
//!   original faces and synthesize custom normals on them.
//! - [`Session::run_from_geometry`]: for meshes already beveled elsewhere,
//!   classify bevel faces by area and synthesize normals on the rest.
//!
//! Both can be undone with [`Session::restore`].
//!
//! The generator runs inside a [`TagGuard`], so the provenance slot is
//! removed on every exit path, including a generator error.

use std::ops::{Deref, DerefMut};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::algo::classify::{self, ClassifyOptions};
use crate::algo::normals::{self, WeightMode, WeightedNormalOptions};
use crate::algo::tagging::{self, TagAllocator, TaggedRegion};
use crate::algo::weights::{self, WeightSource};
use crate::error::{MeshError, Result};
use crate::mesh::{FaceId, MeshIndex, PolyMesh, SelectMode};
use crate::snapshot::{ObjectId, SnapshotStore};

/// Name of the per-edge layer the generator reads weights from.
pub const WEIGHT_ATTRIBUTE: &str = "bevel_weight_edge";

/// Which elements the generator bevels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BevelAffect {
    /// Bevel edges.
    #[default]
    Edges,
    /// Bevel vertices.
    Vertices,
}

/// How the bevel width is measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OffsetType {
    /// Offset of new edges from the original edge.
    #[default]
    Offset,
    /// Width of the new faces.
    Width,
    /// Perpendicular distance from the original edge to the bevel face.
    Depth,
    /// Percentage of the adjacent edge length.
    Percent,
    /// Absolute distance along the adjacent edge.
    Absolute,
}

/// Pattern for the outside of miters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OuterMiter {
    /// Sharp corner.
    #[default]
    Sharp,
    /// Patch.
    Patch,
    /// Arc.
    Arc,
}

/// Pattern for the inside of miters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InnerMiter {
    /// Sharp corner.
    #[default]
    Sharp,
    /// Arc.
    Arc,
}

/// Parameters forwarded to the geometry generator.
///
/// The core never interprets these beyond validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BevelParams {
    /// Bevel amount, interpreted per `offset_type`.
    pub width: f64,
    /// Number of segments across the bevel.
    pub segments: u32,
    /// Profile shape; 0.5 is round.
    pub profile: f64,
    /// Elements to bevel.
    pub affect: BevelAffect,
    /// Width measurement.
    pub offset_type: OffsetType,
    /// Clamp the width to avoid overlap.
    pub clamp_overlap: bool,
    /// Prefer sliding along edges over even widths.
    pub loop_slide: bool,
    /// Outer miter pattern.
    pub miter_outer: OuterMiter,
    /// Inner miter pattern.
    pub miter_inner: InnerMiter,
    /// Arc spread for inner miters.
    pub spread: f64,
}

impl Default for BevelParams {
    fn default() -> Self {
        Self {
            width: 0.02,
            segments: 1,
            profile: 0.5,
            affect: BevelAffect::default(),
            offset_type: OffsetType::default(),
            clamp_overlap: false,
            loop_slide: true,
            miter_outer: OuterMiter::default(),
            miter_inner: InnerMiter::default(),
            spread: 0.1,
        }
    }
}

impl BevelParams {
    /// Set the bevel width.
    pub fn with_width(mut self, width: f64) -> Self {
        self.width = width;
        self
    }

    /// Set the segment count.
    pub fn with_segments(mut self, segments: u32) -> Self {
        self.segments = segments;
        self
    }

    /// Check parameter ranges.
    pub fn validate(&self) -> Result<()> {
        if self.width.is_nan() || self.width <= 0.0 {
            return Err(MeshError::invalid_param("width", self.width, "must be positive"));
        }
        if self.segments == 0 {
            return Err(MeshError::invalid_param("segments", self.segments, "must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.profile) {
            return Err(MeshError::invalid_param("profile", self.profile, "must be within [0, 1]"));
        }
        if !(0.0..=1.0).contains(&self.spread) {
            return Err(MeshError::invalid_param("spread", self.spread, "must be within [0, 1]"));
        }
        Ok(())
    }
}

/// Everything a generator is told about one run.
#[derive(Debug, Clone, Copy)]
pub struct GeneratorRequest<'a> {
    /// Edge layer holding the weights; only edges with weight > 0 are affected.
    pub weight_attribute: &'a str,
    /// Bevel configuration.
    pub params: &'a BevelParams,
    /// Material slot every generated face must be painted with.
    pub slot_index: usize,
}

/// An external operator that adds bevel geometry to a mesh.
pub trait GeometryGenerator<I: MeshIndex = u32> {
    /// Mutate `mesh` in place. New faces must carry `request.slot_index`.
    fn generate(&mut self, mesh: &mut PolyMesh<I>, request: &GeneratorRequest<'_>) -> Result<()>;
}

/// How custom normals are synthesized on the original faces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NormalMode {
    /// Copy each selected face's flat normal to its loops.
    #[default]
    FaceCopy,
    /// Blend face normals per vertex.
    Weighted(WeightMode),
}

/// Options shared by both workflows.
#[derive(Debug, Clone)]
pub struct WorkflowOptions {
    /// Mark weighted edges as seams before generating.
    pub mark_seams: bool,
    /// Triangulate generated faces with more than four corners.
    pub fix_ngons: bool,
    /// Normal synthesis mode.
    pub normals: NormalMode,
    /// Weighted mode only: restrict to the selected original faces.
    pub selected_only: bool,
    /// Generator parameters.
    pub params: BevelParams,
    /// Compute per-face data in parallel.
    pub parallel: bool,
}

impl Default for WorkflowOptions {
    fn default() -> Self {
        Self {
            mark_seams: false,
            fix_ngons: true,
            normals: NormalMode::default(),
            selected_only: false,
            params: BevelParams::default(),
            parallel: true,
        }
    }
}

impl WorkflowOptions {
    /// Set the normal synthesis mode.
    pub fn with_normals(mut self, normals: NormalMode) -> Self {
        self.normals = normals;
        self
    }

    /// Mark weighted edges as seams.
    pub fn with_seams(mut self, mark_seams: bool) -> Self {
        self.mark_seams = mark_seams;
        self
    }

    /// Triangulate generated n-gons before normals are written.
    pub fn with_ngon_fix(mut self, fix_ngons: bool) -> Self {
        self.fix_ngons = fix_ngons;
        self
    }

    /// Restrict weighted synthesis to the selection.
    pub fn selected_only(mut self, selected_only: bool) -> Self {
        self.selected_only = selected_only;
        self
    }

    /// Set the generator parameters.
    pub fn with_params(mut self, params: BevelParams) -> Self {
        self.params = params;
        self
    }

    /// Set whether to use parallel execution.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }
}

/// Counts gathered during a workflow run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WorkflowReport {
    /// Edges carrying a bevel weight.
    pub weighted_edges: usize,
    /// Edges marked as seams.
    pub seams_marked: usize,
    /// Generated n-gons that were triangulated.
    pub ngons_fixed: usize,
    /// Faces identified as bevel geometry.
    pub bevel_faces: usize,
    /// Faces identified as original surface.
    pub original_faces: usize,
    /// Loops that received a custom normal.
    pub normals_written: usize,
}

/// A named host object owning a mesh.
#[derive(Debug, Clone)]
pub struct MeshObject<I: MeshIndex = u32> {
    /// Object identity.
    pub id: ObjectId,
    /// Object geometry.
    pub mesh: PolyMesh<I>,
}

impl<I: MeshIndex> MeshObject<I> {
    /// Wrap a mesh under a name.
    pub fn new(name: impl Into<String>, mesh: PolyMesh<I>) -> Self {
        Self {
            id: ObjectId::new(name),
            mesh,
        }
    }
}

/// Scoped provenance tag over a mutably borrowed mesh.
///
/// Dereferences to the mesh. The tag slot is removed when the guard is
/// dropped; use [`TagGuard::finish`] to observe cleanup errors.
pub struct TagGuard<'a, I: MeshIndex = u32> {
    allocator: &'a mut TagAllocator,
    mesh: &'a mut PolyMesh<I>,
    region: Option<TaggedRegion>,
}

impl<'a, I: MeshIndex> TagGuard<'a, I> {
    /// Begin a tag on `mesh`.
    pub fn begin(allocator: &'a mut TagAllocator, mesh: &'a mut PolyMesh<I>) -> Self {
        let region = tagging::begin(allocator, mesh);
        Self {
            allocator,
            mesh,
            region: Some(region),
        }
    }

    /// The region set up by `begin`, until the guard ends.
    pub fn region(&self) -> Option<&TaggedRegion> {
        self.region.as_ref()
    }

    /// Current slot index of the tag, re-resolved by name.
    pub fn slot_index(&self) -> Option<usize> {
        self.region
            .as_ref()
            .and_then(|region| tagging::resolve(&*self.mesh, region.token))
    }

    fn missing_tag(&self) -> MeshError {
        MeshError::TagNotFound {
            token: self
                .region
                .as_ref()
                .map(|region| region.token.slot_name())
                .unwrap_or_default(),
        }
    }

    /// End the tag now and report cleanup errors.
    pub fn finish(mut self) -> Result<()> {
        self.end()
    }

    fn end(&mut self) -> Result<()> {
        match self.region.take() {
            Some(region) => tagging::end(self.allocator, self.mesh, &region),
            None => Ok(()),
        }
    }
}

impl<I: MeshIndex> Deref for TagGuard<'_, I> {
    type Target = PolyMesh<I>;

    fn deref(&self) -> &Self::Target {
        &*self.mesh
    }
}

impl<I: MeshIndex> DerefMut for TagGuard<'_, I> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut *self.mesh
    }
}

impl<I: MeshIndex> Drop for TagGuard<'_, I> {
    fn drop(&mut self) {
        if let Err(err) = self.end() {
            warn!(error = %err, "failed to remove provenance tag");
        }
    }
}

/// Runtime state for workflow runs.
#[derive(Debug)]
pub struct Session<I: MeshIndex = u32> {
    tags: TagAllocator,
    snapshots: SnapshotStore<I>,
}

impl<I: MeshIndex> Default for Session<I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: MeshIndex> Session<I> {
    /// Create a session with no live tags or snapshots.
    pub fn new() -> Self {
        Self {
            tags: TagAllocator::new(),
            snapshots: SnapshotStore::new(),
        }
    }

    /// The session's tag allocator.
    pub fn tags(&self) -> &TagAllocator {
        &self.tags
    }

    /// The session's snapshot store.
    pub fn snapshots(&self) -> &SnapshotStore<I> {
        &self.snapshots
    }

    /// Whether a backup exists for `id`.
    pub fn has_backup(&self, id: &ObjectId) -> bool {
        self.snapshots.exists(id)
    }

    /// Replace the object's mesh with its backup and forget the backup.
    pub fn restore(&mut self, object: &mut MeshObject<I>) -> Result<()> {
        self.snapshots.restore(&object.id, &mut object.mesh)?;
        info!(object = %object.id, "restored original mesh");
        Ok(())
    }

    /// Run the tagged bevel workflow.
    ///
    /// # Errors
    ///
    /// - [`MeshError::NoOp`] if the weight source matched no edge. Nothing
    ///   else has run and no backup was taken.
    /// - Any error from the generator. The tag is removed and the backup
    ///   taken before generation is kept.
    pub fn run_bevel_workflow<G>(
        &mut self,
        object: &mut MeshObject<I>,
        source: WeightSource,
        generator: &mut G,
        options: &WorkflowOptions,
    ) -> Result<WorkflowReport>
    where
        G: GeometryGenerator<I> + ?Sized,
    {
        options.params.validate()?;
        let mut report = WorkflowReport::default();

        info!(object = %object.id, step = source.step_name(), "propagating bevel weights");
        report.weighted_edges = weights::propagate(&mut object.mesh, source)?;
        if report.weighted_edges == 0 {
            warn!(object = %object.id, step = source.step_name(), "no edges matched");
            return Err(MeshError::NoOp {
                step: source.step_name(),
            });
        }

        if options.mark_seams {
            report.seams_marked = weights::seams_from_weight(&mut object.mesh);
        }

        self.snapshots.create(&object.id, &object.mesh);
        object.mesh.set_smooth_shading();

        let mut guard = TagGuard::begin(&mut self.tags, &mut object.mesh);
        let request = GeneratorRequest {
            weight_attribute: WEIGHT_ATTRIBUTE,
            params: &options.params,
            slot_index: guard.slot_index().ok_or_else(|| guard.missing_tag())?,
        };
        info!(slot = request.slot_index, "running geometry generator");
        generator.generate(&mut *guard, &request)?;

        // The generator may have added or removed slots.
        let slot = guard.slot_index().ok_or_else(|| guard.missing_tag())?;
        if options.fix_ngons {
            report.ngons_fixed = fix_generated_ngons(&mut *guard, slot);
        }
        report.bevel_faces = tagging::tagged_faces(&*guard, slot).len();
        report.original_faces = tagging::select_untagged(&mut *guard, slot);
        report.normals_written = synthesize(&mut *guard, options)?;
        guard.finish()?;

        info!(
            object = %object.id,
            bevel = report.bevel_faces,
            original = report.original_faces,
            loops = report.normals_written,
            "bevel workflow complete"
        );
        Ok(report)
    }

    /// Run the tag-less workflow on a mesh that already carries bevel geometry.
    ///
    /// # Errors
    ///
    /// [`MeshError::NoOp`] if no bevel faces were found or no original face
    /// remains. The mesh is untouched in that case.
    pub fn run_from_geometry(
        &mut self,
        object: &mut MeshObject<I>,
        classify_options: &ClassifyOptions,
        options: &WorkflowOptions,
    ) -> Result<WorkflowReport> {
        let classification = classify::classify_bevel_faces(&object.mesh, classify_options)?;
        if classification.is_empty() {
            warn!(object = %object.id, "no bevel faces detected");
            return Err(MeshError::NoOp { step: "classify" });
        }
        if classification.original_faces.is_empty() {
            warn!(object = %object.id, "no original faces remain");
            return Err(MeshError::NoOp {
                step: "select_original",
            });
        }

        self.snapshots.create(&object.id, &object.mesh);
        object.mesh.set_smooth_shading();

        let mut report = WorkflowReport {
            weighted_edges: object.mesh.count_weighted(),
            bevel_faces: classification.bevel_count,
            ..WorkflowReport::default()
        };
        report.original_faces =
            classify::select_faces(&mut object.mesh, &classification.original_faces);
        report.normals_written = synthesize(&mut object.mesh, options)?;

        info!(
            object = %object.id,
            bevel = report.bevel_faces,
            original = report.original_faces,
            loops = report.normals_written,
            "geometry workflow complete"
        );
        Ok(report)
    }
}

/// Select the tagged faces with more than four corners and fan-triangulate them.
fn fix_generated_ngons<I: MeshIndex>(mesh: &mut PolyMesh<I>, slot: usize) -> usize {
    let ngons: Vec<FaceId<I>> = tagging::tagged_faces(mesh, slot)
        .into_iter()
        .filter(|&f| mesh.face(f).loop_total > 4)
        .collect();
    if ngons.is_empty() {
        return 0;
    }

    mesh.clear_selection();
    mesh.set_select_mode(SelectMode::Face);
    for &f in &ngons {
        mesh.select_face(f, true);
    }
    let fixed = mesh.triangulate_faces(&ngons);
    info!(ngons = fixed, "triangulated generated n-gons");
    fixed
}

fn synthesize<I: MeshIndex>(mesh: &mut PolyMesh<I>, options: &WorkflowOptions) -> Result<usize> {
    match options.normals {
        NormalMode::FaceCopy => Ok(normals::copy_from_faces(mesh)),
        NormalMode::Weighted(mode) => {
            let weighted = WeightedNormalOptions::new(mode)
                .selected_only(options.selected_only)
                .with_parallel(options.parallel);
            normals::weighted_normals(mesh, &weighted)
        }
    }
}
