//! Mesh processing algorithms.
//!
//! - **Weights**: bevel-weight propagation from sharp, seam or dihedral angle
//! - **Tagging**: provenance tags carried through a borrowed material slot
//! - **Classification**: area-based flood fill separating bevel faces from
//!   the original surface
//! - **Normals**: face-copy and weighted custom normal synthesis

pub mod classify;
pub mod normals;
pub mod tagging;
pub mod weights;
