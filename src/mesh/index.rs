//! Typed handles for vertices, edges, faces and loops.
//!
//! A handle is a plain integer wrapped in a distinct type, so a loop index
//! can never be passed where a face index is expected. The integer width is
//! a parameter (`u32` unless stated otherwise).

use std::fmt::{self, Debug};
use std::hash::Hash;

/// Integer storage for element handles.
pub trait MeshIndex:
    Copy + Eq + Ord + Hash + Debug + Send + Sync + 'static
{
    /// Reserved value that never names an element.
    const SENTINEL: Self;

    /// Largest element count this width can address.
    fn capacity() -> usize;

    /// Convert without checking. Debug builds assert the value fits.
    fn from_usize(v: usize) -> Self;

    /// Convert, or `None` when `v` does not fit below the sentinel.
    fn checked_from_usize(v: usize) -> Option<Self> {
        (v < Self::capacity()).then(|| Self::from_usize(v))
    }

    /// Widen to `usize`.
    fn to_usize(self) -> usize;
}

macro_rules! integer_storage {
    ($($ty:ty),*) => {$(
        impl MeshIndex for $ty {
            const SENTINEL: Self = <$ty>::MAX;

            #[inline]
            fn capacity() -> usize {
                usize::try_from(<$ty>::MAX).unwrap_or(usize::MAX)
            }

            #[inline]
            fn from_usize(v: usize) -> Self {
                debug_assert!(v < Self::capacity(), "{} overflows {}", v, stringify!($ty));
                v as $ty
            }

            #[inline]
            fn to_usize(self) -> usize {
                self as usize
            }
        }
    )*};
}

integer_storage!(u16, u32, u64);

macro_rules! element_handles {
    ($($(#[$meta:meta])* $name:ident => $tag:literal;)*) => {$(
        $(#[$meta])*
        #[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
        #[repr(transparent)]
        pub struct $name<I: MeshIndex = u32>(I);

        impl<I: MeshIndex> $name<I> {
            /// Handle for position `index` in the element array.
            #[inline]
            pub fn new(index: usize) -> Self {
                Self(I::from_usize(index))
            }

            /// The placeholder handle that names no element.
            #[inline]
            pub fn invalid() -> Self {
                Self(I::SENTINEL)
            }

            /// Position in the element array.
            #[inline]
            pub fn index(self) -> usize {
                self.0.to_usize()
            }

            /// The stored integer.
            #[inline]
            pub fn raw(self) -> I {
                self.0
            }

            /// `false` only for the placeholder handle.
            #[inline]
            pub fn is_valid(self) -> bool {
                self.0 != I::SENTINEL
            }
        }

        impl<I: MeshIndex> Debug for $name<I> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                match self.is_valid() {
                    true => write!(f, concat!($tag, "{}"), self.index()),
                    false => f.write_str(concat!($tag, "-")),
                }
            }
        }

        impl<I: MeshIndex> Default for $name<I> {
            fn default() -> Self {
                Self::invalid()
            }
        }
    )*};
}

element_handles! {
    /// Handle to a vertex.
    VertexId => "v";
    /// Handle to an undirected edge.
    EdgeId => "e";
    /// Handle to a face.
    FaceId => "f";
    /// Handle to a loop, one corner of one face.
    LoopId => "l";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_round_trip() {
        let v: VertexId = VertexId::new(42);
        assert_eq!(v.index(), 42);
        assert!(v.is_valid());
        assert!(!VertexId::<u32>::default().is_valid());
    }

    #[test]
    fn test_narrow_storage() {
        let l: LoopId<u16> = LoopId::new(1000);
        assert_eq!(l.raw(), 1000u16);
        assert_eq!(u16::checked_from_usize(65_534), Some(65_534));
        assert_eq!(u16::checked_from_usize(65_535), None);
    }

    #[test]
    fn test_faces_sort_by_position() {
        let a: FaceId = FaceId::new(3);
        let b: FaceId = FaceId::new(7);
        assert!(a < b);
    }

    #[test]
    fn test_debug_tags() {
        assert_eq!(format!("{:?}", EdgeId::<u32>::new(5)), "e5");
        assert_eq!(format!("{:?}", LoopId::<u32>::invalid()), "l-");
    }
}
