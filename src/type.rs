use std::fmt::Debug;

use num_traits::Float;

/// Scalar element type of a point array and of every coordinate handled by
/// the octree.
///
/// Only the two IEEE-754 float widths are supported: the backing store keeps
/// its native precision, and the octree performs all of its distance
/// arithmetic in that same precision.
pub trait CoordNum: Float + Debug + Send + Sync + bytemuck::Pod {
    /// Discriminator matching the element type of the backing point array.
    const COORD_TYPE: CoordType;
    /// The number of bytes per element
    const BYTES_PER_ELEMENT: usize;
}

impl CoordNum for f32 {
    const COORD_TYPE: CoordType = CoordType::Float32;
    const BYTES_PER_ELEMENT: usize = 4;
}

impl CoordNum for f64 {
    const COORD_TYPE: CoordType = CoordType::Float64;
    const BYTES_PER_ELEMENT: usize = 8;
}

/// Element type tag reported by [`PointArray::coord_type`][crate::points::PointArray::coord_type].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordType {
    /// 32-bit float coordinates
    Float32,
    /// 64-bit float coordinates
    Float64,
}

/// Narrow a literal factor to the working scalar type.
#[inline]
pub(crate) fn cast<N: CoordNum>(value: f64) -> N {
    // Converting a finite f64 constant to f32/f64 cannot fail.
    N::from(value).unwrap()
}
