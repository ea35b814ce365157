//! The embedder-facing point store and the dataset seam used by
//! [`build_locator`][crate::octree::IncrementalOctreeLocator::build_locator].

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use bytemuck::cast_slice;

use crate::r#type::{CoordNum, CoordType};

/// Source of modification stamps. Stamps are comparable monotonic tokens:
/// a larger stamp was taken later.
static NEXT_STAMP: AtomicU64 = AtomicU64::new(1);

pub(crate) fn next_stamp() -> u64 {
    NEXT_STAMP.fetch_add(1, Ordering::Relaxed)
}

/// An append-only array of 3D coordinates of uniform element type.
///
/// Indices into this array are the point ids handed out by the locator.
/// Coordinates are never reordered or mutated once appended, so an id stays
/// valid for the lifetime of the array.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointArray<N: CoordNum> {
    coords: Vec<[N; 3]>,
}

impl<N: CoordNum> PointArray<N> {
    pub fn new() -> Self {
        Self { coords: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            coords: Vec::with_capacity(capacity),
        }
    }

    /// The number of coordinates stored. This is the store length, not the
    /// locator's point count: tolerance-merged insertions grow the locator
    /// count without appending here.
    pub fn num_points(&self) -> usize {
        self.coords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }

    /// Coordinate at `id`.
    ///
    /// Panics when `id` is out of bounds, like any slice access.
    #[inline]
    pub fn get_point(&self, id: u32) -> [N; 3] {
        self.coords[id as usize]
    }

    /// Append a coordinate and return its id.
    #[inline]
    pub fn insert_next_point(&mut self, point: [N; 3]) -> u32 {
        let id = self.coords.len();
        self.coords.push(point);
        id.try_into().unwrap()
    }

    /// Flat `[x0, y0, z0, x1, y1, z1, ..]` view of the coordinate buffer.
    pub fn coords(&self) -> &[N] {
        cast_slice(&self.coords)
    }

    /// Element type of this array.
    pub fn coord_type(&self) -> CoordType {
        N::COORD_TYPE
    }

    /// Tight bounding box over all stored coordinates in
    /// `[xmin, xmax, ymin, ymax, zmin, zmax]` layout, or `None` when empty.
    pub fn bounds(&self) -> Option<[N; 6]> {
        if self.coords.is_empty() {
            return None;
        }

        let mut bounds = [
            N::infinity(),
            N::neg_infinity(),
            N::infinity(),
            N::neg_infinity(),
            N::infinity(),
            N::neg_infinity(),
        ];
        for point in &self.coords {
            for axis in 0..3 {
                bounds[axis << 1] = bounds[axis << 1].min(point[axis]);
                bounds[(axis << 1) + 1] = bounds[(axis << 1) + 1].max(point[axis]);
            }
        }
        Some(bounds)
    }

    /// Wrap this array in the shared handle the locator retains.
    pub fn into_shared(self) -> SharedPoints<N> {
        Rc::new(RefCell::new(self))
    }
}

/// Shared handle to a [`PointArray`].
///
/// The locator appends through this handle during unchecked and unique
/// insertion while the embedder keeps read access between operations. The
/// locator is single-threaded and is the only mutator while an insertion is
/// in flight.
pub type SharedPoints<N> = Rc<RefCell<PointArray<N>>>;

/// Input dataset seam for
/// [`build_locator`][crate::octree::IncrementalOctreeLocator::build_locator].
///
/// Only datasets that expose a point array are accepted; everything else is
/// rejected with [`NotAPointSet`][crate::OctreeIndexError::NotAPointSet].
pub trait PointDataSet<N: CoordNum> {
    /// The point array backing this dataset, when the dataset is a point set.
    fn points(&self) -> Option<SharedPoints<N>>;

    /// Stamp taken at the last mutation of the dataset, used to decide
    /// whether a locator rebuild is necessary.
    fn mod_stamp(&self) -> u64;
}

/// A plain set of unconnected 3D points.
#[derive(Debug, Clone)]
pub struct PointSet<N: CoordNum> {
    points: SharedPoints<N>,
    mod_stamp: u64,
}

impl<N: CoordNum> PointSet<N> {
    pub fn new(points: SharedPoints<N>) -> Self {
        Self {
            points,
            mod_stamp: next_stamp(),
        }
    }

    /// Record that the underlying points changed so the next
    /// `build_locator` call rebuilds instead of short-circuiting.
    pub fn mark_modified(&mut self) {
        self.mod_stamp = next_stamp();
    }
}

impl<N: CoordNum> PointDataSet<N> for PointSet<N> {
    fn points(&self) -> Option<SharedPoints<N>> {
        Some(self.points.clone())
    }

    fn mod_stamp(&self) -> u64 {
        self.mod_stamp
    }
}
