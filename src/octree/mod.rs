//! An incremental octree point locator.
//!
//! ## Insertion
//!
//! Use [`IncrementalOctreeLocator::init_point_insertion`] with a bounding
//! box covering everything you will insert, then feed points through
//! [`insert_next_point`][IncrementalOctreeLocator::insert_next_point]
//! (unchecked append), [`insert_point`][IncrementalOctreeLocator::insert_point]
//! (unchecked, id already in the array) or
//! [`insert_unique_point`][IncrementalOctreeLocator::insert_unique_point]
//! (merges points closer than the configured tolerance). To index an
//! existing dataset in one call, use
//! [`build_locator`][IncrementalOctreeLocator::build_locator].
//!
//! ## Search
//!
//! [`find_closest_point`][IncrementalOctreeLocator::find_closest_point],
//! [`find_closest_point_within_radius`][IncrementalOctreeLocator::find_closest_point_within_radius],
//! [`find_closest_n_points`][IncrementalOctreeLocator::find_closest_n_points] and
//! [`find_points_within_radius`][IncrementalOctreeLocator::find_points_within_radius]
//! may be issued at any time between insertions.
//!
//! ## Coordinate types
//!
//! The locator is generic over [`CoordNum`][crate::CoordNum]: the tree, the
//! point array and every query run in the same element type, `f32` or `f64`.
//! Float `NaN` coordinates are not supported and may panic.
//!
//! ## Example
//!
//! ```
//! use octree_index::octree::IncrementalOctreeLocator;
//! use octree_index::points::PointArray;
//!
//! let points = PointArray::<f64>::new().into_shared();
//! let mut locator = IncrementalOctreeLocator::new();
//! locator
//!     .init_point_insertion(points.clone(), &[0., 1., 0., 1., 0., 1.])
//!     .unwrap();
//!
//! let (inserted, id) = locator.insert_unique_point([0.2, 0.4, 0.6]);
//! assert!(inserted);
//!
//! // within the default tolerance: merged with the existing point
//! let (inserted, merged_id) = locator.insert_unique_point([0.2, 0.4, 0.6]);
//! assert!(!inserted);
//! assert_eq!(merged_id, id);
//! assert_eq!(points.borrow().num_points(), 1);
//!
//! assert_eq!(locator.find_closest_point([0.9, 0.9, 0.9]), Some(id));
//! ```

mod locator;
mod node;
mod repr;
mod sort;

pub use locator::{IncrementalOctreeLocator, DEFAULT_MAX_POINTS_PER_LEAF, DEFAULT_TOLERANCE};
pub use node::OctreeNode;
pub use repr::PolyData;

#[cfg(test)]
mod test;
