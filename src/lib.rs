//! An incremental octree point locator for 3D point sets.
//!
//! Unlike a bulk-loaded spatial index, the octree here is grown one point at
//! a time: insertion and search interleave freely, and near-duplicate points
//! can be merged on the way in under a caller-chosen tolerance. See the
//! [`octree`] module for the locator itself and [`points`] for the backing
//! coordinate store it shares with the embedder.

pub mod error;
pub mod octree;
pub mod points;
pub mod r#type;

pub use error::OctreeIndexError;
pub use octree::{IncrementalOctreeLocator, PolyData};
pub use points::{PointArray, PointDataSet, PointSet, SharedPoints};
pub use r#type::{CoordNum, CoordType};
