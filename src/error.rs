use std::fmt::Debug;
use thiserror::Error;

/// Enum with all errors in this crate.
#[derive(Error, Debug)]
pub enum OctreeIndexError {
    #[error("General error: {0}")]
    General(String),

    /// The dataset handed to `build_locator` does not carry a point array.
    #[error("Dataset is not a point set")]
    NotAPointSet,

    /// The point array exceeds what 32-bit point ids can address.
    #[error("Too many points for 32-bit point ids: {0}")]
    TooManyPoints(usize),
}

pub type Result<T> = std::result::Result<T, OctreeIndexError>;
