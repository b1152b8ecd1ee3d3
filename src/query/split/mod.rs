//! Splitting of volumes by axis-aligned planes.

pub use self::split::SplitResult;

mod split;
mod split_aabb;
