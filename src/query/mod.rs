//! Non-persistent geometric queries.
//!
//! This module holds the rays consumed by [`KdTree::ray_intersect`], the ray/`Aabb` clipping
//! used to find the entry and exit parameters of a ray inside a volume, and the plane-splitting
//! results used while partitioning grid regions.
//!
//! [`KdTree::ray_intersect`]: crate::partitioning::KdTree::ray_intersect

pub use self::ray::Ray;
pub use self::split::SplitResult;

pub mod ray;
pub mod split;
