//! Axis Aligned Bounding Box.

use crate::bounding_volume::BoundingVolume;
use crate::math::{Point, Real, Vector, DIM};

/// An Axis-Aligned Bounding Box (AABB).
///
/// An AABB is the simplest bounding volume, defined by its minimum and maximum corners.
/// It's called "axis-aligned" because its edges are always parallel to the coordinate axes
/// (X, Y, and Z in 3D). Every volume manipulated by the k-d tree is an `Aabb`: the domain, the
/// bounds of the grids, the volume of each tree node and the sub-volume a leaf owns inside a
/// grid.
///
/// # Structure
///
/// - **mins**: The point with the smallest coordinates on each axis (bottom-left-back corner)
/// - **maxs**: The point with the largest coordinates on each axis (top-right-front corner)
/// - **Invariant**: `mins.x ≤ maxs.x`, `mins.y ≤ maxs.y` (and `mins.z ≤ maxs.z` in 3D)
///
/// The box is a pure value type: operations like [`Aabb::split`] or [`Aabb::intersection`]
/// return new boxes and never modify `self`.
///
/// # Example
///
/// ```rust
/// # #[cfg(feature = "dim3")] {
/// use amrkd3d::bounding_volume::Aabb;
/// use nalgebra::Point3;
///
/// let domain = Aabb::new(Point3::new(0.0, 0.0, 0.0), Point3::new(4.0, 4.0, 4.0));
///
/// assert!(domain.contains_local_point(&Point3::new(1.0, 2.0, 3.0)));
/// assert_eq!(domain.volume(), 64.0);
///
/// let (left, right) = domain.split(0, 1.0).unwrap();
/// assert_eq!(left.maxs.x, 1.0);
/// assert_eq!(right.mins.x, 1.0);
/// assert_eq!(left.volume() + right.volume(), domain.volume());
/// # }
/// ```
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
#[derive(Debug, PartialEq, Copy, Clone)]
#[repr(C)]
pub struct Aabb {
    /// The point with minimum coordinates (bottom-left-back corner).
    ///
    /// Each component should be less than or equal to the corresponding component in `maxs`.
    pub mins: Point<Real>,

    /// The point with maximum coordinates (top-right-front corner).
    ///
    /// Each component should be greater than or equal to the corresponding component in `mins`.
    pub maxs: Point<Real>,
}

/// Error returned by [`Aabb::split`] when the requested splitting plane does not cut the box
/// into two non-empty halves.
#[derive(thiserror::Error, Debug, Copy, Clone, PartialEq)]
pub enum InvalidSplit {
    /// The split axis is not smaller than the dimension of the space.
    #[error("split axis {axis} is out of range")]
    AxisOutOfRange {
        /// The requested axis.
        axis: usize,
    },
    /// The split coordinate does not lie strictly between the box bounds along the split axis.
    #[error("split coordinate {coordinate} does not lie strictly inside ]{min}, {max}[")]
    CoordinateOutOfRange {
        /// The requested coordinate.
        coordinate: Real,
        /// The lower bound of the box along the split axis.
        min: Real,
        /// The upper bound of the box along the split axis.
        max: Real,
    },
}

impl Aabb {
    /// Creates a new AABB from its minimum and maximum corners.
    ///
    /// # Invariant
    ///
    /// Each component of `mins` should be ≤ the corresponding component of `maxs`.
    #[inline]
    pub fn new(mins: Point<Real>, maxs: Point<Real>) -> Aabb {
        Aabb { mins, maxs }
    }

    /// Returns the center point of this AABB.
    #[inline]
    pub fn center(&self) -> Point<Real> {
        na::center(&self.mins, &self.maxs)
    }

    /// The extents of this `Aabb`.
    #[inline]
    pub fn extents(&self) -> Vector<Real> {
        self.maxs - self.mins
    }

    /// Returns the volume of this AABB.
    ///
    /// - **2D**: Returns the area (width × height)
    /// - **3D**: Returns the volume (width × height × depth)
    #[inline]
    pub fn volume(&self) -> Real {
        let extents = self.extents();
        #[cfg(feature = "dim2")]
        return extents.x * extents.y;
        #[cfg(feature = "dim3")]
        return extents.x * extents.y * extents.z;
    }

    /// Is this AABB valid, i.e., are its `mins` smaller or equal to its `maxs` on every axis?
    ///
    /// NaN bounds make the AABB invalid.
    #[inline]
    pub fn is_valid(&self) -> bool {
        (0..DIM).all(|i| self.mins[i] <= self.maxs[i])
    }

    /// Does this AABB have a zero extent along at least one axis?
    ///
    /// Returns the first such axis.
    #[inline]
    pub fn degenerate_axis(&self) -> Option<usize> {
        (0..DIM).find(|&i| !(self.maxs[i] > self.mins[i]))
    }

    /// Does this AABB have a zero extent along at least one axis?
    #[inline]
    pub fn is_degenerate(&self) -> bool {
        self.degenerate_axis().is_some()
    }

    /// Does this AABB contains a point expressed in the same coordinate frame as `self`?
    ///
    /// The AABB is closed: points lying on its boundary are contained. Points with a NaN
    /// coordinate are never contained.
    #[inline]
    pub fn contains_local_point(&self, point: &Point<Real>) -> bool {
        for i in 0..DIM {
            if !(point[i] >= self.mins[i] && point[i] <= self.maxs[i]) {
                return false;
            }
        }

        true
    }

    /// Computes the intersection of this `Aabb` and another one.
    ///
    /// Returns `None` if they are disjoint. Boxes that only touch along a face produce a
    /// degenerate intersection with a zero volume.
    pub fn intersection(&self, other: &Aabb) -> Option<Aabb> {
        let result = Aabb {
            mins: Point::from(self.mins.coords.sup(&other.mins.coords)),
            maxs: Point::from(self.maxs.coords.inf(&other.maxs.coords)),
        };

        for i in 0..DIM {
            if result.mins[i] > result.maxs[i] {
                return None;
            }
        }

        Some(result)
    }

    /// The volume of the intersection of `self` and `other`, zero if they are disjoint or only
    /// touch along a face.
    #[inline]
    pub fn intersection_volume(&self, other: &Aabb) -> Real {
        self.intersection(other).map(|inter| inter.volume()).unwrap_or(0.0)
    }

    /// Splits this AABB in two along the plane orthogonal to `axis` passing through
    /// `coordinate`.
    ///
    /// The first box returned is the piece with coordinates smaller than `coordinate` along
    /// `axis`, the second is the other piece. Both pieces are disjoint (they only share the
    /// splitting face) and their union is `self`.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidSplit`] if `axis` is not a valid axis, or if `coordinate` does not lie
    /// strictly between `self.mins[axis]` and `self.maxs[axis]`.
    pub fn split(&self, axis: usize, coordinate: Real) -> Result<(Aabb, Aabb), InvalidSplit> {
        if axis >= DIM {
            return Err(InvalidSplit::AxisOutOfRange { axis });
        }

        let (min, max) = (self.mins[axis], self.maxs[axis]);

        // NOTE: written so that a NaN coordinate is rejected too.
        if !(coordinate > min && coordinate < max) {
            return Err(InvalidSplit::CoordinateOutOfRange {
                coordinate,
                min,
                max,
            });
        }

        let mut left = *self;
        let mut right = *self;
        left.maxs[axis] = coordinate;
        right.mins[axis] = coordinate;
        Ok((left, right))
    }
}

impl BoundingVolume for Aabb {
    #[inline]
    fn center(&self) -> Point<Real> {
        self.center()
    }

    #[inline]
    fn intersects(&self, other: &Aabb) -> bool {
        na::partial_le(&self.mins, &other.maxs) && na::partial_ge(&self.maxs, &other.mins)
    }

    #[inline]
    fn contains(&self, other: &Aabb) -> bool {
        na::partial_le(&self.mins, &other.mins) && na::partial_ge(&self.maxs, &other.maxs)
    }

    #[inline]
    fn merged(&self, other: &Aabb) -> Aabb {
        Aabb {
            mins: self.mins.inf(&other.mins),
            maxs: self.maxs.sup(&other.maxs),
        }
    }
}

#[cfg(test)]
mod test {
    use super::{Aabb, InvalidSplit};
    use crate::bounding_volume::BoundingVolume;
    use crate::math::{Point, Real, Vector, DIM};

    fn unit_box() -> Aabb {
        Aabb::new(Point::origin(), Point::from(Vector::repeat(1.0)))
    }

    #[test]
    fn split_produces_two_disjoint_halves() {
        let aabb = Aabb::new(Point::origin(), Point::from(Vector::repeat(4.0)));

        for axis in 0..DIM {
            let (left, right) = aabb.split(axis, 1.0).unwrap();
            assert_eq!(left.mins, aabb.mins);
            assert_eq!(right.maxs, aabb.maxs);
            assert_eq!(left.maxs[axis], 1.0);
            assert_eq!(right.mins[axis], 1.0);
            assert_eq!(left.intersection_volume(&right), 0.0);
            assert_relative_eq!(left.volume() + right.volume(), aabb.volume());
            assert_eq!(left.merged(&right), aabb);
        }
    }

    #[test]
    fn split_rejects_coordinates_on_or_outside_the_bounds() {
        let aabb = unit_box();

        for coordinate in [0.0, 1.0, -0.5, 1.5, Real::NAN] {
            match aabb.split(0, coordinate) {
                Err(InvalidSplit::CoordinateOutOfRange { min, max, .. }) => {
                    assert_eq!(min, 0.0);
                    assert_eq!(max, 1.0);
                }
                other => panic!("unexpected split result {:?}", other),
            }
        }

        assert_eq!(
            aabb.split(DIM, 0.5),
            Err(InvalidSplit::AxisOutOfRange { axis: DIM })
        );
    }

    #[test]
    fn touching_boxes_intersect_with_zero_volume() {
        let a = unit_box();
        let mut shift = Vector::zeros();
        shift[0] = 1.0;
        let b = Aabb::new(a.mins + shift, a.maxs + shift);

        assert!(a.intersects(&b));
        assert_eq!(a.intersection_volume(&b), 0.0);

        shift[0] = 2.0;
        let c = Aabb::new(a.mins + shift, a.maxs + shift);
        assert!(!a.intersects(&c));
        assert!(a.intersection(&c).is_none());
    }

    #[test]
    fn nan_points_are_outside() {
        let aabb = unit_box();
        let mut point = aabb.center();
        assert!(aabb.contains_local_point(&point));
        point[0] = Real::NAN;
        assert!(!aabb.contains_local_point(&point));
    }

    #[test]
    fn degenerate_axis_is_reported() {
        let mut aabb = unit_box();
        assert!(!aabb.is_degenerate());
        aabb.maxs[DIM - 1] = aabb.mins[DIM - 1];
        assert_eq!(aabb.degenerate_axis(), Some(DIM - 1));
        assert!(aabb.is_valid());
        aabb.maxs[0] = -1.0;
        assert!(!aabb.is_valid());
    }
}
