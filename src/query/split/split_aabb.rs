use crate::bounding_volume::Aabb;
use crate::math::Real;
use crate::query::SplitResult;

impl Aabb {
    /// Splits this AABB along the given canonical axis.
    ///
    /// This will split the AABB by a plane with a normal with it’s `axis`-th component set to 1.
    /// The splitting plane is shifted wrt. the origin by the `bias` (i.e. it passes through the point
    /// equal to `normal * bias`).
    ///
    /// Unlike [`Aabb::split`], a plane that does not cut through the box is not an error: the
    /// result then tells on which side of the plane the box lies. A box touching the plane with
    /// one of its faces (within `epsilon`) lies on the other side.
    ///
    /// # Result
    /// Returns the result of the split. The first AABB returned is the piece lying on the negative
    /// half-space delimited by the splitting plane. The second AABB returned is the piece lying on the
    /// positive half-space delimited by the splitting plane.
    pub fn canonical_split(&self, axis: usize, bias: Real, epsilon: Real) -> SplitResult<Self> {
        if self.mins[axis] >= bias - epsilon {
            SplitResult::Positive
        } else if self.maxs[axis] <= bias + epsilon {
            SplitResult::Negative
        } else {
            match self.split(axis, bias) {
                Ok((left, right)) => SplitResult::Pair(left, right),
                // Only reachable with a NaN bias.
                Err(_) => SplitResult::Positive,
            }
        }
    }
}

#[cfg(test)]
mod test {
    use crate::bounding_volume::Aabb;
    use crate::math::{Point, Vector};
    use crate::query::SplitResult;

    #[test]
    fn canonical_split_classifies_sides() {
        let aabb = Aabb::new(Point::from(Vector::repeat(1.0)), Point::from(Vector::repeat(2.0)));

        assert_eq!(aabb.canonical_split(0, 1.0, 0.0), SplitResult::Positive);
        assert_eq!(aabb.canonical_split(0, 0.5, 0.0), SplitResult::Positive);
        assert_eq!(aabb.canonical_split(0, 2.0, 0.0), SplitResult::Negative);
        match aabb.canonical_split(0, 1.5, 0.0) {
            SplitResult::Pair(left, right) => {
                assert_eq!(left.maxs[0], 1.5);
                assert_eq!(right.mins[0], 1.5);
            }
            other => panic!("unexpected split result {:?}", other),
        }
    }
}
