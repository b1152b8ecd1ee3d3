use super::kdtree::TRAVERSAL_STACK_SIZE;
use super::{KdLeaf, KdNode, KdTree, NodeIndex};
use crate::math::Real;
use crate::query::Ray;
use smallvec::SmallVec;

/// A lazy iterator through the leaves of a [`KdTree`] crossed by a ray.
///
/// Created by [`KdTree::ray_intersect`]. Each item is a leaf together with the parameters
/// `(t_entry, t_exit)` of the part of the ray inside of it. Leaves are yielded by increasing
/// entry parameter.
pub struct RayLeaves<'a> {
    tree: &'a KdTree,
    ray: Ray,
    stack: SmallVec<[(NodeIndex, Real, Real); TRAVERSAL_STACK_SIZE]>,
}

impl<'a> Iterator for RayLeaves<'a> {
    type Item = (&'a KdLeaf, Real, Real);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (id, tmin, tmax) = self.stack.pop()?;

            let (axis, split, left, right) = match &self.tree.nodes[id.index()] {
                KdNode::Leaf(leaf) => return Some((leaf, tmin, tmax)),
                KdNode::Internal {
                    axis,
                    split,
                    left,
                    right,
                    ..
                } => (*axis as usize, *split, *left, *right),
            };

            let origin = self.ray.origin[axis];
            let dir = self.ray.dir[axis];

            // The near child is the one containing the ray origin, or the one the ray moves
            // into if the origin lies on the split plane.
            let left_is_near = origin < split || (origin == split && dir < 0.0);
            let (near, far) = if left_is_near {
                (left, right)
            } else {
                (right, left)
            };

            if dir == 0.0 || origin == split {
                self.stack.push((near, tmin, tmax));
                continue;
            }

            let t_split = (split - origin) / dir;

            if t_split < 0.0 || t_split >= tmax {
                // The ray moves away from the plane, or leaves the node before reaching it.
                self.stack.push((near, tmin, tmax));
            } else if t_split <= tmin {
                self.stack.push((far, tmin, tmax));
            } else {
                self.stack.push((far, t_split, tmax));
                self.stack.push((near, tmin, t_split));
            }
        }
    }
}

impl KdTree {
    /// Iterates through the leaves crossed by `ray`, by increasing entry parameter.
    ///
    /// Only the part of the ray with a non-negative parameter is considered. A ray missing the
    /// root volume yields nothing.
    ///
    /// # Example
    ///
    /// ```rust
    /// # #[cfg(feature = "dim3")] {
    /// use amrkd3d::bounding_volume::Aabb;
    /// use amrkd3d::grid::{GridDescriptor, GridId};
    /// use amrkd3d::partitioning::KdTree;
    /// use amrkd3d::query::Ray;
    /// use nalgebra::{Point3, Vector3};
    ///
    /// let grids: Vec<_> = (0..2)
    ///     .map(|i| {
    ///         let mins = Point3::new(i as f64, 0.0, 0.0);
    ///         let bounds = Aabb::new(mins, mins + Vector3::repeat(1.0));
    ///         GridDescriptor::new(GridId(i), bounds, 0, Vector3::repeat(1.0))
    ///     })
    ///     .collect();
    /// let tree = KdTree::new(&grids).unwrap();
    ///
    /// let ray = Ray::new(Point3::new(-1.0, 0.5, 0.5), Vector3::x());
    /// let hits: Vec<_> = tree
    ///     .ray_intersect(&ray)
    ///     .map(|(leaf, t_entry, t_exit)| (leaf.regions[0].grid, t_entry, t_exit))
    ///     .collect();
    /// assert_eq!(hits, vec![(GridId(0), 1.0, 2.0), (GridId(1), 2.0, 3.0)]);
    /// # }
    /// ```
    pub fn ray_intersect(&self, ray: &Ray) -> RayLeaves<'_> {
        self.ray_intersect_with_max_toi(ray, Real::MAX)
    }

    /// Iterates through the leaves crossed by the part of `ray` with a parameter in
    /// `[0, max_toi]`, by increasing entry parameter.
    pub fn ray_intersect_with_max_toi(&self, ray: &Ray, max_toi: Real) -> RayLeaves<'_> {
        let mut stack = SmallVec::new();

        if let Some((tmin, tmax)) = self.root_volume().clip_ray(ray, max_toi) {
            stack.push((NodeIndex::ROOT, tmin, tmax));
        }

        RayLeaves {
            tree: self,
            ray: *ray,
            stack,
        }
    }
}
