use core::mem;

use crate::bounding_volume::Aabb;
use crate::math::{Real, DIM};
use crate::query::Ray;
use num::Zero;

impl Aabb {
    /// Clips a ray against this AABB.
    ///
    /// Returns the parameters `(t_entry, t_exit)` of the part of the ray lying inside of this
    /// box, restricted to `[0, max_toi]`. The entry parameter is zero if the ray origin is
    /// inside of the box. Returns `None` if the ray misses the box, or only hits it after
    /// `max_toi`.
    ///
    /// # Example
    ///
    /// ```rust
    /// # #[cfg(feature = "dim3")] {
    /// use amrkd3d::bounding_volume::Aabb;
    /// use amrkd3d::math::Real;
    /// use amrkd3d::query::Ray;
    /// use nalgebra::{Point3, Vector3};
    ///
    /// let aabb = Aabb::new(Point3::new(1.0, 0.0, 0.0), Point3::new(3.0, 1.0, 1.0));
    /// let ray = Ray::new(Point3::new(0.0, 0.5, 0.5), Vector3::x());
    ///
    /// assert_eq!(aabb.clip_ray(&ray, Real::MAX), Some((1.0, 3.0)));
    /// # }
    /// ```
    pub fn clip_ray(&self, ray: &Ray, max_toi: Real) -> Option<(Real, Real)> {
        let mut tmin: Real = 0.0;
        let mut tmax: Real = max_toi;

        for i in 0usize..DIM {
            if ray.dir[i].is_zero() {
                if ray.origin[i] < self.mins[i] || ray.origin[i] > self.maxs[i] {
                    return None;
                }
            } else {
                let denom = 1.0 / ray.dir[i];
                let mut inter_with_near_halfspace = (self.mins[i] - ray.origin[i]) * denom;
                let mut inter_with_far_halfspace = (self.maxs[i] - ray.origin[i]) * denom;

                if inter_with_near_halfspace > inter_with_far_halfspace {
                    mem::swap(
                        &mut inter_with_near_halfspace,
                        &mut inter_with_far_halfspace,
                    )
                }

                tmin = tmin.max(inter_with_near_halfspace);
                tmax = tmax.min(inter_with_far_halfspace);

                if tmin > tmax {
                    // This covers the case where tmax is negative because tmin is
                    // initialized at zero.
                    return None;
                }
            }
        }

        Some((tmin, tmax))
    }
}
