//! Interface to the block-structured mesh hierarchy the tree is built from.
//!
//! The mesh itself lives outside of this crate. The tree only needs, for every grid of the
//! hierarchy, the metadata gathered in a [`GridDescriptor`]: its bounds, its refinement level,
//! its cell size and a cost estimate. A data source exposes its grids by implementing
//! [`GridAdapter`].

use crate::bounding_volume::Aabb;
use crate::math::{Real, Vector, DIM};
use core::fmt;

/// Tolerance, in cell units, used to decide whether a coordinate lies on the cell lattice of a
/// grid.
pub const LATTICE_EPSILON: Real = 1.0e-6;

/// The identifier of a grid, as assigned by the external mesh hierarchy.
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GridId(pub u64);

impl fmt::Display for GridId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Reason why a [`GridDescriptor`] cannot be used to build a tree.
#[derive(thiserror::Error, Debug, Copy, Clone, PartialEq)]
pub enum GridDefect {
    /// The cell size is zero, negative or not finite along the given axis.
    #[error("the cell size along axis {axis} is not a positive finite number")]
    InvalidCellSize {
        /// The faulty axis.
        axis: usize,
    },
    /// The grid bounds are inverted or not finite.
    #[error("the grid bounds are inverted or not finite")]
    InvalidBounds,
    /// The grid cost is negative or not finite.
    #[error("the grid cost {0} is negative or not finite")]
    InvalidCost(Real),
}

/// A range of cell indices `[lo, hi)` inside of a grid.
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct CellRange {
    /// The index of the first cell along each axis.
    pub lo: [usize; DIM],
    /// One past the index of the last cell along each axis.
    pub hi: [usize; DIM],
}

impl CellRange {
    /// The number of cells along each axis.
    #[inline]
    pub fn dims(&self) -> [usize; DIM] {
        let mut dims = [0; DIM];
        for i in 0..DIM {
            dims[i] = self.hi[i].saturating_sub(self.lo[i]);
        }
        dims
    }

    /// The total number of cells in this range.
    #[inline]
    pub fn count(&self) -> usize {
        self.dims().iter().product()
    }

    /// Is this range empty?
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }
}

/// The metadata of one grid of an AMR hierarchy.
///
/// A grid is a block of cells of identical size `cell_size` covering `bounds`. Cells are the
/// atomic unit of the mesh: the tree never cuts through a cell, so every split coordinate lies
/// on the cell lattice of the grids it goes through.
///
/// # Example
///
/// ```rust
/// # #[cfg(feature = "dim3")] {
/// use amrkd3d::bounding_volume::Aabb;
/// use amrkd3d::grid::{GridDescriptor, GridId};
/// use nalgebra::{Point3, Vector3};
///
/// let bounds = Aabb::new(Point3::origin(), Point3::new(1.0, 1.0, 2.0));
/// let grid = GridDescriptor::new(GridId(0), bounds, 0, Vector3::repeat(0.25));
///
/// assert_eq!(grid.cell_dims(), [4, 4, 8]);
/// assert_eq!(grid.cost, 128.0);
/// assert!(grid.is_on_lattice(2, 1.5));
/// assert!(!grid.is_on_lattice(2, 1.6));
/// # }
/// ```
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct GridDescriptor {
    /// The identifier of this grid.
    pub id: GridId,
    /// The region of space covered by this grid.
    pub bounds: Aabb,
    /// The refinement level of this grid. Level 0 is the coarsest.
    pub level: u32,
    /// The grid this one refines, if any.
    pub parent: Option<GridId>,
    /// The size of a cell of this grid along each axis.
    pub cell_size: Vector<Real>,
    /// The cost of processing the whole grid.
    pub cost: Real,
}

impl GridDescriptor {
    /// Creates the descriptor of a grid without parent.
    ///
    /// The cost of the grid is its number of cells.
    pub fn new(id: GridId, bounds: Aabb, level: u32, cell_size: Vector<Real>) -> Self {
        let mut result = Self {
            id,
            bounds,
            level,
            parent: None,
            cell_size,
            cost: 0.0,
        };
        result.cost = result.cell_count() as Real;
        result
    }

    /// Sets the grid this one refines.
    pub fn with_parent(mut self, parent: GridId) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Overrides the cost of this grid.
    pub fn with_cost(mut self, cost: Real) -> Self {
        self.cost = cost;
        self
    }

    /// The number of cells of this grid along each axis.
    pub fn cell_dims(&self) -> [usize; DIM] {
        let extents = self.bounds.extents();
        let mut dims = [0; DIM];
        for i in 0..DIM {
            dims[i] = (extents[i] / self.cell_size[i]).round().max(0.0) as usize;
        }
        dims
    }

    /// The total number of cells of this grid.
    pub fn cell_count(&self) -> usize {
        self.cell_dims().iter().product()
    }

    /// Does the plane orthogonal to `axis` at `coordinate` pass along cell boundaries of this
    /// grid?
    pub fn is_on_lattice(&self, axis: usize, coordinate: Real) -> bool {
        let cells = (coordinate - self.bounds.mins[axis]) / self.cell_size[axis];
        relative_eq!(cells, cells.round(), epsilon = LATTICE_EPSILON)
    }

    /// The range of cells of this grid covered by `volume`.
    ///
    /// The bounds of `volume` are rounded to the nearest cell boundaries, and clamped to the
    /// grid.
    pub fn cell_range(&self, volume: &Aabb) -> CellRange {
        let dims = self.cell_dims();
        let mut lo = [0; DIM];
        let mut hi = [0; DIM];

        for i in 0..DIM {
            let to_cell = |x: Real| {
                let cells = ((x - self.bounds.mins[i]) / self.cell_size[i]).round();
                (cells.max(0.0) as usize).min(dims[i])
            };
            lo[i] = to_cell(volume.mins[i]);
            hi[i] = to_cell(volume.maxs[i]).max(lo[i]);
        }

        CellRange { lo, hi }
    }

    /// The cost of the part of this grid covered by `volume`.
    ///
    /// This is the cost of the grid scaled by the covered fraction of its volume.
    pub fn cost_of(&self, volume: &Aabb) -> Real {
        let total = self.bounds.volume();

        if total > 0.0 {
            self.cost * (self.bounds.intersection_volume(volume) / total)
        } else {
            0.0
        }
    }

    /// Checks that this descriptor can be used to build a tree.
    pub fn validate(&self) -> Result<(), GridDefect> {
        for axis in 0..DIM {
            let size = self.cell_size[axis];
            if !(size > 0.0) || !size.is_finite() {
                return Err(GridDefect::InvalidCellSize { axis });
            }
        }

        let finite = (0..DIM)
            .all(|i| self.bounds.mins[i].is_finite() && self.bounds.maxs[i].is_finite());
        if !finite || !self.bounds.is_valid() {
            return Err(GridDefect::InvalidBounds);
        }

        if !(self.cost >= 0.0) || !self.cost.is_finite() {
            return Err(GridDefect::InvalidCost(self.cost));
        }

        Ok(())
    }
}

/// A source of grids to build a tree from.
///
/// This is the boundary with the mesh hierarchy: implementors list the metadata of every grid
/// of the hierarchy, in any order.
pub trait GridAdapter {
    /// The descriptors of all the grids of the hierarchy.
    fn list_grids(&self) -> Vec<GridDescriptor>;
}

impl GridAdapter for [GridDescriptor] {
    fn list_grids(&self) -> Vec<GridDescriptor> {
        self.to_vec()
    }
}

impl GridAdapter for Vec<GridDescriptor> {
    fn list_grids(&self) -> Vec<GridDescriptor> {
        self.clone()
    }
}

impl<T: GridAdapter + ?Sized> GridAdapter for &T {
    fn list_grids(&self) -> Vec<GridDescriptor> {
        (**self).list_grids()
    }
}

/// The set of workers the leaves of a tree are distributed to.
pub trait ProcessTopology {
    /// The number of available workers.
    fn worker_count(&self) -> usize;
}

impl ProcessTopology for usize {
    fn worker_count(&self) -> usize {
        *self
    }
}

#[cfg(test)]
mod test {
    use super::{GridDefect, GridDescriptor, GridId};
    use crate::bounding_volume::Aabb;
    use crate::math::{Point, Real, Vector, DIM};

    fn grid(size: Real, cell: Real) -> GridDescriptor {
        let bounds = Aabb::new(Point::origin(), Point::from(Vector::repeat(size)));
        GridDescriptor::new(GridId(7), bounds, 1, Vector::repeat(cell))
    }

    #[test]
    fn cost_defaults_to_cell_count() {
        let grid = grid(2.0, 0.5);
        assert_eq!(grid.cell_dims(), [4; DIM]);
        assert_eq!(grid.cost, 4usize.pow(DIM as u32) as Real);
        assert_eq!(grid.clone().with_cost(3.0).cost, 3.0);
    }

    #[test]
    fn cell_range_of_a_sub_volume() {
        let grid = grid(2.0, 0.5);
        let sub = Aabb::new(Point::from(Vector::repeat(0.5)), Point::from(Vector::repeat(1.5)));
        let range = grid.cell_range(&sub);
        assert_eq!(range.lo, [1; DIM]);
        assert_eq!(range.hi, [3; DIM]);
        assert_eq!(range.count(), 2usize.pow(DIM as u32));
        assert_relative_eq!(grid.cost_of(&sub), range.count() as Real);
    }

    #[test]
    fn lattice_membership() {
        let grid = grid(1.0, 0.1);
        assert!(grid.is_on_lattice(0, 0.3));
        assert!(grid.is_on_lattice(0, 0.7));
        assert!(!grid.is_on_lattice(0, 0.35));
    }

    #[test]
    fn invalid_descriptors_are_rejected() {
        let mut bad = grid(1.0, 0.1);
        bad.cell_size[DIM - 1] = 0.0;
        assert_eq!(bad.validate(), Err(GridDefect::InvalidCellSize { axis: DIM - 1 }));

        let bad = grid(1.0, 0.1).with_cost(-1.0);
        assert_eq!(bad.validate(), Err(GridDefect::InvalidCost(-1.0)));

        let mut bad = grid(1.0, 0.1);
        bad.bounds.mins[0] = 2.0;
        assert_eq!(bad.validate(), Err(GridDefect::InvalidBounds));

        assert_eq!(grid(1.0, 0.1).validate(), Ok(()));
    }
}
