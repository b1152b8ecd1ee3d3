use super::kdtree::TRAVERSAL_STACK_SIZE;
use super::{KdLeaf, KdNode, KdTree, NodeIndex};
use crate::math::{Point, Real, Vector, DIM};
use smallvec::SmallVec;

/// The order in which an ordered walk visits the leaves, relative to the viewer.
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
#[derive(Default, Copy, Clone, Debug, PartialEq, Eq)]
pub enum WalkOrder {
    /// The leaves closest to the viewer are visited first.
    #[default]
    FrontToBack,
    /// The leaves farthest from the viewer are visited first, as needed for back-to-front
    /// compositing.
    BackToFront,
}

/// Where the leaves are seen from.
#[derive(Copy, Clone, Debug, PartialEq)]
enum Viewer {
    /// An orthographic viewer looking along the given direction.
    Direction(Vector<Real>),
    /// A perspective viewer located at the given point.
    Point(Point<Real>),
}

impl Viewer {
    /// Is the left child of a node split along `axis` at `split` the one closest to the viewer?
    fn left_is_near(&self, axis: usize, split: Real) -> bool {
        match self {
            Viewer::Direction(dir) => {
                let component = dir[axis];

                if component != 0.0 {
                    component > 0.0
                } else {
                    // Deferring to a fixed component keeps `-dir` the exact reverse of `dir`.
                    (0..DIM)
                        .map(|i| dir[i])
                        .find(|c| *c != 0.0)
                        .map(|c| c > 0.0)
                        .unwrap_or(true)
                }
            }
            Viewer::Point(point) => point[axis] < split,
        }
    }
}

/// A lazy iterator through the leaves of a [`KdTree`], sorted by distance to a viewer.
///
/// Created by [`KdTree::ordered_walk`] and [`KdTree::ordered_walk_from`].
pub struct OrderedLeaves<'a> {
    tree: &'a KdTree,
    viewer: Viewer,
    order: WalkOrder,
    stack: SmallVec<[NodeIndex; TRAVERSAL_STACK_SIZE]>,
}

impl<'a> OrderedLeaves<'a> {
    fn new(tree: &'a KdTree, viewer: Viewer, order: WalkOrder) -> Self {
        let mut stack = SmallVec::new();
        stack.push(NodeIndex::ROOT);

        Self {
            tree,
            viewer,
            order,
            stack,
        }
    }
}

impl<'a> Iterator for OrderedLeaves<'a> {
    type Item = &'a KdLeaf;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let id = self.stack.pop()?;

            match &self.tree.nodes[id.index()] {
                KdNode::Leaf(leaf) => return Some(leaf),
                KdNode::Internal {
                    axis,
                    split,
                    left,
                    right,
                    ..
                } => {
                    let (near, far) = if self.viewer.left_is_near(*axis as usize, *split) {
                        (*left, *right)
                    } else {
                        (*right, *left)
                    };

                    // The node pushed last is visited first.
                    match self.order {
                        WalkOrder::FrontToBack => {
                            self.stack.push(far);
                            self.stack.push(near);
                        }
                        WalkOrder::BackToFront => {
                            self.stack.push(near);
                            self.stack.push(far);
                        }
                    }
                }
            }
        }
    }
}

impl KdTree {
    /// Iterates through the leaves sorted by distance to an orthographic viewer looking along
    /// `view_dir`.
    ///
    /// At each internal node, the child on the side the viewer looks from is the near child:
    /// the left child if `view_dir` points toward increasing coordinates along the split axis.
    /// The near subtree is walked entirely before the far one with
    /// [`WalkOrder::FrontToBack`], and after it with [`WalkOrder::BackToFront`]. A viewer
    /// looking parallel to a split plane sees both sides at the same distance; the tie is
    /// broken consistently so that walking along `-view_dir` yields the exact reverse sequence.
    ///
    /// A zero `view_dir` yields the in-order leaf sequence (reversed for
    /// [`WalkOrder::BackToFront`]).
    ///
    /// # Example
    ///
    /// ```rust
    /// # #[cfg(feature = "dim3")] {
    /// use amrkd3d::bounding_volume::Aabb;
    /// use amrkd3d::grid::{GridDescriptor, GridId};
    /// use amrkd3d::partitioning::{KdTree, WalkOrder};
    /// use nalgebra::{Point3, Vector3};
    ///
    /// let grids: Vec<_> = (0..3)
    ///     .map(|i| {
    ///         let mins = Point3::new(i as f64, 0.0, 0.0);
    ///         let bounds = Aabb::new(mins, mins + Vector3::repeat(1.0));
    ///         GridDescriptor::new(GridId(i), bounds, 0, Vector3::repeat(1.0))
    ///     })
    ///     .collect();
    /// let tree = KdTree::new(&grids).unwrap();
    ///
    /// let xs: Vec<_> = tree
    ///     .ordered_walk(-Vector3::x(), WalkOrder::FrontToBack)
    ///     .map(|leaf| leaf.volume.mins.x)
    ///     .collect();
    /// assert_eq!(xs, vec![2.0, 1.0, 0.0]);
    /// # }
    /// ```
    pub fn ordered_walk(&self, view_dir: Vector<Real>, order: WalkOrder) -> OrderedLeaves<'_> {
        OrderedLeaves::new(self, Viewer::Direction(view_dir), order)
    }

    /// Iterates through the leaves sorted by distance to a perspective viewer located at
    /// `viewpoint`.
    ///
    /// At each internal node, the near child is the one on the same side of the split plane
    /// as `viewpoint` (a viewpoint lying on the plane is on its right side).
    pub fn ordered_walk_from(&self, viewpoint: Point<Real>, order: WalkOrder) -> OrderedLeaves<'_> {
        OrderedLeaves::new(self, Viewer::Point(viewpoint), order)
    }

    /// Finds the leaf containing the given point.
    ///
    /// Leaves are half-open along split planes: a point lying on a split plane belongs to the
    /// right child. Returns `None` if the point lies outside of the root volume.
    pub fn point_lookup(&self, point: &Point<Real>) -> Option<&KdLeaf> {
        if !self.root_volume().contains_local_point(point) {
            return None;
        }

        let mut id = NodeIndex::ROOT;

        loop {
            match &self.nodes[id.index()] {
                KdNode::Leaf(leaf) => return Some(leaf),
                KdNode::Internal {
                    axis,
                    split,
                    left,
                    right,
                    ..
                } => {
                    id = if point[*axis as usize] < *split {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }
}
