use super::{GridRegion, KdLeaf, KdNode, LeafId, NodeIndex};
use crate::bounding_volume::Aabb;
use crate::grid::{CellRange, GridDescriptor};
use crate::math::Real;
use smallvec::SmallVec;

pub(super) const TRAVERSAL_STACK_SIZE: usize = 32;

/// A k-d tree partitioning the domain of an AMR hierarchy into disjoint leaves.
///
/// Every leaf owns the visible part of at most one refinement level of the hierarchy: where
/// grids of several levels overlap, the finest one hides the others. The volumes of the
/// leaves partition the volume of the root exactly; parts of the domain covered by no grid
/// are owned by empty leaves.
///
/// The tree is immutable once built. It is created by a [`KdTreeBuilder`](super::KdTreeBuilder)
/// from the grids listed by a [`GridAdapter`](crate::grid::GridAdapter), and rebuilt from
/// scratch whenever the hierarchy changes.
///
/// With the `serde-serialize` feature, a tree is serialized as its [`KdTreeSnapshot`](super::KdTreeSnapshot)
/// and deserializing it goes through [`KdTree::from_snapshot`], so malformed data is rejected.
///
/// # Example
///
/// ```rust
/// # #[cfg(feature = "dim3")] {
/// use amrkd3d::bounding_volume::Aabb;
/// use amrkd3d::grid::{GridDescriptor, GridId};
/// use amrkd3d::partitioning::KdTree;
/// use nalgebra::{Point3, Vector3};
///
/// let coarse = GridDescriptor::new(
///     GridId(0),
///     Aabb::new(Point3::origin(), Point3::new(4.0, 4.0, 4.0)),
///     0,
///     Vector3::repeat(1.0),
/// );
/// let fine = GridDescriptor::new(
///     GridId(1),
///     Aabb::new(Point3::origin(), Point3::new(2.0, 2.0, 2.0)),
///     1,
///     Vector3::repeat(0.5),
/// )
/// .with_parent(GridId(0));
///
/// let tree = KdTree::new(&vec![coarse, fine]).unwrap();
///
/// // The fine grid hides the part of the coarse grid it covers.
/// let leaf = tree.point_lookup(&Point3::new(1.0, 1.0, 1.0)).unwrap();
/// assert_eq!(leaf.regions.len(), 1);
/// assert_eq!(leaf.regions[0].grid, GridId(1));
/// assert_eq!(tree.total_volume(), 64.0);
/// # }
/// ```
#[cfg_attr(
    feature = "serde-serialize",
    derive(Serialize, Deserialize),
    serde(try_from = "super::KdTreeSnapshot", into = "super::KdTreeSnapshot")
)]
#[derive(Clone, Debug, PartialEq)]
pub struct KdTree {
    pub(super) nodes: Vec<KdNode>,
    pub(super) grids: Vec<GridDescriptor>,
    pub(super) leaf_nodes: Vec<NodeIndex>,
}

impl KdTree {
    /// Creates a tree from its node arena, numbering its leaves.
    ///
    /// The arena must be laid out in depth-first pre-order with left children visited first,
    /// so that the arena order of the leaves is their in-order sequence.
    pub(super) fn from_nodes(mut nodes: Vec<KdNode>, grids: Vec<GridDescriptor>) -> Self {
        let mut leaf_nodes = Vec::new();

        for (i, node) in nodes.iter_mut().enumerate() {
            if let KdNode::Leaf(leaf) = node {
                leaf.id = LeafId::new(leaf_nodes.len());
                leaf_nodes.push(NodeIndex::new(i));
            }
        }

        Self {
            nodes,
            grids,
            leaf_nodes,
        }
    }

    /// The node at the root of this tree.
    #[inline]
    pub fn root(&self) -> &KdNode {
        &self.nodes[0]
    }

    /// The volume covered by this tree.
    #[inline]
    pub fn root_volume(&self) -> &Aabb {
        self.root().volume()
    }

    /// The node at the given index.
    #[inline]
    pub fn node(&self, index: NodeIndex) -> Option<&KdNode> {
        self.nodes.get(index.index())
    }

    /// All the nodes of this tree, with the root first.
    #[inline]
    pub fn nodes(&self) -> &[KdNode] {
        &self.nodes
    }

    /// The table of grids this tree was built from.
    ///
    /// [`GridRegion::grid_index`] indexes this table.
    #[inline]
    pub fn grids(&self) -> &[GridDescriptor] {
        &self.grids
    }

    /// The descriptor of the grid a region belongs to.
    #[inline]
    pub fn grid_of(&self, region: &GridRegion) -> &GridDescriptor {
        &self.grids[region.grid_index as usize]
    }

    /// The number of leaves of this tree.
    #[inline]
    pub fn leaf_count(&self) -> usize {
        self.leaf_nodes.len()
    }

    /// The leaf with the given identifier.
    #[inline]
    pub fn leaf(&self, id: LeafId) -> Option<&KdLeaf> {
        let node = self.leaf_nodes.get(id.index())?;
        self.nodes[node.index()].as_leaf()
    }

    /// The index of the node holding the leaf with the given identifier.
    #[inline]
    pub fn leaf_node(&self, id: LeafId) -> Option<NodeIndex> {
        self.leaf_nodes.get(id.index()).copied()
    }

    /// Iterates through all the leaves of this tree, in their in-order sequence.
    ///
    /// The leaf identifiers yielded are `0, 1, 2, …`.
    pub fn leaves(&self) -> impl ExactSizeIterator<Item = &KdLeaf> + '_ {
        self.leaf_nodes
            .iter()
            .map(move |id| match &self.nodes[id.index()] {
                KdNode::Leaf(leaf) => leaf,
                KdNode::Internal { .. } => unreachable!("the leaf index points to a leaf"),
            })
    }

    /// The depth of this tree: the number of edges on the longest path from the root to a leaf.
    pub fn depth(&self) -> usize {
        let mut stack: SmallVec<[(NodeIndex, usize); TRAVERSAL_STACK_SIZE]> = SmallVec::new();
        let mut depth = 0;
        stack.push((NodeIndex::ROOT, 0));

        while let Some((id, node_depth)) = stack.pop() {
            depth = depth.max(node_depth);

            if let KdNode::Internal { left, right, .. } = &self.nodes[id.index()] {
                stack.push((*left, node_depth + 1));
                stack.push((*right, node_depth + 1));
            }
        }

        depth
    }

    /// For each region of a leaf, the range of cells of its grid the region owns.
    ///
    /// This is what a consumer hands to the mesh to access the field data of a leaf.
    pub fn leaf_cell_ranges(
        &self,
        id: LeafId,
    ) -> impl Iterator<Item = (&GridRegion, CellRange)> + '_ {
        self.leaf(id)
            .into_iter()
            .flat_map(|leaf| leaf.regions.iter())
            .map(move |region| (region, self.grid_of(region).cell_range(&region.volume)))
    }

    /// The sum of the volumes of all the leaves.
    ///
    /// This matches the volume of the root up to rounding errors.
    pub fn total_volume(&self) -> Real {
        self.leaves().map(|leaf| leaf.volume.volume()).sum()
    }

    /// The sum of the costs of all the leaves.
    pub fn total_cost(&self) -> Real {
        self.leaves().map(|leaf| leaf.cost).sum()
    }

    /// The number of cells owned by all the leaves.
    pub fn total_cells(&self) -> usize {
        (0..self.leaf_count())
            .flat_map(|i| self.leaf_cell_ranges(LeafId::new(i)))
            .map(|(_, range)| range.count())
            .sum()
    }
}
