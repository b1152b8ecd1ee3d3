use crate::bounding_volume::Aabb;
use crate::grid::GridId;
use crate::math::Real;

/// The index of a node in the node arena of a [`KdTree`](super::KdTree).
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct NodeIndex(pub u32);

impl NodeIndex {
    /// The index of the root of every tree.
    pub const ROOT: Self = Self(0);

    #[inline]
    pub(crate) fn new(index: usize) -> Self {
        Self(index as u32)
    }

    /// This index as an `usize`.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// The identifier of a leaf of a [`KdTree`](super::KdTree).
///
/// Leaf identifiers are dense: a tree with `n` leaves identifies them with `0..n`, numbered
/// following the in-order (left before right) leaf sequence.
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct LeafId(pub u32);

impl LeafId {
    #[inline]
    pub(crate) fn new(index: usize) -> Self {
        Self(index as u32)
    }

    /// This identifier as an `usize`.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// The part of a grid owned by a leaf.
///
/// When a grid spans a split plane, each side of the split owns its own region of the grid.
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct GridRegion {
    /// The identifier of the grid.
    pub grid: GridId,
    /// The index of the grid in the grid table of the tree.
    pub grid_index: u32,
    /// The refinement level of the grid.
    pub level: u32,
    /// The sub-volume of the grid owned by this region.
    pub volume: Aabb,
    /// The cost of this region: the grid cost scaled by the owned fraction of the grid volume.
    pub cost: Real,
}

/// A leaf of a [`KdTree`](super::KdTree).
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct KdLeaf {
    /// The identifier of this leaf.
    pub id: LeafId,
    /// The volume covered by this leaf.
    pub volume: Aabb,
    /// The grid regions owned by this leaf.
    ///
    /// This is empty if no grid covers `volume`. It contains a single region covering `volume`
    /// whenever the grids can be split along their cell boundaries.
    pub regions: Vec<GridRegion>,
    /// The total cost of the regions of this leaf.
    pub cost: Real,
}

impl KdLeaf {
    pub(crate) fn new(volume: Aabb, regions: Vec<GridRegion>) -> Self {
        let cost = regions.iter().map(|r| r.cost).sum();
        Self {
            id: LeafId(u32::MAX),
            volume,
            regions,
            cost,
        }
    }

    /// Is this leaf covered by no grid at all?
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// The refinement level shared by all the regions of this leaf.
    ///
    /// Returns `None` if this leaf is empty or mixes regions of different levels.
    pub fn level(&self) -> Option<u32> {
        let first = self.regions.first()?.level;
        self.regions
            .iter()
            .all(|r| r.level == first)
            .then_some(first)
    }

    /// Does this leaf mix regions of different refinement levels?
    pub fn is_mixed_level(&self) -> bool {
        !self.is_empty() && self.level().is_none()
    }
}

/// A node of a [`KdTree`](super::KdTree).
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub enum KdNode {
    /// A node split in two by a plane orthogonal to one of the coordinate axes.
    Internal {
        /// The volume covered by this node.
        volume: Aabb,
        /// The axis orthogonal to the split plane.
        axis: u8,
        /// The coordinate of the split plane along `axis`.
        split: Real,
        /// The child covering the part of `volume` below `split`.
        left: NodeIndex,
        /// The child covering the part of `volume` above `split`.
        right: NodeIndex,
    },
    /// A leaf.
    Leaf(KdLeaf),
}

impl KdNode {
    /// The volume covered by this node.
    #[inline]
    pub fn volume(&self) -> &Aabb {
        match self {
            KdNode::Internal { volume, .. } => volume,
            KdNode::Leaf(leaf) => &leaf.volume,
        }
    }

    /// Is this node a leaf?
    #[inline]
    pub fn is_leaf(&self) -> bool {
        matches!(self, KdNode::Leaf(_))
    }

    /// This node as a leaf, if it is one.
    #[inline]
    pub fn as_leaf(&self) -> Option<&KdLeaf> {
        match self {
            KdNode::Leaf(leaf) => Some(leaf),
            KdNode::Internal { .. } => None,
        }
    }

    /// Offsets the child indices of this node by `shift`.
    pub(super) fn shift_children(&mut self, shift: u32) {
        if let KdNode::Internal { left, right, .. } = self {
            left.0 += shift;
            right.0 += shift;
        }
    }
}
