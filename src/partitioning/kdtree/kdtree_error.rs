use crate::grid::{GridDefect, GridId};
use crate::partitioning::NodeIndex;

/// Error indicating that a [`KdTree`](super::KdTree) could not be built.
#[derive(thiserror::Error, Debug, Copy, Clone, PartialEq)]
pub enum KdTreeBuildError {
    /// There is no grid region to build the tree from.
    #[error("no grid region to build the tree from")]
    EmptyRegionSet,
    /// The root volume has a zero extent along some axis.
    #[error("the root volume has a zero extent along axis {axis}")]
    DegenerateVolume {
        /// The first axis along which the root volume is flat.
        axis: usize,
    },
    /// One of the grids listed by the grid adapter is malformed.
    #[error("grid {id} is invalid: {reason}")]
    InvalidGrid {
        /// The identifier of the faulty grid.
        id: GridId,
        /// What is wrong with the grid.
        reason: GridDefect,
    },
}

/// Error indicating that the leaves of a tree could not be balanced.
#[derive(thiserror::Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum BalanceError {
    /// The leaves were requested to be distributed among zero partitions.
    #[error("at least one partition is required")]
    ZeroPartitions,
}

/// Error indicating that a snapshot does not describe a valid tree.
#[derive(thiserror::Error, Debug, Copy, Clone, PartialEq)]
pub enum SnapshotError {
    /// The snapshot contains no node.
    #[error("the snapshot contains no node")]
    Empty,
    /// A node references a child that does not exist.
    #[error("node {node:?} references the missing child {child:?}")]
    InvalidNodeIndex {
        /// The node referencing the child.
        node: NodeIndex,
        /// The missing child.
        child: NodeIndex,
    },
    /// A region references a grid that does not exist.
    #[error("node {node:?} references the missing grid {grid_index}")]
    InvalidGridIndex {
        /// The leaf referencing the grid.
        node: NodeIndex,
        /// The index of the missing grid.
        grid_index: u32,
    },
    /// One of the grids of the snapshot is malformed.
    #[error("grid {grid_index} is invalid: {reason}")]
    InvalidGrid {
        /// The index of the faulty grid.
        grid_index: u32,
        /// What is wrong with the grid.
        reason: GridDefect,
    },
    /// A node is not reachable from the root exactly once.
    #[error("node {0:?} is not reachable from the root exactly once")]
    UnreachableNode(NodeIndex),
    /// The volume of a node is not consistent with its parent, or the regions of a leaf are not
    /// consistent with the leaf and their grids.
    #[error("the geometry of node {0:?} is inconsistent")]
    InvalidGeometry(NodeIndex),
}
