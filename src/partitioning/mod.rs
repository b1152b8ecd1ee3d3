//! Spatial partitioning tools.

pub use self::kdtree::{
    BalanceError, Balanced, GridRegion, KdLeaf, KdNode, KdTree, KdTreeBalancer, KdTreeBuildError,
    KdTreeBuildPolicy, KdTreeBuilder, KdTreeSnapshot, LeafId, NodeIndex, OrderedLeaves,
    PartitionAssignment, PartitionUnderflow, RayLeaves, SnapshotError, SnapshotNode,
    SplitAxisStrategy, WalkOrder,
};

mod kdtree;
