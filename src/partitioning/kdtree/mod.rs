//! A k-d tree partitioning the domain of an AMR hierarchy.

pub use self::kdtree::KdTree;
pub use self::kdtree_balance::{Balanced, KdTreeBalancer, PartitionAssignment, PartitionUnderflow};
pub use self::kdtree_build::{KdTreeBuildPolicy, KdTreeBuilder, SplitAxisStrategy};
pub use self::kdtree_error::{BalanceError, KdTreeBuildError, SnapshotError};
pub use self::kdtree_node::{GridRegion, KdLeaf, KdNode, LeafId, NodeIndex};
pub use self::kdtree_ray::RayLeaves;
pub use self::kdtree_snapshot::{KdTreeSnapshot, SnapshotNode};
pub use self::kdtree_traverse::{OrderedLeaves, WalkOrder};

mod kdtree;
mod kdtree_balance;
mod kdtree_build;
mod kdtree_error;
mod kdtree_node;
mod kdtree_ray;
mod kdtree_snapshot;
mod kdtree_traverse;
mod kdtree_validation;
