use super::{GridRegion, KdLeaf, KdNode, KdTree, NodeIndex, SnapshotError};
use crate::bounding_volume::{Aabb, BoundingVolume};
use crate::grid::GridDescriptor;
use crate::math::{Real, DIM};

/// A node of a [`KdTreeSnapshot`].
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub enum SnapshotNode {
    /// An internal node.
    Internal {
        /// The volume covered by this node.
        volume: Aabb,
        /// The axis orthogonal to the split plane.
        axis: u8,
        /// The coordinate of the split plane along `axis`.
        split: Real,
        /// Index of the left child in [`KdTreeSnapshot::nodes`].
        left: u32,
        /// Index of the right child in [`KdTreeSnapshot::nodes`].
        right: u32,
    },
    /// A leaf.
    Leaf {
        /// The volume covered by this leaf.
        volume: Aabb,
        /// The grid regions owned by this leaf.
        regions: Vec<GridRegion>,
    },
}

/// A plain-data description of a [`KdTree`], suitable for serialization.
///
/// The root of the tree is the first node.
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct KdTreeSnapshot {
    /// The nodes of the tree.
    pub nodes: Vec<SnapshotNode>,
    /// The grids the regions of the leaves belong to.
    pub grids: Vec<GridDescriptor>,
}

impl KdTree {
    /// A plain-data description of this tree.
    pub fn to_snapshot(&self) -> KdTreeSnapshot {
        let nodes = self
            .nodes
            .iter()
            .map(|node| match node {
                KdNode::Internal {
                    volume,
                    axis,
                    split,
                    left,
                    right,
                } => SnapshotNode::Internal {
                    volume: *volume,
                    axis: *axis,
                    split: *split,
                    left: left.0,
                    right: right.0,
                },
                KdNode::Leaf(leaf) => SnapshotNode::Leaf {
                    volume: leaf.volume,
                    regions: leaf.regions.clone(),
                },
            })
            .collect();

        KdTreeSnapshot {
            nodes,
            grids: self.grids.clone(),
        }
    }

    /// Rebuilds a tree from its plain-data description.
    ///
    /// The snapshot is checked before being accepted: the grids must be valid, child and grid
    /// indices must be in range, every node must be reachable from the root exactly once, and
    /// the children of a node must be the halves of its volume split by its plane. The regions
    /// of a leaf must match the id and level of their grid, have a finite non-negative cost and
    /// a non-zero volume, and lie inside of both the leaf and their grid. Nodes may be listed in any order as long as the root comes
    /// first; leaves are numbered following their in-order sequence.
    pub fn from_snapshot(snapshot: KdTreeSnapshot) -> Result<KdTree, SnapshotError> {
        if snapshot.nodes.is_empty() {
            return Err(SnapshotError::Empty);
        }

        for (index, grid) in snapshot.grids.iter().enumerate() {
            grid.validate().map_err(|reason| SnapshotError::InvalidGrid {
                grid_index: index as u32,
                reason,
            })?;
        }

        let mut visited = vec![false; snapshot.nodes.len()];
        let mut nodes = Vec::with_capacity(snapshot.nodes.len());
        // Pairs of (node of the snapshot, index of its parent's slot in `nodes`).
        let mut stack = vec![(0u32, None::<(usize, bool)>)];

        while let Some((id, parent_slot)) = stack.pop() {
            let index = NodeIndex(id);
            let slot = nodes.len();

            if core::mem::replace(&mut visited[id as usize], true) {
                return Err(SnapshotError::UnreachableNode(index));
            }

            if let Some((parent, is_right)) = parent_slot {
                if let KdNode::Internal { left, right, .. } = &mut nodes[parent] {
                    *(if is_right { right } else { left }) = NodeIndex::new(slot);
                }
            }

            match &snapshot.nodes[id as usize] {
                SnapshotNode::Internal {
                    volume,
                    axis,
                    split,
                    left,
                    right,
                } => {
                    for child in [*left, *right] {
                        if child as usize >= snapshot.nodes.len() {
                            return Err(SnapshotError::InvalidNodeIndex {
                                node: index,
                                child: NodeIndex(child),
                            });
                        }
                    }

                    if *axis as usize >= DIM {
                        return Err(SnapshotError::InvalidGeometry(index));
                    }

                    let (left_volume, right_volume) = volume
                        .split(*axis as usize, *split)
                        .map_err(|_| SnapshotError::InvalidGeometry(index))?;

                    if snapshot.nodes[*left as usize].volume() != &left_volume {
                        return Err(SnapshotError::InvalidGeometry(NodeIndex(*left)));
                    }
                    if snapshot.nodes[*right as usize].volume() != &right_volume {
                        return Err(SnapshotError::InvalidGeometry(NodeIndex(*right)));
                    }

                    nodes.push(KdNode::Internal {
                        volume: *volume,
                        axis: *axis,
                        split: *split,
                        left: NodeIndex::ROOT,
                        right: NodeIndex::ROOT,
                    });

                    // Left first in pre-order.
                    stack.push((*right, Some((slot, true))));
                    stack.push((*left, Some((slot, false))));
                }
                SnapshotNode::Leaf { volume, regions } => {
                    for region in regions {
                        let grid = snapshot.grids.get(region.grid_index as usize).ok_or(
                            SnapshotError::InvalidGridIndex {
                                node: index,
                                grid_index: region.grid_index,
                            },
                        )?;

                        if grid.id != region.grid
                            || grid.level != region.level
                            || !(region.cost >= 0.0 && region.cost.is_finite())
                            || region.volume.is_degenerate()
                            || !volume.contains(&region.volume)
                            || !grid.bounds.contains(&region.volume)
                        {
                            return Err(SnapshotError::InvalidGeometry(index));
                        }
                    }

                    nodes.push(KdNode::Leaf(KdLeaf::new(*volume, regions.clone())));
                }
            }
        }

        if let Some(unreachable) = visited.iter().position(|visited| !visited) {
            return Err(SnapshotError::UnreachableNode(NodeIndex::new(unreachable)));
        }

        Ok(KdTree::from_nodes(nodes, snapshot.grids))
    }
}

impl TryFrom<KdTreeSnapshot> for KdTree {
    type Error = SnapshotError;

    fn try_from(snapshot: KdTreeSnapshot) -> Result<Self, Self::Error> {
        KdTree::from_snapshot(snapshot)
    }
}

impl From<KdTree> for KdTreeSnapshot {
    fn from(tree: KdTree) -> Self {
        tree.to_snapshot()
    }
}

impl SnapshotNode {
    /// The volume covered by this node.
    pub fn volume(&self) -> &Aabb {
        match self {
            SnapshotNode::Internal { volume, .. } | SnapshotNode::Leaf { volume, .. } => volume,
        }
    }
}
