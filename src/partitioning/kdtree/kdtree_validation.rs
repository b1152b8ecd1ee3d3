use super::{KdNode, KdTree, LeafId, NodeIndex};
use crate::bounding_volume::BoundingVolume;
use std::collections::HashSet;

impl KdTree {
    /// Panics if the tree isn’t well-formed.
    ///
    /// The tree is well-formed if it is topologically correct (every node is reachable from the
    /// root exactly once, the leaf index matches the in-order leaf sequence) and geometrically
    /// correct (the children of a node are the two halves of its volume split by its plane, and
    /// the regions of a leaf lie inside of the leaf and reference existing grids).
    pub fn assert_well_formed(&self) {
        assert!(!self.nodes.is_empty(), "The tree has no root.");

        let mut loop_detection = HashSet::new();
        let mut next_leaf = 0;
        self.assert_well_formed_recurse(NodeIndex::ROOT, &mut loop_detection, &mut next_leaf);

        assert_eq!(
            loop_detection.len(),
            self.nodes.len(),
            "Some nodes are unreachable from the root."
        );
        assert_eq!(next_leaf, self.leaf_nodes.len());
    }

    fn assert_well_formed_recurse(
        &self,
        id: NodeIndex,
        loop_detection: &mut HashSet<NodeIndex>,
        next_leaf: &mut usize,
    ) {
        if !loop_detection.insert(id) {
            panic!("Detected loop. Node {:?} visited twice.", id);
        }

        match &self.nodes[id.index()] {
            KdNode::Internal {
                volume,
                axis,
                split,
                left,
                right,
            } => {
                let (left_volume, right_volume) = volume
                    .split(*axis as usize, *split)
                    .expect("The split plane must cut through the node volume.");
                assert_eq!(self.nodes[left.index()].volume(), &left_volume);
                assert_eq!(self.nodes[right.index()].volume(), &right_volume);

                self.assert_well_formed_recurse(*left, loop_detection, next_leaf);
                self.assert_well_formed_recurse(*right, loop_detection, next_leaf);
            }
            KdNode::Leaf(leaf) => {
                assert_eq!(leaf.id, LeafId::new(*next_leaf));
                assert_eq!(self.leaf_nodes[*next_leaf], id);
                *next_leaf += 1;

                let mut cost = 0.0;

                for region in &leaf.regions {
                    let grid = &self.grids[region.grid_index as usize];
                    assert_eq!(grid.id, region.grid);
                    assert_eq!(grid.level, region.level);
                    assert!(leaf.volume.contains(&region.volume));
                    assert!(grid.bounds.contains(&region.volume));
                    assert!(!region.volume.is_degenerate());
                    cost += region.cost;
                }

                assert_relative_eq!(cost, leaf.cost, max_relative = 1.0e-9);
            }
        }
    }
}
