use super::{GridRegion, KdLeaf, KdNode, KdTree, KdTreeBuildError, NodeIndex};
use crate::bounding_volume::{Aabb, BoundingVolume};
use crate::grid::{GridAdapter, GridDescriptor};
use crate::math::{Real, DIM};
use crate::query::SplitResult;
use ordered_float::OrderedFloat;

/// Relative tolerance under which two split candidates are considered equally balanced.
const BALANCE_EPSILON: Real = 1.0e-9;

/// The order in which the builder tries the axes when looking for a split plane.
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
#[derive(Default, Copy, Clone, Debug, PartialEq, Eq)]
pub enum SplitAxisStrategy {
    /// A node at depth `d` is split along axis `d % DIM` whenever possible, otherwise along the
    /// first of the following axes (cyclically) that admits a split.
    #[default]
    RoundRobin,
    /// A node is split along its longest axis whenever possible, otherwise along the next
    /// longest axis that admits a split. Axes of equal extents are tried by increasing index.
    LongestExtent,
}

/// The criteria used by the builder to stop subdividing nodes.
///
/// The depth and cost criteria only turn into a leaf a node whose regions all belong to the same
/// refinement level, unless `allow_mixed_levels` is set.
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct KdTreeBuildPolicy {
    /// Nodes at this depth become leaves. Unbounded by default.
    pub max_depth: u32,
    /// Nodes with a cost smaller or equal to this become leaves. Disabled if zero (the default).
    pub min_leaf_cost: Real,
    /// Can the depth and cost criteria create leaves mixing regions of several refinement
    /// levels? `false` by default.
    pub allow_mixed_levels: bool,
    /// The order in which split axes are tried.
    pub axis_strategy: SplitAxisStrategy,
}

impl Default for KdTreeBuildPolicy {
    fn default() -> Self {
        Self {
            max_depth: u32::MAX,
            min_leaf_cost: 0.0,
            allow_mixed_levels: false,
            axis_strategy: SplitAxisStrategy::RoundRobin,
        }
    }
}

impl KdTreeBuildPolicy {
    /// Sets the depth at which nodes become leaves.
    pub fn with_max_depth(mut self, max_depth: u32) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Sets the cost under which nodes become leaves.
    pub fn with_min_leaf_cost(mut self, min_leaf_cost: Real) -> Self {
        self.min_leaf_cost = min_leaf_cost;
        self
    }

    /// Sets whether the stopping criteria may create mixed-level leaves.
    pub fn with_mixed_levels(mut self, allow_mixed_levels: bool) -> Self {
        self.allow_mixed_levels = allow_mixed_levels;
        self
    }

    /// Sets the order in which split axes are tried.
    pub fn with_axis_strategy(mut self, axis_strategy: SplitAxisStrategy) -> Self {
        self.axis_strategy = axis_strategy;
        self
    }
}

/// Builds a [`KdTree`] from the grids of an AMR hierarchy.
///
/// Starting from the root volume, nodes are recursively split in two by planes orthogonal to
/// the coordinate axes. The split planes are chosen among the boundaries of the grid regions
/// inside of the node, so that they never cut through a grid cell, and so that the costs on
/// both sides of the plane are as close as possible. Inside of a node, a region covering the
/// whole node hides the regions of coarser levels.
///
/// Builds are deterministic: building twice from the same grids yields identical trees.
#[derive(Default, Copy, Clone, Debug, PartialEq)]
pub struct KdTreeBuilder {
    policy: KdTreeBuildPolicy,
}

impl KdTreeBuilder {
    /// A builder applying the given stopping policy.
    pub fn new(policy: KdTreeBuildPolicy) -> Self {
        Self { policy }
    }

    /// The stopping policy of this builder.
    pub fn policy(&self) -> &KdTreeBuildPolicy {
        &self.policy
    }

    /// Builds a tree covering the union of the bounds of all the grids listed by `adapter`.
    pub fn build<A: GridAdapter + ?Sized>(&self, adapter: &A) -> Result<KdTree, KdTreeBuildError> {
        self.build_with_root(adapter.list_grids(), None)
    }

    /// Builds a tree covering `root`.
    ///
    /// Grids are clipped to `root`; parts of `root` covered by no grid end up in empty leaves.
    pub fn build_in<A: GridAdapter + ?Sized>(
        &self,
        adapter: &A,
        root: Aabb,
    ) -> Result<KdTree, KdTreeBuildError> {
        self.build_with_root(adapter.list_grids(), Some(root))
    }

    fn build_with_root(
        &self,
        grids: Vec<GridDescriptor>,
        root: Option<Aabb>,
    ) -> Result<KdTree, KdTreeBuildError> {
        let first = grids.first().ok_or(KdTreeBuildError::EmptyRegionSet)?;

        for grid in &grids {
            grid.validate().map_err(|reason| KdTreeBuildError::InvalidGrid {
                id: grid.id,
                reason,
            })?;
        }

        let root = root.unwrap_or_else(|| {
            grids
                .iter()
                .fold(first.bounds, |root, grid| root.merged(&grid.bounds))
        });

        if let Some(axis) = root.degenerate_axis() {
            return Err(KdTreeBuildError::DegenerateVolume { axis });
        }

        let regions: Vec<_> = grids
            .iter()
            .enumerate()
            .filter_map(|(i, grid)| {
                let volume = grid.bounds.intersection(&root)?;
                (!volume.is_degenerate()).then(|| GridRegion {
                    grid: grid.id,
                    grid_index: i as u32,
                    level: grid.level,
                    volume,
                    cost: grid.cost_of(&volume),
                })
            })
            .collect();

        if regions.is_empty() {
            return Err(KdTreeBuildError::EmptyRegionSet);
        }

        warn_overlapping_grids(&grids);

        let ctxt = BuildContext {
            grids: &grids,
            policy: &self.policy,
        };
        let nodes = ctxt.build_subtree(regions, root, 0);
        let tree = KdTree::from_nodes(nodes, grids);

        if log::log_enabled!(log::Level::Debug) {
            log::debug!(
                "Built k-d tree from {} grids: {} nodes, {} leaves, depth {}.",
                tree.grids.len(),
                tree.nodes.len(),
                tree.leaf_count(),
                tree.depth()
            );
        }

        #[cfg(debug_assertions)]
        tree.assert_well_formed();

        Ok(tree)
    }
}

impl KdTree {
    /// Builds a tree from the grids listed by `adapter`, with the default policy.
    ///
    /// See [`KdTreeBuilder`] for details.
    pub fn new<A: GridAdapter + ?Sized>(adapter: &A) -> Result<Self, KdTreeBuildError> {
        KdTreeBuilder::default().build(adapter)
    }
}

struct BuildContext<'a> {
    grids: &'a [GridDescriptor],
    policy: &'a KdTreeBuildPolicy,
}

impl BuildContext<'_> {
    /// Builds the subtree covering `volume`.
    ///
    /// The nodes are returned in depth-first pre-order, the root of the subtree first, with
    /// child indices relative to the returned buffer.
    fn build_subtree(&self, mut regions: Vec<GridRegion>, volume: Aabb, depth: u32) -> Vec<KdNode> {
        regions.retain(|region| !region.volume.is_degenerate());
        hide_occluded_regions(&mut regions, &volume);

        let leaf = |regions| vec![KdNode::Leaf(KdLeaf::new(volume, regions))];

        if regions.is_empty() || (regions.len() == 1 && regions[0].volume.contains(&volume)) {
            return leaf(regions);
        }

        let single_level = regions.iter().all(|r| r.level == regions[0].level);

        if single_level || self.policy.allow_mixed_levels {
            let cost: Real = regions.iter().map(|r| r.cost).sum();

            if depth >= self.policy.max_depth
                || (self.policy.min_leaf_cost > 0.0 && cost <= self.policy.min_leaf_cost)
            {
                return leaf(regions);
            }
        }

        let Some((axis, split, left_volume, right_volume)) =
            self.select_split(&regions, &volume, depth)
        else {
            if !single_level && !self.policy.allow_mixed_levels {
                log::warn!(
                    "No split plane separates the {} regions of the node {:?} without cutting \
                     through grid cells: creating a mixed-level leaf.",
                    regions.len(),
                    volume
                );
            }
            return leaf(regions);
        };

        let mut left_regions = Vec::with_capacity(regions.len());
        let mut right_regions = Vec::with_capacity(regions.len());

        for region in regions {
            match region.volume.canonical_split(axis, split, 0.0) {
                SplitResult::Negative => left_regions.push(region),
                SplitResult::Positive => right_regions.push(region),
                SplitResult::Pair(left, right) => {
                    left_regions.push(self.narrow(&region, left));
                    right_regions.push(self.narrow(&region, right));
                }
            }
        }

        #[cfg(feature = "parallel")]
        let (left, right) = rayon::join(
            || self.build_subtree(left_regions, left_volume, depth + 1),
            || self.build_subtree(right_regions, right_volume, depth + 1),
        );
        #[cfg(not(feature = "parallel"))]
        let (left, right) = (
            self.build_subtree(left_regions, left_volume, depth + 1),
            self.build_subtree(right_regions, right_volume, depth + 1),
        );

        let left_len = left.len() as u32;
        let mut nodes = Vec::with_capacity(1 + left.len() + right.len());
        nodes.push(KdNode::Internal {
            volume,
            axis: axis as u8,
            split,
            left: NodeIndex(1),
            right: NodeIndex(1 + left_len),
        });

        for (shift, subtree) in [(1, left), (1 + left_len, right)] {
            nodes.extend(subtree.into_iter().map(|mut node| {
                node.shift_children(shift);
                node
            }));
        }

        nodes
    }

    /// The region of the same grid as `region`, restricted to `volume`.
    fn narrow(&self, region: &GridRegion, volume: Aabb) -> GridRegion {
        GridRegion {
            volume,
            cost: self.grids[region.grid_index as usize].cost_of(&volume),
            ..*region
        }
    }

    fn axis_order(&self, volume: &Aabb, depth: u32) -> [usize; DIM] {
        let mut axes = [0; DIM];

        match self.policy.axis_strategy {
            SplitAxisStrategy::RoundRobin => {
                for (i, axis) in axes.iter_mut().enumerate() {
                    *axis = (depth as usize + i) % DIM;
                }
            }
            SplitAxisStrategy::LongestExtent => {
                let extents = volume.extents();
                for (i, axis) in axes.iter_mut().enumerate() {
                    *axis = i;
                }
                // Stable sort: equal extents keep the increasing axis order.
                axes.sort_by_key(|i| core::cmp::Reverse(OrderedFloat(extents[*i])));
            }
        }

        axes
    }

    /// Selects the split plane of a node, along with the volumes of both of its children.
    fn select_split(
        &self,
        regions: &[GridRegion],
        volume: &Aabb,
        depth: u32,
    ) -> Option<(usize, Real, Aabb, Aabb)> {
        self.axis_order(volume, depth)
            .into_iter()
            .find_map(|axis| self.best_candidate(regions, volume, axis))
    }

    /// The best split plane orthogonal to `axis`, if any.
    ///
    /// Candidates are the region boundaries strictly inside of the node. A candidate is
    /// discarded if it cuts through the cells of one of the regions it goes through. Among the
    /// remaining candidates, the one minimizing the cost difference between both sides wins;
    /// ties are broken by picking the candidate closest to the middle of the node, then the
    /// smallest one.
    fn best_candidate(
        &self,
        regions: &[GridRegion],
        volume: &Aabb,
        axis: usize,
    ) -> Option<(usize, Real, Aabb, Aabb)> {
        let (min, max) = (volume.mins[axis], volume.maxs[axis]);
        let mut candidates: Vec<_> = regions
            .iter()
            .flat_map(|r| [r.volume.mins[axis], r.volume.maxs[axis]])
            .filter(|c| *c > min && *c < max)
            .map(OrderedFloat)
            .collect();
        candidates.sort_unstable();
        candidates.dedup();

        let total: Real = regions.iter().map(|r| r.cost).sum();
        let mut valid = Vec::with_capacity(candidates.len());

        'candidates: for OrderedFloat(coordinate) in candidates {
            let halves = match volume.split(axis, coordinate) {
                Ok(halves) => halves,
                Err(err) => {
                    log::trace!("Discarding split candidate: {}.", err);
                    continue;
                }
            };

            let mut left_cost = 0.0;

            for region in regions {
                let (rmin, rmax) = (region.volume.mins[axis], region.volume.maxs[axis]);

                if rmax <= coordinate {
                    left_cost += region.cost;
                } else if rmin < coordinate {
                    let grid = &self.grids[region.grid_index as usize];

                    if !grid.is_on_lattice(axis, coordinate) {
                        log::trace!(
                            "Discarding split candidate {} along axis {}: it cuts through the \
                             cells of grid {}.",
                            coordinate,
                            axis,
                            grid.id
                        );
                        continue 'candidates;
                    }

                    left_cost += region.cost * (coordinate - rmin) / (rmax - rmin);
                }
            }

            let imbalance = (total - 2.0 * left_cost).abs();
            valid.push((imbalance, coordinate, halves));
        }

        let best_imbalance = valid
            .iter()
            .map(|(imbalance, ..)| OrderedFloat(*imbalance))
            .min()?
            .into_inner();
        let tolerance = total.abs() * BALANCE_EPSILON;
        let midpoint = (min + max) / 2.0;

        valid
            .into_iter()
            .filter(|(imbalance, ..)| *imbalance <= best_imbalance + tolerance)
            .min_by_key(|(_, coordinate, _)| {
                (
                    OrderedFloat((coordinate - midpoint).abs()),
                    OrderedFloat(*coordinate),
                )
            })
            .map(|(_, coordinate, (left, right))| (axis, coordinate, left, right))
    }
}

/// Removes the regions hidden by a finer region covering the whole node.
fn hide_occluded_regions(regions: &mut Vec<GridRegion>, volume: &Aabb) {
    let finest_covering = regions
        .iter()
        .filter(|r| r.volume.contains(volume))
        .map(|r| r.level)
        .max();

    if let Some(level) = finest_covering {
        regions.retain(|r| r.level >= level);
    }
}

/// Warns about grids of the same refinement level overlapping each other.
///
/// Such grids are not occluding each other: the leaves covering their overlap mix both.
fn warn_overlapping_grids(grids: &[GridDescriptor]) {
    let mut sorted: Vec<_> = grids.iter().collect();
    sorted.sort_by_key(|grid| OrderedFloat(grid.bounds.mins[0]));
    let mut overlaps = 0usize;

    for (i, a) in sorted.iter().enumerate() {
        for b in &sorted[i + 1..] {
            if b.bounds.mins[0] >= a.bounds.maxs[0] {
                break;
            }

            if a.level == b.level && a.bounds.intersection_volume(&b.bounds) > 0.0 {
                if overlaps == 0 {
                    log::warn!(
                        "Grids {} and {} of level {} overlap.",
                        a.id,
                        b.id,
                        a.level
                    );
                }
                overlaps += 1;
            }
        }
    }

    if overlaps > 1 {
        log::warn!("{} pairs of grids of the same level overlap.", overlaps);
    }
}
