use super::{BalanceError, KdTree, LeafId};
use crate::grid::ProcessTopology;
use crate::math::Real;
use core::ops::Range;

/// The assignment of the leaves of a [`KdTree`] to workers.
///
/// Every leaf is assigned to exactly one worker, and every worker owns a contiguous run of the
/// in-order leaf sequence of the tree. The runs of workers `0, 1, 2, …` follow each other in
/// that sequence.
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct PartitionAssignment {
    /// Index of the first leaf of each partition, followed by the total leaf count.
    bounds: Vec<usize>,
    costs: Vec<Real>,
}

impl PartitionAssignment {
    /// The number of partitions.
    #[inline]
    pub fn partition_count(&self) -> usize {
        self.costs.len()
    }

    /// The total number of leaves assigned.
    #[inline]
    pub fn leaf_count(&self) -> usize {
        self.bounds.last().copied().unwrap_or(0)
    }

    /// The worker the given leaf is assigned to.
    ///
    /// Returns `None` if the leaf does not exist.
    pub fn worker_of(&self, leaf: LeafId) -> Option<usize> {
        if leaf.index() >= self.leaf_count() {
            return None;
        }

        // `bounds` is sorted: the worker is the last partition starting at or before the leaf.
        Some(self.bounds.partition_point(|start| *start <= leaf.index()) - 1)
    }

    /// The range of leaf identifiers assigned to the given worker.
    pub fn leaf_range(&self, worker: usize) -> Range<usize> {
        if worker < self.partition_count() {
            self.bounds[worker]..self.bounds[worker + 1]
        } else {
            0..0
        }
    }

    /// The leaves assigned to the given worker, in their in-order sequence.
    pub fn leaves_of(&self, worker: usize) -> impl Iterator<Item = LeafId> {
        self.leaf_range(worker).map(LeafId::new)
    }

    /// The aggregate cost of the leaves of each partition.
    #[inline]
    pub fn partition_costs(&self) -> &[Real] {
        &self.costs
    }

    /// The largest aggregate cost of a partition.
    pub fn makespan(&self) -> Real {
        self.costs.iter().copied().fold(0.0, Real::max)
    }
}

/// Fewer partitions than requested could be produced because the tree has fewer leaves than
/// the requested partition count.
#[derive(thiserror::Error, Debug, Copy, Clone, PartialEq, Eq)]
#[error("{requested} partitions were requested but only {produced} could be produced")]
pub struct PartitionUnderflow {
    /// The requested partition count.
    pub requested: usize,
    /// The number of partitions actually produced.
    pub produced: usize,
}

/// The result of a balancing pass.
#[derive(Clone, Debug, PartialEq)]
pub struct Balanced {
    /// The assignment of the leaves to workers.
    pub assignment: PartitionAssignment,
    /// Set if fewer partitions than requested were produced.
    pub underflow: Option<PartitionUnderflow>,
}

/// Distributes the leaves of a [`KdTree`] among workers.
///
/// The leaves are distributed following their in-order sequence, so that each worker owns a
/// spatially coherent set of leaves. The sequence is cut greedily wherever the running cost
/// crosses a multiple of `total_cost / P`. The most expensive partition then costs at most
/// `total_cost / P + max_leaf_cost`.
///
/// # Example
///
/// ```rust
/// # #[cfg(feature = "dim3")] {
/// use amrkd3d::bounding_volume::Aabb;
/// use amrkd3d::grid::{GridDescriptor, GridId};
/// use amrkd3d::partitioning::{KdTree, KdTreeBalancer};
/// use nalgebra::{Point3, Vector3};
///
/// let grids: Vec<_> = (0..4)
///     .map(|i| {
///         let mins = Point3::new(i as f64, 0.0, 0.0);
///         let bounds = Aabb::new(mins, mins + Vector3::repeat(1.0));
///         GridDescriptor::new(GridId(i), bounds, 0, Vector3::repeat(0.5))
///     })
///     .collect();
/// let tree = KdTree::new(&grids).unwrap();
///
/// let balanced = KdTreeBalancer::new().balance(&tree, &2usize).unwrap();
/// assert!(balanced.underflow.is_none());
/// assert_eq!(balanced.assignment.partition_costs(), &[16.0, 16.0]);
/// # }
/// ```
#[derive(Default, Copy, Clone, Debug, PartialEq, Eq)]
pub struct KdTreeBalancer;

impl KdTreeBalancer {
    /// Creates a new balancer.
    pub fn new() -> Self {
        Self
    }

    /// Distributes the leaves of `tree` among the workers of `topology`.
    pub fn balance<T: ProcessTopology + ?Sized>(
        &self,
        tree: &KdTree,
        topology: &T,
    ) -> Result<Balanced, BalanceError> {
        self.balance_costs(tree.leaves().map(|leaf| leaf.cost), topology.worker_count())
    }

    /// Splits a sequence of leaf costs into at most `partitions` contiguous runs.
    pub(crate) fn balance_costs(
        &self,
        leaf_costs: impl Iterator<Item = Real>,
        partitions: usize,
    ) -> Result<Balanced, BalanceError> {
        if partitions == 0 {
            return Err(BalanceError::ZeroPartitions);
        }

        let leaf_costs: Vec<Real> = leaf_costs.collect();
        let leaf_count = leaf_costs.len();
        let total: Real = leaf_costs.iter().sum();
        let effective = partitions.min(leaf_count).max(1);

        let mut bounds = vec![0];
        let mut costs = vec![0.0];
        let mut offset = 0.0;

        for (i, cost) in leaf_costs.iter().enumerate() {
            let current = costs.len() - 1;
            let current_is_empty = bounds[current] == i;
            let remaining_leaves = leaf_count - i;
            let remaining_partitions = effective - 1 - current;

            let desired = if total > 0.0 {
                ((offset * partitions as Real / total).floor() as usize).min(effective - 1)
            } else {
                0
            };

            if !current_is_empty && (desired > current || remaining_leaves == remaining_partitions)
            {
                bounds.push(i);
                costs.push(0.0);
            }

            let last = costs.len() - 1;
            costs[last] += *cost;
            offset += *cost;
        }

        bounds.push(leaf_count);

        let assignment = PartitionAssignment { bounds, costs };
        let underflow = (assignment.partition_count() < partitions).then_some(PartitionUnderflow {
            requested: partitions,
            produced: assignment.partition_count(),
        });

        if let Some(underflow) = &underflow {
            log::warn!("Unbalanced partitioning: {}.", underflow);
        }

        log::debug!(
            "Balanced {} leaves of total cost {} among {} partitions, makespan {}.",
            leaf_count,
            total,
            assignment.partition_count(),
            assignment.makespan()
        );

        Ok(Balanced {
            assignment,
            underflow,
        })
    }
}
