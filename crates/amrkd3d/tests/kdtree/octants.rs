use amrkd3d::bounding_volume::Aabb;
use amrkd3d::grid::{GridDescriptor, GridId};
use amrkd3d::partitioning::{KdTree, KdTreeBalancer, KdTreeBuildError, LeafId};
use nalgebra::{Point3, Vector3};

fn octant(id: u64, x: f64, y: f64, z: f64) -> GridDescriptor {
    let mins = Point3::new(x, y, z);
    let bounds = Aabb::new(mins, mins + Vector3::repeat(2.0));
    GridDescriptor::new(GridId(id), bounds, 0, Vector3::repeat(2.0)).with_cost(1.0)
}

fn four_octants() -> Vec<GridDescriptor> {
    vec![
        octant(0, 0.0, 0.0, 0.0),
        octant(1, 2.0, 2.0, 0.0),
        octant(2, 2.0, 0.0, 2.0),
        octant(3, 0.0, 2.0, 2.0),
    ]
}

#[test]
fn four_octants_balance_in_two_partitions() {
    let tree = KdTree::new(&four_octants()).unwrap();

    assert_eq!(
        *tree.root_volume(),
        Aabb::new(Point3::origin(), Point3::new(4.0, 4.0, 4.0))
    );
    assert_eq!(tree.leaf_count(), 8);
    assert_eq!(tree.total_cost(), 4.0);
    assert_eq!(tree.total_volume(), 64.0);
    assert_eq!(tree.leaves().filter(|leaf| leaf.is_empty()).count(), 4);

    let balanced = KdTreeBalancer::new().balance(&tree, &2usize).unwrap();
    assert!(balanced.underflow.is_none());
    assert_eq!(balanced.assignment.partition_costs(), &[2.0, 2.0]);
    assert_eq!(balanced.assignment.makespan(), 2.0);

    // Each worker owns one half of the domain along the first split axis.
    for leaf in tree.leaves() {
        let worker = balanced.assignment.worker_of(leaf.id).unwrap();
        let expected = if leaf.volume.maxs.x <= 2.0 { 0 } else { 1 };
        assert_eq!(worker, expected);
    }
}

#[test]
fn every_octant_is_owned_by_a_single_leaf() {
    let grids = four_octants();
    let tree = KdTree::new(&grids).unwrap();

    for grid in &grids {
        let leaf = tree.point_lookup(&grid.bounds.center()).unwrap();
        assert_eq!(leaf.volume, grid.bounds);
        assert_eq!(leaf.regions.len(), 1);
        assert_eq!(leaf.regions[0].grid, grid.id);
        assert_eq!(leaf.cost, 1.0);
    }
}

#[test]
fn single_grid_and_empty_hierarchy() {
    let grid = octant(0, 0.0, 0.0, 0.0);
    let tree = KdTree::new(&vec![grid.clone()]).unwrap();
    assert_eq!(tree.leaf_count(), 1);
    assert_eq!(tree.leaf(LeafId(0)).unwrap().volume, grid.bounds);

    assert_eq!(
        KdTree::new(&Vec::<GridDescriptor>::new()),
        Err(KdTreeBuildError::EmptyRegionSet)
    );
}

#[test]
fn rebuilding_is_deterministic() {
    let a = KdTree::new(&four_octants()).unwrap();
    let b = KdTree::new(&four_octants()).unwrap();

    let ids = |tree: &KdTree| -> Vec<_> {
        tree.ordered_walk(Vector3::new(0.3, -0.2, 0.9), Default::default())
            .map(|leaf| leaf.volume)
            .collect()
    };
    assert_eq!(ids(&a), ids(&b));

    for partitions in 1..=9usize {
        assert_eq!(
            KdTreeBalancer::new().balance(&a, &partitions),
            KdTreeBalancer::new().balance(&b, &partitions)
        );
    }
}
