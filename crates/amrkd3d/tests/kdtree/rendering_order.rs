use amrkd3d::bounding_volume::Aabb;
use amrkd3d::grid::{GridDescriptor, GridId};
use amrkd3d::partitioning::{KdTree, WalkOrder};
use amrkd3d::query::Ray;
use nalgebra::{Point3, Vector3};

fn hierarchy() -> Vec<GridDescriptor> {
    let grid = |id, mins: [f64; 3], maxs: [f64; 3], level, cell| {
        GridDescriptor::new(
            GridId(id),
            Aabb::new(Point3::from(mins), Point3::from(maxs)),
            level,
            Vector3::repeat(cell),
        )
    };

    vec![
        grid(0, [0.0; 3], [8.0; 3], 0, 1.0),
        grid(1, [1.0; 3], [3.0; 3], 1, 0.5).with_parent(GridId(0)),
        grid(2, [4.0, 1.0, 2.0], [7.0, 5.0, 6.0], 1, 0.5).with_parent(GridId(0)),
        grid(3, [1.5; 3], [2.5; 3], 2, 0.25).with_parent(GridId(1)),
    ]
}

#[test]
fn rays_cross_leaves_in_front_to_back_order() {
    let tree = KdTree::new(&hierarchy()).unwrap();
    let viewpoint = Point3::new(-5.3, 3.7, 4.1);

    let mut rank = vec![0; tree.leaf_count()];
    for (i, leaf) in tree
        .ordered_walk_from(viewpoint, WalkOrder::FrontToBack)
        .enumerate()
    {
        rank[leaf.id.0 as usize] = i;
    }

    let mut rng = oorandom::Rand64::new(17);

    for _ in 0..500 {
        let target = Point3::from(Vector3::from_fn(|_, _| rng.rand_float() * 8.0));
        let ray = Ray::new(viewpoint, target - viewpoint);
        let ranks: Vec<_> = tree
            .ray_intersect(&ray)
            .filter(|(_, t0, t1)| t1 > t0)
            .map(|(leaf, ..)| rank[leaf.id.0 as usize])
            .collect();

        assert!(!ranks.is_empty());
        assert!(ranks.windows(2).all(|w| w[0] < w[1]), "{:?}", ranks);
    }
}

#[test]
fn back_to_front_is_the_reverse_of_front_to_back() {
    let tree = KdTree::new(&hierarchy()).unwrap();
    let viewpoint = Point3::new(12.0, -3.0, 4.5);

    let front: Vec<_> = tree
        .ordered_walk_from(viewpoint, WalkOrder::FrontToBack)
        .map(|leaf| leaf.id)
        .collect();
    let mut back: Vec<_> = tree
        .ordered_walk_from(viewpoint, WalkOrder::BackToFront)
        .map(|leaf| leaf.id)
        .collect();
    back.reverse();

    assert_eq!(front, back);
}

#[test]
fn every_leaf_is_single_level_and_visible() {
    let grids = hierarchy();
    let tree = KdTree::new(&grids).unwrap();

    for leaf in tree.leaves() {
        assert_eq!(leaf.regions.len(), 1);
        let region = &leaf.regions[0];

        // No finer grid covers any part of the leaf.
        for grid in &grids {
            if grid.level > region.level {
                assert_eq!(grid.bounds.intersection_volume(&leaf.volume), 0.0);
            }
        }
    }

    let fine_cells = 4 * 4 * 4;
    let medium_cells = (64 - 8) + 6 * 8 * 8;
    let coarse_cells = 512 - 8 - 3 * 4 * 4;
    assert_eq!(tree.total_cells(), fine_cells + medium_cells + coarse_cells);
}
