use amrkd2d::bounding_volume::Aabb;
use amrkd2d::grid::{GridDescriptor, GridId};
use amrkd2d::partitioning::{KdTree, KdTreeBalancer, KdTreeBuilder, WalkOrder};
use amrkd2d::query::Ray;
use nalgebra::{Point2, Vector2};

fn grid(id: u64, mins: [f64; 2], maxs: [f64; 2], level: u32, cell: f64) -> GridDescriptor {
    GridDescriptor::new(
        GridId(id),
        Aabb::new(Point2::from(mins), Point2::from(maxs)),
        level,
        Vector2::repeat(cell),
    )
}

/// A coarse grid refined by two patches, the first of which is refined once more.
fn hierarchy() -> Vec<GridDescriptor> {
    vec![
        grid(0, [0.0, 0.0], [16.0, 8.0], 0, 1.0),
        grid(1, [2.0, 2.0], [6.0, 6.0], 1, 0.5).with_parent(GridId(0)),
        grid(2, [9.0, 1.0], [14.0, 4.0], 1, 0.5).with_parent(GridId(0)),
        grid(3, [3.0, 3.5], [4.5, 5.0], 2, 0.25).with_parent(GridId(1)),
    ]
}

#[test]
fn leaves_partition_the_domain() {
    let tree = KdTree::new(&hierarchy()).unwrap();
    let leaves: Vec<_> = tree.leaves().collect();

    assert_eq!(tree.total_volume(), 128.0);

    for (i, a) in leaves.iter().enumerate() {
        assert_eq!(a.regions.len(), 1);
        assert_eq!(a.regions[0].volume, a.volume);

        for b in &leaves[i + 1..] {
            assert_eq!(a.volume.intersection_volume(&b.volume), 0.0);
        }
    }

    let finest = 6 * 6;
    let patches = (8 * 8 - 3 * 3) + 10 * 6;
    let coarse = 128 - 16 - 15;
    assert_eq!(tree.total_cells(), finest + patches + coarse);
}

#[test]
fn points_find_the_finest_grid() {
    let tree = KdTree::new(&hierarchy()).unwrap();
    let finest_at = |x, y| {
        tree.point_lookup(&Point2::new(x, y))
            .map(|leaf| leaf.regions[0].grid)
    };

    assert_eq!(finest_at(0.5, 0.5), Some(GridId(0)));
    assert_eq!(finest_at(2.5, 2.5), Some(GridId(1)));
    assert_eq!(finest_at(4.0, 4.0), Some(GridId(3)));
    assert_eq!(finest_at(13.9, 3.9), Some(GridId(2)));
    assert_eq!(finest_at(16.0, 8.0), Some(GridId(0)));
    assert_eq!(finest_at(16.1, 8.0), None);
}

#[test]
fn opposite_directions_walk_in_reverse() {
    let tree = KdTree::new(&hierarchy()).unwrap();

    for dir in [
        Vector2::new(1.0, 0.0),
        Vector2::new(0.0, -1.0),
        Vector2::new(0.3, 0.8),
        Vector2::new(-2.0, 1.0),
    ] {
        let forward: Vec<_> = tree
            .ordered_walk(dir, WalkOrder::FrontToBack)
            .map(|leaf| leaf.id)
            .collect();
        let mut backward: Vec<_> = tree
            .ordered_walk(-dir, WalkOrder::FrontToBack)
            .map(|leaf| leaf.id)
            .collect();
        backward.reverse();
        assert_eq!(forward, backward);
    }
}

#[test]
fn horizontal_ray_crosses_the_whole_domain() {
    let tree = KdTree::new(&hierarchy()).unwrap();
    let ray = Ray::new(Point2::new(-4.0, 4.25), Vector2::new(2.0, 0.0));
    let hits: Vec<_> = tree.ray_intersect(&ray).collect();

    assert_eq!(hits.first().map(|hit| hit.1), Some(2.0));
    assert_eq!(hits.last().map(|hit| hit.2), Some(10.0));
    assert!(hits.windows(2).all(|w| w[0].2 == w[1].1));

    let grids: Vec<_> = hits.iter().map(|(leaf, ..)| leaf.regions[0].grid).collect();
    assert!(grids.contains(&GridId(3)));
    assert!(!grids.contains(&GridId(2)));

    let missing = Ray::new(Point2::new(-4.0, 9.0), Vector2::new(1.0, 0.0));
    assert_eq!(tree.ray_intersect(&missing).count(), 0);
}

#[test]
fn rebuilds_and_balancing_are_consistent() {
    let sequential = KdTreeBuilder::default().build(&hierarchy()).unwrap();
    let again = KdTreeBuilder::default().build(&hierarchy()).unwrap();
    assert_eq!(sequential, again);

    let balanced = KdTreeBalancer::new().balance(&sequential, &3usize).unwrap();
    assert_eq!(balanced.assignment.partition_count(), 3);
    let total: f64 = balanced.assignment.partition_costs().iter().sum();
    approx::assert_relative_eq!(total, sequential.total_cost());
}
