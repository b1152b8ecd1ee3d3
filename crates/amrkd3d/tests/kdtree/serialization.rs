use amrkd3d::bounding_volume::Aabb;
use amrkd3d::grid::{GridDescriptor, GridId};
use amrkd3d::partitioning::{KdTree, KdTreeBalancer, KdTreeSnapshot, WalkOrder};
use nalgebra::{Point3, Vector3};

fn tree() -> KdTree {
    let coarse = GridDescriptor::new(
        GridId(10),
        Aabb::new(Point3::origin(), Point3::new(8.0, 4.0, 4.0)),
        0,
        Vector3::repeat(1.0),
    );
    let fine = GridDescriptor::new(
        GridId(11),
        Aabb::new(Point3::new(2.0, 1.0, 0.0), Point3::new(5.0, 3.0, 2.0)),
        1,
        Vector3::repeat(0.5),
    )
    .with_parent(GridId(10));

    KdTree::new(&vec![coarse, fine]).unwrap()
}

#[test]
fn snapshot_json_round_trip() {
    let tree = tree();
    let json = serde_json::to_string(&tree.to_snapshot()).unwrap();
    let snapshot: KdTreeSnapshot = serde_json::from_str(&json).unwrap();
    let restored = KdTree::from_snapshot(snapshot).unwrap();

    assert_eq!(restored, tree);

    let dir = Vector3::new(-0.4, 0.1, 0.7);
    let walk = |tree: &KdTree| -> Vec<_> {
        tree.ordered_walk(dir, WalkOrder::BackToFront)
            .map(|leaf| leaf.id)
            .collect()
    };
    assert_eq!(walk(&restored), walk(&tree));

    for partitions in 1..=4usize {
        assert_eq!(
            KdTreeBalancer::new().balance(&restored, &partitions),
            KdTreeBalancer::new().balance(&tree, &partitions)
        );
    }
}

#[test]
fn tree_json_round_trip() {
    let tree = tree();
    let json = serde_json::to_string(&tree).unwrap();
    let restored: KdTree = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, tree);
}

#[test]
fn malformed_tree_json_is_rejected() {
    assert!(serde_json::from_str::<KdTree>(r#"{"nodes":[],"grids":[]}"#).is_err());

    // A leaf whose region claims a grid that does not exist.
    let mut snapshot = tree().to_snapshot();
    snapshot.grids.truncate(1);
    let json = serde_json::to_string(&snapshot).unwrap();
    assert!(serde_json::from_str::<KdTree>(&json).is_err());
}
