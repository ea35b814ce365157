use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::octree::node::{distance2, OctreeNode};
use crate::octree::IncrementalOctreeLocator;
use crate::points::{PointArray, PointDataSet, PointSet, SharedPoints};
use crate::r#type::CoordNum;
use crate::OctreeIndexError;

fn unit_cube_locator(tolerance: f64) -> (SharedPoints<f64>, IncrementalOctreeLocator<f64>) {
    let points = PointArray::<f64>::new().into_shared();
    let mut locator = IncrementalOctreeLocator::new();
    locator.set_tolerance(tolerance);
    locator
        .init_point_insertion(points.clone(), &[0., 1., 0., 1., 0., 1.])
        .unwrap();
    (points, locator)
}

/// 10x10x10 grid spaced 0.1 apart; the id of `(i, j, k)` is
/// `i * 100 + j * 10 + k`.
fn grid_locator() -> (SharedPoints<f64>, IncrementalOctreeLocator<f64>) {
    let (points, mut locator) = unit_cube_locator(0.);
    for i in 0..10 {
        for j in 0..10 {
            for k in 0..10 {
                locator.insert_next_point([i as f64 * 0.1, j as f64 * 0.1, k as f64 * 0.1]);
            }
        }
    }
    (points, locator)
}

fn random_cloud(rng: &mut StdRng, count: usize) -> Vec<[f64; 3]> {
    (0..count)
        .map(|_| std::array::from_fn(|_| rng.gen_range(0.0..1.0)))
        .collect()
}

// ---------------------------------------------------------------------------
// brute-force references
// ---------------------------------------------------------------------------

fn brute_closest<N: CoordNum>(points: &PointArray<N>, query: [N; 3]) -> Option<(u32, N)> {
    let mut best = None;
    for id in 0..points.num_points() as u32 {
        let dist2 = distance2(points.get_point(id), query);
        if best.map_or(true, |(_, best_dist2)| dist2 < best_dist2) {
            best = Some((id, dist2));
        }
    }
    best
}

fn brute_within<N: CoordNum>(points: &PointArray<N>, radius2: N, query: [N; 3]) -> Vec<u32> {
    (0..points.num_points() as u32)
        .filter(|&id| distance2(points.get_point(id), query) <= radius2)
        .collect()
}

fn brute_nearest_n<N: CoordNum>(points: &PointArray<N>, n: usize, query: [N; 3]) -> Vec<u32> {
    let mut pairs: Vec<(N, u32)> = (0..points.num_points() as u32)
        .map(|id| (distance2(points.get_point(id), query), id))
        .collect();
    pairs.sort_by(|a, b| a.partial_cmp(b).unwrap());
    pairs.truncate(n);
    pairs.into_iter().map(|(_, id)| id).collect()
}

// ---------------------------------------------------------------------------
// structural invariants
// ---------------------------------------------------------------------------

fn check_invariants(locator: &IncrementalOctreeLocator<f64>, expected_ids: &[u32]) {
    let root = locator.root().expect("locator has a tree");
    let points = locator.points().expect("locator has a point array");
    let points = points.borrow();

    check_node(root, &points);

    let mut ids = Vec::new();
    root.export_all_point_ids(&mut ids);
    ids.sort_unstable();
    let mut expected = expected_ids.to_vec();
    expected.sort_unstable();
    assert_eq!(ids, expected, "leaves hold exactly the inserted ids");

    for &id in expected_ids {
        assert!(
            root.contains_point(points.get_point(id)),
            "root bounds cover point {id}"
        );
    }
}

fn check_node(node: &OctreeNode<f64>, points: &PointArray<f64>) {
    if node.num_points() > 0 {
        for axis in 0..3 {
            assert!(
                node.min_data_bounds()[axis] >= node.min_bounds()[axis]
                    && node.max_data_bounds()[axis] <= node.max_bounds()[axis],
                "data bounds stay inside geometric bounds"
            );
        }
    }

    match node.children() {
        None => {
            let ids = node.point_ids().unwrap();
            assert_eq!(ids.len(), node.num_points(), "leaf counter matches id set");
            for &id in ids {
                assert!((id as usize) < points.num_points(), "id {id} is in the store");
            }
        }
        Some(children) => {
            let total: usize = children.iter().map(|child| child.num_points()).sum();
            assert_eq!(total, node.num_points(), "internal counter sums children");

            for axis in 0..3 {
                let min_union = children
                    .iter()
                    .filter(|child| child.num_points() > 0)
                    .map(|child| child.min_data_bounds()[axis])
                    .fold(f64::INFINITY, f64::min);
                let max_union = children
                    .iter()
                    .filter(|child| child.num_points() > 0)
                    .map(|child| child.max_data_bounds()[axis])
                    .fold(f64::NEG_INFINITY, f64::max);
                assert_eq!(
                    node.min_data_bounds()[axis],
                    min_union,
                    "parent data bounds are the union of the children's"
                );
                assert_eq!(node.max_data_bounds()[axis], max_union);
            }

            for child in children.iter() {
                check_node(child, points);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// insertion scenarios
// ---------------------------------------------------------------------------

#[test]
fn unique_insertion_at_zero_tolerance_merges_exact_duplicates() {
    let (points, mut locator) = unit_cube_locator(0.);

    assert_eq!(locator.insert_unique_point([0.1, 0.1, 0.1]), (true, 0));
    assert_eq!(locator.insert_unique_point([0.9, 0.9, 0.9]), (true, 1));
    assert_eq!(locator.insert_unique_point([0.1, 0.1, 0.1]), (false, 0));

    assert_eq!(points.borrow().num_points(), 2);
    assert_eq!(locator.num_points(), 2);
}

#[test]
fn unique_insertion_merges_within_tolerance() {
    let (points, mut locator) = unit_cube_locator(0.05);

    assert_eq!(locator.insert_unique_point([0.1, 0.1, 0.1]), (true, 0));
    // squared distance 4e-4 <= 2.5e-3
    assert_eq!(locator.insert_unique_point([0.12, 0.1, 0.1]), (false, 0));

    assert_eq!(points.borrow().num_points(), 1);
}

#[test]
fn unique_insertion_is_idempotent() {
    let (points, mut locator) = unit_cube_locator(0.001);

    let (inserted, id) = locator.insert_unique_point([0.3, 0.7, 0.2]);
    assert!(inserted);
    let (inserted, same_id) = locator.insert_unique_point([0.3, 0.7, 0.2]);
    assert!(!inserted);
    assert_eq!(id, same_id);
    assert_eq!(points.borrow().num_points(), 1);
}

#[test]
fn splitting_keeps_points_retrievable() {
    let (_points, mut locator) = {
        let points = PointArray::<f64>::new().into_shared();
        let mut locator = IncrementalOctreeLocator::new();
        locator.set_max_points_per_leaf(2);
        locator
            .init_point_insertion(points.clone(), &[0., 1., 0., 1., 0., 1.])
            .unwrap();
        (points, locator)
    };

    let coords = [[0.1, 0.1, 0.1], [0.2, 0.1, 0.1], [0.3, 0.1, 0.1]];
    for coord in coords {
        locator.insert_next_point(coord);
    }

    assert!(!locator.root().unwrap().is_leaf(), "the root must split");
    check_invariants(&locator, &[0, 1, 2]);

    for (id, coord) in coords.iter().enumerate() {
        assert_eq!(locator.find_closest_point(*coord), Some(id as u32));
        assert_eq!(locator.is_inserted_point(*coord), Some(id as u32));
    }
}

#[test]
fn deep_splits_preserve_invariants() {
    let mut rng = StdRng::seed_from_u64(13);
    let coords = random_cloud(&mut rng, 400);

    let points = PointArray::<f64>::new().into_shared();
    let mut locator = IncrementalOctreeLocator::new();
    locator.set_max_points_per_leaf(8);
    locator
        .init_point_insertion(points, &[0., 1., 0., 1., 0., 1.])
        .unwrap();
    for &coord in &coords {
        locator.insert_next_point(coord);
    }

    let ids: Vec<u32> = (0..coords.len() as u32).collect();
    check_invariants(&locator, &ids);
}

#[test]
fn tolerance_monotonicity() {
    let mut rng = StdRng::seed_from_u64(99);
    let coords = random_cloud(&mut rng, 40);

    let build = |tolerance: f64| {
        let (_, mut locator) = unit_cube_locator(tolerance);
        for &coord in &coords {
            locator.insert_next_point(coord);
        }
        locator
    };
    let tight = build(0.01);
    let loose = build(0.1);

    for _ in 0..200 {
        let probe: [f64; 3] = std::array::from_fn(|_| rng.gen_range(0.0..1.0));
        if tight.is_inserted_point(probe).is_some() {
            assert!(
                loose.is_inserted_point(probe).is_some(),
                "a match at the tighter tolerance implies one at the looser"
            );
        }
    }
}

// ---------------------------------------------------------------------------
// query scenarios
// ---------------------------------------------------------------------------

#[test]
fn corner_ties_break_towards_the_first_insertion() {
    let (_, mut locator) = unit_cube_locator(0.);
    for corner in 0..8u32 {
        let coord = std::array::from_fn(|axis| {
            if corner >> axis & 1 == 1 {
                0.99
            } else {
                0.01
            }
        });
        locator.insert_next_point(coord);
    }

    // all eight corners are equidistant from the center
    assert_eq!(locator.find_closest_point([0.5, 0.5, 0.5]), Some(0));
    assert_eq!(
        locator.find_closest_n_points(8, [0.5, 0.5, 0.5]),
        vec![0, 1, 2, 3, 4, 5, 6, 7]
    );
}

#[test]
fn grid_radius_search_finds_the_axis_neighborhood() {
    let (_, locator) = grid_locator();

    let mut ids = locator.find_points_within_radius(0.12, [0.5, 0.5, 0.5]);
    ids.sort_unstable();
    // the center point and its six axis-aligned neighbors; the face
    // diagonals sit at d^2 = 0.02 > 0.12^2
    assert_eq!(ids, vec![455, 545, 554, 555, 556, 565, 655]);
}

#[test]
fn closest_point_far_outside_the_octree() {
    let (points, locator) = grid_locator();

    let (id, dist2) = locator.find_closest_point_and_dist2([10., 10., 10.]).unwrap();
    assert_eq!(id, 999);
    assert_eq!(points.borrow().get_point(id), [0.9, 0.9, 0.9]);
    let expected = 3. * 9.1f64 * 9.1;
    assert!((dist2 - expected).abs() < 1e-9);
}

#[test]
fn closest_inserted_point_requires_containment() {
    let (_, locator) = grid_locator();

    assert_eq!(
        locator.find_closest_inserted_point([0.51, 0.52, 0.49]),
        Some(555)
    );
    assert_eq!(locator.find_closest_inserted_point([10., 10., 10.]), None);
}

#[test]
fn closest_point_within_radius_respects_the_radius() {
    let (_, locator) = grid_locator();

    let (id, dist2) = locator
        .find_closest_point_within_radius(0.2, [0.52, 0.5, 0.5])
        .unwrap();
    assert_eq!(id, 555);
    assert!((dist2 - 0.02f64 * 0.02).abs() < 1e-12);

    // nothing within reach of a far-away query
    assert!(locator
        .find_closest_point_within_radius(0.5, [5., 5., 5.])
        .is_none());
}

#[test]
fn queries_match_brute_force_on_a_random_cloud() {
    let mut rng = StdRng::seed_from_u64(7);
    let coords = random_cloud(&mut rng, 600);

    let points = PointArray::<f64>::new().into_shared();
    let mut locator = IncrementalOctreeLocator::new();
    locator.set_max_points_per_leaf(16);
    locator
        .init_point_insertion(points.clone(), &[0., 1., 0., 1., 0., 1.])
        .unwrap();
    for &coord in &coords {
        locator.insert_next_point(coord);
    }

    let queries: Vec<[f64; 3]> = random_cloud(&mut rng, 20)
        .into_iter()
        .chain([[2., 3., -1.], [-0.2, 0.5, 0.5], [1.4, 1.4, 1.4]])
        .collect();

    let store = points.borrow();
    for &query in &queries {
        let (_, expected_dist2) = brute_closest(&store, query).unwrap();
        let (found, dist2) = locator.find_closest_point_and_dist2(query).unwrap();
        assert_eq!(dist2, expected_dist2, "closest distance at {query:?}");
        assert_eq!(distance2(store.get_point(found), query), expected_dist2);

        for radius in [0.05, 0.2, 0.6] {
            let mut ids = locator.find_points_within_radius(radius, query);
            ids.sort_unstable();
            let mut expected = brute_within(&store, radius * radius, query);
            expected.sort_unstable();
            assert_eq!(ids, expected, "radius {radius} at {query:?}");

            let closest_in_radius = locator.find_closest_point_within_radius(radius, query);
            match brute_closest(&store, query) {
                Some((_, best)) if best <= radius * radius => {
                    let (_, dist2) = closest_in_radius.unwrap();
                    assert_eq!(dist2, best);
                }
                _ => assert!(closest_in_radius.is_none()),
            }
        }

        for n in [1, 5, 32] {
            assert_eq!(
                locator.find_closest_n_points(n, query),
                brute_nearest_n(&store, n, query),
                "{n} nearest at {query:?}"
            );
        }
    }
}

#[test]
fn f32_store_round_trips_queries() {
    let points = PointArray::<f32>::new().into_shared();
    let mut locator = IncrementalOctreeLocator::new();
    locator
        .init_point_insertion(points.clone(), &[0., 1., 0., 1., 0., 1.])
        .unwrap();

    let coords: [[f32; 3]; 4] = [
        [0.25, 0.25, 0.25],
        [0.75, 0.25, 0.5],
        [0.5, 0.75, 0.75],
        [0.1, 0.9, 0.4],
    ];
    for coord in coords {
        locator.insert_next_point(coord);
    }

    assert_eq!(locator.find_closest_point([0.26, 0.24, 0.25]), Some(0));
    assert_eq!(
        locator.find_closest_n_points(2, [0.7, 0.3, 0.5]),
        brute_nearest_n(&points.borrow(), 2, [0.7, 0.3, 0.5])
    );

    // within the default tolerance in f32 as well
    let (inserted, id) = locator.insert_unique_point([0.25, 0.25, 0.25]);
    assert!(!inserted);
    assert_eq!(id, 0);
}

#[test]
fn clamped_and_empty_nearest_n_requests() {
    let (_, mut locator) = unit_cube_locator(0.);
    assert!(locator.find_closest_n_points(3, [0.5, 0.5, 0.5]).is_empty());

    locator.insert_next_point([0.2, 0.2, 0.2]);
    locator.insert_next_point([0.8, 0.8, 0.8]);

    // clamped to the two available points
    assert_eq!(
        locator.find_closest_n_points(5, [0.1, 0.1, 0.1]),
        vec![0, 1]
    );
    assert!(locator.find_closest_n_points(0, [0.1, 0.1, 0.1]).is_empty());
}

#[test]
fn empty_tree_queries_return_nothing() {
    let locator = IncrementalOctreeLocator::<f64>::new();
    assert_eq!(locator.find_closest_point([0.5, 0.5, 0.5]), None);
    assert!(locator.find_points_within_radius(1., [0.5, 0.5, 0.5]).is_empty());
    assert_eq!(locator.is_inserted_point([0.5, 0.5, 0.5]), None);
    assert_eq!(locator.num_points(), 0);
    assert_eq!(locator.bounds(), None);

    let (_, initialized) = unit_cube_locator(0.);
    assert_eq!(initialized.find_closest_point([0.5, 0.5, 0.5]), None);
    assert!(initialized
        .find_closest_point_within_radius(10., [0.5, 0.5, 0.5])
        .is_none());
}

// ---------------------------------------------------------------------------
// initialization
// ---------------------------------------------------------------------------

#[test]
fn init_rejects_malformed_bounds() {
    let mut locator = IncrementalOctreeLocator::<f64>::new();
    let points = PointArray::<f64>::new().into_shared();

    assert!(locator
        .init_point_insertion(points.clone(), &[1., 0., 0., 1., 0., 1.])
        .is_err());
    assert!(locator
        .init_point_insertion(points, &[0., f64::NAN, 0., 1., 0., 1.])
        .is_err());
}

#[test]
fn flat_bounds_are_inflated_to_a_slab() {
    let mut locator = IncrementalOctreeLocator::<f64>::new();
    let points = PointArray::<f64>::new().into_shared();
    locator
        .init_point_insertion(points, &[0., 1., 0., 1., 0., 0.001])
        .unwrap();

    let bounds = locator.bounds().unwrap();
    // the z axis is pushed out to a tenth of the longest extent
    assert!((bounds[4] - (0.001 - 0.1)).abs() < 1e-12);
    assert!((bounds[5] - 0.1).abs() < 1e-12);
    // full-size axes only get the fudge pull-down
    assert!((bounds[0] - (-1e-5)).abs() < 1e-12);
    assert_eq!(bounds[1], 1.);
}

#[test]
fn cubic_roots_inflate_the_shorter_axes() {
    let mut locator = IncrementalOctreeLocator::<f64>::new();
    locator.set_build_cubic(true);
    let points = PointArray::<f64>::new().into_shared();
    locator
        .init_point_insertion(points, &[0., 2., 0., 1., 0., 0.5])
        .unwrap();

    let bounds = locator.bounds().unwrap();
    let fudge = 2. * 1e-5;
    assert!((bounds[0] - (0. - fudge)).abs() < 1e-12);
    assert_eq!(bounds[1], 2.);
    assert!((bounds[2] - (-0.5 - fudge)).abs() < 1e-12);
    assert_eq!(bounds[3], 1.5);
    assert!((bounds[4] - (-0.75 - fudge)).abs() < 1e-12);
    assert_eq!(bounds[5], 1.25);
}

#[test]
fn boundary_points_land_inside_the_root() {
    let (_, mut locator) = unit_cube_locator(0.);
    // exactly on the lower input bound: admitted thanks to the fudge fix
    let id = locator.insert_next_point([0., 0., 0.]);
    assert_eq!(locator.find_closest_point([0., 0., 0.]), Some(id));
    check_invariants(&locator, &[0]);
}

// ---------------------------------------------------------------------------
// building from a dataset
// ---------------------------------------------------------------------------

struct NotAPointSetData;

impl PointDataSet<f64> for NotAPointSetData {
    fn points(&self) -> Option<SharedPoints<f64>> {
        None
    }

    fn mod_stamp(&self) -> u64 {
        0
    }
}

#[test]
fn build_locator_rejects_other_datasets() {
    let mut locator = IncrementalOctreeLocator::<f64>::new();
    assert!(matches!(
        locator.build_locator(&NotAPointSetData),
        Err(OctreeIndexError::NotAPointSet)
    ));

    let empty = PointSet::new(PointArray::<f64>::new().into_shared());
    assert!(matches!(
        locator.build_locator(&empty),
        Err(OctreeIndexError::General(_))
    ));
}

#[test]
fn build_locator_indexes_the_dataset_and_short_circuits() {
    let mut rng = StdRng::seed_from_u64(21);
    let coords = random_cloud(&mut rng, 50);

    let points = PointArray::<f64>::new().into_shared();
    for &coord in &coords {
        points.borrow_mut().insert_next_point(coord);
    }
    let mut dataset = PointSet::new(points.clone());

    let mut locator = IncrementalOctreeLocator::new();
    locator.build_locator(&dataset).unwrap();
    assert_eq!(locator.num_points(), 50);

    let store = points.borrow();
    for &query in coords.iter().take(5) {
        assert_eq!(
            locator.find_closest_point_and_dist2(query).map(|(_, d2)| d2),
            brute_closest(&store, query).map(|(_, d2)| d2)
        );
    }
    drop(store);

    // a second call is a no-op: the extra unchecked insertion survives
    let first_point = points.borrow().get_point(0);
    locator.insert_point(0, first_point);
    assert_eq!(locator.num_points(), 51);
    locator.build_locator(&dataset).unwrap();
    assert_eq!(locator.num_points(), 51);

    // touching the dataset forces a rebuild
    dataset.mark_modified();
    locator.build_locator(&dataset).unwrap();
    assert_eq!(locator.num_points(), 50);
}
