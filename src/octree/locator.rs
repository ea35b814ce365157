use std::collections::VecDeque;

use smallvec::SmallVec;
use tracing::{debug, error, warn};

use crate::error::{OctreeIndexError, Result};
use crate::octree::node::{distance2, OctreeNode};
use crate::octree::sort::SortPoints;
use crate::points::{next_stamp, PointArray, PointDataSet, SharedPoints};
use crate::r#type::{cast, CoordNum};

/// Default leaf capacity in [`IncrementalOctreeLocator::new`].
pub const DEFAULT_MAX_POINTS_PER_LEAF: usize = 128;

/// Default merge tolerance in [`IncrementalOctreeLocator::new`], yielding a
/// squared tolerance of `1e-6`.
pub const DEFAULT_TOLERANCE: f64 = 0.001;

/// An incremental octree point locator over a shared [`PointArray`].
///
/// The locator supports online insertion (with or without tolerance-based
/// merging of near-duplicates) and closest-point, closest-within-radius,
/// n-nearest and all-within-radius queries. All query pruning runs on the
/// per-node *data* bounds (the boxes tight to the inserted points), so
/// lookups stay cheap even when points occupy a small corner of the root
/// box.
///
/// Call [`init_point_insertion`][Self::init_point_insertion] with a root box
/// covering every point you will ever insert, then mix insertions and
/// queries freely. Inserting a point outside the root box is not checked
/// and yields unspecified query results.
#[derive(Debug)]
pub struct IncrementalOctreeLocator<N: CoordNum> {
    points: Option<SharedPoints<N>>,
    root: Option<Box<OctreeNode<N>>>,
    max_points_per_leaf: usize,
    tolerance: N,
    insert_tolerance2: N,
    build_cubic: bool,
    fudge_factor: N,
    max_dim_size: N,
    build_stamp: u64,
    config_stamp: u64,
}

impl<N: CoordNum> Default for IncrementalOctreeLocator<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N: CoordNum> IncrementalOctreeLocator<N> {
    pub fn new() -> Self {
        let tolerance = cast::<N>(DEFAULT_TOLERANCE);
        Self {
            points: None,
            root: None,
            max_points_per_leaf: DEFAULT_MAX_POINTS_PER_LEAF,
            tolerance,
            insert_tolerance2: tolerance * tolerance,
            build_cubic: false,
            fudge_factor: N::zero(),
            max_dim_size: N::zero(),
            build_stamp: 0,
            config_stamp: next_stamp(),
        }
    }

    /// The maximum number of points a leaf holds before it splits.
    pub fn max_points_per_leaf(&self) -> usize {
        self.max_points_per_leaf
    }

    pub fn set_max_points_per_leaf(&mut self, max_points_per_leaf: usize) {
        self.max_points_per_leaf = max_points_per_leaf.max(1);
        self.config_stamp = next_stamp();
    }

    /// The distance below which [`insert_unique_point`][Self::insert_unique_point]
    /// merges a new point with an existing one. Takes effect at the next
    /// [`init_point_insertion`][Self::init_point_insertion].
    pub fn tolerance(&self) -> N {
        self.tolerance
    }

    pub fn set_tolerance(&mut self, tolerance: N) {
        self.tolerance = tolerance;
        self.config_stamp = next_stamp();
    }

    /// Whether the next [`init_point_insertion`][Self::init_point_insertion]
    /// inflates the shorter root axes so that all octants are cubes.
    pub fn build_cubic(&self) -> bool {
        self.build_cubic
    }

    pub fn set_build_cubic(&mut self, build_cubic: bool) {
        self.build_cubic = build_cubic;
        self.config_stamp = next_stamp();
    }

    /// The number of accepted insertions. Tolerance-merged insertions count
    /// here without growing the point array; consult this, not the array
    /// length, for the tree population.
    pub fn num_points(&self) -> usize {
        self.root.as_ref().map_or(0, |root| root.num_points())
    }

    /// Geometric bounds of the root box in
    /// `[xmin, xmax, ymin, ymax, zmin, zmax]` layout, or `None` before
    /// initialization.
    pub fn bounds(&self) -> Option<[N; 6]> {
        let root = self.root.as_deref()?;
        let min_bounds = root.min_bounds();
        let max_bounds = root.max_bounds();
        Some([
            min_bounds[0],
            max_bounds[0],
            min_bounds[1],
            max_bounds[1],
            min_bounds[2],
            max_bounds[2],
        ])
    }

    /// The point array this locator reads and appends to, if initialized.
    pub fn points(&self) -> Option<SharedPoints<N>> {
        self.points.clone()
    }

    pub(crate) fn root(&self) -> Option<&OctreeNode<N>> {
        self.root.as_deref()
    }

    /// Drop the tree and the point array reference. Idempotent.
    pub fn free_search_structure(&mut self) {
        self.root = None;
        self.points = None;
    }

    // ------------------------------------------------------------------
    // Point insertion
    // ------------------------------------------------------------------

    /// Destroy any existing tree and prepare for insertion into `points`,
    /// with a root box derived from `bounds`
    /// (`[xmin, xmax, ymin, ymax, zmin, zmax]`).
    ///
    /// The box is adjusted so that the containment predicate
    /// `min < p <= max` admits points sitting exactly on the lower input
    /// bounds: any axis flatter than a tenth of the longest one is inflated
    /// to that width, and the remaining lower bounds are pulled down by the
    /// fudge factor (`1e-5` of the longest extent). With
    /// [`build_cubic`][Self::set_build_cubic] set, the shorter axes are
    /// first inflated symmetrically to the longest.
    pub fn init_point_insertion(
        &mut self,
        points: SharedPoints<N>,
        bounds: &[N; 6],
    ) -> Result<()> {
        if bounds.iter().any(|b| !b.is_finite()) {
            return Err(OctreeIndexError::General(
                "insertion bounds must be finite".to_string(),
            ));
        }
        if bounds[0] > bounds[1] || bounds[2] > bounds[3] || bounds[4] > bounds[5] {
            return Err(OctreeIndexError::General(
                "insertion bounds are inverted".to_string(),
            ));
        }

        self.free_search_structure();

        self.insert_tolerance2 = self.tolerance * self.tolerance;

        let mut min_bounds = [bounds[0], bounds[2], bounds[4]];
        let mut max_bounds = [bounds[1], bounds[3], bounds[5]];
        let mut dim_sizes: [N; 3] = std::array::from_fn(|axis| max_bounds[axis] - min_bounds[axis]);
        let max_dim_size = dim_sizes.iter().fold(N::zero(), |acc, &dim| acc.max(dim));

        if self.build_cubic {
            // make the root a cube, and hence every octant a cube too
            let half = cast::<N>(0.5);
            for axis in 0..3 {
                if dim_sizes[axis] != max_dim_size {
                    let delta = max_dim_size - dim_sizes[axis];
                    min_bounds[axis] = min_bounds[axis] - half * delta;
                    max_bounds[axis] = max_bounds[axis] + half * delta;
                    dim_sizes[axis] = max_dim_size;
                }
            }
        }

        self.max_dim_size = max_dim_size;
        self.fudge_factor = max_dim_size * cast::<N>(10e-6);

        let min_side_size = max_dim_size * cast::<N>(10e-2);
        for axis in 0..3 {
            if dim_sizes[axis] < min_side_size {
                // a slab: push the flat axis out to a tenth of the longest
                let lower = min_bounds[axis];
                min_bounds[axis] = max_bounds[axis] - min_side_size;
                max_bounds[axis] = lower + min_side_size;
            } else {
                min_bounds[axis] = min_bounds[axis] - self.fudge_factor;
            }
        }

        self.root = Some(Box::new(OctreeNode::new(min_bounds, max_bounds)));
        self.points = Some(points);
        Ok(())
    }

    /// Append `point` to the point array and insert the resulting id. No
    /// tolerance check is performed.
    pub fn insert_next_point(&mut self, point: [N; 3]) -> u32 {
        let points = self.shared_points();
        let id = points.borrow_mut().insert_next_point(point);
        self.insert_into_tree(&points.borrow(), point, id);
        id
    }

    /// Insert `id`, whose coordinate must already sit at that index of the
    /// point array, without appending anything. No tolerance check is
    /// performed.
    pub fn insert_point(&mut self, id: u32, point: [N; 3]) {
        let points = self.shared_points();
        self.insert_into_tree(&points.borrow(), point, id);
    }

    /// Insert `point` unless an already-inserted point lies within the
    /// tolerance, in which case that point's id is returned instead.
    ///
    /// Returns `(true, id)` when the point was appended and inserted and
    /// `(false, id)` when it was merged with an existing point.
    pub fn insert_unique_point(&mut self, point: [N; 3]) -> (bool, u32) {
        let points = self.shared_points();
        let existing = {
            let root = self
                .root
                .as_deref()
                .expect("point insertion is not initialized; call init_point_insertion first");
            self.locate_inserted_point(&points.borrow(), root, point)
        };
        match existing {
            Some(id) => (false, id),
            None => {
                let id = points.borrow_mut().insert_next_point(point);
                self.insert_into_tree(&points.borrow(), point, id);
                (true, id)
            }
        }
    }

    /// The id of an already-inserted point within the tolerance of `point`,
    /// if any. With zero tolerance this is an exact comparison in the point
    /// array's element type.
    pub fn is_inserted_point(&self, point: [N; 3]) -> Option<u32> {
        let root = self.root.as_deref()?;
        let points = self.points.as_ref()?.borrow();
        self.locate_inserted_point(&points, root, point)
    }

    fn shared_points(&self) -> SharedPoints<N> {
        self.points
            .clone()
            .expect("point insertion is not initialized; call init_point_insertion first")
    }

    fn insert_into_tree(&mut self, points: &PointArray<N>, point: [N; 3], id: u32) {
        let root = self
            .root
            .as_mut()
            .expect("point insertion is not initialized; call init_point_insertion first");
        root.insert_point(points, point, id, self.max_points_per_leaf);
    }

    fn locate_inserted_point(
        &self,
        points: &PointArray<N>,
        root: &OctreeNode<N>,
        point: [N; 3],
    ) -> Option<u32> {
        // The containing leaf always exists: the root box was sized to cover
        // every point that may be inserted.
        let leaf = leaf_container(root, point);

        if self.insert_tolerance2 == N::zero() {
            return find_duplicate_point_in_leaf(points, leaf, point);
        }

        let (mut point_id, mut min_dist2) = closest_point_in_leaf(points, leaf, point);
        if min_dist2 == N::zero() {
            return point_id;
        }

        // No duplicate in this leaf; capture possibly closer points in the
        // neighboring nodes when the tolerance ball sticks out of the leaf.
        if leaf.distance2_to_inner_boundary(point, root, self.fudge_factor)
            < self.insert_tolerance2
        {
            let mut ext_dist2 = self.max_dim_size * self.max_dim_size * cast::<N>(4.0);
            let ext_id = closest_point_in_sphere(
                points,
                root,
                point,
                self.insert_tolerance2,
                Some(leaf),
                &mut ext_dist2,
                Some(self.insert_tolerance2),
            );
            if ext_dist2 < min_dist2 {
                min_dist2 = ext_dist2;
                point_id = ext_id;
            }
        }

        if min_dist2 <= self.insert_tolerance2 {
            point_id
        } else {
            None
        }
    }

    // ------------------------------------------------------------------
    // Point location
    // ------------------------------------------------------------------

    /// The id of the inserted point closest to `point`, or `None` when the
    /// tree is empty.
    pub fn find_closest_point(&self, point: [N; 3]) -> Option<u32> {
        self.find_closest_point_and_dist2(point).map(|(id, _)| id)
    }

    /// Like [`find_closest_point`][Self::find_closest_point], also returning
    /// the squared distance to the found point.
    pub fn find_closest_point_and_dist2(&self, point: [N; 3]) -> Option<(u32, N)> {
        let root = self.root.as_deref()?;
        if root.num_points() == 0 {
            return None;
        }
        let points = self.points.as_ref()?.borrow();

        if root.contains_point(point) {
            return self.closest_point_inside(&points, root, point);
        }

        // The query is outside the octree: seed from the leaf nearest to it.
        // The projection onto the root's data box may fall a fudge outside
        // the geometric box, so clamp it clearly inside before descending.
        let mut seed = root.clamp_to_data_bounds(point);
        let min_bounds = root.min_bounds();
        let max_bounds = root.max_bounds();
        for axis in 0..3 {
            if seed[axis] <= min_bounds[axis] {
                seed[axis] = min_bounds[axis] + self.fudge_factor;
            } else if seed[axis] >= max_bounds[axis] {
                seed[axis] = max_bounds[axis] - self.fudge_factor;
            }
        }

        let leaf = leaf_container(root, seed);
        let (mut point_id, mut min_dist2) = closest_point_in_leaf(&points, leaf, point);

        let mut else_dist2 = min_dist2 * cast::<N>(1.1);
        let else_id = closest_point_in_sphere(
            &points,
            root,
            point,
            min_dist2,
            Some(leaf),
            &mut else_dist2,
            None,
        );
        if else_dist2 < min_dist2 {
            point_id = else_id;
            min_dist2 = else_dist2;
        }

        point_id.map(|id| (id, min_dist2))
    }

    /// The id of the closest inserted point when `point` lies inside the
    /// octree, `None` otherwise. Unlike
    /// [`find_closest_point`][Self::find_closest_point], queries outside the
    /// root box are not answered.
    pub fn find_closest_inserted_point(&self, point: [N; 3]) -> Option<u32> {
        let root = self.root.as_deref()?;
        if root.num_points() == 0 || !root.contains_point(point) {
            return None;
        }
        let points = self.points.as_ref()?.borrow();
        self.closest_point_inside(&points, root, point)
            .map(|(id, _)| id)
    }

    /// Seed from the leaf containing `point`, then widen the search to
    /// sibling subtrees only when the best candidate ball crosses the leaf's
    /// inner boundary.
    fn closest_point_inside(
        &self,
        points: &PointArray<N>,
        root: &OctreeNode<N>,
        point: [N; 3],
    ) -> Option<(u32, N)> {
        let leaf = leaf_container(root, point);
        let (mut point_id, mut min_dist2) = closest_point_in_leaf(points, leaf, point);

        if min_dist2 > N::zero()
            && leaf.distance2_to_inner_boundary(point, root, self.fudge_factor) < min_dist2
        {
            let mut else_dist2 = min_dist2 * cast::<N>(1.1);
            let else_id = closest_point_in_sphere(
                points,
                root,
                point,
                min_dist2,
                Some(leaf),
                &mut else_dist2,
                None,
            );
            if else_dist2 < min_dist2 {
                point_id = else_id;
                min_dist2 = else_dist2;
            }
        }

        point_id.map(|id| (id, min_dist2))
    }

    /// The closest inserted point within `radius` of `point`, with its
    /// squared distance, or `None` when no point lies that close.
    pub fn find_closest_point_within_radius(
        &self,
        radius: N,
        point: [N; 3],
    ) -> Option<(u32, N)> {
        self.find_closest_point_within_squared_radius(radius * radius, point)
    }

    /// [`find_closest_point_within_radius`][Self::find_closest_point_within_radius]
    /// with the radius already squared.
    pub fn find_closest_point_within_squared_radius(
        &self,
        radius2: N,
        point: [N; 3],
    ) -> Option<(u32, N)> {
        let root = self.root.as_deref()?;
        if root.num_points() == 0 {
            return None;
        }
        let points = self.points.as_ref()?.borrow();

        let mut min_dist2 = radius2 * cast::<N>(1.1);
        let point_id =
            closest_point_in_sphere(&points, root, point, radius2, None, &mut min_dist2, None)?;
        Some((point_id, min_dist2))
    }

    /// All ids within `radius` of `point`, in no particular order.
    pub fn find_points_within_radius(&self, radius: N, point: [N; 3]) -> Vec<u32> {
        self.find_points_within_squared_radius(radius * radius, point)
    }

    /// [`find_points_within_radius`][Self::find_points_within_radius] with
    /// the radius already squared.
    pub fn find_points_within_squared_radius(&self, radius2: N, point: [N; 3]) -> Vec<u32> {
        let mut ids = Vec::new();
        if let (Some(root), Some(points)) = (self.root.as_deref(), self.points.as_ref()) {
            collect_points_within_squared_radius(&points.borrow(), root, radius2, point, &mut ids);
        }
        ids
    }

    /// The `num_requested` inserted points closest to `point`, ordered by
    /// ascending squared distance with ties broken by insertion order.
    /// Requests beyond the tree population are clamped with a warning.
    pub fn find_closest_n_points(&self, num_requested: usize, point: [N; 3]) -> Vec<u32> {
        let total = self.num_points();
        let mut num_requested = num_requested;
        if num_requested > total {
            warn!(
                num_requested,
                available = total,
                "number of requested points exceeds that of available points"
            );
            num_requested = total;
        }
        if num_requested == 0 {
            warn!("no points requested or the octree is still empty");
            return Vec::new();
        }

        let root = self.root.as_deref().unwrap();
        let points = self.points.as_ref().unwrap().borrow();

        // Find the lowest start node: the smallest subtree that still holds
        // `num_requested` points and, when possible, contains the query. The
        // descent switches from the containment rule to the nearest-data
        // rule when it runs into an empty octant, since the points of
        // interest then sit in a sibling.
        let mut this_node = root;
        let mut parent = root;
        let mut num_points = this_node.num_points();
        'search: loop {
            if this_node.contains_point(point) {
                loop {
                    let Some(children) = this_node.children() else {
                        break;
                    };
                    if num_points <= num_requested {
                        break;
                    }
                    parent = this_node;
                    this_node = &children[this_node.child_index(point)];
                    num_points = this_node.num_points();
                }

                if num_points > 0 {
                    if num_points < num_requested {
                        this_node = parent;
                    }
                    break 'search;
                }

                // The query sits in an empty octant; redirect to the sibling
                // closest in terms of data and continue with the outside
                // rule.
                let children = parent
                    .children()
                    .expect("the descent reached an empty child of this parent");
                let mut min_dist2 = N::infinity();
                for child in children.iter() {
                    let dist2 = child.distance2_to_data_bounds(point);
                    if dist2 < min_dist2 {
                        min_dist2 = dist2;
                        this_node = child;
                    }
                }
            } else {
                loop {
                    if this_node.is_leaf() || num_points <= num_requested {
                        break;
                    }
                    parent = this_node;
                    let children = parent.children().unwrap();
                    let mut min_dist2 = N::infinity();
                    for child in children.iter() {
                        let dist2 = child.distance2_to_data_bounds(point);
                        if dist2 < min_dist2 {
                            min_dist2 = dist2;
                            this_node = child;
                        }
                    }
                    num_points = this_node.num_points();
                }

                if num_points < num_requested {
                    this_node = parent;
                }
                break 'search;
            }

            num_points = this_node.num_points();
        }
        let start_node = this_node;

        // Seed the sorter with every point of the start node.
        let mut sorter = SortPoints::new(num_requested);
        let mut id_buffer = Vec::with_capacity(start_node.num_points());
        start_node.export_all_point_ids(&mut id_buffer);
        for &id in &id_buffer {
            sorter.insert(distance2(points.get_point(id), point), id);
        }

        // Other nodes may still hold closer points; sweep the tree
        // breadth-first against the current cut-off, skipping the start
        // node.
        let mut queue = VecDeque::new();
        queue.push_back(root);
        let mut max_dist2 = sorter.largest_dist2();
        while let Some(node) = queue.pop_front() {
            if std::ptr::eq(node, start_node) {
                continue;
            }

            if let Some(children) = node.children() {
                for child in children.iter() {
                    if child.contains_point_by_data(point)
                        || child.distance2_to_data_bounds(point) < max_dist2
                    {
                        queue.push_back(child);
                    }
                }
            } else if node.distance2_to_data_bounds(point) < max_dist2 {
                id_buffer.clear();
                node.export_all_point_ids(&mut id_buffer);
                for &id in &id_buffer {
                    sorter.insert(distance2(points.get_point(id), point), id);
                }
                max_dist2 = sorter.largest_dist2();
            }
        }

        sorter.sorted_ids()
    }

    // ------------------------------------------------------------------
    // Building from a dataset
    // ------------------------------------------------------------------

    /// Initialize from the bounding box of `dataset`'s point array and
    /// insert every point without tolerance checking.
    ///
    /// A repeated call is a no-op while the tree is newer than both the
    /// dataset and this locator's configuration.
    pub fn build_locator(&mut self, dataset: &impl PointDataSet<N>) -> Result<()> {
        let Some(points) = dataset.points() else {
            error!("dataset is not a point set");
            return Err(OctreeIndexError::NotAPointSet);
        };

        let num_points = points.borrow().num_points();
        if num_points < 1 {
            error!("no points to build an octree with");
            return Err(OctreeIndexError::General(
                "no points to build an octree with".to_string(),
            ));
        }
        if num_points >= i32::MAX as usize {
            // point ids stay within 32 bits
            error!(num_points, "too many points for 32-bit point ids");
            return Err(OctreeIndexError::TooManyPoints(num_points));
        }

        if self.build_stamp > self.config_stamp && self.build_stamp > dataset.mod_stamp() {
            return Ok(());
        }
        debug!("creating an incremental octree");

        let bounds = points
            .borrow()
            .bounds()
            .expect("a non-empty point array has bounds");
        self.init_point_insertion(points.clone(), &bounds)?;

        {
            let store = points.borrow();
            let root = self
                .root
                .as_mut()
                .expect("init_point_insertion installed a root");
            for id in 0..num_points as u32 {
                // ids already exist in the array; nothing is appended
                root.insert_point(&store, store.get_point(id), id, self.max_points_per_leaf);
            }
        }

        self.build_stamp = next_stamp();
        Ok(())
    }
}

/// Descend along the octant codes to the leaf whose geometric box contains
/// `point`.
fn leaf_container<'a, N: CoordNum>(
    mut node: &'a OctreeNode<N>,
    point: [N; 3],
) -> &'a OctreeNode<N> {
    while let Some(children) = node.children() {
        node = &children[node.child_index(point)];
    }
    node
}

/// Linear scan of a leaf for the point closest to `point`. Returns the id
/// and its squared distance; the distance is huge when the leaf is empty so
/// the caller's minimum never picks it up.
fn closest_point_in_leaf<N: CoordNum>(
    points: &PointArray<N>,
    leaf: &OctreeNode<N>,
    point: [N; 3],
) -> (Option<u32>, N) {
    let mut point_id = None;
    // Seeded with the absolute maximum rather than anything octree-derived:
    // the query may be far outside the octree.
    let mut min_dist2 = N::max_value();

    let Some(ids) = leaf.point_ids() else {
        return (point_id, min_dist2);
    };
    for &id in ids {
        let dist2 = distance2(points.get_point(id), point);
        if dist2 < min_dist2 {
            min_dist2 = dist2;
            point_id = Some(id);
        }
        if min_dist2 == N::zero() {
            break;
        }
    }

    (point_id, min_dist2)
}

/// Depth-first search for the point closest to `point` within
/// `sqrt(radius2)`, skipping `mask_node` (a leaf already scanned by the
/// caller) and every empty subtree.
///
/// A subtree is visited when its data box is within the reference radius of
/// the query or its geometric box contains it. The reference radius is
/// `fixed_ref_dist2` when given (the tolerance variant) and the shrinking
/// running minimum otherwise. `min_dist2` carries the caller's initial bound
/// in and the achieved minimum out; the returned id is `None` when that
/// minimum did not reach `radius2`.
fn closest_point_in_sphere<N: CoordNum>(
    points: &PointArray<N>,
    root: &OctreeNode<N>,
    point: [N; 3],
    radius2: N,
    mask_node: Option<&OctreeNode<N>>,
    min_dist2: &mut N,
    fixed_ref_dist2: Option<N>,
) -> Option<u32> {
    let mut point_id = None;
    let mut stack: SmallVec<[&OctreeNode<N>; 32]> = SmallVec::new();
    stack.push(root);

    while *min_dist2 > N::zero() {
        let Some(check_node) = stack.pop() else {
            break;
        };

        if let Some(children) = check_node.children() {
            for child in children.iter() {
                // `radius2 + radius2` exceeds any reference radius, so empty
                // subtrees never qualify
                let dist_to_data = if child.num_points() > 0 {
                    child.distance2_to_data_bounds(point)
                } else {
                    radius2 + radius2
                };

                let ref_dist2 = fixed_ref_dist2.unwrap_or(*min_dist2);
                let masked = mask_node.is_some_and(|mask| std::ptr::eq(child, mask));
                if !masked && (dist_to_data <= ref_dist2 || child.contains_point(point)) {
                    stack.push(child);
                }
            }
        } else {
            let (leaf_id, leaf_dist2) = closest_point_in_leaf(points, check_node, point);
            if leaf_dist2 < *min_dist2 {
                *min_dist2 = leaf_dist2;
                point_id = leaf_id;
            }
        }
    }

    if *min_dist2 <= radius2 {
        point_id
    } else {
        None
    }
}

/// Exact-match scan used at zero tolerance: two points are duplicates iff
/// their coordinates are equal in the point array's element type.
fn find_duplicate_point_in_leaf<N: CoordNum>(
    points: &PointArray<N>,
    leaf: &OctreeNode<N>,
    point: [N; 3],
) -> Option<u32> {
    let ids = leaf.point_ids()?;
    ids.iter().copied().find(|&id| points.get_point(id) == point)
}

/// Tri-state recursion for the within-radius query: prune subtrees entirely
/// outside the sphere, bulk-export subtrees entirely inside, and only scan
/// leaves that straddle the boundary.
fn collect_points_within_squared_radius<N: CoordNum>(
    points: &PointArray<N>,
    node: &OctreeNode<N>,
    radius2: N,
    point: [N; 3],
    ids: &mut Vec<u32>,
) {
    let min_bounds = node.min_bounds();
    let max_bounds = node.max_bounds();

    // min distance to the node for an outside point, and max distance from
    // anywhere inside or outside
    let mut out_min_dist2 = N::zero();
    let mut max_dist2 = N::zero();
    for axis in 0..3 {
        let below = point[axis] - min_bounds[axis];
        let above = max_bounds[axis] - point[axis];
        if below < N::zero() {
            out_min_dist2 = out_min_dist2 + below * below;
            max_dist2 = max_dist2 + above * above;
        } else if above < N::zero() {
            out_min_dist2 = out_min_dist2 + above * above;
            max_dist2 = max_dist2 + below * below;
        } else if above > below {
            max_dist2 = max_dist2 + above * above;
        } else {
            max_dist2 = max_dist2 + below * below;
        }
    }

    if out_min_dist2 > radius2 {
        // entirely outside the search sphere
        return;
    }
    if max_dist2 <= radius2 {
        // entirely inside the search sphere
        node.export_all_point_ids(ids);
        return;
    }

    if let Some(children) = node.children() {
        for child in children.iter() {
            collect_points_within_squared_radius(points, child, radius2, point, ids);
        }
    } else if let Some(leaf_ids) = node.point_ids() {
        for &id in leaf_ids {
            if distance2(points.get_point(id), point) <= radius2 {
                ids.push(id);
            }
        }
    }
}
