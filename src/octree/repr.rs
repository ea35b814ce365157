//! Quad-mesh representation of the octree's node boxes, for inspection and
//! debug rendering.

use std::collections::VecDeque;

use tracing::error;

use crate::error::{OctreeIndexError, Result};
use crate::octree::locator::IncrementalOctreeLocator;
use crate::octree::node::OctreeNode;
use crate::r#type::CoordNum;

/// Face-vertex lookup for a box whose corner `v` carries the bit code
/// `x = v & 1, y = v & 2, z = v & 4`; each row is one face quad.
const NODE_FACES_LUT: [[u32; 4]; 6] = [
    [0, 1, 5, 4],
    [0, 4, 6, 2],
    [6, 7, 3, 2],
    [1, 3, 7, 5],
    [2, 3, 1, 0],
    [4, 5, 7, 6],
];

/// A caller-owned polygon container receiving the output of
/// [`generate_representation`][IncrementalOctreeLocator::generate_representation]:
/// eight corner vertices and six quads per emitted node box.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PolyData<N: CoordNum> {
    points: Vec<[N; 3]>,
    quads: Vec<[u32; 4]>,
}

impl<N: CoordNum> PolyData<N> {
    pub fn new() -> Self {
        Self {
            points: Vec::new(),
            quads: Vec::new(),
        }
    }

    pub fn points(&self) -> &[[N; 3]] {
        &self.points
    }

    pub fn quads(&self) -> &[[u32; 4]] {
        &self.quads
    }

    pub fn clear(&mut self) {
        self.points.clear();
        self.quads.clear();
    }

    fn insert_next_point(&mut self, point: [N; 3]) -> u32 {
        let id = self.points.len();
        self.points.push(point);
        id.try_into().unwrap()
    }

    fn insert_next_quad(&mut self, quad: [u32; 4]) {
        self.quads.push(quad);
    }
}

impl<N: CoordNum> IncrementalOctreeLocator<N> {
    /// Replace the contents of `polys` with one box per node at depth
    /// `node_level` (the root is level 0). Subtrees shallower than the
    /// requested level contribute nothing.
    pub fn generate_representation(
        &self,
        node_level: usize,
        polys: &mut PolyData<N>,
    ) -> Result<()> {
        let Some(root) = self.root() else {
            error!("the octree is not yet available");
            return Err(OctreeIndexError::General(
                "the octree is not yet available".to_string(),
            ));
        };

        let mut level_nodes = Vec::new();
        let mut queue: VecDeque<(&OctreeNode<N>, usize)> = VecDeque::new();
        queue.push_back((root, 0));
        while let Some((node, level)) = queue.pop_front() {
            if level == node_level {
                level_nodes.push(node);
            } else if let Some(children) = node.children() {
                for child in children.iter() {
                    queue.push_back((child, level + 1));
                }
            }
        }

        polys.clear();
        for node in level_nodes {
            add_polys(node, polys);
        }
        Ok(())
    }
}

fn add_polys<N: CoordNum>(node: &OctreeNode<N>, polys: &mut PolyData<N>) {
    let min_bounds = node.min_bounds();
    let max_bounds = node.max_bounds();

    let mut corner_ids = [0u32; 8];
    for (corner, corner_id) in corner_ids.iter_mut().enumerate() {
        let coord = std::array::from_fn(|axis| {
            if corner >> axis & 1 == 1 {
                max_bounds[axis]
            } else {
                min_bounds[axis]
            }
        });
        *corner_id = polys.insert_next_point(coord);
    }

    for face in NODE_FACES_LUT {
        polys.insert_next_quad(face.map(|corner| corner_ids[corner as usize]));
    }
}
