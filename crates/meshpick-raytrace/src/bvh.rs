//! Bounding Volume Hierarchy over an indexed triangle list.
//!
//! Construction splits each range at the median triangle centroid along
//! the longest axis of the range's bounds. The tree is stored flat: node 0
//! is the root, and leaves reference contiguous slices of a separate
//! triangle-order array.

use std::ops::Range;

use meshpick_math::{Aabb3, Point3};

use crate::{intersect_triangle, triangle_vertices, Ray, TriangleHit};

/// Default maximum number of triangles per leaf.
pub const DEFAULT_LEAF_SIZE: usize = 12;

/// Default initial capacity of the traversal stack.
pub const DEFAULT_STACK_CAPACITY: usize = 128;

/// A flattened BVH node.
///
/// For internal nodes `left_or_start` / `right_or_count` are child node
/// indices; for leaves they are the start offset and length of the leaf's
/// slice of [`Bvh::leaf_triangles`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BvhNode {
    /// Bounds of every triangle below this node.
    pub bounds: Aabb3,
    /// Left child index, or first leaf-triangle slot.
    pub left_or_start: u32,
    /// Right child index, or leaf-triangle count.
    pub right_or_count: u32,
    /// Whether this node is a leaf.
    pub leaf: bool,
}

impl BvhNode {
    fn new_leaf(bounds: Aabb3, start: u32, count: u32) -> Self {
        Self {
            bounds,
            left_or_start: start,
            right_or_count: count,
            leaf: true,
        }
    }

    fn new_internal(bounds: Aabb3, left: u32, right: u32) -> Self {
        Self {
            bounds,
            left_or_start: left,
            right_or_count: right,
            leaf: false,
        }
    }

    /// Child node indices, or `None` for a leaf.
    pub fn children(&self) -> Option<(u32, u32)> {
        (!self.leaf).then_some((self.left_or_start, self.right_or_count))
    }

    /// Range into [`Bvh::leaf_triangles`], or `None` for an internal node.
    pub fn triangle_range(&self) -> Option<Range<usize>> {
        self.leaf.then(|| {
            let start = self.left_or_start as usize;
            start..start + self.right_or_count as usize
        })
    }
}

/// Counters collected while traversing a BVH.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TraversalStats {
    /// Nodes popped from the traversal stack.
    pub nodes_visited: usize,
    /// Ray/triangle tests performed.
    pub triangles_tested: usize,
}

/// Triangle ordinal paired with its centroid during construction.
#[derive(Debug, Clone, Copy)]
struct BuildTriangle {
    triangle: u32,
    centroid: Point3,
}

/// Bounding Volume Hierarchy for accelerated closest-hit ray queries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bvh {
    nodes: Vec<BvhNode>,
    leaf_triangles: Vec<u32>,
}

impl Bvh {
    /// Build a BVH over the triangles of `indices` (3 per triangle).
    ///
    /// Every index must be `< positions.len()`. A `leaf_size` of zero is
    /// treated as one. An empty triangle list yields an empty tree.
    pub fn build(positions: &[Point3], indices: &[u32], leaf_size: usize) -> Self {
        let triangle_count = indices.len() / 3;
        let mut bvh = Self::default();
        if triangle_count == 0 {
            return bvh;
        }

        let mut tris: Vec<BuildTriangle> = (0..triangle_count as u32)
            .map(|triangle| {
                let [a, b, c] = triangle_vertices(positions, indices, triangle);
                let centroid = Point3::from((a.coords + b.coords + c.coords) / 3.0);
                BuildTriangle { triangle, centroid }
            })
            .collect();

        bvh.nodes.reserve(2 * triangle_count / leaf_size.max(1) + 1);
        bvh.leaf_triangles.reserve(triangle_count);
        bvh.build_node(positions, indices, &mut tris, leaf_size.max(1));
        bvh
    }

    /// Build the node covering `tris`, returning its index.
    fn build_node(
        &mut self,
        positions: &[Point3],
        indices: &[u32],
        tris: &mut [BuildTriangle],
        leaf_size: usize,
    ) -> u32 {
        let mut bounds = Aabb3::empty();
        for t in tris.iter() {
            for v in &triangle_vertices(positions, indices, t.triangle) {
                bounds.include_point(v);
            }
        }

        let node_index = self.nodes.len() as u32;
        self.nodes.push(BvhNode::new_leaf(bounds, 0, 0));

        if tris.len() <= leaf_size {
            let start = self.leaf_triangles.len() as u32;
            self.leaf_triangles.extend(tris.iter().map(|t| t.triangle));
            self.nodes[node_index as usize] = BvhNode::new_leaf(bounds, start, tris.len() as u32);
            return node_index;
        }

        let axis = bounds.longest_axis();
        let mid = tris.len() / 2;
        tris.select_nth_unstable_by(mid, |a, b| a.centroid[axis].total_cmp(&b.centroid[axis]));

        let (left_tris, right_tris) = tris.split_at_mut(mid);
        let left = self.build_node(positions, indices, left_tris, leaf_size);
        let right = self.build_node(positions, indices, right_tris, leaf_size);

        self.nodes[node_index as usize] = BvhNode::new_internal(bounds, left, right);
        node_index
    }

    /// All nodes; index 0 is the root.
    pub fn nodes(&self) -> &[BvhNode] {
        &self.nodes
    }

    /// Triangle ordinals grouped by leaf.
    pub fn leaf_triangles(&self) -> &[u32] {
        &self.leaf_triangles
    }

    /// True if the tree has no nodes (built over zero triangles).
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of leaf nodes.
    pub fn leaf_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.leaf).count()
    }

    /// Number of nodes on the longest root-to-leaf path (0 when empty).
    pub fn depth(&self) -> usize {
        if self.nodes.is_empty() {
            return 0;
        }
        let mut max_depth = 0;
        let mut stack = vec![(0u32, 1usize)];
        while let Some((index, depth)) = stack.pop() {
            max_depth = max_depth.max(depth);
            if let Some((left, right)) = self.nodes[index as usize].children() {
                stack.push((left, depth + 1));
                stack.push((right, depth + 1));
            }
        }
        max_depth
    }

    /// Find the closest triangle hit with `t < t_max`.
    ///
    /// `positions` and `indices` must be the buffers the tree was built
    /// from. `stack` is scratch space; it is cleared on entry and grows if
    /// the tree is deeper than its capacity. Nodes whose bounds lie beyond
    /// the closest hit found so far are pruned. Among hits at exactly equal
    /// distance the first one reached in traversal order wins.
    pub fn closest_hit(
        &self,
        ray: &Ray,
        positions: &[Point3],
        indices: &[u32],
        t_max: f32,
        stack: &mut Vec<u32>,
        stats: &mut TraversalStats,
    ) -> Option<(u32, TriangleHit)> {
        if self.nodes.is_empty() {
            return None;
        }

        let mut best_t = t_max;
        let mut best = None;

        stack.clear();
        stack.push(0);
        while let Some(index) = stack.pop() {
            let node = &self.nodes[index as usize];
            stats.nodes_visited += 1;
            if !ray.intersect_aabb(&node.bounds, best_t) {
                continue;
            }

            match node.triangle_range() {
                Some(range) => {
                    for &triangle in &self.leaf_triangles[range] {
                        stats.triangles_tested += 1;
                        let [a, b, c] = triangle_vertices(positions, indices, triangle);
                        if let Some(hit) = intersect_triangle(ray, &a, &b, &c) {
                            if hit.t < best_t {
                                best_t = hit.t;
                                best = Some((triangle, hit));
                            }
                        }
                    }
                }
                None => {
                    stack.push(node.left_or_start);
                    stack.push(node.right_or_count);
                }
            }
        }

        best
    }

    /// Trace a ray and return only the closest hit, with no distance bound.
    pub fn trace_closest(
        &self,
        ray: &Ray,
        positions: &[Point3],
        indices: &[u32],
    ) -> Option<(u32, TriangleHit)> {
        let mut stack = Vec::with_capacity(DEFAULT_STACK_CAPACITY);
        let mut stats = TraversalStats::default();
        self.closest_hit(ray, positions, indices, f32::INFINITY, &mut stack, &mut stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshpick_math::Vec3;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    /// Random triangle soup inside a 20-unit cube, with small triangles.
    fn random_soup(rng: &mut StdRng, triangles: usize) -> (Vec<Point3>, Vec<u32>) {
        let mut positions = Vec::with_capacity(triangles * 3);
        for _ in 0..triangles {
            let center = Point3::new(
                rng.random_range(-10.0..10.0),
                rng.random_range(-10.0..10.0),
                rng.random_range(-10.0..10.0),
            );
            for _ in 0..3 {
                let offset = Vec3::new(
                    rng.random_range(-1.0..1.0),
                    rng.random_range(-1.0..1.0),
                    rng.random_range(-1.0..1.0),
                );
                positions.push(center + offset);
            }
        }
        let indices = (0..positions.len() as u32).collect();
        (positions, indices)
    }

    /// Collect the triangles below `index` by walking the tree.
    fn subtree_triangles(bvh: &Bvh, index: u32, out: &mut Vec<u32>) {
        let node = &bvh.nodes()[index as usize];
        match node.children() {
            Some((left, right)) => {
                subtree_triangles(bvh, left, out);
                subtree_triangles(bvh, right, out);
            }
            None => {
                let range = node.triangle_range().unwrap();
                out.extend_from_slice(&bvh.leaf_triangles()[range]);
            }
        }
    }

    #[test]
    fn test_bvh_empty_mesh() {
        let bvh = Bvh::build(&[], &[], DEFAULT_LEAF_SIZE);
        assert!(bvh.is_empty());
        assert_eq!(bvh.depth(), 0);
        let ray = Ray::new(Point3::origin(), Vec3::new(0.0, 0.0, 1.0));
        assert!(bvh.trace_closest(&ray, &[], &[]).is_none());
    }

    #[test]
    fn test_bvh_single_leaf() {
        let mut rng = StdRng::seed_from_u64(1);
        let (positions, indices) = random_soup(&mut rng, 5);
        let bvh = Bvh::build(&positions, &indices, DEFAULT_LEAF_SIZE);
        assert_eq!(bvh.node_count(), 1);
        assert!(bvh.nodes()[0].leaf);
        assert_eq!(bvh.nodes()[0].triangle_range(), Some(0..5));
    }

    #[test]
    fn test_bvh_split_halves_by_median() {
        // Four triangles strung along X; leaf size 2 forces one split.
        let mut positions = Vec::new();
        for i in 0..4 {
            let x = i as f32 * 10.0;
            positions.push(Point3::new(x, 0.0, 0.0));
            positions.push(Point3::new(x + 1.0, 0.0, 0.0));
            positions.push(Point3::new(x, 1.0, 0.0));
        }
        let indices: Vec<u32> = (0..12).collect();
        let bvh = Bvh::build(&positions, &indices, 2);

        assert_eq!(bvh.node_count(), 3);
        let (left, right) = bvh.nodes()[0].children().unwrap();
        let mut left_tris = Vec::new();
        subtree_triangles(&bvh, left, &mut left_tris);
        left_tris.sort_unstable();
        let mut right_tris = Vec::new();
        subtree_triangles(&bvh, right, &mut right_tris);
        right_tris.sort_unstable();
        assert_eq!(left_tris, vec![0, 1]);
        assert_eq!(right_tris, vec![2, 3]);
    }

    #[test]
    fn test_bvh_bounds_contain_descendants() {
        let mut rng = StdRng::seed_from_u64(7);
        for &count in &[1, 13, 100, 777] {
            let (positions, indices) = random_soup(&mut rng, count);
            let bvh = Bvh::build(&positions, &indices, DEFAULT_LEAF_SIZE);
            for (i, node) in bvh.nodes().iter().enumerate() {
                let mut tris = Vec::new();
                subtree_triangles(&bvh, i as u32, &mut tris);
                for &t in &tris {
                    for v in &triangle_vertices(&positions, &indices, t) {
                        assert!(node.bounds.contains_point(v, 0.0));
                    }
                }
            }
        }
    }

    #[test]
    fn test_bvh_leaf_order_is_permutation() {
        let mut rng = StdRng::seed_from_u64(11);
        let (positions, indices) = random_soup(&mut rng, 500);
        let bvh = Bvh::build(&positions, &indices, DEFAULT_LEAF_SIZE);
        let mut order = bvh.leaf_triangles().to_vec();
        order.sort_unstable();
        assert_eq!(order, (0..500).collect::<Vec<u32>>());
        assert!(bvh
            .nodes()
            .iter()
            .filter_map(BvhNode::triangle_range)
            .all(|r| !r.is_empty() && r.len() <= DEFAULT_LEAF_SIZE));
    }

    #[test]
    fn test_bvh_coincident_triangles_stay_shallow() {
        // Identical centroids everywhere: the median split still halves.
        let positions = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        let indices: Vec<u32> = [0, 1, 2].repeat(4096);
        let bvh = Bvh::build(&positions, &indices, DEFAULT_LEAF_SIZE);
        assert!(bvh.depth() <= 12);
        assert_eq!(bvh.leaf_triangles().len(), 4096);
    }

    #[test]
    fn test_bvh_rebuild_is_identical() {
        let mut rng = StdRng::seed_from_u64(3);
        let (positions, indices) = random_soup(&mut rng, 300);
        let a = Bvh::build(&positions, &indices, DEFAULT_LEAF_SIZE);
        let b = Bvh::build(&positions, &indices, DEFAULT_LEAF_SIZE);
        assert_eq!(a, b);
    }

    #[test]
    fn test_bvh_closest_matches_brute_force() {
        let mut rng = StdRng::seed_from_u64(42);
        let (positions, indices) = random_soup(&mut rng, 400);
        let bvh = Bvh::build(&positions, &indices, 4);

        for _ in 0..200 {
            let origin = Point3::new(
                rng.random_range(-15.0..15.0),
                rng.random_range(-15.0..15.0),
                rng.random_range(-15.0..15.0),
            );
            let target = Point3::new(
                rng.random_range(-8.0..8.0),
                rng.random_range(-8.0..8.0),
                rng.random_range(-8.0..8.0),
            );
            let ray = Ray::new(origin, target - origin);

            let mut expected: Option<f32> = None;
            for t in 0..400u32 {
                let [a, b, c] = triangle_vertices(&positions, &indices, t);
                if let Some(hit) = intersect_triangle(&ray, &a, &b, &c) {
                    if expected.map_or(true, |e| hit.t < e) {
                        expected = Some(hit.t);
                    }
                }
            }

            let got = bvh.trace_closest(&ray, &positions, &indices).map(|(_, h)| h.t);
            match (expected, got) {
                (None, None) => {}
                (Some(e), Some(g)) => assert!((e - g).abs() <= 1e-4 * e.max(1.0)),
                other => panic!("bvh and brute force disagree: {other:?}"),
            }
        }
    }

    #[test]
    fn test_closest_hit_respects_t_max() {
        let positions = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        let indices = vec![0, 1, 2];
        let bvh = Bvh::build(&positions, &indices, DEFAULT_LEAF_SIZE);
        let ray = Ray::new(Point3::new(0.25, 0.25, -1.0), Vec3::new(0.0, 0.0, 1.0));

        let mut stack = Vec::new();
        let mut stats = TraversalStats::default();
        assert!(bvh
            .closest_hit(&ray, &positions, &indices, 0.5, &mut stack, &mut stats)
            .is_none());
        assert_eq!(stats.triangles_tested, 0);

        let hit = bvh.closest_hit(&ray, &positions, &indices, 2.0, &mut stack, &mut stats);
        assert_eq!(hit.map(|(t, _)| t), Some(0));
    }
}
