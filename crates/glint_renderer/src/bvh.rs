//! Bounding Volume Hierarchy (BVH) acceleration structure.
//!
//! Nodes live in a flat array with children referenced by index, and leaves
//! reference contiguous runs of a primitive index array. Construction uses a
//! binned surface area heuristic (SAH), falling back to a median split on
//! the longest centroid axis when the SAH partition is degenerate.

use glint_math::{axis_component, Aabb, Interval, Ray, Vec3};
use rayon::prelude::*;

use crate::error::BuildError;
use crate::geometry::{PrimitiveGeometry, SplitPredicate};
use crate::intersector::{Intersection, Intersector, TraceOptions};

/// Fixed traversal stack size; bounds the tree depth.
const TRAVERSAL_STACK_SIZE: usize = 128;

/// BVH construction options.
#[derive(Clone, Debug, PartialEq)]
pub struct BvhBuildOptions {
    /// Ranges at or below this size become leaves
    pub min_leaf_primitives: usize,

    /// Number of SAH bins per axis
    pub bin_size: usize,

    /// Maximum depth before forcing a leaf
    pub max_tree_depth: usize,
}

impl Default for BvhBuildOptions {
    fn default() -> Self {
        Self {
            min_leaf_primitives: 4,
            bin_size: 64,
            max_tree_depth: 64,
        }
    }
}

/// Node counts and depth of a built tree.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BvhStatistics {
    pub leaf_nodes: usize,
    pub branch_nodes: usize,
    pub max_depth: usize,
}

/// BVH node - either a branch with two children or a leaf with primitives.
#[derive(Clone, Debug)]
enum BvhNode {
    /// Internal node; children are indices into the node array.
    Branch { bbox: Aabb, left: u32, right: u32 },
    /// Leaf referencing `indices[start..start + count]`.
    Leaf { bbox: Aabb, start: u32, count: u32 },
}

impl BvhNode {
    #[inline]
    fn bbox(&self) -> &Aabb {
        match self {
            BvhNode::Branch { bbox, .. } | BvhNode::Leaf { bbox, .. } => bbox,
        }
    }
}

/// A built BVH over primitive indices.
///
/// `Bvh::default()` is the empty, invalid tree; traversing it never hits.
#[derive(Clone, Debug, Default)]
pub struct Bvh {
    nodes: Vec<BvhNode>,
    indices: Vec<u32>,
}

impl Bvh {
    /// Build a BVH over `count` primitives.
    ///
    /// Fails with [`BuildError::EmptyScene`] when `count` is zero.
    pub fn build<G, P>(
        count: usize,
        geometry: &G,
        predicate: &mut P,
        options: &BvhBuildOptions,
    ) -> Result<Self, BuildError>
    where
        G: PrimitiveGeometry,
        P: SplitPredicate,
    {
        if count == 0 {
            return Err(BuildError::EmptyScene);
        }
        debug_assert!(count <= geometry.primitive_count());

        // Per-primitive bounds are independent; compute them in parallel.
        let prims: Vec<(Aabb, Vec3)> = (0..count)
            .into_par_iter()
            .map(|i| geometry.bounding_box_and_centroid(i))
            .collect();

        let mut builder = Builder {
            prims: &prims,
            predicate,
            min_leaf: options.min_leaf_primitives.max(1),
            bins: options.bin_size.max(2),
            max_depth: options.max_tree_depth.min(TRAVERSAL_STACK_SIZE - 2),
            nodes: Vec::with_capacity(2 * count / options.min_leaf_primitives.max(1) + 1),
            indices: (0..count as u32).collect(),
        };
        builder.build_node(0, count, 0);

        log::debug!(
            "BVH built: {} primitives, {} nodes",
            count,
            builder.nodes.len()
        );

        Ok(Self {
            nodes: builder.nodes,
            indices: builder.indices,
        })
    }

    /// True once a successful build has produced a tree.
    pub fn is_valid(&self) -> bool {
        !self.nodes.is_empty()
    }

    /// Bounds of the whole tree, or `None` if it has not been built.
    pub fn bounding_box(&self) -> Option<Aabb> {
        self.nodes.first().map(|node| *node.bbox())
    }

    pub fn statistics(&self) -> BvhStatistics {
        let mut stats = BvhStatistics::default();
        if self.nodes.is_empty() {
            return stats;
        }

        let mut stack = vec![(0u32, 1usize)];
        while let Some((index, depth)) = stack.pop() {
            stats.max_depth = stats.max_depth.max(depth);
            match self.nodes[index as usize] {
                BvhNode::Branch { left, right, .. } => {
                    stats.branch_nodes += 1;
                    stack.push((left, depth + 1));
                    stack.push((right, depth + 1));
                }
                BvhNode::Leaf { .. } => stats.leaf_nodes += 1,
            }
        }
        stats
    }

    /// Find the nearest hit along `ray`.
    ///
    /// Nodes are visited front to back and skipped once their entry
    /// distance exceeds the nearest hit so far. `post_traversal` is always
    /// called before returning.
    pub fn traverse<I: Intersector>(
        &self,
        ray: &Ray,
        intersector: &mut I,
        options: &TraceOptions,
        isect: &mut Intersection,
    ) -> bool {
        intersector.prepare_traversal(ray, options);

        let mut hit = false;
        let mut t_max = ray.t_max;
        let origin = ray.origin();
        let inv_dir = ray.direction().recip();

        let mut stack = [(0u32, 0f32); TRAVERSAL_STACK_SIZE];
        let mut sp = 0;
        if let Some(root) = self.nodes.first() {
            if let Some(t) = root.bbox().entry_distance(origin, inv_dir, ray.interval()) {
                stack[0] = (0, t);
                sp = 1;
            }
        }

        while sp > 0 {
            sp -= 1;
            let (index, entry) = stack[sp];
            if entry > t_max {
                continue;
            }

            match self.nodes[index as usize] {
                BvhNode::Leaf { start, count, .. } => {
                    let start = start as usize;
                    for &prim in &self.indices[start..start + count as usize] {
                        if intersector.intersect(prim, &mut t_max) {
                            intersector.update(t_max, prim);
                            hit = true;
                        }
                    }
                }
                BvhNode::Branch { left, right, .. } => {
                    let range = Interval::new(ray.t_min, t_max);
                    let t_left = self.nodes[left as usize]
                        .bbox()
                        .entry_distance(origin, inv_dir, range);
                    let t_right = self.nodes[right as usize]
                        .bbox()
                        .entry_distance(origin, inv_dir, range);

                    // Push the far child first so the near one is popped next.
                    match (t_left, t_right) {
                        (Some(tl), Some(tr)) => {
                            let (near, far) = if tl <= tr {
                                ((left, tl), (right, tr))
                            } else {
                                ((right, tr), (left, tl))
                            };
                            stack[sp] = far;
                            stack[sp + 1] = near;
                            sp += 2;
                        }
                        (Some(tl), None) => {
                            stack[sp] = (left, tl);
                            sp += 1;
                        }
                        (None, Some(tr)) => {
                            stack[sp] = (right, tr);
                            sp += 1;
                        }
                        (None, None) => {}
                    }
                }
            }
        }

        intersector.post_traversal(ray, hit, isect);
        hit
    }
}

/// Recursive construction state.
struct Builder<'a, P> {
    prims: &'a [(Aabb, Vec3)],
    predicate: &'a mut P,
    min_leaf: usize,
    bins: usize,
    max_depth: usize,
    nodes: Vec<BvhNode>,
    indices: Vec<u32>,
}

#[derive(Clone, Copy)]
struct Bin {
    bounds: Aabb,
    count: usize,
}

impl<P: SplitPredicate> Builder<'_, P> {
    /// Build the subtree over `indices[start..end]`, returning its node index.
    fn build_node(&mut self, start: usize, end: usize, depth: usize) -> u32 {
        let mut bbox = Aabb::EMPTY;
        let mut centroid_bounds = Aabb::EMPTY;
        for &i in &self.indices[start..end] {
            let (b, c) = &self.prims[i as usize];
            bbox = Aabb::surrounding(&bbox, b);
            centroid_bounds = centroid_bounds.include_point(*c);
        }

        let node_index = self.nodes.len() as u32;
        let n = end - start;
        if n <= self.min_leaf || depth >= self.max_depth {
            self.nodes.push(BvhNode::Leaf {
                bbox,
                start: start as u32,
                count: n as u32,
            });
            return node_index;
        }

        // Reserve this node's slot; children are appended after it.
        self.nodes.push(BvhNode::Leaf {
            bbox,
            start: start as u32,
            count: n as u32,
        });

        let mid = self
            .sah_split(start, end, &centroid_bounds)
            .unwrap_or_else(|| self.median_split(start, end, &centroid_bounds));

        let left = self.build_node(start, mid, depth + 1);
        let right = self.build_node(mid, end, depth + 1);
        self.nodes[node_index as usize] = BvhNode::Branch { bbox, left, right };
        node_index
    }

    /// Partition at the cheapest binned SAH plane. Returns the split index,
    /// or `None` if no plane separates the primitives.
    fn sah_split(&mut self, start: usize, end: usize, centroid_bounds: &Aabb) -> Option<usize> {
        let mut best: Option<(f32, usize, f32)> = None; // (cost, axis, position)

        for axis in 0..3 {
            let extent = centroid_bounds.axis_interval(axis);
            if extent.size() <= 0.0 {
                continue;
            }
            let scale = self.bins as f32 / extent.size();

            let mut bins = vec![
                Bin {
                    bounds: Aabb::EMPTY,
                    count: 0
                };
                self.bins
            ];
            for &i in &self.indices[start..end] {
                let (b, c) = &self.prims[i as usize];
                let slot = (((axis_component(*c, axis) - extent.min) * scale) as usize).min(self.bins - 1);
                bins[slot].bounds = Aabb::surrounding(&bins[slot].bounds, b);
                bins[slot].count += 1;
            }

            // Sweep from the right to get the cost of everything above each plane.
            let mut right_area = vec![0.0f32; self.bins];
            let mut right_count = vec![0usize; self.bins];
            let mut acc = Bin {
                bounds: Aabb::EMPTY,
                count: 0,
            };
            for b in (1..self.bins).rev() {
                acc.bounds = Aabb::surrounding(&acc.bounds, &bins[b].bounds);
                acc.count += bins[b].count;
                right_area[b] = acc.bounds.surface_area();
                right_count[b] = acc.count;
            }

            let mut left = Bin {
                bounds: Aabb::EMPTY,
                count: 0,
            };
            for b in 1..self.bins {
                left.bounds = Aabb::surrounding(&left.bounds, &bins[b - 1].bounds);
                left.count += bins[b - 1].count;
                if left.count == 0 || right_count[b] == 0 {
                    continue;
                }
                let cost = left.count as f32 * left.bounds.surface_area()
                    + right_count[b] as f32 * right_area[b];
                if best.map_or(true, |(best_cost, _, _)| cost < best_cost) {
                    let position = extent.min + b as f32 / scale;
                    best = Some((cost, axis, position));
                }
            }
        }

        let (_, axis, position) = best?;
        self.predicate.set(axis, position);

        // Two-pointer partition: primitives below the plane move to the front.
        let slice = &mut self.indices[start..end];
        let mut lo = 0;
        let mut hi = slice.len();
        while lo < hi {
            if self.predicate.is_below(slice[lo] as usize) {
                lo += 1;
            } else {
                hi -= 1;
                slice.swap(lo, hi);
            }
        }

        if lo == 0 || lo == slice.len() {
            None
        } else {
            Some(start + lo)
        }
    }

    /// Split the range in half around the median centroid on the longest axis.
    fn median_split(&mut self, start: usize, end: usize, centroid_bounds: &Aabb) -> usize {
        let axis = centroid_bounds.longest_axis();
        let mid = (end - start) / 2;
        let prims = self.prims;
        self.indices[start..end].select_nth_unstable_by(mid, |&a, &b| {
            let a_val = axis_component(prims[a as usize].1, axis);
            let b_val = axis_component(prims[b as usize].1, axis);
            a_val.total_cmp(&b_val)
        });
        start + mid
    }
}
