//! Bounding Volume Hierarchy (BVH) acceleration structure.
//!
//! Nodes live in a flat arena and refer to each other by [`NodeId`]. A leaf
//! owns a mesh -> triangle-index map; a branch owns exactly two children.
//!
//! Splits are taken at the midpoint of the node's box (not the median of
//! its triangles), so trees over unevenly distributed geometry can be
//! unbalanced.

use std::collections::BTreeMap;

use qpath_core::Mesh;
use qpath_math::{Aabb, Interval, Ray};
use thiserror::Error;

/// Minimum thickness of a node box along any axis.
const MIN_NODE_THICKNESS: f32 = 0.0001;

/// Triangles grouped by mesh index.
pub type TriangleBuckets = BTreeMap<usize, Vec<u32>>;

/// Errors raised while building a BVH.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BvhError {
    #[error("cannot build a BVH without models")]
    NoModels,
    #[error("cannot build a BVH: none of the {0} models has triangles")]
    NoTriangles(usize),
}

/// Stable index of a node in a [`Bvh`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Axis and coordinate a branch was split at.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Split {
    pub axis: usize,
    pub pivot: f32,
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    /// Internal node with two children.
    Branch {
        left: NodeId,
        right: NodeId,
        split: Split,
    },
    /// Leaf node holding triangle references.
    Leaf { triangles: TriangleBuckets },
}

#[derive(Debug, Clone)]
pub struct BvhNode {
    pub bbox: Aabb,
    pub kind: NodeKind,
}

impl BvhNode {
    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, NodeKind::Leaf { .. })
    }
}

/// BVH over every triangle of a mesh collection.
#[derive(Debug, Clone)]
pub struct Bvh {
    nodes: Vec<BvhNode>,
    leaf_count: usize,
    depth: usize,
}

impl Bvh {
    /// Build a BVH, splitting nodes that hold more than `leaf_size`
    /// triangles.
    pub fn build(meshes: &[Mesh], leaf_size: usize) -> Result<Self, BvhError> {
        if meshes.is_empty() {
            return Err(BvhError::NoModels);
        }

        let mut all = TriangleBuckets::new();
        for (mesh_index, mesh) in meshes.iter().enumerate() {
            if mesh.triangle_count() > 0 {
                all.insert(mesh_index, (0..mesh.triangle_count() as u32).collect());
            }
        }
        if all.is_empty() {
            return Err(BvhError::NoTriangles(meshes.len()));
        }

        let total = count(&all);
        let root_bounds = bucket_bounds(meshes, &all);
        let mut bvh = Bvh {
            nodes: vec![BvhNode {
                bbox: root_bounds.padded(MIN_NODE_THICKNESS),
                kind: NodeKind::Leaf { triangles: all },
            }],
            leaf_count: 0,
            depth: 0,
        };

        // (node, unpadded bounds, depth)
        let mut stack = vec![(NodeId(0), root_bounds, 0usize)];
        while let Some((id, bounds, depth)) = stack.pop() {
            bvh.depth = bvh.depth.max(depth);

            let NodeKind::Leaf { triangles } = &bvh.nodes[id.index()].kind else {
                continue;
            };
            if count(triangles) <= leaf_size {
                bvh.leaf_count += 1;
                continue;
            }

            let Some((split, left_tris, right_tris)) = partition(meshes, triangles, &bounds) else {
                // No axis separates the triangles
                bvh.leaf_count += 1;
                continue;
            };

            let left_bounds = bucket_bounds(meshes, &left_tris);
            let right_bounds = bucket_bounds(meshes, &right_tris);
            let left = bvh.push_leaf(left_bounds, left_tris);
            let right = bvh.push_leaf(right_bounds, right_tris);
            bvh.nodes[id.index()].kind = NodeKind::Branch { left, right, split };

            stack.push((right, right_bounds, depth + 1));
            stack.push((left, left_bounds, depth + 1));
        }

        log::info!(
            "BVH built: {} triangles, {} nodes, {} leaves, depth {}",
            total,
            bvh.nodes.len(),
            bvh.leaf_count,
            bvh.depth
        );

        Ok(bvh)
    }

    fn push_leaf(&mut self, bounds: Aabb, triangles: TriangleBuckets) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(BvhNode {
            bbox: bounds.padded(MIN_NODE_THICKNESS),
            kind: NodeKind::Leaf { triangles },
        });
        id
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn node(&self, id: NodeId) -> &BvhNode {
        &self.nodes[id.index()]
    }

    pub fn nodes(&self) -> &[BvhNode] {
        &self.nodes
    }

    /// Get the number of nodes (branches and leaves).
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn leaf_count(&self) -> usize {
        self.leaf_count
    }

    /// Length of the longest root-to-leaf path, in edges.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Triangles of a leaf, or `None` for a branch.
    pub fn leaf_triangles(&self, id: NodeId) -> Option<&TriangleBuckets> {
        match &self.nodes[id.index()].kind {
            NodeKind::Leaf { triangles } => Some(triangles),
            NodeKind::Branch { .. } => None,
        }
    }

    /// Every triangle in the subtree of `id`.
    pub fn triangles_under(&self, id: NodeId) -> TriangleBuckets {
        let mut out = TriangleBuckets::new();
        let mut stack = vec![id];
        while let Some(id) = stack.pop() {
            match &self.nodes[id.index()].kind {
                NodeKind::Leaf { triangles } => merge_into(&mut out, triangles),
                NodeKind::Branch { left, right, .. } => {
                    stack.push(*right);
                    stack.push(*left);
                }
            }
        }
        out
    }

    /// Leaves whose boxes the ray crosses within `ray_t`.
    pub fn intersect_leaves(&self, ray: &Ray, ray_t: Interval) -> Vec<NodeId> {
        let mut leaves = Vec::new();
        let mut stack = vec![self.root()];

        while let Some(id) = stack.pop() {
            let node = &self.nodes[id.index()];
            if node.bbox.hit(ray, ray_t).is_none() {
                continue;
            }
            match &node.kind {
                NodeKind::Leaf { .. } => leaves.push(id),
                NodeKind::Branch { left, right, .. } => {
                    stack.push(*right);
                    stack.push(*left);
                }
            }
        }

        leaves
    }

    /// Triangles of every leaf the ray crosses, merged per mesh.
    pub fn intersect_buckets(&self, ray: &Ray, ray_t: Interval) -> TriangleBuckets {
        let mut out = TriangleBuckets::new();
        for leaf in self.intersect_leaves(ray, ray_t) {
            if let Some(triangles) = self.leaf_triangles(leaf) {
                merge_into(&mut out, triangles);
            }
        }
        out
    }
}

fn count(buckets: &TriangleBuckets) -> usize {
    buckets.values().map(Vec::len).sum()
}

fn merge_into(out: &mut TriangleBuckets, from: &TriangleBuckets) {
    for (mesh, tris) in from {
        out.entry(*mesh).or_default().extend_from_slice(tris);
    }
}

fn bucket_bounds(meshes: &[Mesh], buckets: &TriangleBuckets) -> Aabb {
    let mut bounds = Aabb::EMPTY;
    for (&mesh, tris) in buckets {
        for &tri in tris {
            bounds.update_aabb(&meshes[mesh].triangle_bounds(tri));
        }
    }
    bounds
}

/// Split at the midpoint of `bounds`, starting with the longest axis and
/// falling back to the other two. A triangle goes left when the center of
/// its own box is strictly below the pivot.
fn partition(
    meshes: &[Mesh],
    triangles: &TriangleBuckets,
    bounds: &Aabb,
) -> Option<(Split, TriangleBuckets, TriangleBuckets)> {
    let first = bounds.longest_axis();
    let center = bounds.centroid();

    for i in 0..3 {
        let axis = (first + i) % 3;
        let pivot = center[axis];

        let mut left = TriangleBuckets::new();
        let mut right = TriangleBuckets::new();
        for (&mesh, tris) in triangles {
            for &tri in tris {
                let side = if meshes[mesh].triangle_bounds(tri).centroid()[axis] < pivot {
                    &mut left
                } else {
                    &mut right
                };
                side.entry(mesh).or_default().push(tri);
            }
        }

        if !left.is_empty() && !right.is_empty() {
            return Some((Split { axis, pivot }, left, right));
        }
    }

    None
}
