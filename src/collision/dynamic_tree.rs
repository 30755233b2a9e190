// Dynamic AABB tree used as the broadphase spatial index.

use std::fmt::Debug;
use std::hash::Hash;

use log::{trace, warn};
use rustc_hash::FxHashMap;

use crate::common::config::DynamicTreeConfig;
use crate::error::{CollisionError, Result};
use crate::math::{BoundingBox, Ray, Vec2};

/// Padding applied to a leaf when it is first tracked.
const TRACK_PADDING: f64 = 2.0;

/// A node in the tree arena. Leaves carry `data`, internal nodes always have
/// both children.
#[derive(Debug, Clone)]
struct TreeNode<T> {
    parent: Option<usize>,
    left: Option<usize>,
    right: Option<usize>,
    bounds: BoundingBox,
    height: i32,
    data: Option<T>,
}

impl<T> TreeNode<T> {
    fn leaf(data: T, bounds: BoundingBox) -> Self {
        TreeNode {
            parent: None,
            left: None,
            right: None,
            bounds,
            height: 0,
            data: Some(data),
        }
    }

    fn is_leaf(&self) -> bool {
        self.left.is_none() && self.right.is_none()
    }
}

/// Self-balancing binary tree of padded bounding boxes.
///
/// Leaves are stored with "fat" bounds so that small movements do not force
/// a reinsertion. Insertion follows the surface-area heuristic used by Box2D
/// (with perimeter as the 2D surface measure) and the tree is rebalanced on
/// every structural change.
#[derive(Debug, Clone)]
pub struct DynamicTree<T> {
    config: DynamicTreeConfig,
    nodes: Vec<TreeNode<T>>,
    free: Vec<usize>,
    root: Option<usize>,
    leaves: FxHashMap<T, usize>,
}

impl<T: Copy + Eq + Hash + Debug> Default for DynamicTree<T> {
    fn default() -> Self {
        Self::new(DynamicTreeConfig::default())
    }
}

impl<T: Copy + Eq + Hash + Debug> DynamicTree<T> {
    pub fn new(config: DynamicTreeConfig) -> Self {
        DynamicTree {
            config,
            nodes: Vec::new(),
            free: Vec::new(),
            root: None,
            leaves: FxHashMap::default(),
        }
    }

    pub fn config(&self) -> &DynamicTreeConfig {
        &self.config
    }

    // --- Public API Methods ---

    /// Starts tracking `data` with the given bounds (padded slightly).
    /// Tracking an already tracked item replaces its leaf.
    pub fn track(&mut self, data: T, bounds: BoundingBox) -> Result<()> {
        if self.leaves.contains_key(&data) {
            self.untrack(data)?;
        }
        let leaf = self.allocate(TreeNode::leaf(data, bounds.pad(TRACK_PADDING)));
        self.leaves.insert(data, leaf);
        self.insert_leaf(leaf)
    }

    /// Stops tracking `data`. Returns `false` if it was not tracked.
    pub fn untrack(&mut self, data: T) -> Result<bool> {
        let Some(leaf) = self.leaves.remove(&data) else {
            return Ok(false);
        };
        self.remove_leaf(leaf)?;
        self.release(leaf);
        Ok(true)
    }

    /// Refreshes the leaf for `data` after it moved.
    ///
    /// Returns `true` only when the leaf had to be reinserted. A leaf whose
    /// bounds leave the world bounds is untracked.
    ///
    /// # Arguments
    /// * `bounds` - The current (unpadded) world bounds of the item.
    /// * `velocity` - Used to stretch the fat bounds in the direction of travel.
    pub fn update(&mut self, data: T, bounds: BoundingBox, velocity: Vec2) -> Result<bool> {
        let Some(&leaf) = self.leaves.get(&data) else {
            return Ok(false);
        };

        if !self.config.world_bounds.contains_box(&bounds) {
            warn!(
                "Collider {:?} is outside the world bounds and will no longer be tracked for physics",
                data
            );
            self.untrack(data)?;
            return Ok(false);
        }

        if self.nodes[leaf].bounds.contains_box(&bounds) {
            return Ok(false);
        }

        self.remove_leaf(leaf)?;

        let multiplier = self.config.velocity_multiplier;
        let dx = velocity.x * 32.0 / 1000.0 * multiplier;
        let dy = velocity.y * 32.0 / 1000.0 * multiplier;
        let mut fat = bounds.pad(self.config.bounds_padding);
        if dx < 0.0 {
            fat.left += dx;
        } else {
            fat.right += dx;
        }
        if dy < 0.0 {
            fat.top += dy;
        } else {
            fat.bottom += dy;
        }

        trace!("Reinserting {:?} into the dynamic tree", data);
        self.nodes[leaf].bounds = fat;
        self.insert_leaf(leaf)?;
        Ok(true)
    }

    /// Visits every tracked item whose fat bounds overlap `bounds`, except
    /// `data` itself. The callback returns `true` to stop the search.
    pub fn query<F>(&self, data: T, bounds: &BoundingBox, mut callback: F)
    where
        F: FnMut(T) -> bool,
    {
        self.traverse(
            |node| node.bounds.overlaps(bounds, 0.0),
            |other| other != data && callback(other),
        );
    }

    /// Like [`DynamicTree::query`] without excluding anything.
    pub fn query_bounds<F>(&self, bounds: &BoundingBox, callback: F)
    where
        F: FnMut(T) -> bool,
    {
        self.traverse(|node| node.bounds.overlaps(bounds, 0.0), callback);
    }

    /// Visits every tracked item whose fat bounds contain `point`, edges
    /// included. The callback returns `true` to stop the search.
    pub fn query_point<F>(&self, point: Vec2, callback: F)
    where
        F: FnMut(T) -> bool,
    {
        self.traverse(|node| node.bounds.contains_point(point), callback);
    }

    /// Visits every tracked item whose fat bounds the ray crosses within
    /// `max_distance`. The callback returns `true` to stop the search.
    pub fn ray_cast_query<F>(&self, ray: &Ray, max_distance: f64, callback: F)
    where
        F: FnMut(T) -> bool,
    {
        self.traverse(|node| node.bounds.ray_cast(ray, max_distance), callback);
    }

    /// Height of the root, 0 for an empty tree or a single leaf.
    pub fn height(&self) -> i32 {
        self.root.map(|r| self.nodes[r].height).unwrap_or(0)
    }

    /// Number of tracked items.
    pub fn len(&self) -> usize {
        self.leaves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    pub fn contains(&self, data: T) -> bool {
        self.leaves.contains_key(&data)
    }

    /// The padded bounds currently stored for `data`.
    pub fn fat_bounds(&self, data: T) -> Option<BoundingBox> {
        self.leaves.get(&data).map(|&leaf| self.nodes[leaf].bounds)
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.free.clear();
        self.leaves.clear();
        self.root = None;
    }

    // --- Helper Methods ---

    fn allocate(&mut self, node: TreeNode<T>) -> usize {
        match self.free.pop() {
            Some(index) => {
                self.nodes[index] = node;
                index
            }
            None => {
                self.nodes.push(node);
                self.nodes.len() - 1
            }
        }
    }

    fn release(&mut self, index: usize) {
        let node = &mut self.nodes[index];
        node.parent = None;
        node.left = None;
        node.right = None;
        node.data = None;
        node.height = 0;
        self.free.push(index);
    }

    /// Depth-first walk, left before right, so results come out in a stable
    /// order for a given tree shape.
    fn traverse<P, F>(&self, mut accept: P, mut callback: F)
    where
        P: FnMut(&TreeNode<T>) -> bool,
        F: FnMut(T) -> bool,
    {
        let Some(root) = self.root else {
            return;
        };
        let mut stack = vec![root];
        while let Some(index) = stack.pop() {
            let node = &self.nodes[index];
            if !accept(node) {
                continue;
            }
            if node.is_leaf() {
                if let Some(data) = node.data {
                    if callback(data) {
                        return;
                    }
                }
            } else {
                if let Some(right) = node.right {
                    stack.push(right);
                }
                if let Some(left) = node.left {
                    stack.push(left);
                }
            }
        }
    }

    fn height_of(&self, index: usize) -> i32 {
        self.nodes[index].height
    }

    fn bounds_of(&self, index: usize) -> BoundingBox {
        self.nodes[index].bounds
    }

    /// Cost of pushing a leaf with `bounds` down into `child`.
    fn descend_cost(&self, child: usize, bounds: &BoundingBox, inheritance: f64) -> f64 {
        let combined = bounds.combine(&self.nodes[child].bounds).perimeter();
        if self.nodes[child].is_leaf() {
            combined + inheritance
        } else {
            combined - self.nodes[child].bounds.perimeter() + inheritance
        }
    }

    fn insert_leaf(&mut self, leaf: usize) -> Result<()> {
        let Some(root) = self.root else {
            self.root = Some(leaf);
            self.nodes[leaf].parent = None;
            return Ok(());
        };

        // Find the best sibling
        let leaf_bounds = self.nodes[leaf].bounds;
        let mut sibling = root;
        while let (Some(left), Some(right)) = (self.nodes[sibling].left, self.nodes[sibling].right) {
            let area = self.nodes[sibling].bounds.perimeter();
            let combined_area = self.nodes[sibling].bounds.combine(&leaf_bounds).perimeter();

            // Cost of creating a new parent for this node and the leaf
            let cost = 2.0 * combined_area;
            // Minimum cost of pushing the leaf further down
            let inheritance = 2.0 * (combined_area - area);

            let left_cost = self.descend_cost(left, &leaf_bounds, inheritance);
            let right_cost = self.descend_cost(right, &leaf_bounds, inheritance);

            if cost < left_cost && cost < right_cost {
                break;
            }
            sibling = if left_cost < right_cost { left } else { right };
        }

        // Splice in a new parent
        let old_parent = self.nodes[sibling].parent;
        let new_parent = self.allocate(TreeNode {
            parent: old_parent,
            left: Some(sibling),
            right: Some(leaf),
            bounds: leaf_bounds.combine(&self.nodes[sibling].bounds),
            height: self.nodes[sibling].height + 1,
            data: None,
        });
        match old_parent {
            Some(p) => self.replace_child(p, sibling, new_parent),
            None => self.root = Some(new_parent),
        }
        self.nodes[sibling].parent = Some(new_parent);
        self.nodes[leaf].parent = Some(new_parent);

        self.refresh_ancestors(Some(new_parent))
    }

    fn remove_leaf(&mut self, leaf: usize) -> Result<()> {
        if self.root == Some(leaf) {
            self.root = None;
            return Ok(());
        }

        let parent = self.nodes[leaf]
            .parent
            .ok_or(CollisionError::TreeInvariant("non-root leaf has no parent"))?;
        let grand_parent = self.nodes[parent].parent;
        let sibling = if self.nodes[parent].left == Some(leaf) {
            self.nodes[parent].right
        } else {
            self.nodes[parent].left
        }
        .ok_or(CollisionError::TreeInvariant("leaf has no sibling"))?;

        self.nodes[leaf].parent = None;
        match grand_parent {
            Some(g) => {
                self.replace_child(g, parent, sibling);
                self.nodes[sibling].parent = Some(g);
                self.release(parent);
                self.refresh_ancestors(Some(g))
            }
            None => {
                self.root = Some(sibling);
                self.nodes[sibling].parent = None;
                self.release(parent);
                Ok(())
            }
        }
    }

    fn replace_child(&mut self, parent: usize, old: usize, new: usize) {
        if self.nodes[parent].left == Some(old) {
            self.nodes[parent].left = Some(new);
        } else {
            self.nodes[parent].right = Some(new);
        }
    }

    /// Walks from `start` to the root, balancing and refreshing height and
    /// bounds on the way.
    fn refresh_ancestors(&mut self, start: Option<usize>) -> Result<()> {
        let mut current = start;
        while let Some(index) = current {
            let index = self.balance(index)?;
            let (Some(left), Some(right)) = (self.nodes[index].left, self.nodes[index].right) else {
                return Err(CollisionError::TreeInvariant("internal node is missing a child"));
            };
            self.nodes[index].height = 1 + self.height_of(left).max(self.height_of(right));
            self.nodes[index].bounds = self.bounds_of(left).combine(&self.bounds_of(right));
            current = self.nodes[index].parent;
        }
        Ok(())
    }

    /// Rotates the taller child of `a` up when the children's heights differ
    /// by more than one. Returns the index of the subtree's new root.
    fn balance(&mut self, a: usize) -> Result<usize> {
        if self.nodes[a].is_leaf() || self.nodes[a].height < 2 {
            return Ok(a);
        }
        let missing = CollisionError::TreeInvariant("cannot balance a node with a missing child");
        let (Some(b), Some(c)) = (self.nodes[a].left, self.nodes[a].right) else {
            return Err(missing);
        };

        let balance = self.height_of(c) - self.height_of(b);

        // Rotate c up
        if balance > 1 {
            let (Some(f), Some(g)) = (self.nodes[c].left, self.nodes[c].right) else {
                return Err(missing);
            };
            self.lift(a, c);

            let (keep, give) = if self.height_of(f) > self.height_of(g) { (f, g) } else { (g, f) };
            self.nodes[c].right = Some(keep);
            self.nodes[a].right = Some(give);
            self.nodes[give].parent = Some(a);

            self.nodes[a].bounds = self.bounds_of(b).combine(&self.bounds_of(give));
            self.nodes[c].bounds = self.bounds_of(a).combine(&self.bounds_of(keep));
            self.nodes[a].height = 1 + self.height_of(b).max(self.height_of(give));
            self.nodes[c].height = 1 + self.height_of(a).max(self.height_of(keep));
            return Ok(c);
        }

        // Rotate b up
        if balance < -1 {
            let (Some(d), Some(e)) = (self.nodes[b].left, self.nodes[b].right) else {
                return Err(missing);
            };
            self.lift(a, b);

            let (keep, give) = if self.height_of(d) > self.height_of(e) { (d, e) } else { (e, d) };
            self.nodes[b].right = Some(keep);
            self.nodes[a].left = Some(give);
            self.nodes[give].parent = Some(a);

            self.nodes[a].bounds = self.bounds_of(c).combine(&self.bounds_of(give));
            self.nodes[b].bounds = self.bounds_of(a).combine(&self.bounds_of(keep));
            self.nodes[a].height = 1 + self.height_of(c).max(self.height_of(give));
            self.nodes[b].height = 1 + self.height_of(a).max(self.height_of(keep));
            return Ok(b);
        }

        Ok(a)
    }

    /// Makes `child` take the place of `a`, with `a` as its left child.
    fn lift(&mut self, a: usize, child: usize) {
        let grand_parent = self.nodes[a].parent;
        self.nodes[child].left = Some(a);
        self.nodes[child].parent = grand_parent;
        self.nodes[a].parent = Some(child);
        match grand_parent {
            Some(p) => self.replace_child(p, a, child),
            None => self.root = Some(child),
        }
    }
}
