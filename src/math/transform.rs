use super::vec2::Vec2;

/// Position, rotation and per-axis scale of a body or collider.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec2,
    pub rotation: f64, // Angle in radians
    pub scale: Vec2,
}

impl Transform {
    /// Creates a new unscaled transform.
    pub fn new(position: Vec2, rotation: f64) -> Self {
        Self {
            position,
            rotation,
            scale: Vec2::ONE,
        }
    }

    /// Creates an identity transform (no translation, no rotation, unit scale).
    pub fn identity() -> Self {
        Self::new(Vec2::ZERO, 0.0)
    }

    pub fn with_scale(mut self, scale: Vec2) -> Self {
        self.scale = scale;
        self
    }

    /// Applies the transform (scale, then rotation, then translation) to a point.
    pub fn apply(self, point: Vec2) -> Vec2 {
        let cos_a = self.rotation.cos();
        let sin_a = self.rotation.sin();
        let scaled = point.scale_by(self.scale);
        let rotated_x = scaled.x * cos_a - scaled.y * sin_a;
        let rotated_y = scaled.x * sin_a + scaled.y * cos_a;
        Vec2::new(rotated_x, rotated_y) + self.position
    }

    /// Applies the inverse transform (inverse translation, inverse rotation, inverse scale) to a point.
    pub fn apply_inverse(self, point: Vec2) -> Vec2 {
        let translated_point = point - self.position;
        // cos(-a) = cos(a), sin(-a) = -sin(a)
        let cos_a = self.rotation.cos();
        let sin_a = self.rotation.sin();
        let rotated_x = translated_point.x * cos_a + translated_point.y * sin_a;
        let rotated_y = -translated_point.x * sin_a + translated_point.y * cos_a;
        Vec2::new(rotated_x / self.scale.x, rotated_y / self.scale.y)
    }

    /// Rotates and scales a direction without translating it.
    pub fn apply_direction(self, direction: Vec2) -> Vec2 {
        direction.scale_by(self.scale).rotate(self.rotation)
    }

    /// Maps a world-space direction back into local space.
    pub fn apply_inverse_direction(self, direction: Vec2) -> Vec2 {
        let rotated = direction.rotate(-self.rotation);
        Vec2::new(rotated.x / self.scale.x, rotated.y / self.scale.y)
    }

    /// Composes a child transform expressed relative to `self`.
    pub fn compose(self, child: Transform) -> Transform {
        Transform {
            position: self.apply(child.position),
            rotation: self.rotation + child.rotation,
            scale: self.scale.scale_by(child.scale),
        }
    }

    /// Affine matrix data `[a, b, c, d, tx, ty]` where
    /// `x' = a*x + c*y + tx` and `y' = b*x + d*y + ty`.
    pub fn to_matrix_data(self) -> [f64; 6] {
        let cos_a = self.rotation.cos();
        let sin_a = self.rotation.sin();
        [
            cos_a * self.scale.x,
            sin_a * self.scale.x,
            -sin_a * self.scale.y,
            cos_a * self.scale.y,
            self.position.x,
            self.position.y,
        ]
    }

    /// Decomposes matrix data produced by [`Transform::to_matrix_data`].
    /// Mirrored matrices are not representable and come back with positive scale.
    pub fn from_matrix_data(data: [f64; 6]) -> Self {
        let [a, b, c, d, tx, ty] = data;
        Self {
            position: Vec2::new(tx, ty),
            rotation: b.atan2(a),
            scale: Vec2::new(a.hypot(b), c.hypot(d)),
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

/// Handle into a [`TransformArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransformId(pub(crate) usize);

#[derive(Debug, Clone)]
struct TransformNode {
    local: Transform,
    global: Transform,
    parent: Option<TransformId>,
    depth: u32,
}

/// Flat storage for parent-relative transforms.
///
/// A parent is always inserted before its children, so index order is a
/// valid generation order and [`TransformArena::recompute`] is a single
/// forward pass.
#[derive(Debug, Clone, Default)]
pub struct TransformArena {
    nodes: Vec<TransformNode>,
}

impl TransformArena {
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    /// Adds a transform. An unknown parent id is treated as no parent.
    pub fn insert(&mut self, local: Transform, parent: Option<TransformId>) -> TransformId {
        let parent = parent.filter(|p| p.0 < self.nodes.len());
        let (global, depth) = match parent {
            Some(p) => {
                let parent_node = &self.nodes[p.0];
                (parent_node.global.compose(local), parent_node.depth + 1)
            }
            None => (local, 0),
        };
        let id = TransformId(self.nodes.len());
        self.nodes.push(TransformNode {
            local,
            global,
            parent,
            depth,
        });
        id
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: TransformId) -> bool {
        id.0 < self.nodes.len()
    }

    pub fn parent(&self, id: TransformId) -> Option<TransformId> {
        self.nodes[id.0].parent
    }

    pub fn depth(&self, id: TransformId) -> u32 {
        self.nodes[id.0].depth
    }

    pub fn local(&self, id: TransformId) -> Transform {
        self.nodes[id.0].local
    }

    /// World transform as of the last write or recompute.
    pub fn global(&self, id: TransformId) -> Transform {
        self.nodes[id.0].global
    }

    /// Replaces the local transform and refreshes this node's global.
    /// Descendants pick up the change on the next [`recompute`](Self::recompute).
    pub fn set_local(&mut self, id: TransformId, local: Transform) {
        let parent_global = self.parent_global(id);
        let node = &mut self.nodes[id.0];
        node.local = local;
        node.global = match parent_global {
            Some(parent) => parent.compose(local),
            None => local,
        };
    }

    pub fn set_global_position(&mut self, id: TransformId, position: Vec2) {
        let parent_global = self.parent_global(id);
        let node = &mut self.nodes[id.0];
        node.local.position = match parent_global {
            Some(parent) => parent.apply_inverse(position),
            None => position,
        };
        node.global.position = position;
    }

    pub fn set_global_rotation(&mut self, id: TransformId, rotation: f64) {
        let parent_global = self.parent_global(id);
        let node = &mut self.nodes[id.0];
        node.local.rotation = match parent_global {
            Some(parent) => rotation - parent.rotation,
            None => rotation,
        };
        node.global.rotation = rotation;
    }

    /// Recomputes every global transform from the locals, parents first.
    pub fn recompute(&mut self) {
        for index in 0..self.nodes.len() {
            let global = match self.nodes[index].parent {
                Some(parent) => self.nodes[parent.0].global.compose(self.nodes[index].local),
                None => self.nodes[index].local,
            };
            self.nodes[index].global = global;
        }
    }

    fn parent_global(&self, id: TransformId) -> Option<Transform> {
        self.nodes[id.0].parent.map(|p| self.nodes[p.0].global)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;
    const EPSILON: f64 = 1e-10;

    fn assert_vec_eq(a: Vec2, b: Vec2) {
        assert!((a.x - b.x).abs() < EPSILON, "{:?} != {:?}", a, b);
        assert!((a.y - b.y).abs() < EPSILON, "{:?} != {:?}", a, b);
    }

    #[test]
    fn test_transform_identity() {
        let t = Transform::identity();
        assert_eq!(t.position, Vec2::ZERO);
        assert_eq!(t.scale, Vec2::ONE);
        let p = Vec2::new(5.0, -3.0);
        assert_vec_eq(t.apply(p), p);
        assert_vec_eq(t.apply_inverse(p), p);
    }

    #[test]
    fn test_transform_apply_rotation_90_deg() {
        let t = Transform::new(Vec2::ZERO, PI / 2.0);
        assert_vec_eq(t.apply(Vec2::new(1.0, 0.0)), Vec2::new(0.0, 1.0));
        assert_vec_eq(t.apply(Vec2::new(0.0, 1.0)), Vec2::new(-1.0, 0.0));
    }

    #[test]
    fn test_transform_apply_combined() {
        // Rotation of (1,0) -> (0,1), then translation to (10, 6)
        let t = Transform::new(Vec2::new(10.0, 5.0), PI / 2.0);
        assert_vec_eq(t.apply(Vec2::new(1.0, 0.0)), Vec2::new(10.0, 6.0));
    }

    #[test]
    fn test_transform_apply_inverse_with_scale() {
        let t = Transform::new(Vec2::new(10.0, 5.0), PI / 4.0).with_scale(Vec2::new(2.0, 3.0));
        let p_local = Vec2::new(1.0, 1.0);
        let p_world = t.apply(p_local);
        assert_vec_eq(t.apply_inverse(p_world), p_local);
    }

    #[test]
    fn test_transform_matrix_data_round_trip() {
        let t = Transform::new(Vec2::new(-4.0, 12.5), 0.75).with_scale(Vec2::new(2.0, 0.5));
        let data = t.to_matrix_data();
        let back = Transform::from_matrix_data(data);
        assert_vec_eq(back.position, t.position);
        assert_vec_eq(back.scale, t.scale);
        assert!((back.rotation - t.rotation).abs() < EPSILON);

        // The matrix maps points the same way the transform does
        let p = Vec2::new(3.0, -1.0);
        let [a, b, c, d, tx, ty] = data;
        assert_vec_eq(Vec2::new(a * p.x + c * p.y + tx, b * p.x + d * p.y + ty), t.apply(p));
    }

    #[test]
    fn test_arena_parent_child_composition() {
        let mut arena = TransformArena::new();
        let parent = arena.insert(Transform::new(Vec2::new(10.0, 0.0), PI / 2.0), None);
        let child = arena.insert(Transform::new(Vec2::new(1.0, 0.0), 0.0), Some(parent));
        assert_eq!(arena.depth(parent), 0);
        assert_eq!(arena.depth(child), 1);
        assert_eq!(arena.parent(child), Some(parent));
        assert_vec_eq(arena.global(child).position, Vec2::new(10.0, 1.0));

        // Moving the parent only reaches the child after a recompute pass
        arena.set_local(parent, Transform::new(Vec2::new(20.0, 0.0), PI / 2.0));
        assert_vec_eq(arena.global(child).position, Vec2::new(10.0, 1.0));
        arena.recompute();
        assert_vec_eq(arena.global(child).position, Vec2::new(20.0, 1.0));
    }

    #[test]
    fn test_arena_set_global_position_under_parent() {
        let mut arena = TransformArena::new();
        let parent = arena.insert(Transform::new(Vec2::new(5.0, 5.0), 0.0), None);
        let child = arena.insert(Transform::identity(), Some(parent));
        arena.set_global_position(child, Vec2::new(8.0, 1.0));
        assert_vec_eq(arena.global(child).position, Vec2::new(8.0, 1.0));
        assert_vec_eq(arena.local(child).position, Vec2::new(3.0, -4.0));
        arena.recompute();
        assert_vec_eq(arena.global(child).position, Vec2::new(8.0, 1.0));
    }

    #[test]
    fn test_arena_unknown_parent_is_root() {
        let mut arena = TransformArena::new();
        let orphan = arena.insert(Transform::identity(), Some(TransformId(42)));
        assert_eq!(arena.parent(orphan), None);
        assert_eq!(arena.len(), 1);
    }
}
