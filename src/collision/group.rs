use serde::{Deserialize, Serialize};

use crate::error::{CollisionError, Result};

/// Category/mask filter. Two groups collide when each one's category is in
/// the other's mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CollisionGroup {
    category: u32,
    mask: u32,
}

impl CollisionGroup {
    /// Collides with everything.
    pub const ALL: CollisionGroup = CollisionGroup {
        category: u32::MAX,
        mask: u32::MAX,
    };

    pub fn new(category: u32, mask: u32) -> Self {
        Self { category, mask }
    }

    pub fn category(&self) -> u32 {
        self.category
    }

    pub fn mask(&self) -> u32 {
        self.mask
    }

    pub fn can_collide(&self, other: &CollisionGroup) -> bool {
        (self.category & other.mask) != 0 && (other.category & self.mask) != 0
    }

    /// A group that collides with exactly what this one does not.
    pub fn invert(&self) -> CollisionGroup {
        CollisionGroup {
            category: !self.category,
            mask: !self.mask,
        }
    }

    /// A group covering all the given categories that collides with none of them.
    pub fn combine(groups: &[CollisionGroup]) -> CollisionGroup {
        let category = groups.iter().fold(0, |acc, g| acc | g.category);
        CollisionGroup { category, mask: !category }
    }
}

impl Default for CollisionGroup {
    fn default() -> Self {
        Self::ALL
    }
}

/// Hands out one category bit per named group.
#[derive(Debug, Clone, Default)]
pub struct CollisionGroupManager {
    groups: Vec<(String, CollisionGroup)>,
}

impl CollisionGroupManager {
    const MAX_GROUPS: usize = 32;

    pub fn new() -> Self {
        Self { groups: Vec::new() }
    }

    /// Creates a group with the next free category bit. Without a mask the
    /// group collides with everything but itself.
    pub fn create(&mut self, name: &str, mask: Option<u32>) -> Result<CollisionGroup> {
        if self.groups.len() >= Self::MAX_GROUPS {
            return Err(CollisionError::GroupLimit);
        }
        let category = 1u32 << self.groups.len();
        let group = CollisionGroup::new(category, mask.unwrap_or(!category));
        self.groups.push((name.to_string(), group));
        Ok(group)
    }

    pub fn group_by_name(&self, name: &str) -> Option<CollisionGroup> {
        self.groups.iter().find(|(n, _)| n == name).map(|(_, g)| *g)
    }

    pub fn groups(&self) -> impl Iterator<Item = (&str, CollisionGroup)> {
        self.groups.iter().map(|(n, g)| (n.as_str(), *g))
    }

    pub fn reset(&mut self) {
        self.groups.clear();
    }
}
