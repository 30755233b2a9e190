use serde::{Deserialize, Serialize};

use crate::math::Vec2;

/// Side of a collider that was hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Side {
    #[default]
    None,
    Top,
    Bottom,
    Left,
    Right,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::None => Side::None,
            Side::Top => Side::Bottom,
            Side::Bottom => Side::Top,
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }

    /// The side most aligned with `direction`. Top is -y, matching screen
    /// coordinates; ties go to the first of Left, Right, Top, Bottom.
    pub fn from_direction(direction: Vec2) -> Side {
        if direction == Vec2::ZERO {
            return Side::None;
        }
        let candidates = [
            (Side::Left, Vec2::new(-1.0, 0.0)),
            (Side::Right, Vec2::new(1.0, 0.0)),
            (Side::Top, Vec2::new(0.0, -1.0)),
            (Side::Bottom, Vec2::new(0.0, 1.0)),
        ];
        let mut best = Side::None;
        let mut max_dot = f64::MIN;
        for (side, axis) in candidates {
            let d = direction.dot(axis);
            if d > max_dot {
                max_dot = d;
                best = side;
            }
        }
        best
    }

    pub fn is_horizontal(self) -> bool {
        matches!(self, Side::Left | Side::Right)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_side_from_direction() {
        assert_eq!(Side::from_direction(Vec2::new(5.0, 1.0)), Side::Right);
        assert_eq!(Side::from_direction(Vec2::new(-5.0, 1.0)), Side::Left);
        assert_eq!(Side::from_direction(Vec2::new(0.5, -3.0)), Side::Top);
        assert_eq!(Side::from_direction(Vec2::new(0.5, 3.0)), Side::Bottom);
        assert_eq!(Side::from_direction(Vec2::ZERO), Side::None);
        // Diagonal tie resolves to the horizontal side listed first
        assert_eq!(Side::from_direction(Vec2::new(-1.0, -1.0)), Side::Left);
    }

    #[test]
    fn test_side_opposite() {
        assert_eq!(Side::Left.opposite(), Side::Right);
        assert_eq!(Side::Top.opposite(), Side::Bottom);
        assert_eq!(Side::None.opposite(), Side::None);
        assert!(Side::Right.is_horizontal());
        assert!(!Side::Bottom.is_horizontal());
    }
}
